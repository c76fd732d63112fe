pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod middleware;
pub mod session;

pub use app::{app, AppState};
pub use gate::{classify, AccessGate, Decision, Enforcement, GateRequest, RouteClass};
pub use session::{Identity, RequestCookies, SessionAuthority, SessionCookie, SessionError, SessionResolution};
