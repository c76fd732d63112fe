//! Session authorities: the external identity services the access gate asks
//! "is there a valid user for these cookies?".

pub mod cookie;
pub mod jwt;
pub mod supabase;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::config::{SessionConfig, SessionProvider};

pub use cookie::{CookieOptions, RequestCookies, SameSite, SessionCookie};
pub use jwt::JwtAuthority;
pub use supabase::SupabaseAuthority;

/// Authenticated admin user as reported by the session authority
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            role: None,
        }
    }
}

/// Outcome of a successful lookup. A missing user means the cookies carry no valid session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionResolution {
    pub user: Option<Identity>,
    pub cookies_to_persist: Vec<SessionCookie>,
}

impl SessionResolution {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user: Identity) -> Self {
        Self {
            user: Some(user),
            cookies_to_persist: Vec::new(),
        }
    }

    pub fn with_cookies(mut self, cookies: Vec<SessionCookie>) -> Self {
        self.cookies_to_persist = cookies;
        self
    }
}

/// Failures talking to the session authority. Messages never carry token values.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session authority unreachable: {0}")]
    Transport(String),

    #[error("Session authority returned unexpected status {status}")]
    Upstream { status: u16 },

    #[error("Session authority response could not be parsed: {0}")]
    InvalidResponse(String),

    #[error("Session authority misconfigured: {0}")]
    Misconfigured(&'static str),
}

impl From<reqwest::Error> for SessionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SessionError::InvalidResponse(err.without_url().to_string())
        } else {
            SessionError::Transport(err.without_url().to_string())
        }
    }
}

/// Resolves the current user from request cookies.
///
/// Implementations may refresh the session as a side effect; refreshed tokens are
/// returned in `cookies_to_persist` rather than written anywhere directly.
#[async_trait]
pub trait SessionAuthority: Send + Sync {
    async fn resolve_user(&self, cookies: &RequestCookies) -> Result<SessionResolution, SessionError>;

    /// Short name used in logs and the health endpoint
    fn name(&self) -> &'static str;
}

/// Build the authority selected by configuration
pub fn authority_from_config(config: &SessionConfig) -> Result<Arc<dyn SessionAuthority>, SessionError> {
    match config.provider {
        SessionProvider::Supabase => Ok(Arc::new(SupabaseAuthority::from_config(config)?)),
        SessionProvider::Jwt => Ok(Arc::new(JwtAuthority::from_config(config)?)),
    }
}
