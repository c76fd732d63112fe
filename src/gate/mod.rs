//! Admin access gate.
//!
//! Every request is classified by path alone. Only protected, non-login paths
//! consult the session authority, and they do so exactly once.

use axum::http::HeaderMap;
use serde::Serialize;
use std::sync::Arc;
use url::form_urlencoded;

use crate::session::{Identity, RequestCookies, SessionAuthority, SessionCookie};

/// Prefix shared by every admin dashboard path
pub const PROTECTED_PREFIX: &str = "/admin";

/// Login page; always reachable so it can never redirect to itself
pub const LOGIN_PATH: &str = "/admin/login";

/// Query parameter the login page reads to send the admin back
pub const REDIRECT_PARAM: &str = "redirectTo";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteClass {
    Unprotected,
    Login,
    Protected,
}

/// Classify a request path. Pure: no session state, no configuration.
///
/// Empty paths and paths not starting with `/` are treated as unprotected;
/// the router never produces them.
pub fn classify(path: &str) -> RouteClass {
    if !path.starts_with(PROTECTED_PREFIX) {
        RouteClass::Unprotected
    } else if path == LOGIN_PATH {
        RouteClass::Login
    } else {
        RouteClass::Protected
    }
}

/// Static route matcher for the HTTP layer: `/admin` and `/admin/*`.
pub fn matches_admin_route(path: &str) -> bool {
    match path.strip_prefix(PROTECTED_PREFIX) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Read-only view of an inbound request
#[derive(Debug, Clone, Copy)]
pub struct GateRequest<'a> {
    pub path: &'a str,
    pub cookies: &'a RequestCookies,
    pub headers: &'a HeaderMap,
}

impl<'a> GateRequest<'a> {
    pub fn new(path: &'a str, cookies: &'a RequestCookies, headers: &'a HeaderMap) -> Self {
        Self { path, cookies, headers }
    }
}

/// What the HTTP layer must do with the request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// Proceed unmodified
    Forward,
    /// Proceed; attach `cookies_to_set` to the downstream response
    ForwardWithCookies {
        user: Identity,
        cookies_to_set: Vec<SessionCookie>,
    },
    /// Short-circuit with a redirect; no downstream handler runs
    Redirect {
        target_path: String,
        query_params: Vec<(String, String)>,
    },
}

impl Decision {
    fn login_redirect(return_to: Option<&str>) -> Self {
        Decision::Redirect {
            target_path: LOGIN_PATH.to_string(),
            query_params: return_to
                .map(|path| vec![(REDIRECT_PARAM.to_string(), path.to_string())])
                .unwrap_or_default(),
        }
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, Decision::Redirect { .. })
    }

    /// `Location` header value for redirects, query values percent-encoded
    pub fn location(&self) -> Option<String> {
        let Decision::Redirect { target_path, query_params } = self else {
            return None;
        };

        if query_params.is_empty() {
            return Some(target_path.clone());
        }

        let query = query_params
            .iter()
            .map(|(name, value)| {
                format!(
                    "{}={}",
                    form_urlencoded::byte_serialize(name.as_bytes()).collect::<String>(),
                    form_urlencoded::byte_serialize(value.as_bytes()).collect::<String>()
                )
            })
            .collect::<Vec<_>>()
            .join("&");

        Some(format!("{}?{}", target_path, query))
    }
}

/// Whether the gate checks sessions at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Enforcement {
    Enforced,
    Disabled,
}

impl From<bool> for Enforcement {
    fn from(enforced: bool) -> Self {
        if enforced {
            Enforcement::Enforced
        } else {
            Enforcement::Disabled
        }
    }
}

pub struct AccessGate {
    authority: Arc<dyn SessionAuthority>,
    enforcement: Enforcement,
}

impl AccessGate {
    pub fn new(authority: Arc<dyn SessionAuthority>) -> Self {
        Self::with_enforcement(authority, Enforcement::Enforced)
    }

    pub fn with_enforcement(authority: Arc<dyn SessionAuthority>, enforcement: Enforcement) -> Self {
        if enforcement == Enforcement::Disabled {
            tracing::warn!("Admin access gate disabled: every /admin path is reachable without a session");
        }
        Self { authority, enforcement }
    }

    pub fn enforcement(&self) -> Enforcement {
        self.enforcement
    }

    pub fn authority_name(&self) -> &'static str {
        self.authority.name()
    }

    /// Decide what happens to one request. Never fails: authority errors
    /// become a login redirect without a return path.
    pub async fn evaluate(&self, request: &GateRequest<'_>) -> Decision {
        if self.enforcement == Enforcement::Disabled {
            return Decision::Forward;
        }

        match classify(request.path) {
            RouteClass::Unprotected | RouteClass::Login => Decision::Forward,
            RouteClass::Protected => self.resolve_protected(request).await,
        }
    }

    async fn resolve_protected(&self, request: &GateRequest<'_>) -> Decision {
        match self.authority.resolve_user(request.cookies).await {
            Ok(resolution) => match resolution.user {
                Some(user) => {
                    tracing::debug!(path = request.path, user = %user.id, "admin session valid");
                    Decision::ForwardWithCookies {
                        user,
                        cookies_to_set: resolution.cookies_to_persist,
                    }
                }
                None => {
                    tracing::debug!(path = request.path, "no admin session, redirecting to login");
                    Decision::login_redirect(Some(request.path))
                }
            },
            Err(e) => {
                tracing::warn!(authority = self.authority.name(), "Session lookup failed: {}", e);
                Decision::login_redirect(None)
            }
        }
    }
}
