use axum::{http::HeaderValue, middleware::from_fn_with_state, routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::gate::{AccessGate, Enforcement};
use crate::handlers;
use crate::middleware::access_gate_middleware;
use crate::session::{authority_from_config, SessionError};

/// Shared state for handlers and the gate middleware
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<AccessGate>,
}

impl AppState {
    pub fn new(gate: AccessGate) -> Self {
        Self { gate: Arc::new(gate) }
    }

    /// Build the gate and its session authority from configuration
    pub fn from_config(config: &AppConfig) -> Result<Self, SessionError> {
        let authority = authority_from_config(&config.session)?;
        let gate = AccessGate::with_enforcement(authority, Enforcement::from(config.gate.enforced));
        Ok(Self::new(gate))
    }
}

/// Router with the access gate applied to every route
pub fn app(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        // Admin (gated)
        .merge(admin_routes())
        .fallback(handlers::not_found)
        .layer(from_fn_with_state(state.clone(), access_gate_middleware))
        .with_state(state)
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin", get(handlers::admin_index))
        .route("/admin/login", get(handlers::admin_login))
        .route("/admin/session", get(handlers::admin_session))
}

/// Global layers configured from the security section
pub fn with_global_layers(router: Router, config: &AppConfig) -> Router {
    let router = if config.security.enable_cors {
        let origins: Vec<HeaderValue> = config
            .security
            .cors_origins
            .iter()
            .filter(|origin| origin.as_str() != "*")
            .filter_map(|origin| origin.parse().ok())
            .collect();
        router.layer(CorsLayer::new().allow_origin(origins).allow_credentials(true))
    } else {
        router
    };

    router.layer(TraceLayer::new_for_http())
}
