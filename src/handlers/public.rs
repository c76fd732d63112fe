// handlers/public.rs - GET /, GET /health and the JSON 404 fallback

use axum::extract::State;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::gate::{LOGIN_PATH, PROTECTED_PREFIX};
use crate::middleware::ApiResponse;

/// GET / - service description
pub async fn root() -> ApiResponse<Value> {
    ApiResponse::success(json!({
        "name": "Realty Gate",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Access gate for the brokerage admin dashboard",
        "endpoints": {
            "home": "/ (public)",
            "health": "/health (public)",
            "login": format!("{} (public)", LOGIN_PATH),
            "admin": format!("{}/* (session required)", PROTECTED_PREFIX),
        }
    }))
}

/// GET /health - liveness plus gate mode; never contacts the session authority
pub async fn health(State(state): State<AppState>) -> ApiResponse<Value> {
    ApiResponse::success(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
        "gate": {
            "enforcement": state.gate.enforcement(),
            "authority": state.gate.authority_name(),
        }
    }))
}

pub async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
