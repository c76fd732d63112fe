// handlers/admin.rs - admin dashboard endpoints behind the access gate
//
// The gate places the resolved `Identity` in request extensions before these run.
// The dashboard pages themselves (properties, team) are served elsewhere.

use axum::{extract::Query, Extension};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::gate::{classify, RouteClass, PROTECTED_PREFIX};
use crate::middleware::{ApiResponse, ApiResult};
use crate::session::Identity;

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    #[serde(rename = "redirectTo")]
    pub redirect_to: Option<String>,
}

/// GET /admin/login - where the gate sends admins without a session.
///
/// Reports the page the admin returns to after signing in. Only protected
/// admin paths are accepted as return targets so the login flow cannot be
/// used as an open redirect.
pub async fn admin_login(Query(query): Query<LoginQuery>) -> ApiResult<Value> {
    let return_to = match query.redirect_to {
        Some(target) if classify(&target) == RouteClass::Protected => target,
        Some(_) => return Err(ApiError::bad_request("redirectTo must be an admin dashboard path")),
        None => PROTECTED_PREFIX.to_string(),
    };

    Ok(ApiResponse::success(json!({
        "page": "login",
        "return_to": return_to,
    })))
}

/// GET /admin - dashboard landing for the signed-in admin
pub async fn admin_index(identity: Option<Extension<Identity>>) -> ApiResult<Value> {
    let Extension(user) = identity.ok_or_else(no_session)?;

    Ok(ApiResponse::success(json!({
        "page": "dashboard",
        "user": user,
        "sections": ["properties", "team"],
    })))
}

/// GET /admin/session - the identity the gate resolved for this request
pub async fn admin_session(identity: Option<Extension<Identity>>) -> ApiResult<Identity> {
    let Extension(user) = identity.ok_or_else(no_session)?;
    Ok(ApiResponse::success(user))
}

// Reached only when enforcement is disabled and no session was resolved
fn no_session() -> ApiError {
    ApiError::unauthorized("No admin session")
}
