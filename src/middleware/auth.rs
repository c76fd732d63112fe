use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::app::AppState;
use crate::gate::{matches_admin_route, Decision, GateRequest};
use crate::session::{RequestCookies, SessionCookie};

/// Access gate middleware for the admin dashboard.
///
/// Paths outside `/admin` and `/admin/*` pass straight through. For admin paths the
/// gate decides: forward as-is, forward with the resolved user in request extensions
/// (and refreshed cookies on the response), or redirect to the login page.
pub async fn access_gate_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if !matches_admin_route(&path) {
        return next.run(request).await;
    }

    let cookies = RequestCookies::from_headers(request.headers());
    let decision = state
        .gate
        .evaluate(&GateRequest::new(&path, &cookies, request.headers()))
        .await;

    match decision {
        Decision::Forward => next.run(request).await,
        Decision::ForwardWithCookies { user, cookies_to_set } => {
            request.extensions_mut().insert(user);
            let mut response = next.run(request).await;
            append_set_cookies(response.headers_mut(), &cookies_to_set);
            response
        }
        redirect @ Decision::Redirect { .. } => redirect_response(&redirect),
    }
}

/// 302 with an empty body
fn redirect_response(decision: &Decision) -> Response {
    let location = decision.location().unwrap_or_else(|| crate::gate::LOGIN_PATH.to_string());
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

fn append_set_cookies(headers: &mut HeaderMap, cookies: &[SessionCookie]) {
    for cookie in cookies {
        match HeaderValue::from_str(&cookie.to_header_value()) {
            Ok(value) => {
                headers.append(header::SET_COOKIE, value);
            }
            Err(_) => {
                tracing::warn!("Dropping refreshed cookie '{}' with invalid header characters", cookie.name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::CookieOptions;

    #[test]
    fn test_redirect_response_shape() {
        let decision = Decision::Redirect {
            target_path: "/admin/login".to_string(),
            query_params: vec![("redirectTo".to_string(), "/admin/team".to_string())],
        };
        let response = redirect_response(&decision);
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/admin/login?redirectTo=%2Fadmin%2Fteam"
        );
    }

    #[test]
    fn test_append_set_cookies_skips_invalid_values() {
        let mut headers = HeaderMap::new();
        let cookies = vec![
            SessionCookie::new("sb-access-token", "ok", CookieOptions::default()),
            SessionCookie::new("sb-refresh-token", "bad\nvalue", CookieOptions::default()),
        ];
        append_set_cookies(&mut headers, &cookies);
        let values: Vec<_> = headers.get_all(header::SET_COOKIE).iter().collect();
        assert_eq!(values.len(), 1);
        assert!(values[0].to_str().unwrap().starts_with("sb-access-token=ok;"));
    }
}
