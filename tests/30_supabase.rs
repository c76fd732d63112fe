use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use realty_gate::config::AppConfig;
use realty_gate::session::{SessionAuthority, SessionError, SupabaseAuthority};
use realty_gate::RequestCookies;
use serde_json::{json, Value};

#[derive(Clone, Default)]
struct FakeAuth {
    user_calls: Arc<AtomicUsize>,
    token_calls: Arc<AtomicUsize>,
}

async fn user(State(fake): State<FakeAuth>, headers: HeaderMap) -> Response {
    fake.user_calls.fetch_add(1, Ordering::SeqCst);

    if headers.get("apikey").and_then(|v| v.to_str().ok()) != Some("anon") {
        return (StatusCode::UNAUTHORIZED, Json(json!({"msg": "no api key"}))).into_response();
    }

    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default();

    match bearer {
        "good-access" => Json(json!({"id": "u1", "email": "agent@brokerage.example", "role": "authenticated"}))
            .into_response(),
        "broken" => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        "garbage-json" => (StatusCode::OK, "not json").into_response(),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({"msg": "invalid JWT"}))).into_response(),
    }
}

async fn token(
    State(fake): State<FakeAuth>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    fake.token_calls.fetch_add(1, Ordering::SeqCst);

    if params.get("grant_type").map(String::as_str) != Some("refresh_token") {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "unsupported_grant_type"}))).into_response();
    }

    match body["refresh_token"].as_str() {
        Some("good-refresh") => Json(json!({
            "access_token": "new-access",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "new-refresh",
            "user": {"id": "u2", "email": "broker@brokerage.example"}
        }))
        .into_response(),
        _ => (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid_grant"}))).into_response(),
    }
}

async fn spawn_fake_auth() -> Result<(String, FakeAuth)> {
    let fake = FakeAuth::default();
    let router = Router::new()
        .route("/auth/v1/user", get(user))
        .route("/auth/v1/token", post(token))
        .with_state(fake.clone());

    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    Ok((format!("http://127.0.0.1:{}", port), fake))
}

fn authority(base_url: &str) -> SupabaseAuthority {
    let mut config = AppConfig::development().session;
    config.supabase_url = base_url.to_string();
    config.supabase_anon_key = "anon".to_string();
    SupabaseAuthority::from_config(&config).expect("authority")
}

#[tokio::test]
async fn valid_access_token_resolves_user() -> Result<()> {
    let (url, fake) = spawn_fake_auth().await?;
    let cookies = RequestCookies::parse("sb-access-token=good-access; sb-refresh-token=good-refresh");

    let resolution = authority(&url).resolve_user(&cookies).await?;

    assert_eq!(resolution.user.map(|u| u.id).as_deref(), Some("u1"));
    assert!(resolution.cookies_to_persist.is_empty());
    assert_eq!(fake.token_calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn stale_access_token_is_refreshed() -> Result<()> {
    let (url, fake) = spawn_fake_auth().await?;
    let cookies = RequestCookies::parse("sb-access-token=stale-access; sb-refresh-token=good-refresh");

    let resolution = authority(&url).resolve_user(&cookies).await?;

    assert_eq!(resolution.user.map(|u| u.id).as_deref(), Some("u2"));
    let names: Vec<_> = resolution.cookies_to_persist.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["sb-access-token", "sb-refresh-token"]);
    assert_eq!(resolution.cookies_to_persist[0].value, "new-access");
    assert_eq!(fake.user_calls.load(Ordering::SeqCst), 1);
    assert_eq!(fake.token_calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn refresh_token_alone_is_enough() -> Result<()> {
    let (url, fake) = spawn_fake_auth().await?;
    let cookies = RequestCookies::parse("sb-refresh-token=good-refresh");

    let resolution = authority(&url).resolve_user(&cookies).await?;

    assert_eq!(resolution.user.map(|u| u.id).as_deref(), Some("u2"));
    assert_eq!(fake.user_calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn revoked_refresh_token_means_no_user() -> Result<()> {
    let (url, _) = spawn_fake_auth().await?;
    let cookies = RequestCookies::parse("sb-access-token=stale-access; sb-refresh-token=revoked");

    let resolution = authority(&url).resolve_user(&cookies).await?;

    assert_eq!(resolution.user, None);
    assert!(resolution.cookies_to_persist.is_empty());
    Ok(())
}

#[tokio::test]
async fn upstream_failure_is_an_error() -> Result<()> {
    let (url, fake) = spawn_fake_auth().await?;
    let cookies = RequestCookies::parse("sb-access-token=broken; sb-refresh-token=good-refresh");

    let err = authority(&url).resolve_user(&cookies).await.unwrap_err();

    assert!(matches!(err, SessionError::Upstream { status: 500 }));
    // A failed lookup is terminal: no refresh attempt afterwards
    assert_eq!(fake.token_calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn unparseable_user_payload_is_an_error() -> Result<()> {
    let (url, _) = spawn_fake_auth().await?;
    let cookies = RequestCookies::parse("sb-access-token=garbage-json");

    let err = authority(&url).resolve_user(&cookies).await.unwrap_err();

    assert!(matches!(err, SessionError::InvalidResponse(_)));
    Ok(())
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() -> Result<()> {
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let cookies = RequestCookies::parse("sb-access-token=good-access");

    let err = authority(&format!("http://127.0.0.1:{}", port))
        .resolve_user(&cookies)
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::Transport(_)));
    Ok(())
}
