use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use url::Url;

use super::{
    CookieOptions, Identity, RequestCookies, SameSite, SessionAuthority, SessionCookie, SessionError,
    SessionResolution,
};
use crate::config::SessionConfig;

/// Hosted auth service session lookup (GoTrue-compatible `/auth/v1` API).
///
/// An access token is checked against `/auth/v1/user`. When it is missing or
/// rejected and a refresh token is present, the session is refreshed once and the
/// new token pair is returned as cookies to persist.
pub struct SupabaseAuthority {
    client: reqwest::Client,
    base_url: Url,
    anon_key: String,
    access_cookie: String,
    refresh_cookie: String,
    cookie_secure: bool,
    refresh_max_age: i64,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    role: Option<String>,
}

impl From<UserPayload> for Identity {
    fn from(payload: UserPayload) -> Self {
        Identity {
            id: payload.id,
            email: payload.email,
            role: payload.role,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenPayload {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    user: UserPayload,
}

impl SupabaseAuthority {
    pub fn from_config(config: &SessionConfig) -> Result<Self, SessionError> {
        if config.supabase_url.is_empty() {
            return Err(SessionError::Misconfigured("SUPABASE_URL not configured"));
        }
        if config.supabase_anon_key.is_empty() {
            return Err(SessionError::Misconfigured("SUPABASE_ANON_KEY not configured"));
        }

        // Trailing slash so relative joins append instead of replacing the last segment
        let mut base_url = Url::parse(&config.supabase_url)
            .map_err(|_| SessionError::Misconfigured("SUPABASE_URL is not a valid URL"))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|_| SessionError::Misconfigured("failed to build HTTP client"))?;

        Ok(Self {
            client,
            base_url,
            anon_key: config.supabase_anon_key.clone(),
            access_cookie: config.access_cookie.clone(),
            refresh_cookie: config.refresh_cookie.clone(),
            cookie_secure: config.cookie_secure,
            refresh_max_age: config.refresh_cookie_max_age_secs,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, SessionError> {
        self.base_url
            .join(path)
            .map_err(|_| SessionError::Misconfigured("SUPABASE_URL cannot be joined with auth path"))
    }

    /// `Ok(None)` when the auth service rejects the token
    async fn fetch_user(&self, access_token: &str) -> Result<Option<Identity>, SessionError> {
        let response = self
            .client
            .get(self.endpoint("auth/v1/user")?)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let payload: UserPayload = response.json().await?;
                Ok(Some(payload.into()))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            status => Err(SessionError::Upstream { status: status.as_u16() }),
        }
    }

    /// `Ok(None)` when the refresh token is expired, revoked or already used
    async fn refresh_session(&self, refresh_token: &str) -> Result<Option<SessionResolution>, SessionError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "refresh_token");

        let response = self
            .client
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let payload: TokenPayload = response.json().await?;
                let cookies = self.session_cookies(&payload);
                Ok(Some(
                    SessionResolution::authenticated(payload.user.into()).with_cookies(cookies),
                ))
            }
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            status => Err(SessionError::Upstream { status: status.as_u16() }),
        }
    }

    fn session_cookies(&self, payload: &TokenPayload) -> Vec<SessionCookie> {
        let options = |max_age| CookieOptions {
            path: "/".to_string(),
            max_age,
            http_only: true,
            secure: self.cookie_secure,
            same_site: SameSite::Lax,
        };

        vec![
            SessionCookie::new(&self.access_cookie, &payload.access_token, options(payload.expires_in)),
            SessionCookie::new(
                &self.refresh_cookie,
                &payload.refresh_token,
                options(Some(self.refresh_max_age)),
            ),
        ]
    }
}

#[async_trait]
impl SessionAuthority for SupabaseAuthority {
    async fn resolve_user(&self, cookies: &RequestCookies) -> Result<SessionResolution, SessionError> {
        let access_token = cookies.get(&self.access_cookie);
        let refresh_token = cookies.get(&self.refresh_cookie);

        if access_token.is_none() && refresh_token.is_none() {
            return Ok(SessionResolution::anonymous());
        }

        if let Some(token) = access_token {
            if let Some(user) = self.fetch_user(token).await? {
                return Ok(SessionResolution::authenticated(user));
            }
        }

        match refresh_token {
            Some(token) => {
                tracing::debug!("Access token missing or rejected, refreshing session");
                Ok(self
                    .refresh_session(token)
                    .await?
                    .unwrap_or_else(SessionResolution::anonymous))
            }
            None => Ok(SessionResolution::anonymous()),
        }
    }

    fn name(&self) -> &'static str {
        "supabase"
    }
}
