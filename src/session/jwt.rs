use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use super::{Identity, RequestCookies, SessionAuthority, SessionError, SessionResolution};
use crate::config::SessionConfig;

/// Claims carried by auth-service access tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    pub exp: i64,
}

/// Verifies the access-token cookie locally with the project's HS256 secret.
///
/// Never refreshes: an expired access token resolves to no user and the admin
/// is sent back through the login page.
pub struct JwtAuthority {
    decoding_key: DecodingKey,
    validation: Validation,
    access_cookie: String,
}

impl JwtAuthority {
    pub fn new(secret: &str, access_cookie: impl Into<String>) -> Result<Self, SessionError> {
        if secret.is_empty() {
            return Err(SessionError::Misconfigured("JWT secret not configured"));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        // Audience differs between projects; signature and expiry are what matter here
        validation.validate_aud = false;

        Ok(Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_cookie: access_cookie.into(),
        })
    }

    pub fn from_config(config: &SessionConfig) -> Result<Self, SessionError> {
        Self::new(&config.jwt_secret, config.access_cookie.clone())
    }
}

#[async_trait]
impl SessionAuthority for JwtAuthority {
    async fn resolve_user(&self, cookies: &RequestCookies) -> Result<SessionResolution, SessionError> {
        let Some(token) = cookies.get(&self.access_cookie) else {
            return Ok(SessionResolution::anonymous());
        };

        match decode::<AccessClaims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Ok(SessionResolution::authenticated(Identity {
                id: data.claims.sub,
                email: data.claims.email,
                role: data.claims.role,
            })),
            Err(e) => {
                tracing::debug!("Access token rejected: {:?}", e.kind());
                Ok(SessionResolution::anonymous())
            }
        }
    }

    fn name(&self) -> &'static str {
        "jwt"
    }
}
