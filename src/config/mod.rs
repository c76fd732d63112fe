use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub gate: GateConfig,
    pub session: SessionConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// When false every request is forwarded without a session lookup
    pub enforced: bool,
}

/// Which backend resolves sessions for protected paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionProvider {
    Supabase,
    Jwt,
}

impl std::str::FromStr for SessionProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "supabase" => Ok(SessionProvider::Supabase),
            "jwt" => Ok(SessionProvider::Jwt),
            other => Err(format!("unknown session provider '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub provider: SessionProvider,
    pub supabase_url: String,
    #[serde(skip_serializing)]
    pub supabase_anon_key: String,
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub access_cookie: String,
    pub refresh_cookie: String,
    pub request_timeout_secs: u64,
    pub cookie_secure: bool,
    pub refresh_cookie_max_age_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Some(port) = env::var("REALTY_GATE_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|v| v.parse().ok())
        {
            self.server.port = port;
        }

        // Gate overrides
        if let Ok(v) = env::var("ADMIN_AUTH_ENFORCED") {
            self.gate.enforced = v.parse().unwrap_or(self.gate.enforced);
        }

        // Session overrides
        if let Ok(v) = env::var("SESSION_PROVIDER") {
            self.session.provider = v.parse().unwrap_or(self.session.provider);
        }
        if let Ok(v) = env::var("SUPABASE_URL") {
            self.session.supabase_url = v.trim_end_matches('/').to_string();
        }
        if let Ok(v) = env::var("SUPABASE_ANON_KEY") {
            self.session.supabase_anon_key = v;
        }
        if let Ok(v) = env::var("SUPABASE_JWT_SECRET") {
            self.session.jwt_secret = v;
        }
        if let Ok(v) = env::var("SESSION_ACCESS_COOKIE") {
            self.session.access_cookie = v;
        }
        if let Ok(v) = env::var("SESSION_REFRESH_COOKIE") {
            self.session.refresh_cookie = v;
        }
        if let Ok(v) = env::var("SESSION_REQUEST_TIMEOUT_SECS") {
            self.session.request_timeout_secs = v.parse().unwrap_or(self.session.request_timeout_secs);
        }
        if let Ok(v) = env::var("SESSION_COOKIE_SECURE") {
            self.session.cookie_secure = v.parse().unwrap_or(self.session.cookie_secure);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        self
    }

    fn session_defaults(request_timeout_secs: u64, cookie_secure: bool) -> SessionConfig {
        SessionConfig {
            provider: SessionProvider::Supabase,
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            jwt_secret: String::new(),
            access_cookie: "sb-access-token".to_string(),
            refresh_cookie: "sb-refresh-token".to_string(),
            request_timeout_secs,
            cookie_secure,
            refresh_cookie_max_age_secs: 60 * 60 * 24 * 30, // 30 days
        }
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig { port: 3000 },
            gate: GateConfig { enforced: true },
            session: Self::session_defaults(10, false),
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string()],
            },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig { port: 3000 },
            gate: GateConfig { enforced: true },
            session: Self::session_defaults(10, true),
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig { port: 3000 },
            gate: GateConfig { enforced: true },
            session: Self::session_defaults(5, true),
            security: SecurityConfig {
                enable_cors: false,
                cors_origins: Vec::new(),
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
