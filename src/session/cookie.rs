use serde::Serialize;
use std::collections::BTreeMap;

/// Cookies sent by the browser, parsed from the `Cookie` request header(s)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestCookies {
    values: BTreeMap<String, String>,
}

impl RequestCookies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse every `Cookie` header on the request. Later duplicates do not
    /// override the first occurrence, matching browser ordering (most specific path first).
    pub fn from_headers(headers: &axum::http::HeaderMap) -> Self {
        let mut cookies = Self::new();
        for value in headers.get_all(axum::http::header::COOKIE) {
            if let Ok(raw) = value.to_str() {
                cookies.extend_from_header(raw);
            }
        }
        cookies
    }

    pub fn parse(raw: &str) -> Self {
        let mut cookies = Self::new();
        cookies.extend_from_header(raw);
        cookies
    }

    fn extend_from_header(&mut self, raw: &str) {
        for pair in raw.split(';') {
            let Some((name, value)) = pair.trim().split_once('=') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let value = value.trim().trim_matches('"');
            self.values
                .entry(name.to_string())
                .or_insert_with(|| value.to_string());
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Non-empty cookie value by name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Attributes applied when a cookie is written back to the browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CookieOptions {
    pub path: String,
    pub max_age: Option<i64>,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            max_age: None,
            http_only: true,
            secure: true,
            same_site: SameSite::Lax,
        }
    }
}

/// A cookie the session authority asked the response to persist
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct SessionCookie {
    pub name: String,
    #[serde(skip_serializing)]
    pub value: String,
    pub options: CookieOptions,
}

impl SessionCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>, options: CookieOptions) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            options,
        }
    }

    /// Render as a `Set-Cookie` header value
    pub fn to_header_value(&self) -> String {
        let mut header = format!("{}={}; Path={}", self.name, self.value, self.options.path);
        if let Some(max_age) = self.options.max_age {
            header.push_str(&format!("; Max-Age={}", max_age));
        }
        if self.options.http_only {
            header.push_str("; HttpOnly");
        }
        // SameSite=None is rejected by browsers without Secure
        if self.options.secure || self.options.same_site == SameSite::None {
            header.push_str("; Secure");
        }
        header.push_str("; SameSite=");
        header.push_str(self.options.same_site.as_str());
        header
    }
}

// Token values stay out of logs
impl std::fmt::Debug for SessionCookie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCookie")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .field("options", &self.options)
            .finish()
    }
}
