//! Cookie building and parsing

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use sa_core::config::SameSite;

/// Name of the CSRF session cookie
pub const CSRF_COOKIE: &str = "csrf_sid";
/// Name of the SSO session cookie
pub const SSO_COOKIE: &str = "sso_session";

#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub name: String,
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
    pub max_age: Option<u64>,
}

impl CookieConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: "/".to_string(),
            domain: None,
            secure: true,
            http_only: true,
            same_site: SameSite::Lax,
            max_age: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_domain(mut self, domain: Option<String>) -> Self {
        self.domain = domain.filter(|d| !d.is_empty());
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }

    pub fn with_max_age(mut self, seconds: u64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    /// Build Set-Cookie header value
    pub fn build_cookie(&self, value: &str) -> String {
        let mut parts = vec![format!("{}={}", self.name, value)];
        self.push_attributes(&mut parts);
        if let Some(max_age) = self.max_age {
            parts.push(format!("Max-Age={}", max_age));
        }
        parts.join("; ")
    }

    /// Build Set-Cookie header value that removes the cookie
    pub fn build_clear_cookie(&self) -> String {
        let mut parts = vec![format!("{}=", self.name)];
        self.push_attributes(&mut parts);
        parts.push("Max-Age=0".to_string());
        parts.join("; ")
    }

    fn push_attributes(&self, parts: &mut Vec<String>) {
        parts.push(format!("Path={}", self.path));
        if let Some(ref domain) = self.domain {
            parts.push(format!("Domain={}", domain));
        }
        if self.secure {
            parts.push("Secure".to_string());
        }
        if self.http_only {
            parts.push("HttpOnly".to_string());
        }
        parts.push(format!("SameSite={}", self.same_site.as_str()));
    }
}

/// Extract a cookie value from a Cookie header
pub fn extract_cookie(cookie_header: &str, cookie_name: &str) -> Option<String> {
    cookie_header
        .split(';')
        .filter_map(|part| part.trim().split_once('='))
        .find(|(name, _)| name.trim() == cookie_name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// 256 random bits, base64url without padding
pub fn random_token() -> String {
    URL_SAFE_NO_PAD.encode(rand::random::<[u8; 32]>())
}

/// 256 random bits, lowercase hex
pub fn random_hex_token() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}
