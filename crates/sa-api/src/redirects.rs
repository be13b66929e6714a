//! Redirect targets for the login surface
//!
//! Post-login and post-logout targets are limited to same-site paths and
//! the configured trusted origins.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use url::{form_urlencoded, Url};

pub const LOGIN_PATH: &str = "/api/v1/oauth/login";

/// `scheme://host[:port]` of an absolute URL
pub fn origin_of(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    match url.origin() {
        origin @ url::Origin::Tuple(..) => Some(origin.ascii_serialization()),
        url::Origin::Opaque(_) => None,
    }
}

/// Keep `target` only if it stays on this site or goes to a trusted origin
pub fn safe_redirect(target: &str, trusted_origins: &[String]) -> Option<String> {
    let target = target.trim();
    if target.is_empty() {
        return None;
    }
    if target.starts_with('/') {
        if target.starts_with("//") || target.contains('\\') {
            return None;
        }
        return Some(target.to_string());
    }
    let origin = origin_of(target)?;
    trusted_origins
        .iter()
        .any(|t| origin_of(t).as_deref() == Some(origin.as_str()))
        .then(|| target.to_string())
}

/// Login page URL carrying the return target and an optional error banner
pub fn login_url(return_to: Option<&str>, error: Option<&str>) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    if let Some(return_to) = return_to.filter(|r| !r.is_empty()) {
        query.append_pair("return_to", return_to);
    }
    if let Some(error) = error {
        query.append_pair("error", &encode_banner(error));
    }
    let query = query.finish();
    if query.is_empty() {
        LOGIN_PATH.to_string()
    } else {
        format!("{}?{}", LOGIN_PATH, query)
    }
}

pub fn encode_banner(message: &str) -> String {
    URL_SAFE_NO_PAD.encode(message)
}

/// Undecodable banners are dropped
pub fn decode_banner(encoded: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(encoded.trim_end_matches('=')).ok()?;
    String::from_utf8(bytes).ok().filter(|m| !m.is_empty())
}

/// Append `key=value` to a URL that may already carry a query
pub fn with_query_param(base: &str, key: &str, value: &str) -> Option<String> {
    let mut url = Url::parse(base).ok()?;
    url.query_pairs_mut().append_pair(key, value);
    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_of() {
        assert_eq!(
            origin_of("https://app.example.edu/dashboard?x=1").as_deref(),
            Some("https://app.example.edu")
        );
        assert_eq!(
            origin_of("http://localhost:3000/").as_deref(),
            Some("http://localhost:3000")
        );
        assert_eq!(origin_of("/relative"), None);
    }

    #[test]
    fn test_safe_redirect() {
        let trusted = vec!["https://app.example.edu".to_string()];

        assert_eq!(
            safe_redirect("/api/v1/oauth/authorize?client_id=a", &trusted).as_deref(),
            Some("/api/v1/oauth/authorize?client_id=a")
        );
        assert_eq!(
            safe_redirect("https://app.example.edu/home", &trusted).as_deref(),
            Some("https://app.example.edu/home")
        );
        assert_eq!(safe_redirect("https://evil.example.com/", &trusted), None);
        assert_eq!(safe_redirect("//evil.example.com/", &trusted), None);
        assert_eq!(safe_redirect("/\\evil.example.com", &trusted), None);
        assert_eq!(safe_redirect("javascript:alert(1)", &trusted), None);
        assert_eq!(safe_redirect("", &trusted), None);
    }

    #[test]
    fn test_login_url() {
        assert_eq!(login_url(None, None), LOGIN_PATH);

        let url = login_url(Some("/api/v1/oauth/authorize?client_id=a&x=1"), Some("Invalid CSRF token"));
        assert!(url.starts_with("/api/v1/oauth/login?return_to=%2Fapi%2Fv1%2Foauth%2Fauthorize%3Fclient_id%3Da%26x%3D1&error="));

        let encoded = url.rsplit("error=").next().unwrap();
        assert_eq!(decode_banner(encoded).as_deref(), Some("Invalid CSRF token"));
    }

    #[test]
    fn test_decode_banner() {
        assert_eq!(decode_banner("!!!"), None);
        assert_eq!(decode_banner(""), None);
        // padded input from older clients
        assert_eq!(decode_banner("aGk=").as_deref(), Some("hi"));
    }

    #[test]
    fn test_with_query_param() {
        assert_eq!(
            with_query_param("https://app1/cb", "code", "abc").as_deref(),
            Some("https://app1/cb?code=abc")
        );
        assert_eq!(
            with_query_param("https://app1/cb?tenant=1", "code", "a b").as_deref(),
            Some("https://app1/cb?tenant=1&code=a+b")
        );
        assert_eq!(with_query_param("not a url", "code", "x"), None);
    }
}
