use anyhow::{Result, anyhow};
use hyper::http::Uri;
use std::fmt;

/// Represents a validated request URL
#[derive(Debug, Clone)]
pub struct Url(pub Uri);

impl Url {
    /// Creates a new Url with validation
    ///
    /// # Arguments
    /// * `url` - The URL string to parse
    ///
    /// # Returns
    /// * `Ok(Url)` - Validated URL
    /// * `Err(anyhow::Error)` - If the URL is invalid
    pub fn new(url: &str) -> Result<Self> {
        let uri = url
            .parse::<Uri>()
            .map_err(|e| anyhow!("Invalid URL '{}': {}", url, e))?;
        Ok(Url(uri))
    }

    /// Joins `host` and `path` with exactly one `/` between them.
    ///
    /// Neither side is normalized: a trailing `/` on the host yields `//`,
    /// and a leading `/` on the path as well yields `///`.
    pub fn join(host: &str, path: &str) -> Result<Self> {
        Self::new(&format!("{}/{}", host, path))
    }

    /// Returns the URL as a string
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bearer token sent with every request. Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: &str) -> Result<Self> {
        if key.is_empty() {
            return Err(anyhow!("API key cannot be empty"));
        }
        Ok(ApiKey(key.to_string()))
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_inserts_single_separator() {
        let url = Url::join("https://api.example/v1", "users/42").unwrap();
        assert_eq!(url.as_str(), "https://api.example/v1/users/42");
    }

    #[test]
    fn join_does_not_normalize_slashes() {
        let url = Url::join("https://api.example/", "/users").unwrap();
        assert_eq!(url.0.path(), "///users");
    }

    #[test]
    fn trailing_host_slash_doubles_separator() {
        let url = Url::join("https://h/", "users").unwrap();
        assert_eq!(url.as_str(), "https://h//users");
    }

    #[test]
    fn join_keeps_query_string() {
        let url = Url::join("http://localhost:8080", "items?page=2").unwrap();
        assert_eq!(url.0.query(), Some("page=2"));
        assert_eq!(url.0.path(), "/items");
    }

    #[test]
    fn rejects_unparseable_url() {
        let err = Url::join("https://bad host", "x").unwrap_err();
        assert!(err.to_string().starts_with("Invalid URL"));
    }

    #[test]
    fn api_key_debug_is_redacted() {
        let key = ApiKey::new("s3cret").unwrap();
        assert_eq!(format!("{:?}", key), "ApiKey(***)");
        assert_eq!(key.bearer(), "Bearer s3cret");
    }

    #[test]
    fn api_key_rejects_empty() {
        assert!(ApiKey::new("").is_err());
    }
}
