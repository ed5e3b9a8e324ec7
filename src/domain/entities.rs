use crate::domain::value_objects::{ApiKey, Url};
use crate::infrastructure::body_source::BodySource;
use anyhow::{Result, anyhow};
use hyper::StatusCode;
use hyper::body::Bytes;
use std::fmt;
use std::str::FromStr;

/// HTTP method. Well-known methods are matched case-insensitively; any other
/// token is sent exactly as typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Extension(String),
}

impl FromStr for Method {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "PATCH" => Ok(Method::Patch),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            _ if is_token(s) => Ok(Method::Extension(s.to_string())),
            _ => Err(anyhow!("invalid HTTP method '{}'", s)),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Extension(token) => token.as_str(),
        };
        f.write_str(name)
    }
}

// RFC 9110 tchar
fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}

/// Represents an outbound HTTP request
#[derive(Debug)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub api_key: ApiKey,
    pub body: BodySource,
}

/// Represents an HTTP response with its body fully read
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub body: Bytes,
}
