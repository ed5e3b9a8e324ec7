use crate::domain::entities::{Request, Response};
use crate::domain::value_objects::Url;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use tracing::info;

/// Trait for HTTP clients to enable mocking and dependency inversion
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(&self, request: Request) -> AppResult<Response>;
}

/// Application service for orchestrating HTTP request workflows
/// This contains business logic and use cases
pub struct HttpRequestService {
    http_client: Box<dyn HttpClient>,
}

impl HttpRequestService {
    pub fn new(http_client: Box<dyn HttpClient>) -> Self {
        Self { http_client }
    }

    /// Sends one request and returns the fully read response, whatever its
    /// status.
    pub async fn send_request(&self, request: Request) -> AppResult<Response> {
        self.validate_request(&request)?;
        info!(
            method = %request.method,
            url = request.url.as_str(),
            has_body = !request.body.is_empty(),
            "dispatching request"
        );
        self.http_client.send(request).await
    }

    fn validate_request(&self, request: &Request) -> AppResult<()> {
        RequestValidator::validate(request)
    }
}

/// Domain service for request validation
/// This contains domain business rules
pub struct RequestValidator;

impl RequestValidator {
    pub fn validate(request: &Request) -> AppResult<()> {
        Self::validate_url(&request.url)
    }

    fn validate_url(url: &Url) -> AppResult<()> {
        match url.0.scheme_str() {
            Some("http") | Some("https") => {}
            Some(other) => {
                return Err(AppError::request(anyhow::anyhow!(
                    "unsupported protocol scheme \"{}\" in {}",
                    other,
                    url
                )));
            }
            None => {
                return Err(AppError::request(anyhow::anyhow!(
                    "URL must start with http:// or https://, got {}",
                    url
                )));
            }
        }
        if url.0.host().is_none_or(str::is_empty) {
            return Err(AppError::request(anyhow::anyhow!("no host in request URL {}", url)));
        }
        Ok(())
    }
}
