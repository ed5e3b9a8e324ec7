use crate::domain::entities::{Method, Request};
use crate::domain::value_objects::{ApiKey, Url};
use crate::error::{AppError, AppResult};
use crate::infrastructure::body_source::BodySource;
use std::str::FromStr;

pub struct RequestBuilder {
    method: Option<Method>,
    url: Option<Url>,
    api_key: Option<ApiKey>,
    body: BodySource,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            method: None,
            url: None,
            api_key: None,
            body: BodySource::Empty,
        }
    }

    pub fn method(mut self, method: &str) -> AppResult<Self> {
        self.method = Some(Method::from_str(method).map_err(AppError::request)?);
        Ok(self)
    }

    /// Targets `host + "/" + path`.
    pub fn url(mut self, host: &str, path: &str) -> AppResult<Self> {
        self.url = Some(Url::join(host, path).map_err(AppError::request)?);
        Ok(self)
    }

    pub fn api_key(mut self, key: &str) -> AppResult<Self> {
        self.api_key = Some(ApiKey::new(key).map_err(AppError::request)?);
        Ok(self)
    }

    pub fn body(mut self, body: BodySource) -> Self {
        self.body = body;
        self
    }

    pub fn build(self) -> AppResult<Request> {
        let missing = |field: &str| AppError::request(anyhow::anyhow!("{} is required", field));
        Ok(Request {
            method: self.method.unwrap_or(Method::Get),
            url: self.url.ok_or_else(|| missing("URL"))?,
            api_key: self.api_key.ok_or_else(|| missing("API key"))?,
            body: self.body,
        })
    }
}
