use crate::application::services::{HttpClient, HttpRequestService};
use crate::domain::entities::{Method as DomainMethod, Request, Response};
use crate::domain::value_objects::{ApiKey, Url};
use crate::error::{AppError, AppResult};
use crate::infrastructure::body_source::RequestBody;
use crate::infrastructure::connector::HttpsConnector;

use anyhow::anyhow;
use async_trait::async_trait;
use http_body_util::BodyExt;
use hyper::body::{Body, Bytes, Frame, SizeHint};
use hyper::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use hyper::{Method, Request as HyperRequest};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{Semaphore, oneshot};
use tracing::{debug, warn};

const APPLICATION_JSON: &str = "application/json";

/// Bounds applied to every request made by [`HyperHttpClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientLimits {
    /// Covers connect, headers and reading the whole body.
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub tls_handshake_timeout: Duration,
    pub response_header_timeout: Duration,
    pub max_idle_connections: usize,
    pub max_connections_per_host: usize,
    pub max_idle_connections_per_host: usize,
}

impl Default for ClientLimits {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            tls_handshake_timeout: Duration::from_secs(10),
            response_header_timeout: Duration::from_secs(10),
            max_idle_connections: 100,
            max_connections_per_host: 100,
            max_idle_connections_per_host: 100,
        }
    }
}

/// Infrastructure implementation of HttpClient using Hyper
/// This is a low-level HTTP transport that the application service uses
pub struct HyperHttpClient {
    client: Client<HttpsConnector, RequestBody>,
    in_flight: Arc<Semaphore>,
    limits: ClientLimits,
}

impl HyperHttpClient {
    pub fn new(limits: ClientLimits) -> AppResult<Self> {
        let connector = HttpsConnector::new(limits.connect_timeout, limits.tls_handshake_timeout)
            .map_err(AppError::transport)?;
        // One host per process, so the per-host idle cap is also the total.
        let max_idle = limits
            .max_idle_connections_per_host
            .min(limits.max_idle_connections);
        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(max_idle)
            .build(connector);

        Ok(Self {
            client,
            in_flight: Arc::new(Semaphore::new(limits.max_connections_per_host)),
            limits,
        })
    }

    /// Creates a configured HTTP request service using this client
    pub fn create_request_service(self) -> HttpRequestService {
        HttpRequestService::new(Box::new(self))
    }
}

#[async_trait]
impl HttpClient for HyperHttpClient {
    async fn send(&self, request: Request) -> AppResult<Response> {
        let hyper_request = RequestAdapter::to_hyper_request(request)?;
        let deadline = self.limits.request_timeout;

        tokio::time::timeout(deadline, self.exchange(hyper_request))
            .await
            .unwrap_or_else(|_| {
                warn!(?deadline, "request deadline exceeded");
                Err(AppError::transport(anyhow!(
                    "Client.Timeout exceeded after {:?} while awaiting response",
                    deadline
                )))
            })
    }
}

impl HyperHttpClient {
    async fn exchange(&self, request: HyperRequest<RequestBody>) -> AppResult<Response> {
        let _permit = self
            .in_flight
            .acquire()
            .await
            .map_err(|e| AppError::transport(anyhow!("connection pool closed: {}", e)))?;

        let hyper_response = self.execute_http_request(request).await?;
        ResponseAdapter::to_domain_response(hyper_response).await
    }

    async fn execute_http_request(
        &self,
        request: HyperRequest<RequestBody>,
    ) -> AppResult<hyper::Response<hyper::body::Incoming>> {
        debug!(method = %request.method(), uri = %request.uri(), "sending request");
        let header_timeout = self.limits.response_header_timeout;

        let (written_tx, written_rx) = oneshot::channel();
        let request = request.map(|body| WrittenSignal::new(body, written_tx).boxed_unsync());
        let response = self.client.request(request);
        tokio::pin!(response);

        // The header clock starts once hyper is done with the request body.
        tokio::select! {
            biased;
            result = &mut response => return Self::response_head(result),
            _ = written_rx => debug!("request written, awaiting response headers"),
        }

        match tokio::time::timeout(header_timeout, response).await {
            Ok(result) => Self::response_head(result),
            Err(_) => Err(AppError::transport(anyhow!(
                "timeout awaiting response headers after {:?}",
                header_timeout
            ))),
        }
    }

    fn response_head(
        result: Result<hyper::Response<hyper::body::Incoming>, hyper_util::client::legacy::Error>,
    ) -> AppResult<hyper::Response<hyper::body::Incoming>> {
        result.map_err(|e| AppError::transport(anyhow!(e).context("HTTP request execution failed")))
    }
}

/// Request body that fires `written` when hyper reaches its end or drops it.
struct WrittenSignal {
    inner: RequestBody,
    written: Option<oneshot::Sender<()>>,
}

impl WrittenSignal {
    fn new(inner: RequestBody, written: oneshot::Sender<()>) -> Self {
        Self {
            inner,
            written: Some(written),
        }
    }

    fn fire(&mut self) {
        if let Some(written) = self.written.take() {
            let _ = written.send(());
        }
    }
}

impl Body for WrittenSignal {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, io::Error>>> {
        let polled = Pin::new(&mut self.inner).poll_frame(cx);
        if let Poll::Ready(None) = polled {
            self.fire();
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for WrittenSignal {
    fn drop(&mut self) {
        self.fire();
    }
}

/// Adapter for converting domain requests to Hyper requests
struct RequestAdapter;

impl RequestAdapter {
    fn to_hyper_request(domain_request: Request) -> AppResult<HyperRequest<RequestBody>> {
        let method = MethodAdapter::to_hyper_method(&domain_request.method)?;
        let uri = UriAdapter::to_hyper_uri(&domain_request.url).clone();
        let body = domain_request.body.into_http_body();

        let builder = HyperRequest::builder().method(method).uri(uri);
        let builder = HeaderAdapter::add_json_headers(builder, &domain_request.api_key)?;

        builder
            .body(body)
            .map_err(|e| AppError::request(anyhow!("Failed to build HTTP request: {}", e)))
    }
}

/// Adapter for converting domain responses from Hyper responses
struct ResponseAdapter;

impl ResponseAdapter {
    async fn to_domain_response(
        hyper_response: hyper::Response<hyper::body::Incoming>,
    ) -> AppResult<Response> {
        let status = hyper_response.status();
        let body = hyper_response
            .into_body()
            .collect()
            .await
            .map_err(|e| AppError::transport(anyhow!(e).context("Failed to read response body")))?
            .to_bytes();

        debug!(%status, bytes = body.len(), "response received");
        Ok(Response { status, body })
    }
}

/// Adapter for converting domain HTTP methods to Hyper methods
struct MethodAdapter;

impl MethodAdapter {
    fn to_hyper_method(domain_method: &DomainMethod) -> AppResult<Method> {
        Ok(match domain_method {
            DomainMethod::Get => Method::GET,
            DomainMethod::Post => Method::POST,
            DomainMethod::Put => Method::PUT,
            DomainMethod::Delete => Method::DELETE,
            DomainMethod::Patch => Method::PATCH,
            DomainMethod::Head => Method::HEAD,
            DomainMethod::Options => Method::OPTIONS,
            DomainMethod::Extension(token) => Method::from_bytes(token.as_bytes())
                .map_err(|e| AppError::request(anyhow!("invalid method '{}': {}", token, e)))?,
        })
    }
}

/// Adapter for converting domain URLs to Hyper URIs
struct UriAdapter;

impl UriAdapter {
    fn to_hyper_uri(domain_url: &Url) -> &hyper::Uri {
        &domain_url.0
    }
}

/// Adapter for handling HTTP headers
struct HeaderAdapter;

impl HeaderAdapter {
    fn add_json_headers(
        builder: http::request::Builder,
        api_key: &ApiKey,
    ) -> AppResult<http::request::Builder> {
        let mut authorization = HeaderValue::from_str(&api_key.bearer())
            .map_err(|e| AppError::request(anyhow!("API key is not a valid header value: {}", e)))?;
        authorization.set_sensitive(true);

        Ok(builder
            .header(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON))
            .header(ACCEPT, HeaderValue::from_static(APPLICATION_JSON))
            .header(AUTHORIZATION, authorization))
    }
}
