//! HTTP transport for gateway calls.
//!
//! The [`Transport`] trait is the only place bytes leave the process. The
//! default implementation uses reqwest; tests substitute an in-memory one.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use thiserror::Error;
use tracing::{trace, warn};

/// Content type of every gateway request body.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// A boxed future so [`Transport`] stays object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors raised while exchanging bytes with the gateway.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection, TLS, timeout or body read failure.
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    /// The gateway answered with a non-success HTTP status.
    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// Any other failure reported by a custom transport.
    #[error("{0}")]
    Other(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// HTTP method used for gateway calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
}

impl HttpMethod {
    fn as_reqwest(self) -> Method {
        match self {
            Self::Get => Method::GET,
            Self::Post => Method::POST,
        }
    }
}

/// An encoded gateway request ready for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub content_type: String,
    /// `application/x-www-form-urlencoded` form fields.
    pub form_body: String,
}

impl HttpRequest {
    /// Creates a form request.
    pub fn form(method: HttpMethod, form_body: impl Into<String>) -> Self {
        Self {
            method,
            content_type: FORM_CONTENT_TYPE.to_string(),
            form_body: form_body.into(),
        }
    }

    /// Returns the URL to call: GET requests carry the form in the query.
    pub fn url_for(&self, endpoint: &str) -> String {
        match self.method {
            HttpMethod::Post => endpoint.to_string(),
            HttpMethod::Get if self.form_body.is_empty() => endpoint.to_string(),
            HttpMethod::Get => {
                let separator = if endpoint.contains('?') { '&' } else { '?' };
                format!("{}{}{}", endpoint, separator, self.form_body)
            }
        }
    }
}

/// Sends an encoded request and returns the raw reply body.
pub trait Transport: Send + Sync {
    fn send<'a>(
        &'a self,
        endpoint: &'a str,
        request: HttpRequest,
    ) -> BoxFuture<'a, TransportResult<Vec<u8>>>;
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Creates a transport with the given timeout and user agent.
    pub fn new(timeout: Duration, user_agent: &str) -> TransportResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// Default user agent string.
    pub fn default_user_agent() -> String {
        format!("apigw/{}", env!("CARGO_PKG_VERSION"))
    }
}

impl Transport for ReqwestTransport {
    fn send<'a>(
        &'a self,
        endpoint: &'a str,
        request: HttpRequest,
    ) -> BoxFuture<'a, TransportResult<Vec<u8>>> {
        Box::pin(async move {
            let url = request.url_for(endpoint);
            let mut builder = self.client.request(request.method.as_reqwest(), &url);
            if request.method == HttpMethod::Post {
                builder = builder
                    .header(reqwest::header::CONTENT_TYPE, request.content_type)
                    .body(request.form_body);
            }

            trace!(method = ?request.method, endpoint = %endpoint, "Sending gateway request");
            let response = builder.send().await?;

            let status = response.status();
            trace!(status = %status, "Received gateway response");
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                warn!(status = %status, "Gateway returned an error status");
                return Err(TransportError::Status { status, body });
            }

            Ok(response.bytes().await?.to_vec())
        })
    }
}
