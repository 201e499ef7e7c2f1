//! Error types for both sides of the gateway protocol.
//!
//! [`ClientError`] is what a caller of the gateway sees: the request could
//! not be delivered, the reply was malformed, or its signature did not hold.
//! [`ProviderError`] is raised while serving a gateway request and is meant
//! to be turned into an error envelope with
//! [`build_error_response`](crate::build_error_response).

use std::fmt;
use thiserror::Error;

/// The category of a client-side error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientErrorCode {
    /// Connection failed or the gateway reply was not a valid envelope.
    TransportError,
    /// The reply signature is missing or does not match.
    BadSignature,
    /// The request or client configuration is incomplete.
    InvalidArgument,
}

impl ClientErrorCode {
    /// Returns true if repeating the call may succeed.
    ///
    /// Nothing in this workspace retries; the flag is for callers that do.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransportError)
    }

    /// Returns the machine-readable code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TransportError => "SDK_TRANSPORT_ERROR",
            Self::BadSignature => "SDK_BAD_SIGNATURE",
            Self::InvalidArgument => "SDK_INVALID_ARGUMENT",
        }
    }
}

impl fmt::Display for ClientErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error surfaced to code calling the gateway.
#[derive(Debug, Error)]
pub struct ClientError {
    code: ClientErrorCode,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ClientError {
    pub fn new(code: ClientErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ClientErrorCode::TransportError, message)
    }

    /// Creates a bad signature error.
    pub fn bad_signature(message: impl Into<String>) -> Self {
        Self::new(ClientErrorCode::BadSignature, message)
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ClientErrorCode::InvalidArgument, message)
    }

    /// Sets the underlying cause.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ClientErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// The category of a provider-side error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// Required signed fields are missing from the request.
    InvalidParameter,
    /// The request signature does not match.
    BadSignature,
    /// The reply could not be produced.
    Internal,
}

impl ProviderErrorCode {
    /// Returns the machine-readable code, also used as `result_code` in
    /// error envelopes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidParameter => "PROVIDER_INVALID_PARAMETER",
            Self::BadSignature => "PROVIDER_BAD_SIGNATURE",
            Self::Internal => "PROVIDER_INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error raised while serving a gateway request.
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Creates an invalid parameter error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidParameter, message)
    }

    /// Creates a bad signature error.
    pub fn bad_signature(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::BadSignature, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Internal, message)
    }

    /// Sets the underlying cause.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Result type for client-side operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type for provider-side operations.
pub type ProviderResult<T> = Result<T, ProviderError>;
