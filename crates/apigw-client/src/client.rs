//! Async gateway client.
//!
//! ```ignore
//! use apigw_client::{ClientConfig, GatewayClient};
//! use serde_json::json;
//!
//! let config = ClientConfig::new("https://gw.example.com/gateway.do", "ak", "env::APIGW_SECRET");
//! let client = GatewayClient::from_config(config)?;
//! let response = client
//!     .execute(&json!({"method": "demo.gateway.check.echo", "version": "1.0", "input": "hi"}))
//!     .await?;
//! ```

use serde_json::Value;
use tracing::{debug, warn};

use apigw_core::FormMap;
use apigw_protocol::{
    ClientError, ClientResult, RequestMetadata, build_request, fields, parse_response,
};

use crate::config::{ClientConfig, Credentials};
use crate::transport::{HttpMethod, HttpRequest, ReqwestTransport, Transport, TransportError};

/// Per-call options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecuteOptions {
    /// Overrides the configured `check_response_sign`.
    pub check_response_sign: Option<bool>,
    pub http_method: HttpMethod,
}

impl ExecuteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_check_response_sign(mut self, check: bool) -> Self {
        self.check_response_sign = Some(check);
        self
    }

    pub fn with_http_method(mut self, method: HttpMethod) -> Self {
        self.http_method = method;
        self
    }
}

/// Client for a signing API gateway.
pub struct GatewayClient<T = ReqwestTransport> {
    endpoint: String,
    credentials: Credentials,
    check_response_sign: bool,
    transport: T,
}

impl GatewayClient<ReqwestTransport> {
    /// Creates a client using the reqwest transport.
    ///
    /// # Errors
    ///
    /// Returns an invalid argument error for incomplete configuration or
    /// unresolvable secrets, and a transport error if the HTTP client
    /// cannot be built.
    pub fn from_config(config: ClientConfig) -> ClientResult<Self> {
        let user_agent = config
            .user_agent
            .clone()
            .unwrap_or_else(ReqwestTransport::default_user_agent);
        let transport = ReqwestTransport::new(config.timeout_duration(), &user_agent).map_err(
            |e| ClientError::transport("Failed to create HTTP client").with_source(e),
        )?;
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> GatewayClient<T> {
    /// Creates a client over a custom transport.
    pub fn with_transport(config: ClientConfig, transport: T) -> ClientResult<Self> {
        config.validate().map_err(ClientError::invalid_argument)?;
        let credentials = config
            .resolve_credentials()
            .map_err(ClientError::invalid_argument)?;

        Ok(Self {
            endpoint: config.normalized_endpoint().to_string(),
            credentials,
            check_response_sign: config.check_response_sign,
            transport,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn access_key(&self) -> &str {
        &self.credentials.access_key
    }

    /// Builds the signed form for `params` with fresh metadata.
    pub fn prepare(&self, params: &Value) -> ClientResult<FormMap> {
        let metadata = RequestMetadata::generate(self.credentials.access_key.as_str())
            .with_security_token(self.credentials.security_token.clone());
        build_request(params, &metadata, &self.credentials.access_secret)
    }

    /// Calls the gateway and returns the verified `response` payload.
    pub async fn execute(&self, params: &Value) -> ClientResult<Value> {
        self.execute_with(params, &ExecuteOptions::default()).await
    }

    /// Calls the gateway with per-call options.
    ///
    /// # Errors
    ///
    /// - invalid argument: `params` is not an object or lacks `method`/`version`
    /// - transport error: the call failed or the reply is not an envelope
    /// - bad signature: the reply signature is missing or wrong
    pub async fn execute_with(
        &self,
        params: &Value,
        options: &ExecuteOptions,
    ) -> ClientResult<Value> {
        let body = self.execute_raw(params, options).await?;
        let check = options
            .check_response_sign
            .unwrap_or(self.check_response_sign);
        parse_response(&body, &self.credentials.access_secret, check)
    }

    /// Calls the gateway and returns the reply body without parsing or
    /// verifying it.
    pub async fn execute_raw(&self, params: &Value, options: &ExecuteOptions) -> ClientResult<String> {
        let form = self.prepare(params)?;
        let request = HttpRequest::form(options.http_method, form.to_urlencoded());

        debug!(
            method = %params[fields::METHOD],
            req_msg_id = %form.get(fields::REQ_MSG_ID).map(|v| v.to_string()).unwrap_or_default(),
            "Calling gateway"
        );

        let bytes = match self.transport.send(&self.endpoint, request).await {
            Ok(bytes) => bytes,
            // Gateways may answer an error envelope with a 4xx/5xx status.
            Err(TransportError::Status { status, body }) if is_envelope(&body) => {
                debug!(status = %status, "Gateway returned an envelope with an error status");
                body.into_bytes()
            }
            Err(e) => {
                warn!(error = %e, "Gateway call failed");
                return Err(
                    ClientError::transport(format!("Server connect error, msg: {}", e))
                        .with_source(e),
                );
            }
        };

        String::from_utf8(bytes).map_err(|e| {
            ClientError::transport("Gateway response is not valid UTF-8").with_source(e)
        })
    }
}

/// Returns true if `body` is a JSON object with a `response` object.
fn is_envelope(body: &str) -> bool {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|envelope| envelope.get(fields::RESPONSE).map(Value::is_object))
        .unwrap_or(false)
}
