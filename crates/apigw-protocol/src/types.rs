//! Wire-level field names, protocol metadata and reply envelopes.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use apigw_core::FormMap;

/// Identity sent in `sdk_version` with every request.
pub const SDK_VERSION: &str = concat!("RUST-SDK-", env!("CARGO_PKG_VERSION"));

/// The only signature algorithm spoken by this implementation.
pub const SIGN_TYPE_HMAC_SHA1: &str = "HmacSHA1";

/// `result_code` of a successful reply.
pub const RESULT_CODE_OK: &str = "OK";

/// `result_msg` of a successful reply built by a provider.
pub const RESULT_MSG_SUCCESS: &str = "Success";

/// Request and reply field names.
pub mod fields {
    pub const METHOD: &str = "method";
    pub const VERSION: &str = "version";
    pub const REQ_MSG_ID: &str = "req_msg_id";
    pub const REQ_TIME: &str = "req_time";
    pub const SDK_VERSION: &str = "sdk_version";
    pub const ACCESS_KEY: &str = "access_key";
    pub const SIGN_TYPE: &str = "sign_type";
    pub const SECURITY_TOKEN: &str = "security_token";
    pub const SIGN: &str = "sign";
    pub const RESPONSE: &str = "response";
    pub const RESULT_CODE: &str = "result_code";
    pub const RESULT_MSG: &str = "result_msg";
}

/// Protocol fields added to every outgoing request before signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMetadata {
    /// 32 hex characters, no separators.
    pub req_msg_id: String,
    pub req_time: DateTime<Utc>,
    pub sdk_version: String,
    pub access_key: String,
    pub sign_type: String,
    pub security_token: Option<String>,
}

impl RequestMetadata {
    /// Creates metadata with a fresh message id and the current time.
    pub fn generate(access_key: impl Into<String>) -> Self {
        Self::new(new_message_id(), Utc::now(), access_key)
    }

    pub fn new(
        req_msg_id: impl Into<String>,
        req_time: DateTime<Utc>,
        access_key: impl Into<String>,
    ) -> Self {
        Self {
            req_msg_id: req_msg_id.into(),
            req_time,
            sdk_version: SDK_VERSION.to_string(),
            access_key: access_key.into(),
            sign_type: SIGN_TYPE_HMAC_SHA1.to_string(),
            security_token: None,
        }
    }

    /// Sets the temporary-credential security token.
    pub fn with_security_token(mut self, token: Option<String>) -> Self {
        self.security_token = token;
        self
    }

    /// Formats `req_time` as ISO-8601 UTC with millisecond precision.
    pub fn req_time_string(&self) -> String {
        self.req_time.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Writes the metadata fields into `form`, replacing caller values with
    /// the same names.
    pub fn apply(&self, form: &mut FormMap) {
        form.insert(fields::REQ_MSG_ID, self.req_msg_id.as_str());
        form.insert(fields::REQ_TIME, self.req_time_string());
        form.insert(fields::SDK_VERSION, self.sdk_version.as_str());
        form.insert(fields::ACCESS_KEY, self.access_key.as_str());
        form.insert(fields::SIGN_TYPE, self.sign_type.as_str());
        if let Some(ref token) = self.security_token {
            form.insert(fields::SECURITY_TOKEN, token.as_str());
        }
    }
}

/// Generates a random request message id.
pub fn new_message_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Returns true if a reply payload reports success.
pub fn is_success_response(response: &Value) -> bool {
    response.get(fields::RESULT_CODE).and_then(Value::as_str) == Some(RESULT_CODE_OK)
}

/// Outer reply structure: `{"response": ..., "sign": ...}`.
///
/// Error replies carry no signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope<T> {
    pub response: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign: Option<String>,
}

/// Payload of an error reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub req_msg_id: String,
    pub result_code: String,
    pub result_msg: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use apigw_core::Scalar;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn message_id_is_plain_hex() {
        let id = new_message_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(id, new_message_id());
    }

    #[test]
    fn req_time_is_iso8601_utc() {
        let time = Utc.with_ymd_and_hms(2018, 3, 21, 3, 41, 59).unwrap();
        let meta = RequestMetadata::new("id", time, "ak");
        assert_eq!(meta.req_time_string(), "2018-03-21T03:41:59.000Z");
    }

    #[test]
    fn apply_writes_protocol_fields() {
        let time = Utc.with_ymd_and_hms(2018, 3, 21, 3, 41, 59).unwrap();
        let meta = RequestMetadata::new("c60a76d67f57431c89d3d046e7f84a40", time, "ak")
            .with_security_token(Some("token".to_string()));

        let mut form = FormMap::new();
        form.insert("access_key", "caller-value");
        meta.apply(&mut form);

        assert_eq!(form.get(fields::ACCESS_KEY), Some(&Scalar::from("ak")));
        assert_eq!(form.get(fields::SIGN_TYPE), Some(&Scalar::from("HmacSHA1")));
        assert_eq!(form.get(fields::SECURITY_TOKEN), Some(&Scalar::from("token")));
        assert_eq!(form.get(fields::SDK_VERSION), Some(&Scalar::from(SDK_VERSION)));
        assert_eq!(form.len(), 6);
    }

    #[test]
    fn security_token_is_optional() {
        let mut form = FormMap::new();
        RequestMetadata::generate("ak").apply(&mut form);
        assert!(!form.contains_key(fields::SECURITY_TOKEN));
        assert_eq!(form.len(), 5);
    }

    #[test]
    fn success_detection() {
        assert!(is_success_response(&json!({"result_code": "OK", "a": 1})));
        assert!(!is_success_response(&json!({"a": 1})));
        assert!(!is_success_response(&json!({"result_code": "ERR"})));
    }
}
