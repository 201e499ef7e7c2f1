//! Gateway envelopes: signed requests, verified responses, provider replies.
//!
//! # Request
//!
//! Requests are `application/x-www-form-urlencoded` POST bodies. Nested
//! parameters are flattened to dotted keys and the protocol fields are
//! added before signing:
//!
//! | field            | value                                   |
//! |------------------|-----------------------------------------|
//! | `req_msg_id`     | 32 random hex characters                |
//! | `req_time`       | ISO-8601 UTC timestamp                  |
//! | `sdk_version`    | [`SDK_VERSION`]                         |
//! | `access_key`     | caller's access key                     |
//! | `sign_type`      | [`SIGN_TYPE_HMAC_SHA1`]                 |
//! | `security_token` | optional                                |
//! | `sign`           | HMAC over all of the above and params   |
//!
//! # Response
//!
//! ```text
//! {"response": {..., "result_code": "OK", "result_msg": "..."}, "sign": "<base64>"}
//! ```
//!
//! The signature covers the `response` text exactly as sent.
//!
//! # Example
//!
//! ```rust
//! use apigw_protocol::{RequestMetadata, build_request, validate_request_and_deserialize};
//! use serde_json::json;
//!
//! let params = json!({"method": "demo.echo", "version": "1.0", "tags": ["a", "b"]});
//! let form = build_request(&params, &RequestMetadata::generate("ak"), "secret").unwrap();
//! assert_eq!(form.get("tags.2").unwrap().to_string(), "b");
//!
//! let received = validate_request_and_deserialize(form, "secret").unwrap();
//! assert_eq!(received["tags"], json!(["a", "b"]));
//! ```

mod envelope;
mod error;
mod types;

pub use envelope::{
    ValidatedRequest, build_error_response, build_request, build_success_response,
    error_response_for, parse_response, validate_request_and_deserialize, validate_request_sign,
};
pub use error::{
    ClientError, ClientErrorCode, ClientResult, ProviderError, ProviderErrorCode, ProviderResult,
};
pub use types::{
    ErrorPayload, RESULT_CODE_OK, RESULT_MSG_SUCCESS, RequestMetadata, ResponseEnvelope,
    SDK_VERSION, SIGN_TYPE_HMAC_SHA1, fields, is_success_response, new_message_id,
};
