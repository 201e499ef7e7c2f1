//! Building and checking signed gateway envelopes.
//!
//! Client side:
//! - [`build_request`] flattens the caller's parameters, adds the protocol
//!   metadata and appends `sign`.
//! - [`parse_response`] checks a raw reply and returns its `response` payload.
//!
//! Provider side:
//! - [`validate_request_and_deserialize`] checks an inbound form and rebuilds
//!   the nested parameters.
//! - [`build_success_response`] and [`build_error_response`] produce reply
//!   bodies.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use apigw_core::{FormMap, extract_response_to_sign, flatten, sign, unflatten, verify};

use crate::error::{ClientError, ClientResult, ProviderError, ProviderResult};
use crate::types::{
    ErrorPayload, RESULT_CODE_OK, RESULT_MSG_SUCCESS, RequestMetadata, ResponseEnvelope, fields,
    is_success_response,
};

/// Builds the signed form for an outgoing request.
///
/// `params` must be an object carrying non-empty `method` and `version`
/// strings. The metadata overrides caller fields of the same name and the
/// signature covers every other field.
///
/// # Errors
///
/// Returns an invalid argument error when `params` is not an object or lacks
/// `method`/`version`.
pub fn build_request(
    params: &Value,
    metadata: &RequestMetadata,
    secret: &str,
) -> ClientResult<FormMap> {
    if !params.is_object() {
        return Err(ClientError::invalid_argument(
            "request parameters must be an object",
        ));
    }
    for required in [fields::METHOD, fields::VERSION] {
        let present = params
            .get(required)
            .and_then(Value::as_str)
            .is_some_and(|s| !s.is_empty());
        if !present {
            return Err(ClientError::invalid_argument(format!(
                "{} can't be empty",
                required
            )));
        }
    }

    let mut form = flatten(params);
    metadata.apply(&mut form);
    let signature = sign(&form, secret);
    form.insert(fields::SIGN, signature);
    Ok(form)
}

/// Checks a raw gateway reply and returns its `response` payload.
///
/// When the payload reports success and `check_sign` is set, the `sign`
/// field must match the HMAC of the `response` text exactly as received.
/// Failed replies (`result_code` other than `OK`) are returned unverified;
/// gateways do not sign them.
///
/// # Errors
///
/// - transport error: the body is not JSON or has no `response` object
/// - bad signature: the signature is empty, cannot be located, or differs
pub fn parse_response(body: &str, secret: &str, check_sign: bool) -> ClientResult<Value> {
    let unexpected = || ClientError::transport(format!("Unexpected gateway response: {}", body));

    let mut envelope: Value = serde_json::from_str(body).map_err(|e| unexpected().with_source(e))?;
    let response = match envelope.get_mut(fields::RESPONSE).map(Value::take) {
        Some(response @ Value::Object(_)) => response,
        _ => return Err(unexpected()),
    };

    if check_sign && is_success_response(&response) {
        let signature = envelope
            .get(fields::SIGN)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ClientError::bad_signature("Empty signature in response"))?;

        let signed_text = extract_response_to_sign(body).ok_or_else(|| {
            ClientError::bad_signature("Unable to locate signed content in response")
        })?;

        if !verify(signed_text, secret, signature) {
            warn!("gateway response signature mismatch");
            return Err(ClientError::bad_signature("Invalid signature in response"));
        }
        debug!("gateway response signature verified");
    }

    Ok(response)
}

/// An inbound request whose signature has been checked.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    /// The signature the request carried.
    pub sign: String,
    /// Every field except `sign`.
    pub params: FormMap,
}

/// Checks the signature of an inbound gateway request.
///
/// # Errors
///
/// - invalid parameter: `sign_type` or `sign` is missing
/// - bad signature: the signature does not match the remaining fields
pub fn validate_request_sign(mut params: FormMap, secret: &str) -> ProviderResult<ValidatedRequest> {
    if !params.contains_key(fields::SIGN_TYPE) || !params.contains_key(fields::SIGN) {
        return Err(ProviderError::invalid_parameter(
            "Gateway request params is invalid",
        ));
    }

    let sign = params
        .remove(fields::SIGN)
        .map(|s| s.to_string())
        .unwrap_or_default();

    if !verify(&params, secret, &sign) {
        warn!("gateway request signature mismatch");
        return Err(ProviderError::bad_signature(
            "The signature of gateway request params is invalid",
        ));
    }

    Ok(ValidatedRequest { sign, params })
}

/// Checks an inbound request and rebuilds its nested parameters.
///
/// The result includes the protocol fields (`req_msg_id`, `sign_type`, ...)
/// alongside the business parameters; only `sign` is removed.
pub fn validate_request_and_deserialize(params: FormMap, secret: &str) -> ProviderResult<Value> {
    let validated = validate_request_sign(params, secret)?;
    Ok(unflatten(&validated.params))
}

/// Builds a signed success reply.
///
/// `req_msg_id`, `result_code` and `result_msg` are added to `data`, which
/// is then signed over its compact JSON text and wrapped as
/// `{"response": data, "sign": ...}`.
pub fn build_success_response(
    mut data: Map<String, Value>,
    req_msg_id: &str,
    secret: &str,
) -> ProviderResult<String> {
    data.insert(fields::REQ_MSG_ID.to_string(), Value::from(req_msg_id));
    data.insert(fields::RESULT_CODE.to_string(), Value::from(RESULT_CODE_OK));
    data.insert(
        fields::RESULT_MSG.to_string(),
        Value::from(RESULT_MSG_SUCCESS),
    );

    let response = Value::Object(data);
    let text = to_json(&response)?;
    let envelope = ResponseEnvelope {
        response,
        sign: Some(sign(&text, secret)),
    };
    to_json(&envelope)
}

/// Builds an unsigned error reply.
pub fn build_error_response(
    req_msg_id: &str,
    error_code: &str,
    error_msg: &str,
) -> ProviderResult<String> {
    let envelope = ResponseEnvelope {
        response: ErrorPayload {
            req_msg_id: req_msg_id.to_string(),
            result_code: error_code.to_string(),
            result_msg: error_msg.to_string(),
        },
        sign: None,
    };
    to_json(&envelope)
}

/// Builds an error reply from a provider error.
pub fn error_response_for(req_msg_id: &str, error: &ProviderError) -> ProviderResult<String> {
    build_error_response(req_msg_id, error.code().as_str(), error.message())
}

fn to_json<T: serde::Serialize>(value: &T) -> ProviderResult<String> {
    serde_json::to_string(value)
        .map_err(|e| ProviderError::internal("failed to serialize response").with_source(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ClientErrorCode, ProviderErrorCode};
    use apigw_core::Scalar;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    const ACCESS_KEY: &str = "LTAIyqaeoWfELqMg";
    const SECRET: &str = "BXXb9KtxtWtoOGui88kcu0m6h6crjW";

    fn gateway_request() -> FormMap {
        [
            ("method", Scalar::from("antcloud.acm.tenant.get")),
            ("req_msg_id", Scalar::from("c60a76d67f57431c89d3d046e7f84a40")),
            ("access_key", Scalar::from(ACCESS_KEY)),
            ("version", Scalar::from("1.0")),
            ("sign_type", Scalar::from("HmacSHA1")),
            ("tenant", Scalar::from("tenant")),
            ("req_time", Scalar::from("2018-03-21T03:41:59Z")),
            ("input_string", Scalar::from("hello")),
            ("input_num", Scalar::from(123i64)),
            ("input_arr.1", Scalar::from("a")),
            ("input_arr.2", Scalar::from("b")),
            ("input_arr.3", Scalar::from("c")),
        ]
        .into_iter()
        .collect()
    }

    fn metadata() -> RequestMetadata {
        let time = Utc.with_ymd_and_hms(2018, 3, 21, 3, 41, 59).unwrap();
        RequestMetadata::new("c60a76d67f57431c89d3d046e7f84a40", time, ACCESS_KEY)
    }

    #[test]
    fn validate_and_deserialize_signed_request() {
        let mut params = gateway_request();
        params.insert("sign", "1dFTKHohI8nkmQNSLH5eRxyJoBk=");

        let value = validate_request_and_deserialize(params, SECRET).unwrap();
        assert_eq!(
            value,
            json!({
                "method": "antcloud.acm.tenant.get",
                "req_msg_id": "c60a76d67f57431c89d3d046e7f84a40",
                "access_key": ACCESS_KEY,
                "version": "1.0",
                "sign_type": "HmacSHA1",
                "tenant": "tenant",
                "req_time": "2018-03-21T03:41:59Z",
                "input_string": "hello",
                "input_num": 123,
                "input_arr": ["a", "b", "c"]
            })
        );
    }

    #[test]
    fn validate_rejects_missing_sign_type() {
        let mut params = gateway_request();
        params.remove("sign_type");
        params.insert("sign", "1dFTKHohI8nkmQNSLH5eRxyJoBk=");

        let err = validate_request_and_deserialize(params, SECRET).unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::InvalidParameter);
    }

    #[test]
    fn validate_rejects_missing_sign() {
        let err = validate_request_sign(gateway_request(), SECRET).unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::InvalidParameter);
    }

    #[test]
    fn validate_rejects_wrong_sign() {
        let mut params = gateway_request();
        params.insert("sign", "aaaa");

        let err = validate_request_and_deserialize(params, SECRET).unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::BadSignature);
    }

    #[test]
    fn validate_accepts_urlencoded_body() {
        let mut params = gateway_request();
        params.insert("sign", "1dFTKHohI8nkmQNSLH5eRxyJoBk=");
        let body = params.to_urlencoded();

        let validated = validate_request_sign(FormMap::from_urlencoded(&body), SECRET).unwrap();
        assert_eq!(validated.sign, "1dFTKHohI8nkmQNSLH5eRxyJoBk=");
        assert!(!validated.params.contains_key("sign"));
    }

    #[test]
    fn build_request_signs_all_fields() {
        let params = json!({
            "method": "antcloud.demo.gateway.check.echo",
            "version": "1.0",
            "input_string": "hello world",
            "input_demo": {"some_boolean": true, "some_int": 123, "some_list": ["hello", "world"]}
        });

        let form = build_request(&params, &metadata(), SECRET).unwrap();

        assert_eq!(form.get("input_demo.some_list.2"), Some(&Scalar::from("world")));
        assert_eq!(form.get("input_demo.some_boolean"), Some(&Scalar::from(true)));
        assert_eq!(form.get("req_time"), Some(&Scalar::from("2018-03-21T03:41:59.000Z")));

        let validated = validate_request_and_deserialize(form, SECRET).unwrap();
        assert_eq!(validated["input_demo"], params["input_demo"]);
        assert_eq!(validated["sdk_version"], json!(crate::SDK_VERSION));
    }

    #[test]
    fn signed_request_with_huge_index_drops_the_key() {
        let params = json!({
            "method": "antcloud.demo.gateway.check.echo",
            "version": "1.0",
            "items": {"1": "kept", "18446744073709551615": "x"}
        });
        let form = build_request(&params, &metadata(), SECRET).unwrap();
        assert!(form.contains_key("items.18446744073709551615"));

        let validated = validate_request_and_deserialize(form, SECRET).unwrap();
        assert_eq!(validated["items"], json!(["kept"]));
    }

    #[test]
    fn build_request_requires_method_and_version() {
        let err = build_request(&json!({"version": "1.0"}), &metadata(), SECRET).unwrap_err();
        assert_eq!(err.code(), ClientErrorCode::InvalidArgument);
        assert!(err.message().contains("method"));

        let err = build_request(&json!({"method": "m", "version": ""}), &metadata(), SECRET)
            .unwrap_err();
        assert!(err.message().contains("version"));

        let err = build_request(&json!(["m"]), &metadata(), SECRET).unwrap_err();
        assert_eq!(err.code(), ClientErrorCode::InvalidArgument);
    }

    #[test]
    fn success_response_roundtrip() {
        let data = json!({"output_string": "hello world", "items": [1, 2]});
        let Value::Object(data) = data else { unreachable!() };

        let body = build_success_response(data, "msg-1", SECRET).unwrap();
        let response = parse_response(&body, SECRET, true).unwrap();

        assert_eq!(response["output_string"], "hello world");
        assert_eq!(response["req_msg_id"], "msg-1");
        assert_eq!(response["result_code"], "OK");
        assert_eq!(response["result_msg"], "Success");
    }

    #[test]
    fn parse_response_verifies_padded_body() {
        let text = "{\"output\":\"x\",\n  \"result_code\":\"OK\"}";
        let body = format!(
            "{{\"response\":{},  \"sign\":\"{}\"}}",
            text,
            sign(text, SECRET)
        );
        let response = parse_response(&body, SECRET, true).unwrap();
        assert_eq!(response, json!({"output": "x", "result_code": "OK"}));
    }

    #[test]
    fn parse_response_rejects_tampered_body() {
        let body = build_success_response(Map::new(), "msg-1", SECRET).unwrap();
        let tampered = body.replace("Success", "Failure");

        let err = parse_response(&tampered, SECRET, true).unwrap_err();
        assert_eq!(err.code(), ClientErrorCode::BadSignature);

        // Unchecked mode hands the payload back as-is.
        let response = parse_response(&tampered, SECRET, false).unwrap();
        assert_eq!(response["result_msg"], "Failure");
    }

    #[test]
    fn parse_response_requires_signature_on_success() {
        let body = r#"{"response":{"result_code":"OK"}}"#;
        let err = parse_response(body, SECRET, true).unwrap_err();
        assert_eq!(err.code(), ClientErrorCode::BadSignature);
        assert_eq!(err.message(), "Empty signature in response");

        let body = r#"{"response":{"result_code":"OK"},"sign":""}"#;
        let err = parse_response(body, SECRET, true).unwrap_err();
        assert_eq!(err.code(), ClientErrorCode::BadSignature);
    }

    #[test]
    fn parse_response_passes_unsigned_failures() {
        let body = build_error_response("msg-1", "PROVIDER_BAD_SIGNATURE", "bad").unwrap();
        let response = parse_response(&body, SECRET, true).unwrap();
        assert_eq!(response["result_code"], "PROVIDER_BAD_SIGNATURE");
    }

    #[test]
    fn parse_response_rejects_malformed_envelopes() {
        for body in ["", "not json", "{}", r#"{"response":null}"#, r#"{"response":"x"}"#] {
            let err = parse_response(body, SECRET, true).unwrap_err();
            assert_eq!(err.code(), ClientErrorCode::TransportError, "body: {:?}", body);
        }
    }

    #[test]
    fn error_response_shape() {
        let err = ProviderError::bad_signature("The signature of gateway request params is invalid");
        let body = error_response_for("c60a76d67f57431c89d3d046e7f84a40", &err).unwrap();
        insta::assert_snapshot!(
            body,
            @r#"{"response":{"req_msg_id":"c60a76d67f57431c89d3d046e7f84a40","result_code":"PROVIDER_BAD_SIGNATURE","result_msg":"The signature of gateway request params is invalid"}}"#
        );
    }
}
