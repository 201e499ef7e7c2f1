//! HMAC-SHA1 request and response signing.
//!
//! A signature is `base64(HMAC-SHA1(secret, string_to_sign))`. The string to
//! sign is either a literal (the raw `response` text of a gateway reply) or
//! the canonical encoding of a [`FormMap`]:
//!
//! ```text
//! encode(k1)=encode(v1)&encode(k2)=encode(v2)&...   keys in byte order
//! ```
//!
//! where `encode` leaves only `A-Z a-z 0-9 - _ . ~` unescaped.

use std::borrow::Cow;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::form::FormMap;

type HmacSha1 = Hmac<Sha1>;

/// Input to the signer.
#[derive(Debug, Clone, Copy)]
pub enum SignInput<'a> {
    /// Signed verbatim.
    Literal(&'a str),
    /// Signed in canonical form.
    Form(&'a FormMap),
}

impl<'a> From<&'a str> for SignInput<'a> {
    fn from(value: &'a str) -> Self {
        Self::Literal(value)
    }
}

impl<'a> From<&'a String> for SignInput<'a> {
    fn from(value: &'a String) -> Self {
        Self::Literal(value)
    }
}

impl<'a> From<&'a FormMap> for SignInput<'a> {
    fn from(value: &'a FormMap) -> Self {
        Self::Form(value)
    }
}

/// Percent-encodes a string for the canonical string to sign.
///
/// Unlike `encodeURIComponent`-style encoders, `! ' ( ) *` are escaped too.
pub fn standard_url_encode(value: &str) -> Cow<'_, str> {
    urlencoding::encode(value)
}

/// Builds the string the HMAC is computed over.
pub fn string_to_sign<'a>(input: impl Into<SignInput<'a>>) -> Cow<'a, str> {
    match input.into() {
        SignInput::Literal(text) => Cow::Borrowed(text),
        SignInput::Form(form) => Cow::Owned(
            form.iter()
                .map(|(key, value)| {
                    format!(
                        "{}={}",
                        standard_url_encode(key),
                        standard_url_encode(&value.to_string())
                    )
                })
                .collect::<Vec<_>>()
                .join("&"),
        ),
    }
}

/// Signs `input` with `secret`, returning the base64 digest.
pub fn sign<'a>(input: impl Into<SignInput<'a>>, secret: &str) -> String {
    let payload = string_to_sign(input);
    let mut mac =
        HmacSha1::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(payload.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Recomputes the signature of `input` and compares it with `expected` in
/// constant time.
pub fn verify<'a>(input: impl Into<SignInput<'a>>, secret: &str, expected: &str) -> bool {
    let computed = sign(input, secret);
    let matches: bool = computed.as_bytes().ct_eq(expected.as_bytes()).into();
    if !matches {
        debug!("signature mismatch");
    }
    matches
}
