//! Canonical form encoding, HMAC signing and signed-response extraction
//!
//! These are the pure building blocks of the gateway protocol. Nothing here
//! performs I/O or holds state; every function can be called concurrently.

pub mod extract;
pub mod form;
pub mod sign;
pub mod tracing;

pub use extract::{RESPONSE_FIELD, SIGN_FIELD, extract_response_to_sign};
pub use form::{FormMap, MAX_ARRAY_INDEX, PATH_SEPARATOR, Scalar, flatten, unflatten};
pub use sign::{SignInput, sign, standard_url_encode, string_to_sign, verify};
pub use self::tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
