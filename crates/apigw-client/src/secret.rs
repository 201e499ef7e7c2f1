//! Secret references in the configuration.
//!
//! `access_secret` and `security_token` hold either the secret itself or a
//! reference of the form `env::NAME`, read from the environment when the
//! client is built:
//!
//! ```toml
//! access_secret = "env::APIGW_ACCESS_SECRET"
//! ```

use std::env::VarError;

use thiserror::Error;

/// Prefix marking an environment variable reference.
pub const ENV_PREFIX: &str = "env::";

/// Errors raised while resolving a secret reference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecretError {
    #[error("`{ENV_PREFIX}` reference has no variable name")]
    EmptyName,

    #[error("environment variable `{0}` is not set")]
    MissingVar(String),

    #[error("environment variable `{0}` is not valid unicode")]
    NotUnicode(String),
}

/// Where a configured secret comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretSource<'a> {
    /// The value is the secret.
    Inline(&'a str),
    /// Name of the environment variable holding the secret.
    Env(&'a str),
}

impl<'a> SecretSource<'a> {
    pub fn parse(value: &'a str) -> Self {
        match value.strip_prefix(ENV_PREFIX) {
            Some(name) => Self::Env(name),
            None => Self::Inline(value),
        }
    }

    pub fn is_reference(self) -> bool {
        matches!(self, Self::Env(_))
    }

    pub fn resolve(self) -> Result<String, SecretError> {
        match self {
            Self::Inline(value) => Ok(value.to_string()),
            Self::Env("") => Err(SecretError::EmptyName),
            Self::Env(name) => std::env::var(name).map_err(|e| match e {
                VarError::NotPresent => SecretError::MissingVar(name.to_string()),
                VarError::NotUnicode(_) => SecretError::NotUnicode(name.to_string()),
            }),
        }
    }
}

/// Resolves a configured value that may be a secret reference.
pub fn resolve(value: &str) -> Result<String, SecretError> {
    SecretSource::parse(value).resolve()
}

/// Returns true if the value is a reference rather than the secret itself.
pub fn is_reference(value: &str) -> bool {
    SecretSource::parse(value).is_reference()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_values_pass_through() {
        assert_eq!(
            SecretSource::parse("BXXb9KtxtWtoOGui88kcu0m6h6crjW"),
            SecretSource::Inline("BXXb9KtxtWtoOGui88kcu0m6h6crjW")
        );
        assert_eq!(resolve("BXXb9KtxtWtoOGui88kcu0m6h6crjW").unwrap(), "BXXb9KtxtWtoOGui88kcu0m6h6crjW");
        assert_eq!(resolve("").unwrap(), "");
        assert!(!is_reference("plain"));
        // Only the exact prefix is a reference.
        assert!(!is_reference("ENV::X"));
        assert!(!is_reference("pass::gw/secret"));
    }

    #[test]
    fn env_reference_resolves() {
        unsafe {
            std::env::set_var("_APIGW_TEST_ACCESS_SECRET", "from-env");
        }
        assert_eq!(
            SecretSource::parse("env::_APIGW_TEST_ACCESS_SECRET"),
            SecretSource::Env("_APIGW_TEST_ACCESS_SECRET")
        );
        assert!(is_reference("env::_APIGW_TEST_ACCESS_SECRET"));
        assert_eq!(resolve("env::_APIGW_TEST_ACCESS_SECRET").unwrap(), "from-env");
        unsafe {
            std::env::remove_var("_APIGW_TEST_ACCESS_SECRET");
        }
    }

    #[test]
    fn env_reference_errors() {
        assert_eq!(
            resolve("env::_APIGW_NONEXISTENT_VAR_12345"),
            Err(SecretError::MissingVar("_APIGW_NONEXISTENT_VAR_12345".to_string()))
        );
        assert_eq!(resolve("env::"), Err(SecretError::EmptyName));
        assert_eq!(
            SecretError::MissingVar("X".to_string()).to_string(),
            "environment variable `X` is not set"
        );
    }
}
