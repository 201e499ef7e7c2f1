//! Client configuration.
//!
//! Settings live in `~/.config/apigw/config.toml` by default:
//!
//! ```toml
//! endpoint = "https://gateway.example.com/gateway.do"
//! access_key = "LTAIyqaeoWfELqMg"
//! access_secret = "env::APIGW_ACCESS_SECRET"
//! check_response_sign = true
//! timeout = 30
//! ```
//!
//! `access_secret` and `security_token` accept secret references, see
//! [`crate::secret`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::secret;

/// Configuration for the gateway client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Gateway URL requests are posted to.
    pub endpoint: String,

    pub access_key: String,

    /// Shared HMAC secret, plain or a secret reference.
    pub access_secret: String,

    /// Temporary-credential token, plain or a secret reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_token: Option<String>,

    /// Verify the signature of successful replies.
    pub check_response_sign: bool,

    /// Request timeout in seconds.
    pub timeout: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_key: String::new(),
            access_secret: String::new(),
            security_token: None,
            check_response_sign: true,
            timeout: Self::DEFAULT_TIMEOUT_SECS,
            user_agent: None,
        }
    }
}

/// Credentials with every secret reference resolved.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key: String,
    pub access_secret: String,
    pub security_token: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("access_secret", &"<redacted>")
            .field("security_token", &self.security_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ClientConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Creates a configuration with the required settings.
    pub fn new(
        endpoint: impl Into<String>,
        access_key: impl Into<String>,
        access_secret: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            access_key: access_key.into(),
            access_secret: access_secret.into(),
            ..Self::default()
        }
    }

    pub fn with_security_token(mut self, token: impl Into<String>) -> Self {
        self.security_token = Some(token.into());
        self
    }

    pub fn with_check_response_sign(mut self, check: bool) -> Self {
        self.check_response_sign = check;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout.as_secs();
        self
    }

    /// Loads configuration from the default path, falling back to defaults
    /// when the file does not exist.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("failed to read config: {}", e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("apigw")
    }

    /// Returns the endpoint without a trailing `/`.
    pub fn normalized_endpoint(&self) -> &str {
        self.endpoint.strip_suffix('/').unwrap_or(&self.endpoint)
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Checks that the required settings are present and the endpoint is a
    /// URL. Secret references are not resolved.
    pub fn validate(&self) -> Result<(), String> {
        if self.endpoint.trim().is_empty() {
            return Err("endpoint can't be empty".to_string());
        }
        Url::parse(self.normalized_endpoint())
            .map_err(|e| format!("invalid endpoint `{}`: {}", self.endpoint, e))?;
        if self.access_key.trim().is_empty() {
            return Err("access_key can't be empty".to_string());
        }
        if self.access_secret.is_empty() {
            return Err("access_secret can't be empty".to_string());
        }
        Ok(())
    }

    /// Resolves secret references into usable credentials.
    pub fn resolve_credentials(&self) -> Result<Credentials, String> {
        let access_secret = secret::resolve(&self.access_secret)
            .map_err(|e| format!("access_secret: {}", e))?;
        if access_secret.is_empty() {
            return Err("access_secret resolved to an empty value".to_string());
        }
        let security_token = self
            .security_token
            .as_deref()
            .map(secret::resolve)
            .transpose()
            .map_err(|e| format!("security_token: {}", e))?;

        Ok(Credentials {
            access_key: self.access_key.clone(),
            access_secret,
            security_token,
        })
    }
}
