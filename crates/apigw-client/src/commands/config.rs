//! Configuration commands.

use crate::config::ClientConfig;
use crate::error::{CliError, CliResult};
use crate::secret;

const MASK: &str = "********";

/// Returns a copy of the configuration safe to print: inline secrets are
/// masked, secret references are kept.
pub fn masked(config: &ClientConfig) -> ClientConfig {
    let mask = |value: &str| {
        if value.is_empty() || secret::is_reference(value) {
            value.to_string()
        } else {
            MASK.to_string()
        }
    };
    ClientConfig {
        access_secret: mask(&config.access_secret),
        security_token: config.security_token.as_deref().map(mask),
        ..config.clone()
    }
}

/// Dump the current configuration to stdout.
pub fn dump(config: &ClientConfig) -> CliResult<()> {
    let toml_str = toml::to_string_pretty(&masked(config))
        .map_err(|e| CliError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", ClientConfig::default_path().display());
    println!("{}", toml_str);
    Ok(())
}

/// Validate the configuration and resolve its secret references.
pub fn validate(config: &ClientConfig) -> CliResult<()> {
    config.validate().map_err(CliError::Config)?;
    config
        .resolve_credentials()
        .map_err(|e| CliError::Config(format!("invalid credentials: {}", e)))?;
    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path() -> CliResult<()> {
    println!("config: {}", ClientConfig::default_path().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_inline_secrets_only() {
        let config = ClientConfig::new("https://gw.example.com", "ak", "plain-secret")
            .with_security_token("env::APIGW_TOKEN");
        let shown = masked(&config);
        assert_eq!(shown.access_key, "ak");
        assert_eq!(shown.access_secret, MASK);
        assert_eq!(shown.security_token.as_deref(), Some("env::APIGW_TOKEN"));

        let config = ClientConfig::new("https://gw.example.com", "ak", "env::APIGW_ACCESS_SECRET");
        assert_eq!(masked(&config).access_secret, "env::APIGW_ACCESS_SECRET");
    }

    #[test]
    fn validate_rejects_incomplete_config() {
        assert!(matches!(
            validate(&ClientConfig::default()),
            Err(CliError::Config(_))
        ));
        let unresolvable =
            ClientConfig::new("https://gw.example.com", "ak", "env::_APIGW_NONEXISTENT_VAR_67890");
        assert!(matches!(validate(&unresolvable), Err(CliError::Config(_))));
        assert!(validate(&ClientConfig::new("https://gw.example.com", "ak", "sk")).is_ok());
    }
}
