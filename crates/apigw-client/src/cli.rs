//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// apigw - call and debug signing API gateways
#[derive(Debug, Parser)]
#[command(name = "apigw")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "APIGW_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Call a gateway method and print the response
    Call {
        /// Gateway method name, e.g. `antcloud.demo.gateway.check.echo`
        method: String,

        /// Method version
        version: String,

        /// Parameter as a dotted key, e.g. `-p input.items.1=a` (can be repeated)
        #[arg(long = "param", short = 'p', value_parser = parse_key_value, action = clap::ArgAction::Append)]
        params: Vec<(String, String)>,

        /// Parameters as a JSON object, merged before `--param` values
        #[arg(long)]
        json: Option<String>,

        /// Print the raw response body without verifying it
        #[arg(long)]
        raw: bool,

        /// Skip response signature verification
        #[arg(long)]
        no_check_sign: bool,

        /// Send the form as a GET query instead of a POST body
        #[arg(long)]
        get: bool,
    },

    /// Print the string to sign and the signature of a form or literal
    Sign {
        /// Shared secret, or an `env::NAME` reference
        #[arg(long, env = "APIGW_ACCESS_SECRET")]
        secret: Option<String>,

        /// Sign this text verbatim instead of a form
        #[arg(long, conflicts_with = "fields")]
        literal: Option<String>,

        /// Form fields as `key=value`
        #[arg(value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
    },

    /// Print the signed `response` text of a saved gateway reply
    Extract {
        /// File holding the reply body, `-` for stdin
        file: PathBuf,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration management actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration (secrets are masked)
    Dump,
    /// Check the configuration and resolve secret references
    Validate,
    /// Print the default configuration file path
    Path,
}

/// Parses a `key=value` argument. The value may contain `=`.
pub fn parse_key_value(arg: &str) -> Result<(String, String), String> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{}`", arg))?;
    if key.is_empty() {
        return Err(format!("empty key in `{}`", arg));
    }
    Ok((key.to_string(), value.to_string()))
}
