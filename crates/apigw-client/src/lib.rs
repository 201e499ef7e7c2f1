//! Gateway client and the `apigw` command-line tool.
//!
//! [`GatewayClient`] signs requests with the configured credentials,
//! posts them through a [`Transport`] and verifies the signed replies.

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod secret;
pub mod transport;

pub use cli::Cli;
pub use client::{ExecuteOptions, GatewayClient};
pub use config::{ClientConfig, Credentials};
pub use error::{CliError, CliResult};
pub use transport::{HttpMethod, HttpRequest, ReqwestTransport, Transport, TransportError};
