//! apigw CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use apigw_client::cli::{Cli, Command, ConfigAction};
use apigw_client::commands;
use apigw_client::config::ClientConfig;
use apigw_client::error::{CliError, CliResult};
use apigw_core::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(TracingConfig::cli(cli.debug)) {
        eprintln!("warning: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = match cli.config {
        Some(ref path) => ClientConfig::load_from(path).map_err(CliError::Config)?,
        None => ClientConfig::load().map_err(CliError::Config)?,
    };

    match cli.command {
        Command::Call {
            method,
            version,
            params,
            json,
            raw,
            no_check_sign,
            get,
        } => {
            let args = commands::call::CallArgs {
                method,
                version,
                params,
                json,
                raw,
                no_check_sign,
                get,
            };
            commands::call::run(&config, args).await
        }
        Command::Sign {
            secret,
            literal,
            fields,
        } => commands::sign::run(&config, secret, literal, fields),
        Command::Extract { file } => commands::extract::run(&file),
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(),
        },
    }
}
