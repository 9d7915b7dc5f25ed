//! Main entry point for the Fleetconf server.

use std::process::ExitCode;

use clap::Parser;
use serde_json::json;
use tracing::{error, info};

use fleetconf_common::FleetconfError;
use fleetconf_common::error::SERVER_ERROR;
use fleetconf_server::{bootstrap, cli, settings::Configuration, startup};

async fn execute(
    configuration: &Configuration,
    command: cli::Command,
) -> anyhow::Result<serde_json::Value> {
    let db = configuration.database_connection().await?;
    let ctx = bootstrap::build_context(configuration, db)?;
    cli::run(&ctx, command).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::Cli::parse();

    let configuration = match Configuration::load(args.config.as_deref(), args.database_url.clone())
    {
        Ok(configuration) => configuration,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let _logging_guard = match startup::init_logging(&configuration.logging_config()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!(command = ?args.command, "fleetconf command started");

    match execute(&configuration, args.command).await {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());
            ExitCode::SUCCESS
        }
        Err(e) => {
            let code = e
                .downcast_ref::<FleetconfError>()
                .map(FleetconfError::error_code)
                .unwrap_or(SERVER_ERROR);
            error!(code = code.code, "fleetconf command failed: {:#}", e);
            println!(
                "{}",
                json!({ "code": code.code, "message": format!("{:#}", e) })
            );
            ExitCode::FAILURE
        }
    }
}
