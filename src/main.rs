// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod cli;

use std::process::ExitCode;

use clap::Parser;
use cli::{Cli, Commands, GutCommands};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};
use traceos_runtime::Runtime;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match traceos_config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            eprintln!("error: {e:#}");
            return ExitCode::from(1);
        }
    };

    match run(config, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(RunError::Startup(e)) => {
            tracing::error!(error = %e, "startup failure");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
        Err(RunError::Command(e)) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

/// Distinguishes a failure during [`Runtime::bootstrap`] (exit code 1) from
/// one raised afterward by a maintenance subcommand itself (exit code 2).
enum RunError {
    Startup(anyhow::Error),
    Command(anyhow::Error),
}

async fn run(config: traceos_config::Config, command: Commands) -> Result<(), RunError> {
    match command {
        Commands::Migrate => {
            let runtime = Runtime::bootstrap(config).await.map_err(RunError::Startup)?;
            runtime.shutdown().map_err(RunError::Command)?;
            println!("migration complete");
        }
        Commands::Serve => {
            let runtime = Runtime::bootstrap(config).await.map_err(RunError::Startup)?;
            println!(
                "traceos runtime ready ({} agents registered); press ctrl-c to stop",
                runtime.agents.list().len()
            );
            tokio::signal::ctrl_c().await.map_err(|e| RunError::Command(e.into()))?;
            tracing::info!("shutdown signal received");
            runtime.shutdown().map_err(RunError::Command)?;
        }
        Commands::ShowConfig => {
            let yaml = serde_yaml::to_string(&config).map_err(|e| RunError::Command(e.into()))?;
            println!("{yaml}");
        }
        Commands::Gut { command } => run_gut_command(config, command).await?,
    }

    Ok(())
}

async fn run_gut_command(config: traceos_config::Config, command: GutCommands) -> Result<(), RunError> {
    let runtime = Runtime::bootstrap(config).await.map_err(RunError::Startup)?;
    match command {
        GutCommands::Show { session } => {
            let state = runtime.gut.state(&session);
            let json = serde_json::to_string_pretty(&state).map_err(|e| RunError::Command(e.into()))?;
            println!("{json}");
        }
        GutCommands::Clear { session } => {
            runtime.gut.remove(&session);
            println!("cleared gut state for session {session}");
        }
    }
    runtime.shutdown().map_err(RunError::Command)?;
    Ok(())
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}
