// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// `traceos gut` subcommands.
#[derive(Subcommand, Debug)]
pub enum GutCommands {
    /// Print the current emotional state for a session.
    ///
    /// Returns "no state yet" rather than an error when the session has
    /// never ingested an event — the valuation engine creates state lazily.
    Show {
        #[arg(long)]
        session: String,
    },
    /// Drop the in-memory GutCritic for a session, resetting it to fresh.
    Clear {
        #[arg(long)]
        session: String,
    },
}

#[derive(Parser, Debug)]
#[command(
    name = "traceos",
    about = "TraceOS core runtime: tri-state memory, agent orchestration, valuation and compression",
    version,
    long_about = None,
)]
pub struct Cli {
    /// Path to config file (overrides auto-discovery).
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace).
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run pending schema migrations and exit.
    Migrate,
    /// Bootstrap the runtime and block until interrupted.
    Serve,
    /// Print the effective configuration and exit.
    ShowConfig,
    /// Inspect or reset per-session valuation state.
    Gut {
        #[command(subcommand)]
        command: GutCommands,
    },
}
