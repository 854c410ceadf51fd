// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! slotq - client for the slotq log daemon

mod client;
mod commands;
mod error;
mod output;

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use commands::{consume, daemon, publish};

use crate::client::DaemonClient;
use crate::error::CliError;

#[derive(Parser)]
#[command(name = "slotq", version, about = "Publish to and consume from a slotq log")]
struct Cli {
    /// Daemon address
    #[arg(long, global = true, default_value = "localhost:8185")]
    addr: String,

    /// Upper bound on the delay between connection attempts (milliseconds)
    #[arg(long, global = true, default_value_t = 5000)]
    max_connect_backoff_delay: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append a record
    Publish(publish::PublishArgs),
    /// Follow records from an offset
    Consume(consume::ConsumeArgs),
    /// Show daemon status
    Status(daemon::StatusArgs),
    /// Check the daemon is reachable
    Ping,
    /// Ask the daemon to shut down
    Stop,
}

#[tokio::main]
async fn main() -> ExitCode {
    setup_logging();

    let cli = Cli::parse();
    let client = DaemonClient::new(
        cli.addr,
        Duration::from_millis(cli.max_connect_backoff_delay),
    );

    let result = match cli.command {
        Commands::Publish(args) => publish::handle(args, &client).await,
        Commands::Consume(args) => consume::handle(args, &client).await,
        Commands::Status(args) => daemon::status(args, &client).await,
        Commands::Ping => daemon::ping(&client).await,
        Commands::Stop => daemon::stop(&client).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprint!("{}", CliError::from_client(&e, client.addr()));
            ExitCode::FAILURE
        }
    }
}

fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
