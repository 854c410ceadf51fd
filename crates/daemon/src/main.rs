// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! slotq daemon (slotqd)
//!
//! Owns the slot log, accepts publishes and serves tailing consumers.

use std::path::PathBuf;

use clap::Parser;
use slotq_daemon::lifecycle::{self, Config, LifecycleError};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "slotqd", version, about = "slotq log daemon")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "localhost:8185")]
    addr: String,

    /// Log file holding the records
    #[arg(long, default_value = "file.log")]
    filename: PathBuf,

    /// Fixed size of every record slot, in bytes
    #[arg(long, default_value_t = 1024)]
    message_size: u32,

    /// Write daemon diagnostics to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Set up logging
    let _log_guard = setup_logging(args.log_file.as_deref())?;

    let config = Config::new(&args.addr, &args.filename, args.message_size)?;

    info!(
        "Starting slotqd: log {} with {}-byte slots",
        config.log_path.display(),
        config.slot_size
    );

    // Start daemon
    let mut daemon = match lifecycle::startup(&config).await {
        Ok(d) => d,
        Err(e) => {
            error!("Failed to start daemon: {}", e);
            return Err(e.into());
        }
    };

    // Set up signal handlers
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let local_addr = daemon.local_addr()?;
    info!("Daemon ready, listening on {}", local_addr);

    // Signal ready for parent process (e.g., scripts waiting for startup)
    println!("READY {}", local_addr);

    let served = tokio::select! {
        result = daemon.serve() => result,

        // Graceful shutdown on SIGTERM
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down...");
            Ok(())
        }

        // Graceful shutdown on SIGINT
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down...");
            Ok(())
        }
    };

    daemon.shutdown().await?;

    if let Err(e) = served {
        error!("Daemon stopped with error: {}", e);
        return Err(e.into());
    }

    info!("Daemon stopped");
    Ok(())
}

fn setup_logging(
    log_file: Option<&std::path::Path>,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let Some(path) = log_file else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
        return Ok(None);
    };

    // Create log directory if needed
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let file_name = path.file_name().ok_or_else(|| {
        LifecycleError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("log file has no name: {}", path.display()),
        ))
    })?;

    // Set up file appender
    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(Some(guard))
}
