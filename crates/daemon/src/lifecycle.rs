// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, serving, shutdown.

use std::fs::File;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use fs2::FileExt;
use slotq_storage::{cancel_pair, CancelHandle, CancelSignal, LogError, LogWriter, SlotSize};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::server;

/// How long shutdown waits for open connections to finish
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to listen on
    pub addr: String,
    /// Path to the slot log
    pub log_path: PathBuf,
    /// Path to lock/PID file guarding the log
    pub lock_path: PathBuf,
    /// Fixed slot size of the log
    pub slot_size: SlotSize,
    /// Sleep between reads once a tail has caught up
    pub poll_interval: Duration,
}

impl Config {
    /// Build config from the command-line values.
    ///
    /// `SLOTQ_POLL_INTERVAL_MS` overrides the tail poll interval.
    pub fn new(addr: &str, log_path: &Path, message_size: u32) -> Result<Self, LifecycleError> {
        let slot_size = SlotSize::new(message_size)?;
        let poll_interval = std::env::var("SLOTQ_POLL_INTERVAL_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(slotq_storage::DEFAULT_POLL_INTERVAL);

        Ok(Self {
            addr: addr.to_string(),
            log_path: log_path.to_path_buf(),
            lock_path: lock_path_for(log_path),
            slot_size,
            poll_interval,
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// `<log>.lock` next to the log file
fn lock_path_for(log_path: &Path) -> PathBuf {
    let mut name = log_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    log_path.with_file_name(name)
}

/// State shared by every connection task
pub struct DaemonContext {
    pub config: Config,
    /// The only writer of the log
    pub writer: LogWriter,
    /// Fired once on shutdown; every tail observes it
    pub shutdown: CancelHandle,
    pub start_time: Instant,
    consumers: AtomicUsize,
}

impl DaemonContext {
    /// Open consume streams
    pub fn consumers(&self) -> usize {
        self.consumers.load(Ordering::SeqCst)
    }

    /// Count a consume stream for as long as the guard lives
    pub fn track_consumer(self: &Arc<Self>) -> ConsumerGuard {
        self.consumers.fetch_add(1, Ordering::SeqCst);
        ConsumerGuard {
            context: Arc::clone(self),
        }
    }
}

/// Decrements the consumer count on drop
pub struct ConsumerGuard {
    context: Arc<DaemonContext>,
}

impl Drop for ConsumerGuard {
    fn drop(&mut self) {
        self.context.consumers.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Daemon state during operation
pub struct DaemonState {
    /// Shared with connection tasks
    pub context: Arc<DaemonContext>,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// TCP listener
    pub listener: TcpListener,
    connections: JoinSet<()>,
    shutdown: CancelSignal,
}

impl DaemonState {
    /// Address the listener is bound to
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until shutdown is requested.
    ///
    /// Each connection runs on its own task.
    pub async fn serve(&mut self) -> Result<(), LifecycleError> {
        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            debug!(%peer, "accepted connection");
                            let context = Arc::clone(&self.context);
                            self.connections.spawn(async move {
                                if let Err(e) = server::handle_connection(context, stream).await {
                                    error!(%peer, "Error handling connection: {}", e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Error accepting connection: {}", e);
                        }
                    }
                }

                // Reap finished connection tasks
                Some(joined) = self.connections.join_next() => {
                    if let Err(e) = joined {
                        error!("Connection task failed: {}", e);
                    }
                }

                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested");
                    return Ok(());
                }
            }
        }
    }

    /// Shutdown the daemon gracefully
    pub async fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        // 1. Cancel every tail; streams end with a cancelled frame
        self.context.shutdown.cancel();

        // 2. Drain connection tasks
        let drain = async {
            while let Some(joined) = self.connections.join_next().await {
                if let Err(e) = joined {
                    warn!("Connection task failed during shutdown: {}", e);
                }
            }
        };
        if tokio::time::timeout(DRAIN_TIMEOUT, drain).await.is_err() {
            warn!("Connections still open after {:?}, aborting", DRAIN_TIMEOUT);
            self.connections.abort_all();
        }

        // 3. Flush the log
        if let Err(e) = self.context.writer.sync() {
            error!("Failed to sync log: {}", e);
        }

        // 4. Remove PID file
        if self.context.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.context.config.lock_path) {
                warn!("Failed to remove lock file: {}", e);
            }
        }

        // 5. Lock is released automatically when self.lock_file is dropped

        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Failed to acquire lock on {0}: another daemon owns this log?")]
    LockFailed(PathBuf, #[source] std::io::Error),

    #[error("Failed to bind {0}: {1}")]
    BindFailed(String, std::io::Error),

    #[error("Log error: {0}")]
    Log(#[from] LogError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<DaemonState, LifecycleError> {
    match startup_inner(config).await {
        Ok(state) => Ok(state),
        Err(e) => {
            cleanup_on_failure(config, &e);
            Err(e)
        }
    }
}

/// Inner startup logic - cleanup_on_failure called if this fails
async fn startup_inner(config: &Config) -> Result<DaemonState, LifecycleError> {
    // 1. Create the log directory
    if let Some(parent) = config.log_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // 2. Acquire lock file FIRST - one writer per log
    let lock_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(|e| LifecycleError::LockFailed(config.lock_path.clone(), e))?;

    // Write PID to lock file
    use std::io::Write;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    // 3. Open the log; existing length is where appends resume
    let writer = LogWriter::open(&config.log_path, config.slot_size)?;

    info!(
        "Loaded log: {} records of {} bytes",
        writer.records(),
        config.slot_size
    );

    // 4. Bind (LAST - only after the log is usable)
    let listener = TcpListener::bind(&config.addr)
        .await
        .map_err(|e| LifecycleError::BindFailed(config.addr.clone(), e))?;

    let (shutdown, shutdown_signal) = cancel_pair();
    let context = Arc::new(DaemonContext {
        config: config.clone(),
        writer,
        shutdown,
        start_time: Instant::now(),
        consumers: AtomicUsize::new(0),
    });

    info!("Daemon started for log: {}", config.log_path.display());

    Ok(DaemonState {
        context,
        lock_file,
        listener,
        connections: JoinSet::new(),
        shutdown: shutdown_signal,
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config, error: &LifecycleError) {
    // Another daemon's lock file is not ours to remove
    if matches!(error, LifecycleError::LockFailed(..)) {
        return;
    }
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
