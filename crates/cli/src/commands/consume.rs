// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `slotq consume` - Follow the log from an offset

use clap::Args;
use slotq_storage::{cancel_pair, CancelSignal};
use tracing::{debug, warn};

use crate::client::{ClientError, DaemonClient};
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct ConsumeArgs {
    /// Byte offset to start from (a multiple of the slot size)
    #[arg(long, default_value_t = 0)]
    pub offset: u64,

    /// Output format for each record
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Stream records until interrupted or the daemon ends the stream.
pub async fn handle(args: ConsumeArgs, client: &DaemonClient) -> Result<(), ClientError> {
    let mut interrupt = install_interrupt_handler();

    let mut consumer = client.consume(args.offset).await?;
    loop {
        let record = tokio::select! {
            _ = interrupted(&mut interrupt) => {
                debug!("interrupted, closing stream");
                return Ok(());
            }
            record = consumer.next() => record?,
        };
        if let Some(line) = output::format_record(&record, args.output) {
            println!("{}", line);
        }
    }
}

/// Route Ctrl-C into a cancel signal. `None` if no handler could be installed.
fn install_interrupt_handler() -> Option<CancelSignal> {
    let (handle, signal) = cancel_pair();
    match ctrlc::set_handler(move || handle.cancel()) {
        Ok(()) => Some(signal),
        Err(e) => {
            warn!("could not install interrupt handler: {}", e);
            None
        }
    }
}

async fn interrupted(signal: &mut Option<CancelSignal>) {
    match signal {
        Some(signal) => signal.cancelled().await,
        None => std::future::pending().await,
    }
}
