// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `slotq publish` - Append one record to the log

use clap::Args;

use crate::client::{ClientError, DaemonClient};
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct PublishArgs {
    /// Message payload
    #[arg(long, default_value = "42")]
    pub msg: String,

    /// Output format for the acknowledgement
    #[arg(short, long, value_enum, default_value = "json")]
    pub output: OutputFormat,
}

pub async fn handle(args: PublishArgs, client: &DaemonClient) -> Result<(), ClientError> {
    let ack = client.publish(args.msg.into_bytes()).await?;
    output::print(&ack, args.output);
    Ok(())
}
