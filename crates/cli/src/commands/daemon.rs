// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon inspection and control: `status`, `ping`, `stop`

use clap::Args;

use crate::client::{ClientError, DaemonClient};
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct StatusArgs {
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

pub async fn status(args: StatusArgs, client: &DaemonClient) -> Result<(), ClientError> {
    let status = client.status().await?;
    output::print(&status, args.output);
    Ok(())
}

pub async fn ping(client: &DaemonClient) -> Result<(), ClientError> {
    client.ping().await?;
    let version = client.hello().await?;
    println!("slotqd {} at {}", version, client.addr());
    Ok(())
}

pub async fn stop(client: &DaemonClient) -> Result<(), ClientError> {
    client.shutdown().await?;
    println!("Daemon at {} is shutting down", client.addr());
    Ok(())
}
