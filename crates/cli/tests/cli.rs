// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI integration tests
//!
//! Each test runs a daemon in-process on a loopback port and drives it
//! through the `slotq` binary.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(deprecated)]

use std::net::SocketAddr;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use assert_cmd::Command;
use predicates::prelude::*;
use slotq_daemon::lifecycle::{startup, Config, DaemonContext};
use tempfile::TempDir;
use tokio::runtime::Runtime;

struct TestDaemon {
    addr: SocketAddr,
    context: Arc<DaemonContext>,
    _runtime: Runtime,
    _dir: TempDir,
}

impl TestDaemon {
    fn start(slot_size: u32) -> Self {
        let dir = TempDir::new().unwrap();
        let runtime = Runtime::new().unwrap();
        let config = Config::new("127.0.0.1:0", &dir.path().join("file.log"), slot_size)
            .unwrap()
            .with_poll_interval(Duration::from_millis(20));

        let mut daemon = runtime.block_on(startup(&config)).unwrap();
        let addr = daemon.local_addr().unwrap();
        let context = Arc::clone(&daemon.context);
        runtime.spawn(async move {
            let _ = daemon.serve().await;
            let _ = daemon.shutdown().await;
        });

        Self {
            addr,
            context,
            _runtime: runtime,
            _dir: dir,
        }
    }

    fn slotq(&self) -> Command {
        let mut cmd = Command::cargo_bin("slotq").unwrap();
        cmd.args(["--addr", &self.addr.to_string()]);
        cmd
    }
}

#[test]
fn help_lists_subcommands() {
    Command::cargo_bin("slotq")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("publish"))
        .stdout(predicate::str::contains("consume"))
        .stdout(predicate::str::contains("max-connect-backoff-delay"));
}

#[test]
fn publish_prints_json_ack() {
    let daemon = TestDaemon::start(16);

    daemon
        .slotq()
        .args(["publish", "--msg", "hello"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"{"offset":0,"next_offset":16}"#));

    daemon
        .slotq()
        .arg("publish")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"{"offset":16,"next_offset":32}"#));
}

#[test]
fn oversized_publish_fails_with_hint() {
    let daemon = TestDaemon::start(4);

    daemon
        .slotq()
        .args(["publish", "--msg", "too long"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--message-size"));
}

#[test]
fn misaligned_consume_fails() {
    let daemon = TestDaemon::start(16);

    daemon
        .slotq()
        .args(["consume", "--offset", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("multiple of the slot size"));
}

#[test]
fn status_reports_records() {
    let daemon = TestDaemon::start(16);
    daemon.slotq().args(["publish", "--msg", "a"]).assert().success();
    daemon.slotq().args(["publish", "--msg", "b"]).assert().success();

    daemon
        .slotq()
        .args(["status", "--output", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""records":2"#))
        .stdout(predicate::str::contains(r#""next_offset":32"#));
}

#[test]
fn consume_prints_records_until_daemon_stops() {
    let daemon = TestDaemon::start(16);
    daemon.slotq().args(["publish", "--msg", "hello"]).assert().success();
    daemon.slotq().args(["publish", "--msg", "world!"]).assert().success();

    let child = std::process::Command::new(assert_cmd::cargo::cargo_bin("slotq"))
        .args(["--addr", &daemon.addr.to_string(), "consume", "--offset", "0"])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    // Give the stream time to catch up before stopping the daemon
    std::thread::sleep(Duration::from_millis(500));
    daemon.context.shutdown.cancel();

    let output = child.wait_with_output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(r#"offset:          0, data: "hello""#), "{}", stdout);
    assert!(stdout.contains(r#"offset:         16, data: "world!""#), "{}", stdout);
    assert!(!output.status.success());
}

#[test]
fn stop_shuts_daemon_down() {
    let daemon = TestDaemon::start(16);

    daemon
        .slotq()
        .arg("stop")
        .assert()
        .success()
        .stdout(predicate::str::contains("shutting down"));
    assert!(daemon.context.shutdown.is_cancelled());
}

#[test]
fn unreachable_daemon_fails_fast() {
    // Bind then drop to get a port nobody listens on
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();

    Command::cargo_bin("slotq")
        .unwrap()
        .env("SLOTQ_TIMEOUT_CONNECT_MS", "200")
        .args([
            "--addr",
            &addr.to_string(),
            "--max-connect-backoff-delay",
            "20",
            "ping",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot reach slotqd"));
}
