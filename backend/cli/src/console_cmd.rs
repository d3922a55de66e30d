//! `console`: drives the coordinator from stdin, one command per line.
//!
//! ```text
//! verify <requester-id>            issue a code
//! verify <requester-id> <handle>   check the handle's bio
//! quit
//! ```
//!
//! Every outcome is printed to stdout as one JSON line carrying the report and
//! the message the requester would see.

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use verifier_config::VerifierConfig;
use verifier_core::{render, MessageSettings, OutcomeBus, OutcomeReport, RequesterId};
use verifier_coordinator::Dispatch;

use crate::runtime;

#[derive(Debug, PartialEq, Eq)]
pub enum ConsoleCommand {
    Verify {
        requester: RequesterId,
        profile: Option<String>,
    },
    Quit,
}

/// Parse one input line. Blank lines and `#` comments yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut parts = line.split_whitespace();
    match parts.next().map(str::to_ascii_lowercase).as_deref() {
        Some("quit") | Some("exit") => Ok(Some(ConsoleCommand::Quit)),
        Some("verify") => {
            let id = parts.next().ok_or("usage: verify <requester-id> [handle]")?;
            let requester = id
                .parse::<u64>()
                .map(RequesterId)
                .map_err(|_| format!("requester id must be a number, got '{id}'"))?;
            let profile = parts.next().map(str::to_string);
            if parts.next().is_some() {
                return Err("usage: verify <requester-id> [handle]".to_string());
            }
            Ok(Some(ConsoleCommand::Verify { requester, profile }))
        }
        Some(other) => Err(format!("unknown command '{other}'")),
        None => Ok(None),
    }
}

#[derive(Serialize)]
struct ConsoleLine<'a> {
    #[serde(flatten)]
    report: &'a OutcomeReport,
    message: String,
}

fn format_report(report: &OutcomeReport, settings: &MessageSettings) -> Result<String> {
    let line = ConsoleLine {
        report,
        message: render(&report.outcome, settings),
    };
    Ok(serde_json::to_string(&line)?)
}

pub async fn run(config: &VerifierConfig) -> Result<()> {
    let mut bus = OutcomeBus::new();
    let Some(mut rx) = bus.take_rx() else {
        anyhow::bail!("outcome receiver already taken");
    };

    let coordinator = runtime::build_coordinator(config, Arc::new(bus.sink()))?;
    let sweeper = coordinator.spawn_expiry_sweeper(config.sweep_interval());

    let settings = config.message_settings();
    let printer = tokio::spawn(async move {
        while let Some(report) = rx.recv().await {
            match format_report(&report, &settings) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "Failed to format outcome"),
            }
        }
    });

    info!("Console ready; reading commands from stdin");
    let mut pending = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_line(&line) {
            Ok(None) => continue,
            Ok(Some(ConsoleCommand::Quit)) => break,
            Ok(Some(ConsoleCommand::Verify { requester, profile })) => {
                if let Dispatch::Scheduled(handle) = coordinator.verify(requester, profile.as_deref()).await {
                    pending.push(handle);
                }
            }
            Err(e) => eprintln!("error: {e}"),
        }
        pending.retain(|h| !h.is_finished());
    }

    debug!(outstanding = pending.len(), "Waiting for in-flight checks");
    for handle in pending {
        let _ = handle.await;
    }

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    // Dropping every sender closes the printer's receiver.
    drop(coordinator);
    drop(bus);
    printer.await?;
    Ok(())
}
