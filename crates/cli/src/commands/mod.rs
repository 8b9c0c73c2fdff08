// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod actions;
pub mod status;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use outbound::{DeliveryEvent, HttpTransport, Outbound, Transport};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

use crate::cli::Command;
use crate::error::Result;
use crate::settings::Settings;

/// Initialize a pipeline from `settings`, run one command, and shut down.
pub async fn execute(settings: &Settings, command: Command, wait: Duration) -> Result<()> {
    let transport: Arc<dyn Transport> =
        Arc::new(HttpTransport::new(&settings.base_url, settings.timeout())?);
    let outbound = Outbound::new();
    outbound
        .initialize(
            settings.app_context(),
            &settings.api_key,
            &settings.client_id,
            transport,
        )
        .await?;

    let mut stdout = std::io::stdout();
    let result = run(&outbound, command, wait, &mut stdout).await;
    outbound.shutdown().await;
    result
}

/// Run one command against an initialized pipeline.
pub async fn run(
    outbound: &Outbound,
    command: Command,
    wait: Duration,
    out: &mut dyn Write,
) -> Result<()> {
    let events = outbound.subscribe();
    match command {
        Command::Identify {
            user_id,
            first_name,
            last_name,
            email,
            phone,
            attributes,
        } => {
            let user = actions::build_user(user_id, first_name, last_name, email, phone, attributes);
            outbound.identify(&user)?;
            report_delivery(outbound, events, wait, out).await
        }
        Command::Track { name, properties } => {
            outbound.track(&actions::build_event(name, properties))?;
            report_delivery(outbound, events, wait, out).await
        }
        Command::Register => {
            outbound.register()?;
            report_delivery(outbound, events, wait, out).await
        }
        Command::Disable => {
            outbound.disable()?;
            report_delivery(outbound, events, wait, out).await
        }
        Command::Flush => report_delivery(outbound, events, wait, out).await,
        Command::Token => status::token(outbound, out),
        Command::Pair { pin } => status::pair(outbound, &pin, out).await,
        Command::Status => status::status(outbound, out),
    }
}

/// Tally of what the worker did while we waited.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DeliverySummary {
    pub delivered: usize,
    pub dropped: usize,
    pub queued: usize,
}

impl DeliverySummary {
    /// Count every buffered event. Events lost to lag are skipped over.
    pub fn drain(&mut self, events: &mut broadcast::Receiver<DeliveryEvent>) {
        loop {
            match events.try_recv() {
                Ok(DeliveryEvent::Delivered { .. }) => self.delivered += 1,
                Ok(DeliveryEvent::Dropped { .. }) => self.dropped += 1,
                Ok(DeliveryEvent::Retrying { .. } | DeliveryEvent::Idle) => {}
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }
}

/// Wait up to `wait` for the queue to drain, then print what happened.
async fn report_delivery(
    outbound: &Outbound,
    mut events: broadcast::Receiver<DeliveryEvent>,
    wait: Duration,
    out: &mut dyn Write,
) -> Result<()> {
    if !outbound.is_enabled() {
        writeln!(out, "delivery disabled by remote config")?;
        return Ok(());
    }

    outbound.flush(wait).await?;
    let mut summary = DeliverySummary {
        queued: outbound.pending_count()?,
        ..DeliverySummary::default()
    };
    summary.drain(&mut events);

    writeln!(
        out,
        "delivered {}, dropped {}, queued {}",
        summary.delivered, summary.dropped, summary.queued
    )?;
    Ok(())
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
