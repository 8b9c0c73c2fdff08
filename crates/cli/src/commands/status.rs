// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only and synchronous commands: token, pair, status.

use std::io::Write;

use outbound::Outbound;

use crate::error::Result;

pub fn token(outbound: &Outbound, out: &mut dyn Write) -> Result<()> {
    writeln!(out, "{}", outbound.active_token())?;
    Ok(())
}

pub async fn pair(outbound: &Outbound, pin: &str, out: &mut dyn Write) -> Result<()> {
    if outbound.pair_device(pin).await? {
        writeln!(out, "paired")?;
    } else {
        writeln!(out, "not paired")?;
    }
    Ok(())
}

pub fn status(outbound: &Outbound, out: &mut dyn Write) -> Result<()> {
    let user = outbound.current_user()?;
    let token = outbound.active_token();

    writeln!(out, "enabled: {}", outbound.is_enabled())?;
    writeln!(out, "user: {}", user.as_deref().unwrap_or("-"))?;
    writeln!(out, "token: {}", if token.is_empty() { "-" } else { &token })?;
    writeln!(out, "pending: {}", outbound.pending_count()?)?;
    Ok(())
}
