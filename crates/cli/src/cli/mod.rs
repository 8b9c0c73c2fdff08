// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Parse a string that must not be empty or whitespace-only.
fn non_empty_string(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        Err("cannot be empty".to_string())
    } else {
        Ok(s.to_string())
    }
}

/// Parse a `key=value` pair.
fn key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{s}'")),
    }
}

const QUICKSTART_HELP: &str = "\
Get started:
  obctl identify user-1 --email ada@example.com   Identify a user
  obctl track signup --prop plan=pro              Track an event
  obctl register                                  Register this device for push
  obctl status                                    Show pipeline state";

#[derive(Parser)]
#[command(name = "obctl", version)]
#[command(about = "Queue and deliver user events to the outbound API")]
#[command(after_help = QUICKSTART_HELP)]
pub struct Cli {
    /// Settings file [default: <config dir>/outbound/config.toml]
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Seconds to wait for queued requests to be delivered before exiting
    #[arg(long, global = true, value_name = "N", default_value_t = 10)]
    pub wait_secs: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Identify the current user
    #[command(after_help = "Examples:\n  \
        obctl identify user-1\n  \
        obctl identify user-1 --first-name Ada --last-name Lovelace\n  \
        obctl identify user-1 --attr plan=pro --attr seats=3")]
    Identify {
        /// User id
        #[arg(value_parser = non_empty_string)]
        user_id: String,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        /// Custom attribute (repeatable); JSON values are parsed, anything else is a string
        #[arg(long = "attr", value_name = "KEY=VALUE", value_parser = key_value)]
        attributes: Vec<(String, String)>,
    },

    /// Track an event for the identified user
    Track {
        /// Event name
        #[arg(value_parser = non_empty_string)]
        name: String,

        /// Event property (repeatable)
        #[arg(long = "prop", value_name = "KEY=VALUE", value_parser = key_value)]
        properties: Vec<(String, String)>,
    },

    /// Register this device for push notifications
    Register,

    /// Disable push notifications for the identified user
    Disable,

    /// Print the active push token (empty if none)
    Token,

    /// Pair this device using a PIN
    Pair {
        /// PIN shown by the dashboard
        pin: String,
    },

    /// Show config, identity and queue state
    Status,

    /// Deliver queued requests and wait for the queue to drain
    Flush,
}

#[cfg(test)]
#[path = "../cli_tests/mod.rs"]
mod tests;
