// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Building SDK values from command-line arguments.

use outbound::{Event, User};
use serde_json::Value;

/// Interpret a command-line value: JSON when it parses, a string otherwise.
///
/// `3` becomes a number and `true` a bool, while `pro` stays `"pro"`.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

pub fn build_user(
    user_id: String,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    attributes: Vec<(String, String)>,
) -> User {
    let mut user = User::new(user_id);
    user.first_name = first_name;
    user.last_name = last_name;
    user.email = email;
    user.phone_number = phone;
    for (key, value) in attributes {
        user = user.with_attribute(key, parse_value(&value));
    }
    user
}

pub fn build_event(name: String, properties: Vec<(String, String)>) -> Event {
    properties
        .into_iter()
        .fold(Event::new(name), |event, (key, value)| {
            event.with_property(key, parse_value(&value))
        })
}

#[cfg(test)]
#[path = "actions_tests.rs"]
mod tests;
