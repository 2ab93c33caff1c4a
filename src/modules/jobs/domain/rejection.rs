//! Classification of destination write rejections
//!
//! The destination reports validation failures as a problem document with a
//! list of detail entries. Inventory shortfalls and unavailable lots are
//! recognised by phrase so callers can retry with different lot assignments.

use regex::RegexSet;
use serde_json::Value;
use std::sync::OnceLock;

use crate::shared::errors::MigrationError;

/// Phrases the destination uses for "insufficient quantity / lot unavailable"
const INVENTORY_PHRASES: [&str; 5] = [
    r"(?i)you only have [\d.,]+ available",
    r"(?i)insufficient (quantity|inventory|stock)",
    r"(?i)(lot|serial) numbers? .*(not available|not valid|does not exist|insufficient)",
    r"(?i)inventory (detail|number) .*(not available|invalid|unavailable)",
    r"(?i)not enough (quantity|inventory) on hand",
];

fn inventory_patterns() -> &'static RegexSet {
    static PATTERNS: OnceLock<RegexSet> = OnceLock::new();
    PATTERNS.get_or_init(|| RegexSet::new(INVENTORY_PHRASES).unwrap_or_else(|_| RegexSet::empty()))
}

/// Detail messages from a rejection payload, most specific first
pub fn rejection_messages(detail: &Value) -> Vec<String> {
    let mut messages: Vec<String> = ["o:errorDetails", "errorDetails"]
        .iter()
        .filter_map(|key| detail.get(*key).and_then(Value::as_array))
        .flatten()
        .filter_map(|entry| match entry {
            Value::String(s) => Some(s.clone()),
            other => other
                .get("detail")
                .or_else(|| other.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string),
        })
        .collect();

    if messages.is_empty() {
        for key in ["detail", "message", "title"] {
            if let Some(text) = detail.get(key).and_then(Value::as_str) {
                messages.push(text.to_string());
                break;
            }
        }
    }
    if messages.is_empty() {
        if let Some(text) = detail.as_str() {
            messages.push(text.to_string());
        }
    }

    messages
}

pub fn is_inventory_message(message: &str) -> bool {
    inventory_patterns().is_match(message)
}

/// Build a `WriteRejected` from the raw destination payload
pub fn classify_rejection(detail: Value) -> MigrationError {
    let messages = rejection_messages(&detail);
    let is_inventory_error = messages.iter().any(|m| is_inventory_message(m));

    MigrationError::WriteRejected {
        messages,
        is_inventory_error,
        detail,
    }
}
