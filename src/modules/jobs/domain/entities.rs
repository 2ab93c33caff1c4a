/// Domain entities for destination-side asynchronous writes
///
/// A write the destination accepts for background processing yields a
/// `JobHandle`; resolving the handle yields a `ResolvedLocation`.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::shared::domain::value_objects::scalar_to_string;
use crate::shared::domain::RecordKind;

/// Handle to a destination job created by an accepted write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    pub poll_url: String,
    pub record_kind: RecordKind,
    pub submitted_at: DateTime<Utc>,
}

impl JobHandle {
    pub fn new(poll_url: impl Into<String>, record_kind: RecordKind) -> Self {
        Self {
            poll_url: poll_url.into(),
            record_kind,
            submitted_at: Utc::now(),
        }
    }

    /// Time since the write was accepted
    pub fn age(&self) -> Duration {
        (Utc::now() - self.submitted_at)
            .to_std()
            .unwrap_or_default()
    }
}

/// Canonical location of an entity created by a resolved job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub location_uri: String,
    pub internal_id: String,
}

impl ResolvedLocation {
    /// Parse a `Location` header; the trailing path segment must be numeric.
    pub fn from_location_header(location: &str) -> Result<Self, String> {
        let trimmed = location.trim();
        let path = trimmed
            .split(|c: char| c == '?' || c == '#')
            .next()
            .unwrap_or_default()
            .trim_end_matches('/');
        let segment = path.rsplit('/').next().unwrap_or_default();

        if segment.is_empty() || !segment.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!(
                "Location '{}' does not end in a numeric id (got '{}')",
                trimmed, segment
            ));
        }

        Ok(Self {
            location_uri: trimmed.to_string(),
            internal_id: segment.to_string(),
        })
    }

    /// Location of a write the destination completed synchronously: the
    /// `location` it answered with, else the record's own `id`.
    pub fn from_completed(body: &Value) -> Option<Self> {
        if let Some(location) = body.get("location").and_then(Value::as_str) {
            if let Ok(resolved) = Self::from_location_header(location) {
                return Some(resolved);
            }
        }

        let id = body.get("id").and_then(scalar_to_string)?;
        (!id.is_empty() && id.chars().all(|c| c.is_ascii_digit())).then(|| Self {
            location_uri: body
                .get("location")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            internal_id: id,
        })
    }
}
