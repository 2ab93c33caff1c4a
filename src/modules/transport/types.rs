//! Wire shapes exchanged with the destination transport

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::modules::jobs::domain::{JobHandle, JobState};
use crate::shared::errors::{AppError, AppResult};

/// Hypermedia link as returned in a `links` array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
}

impl Link {
    pub fn new(rel: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            href: href.into(),
        }
    }
}

/// Links under `value["links"]`; malformed entries are skipped
pub fn links_of(value: &Value) -> Vec<Link> {
    value
        .get("links")
        .and_then(Value::as_array)
        .map(|links| {
            links
                .iter()
                .filter_map(|link| serde_json::from_value::<Link>(link.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

pub fn find_link<'a>(links: &'a [Link], rel: &str) -> Option<&'a Link> {
    links.iter().find(|link| link.rel.eq_ignore_ascii_case(rel))
}

/// Result of submitting a write
#[derive(Debug, Clone)]
pub enum SubmitResponse {
    /// Accepted for background processing
    Accepted(JobHandle),
    /// Written synchronously; carries the created record (at least its `id`)
    Complete(Value),
    /// Synchronous validation failure with the raw problem document
    Rejected(Value),
}

/// One poll of a destination job
#[derive(Debug, Clone, PartialEq)]
pub struct JobStatus {
    pub state: JobState,
    /// Links of the job's task (the first traversal hop reads `self` here)
    pub links: Vec<Link>,
    /// Raw poll body, kept for error reporting
    pub detail: Value,
}

impl JobStatus {
    pub fn new(state: JobState, links: Vec<Link>) -> Self {
        Self {
            state,
            links,
            detail: Value::Null,
        }
    }

    /// Parse a poll body.
    ///
    /// Recognises `state`, falls back to `progress` and then the boolean
    /// `completed` flag. Task links are read from `task.links`, or the body's
    /// own links when the task is inlined.
    pub fn from_body(body: Value) -> AppResult<Self> {
        let state = match body
            .get("state")
            .or_else(|| body.get("progress"))
            .and_then(Value::as_str)
        {
            Some(raw) => raw.parse::<JobState>().map_err(AppError::Decode)?,
            None => match body.get("completed").and_then(Value::as_bool) {
                Some(true) => JobState::Succeeded,
                Some(false) => JobState::Running,
                None => {
                    return Err(AppError::Decode(format!(
                        "Job status without state: {}",
                        body
                    )))
                }
            },
        };

        let links = match body.get("task") {
            Some(task) => links_of(task),
            None => links_of(&body),
        };

        Ok(Self {
            state,
            links,
            detail: body,
        })
    }

    /// Failure reason reported by the destination
    pub fn failure_reason(&self) -> String {
        ["reason", "error", "detail", "title"]
            .iter()
            .find_map(|key| self.detail.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| "destination reported job failure".to_string())
    }
}

/// Response of following a link
#[derive(Debug, Clone, PartialEq)]
pub struct LinkResponse {
    pub status: u16,
    /// `Location` header, if present
    pub location: Option<String>,
    /// JSON body, or `Null` when empty or not JSON
    pub body: Value,
}

impl LinkResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            location: None,
            body,
        }
    }

    pub fn no_content(location: impl Into<String>) -> Self {
        Self {
            status: 204,
            location: Some(location.into()),
            body: Value::Null,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
