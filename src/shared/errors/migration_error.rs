use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::AppError;

/// Outcome taxonomy for a single record's migration.
///
/// Fatal variants stop that record only; `ReferenceExpansionFailed` and
/// `LotMappingFailed` are reported as warnings next to a successful outcome.
#[derive(Error, Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MigrationError {
    #[error("Job {poll_url} failed: {reason}")]
    JobFailed {
        poll_url: String,
        reason: String,
        detail: Value,
    },

    #[error("Job {poll_url} did not finish after {attempts} polls")]
    JobTimedOut { poll_url: String, attempts: u32 },

    #[error("Protocol error at {hop}: {message}")]
    ProtocolError {
        hop: String,
        message: String,
        detail: Value,
    },

    #[error("Write rejected: {}", .messages.join("; "))]
    WriteRejected {
        messages: Vec<String>,
        is_inventory_error: bool,
        detail: Value,
    },

    #[error("Reference {field}={source_id} could not be expanded: {message}")]
    ReferenceExpansionFailed {
        field: String,
        source_id: String,
        message: String,
    },

    #[error("Lot mapping for {source_lot_id} was not persisted: {message}")]
    LotMappingFailed {
        source_lot_id: String,
        message: String,
    },

    #[error("Record kind {record_kind} has no lot correlation path")]
    LotCorrelationUnsupported { record_kind: String },

    #[error("Resolution of {poll_url} was cancelled")]
    Cancelled { poll_url: String },

    #[error("Transform failed: {message}")]
    Transform { message: String },

    #[error("{0}")]
    Transport(#[from] AppError),
}

impl MigrationError {
    pub fn protocol(hop: impl Into<String>, message: impl Into<String>, detail: Value) -> Self {
        MigrationError::ProtocolError {
            hop: hop.into(),
            message: message.into(),
            detail,
        }
    }

    /// Non-fatal errors leave the owning record migrated.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            MigrationError::ReferenceExpansionFailed { .. } | MigrationError::LotMappingFailed { .. }
        )
    }

    pub fn is_inventory_error(&self) -> bool {
        matches!(
            self,
            MigrationError::WriteRejected {
                is_inventory_error: true,
                ..
            }
        )
    }

    /// Raw destination payload attached to the error, if any.
    pub fn detail(&self) -> Option<&Value> {
        match self {
            MigrationError::JobFailed { detail, .. }
            | MigrationError::ProtocolError { detail, .. }
            | MigrationError::WriteRejected { detail, .. } => Some(detail),
            _ => None,
        }
    }
}

pub type MigrationResult<T> = Result<T, MigrationError>;
