use serde::Serialize;

use crate::modules::jobs::{JobHandle, ResolvedLocation};
use crate::modules::lots::PendingLotMapping;
use crate::shared::domain::RecordIdentity;
use crate::shared::errors::MigrationError;

/// A write the destination accepted but has not finished.
///
/// Hand it to `MigrationOrchestrator::poll_migration` (or `spawn_resolution`)
/// to finish the record.
#[derive(Debug, Clone, Serialize)]
pub struct PendingMigration {
    pub identity: RecordIdentity,
    pub job: JobHandle,
    pub pending_lots: Vec<PendingLotMapping>,
    /// Warnings collected before submission
    pub warnings: Vec<MigrationError>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MigrationStatus {
    Succeeded {
        resolved: ResolvedLocation,
        warnings: Vec<MigrationError>,
    },
    Processing {
        pending: PendingMigration,
    },
    Failed {
        error: MigrationError,
        warnings: Vec<MigrationError>,
    },
}

/// Result of migrating one record
#[derive(Debug, Clone, Serialize)]
pub struct MigrationOutcome {
    pub identity: RecordIdentity,
    #[serde(flatten)]
    pub status: MigrationStatus,
}

impl MigrationOutcome {
    pub fn succeeded(
        identity: RecordIdentity,
        resolved: ResolvedLocation,
        warnings: Vec<MigrationError>,
    ) -> Self {
        Self {
            identity,
            status: MigrationStatus::Succeeded { resolved, warnings },
        }
    }

    pub fn processing(pending: PendingMigration) -> Self {
        Self {
            identity: pending.identity.clone(),
            status: MigrationStatus::Processing { pending },
        }
    }

    pub fn failed(
        identity: RecordIdentity,
        error: MigrationError,
        warnings: Vec<MigrationError>,
    ) -> Self {
        Self {
            identity,
            status: MigrationStatus::Failed { error, warnings },
        }
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self.status, MigrationStatus::Succeeded { .. })
    }

    pub fn is_processing(&self) -> bool {
        matches!(self.status, MigrationStatus::Processing { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, MigrationStatus::Failed { .. })
    }

    /// Destination internal id once the record exists
    pub fn resolved_id(&self) -> Option<&str> {
        match &self.status {
            MigrationStatus::Succeeded { resolved, .. } => Some(resolved.internal_id.as_str()),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&MigrationError> {
        match &self.status {
            MigrationStatus::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn pending(&self) -> Option<&PendingMigration> {
        match &self.status {
            MigrationStatus::Processing { pending } => Some(pending),
            _ => None,
        }
    }

    pub fn into_pending(self) -> Option<PendingMigration> {
        match self.status {
            MigrationStatus::Processing { pending } => Some(pending),
            _ => None,
        }
    }

    pub fn warnings(&self) -> &[MigrationError] {
        match &self.status {
            MigrationStatus::Succeeded { warnings, .. } | MigrationStatus::Failed { warnings, .. } => {
                warnings
            }
            MigrationStatus::Processing { pending } => &pending.warnings,
        }
    }
}

/// Counts over a batch of outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub processing: usize,
    pub failed: usize,
    pub warnings: usize,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[MigrationOutcome]) -> Self {
        outcomes.iter().fold(Self::default(), |mut summary, outcome| {
            match outcome.status {
                MigrationStatus::Succeeded { .. } => summary.succeeded += 1,
                MigrationStatus::Processing { .. } => summary.processing += 1,
                MigrationStatus::Failed { .. } => summary.failed += 1,
            }
            summary.warnings += outcome.warnings().len();
            summary
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::domain::RecordKind;
    use serde_json::json;

    fn identity() -> RecordIdentity {
        RecordIdentity::from_payload(
            RecordKind::Invoice,
            &json!({"id": "318", "tranId": "INV-1001"}),
        )
    }

    #[test]
    fn test_failed_outcome_serializes_identity_and_detail() {
        let outcome = MigrationOutcome::failed(
            identity(),
            MigrationError::WriteRejected {
                messages: vec!["You only have 3 available".into()],
                is_inventory_error: true,
                detail: json!({"o:errorDetails": [{"detail": "You only have 3 available"}]}),
            },
            vec![],
        );

        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["identity"]["source_id"], "318");
        assert_eq!(value["error"]["kind"], "write_rejected");
        assert_eq!(value["error"]["is_inventory_error"], true);
        assert!(value["error"]["detail"]["o:errorDetails"].is_array());
    }

    #[test]
    fn test_summary_counts() {
        let resolved = ResolvedLocation::from_location_header("/record/v1/invoice/42").unwrap();
        let outcomes = vec![
            MigrationOutcome::succeeded(
                identity(),
                resolved,
                vec![MigrationError::LotMappingFailed {
                    source_lot_id: "1".into(),
                    message: "x".into(),
                }],
            ),
            MigrationOutcome::failed(
                identity(),
                MigrationError::Transform {
                    message: "bad".into(),
                },
                vec![],
            ),
        ];

        let summary = BatchSummary::from_outcomes(&outcomes);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.warnings, 1);
        assert_eq!(outcomes[0].resolved_id(), Some("42"));
    }
}
