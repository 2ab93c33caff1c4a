/// Record migration orchestration
///
/// Architecture:
/// - Domain: per-record state machine and outcomes
/// - Transform: kind-specific shaping of source payloads
/// - Orchestrator: composes expansion, lot reconciliation, submission and
///   job resolution for single records and batches
pub mod domain;
pub mod orchestrator;
pub mod transform;

pub use domain::{
    BatchSummary, MigrationOutcome, MigrationStatus, PendingMigration, RecordRun, RecordState,
};
pub use orchestrator::{MigrationContext, MigrationOrchestrator};
pub use transform::{DefaultTransform, RecordTransform, TransformRegistry};
