pub mod outcome;
pub mod state;

pub use outcome::{BatchSummary, MigrationOutcome, MigrationStatus, PendingMigration};
pub use state::{RecordRun, RecordState};
