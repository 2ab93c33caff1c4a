//! Record migration between two instances of a hosted ERP platform whose
//! write path is asynchronous.
//!
//! - `modules::jobs`: resolves accepted writes to the created record's id
//! - `modules::references`: rewrites foreign keys to destination ids
//! - `modules::lots`: carries lot and serial numbers across instances
//! - `modules::migration`: per-record pipeline and batches
//! - `modules::transport`: the destination REST API behind `ErpTransport`

pub mod modules;
pub mod shared;

pub use modules::jobs::{AsyncJobResolver, JobHandle, PollPolicy, PollPolicyTable, ResolvedLocation};
pub use modules::lots::{LotMappingTable, LotReconciler, PendingLotMapping, SourceLotIndex};
pub use modules::migration::{
    MigrationContext, MigrationOrchestrator, MigrationOutcome, MigrationStatus, PendingMigration,
    RecordTransform, TransformRegistry,
};
pub use modules::references::{ReferenceCache, ReferenceExpander};
pub use modules::transport::{ErpTransport, RestTransport};
pub use shared::{
    AppError, AppResult, MigrationConfig, MigrationError, MigrationResult, RecordIdentity,
    RecordKind,
};
