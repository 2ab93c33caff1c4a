// Shared kernel used by the migration components

pub mod config; // Environment-driven configuration
pub mod domain; // Record kinds and identities
pub mod errors; // Infrastructure and migration error types
pub mod utils; // Logging helpers

// Re-exports for convenience
pub use config::MigrationConfig;
pub use domain::{RecordIdentity, RecordKind};
pub use errors::{AppError, AppResult, MigrationError, MigrationResult};
