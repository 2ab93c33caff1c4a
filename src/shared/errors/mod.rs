mod app_error;
mod migration_error;

pub use app_error::{AppError, AppResult};
pub use migration_error::{MigrationError, MigrationResult};
