mod record_identity;
mod record_kind;

pub use record_identity::{scalar_to_string, RecordIdentity};
pub use record_kind::RecordKind;
