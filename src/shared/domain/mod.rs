/// Shared domain concepts used by every migration component
pub mod value_objects;

pub use value_objects::{RecordIdentity, RecordKind};
