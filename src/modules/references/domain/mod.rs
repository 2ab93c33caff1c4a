pub mod entities;
pub mod tables;

pub use entities::{Reference, ResolvedReference};
pub use tables::{
    is_reference_field, resolve_target, target_spec, LookupIdFormat, TargetSpec,
    PLACEHOLDER_IDS, REFERENCE_TABLE_VERSION,
};
