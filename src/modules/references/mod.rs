/// Cross-instance reference reconciliation
///
/// Architecture:
/// - Domain: versioned field and target tables, reference types
/// - Cache: run-scoped memo of resolved references
/// - Expander: annotates reference fields with their destination ids
pub mod cache;
pub mod domain;
pub mod expander;

pub use cache::{CacheStats, ReferenceCache};
pub use domain::{Reference, ResolvedReference, REFERENCE_TABLE_VERSION};
pub use expander::{
    destination_payload, Expansion, ReferenceExpander, DESTINATION_ID_FIELD, EXPANSION_ERROR_FIELD,
};
