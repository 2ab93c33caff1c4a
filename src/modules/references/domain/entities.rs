use serde::{Deserialize, Serialize};

/// A foreign-key field on a source record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub source_id: String,
    pub field_name: String,
    /// Target kind the field points at, after polymorphic dispatch
    pub record_kind: String,
}

impl Reference {
    pub fn new(
        source_id: impl Into<String>,
        field_name: impl Into<String>,
        record_kind: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            field_name: field_name.into(),
            record_kind: record_kind.into(),
        }
    }
}

/// A reference plus its counterpart id in the destination.
///
/// `destination_id` is `None` exactly when the referenced record has not been
/// migrated yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedReference {
    #[serde(flatten)]
    pub reference: Reference,
    pub destination_id: Option<String>,
}

impl ResolvedReference {
    pub fn new(reference: Reference, destination_id: Option<String>) -> Self {
        Self {
            reference,
            destination_id,
        }
    }

    pub fn exists_in_destination(&self) -> bool {
        self.destination_id.is_some()
    }
}
