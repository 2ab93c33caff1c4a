//! Source-to-destination record shaping
//!
//! Kind-specific field mapping is configuration supplied by the caller as
//! `RecordTransform` implementations; every kind without one gets
//! `DefaultTransform`.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::shared::domain::value_objects::scalar_to_string;
use crate::shared::domain::RecordKind;
use crate::shared::errors::{MigrationError, MigrationResult};

/// Fields the destination computes itself
pub const READ_ONLY_FIELDS: [&str; 5] = [
    "id",
    "createdDate",
    "dateCreated",
    "lastModifiedDate",
    "refName",
];

pub trait RecordTransform: Send + Sync {
    fn transform(&self, kind: RecordKind, source: &Value) -> MigrationResult<Value>;
}

/// Strips read-only fields and stamps `externalId` with the source id
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTransform;

impl RecordTransform for DefaultTransform {
    fn transform(&self, kind: RecordKind, source: &Value) -> MigrationResult<Value> {
        let fields = source.as_object().ok_or_else(|| MigrationError::Transform {
            message: format!("{} source payload is not an object", kind),
        })?;

        let mut record = fields.clone();
        for field in READ_ONLY_FIELDS {
            record.remove(field);
        }
        strip_links(&mut record);

        if let Some(source_id) = fields.get("id").and_then(scalar_to_string) {
            record.insert("externalId".to_string(), Value::String(source_id));
        }

        Ok(Value::Object(record))
    }
}

/// `links` appear on the record and on every nested resource
fn strip_links(fields: &mut Map<String, Value>) {
    fields.remove("links");
    for value in fields.values_mut() {
        match value {
            Value::Object(nested) => strip_links(nested),
            Value::Array(items) => {
                for nested in items.iter_mut().filter_map(Value::as_object_mut) {
                    strip_links(nested);
                }
            }
            _ => {}
        }
    }
}

/// Per-kind transforms with a fallback
#[derive(Clone)]
pub struct TransformRegistry {
    fallback: Arc<dyn RecordTransform>,
    by_kind: HashMap<RecordKind, Arc<dyn RecordTransform>>,
}

impl TransformRegistry {
    pub fn new(fallback: Arc<dyn RecordTransform>) -> Self {
        Self {
            fallback,
            by_kind: HashMap::new(),
        }
    }

    pub fn with(mut self, kind: RecordKind, transform: Arc<dyn RecordTransform>) -> Self {
        self.by_kind.insert(kind, transform);
        self
    }

    pub fn get(&self, kind: RecordKind) -> &dyn RecordTransform {
        self.by_kind
            .get(&kind)
            .map(Arc::as_ref)
            .unwrap_or_else(|| self.fallback.as_ref())
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::new(Arc::new(DefaultTransform))
    }
}
