use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::RecordKind;

/// Fields an operator recognises a record by, in lookup order.
const IDENTIFYING_FIELDS: [&str; 5] = ["tranId", "entityId", "externalId", "name", "itemId"];

/// Identifying fields of the source record.
///
/// Every terminal outcome carries one so failures can be diagnosed without
/// re-fetching the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordIdentity {
    pub kind: RecordKind,
    pub source_id: Option<String>,
    pub labels: Vec<(String, String)>,
}

impl RecordIdentity {
    pub fn from_payload(kind: RecordKind, payload: &Value) -> Self {
        let source_id = payload.get("id").and_then(scalar_to_string);
        let labels = IDENTIFYING_FIELDS
            .iter()
            .filter_map(|field| {
                payload
                    .get(*field)
                    .and_then(scalar_to_string)
                    .map(|value| (field.to_string(), value))
            })
            .collect();

        Self {
            kind,
            source_id,
            labels,
        }
    }

    pub fn label(&self, field: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }
}

impl fmt::Display for RecordIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(id) = &self.source_id {
            write!(f, " #{}", id)?;
        }
        if let Some((_, label)) = self.labels.first() {
            write!(f, " ({})", label)?;
        }
        Ok(())
    }
}

/// Ids arrive as strings or numbers depending on the endpoint.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
