//! Cross-instance reference expansion
//!
//! Every reference field on a record is annotated with the id of its
//! counterpart in the destination, looked up through the mapped-id attribute
//! the migration writes onto already-migrated source records.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::time::sleep;

use super::cache::ReferenceCache;
use super::domain::{
    resolve_target, Reference, ResolvedReference, TargetSpec, PLACEHOLDER_IDS,
    REFERENCE_TABLE_VERSION,
};
use crate::modules::transport::ErpTransport;
use crate::shared::config::MigrationConfig;
use crate::shared::domain::value_objects::scalar_to_string;
use crate::shared::domain::RecordKind;
use crate::shared::errors::{MigrationError, MigrationResult};

pub const DESTINATION_ID_FIELD: &str = "destinationId";
pub const EXPANSION_ERROR_FIELD: &str = "expansionError";

/// Expanded record plus what happened on the way
#[derive(Debug, Clone)]
pub struct Expansion {
    pub record: Value,
    pub resolved: Vec<ResolvedReference>,
    /// Non-fatal `ReferenceExpansionFailed` entries
    pub failures: Vec<MigrationError>,
}

impl Expansion {
    fn new(record: Value, report: FieldReport) -> Self {
        Self {
            record,
            resolved: report.resolved,
            failures: report.failures,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Default)]
struct FieldReport {
    resolved: Vec<ResolvedReference>,
    failures: Vec<MigrationError>,
}

impl FieldReport {
    fn merge(&mut self, other: FieldReport) {
        self.resolved.extend(other.resolved);
        self.failures.extend(other.failures);
    }
}

pub struct ReferenceExpander {
    transport: Arc<dyn ErpTransport>,
    cache: Arc<ReferenceCache>,
    line_batch_size: usize,
    line_batch_pause: Duration,
}

impl ReferenceExpander {
    pub fn new(transport: Arc<dyn ErpTransport>, cache: Arc<ReferenceCache>) -> Self {
        Self {
            transport,
            cache,
            line_batch_size: MigrationConfig::DEFAULT_LINE_BATCH_SIZE,
            line_batch_pause: Duration::from_millis(MigrationConfig::DEFAULT_LINE_BATCH_PAUSE_MS),
        }
    }

    pub fn with_line_batching(mut self, batch_size: usize, pause: Duration) -> Self {
        self.line_batch_size = batch_size.max(1);
        self.line_batch_pause = pause;
        self
    }

    pub fn from_config(
        transport: Arc<dyn ErpTransport>,
        cache: Arc<ReferenceCache>,
        config: &MigrationConfig,
    ) -> Self {
        Self::new(transport, cache)
            .with_line_batching(config.line_batch_size, config.line_batch_pause)
    }

    pub fn cache(&self) -> &Arc<ReferenceCache> {
        &self.cache
    }

    /// Expand the top-level reference fields of `record`.
    ///
    /// Non-object records are returned untouched.
    pub async fn expand(&self, mut record: Value, kind: RecordKind) -> Expansion {
        let report = match record.as_object_mut() {
            Some(fields) => self.expand_fields(fields, kind, "").await,
            None => FieldReport::default(),
        };

        log::debug!(
            "Expanded {} references on {} (tables v{}, {} failed)",
            report.resolved.len(),
            kind,
            REFERENCE_TABLE_VERSION,
            report.failures.len()
        );
        Expansion::new(record, report)
    }

    /// Expand reference fields on every line of every sublist.
    ///
    /// Lines are expanded one after another, in batches of `line_batch_size`
    /// with a pause in between, so repeated ids on later lines hit the cache.
    pub async fn expand_lines(&self, mut record: Value, kind: RecordKind) -> Expansion {
        let mut report = FieldReport::default();
        let Some(fields) = record.as_object_mut() else {
            return Expansion::new(record, report);
        };

        let mut first_batch = true;
        for (sublist, value) in fields.iter_mut() {
            let Some(lines) = value.get_mut("items").and_then(Value::as_array_mut) else {
                continue;
            };

            for (batch_index, batch) in lines.chunks_mut(self.line_batch_size).enumerate() {
                if !first_batch && !self.line_batch_pause.is_zero() {
                    sleep(self.line_batch_pause).await;
                }
                first_batch = false;

                let offset = batch_index * self.line_batch_size;
                for (i, line) in batch.iter_mut().enumerate() {
                    let Some(line_fields) = line.as_object_mut() else {
                        continue;
                    };
                    let prefix = format!("{}[{}].", sublist, offset + i);
                    report.merge(self.expand_fields(line_fields, kind, &prefix).await);
                }
            }
        }

        Expansion::new(record, report)
    }

    /// Header fields then sublist lines
    pub async fn expand_record(&self, record: Value, kind: RecordKind) -> Expansion {
        let header = self.expand(record, kind).await;
        let mut lines = self.expand_lines(header.record, kind).await;

        let mut resolved = header.resolved;
        resolved.append(&mut lines.resolved);
        let mut failures = header.failures;
        failures.append(&mut lines.failures);

        Expansion {
            record: lines.record,
            resolved,
            failures,
        }
    }

    async fn expand_fields(
        &self,
        fields: &mut Map<String, Value>,
        kind: RecordKind,
        label_prefix: &str,
    ) -> FieldReport {
        let mut report = FieldReport::default();

        for (field_name, value) in fields.iter_mut() {
            match self.expand_field(field_name, value, kind).await {
                Ok(Some(resolved)) => report.resolved.push(resolved),
                Ok(None) => {}
                Err(MigrationError::ReferenceExpansionFailed {
                    source_id, message, ..
                }) => {
                    let field = format!("{}{}", label_prefix, field_name);
                    log::warn!(
                        "Reference {} -> {} on {} not expanded: {}",
                        field,
                        source_id,
                        kind,
                        message
                    );
                    report.failures.push(MigrationError::ReferenceExpansionFailed {
                        field,
                        source_id,
                        message,
                    });
                }
                Err(other) => report.failures.push(other),
            }
        }

        report
    }

    /// Expand one field in place. `Ok(None)` means the field is not an
    /// expandable reference or was already expanded.
    async fn expand_field(
        &self,
        field_name: &str,
        value: &mut Value,
        kind: RecordKind,
    ) -> MigrationResult<Option<ResolvedReference>> {
        let Some(object) = value.as_object() else {
            return Ok(None);
        };
        if object.contains_key(DESTINATION_ID_FIELD) {
            return Ok(None);
        }
        let Some(source_id) = object.get("id").and_then(scalar_to_string) else {
            return Ok(None);
        };
        if PLACEHOLDER_IDS.contains(&source_id.trim()) {
            return Ok(None);
        }
        let Some(target) = resolve_target(field_name, kind, value) else {
            return Ok(None);
        };

        let reference = Reference::new(source_id, field_name, target.kind);
        match self.lookup(reference, target).await {
            Ok(resolved) => {
                if let Some(object) = value.as_object_mut() {
                    object.remove(EXPANSION_ERROR_FIELD);
                    object.insert(
                        DESTINATION_ID_FIELD.to_string(),
                        resolved
                            .destination_id
                            .clone()
                            .map(Value::String)
                            .unwrap_or(Value::Null),
                    );
                }
                Ok(Some(resolved))
            }
            Err(error) => {
                if let Some(object) = value.as_object_mut() {
                    object.insert(
                        EXPANSION_ERROR_FIELD.to_string(),
                        Value::String(error.to_string()),
                    );
                }
                Err(error)
            }
        }
    }

    /// Cache first, then the destination-mapping store.
    ///
    /// Only resolutions with a destination id are cached; a missing
    /// counterpart may be migrated later in the same run.
    pub async fn lookup(
        &self,
        reference: Reference,
        target: &TargetSpec,
    ) -> MigrationResult<ResolvedReference> {
        if let Some(cached) = self.cache.get(&reference) {
            return Ok(cached);
        }

        let lookup_id = target.format_id(&reference.source_id);
        let entity = self
            .transport
            .fetch_entity(target.kind, &lookup_id)
            .await
            .map_err(|e| MigrationError::ReferenceExpansionFailed {
                field: reference.field_name.clone(),
                source_id: reference.source_id.clone(),
                message: e.to_string(),
            })?;

        let destination_id = entity
            .get(target.mapped_attribute)
            .and_then(scalar_to_string)
            .filter(|id| !PLACEHOLDER_IDS.contains(&id.trim()));

        if destination_id.is_none() {
            log::debug!(
                "{} {} has no destination counterpart yet",
                target.kind,
                reference.source_id
            );
        }

        let resolved = ResolvedReference::new(reference, destination_id);
        if resolved.exists_in_destination() {
            self.cache.insert(resolved.clone());
        }
        Ok(resolved)
    }
}

/// Outgoing write payload for an expanded record.
///
/// References with a destination id become `{"id": destinationId}`.
/// References whose counterpart is missing or whose expansion failed are
/// dropped so the write never points at a source-side id.
pub fn destination_payload(record: &Value) -> Value {
    let mut payload = record.clone();
    let Some(fields) = payload.as_object_mut() else {
        return payload;
    };

    rewrite_references(fields);
    for value in fields.values_mut() {
        if let Some(lines) = value.get_mut("items").and_then(Value::as_array_mut) {
            for line in lines.iter_mut().filter_map(Value::as_object_mut) {
                rewrite_references(line);
            }
        }
    }
    payload
}

fn rewrite_references(fields: &mut Map<String, Value>) {
    let mut unresolved = Vec::new();

    for (name, value) in fields.iter_mut() {
        let Some(object) = value.as_object() else {
            continue;
        };
        if object.contains_key(EXPANSION_ERROR_FIELD) {
            unresolved.push(name.clone());
            continue;
        }
        match object.get(DESTINATION_ID_FIELD).cloned() {
            Some(Value::String(id)) => *value = serde_json::json!({ "id": id }),
            Some(_) => unresolved.push(name.clone()),
            None => {}
        }
    }

    for name in unresolved {
        log::debug!("Dropping unresolved reference {} from payload", name);
        fields.remove(&name);
    }
}
