//! Lot mapping post-pass
//!
//! Once the owning record exists in the destination, the lots it created are
//! read back and a lot-mapping record is written for each pending mapping.
//! Nothing here can fail the owning record; problems come back as
//! `LotMappingFailed` warnings.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde_json::Value;
use tokio::time::sleep;

use super::domain::assignments::{assignment_display_name, assignment_lot_id, line_assignments};
use super::domain::{lot_mapping_payload, PendingLotMapping};
use crate::modules::jobs::{classify_rejection, AsyncJobResolver, ResolvedLocation};
use crate::modules::transport::{ErpTransport, SubmitResponse};
use crate::shared::config::MigrationConfig;
use crate::shared::domain::RecordKind;
use crate::shared::errors::{AppError, MigrationError, MigrationResult};

/// Attempts per mapping write before it is abandoned
pub const DEFAULT_MAPPING_ATTEMPTS: u32 = 2;

pub struct LotReconciler {
    transport: Arc<dyn ErpTransport>,
    resolver: Arc<AsyncJobResolver>,
    batch_size: usize,
    batch_pause: Duration,
    mapping_attempts: u32,
}

impl LotReconciler {
    pub fn new(transport: Arc<dyn ErpTransport>, resolver: Arc<AsyncJobResolver>) -> Self {
        Self {
            transport,
            resolver,
            batch_size: MigrationConfig::DEFAULT_LINE_BATCH_SIZE,
            batch_pause: Duration::from_millis(MigrationConfig::DEFAULT_LINE_BATCH_PAUSE_MS),
            mapping_attempts: DEFAULT_MAPPING_ATTEMPTS,
        }
    }

    pub fn with_batching(mut self, batch_size: usize, pause: Duration) -> Self {
        self.batch_size = batch_size.max(1);
        self.batch_pause = pause;
        self
    }

    pub fn with_mapping_attempts(mut self, attempts: u32) -> Self {
        self.mapping_attempts = attempts.max(1);
        self
    }

    /// Write mappings for every lot the destination created with the record
    /// at `location`. Returns the mappings that could not be written.
    pub async fn complete_mappings(
        &self,
        kind: RecordKind,
        location: &ResolvedLocation,
        pending: &[PendingLotMapping],
    ) -> Vec<MigrationError> {
        if pending.is_empty() {
            return Vec::new();
        }

        let created = match self
            .transport
            .fetch_entity(kind.as_str(), &location.internal_id)
            .await
        {
            Ok(created) => created,
            Err(e) => {
                log::error!(
                    "Could not read back {} {} for lot mappings: {}",
                    kind,
                    location.internal_id,
                    e
                );
                return pending
                    .iter()
                    .map(|mapping| MigrationError::LotMappingFailed {
                        source_lot_id: mapping.source_lot_id.clone(),
                        message: format!("owning record could not be read: {}", e),
                    })
                    .collect();
            }
        };

        let mut failures = Vec::new();
        for (batch_index, batch) in pending.chunks(self.batch_size).enumerate() {
            if batch_index > 0 && !self.batch_pause.is_zero() {
                sleep(self.batch_pause).await;
            }

            let results = join_all(
                batch
                    .iter()
                    .map(|mapping| self.complete_mapping(&created, mapping)),
            )
            .await;

            for (mapping, result) in batch.iter().zip(results) {
                let Err(e) = result else {
                    continue;
                };
                log::warn!(
                    "Lot {} ({}) on {} {} left unmapped: {}",
                    mapping.source_lot_id,
                    mapping.display_name,
                    kind,
                    location.internal_id,
                    e
                );
                failures.push(match e {
                    failure @ MigrationError::LotMappingFailed { .. } => failure,
                    other => MigrationError::LotMappingFailed {
                        source_lot_id: mapping.source_lot_id.clone(),
                        message: other.to_string(),
                    },
                });
            }
        }

        log::info!(
            "Lot post-pass for {} {}: {} mapped, {} failed",
            kind,
            location.internal_id,
            pending.len() - failures.len(),
            failures.len()
        );
        failures
    }

    async fn complete_mapping(
        &self,
        created: &Value,
        mapping: &PendingLotMapping,
    ) -> MigrationResult<ResolvedLocation> {
        let destination_lot_id = destination_lot_id(created, mapping)?;
        let payload = lot_mapping_payload(mapping, &destination_lot_id);

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.write_mapping(&payload).await {
                Ok(location) => {
                    log::debug!(
                        "Mapped lot {} -> {} (record {})",
                        mapping.source_lot_id,
                        destination_lot_id,
                        location.internal_id
                    );
                    return Ok(location);
                }
                Err(e) if attempt < self.mapping_attempts && is_retryable(&e) => {
                    log::warn!(
                        "Lot mapping write for {} failed (attempt {}/{}): {}",
                        mapping.source_lot_id,
                        attempt,
                        self.mapping_attempts,
                        e
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn write_mapping(&self, payload: &Value) -> MigrationResult<ResolvedLocation> {
        match self
            .transport
            .submit_write(RecordKind::LotMapping, payload)
            .await?
        {
            SubmitResponse::Accepted(job) => self.resolver.resolve_job(job).await,
            SubmitResponse::Complete(body) => completed_location(&body),
            SubmitResponse::Rejected(detail) => Err(classify_rejection(detail)),
        }
    }
}

/// Only a write the destination refused unprocessed is resubmitted; a timed
/// out job or a 5xx may still have created the mapping.
fn is_retryable(error: &MigrationError) -> bool {
    matches!(error, MigrationError::Transport(AppError::RateLimited(_)))
}

fn completed_location(body: &Value) -> MigrationResult<ResolvedLocation> {
    ResolvedLocation::from_completed(body).ok_or_else(|| {
        MigrationError::protocol(
            "lot mapping write",
            "completed write carries no numeric id",
            body.clone(),
        )
    })
}

/// New destination lot id for `mapping` on the created record
fn destination_lot_id(created: &Value, mapping: &PendingLotMapping) -> MigrationResult<String> {
    let line = created
        .get(&mapping.sublist)
        .and_then(|sublist| sublist.get("items"))
        .and_then(|items| items.get(mapping.owner_line))
        .ok_or_else(|| MigrationError::LotMappingFailed {
            source_lot_id: mapping.source_lot_id.clone(),
            message: format!(
                "created record has no {} line {}",
                mapping.sublist, mapping.owner_line
            ),
        })?;

    line_assignments(line)
        .into_iter()
        .flatten()
        .filter(|assignment| {
            assignment_display_name(assignment).as_deref() == Some(mapping.display_name.as_str())
        })
        .find_map(assignment_lot_id)
        .ok_or_else(|| MigrationError::LotMappingFailed {
            source_lot_id: mapping.source_lot_id.clone(),
            message: format!(
                "no lot named {} on {} line {}",
                mapping.display_name, mapping.sublist, mapping.owner_line
            ),
        })
}
