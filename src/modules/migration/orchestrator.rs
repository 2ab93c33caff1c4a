//! Per-record migration pipeline
//!
//! transform → expand references → lot pre-pass → submit → resolve → lot
//! post-pass. Records are independent; a batch runs them concurrently and
//! never stops because one of them failed.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::domain::{BatchSummary, MigrationOutcome, PendingMigration, RecordRun, RecordState};
use super::transform::TransformRegistry;
use crate::modules::jobs::{classify_rejection, AsyncJobResolver, PollPolicyTable, ResolvedLocation};
use crate::modules::lots::{reconcile_record, LotMappingTable, LotPolicy, LotReconciler, SourceLotIndex};
use crate::modules::references::{destination_payload, ReferenceCache, ReferenceExpander};
use crate::modules::transport::{ErpTransport, RestTransport, SubmitResponse};
use crate::shared::config::MigrationConfig;
use crate::shared::domain::{RecordIdentity, RecordKind};
use crate::shared::errors::{AppResult, MigrationError, MigrationResult};
use crate::shared::utils::{MigrationLog, TimedOperation};
use crate::{log_debug, log_info, log_warn};

/// Run-scoped data shared by every record of a migration
#[derive(Debug, Clone, Default)]
pub struct MigrationContext {
    pub lot_mappings: Arc<LotMappingTable>,
    /// Lot numbers of the source transaction, for line-number correlated kinds
    pub source_lots: Option<SourceLotIndex>,
}

impl MigrationContext {
    pub fn new(lot_mappings: Arc<LotMappingTable>) -> Self {
        Self {
            lot_mappings,
            source_lots: None,
        }
    }

    pub fn with_source_lots(mut self, source_lots: SourceLotIndex) -> Self {
        self.source_lots = Some(source_lots);
        self
    }
}

pub struct MigrationOrchestrator {
    run_id: Uuid,
    transport: Arc<dyn ErpTransport>,
    transforms: TransformRegistry,
    expander: ReferenceExpander,
    resolver: Arc<AsyncJobResolver>,
    lots: LotReconciler,
    config: MigrationConfig,
}

impl MigrationOrchestrator {
    pub fn new(
        transport: Arc<dyn ErpTransport>,
        cache: Arc<ReferenceCache>,
        config: MigrationConfig,
    ) -> Self {
        let expander = ReferenceExpander::from_config(transport.clone(), cache, &config);
        let resolver = Arc::new(AsyncJobResolver::new(
            transport.clone(),
            PollPolicyTable::standard(),
        ));

        Self {
            run_id: config.run_id,
            transforms: TransformRegistry::default(),
            expander,
            lots: Self::lot_reconciler(&transport, &resolver, &config),
            resolver,
            transport,
            config,
        }
    }

    /// Orchestrator over the REST transport with a fresh reference cache
    pub fn from_config(config: MigrationConfig) -> AppResult<Self> {
        let transport: Arc<dyn ErpTransport> = Arc::new(RestTransport::new(&config)?);
        Ok(Self::new(transport, Arc::new(ReferenceCache::new()), config))
    }

    fn lot_reconciler(
        transport: &Arc<dyn ErpTransport>,
        resolver: &Arc<AsyncJobResolver>,
        config: &MigrationConfig,
    ) -> LotReconciler {
        LotReconciler::new(transport.clone(), resolver.clone())
            .with_batching(config.line_batch_size, config.line_batch_pause)
    }

    pub fn with_transforms(mut self, transforms: TransformRegistry) -> Self {
        self.transforms = transforms;
        self
    }

    /// Swap the resolver used for records and lot-mapping writes
    pub fn with_resolver(mut self, resolver: AsyncJobResolver) -> Self {
        let resolver = Arc::new(resolver);
        self.lots = Self::lot_reconciler(&self.transport, &resolver, &self.config);
        self.resolver = resolver;
        self
    }

    pub fn with_poll_policies(self, policies: PollPolicyTable) -> Self {
        let resolver = AsyncJobResolver::new(self.transport.clone(), policies);
        self.with_resolver(resolver)
    }

    pub fn with_cancellation(self, token: CancellationToken) -> Self {
        let resolver = (*self.resolver).clone().with_cancellation(token);
        self.with_resolver(resolver)
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn reference_cache(&self) -> &Arc<ReferenceCache> {
        self.expander.cache()
    }

    /// Load the run's lot-mapping table from the destination
    pub async fn load_context(&self) -> AppResult<MigrationContext> {
        let table = LotMappingTable::load(self.transport.as_ref()).await?;
        Ok(MigrationContext::new(Arc::new(table)))
    }

    /// Migrate one source record.
    ///
    /// Returns `Processing` as soon as the destination accepts the write;
    /// finish it with `poll_migration` or `spawn_resolution`.
    pub async fn migrate_record(
        &self,
        kind: RecordKind,
        source: Value,
        context: &MigrationContext,
    ) -> MigrationOutcome {
        let identity = RecordIdentity::from_payload(kind, &source);
        let timer = TimedOperation::new(&format!("migrate {}", identity));
        let mut run = RecordRun::new(identity);
        let mut warnings = Vec::new();

        let outcome = match self
            .submit_record(kind, source, context, &mut run, &mut warnings)
            .await
        {
            Ok(outcome) => outcome,
            Err(error) => self.fail(&mut run, error, warnings),
        };

        timer.finish();
        outcome
    }

    async fn submit_record(
        &self,
        kind: RecordKind,
        source: Value,
        context: &MigrationContext,
        run: &mut RecordRun,
        warnings: &mut Vec<MigrationError>,
    ) -> MigrationResult<MigrationOutcome> {
        let record = self.transforms.get(kind).transform(kind, &source)?;
        run.advance(RecordState::Transformed)?;

        let expansion = self.expander.expand_record(record, kind).await;
        warnings.extend(expansion.failures);

        let mut payload = destination_payload(&expansion.record);
        let policy = LotPolicy::for_kind(kind, context.source_lots.as_ref());
        let pending_lots = reconcile_record(&mut payload, &context.lot_mappings, &policy)?;

        let response = self.transport.submit_write(kind, &payload).await?;
        run.advance(RecordState::Submitted)?;

        match response {
            SubmitResponse::Accepted(job) => {
                run.advance(RecordState::Processing)?;
                log_info!("{} accepted as job {}", run.identity, job.poll_url);
                Ok(MigrationOutcome::processing(PendingMigration {
                    identity: run.identity.clone(),
                    job,
                    pending_lots,
                    warnings: std::mem::take(warnings),
                }))
            }
            SubmitResponse::Complete(body) => {
                run.advance(RecordState::Resolving)?;
                let resolved = ResolvedLocation::from_completed(&body).ok_or_else(|| {
                    MigrationError::protocol(
                        "submit",
                        "synchronous completion without a numeric id",
                        body.clone(),
                    )
                })?;
                warnings.extend(
                    self.lots
                        .complete_mappings(kind, &resolved, &pending_lots)
                        .await,
                );
                self.succeed(run, resolved, std::mem::take(warnings))
            }
            SubmitResponse::Rejected(detail) => Err(classify_rejection(detail)),
        }
    }

    /// Finish a record the destination accepted asynchronously
    pub async fn poll_migration(&self, pending: PendingMigration) -> MigrationOutcome {
        let PendingMigration {
            identity,
            job,
            pending_lots,
            mut warnings,
        } = pending;
        let kind = job.record_kind;
        let mut run = RecordRun::at(identity, RecordState::Processing);

        if let Err(e) = run.advance(RecordState::Resolving) {
            return self.fail(&mut run, e.into(), warnings);
        }

        match self.resolver.resolve_job(job).await {
            Ok(resolved) => {
                warnings.extend(
                    self.lots
                        .complete_mappings(kind, &resolved, &pending_lots)
                        .await,
                );
                match self.succeed(&mut run, resolved, warnings.clone()) {
                    Ok(outcome) => outcome,
                    Err(e) => self.fail(&mut run, e, warnings),
                }
            }
            Err(error) => self.fail(&mut run, error, warnings),
        }
    }

    /// Run `poll_migration` on its own task
    pub fn spawn_resolution(self: &Arc<Self>, pending: PendingMigration) -> JoinHandle<MigrationOutcome> {
        let orchestrator = Arc::clone(self);
        log_debug!("Resolving {} in the background", pending.identity);
        tokio::spawn(async move { orchestrator.poll_migration(pending).await })
    }

    /// Migrate independent records concurrently, at most
    /// `max_concurrent_records` at a time. Outcomes come back in input order.
    pub async fn migrate_batch(
        &self,
        records: Vec<(RecordKind, Value)>,
        context: &MigrationContext,
    ) -> Vec<MigrationOutcome> {
        let total = records.len();
        let timer = TimedOperation::new(&format!("migrate batch of {}", total));
        log_info!("Run {}: migrating {} records", self.run_id, total);

        let mut indexed = stream::iter(records.into_iter().enumerate().map(
            |(index, (kind, source))| async move {
                (index, self.migrate_record(kind, source, context).await)
            },
        ))
        .buffer_unordered(self.config.max_concurrent_records.max(1))
        .collect::<Vec<_>>()
        .await;

        indexed.sort_by_key(|(index, _)| *index);
        let outcomes: Vec<MigrationOutcome> =
            indexed.into_iter().map(|(_, outcome)| outcome).collect();

        let summary = BatchSummary::from_outcomes(&outcomes);
        MigrationLog::batch_summary(
            &self.run_id,
            summary.succeeded,
            summary.processing,
            summary.failed,
            summary.warnings,
        );
        timer.finish_with_info(&format!("run {}", self.run_id));
        outcomes
    }

    fn succeed(
        &self,
        run: &mut RecordRun,
        resolved: ResolvedLocation,
        warnings: Vec<MigrationError>,
    ) -> MigrationResult<MigrationOutcome> {
        run.advance(RecordState::Succeeded)?;
        log_info!(
            "{} migrated as {} ({} warnings)",
            run.identity,
            resolved.internal_id,
            warnings.len()
        );
        Ok(MigrationOutcome::succeeded(
            run.identity.clone(),
            resolved,
            warnings,
        ))
    }

    fn fail(
        &self,
        run: &mut RecordRun,
        error: MigrationError,
        warnings: Vec<MigrationError>,
    ) -> MigrationOutcome {
        run.fail();
        log_warn!("{} failed: {}", run.identity, error);
        MigrationOutcome::failed(run.identity.clone(), error, warnings)
    }
}
