/// Integration tests for batch migration
///
/// Tests cover:
/// - Mixed outcomes in one batch, returned in input order
/// - Failures keep the source identity and the destination's detail
/// - Processing records resolved concurrently in the background
/// - Caller-supplied transforms
mod utils;

use erp_migrate::modules::migration::BatchSummary;
use erp_migrate::modules::transport::SubmitResponse;
use erp_migrate::{
    MigrationContext, MigrationError, MigrationResult, RecordKind, RecordTransform,
    TransformRegistry,
};
use futures::future::join_all;
use serde_json::{json, Value};
use std::sync::Arc;
use utils::factories::RecordFactory;
use utils::helpers::{build_orchestrator, ScriptedTransport};

fn seed_references(transport: &ScriptedTransport) {
    transport
        .with_entity("customer", "7", json!({"custentity_dest_entity_id": "1700"}))
        .with_entity("account", "12", json!({"custrecord_dest_account_id": "1012"}));
}

#[tokio::test]
async fn mixed_batch_keeps_order_and_identity() {
    let transport = Arc::new(ScriptedTransport::new());
    seed_references(&transport);
    transport
        .accept(RecordKind::Invoice, "/job/invoice")
        .on_submit(
            RecordKind::Customer,
            SubmitResponse::Complete(json!({"id": "3001"})),
        )
        .on_submit(
            RecordKind::ItemFulfillment,
            SubmitResponse::Rejected(json!({
                "o:errorDetails": [{"detail": "You only have 3 available"}]
            })),
        );
    // No JournalEntry response is scripted, so that write errors out

    let orchestrator = build_orchestrator(transport.clone());
    let records = vec![
        (RecordKind::Invoice, RecordFactory::invoice().id("1").build()),
        (RecordKind::Customer, RecordFactory::new().id("2").field("entityId", json!("ACME")).build()),
        (RecordKind::ItemFulfillment, RecordFactory::item_fulfillment().id("3").build()),
        (RecordKind::JournalEntry, RecordFactory::new().id("4").tran_id("JE-9").build()),
    ];

    let outcomes = orchestrator
        .migrate_batch(records, &MigrationContext::default())
        .await;

    let ids: Vec<_> = outcomes
        .iter()
        .map(|o| o.identity.source_id.clone().unwrap_or_default())
        .collect();
    assert_eq!(ids, vec!["1", "2", "3", "4"]);

    assert!(outcomes[0].is_processing());
    assert_eq!(outcomes[1].resolved_id(), Some("3001"));

    let rejected = outcomes[2].error().unwrap();
    assert!(rejected.is_inventory_error());
    assert_eq!(outcomes[2].identity.label("tranId"), Some("IF-2001"));

    assert!(matches!(
        outcomes[3].error(),
        Some(MigrationError::Transport(_))
    ));
    assert_eq!(outcomes[3].identity.label("tranId"), Some("JE-9"));

    let summary = BatchSummary::from_outcomes(&outcomes);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.processing, 1);
    assert_eq!(summary.failed, 2);
}

#[tokio::test]
async fn failed_outcome_serializes_for_reporting() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.on_submit(
        RecordKind::Invoice,
        SubmitResponse::Rejected(json!({"detail": "Invalid field value"})),
    );

    let orchestrator = build_orchestrator(transport.clone());
    let outcome = orchestrator
        .migrate_record(
            RecordKind::Invoice,
            RecordFactory::new().id("318").tran_id("INV-1001").build(),
            &MigrationContext::default(),
        )
        .await;

    let report = serde_json::to_value(&outcome).unwrap();
    assert_eq!(report["status"], "failed");
    assert_eq!(report["identity"]["source_id"], "318");
    assert!(!report["error"].is_null());
}

#[tokio::test]
async fn processing_records_resolve_in_the_background() {
    let transport = Arc::new(ScriptedTransport::new());
    seed_references(&transport);
    transport
        .accept(RecordKind::Invoice, "/job/a")
        .accept(RecordKind::Invoice, "/job/b")
        .running("/job/a", 1)
        .succeed_job("/job/a", "/record/v1/invoice/41")
        .succeed_job("/job/b", "/record/v1/invoice/42");

    let orchestrator = Arc::new(build_orchestrator(transport.clone()));
    let records = vec![
        (RecordKind::Invoice, RecordFactory::invoice().id("1").build()),
        (RecordKind::Invoice, RecordFactory::invoice().id("2").build()),
    ];

    let outcomes = orchestrator
        .migrate_batch(records, &MigrationContext::default())
        .await;
    assert!(outcomes.iter().all(|o| o.is_processing()));

    let handles: Vec<_> = outcomes
        .into_iter()
        .filter_map(|o| o.into_pending())
        .map(|pending| orchestrator.spawn_resolution(pending))
        .collect();

    let mut resolved: Vec<String> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().resolved_id().unwrap().to_string())
        .collect();
    resolved.sort();

    assert_eq!(resolved, vec!["41", "42"]);
    assert_eq!(transport.poll_count("/job/a"), 2);
    assert_eq!(transport.poll_count("/job/b"), 1);
}

#[tokio::test]
async fn exhausted_polling_fails_with_timeout() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.accept(RecordKind::Customer, "/job/slow");

    let orchestrator = build_orchestrator(transport.clone());
    let outcome = orchestrator
        .migrate_record(
            RecordKind::Customer,
            RecordFactory::new().id("5").build(),
            &MigrationContext::default(),
        )
        .await;

    let outcome = orchestrator
        .poll_migration(outcome.into_pending().unwrap())
        .await;

    assert!(matches!(
        outcome.error(),
        Some(MigrationError::JobTimedOut { attempts: 5, .. })
    ));
    assert_eq!(outcome.identity.source_id.as_deref(), Some("5"));
    assert_eq!(transport.poll_count("/job/slow"), 5);
}

struct UppercaseMemo;

impl RecordTransform for UppercaseMemo {
    fn transform(&self, _kind: RecordKind, source: &Value) -> MigrationResult<Value> {
        let memo = source["memo"].as_str().unwrap_or_default().to_uppercase();
        Ok(json!({ "memo": memo, "externalId": source["id"] }))
    }
}

#[tokio::test]
async fn registered_transform_shapes_the_payload() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.on_submit(
        RecordKind::JournalEntry,
        SubmitResponse::Complete(json!({"id": "600"})),
    );

    let orchestrator = build_orchestrator(transport.clone()).with_transforms(
        TransformRegistry::default().with(RecordKind::JournalEntry, Arc::new(UppercaseMemo)),
    );

    let outcome = orchestrator
        .migrate_record(
            RecordKind::JournalEntry,
            RecordFactory::new().id("60").field("memo", json!("year end")).build(),
            &MigrationContext::default(),
        )
        .await;

    assert!(outcome.is_succeeded());
    let written = &transport.submitted_of(RecordKind::JournalEntry)[0].payload;
    assert_eq!(written, &json!({"memo": "YEAR END", "externalId": "60"}));
}
