//! Lot assignment pre-pass
//!
//! Runs on the outgoing payload before submission: assignments whose lot
//! already exists in the destination point at it, the rest ask the
//! destination to create a new lot and are remembered as pending mappings.

use serde_json::{json, Value};

use super::correlation::{LotCorrelation, LotPolicy};
use super::entities::{LotMappingTable, PendingLotMapping, SourceLot, SourceLotIndex};
use crate::shared::domain::value_objects::scalar_to_string;
use crate::shared::errors::{MigrationError, MigrationResult};

pub const ISSUE_INVENTORY_NUMBER: &str = "issueInventoryNumber";
pub const RECEIPT_INVENTORY_NUMBER: &str = "receiptInventoryNumber";

/// Lot assignments of a line, if it carries any
pub fn line_assignments(line: &Value) -> Option<&Vec<Value>> {
    line.get("inventoryDetail")?
        .get("inventoryAssignment")?
        .get("items")?
        .as_array()
}

fn line_assignments_mut(line: &mut Value) -> Option<&mut Vec<Value>> {
    line.get_mut("inventoryDetail")?
        .get_mut("inventoryAssignment")?
        .get_mut("items")?
        .as_array_mut()
}

/// Lot display name on an assignment
pub fn assignment_display_name(assignment: &Value) -> Option<String> {
    let name = assignment
        .get(RECEIPT_INVENTORY_NUMBER)
        .and_then(Value::as_str)
        .or_else(|| {
            assignment
                .get(ISSUE_INVENTORY_NUMBER)
                .and_then(|lot| lot.get("refName"))
                .and_then(Value::as_str)
        })?
        .trim();

    (!name.is_empty()).then(|| name.to_string())
}

/// Lot id on an assignment
pub fn assignment_lot_id(assignment: &Value) -> Option<String> {
    assignment
        .get(ISSUE_INVENTORY_NUMBER)
        .or_else(|| assignment.get("inventoryNumber"))
        .and_then(|lot| lot.get("id"))
        .and_then(scalar_to_string)
}

fn unsupported(policy: &LotPolicy<'_>) -> MigrationError {
    MigrationError::LotCorrelationUnsupported {
        record_kind: policy.record_kind.to_string(),
    }
}

/// Source lot id of an assignment, plus its display name when known
fn correlate(
    assignment: &Value,
    correlation: LotCorrelation,
    line_number: Option<u32>,
    source_lots: Option<&SourceLotIndex>,
) -> Option<(String, Option<String>)> {
    let display_name = assignment_display_name(assignment);

    match correlation {
        LotCorrelation::IssueInventoryNumber => {
            Some((assignment_lot_id(assignment)?, display_name))
        }
        LotCorrelation::LineNumber => source_lots?
            .find(line_number?, display_name.as_deref())
            .map(|SourceLot { source_lot_id, display_name }| {
                (source_lot_id.clone(), Some(display_name.clone()))
            }),
        LotCorrelation::Unsupported => None,
    }
}

/// Patch or collect the lot assignments of one sublist's lines.
///
/// Fails with `LotCorrelationUnsupported` when a lot-bearing line belongs to
/// a kind with no correlation path, or to a line-number kind without a
/// `SourceLotIndex`.
pub fn reconcile(
    sublist: &str,
    lines: &mut [Value],
    prior: &LotMappingTable,
    policy: &LotPolicy<'_>,
) -> MigrationResult<Vec<PendingLotMapping>> {
    let mut pending = Vec::new();

    for (index, line) in lines.iter_mut().enumerate() {
        let line_number = line
            .get("line")
            .and_then(scalar_to_string)
            .and_then(|n| n.parse::<u32>().ok());
        let owner_item_id = line
            .get("item")
            .and_then(|item| item.get("id"))
            .and_then(scalar_to_string)
            .unwrap_or_default();
        let line_quantity = line.get("quantity").and_then(Value::as_f64);

        let Some(assignments) = line_assignments_mut(line) else {
            continue;
        };
        if assignments.is_empty() {
            continue;
        }

        match policy.correlation {
            LotCorrelation::Unsupported => return Err(unsupported(policy)),
            LotCorrelation::LineNumber if policy.source_lots.is_none() => {
                return Err(unsupported(policy))
            }
            _ => {}
        }

        for assignment in assignments.iter_mut() {
            let Some((source_lot_id, display_name)) =
                correlate(assignment, policy.correlation, line_number, policy.source_lots)
            else {
                log::warn!(
                    "{} line {} has a lot assignment with no source lot; left as is",
                    policy.record_kind,
                    index
                );
                continue;
            };
            let Some(fields) = assignment.as_object_mut() else {
                continue;
            };

            if let Some(destination_lot_id) = prior.get(&source_lot_id) {
                fields.insert(
                    ISSUE_INVENTORY_NUMBER.to_string(),
                    json!({ "id": destination_lot_id }),
                );
                continue;
            }

            // Unknown lot: the source id must never reach the destination
            fields.remove(ISSUE_INVENTORY_NUMBER);
            let Some(display_name) = display_name else {
                log::warn!(
                    "{} line {} lot {} has no name to create it under; lot dropped",
                    policy.record_kind,
                    index,
                    source_lot_id
                );
                continue;
            };
            fields.insert(
                RECEIPT_INVENTORY_NUMBER.to_string(),
                Value::String(display_name.clone()),
            );

            let quantity = fields
                .get("quantity")
                .and_then(Value::as_f64)
                .or(line_quantity)
                .unwrap_or_default();

            pending.push(PendingLotMapping {
                source_lot_id,
                display_name,
                owner_item_id: owner_item_id.clone(),
                sublist: sublist.to_string(),
                owner_line: index,
                quantity,
            });
        }
    }

    Ok(pending)
}

/// `reconcile` over every sublist of `record`
pub fn reconcile_record(
    record: &mut Value,
    prior: &LotMappingTable,
    policy: &LotPolicy<'_>,
) -> MigrationResult<Vec<PendingLotMapping>> {
    let mut pending = Vec::new();
    let Some(fields) = record.as_object_mut() else {
        return Ok(pending);
    };

    for (sublist, value) in fields.iter_mut() {
        if let Some(lines) = value.get_mut("items").and_then(Value::as_array_mut) {
            pending.extend(reconcile(sublist, lines, prior, policy)?);
        }
    }

    if !pending.is_empty() {
        log::info!(
            "{} new lots on {} will need destination mappings",
            pending.len(),
            policy.record_kind
        );
    }
    Ok(pending)
}
