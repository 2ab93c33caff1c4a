use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::modules::transport::ErpTransport;
use crate::shared::domain::value_objects::scalar_to_string;
use crate::shared::domain::RecordKind;
use crate::shared::errors::AppResult;

/// Attribute on a lot-mapping record holding the source lot id
pub const LOT_SOURCE_ID_FIELD: &str = "custrecord_lot_source_id";
/// Attribute on a lot-mapping record holding the destination lot id
pub const LOT_DESTINATION_ID_FIELD: &str = "custrecord_lot_dest_id";

/// A lot the destination will create with the owning record; its id is only
/// known after the owning record resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingLotMapping {
    pub source_lot_id: String,
    pub display_name: String,
    pub owner_item_id: String,
    /// Sublist holding the owning line
    pub sublist: String,
    pub owner_line: usize,
    pub quantity: f64,
}

/// Source lot id → destination lot id, read-only after load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LotMappingTable {
    entries: HashMap<String, String>,
}

impl LotMappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every lot-mapping record from the destination
    pub async fn load(transport: &dyn ErpTransport) -> AppResult<Self> {
        let records = transport
            .list_entities(RecordKind::LotMapping.as_str())
            .await?;

        let table: Self = records
            .iter()
            .filter_map(|record| {
                let source = record.get(LOT_SOURCE_ID_FIELD).and_then(scalar_to_string)?;
                let destination = record
                    .get(LOT_DESTINATION_ID_FIELD)
                    .and_then(scalar_to_string)?;
                Some((source, destination))
            })
            .collect();

        log::info!(
            "Loaded {} lot mappings from {} records",
            table.len(),
            records.len()
        );
        Ok(table)
    }

    pub fn get(&self, source_lot_id: &str) -> Option<&str> {
        self.entries.get(source_lot_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>, D: Into<String>> FromIterator<(S, D)> for LotMappingTable {
    fn from_iter<I: IntoIterator<Item = (S, D)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(source, destination)| (source.into(), destination.into()))
                .collect(),
        }
    }
}

/// One lot recorded against a source transaction line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLot {
    pub source_lot_id: String,
    pub display_name: String,
}

/// Lot numbers of one source transaction, keyed by transaction line number
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLotIndex {
    by_line: HashMap<u32, Vec<SourceLot>>,
}

impl SourceLotIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        line: u32,
        source_lot_id: impl Into<String>,
        display_name: impl Into<String>,
    ) {
        self.by_line.entry(line).or_default().push(SourceLot {
            source_lot_id: source_lot_id.into(),
            display_name: display_name.into(),
        });
    }

    pub fn with_lot(
        mut self,
        line: u32,
        source_lot_id: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        self.insert(line, source_lot_id, display_name);
        self
    }

    pub fn lots_for_line(&self, line: u32) -> &[SourceLot] {
        self.by_line.get(&line).map(Vec::as_slice).unwrap_or_default()
    }

    /// Source lot on `line` whose display name is `display_name`. A line
    /// with exactly one lot matches when the assignment carries no name.
    pub fn find(&self, line: u32, display_name: Option<&str>) -> Option<&SourceLot> {
        let lots = self.lots_for_line(line);
        match display_name {
            Some(name) => lots.iter().find(|lot| lot.display_name == name),
            None if lots.len() == 1 => lots.first(),
            None => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.by_line.is_empty()
    }
}

/// Lot mapping write for the destination
pub fn lot_mapping_payload(mapping: &PendingLotMapping, destination_lot_id: &str) -> Value {
    serde_json::json!({
        "name": mapping.display_name,
        LOT_SOURCE_ID_FIELD: mapping.source_lot_id,
        LOT_DESTINATION_ID_FIELD: destination_lot_id,
    })
}
