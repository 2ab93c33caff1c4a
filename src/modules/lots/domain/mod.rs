pub mod assignments;
pub mod correlation;
pub mod entities;

pub use assignments::{reconcile, reconcile_record};
pub use correlation::{LotCorrelation, LotPolicy};
pub use entities::{
    lot_mapping_payload, LotMappingTable, PendingLotMapping, SourceLot, SourceLotIndex,
    LOT_DESTINATION_ID_FIELD, LOT_SOURCE_ID_FIELD,
};
