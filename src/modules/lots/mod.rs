/// Lot and serial number reconciliation
///
/// Lots are sub-entities of inventory lines that need their own cross-instance
/// mapping. The pre-pass patches or collects lot assignments on the outgoing
/// payload; the post-pass writes a lot-mapping record for every lot the
/// destination created.
pub mod domain;
pub mod reconciler;

pub use domain::{
    reconcile, reconcile_record, LotCorrelation, LotMappingTable, LotPolicy, PendingLotMapping,
    SourceLot, SourceLotIndex,
};
pub use reconciler::LotReconciler;
