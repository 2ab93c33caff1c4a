use serde::{Deserialize, Serialize};

use super::entities::SourceLotIndex;
use crate::shared::domain::RecordKind;

/// How a lot assignment on a line is tied back to its source lot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LotCorrelation {
    /// Source lot found through the line's transaction line number in a
    /// side-loaded `SourceLotIndex`, matched by display name
    LineNumber,
    /// Source lot read from the assignment's `issueInventoryNumber`
    IssueInventoryNumber,
    /// No correlation path for this kind
    Unsupported,
}

impl LotCorrelation {
    pub fn for_kind(kind: RecordKind) -> Self {
        match kind {
            RecordKind::ItemReceipt | RecordKind::InventoryAdjustment | RecordKind::VendorBill => {
                LotCorrelation::LineNumber
            }
            RecordKind::ItemFulfillment
            | RecordKind::InventoryTransfer
            | RecordKind::Invoice
            | RecordKind::SalesOrder
            | RecordKind::CreditMemo
            | RecordKind::PurchaseOrder => LotCorrelation::IssueInventoryNumber,
            _ => LotCorrelation::Unsupported,
        }
    }
}

/// Correlation plus the side-loaded data it needs
#[derive(Debug, Clone, Copy)]
pub struct LotPolicy<'a> {
    pub record_kind: RecordKind,
    pub correlation: LotCorrelation,
    pub source_lots: Option<&'a SourceLotIndex>,
}

impl<'a> LotPolicy<'a> {
    pub fn for_kind(record_kind: RecordKind, source_lots: Option<&'a SourceLotIndex>) -> Self {
        Self {
            record_kind,
            correlation: LotCorrelation::for_kind(record_kind),
            source_lots,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlation_table() {
        assert_eq!(
            LotCorrelation::for_kind(RecordKind::ItemReceipt),
            LotCorrelation::LineNumber
        );
        assert_eq!(
            LotCorrelation::for_kind(RecordKind::VendorBill),
            LotCorrelation::LineNumber
        );
        assert_eq!(
            LotCorrelation::for_kind(RecordKind::ItemFulfillment),
            LotCorrelation::IssueInventoryNumber
        );
        assert_eq!(
            LotCorrelation::for_kind(RecordKind::PurchaseOrder),
            LotCorrelation::IssueInventoryNumber
        );
        assert_eq!(
            LotCorrelation::for_kind(RecordKind::JournalEntry),
            LotCorrelation::Unsupported
        );
        assert_eq!(
            LotCorrelation::for_kind(RecordKind::VendorCredit),
            LotCorrelation::Unsupported
        );
    }
}
