use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::shared::errors::AppError;

/// Destination record kinds the migration knows how to write.
///
/// The serialized form is the destination's REST path segment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum RecordKind {
    // Entities
    Customer,
    Vendor,
    Employee,
    // Reference records
    Account,
    Subsidiary,
    Location,
    Department,
    Classification,
    Currency,
    Term,
    InventoryItem,
    // Sales
    Invoice,
    CreditMemo,
    CustomerPayment,
    SalesOrder,
    ItemFulfillment,
    // Purchasing
    PurchaseOrder,
    ItemReceipt,
    VendorBill,
    VendorCredit,
    VendorPayment,
    // Inventory and ledger
    InventoryAdjustment,
    InventoryTransfer,
    JournalEntry,
    /// Side record pairing a source lot id with its destination lot id
    #[serde(rename = "customrecord_lot_mapping")]
    LotMapping,
}

impl RecordKind {
    pub const ALL: [RecordKind; 25] = [
        RecordKind::Customer,
        RecordKind::Vendor,
        RecordKind::Employee,
        RecordKind::Account,
        RecordKind::Subsidiary,
        RecordKind::Location,
        RecordKind::Department,
        RecordKind::Classification,
        RecordKind::Currency,
        RecordKind::Term,
        RecordKind::InventoryItem,
        RecordKind::Invoice,
        RecordKind::CreditMemo,
        RecordKind::CustomerPayment,
        RecordKind::SalesOrder,
        RecordKind::ItemFulfillment,
        RecordKind::PurchaseOrder,
        RecordKind::ItemReceipt,
        RecordKind::VendorBill,
        RecordKind::VendorCredit,
        RecordKind::VendorPayment,
        RecordKind::InventoryAdjustment,
        RecordKind::InventoryTransfer,
        RecordKind::JournalEntry,
        RecordKind::LotMapping,
    ];

    /// REST path segment used by the destination API
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Customer => "customer",
            RecordKind::Vendor => "vendor",
            RecordKind::Employee => "employee",
            RecordKind::Account => "account",
            RecordKind::Subsidiary => "subsidiary",
            RecordKind::Location => "location",
            RecordKind::Department => "department",
            RecordKind::Classification => "classification",
            RecordKind::Currency => "currency",
            RecordKind::Term => "term",
            RecordKind::InventoryItem => "inventoryItem",
            RecordKind::Invoice => "invoice",
            RecordKind::CreditMemo => "creditMemo",
            RecordKind::CustomerPayment => "customerPayment",
            RecordKind::SalesOrder => "salesOrder",
            RecordKind::ItemFulfillment => "itemFulfillment",
            RecordKind::PurchaseOrder => "purchaseOrder",
            RecordKind::ItemReceipt => "itemReceipt",
            RecordKind::VendorBill => "vendorBill",
            RecordKind::VendorCredit => "vendorCredit",
            RecordKind::VendorPayment => "vendorPayment",
            RecordKind::InventoryAdjustment => "inventoryAdjustment",
            RecordKind::InventoryTransfer => "inventoryTransfer",
            RecordKind::JournalEntry => "journalEntry",
            RecordKind::LotMapping => "customrecord_lot_mapping",
        }
    }

    /// Transactions carry sublists and a `tranId`; entities and reference
    /// records do not.
    pub fn is_transaction(&self) -> bool {
        matches!(
            self,
            RecordKind::Invoice
                | RecordKind::CreditMemo
                | RecordKind::CustomerPayment
                | RecordKind::SalesOrder
                | RecordKind::ItemFulfillment
                | RecordKind::PurchaseOrder
                | RecordKind::ItemReceipt
                | RecordKind::VendorBill
                | RecordKind::VendorCredit
                | RecordKind::VendorPayment
                | RecordKind::InventoryAdjustment
                | RecordKind::InventoryTransfer
                | RecordKind::JournalEntry
        )
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordKind::ALL
            .iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| AppError::InvalidValue(format!("Unknown record kind: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("vendorBill".parse::<RecordKind>().unwrap(), RecordKind::VendorBill);
        assert_eq!("VENDORBILL".parse::<RecordKind>().unwrap(), RecordKind::VendorBill);
        assert!("spaceship".parse::<RecordKind>().is_err());
    }

    #[test]
    fn test_serde_matches_path_segment() {
        for kind in RecordKind::ALL.iter() {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, kind.as_str());
        }
    }

    #[test]
    fn test_transaction_flag() {
        assert!(RecordKind::ItemReceipt.is_transaction());
        assert!(!RecordKind::Customer.is_transaction());
    }
}
