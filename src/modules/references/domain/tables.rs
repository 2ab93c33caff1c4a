//! Static lookup tables for reference expansion
//!
//! New record kinds are added here as data. Bump `REFERENCE_TABLE_VERSION`
//! whenever an entry changes meaning so logs from different runs can be told
//! apart.

use serde_json::Value;

use crate::shared::domain::RecordKind;

pub const REFERENCE_TABLE_VERSION: u32 = 3;

/// Ids the source uses for "no value"
pub const PLACEHOLDER_IDS: [&str; 3] = ["", "0", "-1"];

/// How the lookup id is presented to the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupIdFormat {
    /// Plain internal id
    Internal,
    /// `eid:` prefixed, url-encoded external id
    External,
}

/// Where a referenced kind's counterpart id is found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSpec {
    pub kind: &'static str,
    /// Attribute holding the counterpart id on the fetched entity
    pub mapped_attribute: &'static str,
    pub id_format: LookupIdFormat,
}

impl TargetSpec {
    const fn internal(kind: &'static str, mapped_attribute: &'static str) -> Self {
        Self {
            kind,
            mapped_attribute,
            id_format: LookupIdFormat::Internal,
        }
    }

    const fn external(kind: &'static str, mapped_attribute: &'static str) -> Self {
        Self {
            kind,
            mapped_attribute,
            id_format: LookupIdFormat::External,
        }
    }

    pub fn format_id(&self, source_id: &str) -> String {
        match self.id_format {
            LookupIdFormat::Internal => source_id.to_string(),
            LookupIdFormat::External => format!("eid:{}", urlencoding::encode(source_id)),
        }
    }
}

/// Referenced kind → mapped-id attribute
pub const TARGETS: [TargetSpec; 13] = [
    TargetSpec::internal("account", "custrecord_dest_account_id"),
    TargetSpec::internal("subsidiary", "custrecord_dest_subsidiary_id"),
    TargetSpec::internal("location", "custrecord_dest_location_id"),
    TargetSpec::internal("department", "custrecord_dest_department_id"),
    TargetSpec::internal("classification", "custrecord_dest_class_id"),
    TargetSpec::internal("currency", "custrecord_dest_currency_id"),
    TargetSpec::internal("term", "custrecord_dest_term_id"),
    TargetSpec::internal("inventoryItem", "custitem_dest_item_id"),
    TargetSpec::internal("customer", "custentity_dest_entity_id"),
    TargetSpec::internal("vendor", "custentity_dest_entity_id"),
    TargetSpec::internal("employee", "custentity_dest_entity_id"),
    // Migrated transactions carry their source id as externalId
    TargetSpec::external("invoice", "id"),
    TargetSpec::external("creditMemo", "id"),
];

/// How a reference field picks its target kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldTarget {
    Fixed(&'static str),
    /// `entity`: vendor for purchasing-side owners, customer otherwise
    EntityByOwner,
    /// `document`: the reference's own `type` discriminator
    DocumentByType,
}

/// The reference-field set
pub const REFERENCE_FIELDS: [(&str, FieldTarget); 18] = [
    ("account", FieldTarget::Fixed("account")),
    ("apAccount", FieldTarget::Fixed("account")),
    ("arAccount", FieldTarget::Fixed("account")),
    ("subsidiary", FieldTarget::Fixed("subsidiary")),
    ("location", FieldTarget::Fixed("location")),
    ("transferLocation", FieldTarget::Fixed("location")),
    ("department", FieldTarget::Fixed("department")),
    ("class", FieldTarget::Fixed("classification")),
    ("currency", FieldTarget::Fixed("currency")),
    ("terms", FieldTarget::Fixed("term")),
    ("item", FieldTarget::Fixed("inventoryItem")),
    ("customer", FieldTarget::Fixed("customer")),
    ("employee", FieldTarget::Fixed("employee")),
    ("salesRep", FieldTarget::Fixed("employee")),
    ("vendor", FieldTarget::Fixed("vendor")),
    ("entity", FieldTarget::EntityByOwner),
    ("document", FieldTarget::DocumentByType),
    ("doc", FieldTarget::DocumentByType),
];

/// Owning kinds whose `entity` field denotes a vendor
pub const VENDOR_DISPATCH_KINDS: [RecordKind; 5] = [
    RecordKind::VendorBill,
    RecordKind::VendorCredit,
    RecordKind::VendorPayment,
    RecordKind::PurchaseOrder,
    RecordKind::ItemReceipt,
];

pub fn is_reference_field(field_name: &str) -> bool {
    REFERENCE_FIELDS.iter().any(|(name, _)| *name == field_name)
}

pub fn target_spec(kind: &str) -> Option<&'static TargetSpec> {
    TARGETS.iter().find(|target| target.kind == kind)
}

pub fn entity_target_kind(owning_kind: RecordKind) -> &'static str {
    if VENDOR_DISPATCH_KINDS.contains(&owning_kind) {
        "vendor"
    } else {
        "customer"
    }
}

pub fn document_target_kind(reference: &Value) -> &'static str {
    let doc_type = reference
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_lowercase();

    match doc_type.as_str() {
        "creditmemo" | "credit memo" | "custcred" => "creditMemo",
        _ => "invoice",
    }
}

/// Target for `field_name` on a record of `owning_kind`, or `None` when the
/// field is not a reference field.
pub fn resolve_target(
    field_name: &str,
    owning_kind: RecordKind,
    reference: &Value,
) -> Option<&'static TargetSpec> {
    let (_, target) = REFERENCE_FIELDS
        .iter()
        .find(|(name, _)| *name == field_name)?;

    let kind = match target {
        FieldTarget::Fixed(kind) => kind,
        FieldTarget::EntityByOwner => entity_target_kind(owning_kind),
        FieldTarget::DocumentByType => document_target_kind(reference),
    };
    target_spec(kind)
}
