/// Source record factories using builder pattern
///
/// Provides source payloads shaped like the ERP's REST records with sensible
/// defaults.
use serde_json::{json, Map, Value};

/// One lot assignment on a line
#[derive(Debug, Clone)]
pub struct LotAssignment {
    pub lot_id: Option<String>,
    pub display_name: String,
    pub quantity: f64,
}

impl LotAssignment {
    /// Assignment issuing an existing source lot
    pub fn issued(lot_id: &str, display_name: &str, quantity: f64) -> Self {
        Self {
            lot_id: Some(lot_id.to_string()),
            display_name: display_name.to_string(),
            quantity,
        }
    }

    /// Assignment receiving a lot by name only
    pub fn received(display_name: &str, quantity: f64) -> Self {
        Self {
            lot_id: None,
            display_name: display_name.to_string(),
            quantity,
        }
    }

    fn to_value(&self) -> Value {
        match &self.lot_id {
            Some(id) => json!({
                "issueInventoryNumber": {"id": id, "refName": self.display_name},
                "quantity": self.quantity
            }),
            None => json!({
                "receiptInventoryNumber": self.display_name,
                "quantity": self.quantity
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LineFactory {
    line: u32,
    item_id: String,
    quantity: f64,
    fields: Map<String, Value>,
    lots: Vec<LotAssignment>,
}

impl LineFactory {
    pub fn new(line: u32, item_id: &str) -> Self {
        Self {
            line,
            item_id: item_id.to_string(),
            quantity: 1.0,
            fields: Map::new(),
            lots: Vec::new(),
        }
    }

    pub fn quantity(mut self, quantity: f64) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn reference(mut self, field: &str, id: &str) -> Self {
        self.fields.insert(field.to_string(), json!({ "id": id }));
        self
    }

    pub fn lot(mut self, assignment: LotAssignment) -> Self {
        self.lots.push(assignment);
        self
    }

    pub fn build(self) -> Value {
        let mut line = self.fields;
        line.insert("line".to_string(), json!(self.line));
        line.insert("item".to_string(), json!({ "id": self.item_id }));
        line.insert("quantity".to_string(), json!(self.quantity));

        if !self.lots.is_empty() {
            let assignments: Vec<Value> = self.lots.iter().map(LotAssignment::to_value).collect();
            line.insert(
                "inventoryDetail".to_string(),
                json!({ "inventoryAssignment": { "items": assignments } }),
            );
        }
        Value::Object(line)
    }
}

pub struct RecordFactory {
    id: String,
    fields: Map<String, Value>,
    sublist: String,
    lines: Vec<LineFactory>,
}

impl Default for RecordFactory {
    fn default() -> Self {
        Self {
            id: format!("{}", rand::random::<u32>() % 1_000_000 + 1000),
            fields: Map::new(),
            sublist: "item".to_string(),
            lines: Vec::new(),
        }
    }
}

impl RecordFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoice with a customer and an account
    pub fn invoice() -> Self {
        Self::new()
            .tran_id("INV-1001")
            .reference("entity", "7")
            .reference("account", "12")
    }

    /// Item fulfillment carrying one lot-tracked line
    pub fn item_fulfillment() -> Self {
        Self::new().tran_id("IF-2001").reference("entity", "7")
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn tran_id(self, tran_id: &str) -> Self {
        self.field("tranId", json!(tran_id))
    }

    pub fn field(mut self, name: &str, value: Value) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    pub fn reference(self, field: &str, id: &str) -> Self {
        self.field(field, json!({ "id": id, "refName": format!("{} {}", field, id) }))
    }

    pub fn sublist(mut self, name: &str) -> Self {
        self.sublist = name.to_string();
        self
    }

    pub fn line(mut self, line: LineFactory) -> Self {
        self.lines.push(line);
        self
    }

    pub fn source_id(&self) -> &str {
        &self.id
    }

    pub fn build(self) -> Value {
        let mut record = self.fields;
        record.insert("id".to_string(), json!(self.id));
        record.insert(
            "links".to_string(),
            json!([{ "rel": "self", "href": format!("/record/v1/x/{}", self.id) }]),
        );
        record.insert("lastModifiedDate".to_string(), json!("2024-03-01T10:00:00Z"));

        if !self.lines.is_empty() {
            let lines: Vec<Value> = self.lines.into_iter().map(LineFactory::build).collect();
            record.insert(self.sublist, json!({ "items": lines }));
        }
        Value::Object(record)
    }
}
