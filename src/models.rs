//! Core data structures for chargehub
//!
//! Document shapes for the `batteries`, `stats` and `data` collections, the
//! request payloads accepted by the gateway, and the typed battery identifier.

use std::fmt;
use std::str::FromStr;

use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Bson, Document};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::Error;

/// Collection holding free-form `{ data }` records
pub const DATA_COLLECTION: &str = "data";

/// Collection holding battery documents
pub const BATTERIES_COLLECTION: &str = "batteries";

/// Collection holding the stats singleton
pub const STATS_COLLECTION: &str = "stats";

// ============================================================================
// Identifiers
// ============================================================================

/// Identifier of a battery document
///
/// Parsing accepts only the 24-character hex form of an ObjectId, so
/// malformed path segments are rejected before any store call is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatteryId(ObjectId);

impl BatteryId {
    /// Generate a fresh identifier
    pub fn new() -> Self {
        Self(ObjectId::new())
    }

    /// Underlying ObjectId
    pub fn object_id(&self) -> ObjectId {
        self.0
    }
}

impl Default for BatteryId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ObjectId> for BatteryId {
    fn from(oid: ObjectId) -> Self {
        Self(oid)
    }
}

impl FromStr for BatteryId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectId::parse_str(s)
            .map(Self)
            .map_err(|_| Error::InvalidId(s.to_string()))
    }
}

impl fmt::Display for BatteryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_hex())
    }
}

// ============================================================================
// Battery
// ============================================================================

/// A battery document as stored
///
/// No schema is imposed: the document may lack any of the charging flags,
/// hold them with other types, or carry unrelated fields. Listings render it
/// back unchanged apart from ObjectIds, which become hex strings.
#[derive(Debug, Clone, PartialEq)]
pub struct Battery(Document);

impl Battery {
    /// A battery that is currently charging, with no other flags set
    pub fn charging(id: BatteryId) -> Self {
        Self(doc! { "_id": id.object_id(), "charging": true })
    }

    /// The stored document
    pub fn document(&self) -> &Document {
        &self.0
    }

    /// The `_id` field, whatever its type
    pub fn id(&self) -> Option<&Bson> {
        self.0.get("_id")
    }

    /// Whether `_id` is the ObjectId behind `id`
    pub fn has_id(&self, id: BatteryId) -> bool {
        matches!(self.id(), Some(Bson::ObjectId(oid)) if *oid == id.object_id())
    }

    /// `charging` flag, if stored as a boolean
    pub fn is_charging(&self) -> Option<bool> {
        self.flag("charging")
    }

    /// `charged` flag, if stored as a boolean
    pub fn charged(&self) -> Option<bool> {
        self.flag("charged")
    }

    /// `halted` flag, if stored as a boolean
    pub fn halted(&self) -> Option<bool> {
        self.flag("halted")
    }

    fn flag(&self, field: &str) -> Option<bool> {
        self.0.get_bool(field).ok()
    }

    /// Apply a flag update in place, returning whether anything changed
    pub fn apply(&mut self, update: &BatteryUpdate) -> bool {
        let mut changed = false;
        for (field, value) in update.fields() {
            if self.0.get(field) != Some(&Bson::Boolean(value)) {
                self.0.insert(field, value);
                changed = true;
            }
        }
        changed
    }
}

impl From<Document> for Battery {
    fn from(document: Document) -> Self {
        Self(document)
    }
}

impl Serialize for Battery {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        render_document(&self.0).serialize(serializer)
    }
}

/// Flags to `$set` on a battery document; `None` leaves a flag untouched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatteryUpdate {
    pub charging: Option<bool>,
    pub charged: Option<bool>,
    pub halted: Option<bool>,
}

impl BatteryUpdate {
    /// Stop charging
    pub fn pause() -> Self {
        Self {
            charging: Some(false),
            ..Default::default()
        }
    }

    /// Start charging again
    pub fn resume() -> Self {
        Self {
            charging: Some(true),
            ..Default::default()
        }
    }

    /// Charging finished normally
    pub fn charge_complete() -> Self {
        Self {
            charging: Some(false),
            charged: Some(true),
            halted: None,
        }
    }

    /// Charging stopped because of a fault
    pub fn halt() -> Self {
        Self {
            charging: Some(false),
            charged: None,
            halted: Some(true),
        }
    }

    /// Field names and values present in this update
    pub fn fields(&self) -> Vec<(&'static str, bool)> {
        [
            ("charging", self.charging),
            ("charged", self.charged),
            ("halted", self.halted),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .collect()
    }

    /// `$set` body for this update
    pub fn to_set_document(&self) -> Document {
        let mut set = Document::new();
        for (name, value) in self.fields() {
            set.insert(name, value);
        }
        set
    }
}

// ============================================================================
// Stats
// ============================================================================

/// Counter held in the stats singleton
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatCounter {
    /// Batteries that completed charging
    Charged,
    /// Batteries halted mid-charge
    Halted,
    /// Batteries currently on charge, adjusted by clients
    CurrentCharging,
}

impl StatCounter {
    /// Document field backing this counter
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Charged => "chargedBatteries",
            Self::Halted => "haltedBatteries",
            Self::CurrentCharging => "currentChargingBatteries",
        }
    }
}

/// The stats singleton document
///
/// Counters that were never incremented are absent from the stored document
/// and stay absent in the JSON rendering. Counters may be stored as any BSON
/// number; other fields are kept as they are.
#[derive(Debug, Clone, PartialEq)]
pub struct Stats(Document);

impl Stats {
    /// An empty stats document with a fresh id
    pub fn empty() -> Self {
        Self(doc! { "_id": ObjectId::new() })
    }

    /// Raw value of a counter
    pub fn counter(&self, counter: StatCounter) -> Option<&Bson> {
        self.0.get(counter.field_name())
    }

    /// Current value of a counter, zero when absent or not numeric
    ///
    /// Doubles are truncated toward zero.
    pub fn get(&self, counter: StatCounter) -> i64 {
        match self.counter(counter) {
            Some(Bson::Int32(v)) => i64::from(*v),
            Some(Bson::Int64(v)) => *v,
            Some(Bson::Double(v)) => *v as i64,
            _ => 0,
        }
    }

    /// Add `by` to a counter the way MongoDB's `$inc` does
    ///
    /// An absent counter is created as a 64-bit integer. Integer counters
    /// widen to 64 bits and reject overflow; doubles stay doubles. Counters
    /// holding a non-numeric value cannot be incremented.
    pub fn increment(&mut self, counter: StatCounter, by: i64) -> crate::error::Result<()> {
        let field = counter.field_name();
        let overflow = |current: i64| {
            Error::WriteRejected(format!("$inc on {field} overflows: {current} + {by}"))
        };
        let next = match self.0.get(field) {
            None => Bson::Int64(by),
            Some(Bson::Int32(v)) => {
                let current = i64::from(*v);
                Bson::Int64(current.checked_add(by).ok_or_else(|| overflow(current))?)
            }
            Some(Bson::Int64(v)) => Bson::Int64(v.checked_add(by).ok_or_else(|| overflow(*v))?),
            Some(Bson::Double(v)) => Bson::Double(v + by as f64),
            Some(other) => {
                return Err(Error::WriteRejected(format!(
                    "Cannot apply $inc to {field} of non-numeric type {:?}",
                    other.element_type()
                )))
            }
        };
        self.0.insert(field, next);
        Ok(())
    }
}

impl From<Document> for Stats {
    fn from(document: Document) -> Self {
        Self(document)
    }
}

impl Serialize for Stats {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        render_document(&self.0).serialize(serializer)
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Render a stored document as JSON
pub fn render_document(document: &Document) -> serde_json::Value {
    serde_json::Value::Object(
        document
            .iter()
            .map(|(key, value)| (key.clone(), render_bson(value)))
            .collect(),
    )
}

/// Render a BSON value as plain JSON
///
/// ObjectIds become hex strings, dates become RFC 3339 strings and
/// non-finite doubles become `null`. Types without a plain JSON form keep
/// their relaxed extended JSON shape.
pub fn render_bson(value: &Bson) -> serde_json::Value {
    use serde_json::Value;

    match value {
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::String(s) => Value::String(s.clone()),
        Bson::Boolean(b) => Value::Bool(*b),
        Bson::Null => Value::Null,
        Bson::Int32(v) => Value::from(*v),
        Bson::Int64(v) => Value::from(*v),
        Bson::Double(v) => serde_json::Number::from_f64(*v)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Bson::Document(document) => render_document(document),
        Bson::Array(items) => Value::Array(items.iter().map(render_bson).collect()),
        Bson::DateTime(dt) => dt
            .try_to_rfc3339_string()
            .map(Value::String)
            .unwrap_or_else(|_| value.clone().into_relaxed_extjson()),
        other => other.clone().into_relaxed_extjson(),
    }
}

// ============================================================================
// Store results
// ============================================================================

/// Result of a single-document update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Documents matched by the filter
    pub matched: u64,
    /// Documents actually changed
    pub modified: u64,
    /// Whether the update inserted a new document
    pub upserted: bool,
}

// ============================================================================
// Request payloads
// ============================================================================

/// Query string of `GET /data`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataQuery {
    pub id: Option<String>,
}

/// Body of `POST /data`
#[derive(Debug, Clone, Deserialize)]
pub struct DataRequest {
    pub data: serde_json::Value,
}

/// Body of `POST /batteries/:id/updateChargingCount`
#[derive(Debug, Clone, Deserialize)]
pub struct ChargingCountRequest {
    pub increment: i64,
}

/// Render a JSON value the way it is echoed back in plain-text responses
///
/// Strings are written without quotes; everything else uses its JSON form.
pub fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
