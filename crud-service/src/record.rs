//! Persisted records
//!
//! A [`Record`] is one row of an entity table: the primary key, the visible
//! column values, the timestamps and any eager-loaded relations. It serializes
//! to a flat JSON object in that order.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

/// Storage format for timestamps
///
/// Fixed-width so that lexical order in the database matches time order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Format a timestamp for storage or comparison
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
        })
}

/// Read a JSON value as an integer
///
/// Accepts integral numbers, numeric strings and booleans.
pub fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

/// Read a JSON value as a boolean
///
/// Accepts `true`/`false`, `0`/`1` and their string forms.
pub fn as_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim() {
            "1" | "true" => Some(true),
            "0" | "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Eager-loaded related data
#[derive(Debug, Clone, PartialEq)]
pub enum RelationValue {
    /// `BelongsTo`: the owner, if the foreign key resolves
    One(Option<Box<Record>>),
    /// `HasMany`: every related record
    Many(Vec<Record>),
}

impl RelationValue {
    /// Number of related records
    pub fn len(&self) -> usize {
        match self {
            Self::One(Some(_)) => 1,
            Self::One(None) => 0,
            Self::Many(records) => records.len(),
        }
    }

    /// Whether nothing is related
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Serialize for RelationValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::One(record) => record.serialize(serializer),
            Self::Many(records) => records.serialize(serializer),
        }
    }
}

/// One row of an entity table
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Primary key
    pub id: i64,
    /// Visible column values keyed by column name
    pub fields: Map<String, Value>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
    /// Eager-loaded relations keyed by relation name
    pub relations: BTreeMap<String, RelationValue>,
}

impl Record {
    /// Value of a visible column
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Integer value of a visible column
    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(Value::as_i64)
    }

    /// Loaded relation by name
    pub fn relation(&self, name: &str) -> Option<&RelationValue> {
        self.relations.get(name)
    }

    /// Render the record as a JSON value
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map =
            serializer.serialize_map(Some(3 + self.fields.len() + self.relations.len()))?;
        map.serialize_entry("id", &self.id)?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.serialize_entry("created_at", &self.created_at)?;
        map.serialize_entry("updated_at", &self.updated_at)?;
        for (name, relation) in &self.relations {
            map.serialize_entry(name, relation)?;
        }
        map.end()
    }
}
