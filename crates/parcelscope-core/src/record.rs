//! The flat per-parcel record produced by merging registry categories.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{CategoryId, OwnerRecord};

/// Field name → value mapping for one parcel.
///
/// Scalar categories and the first row of every list category are merged into
/// the flat namespace; list categories also keep all of their rows under a
/// category-scoped key (see [`CategoryInfo::list_key`](crate::CategoryInfo)).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedRecord(Map<String, Value>);

impl NormalizedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Copy every field of `row` into the flat namespace, overwriting.
    pub fn merge_flat(&mut self, row: &Map<String, Value>) {
        for (k, v) in row {
            self.0.insert(k.clone(), v.clone());
        }
    }

    /// Keep all rows of a list category verbatim under `key`.
    pub fn insert_rows(&mut self, key: &str, rows: &[Map<String, Value>]) {
        let rows = rows.iter().cloned().map(Value::Object).collect();
        self.0.insert(key.to_string(), Value::Array(rows));
    }

    /// Rows retained under a list key.
    pub fn rows(&self, key: &str) -> &[Value] {
        match self.0.get(key) {
            Some(Value::Array(rows)) => rows,
            _ => &[],
        }
    }

    /// Field rendered as display text; `None` when absent, null or blank.
    pub fn text(&self, key: &str) -> Option<String> {
        value_text(self.0.get(key)?)
    }

    pub fn set_owners(&mut self, owners: &[OwnerRecord]) {
        let owners = owners
            .iter()
            .filter_map(|o| serde_json::to_value(o).ok())
            .collect();
        self.0
            .insert(CategoryId::OWNER_KEY.to_string(), Value::Array(owners));
    }

    /// Owner list, skipping entries that do not deserialize.
    pub fn owners(&self) -> Vec<OwnerRecord> {
        self.rows(CategoryId::OWNER_KEY)
            .iter()
            .filter_map(|v| serde_json::from_value(v.clone()).ok())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

/// Render a scalar JSON value as text.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}
