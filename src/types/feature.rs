//! Loosely typed feature input and the coerced cell values fed to the model

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

/// A single feature value as sent by the client.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for FeatureValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FeatureValueVisitor;

        impl<'de> Visitor<'de> for FeatureValueVisitor {
            type Value = FeatureValue;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a number, string, boolean or null")
            }

            fn visit_unit<E: de::Error>(self) -> Result<FeatureValue, E> {
                Ok(FeatureValue::Null)
            }

            fn visit_none<E: de::Error>(self) -> Result<FeatureValue, E> {
                Ok(FeatureValue::Null)
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<FeatureValue, E> {
                Ok(FeatureValue::Bool(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<FeatureValue, E> {
                Ok(FeatureValue::Number(v as f64))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<FeatureValue, E> {
                Ok(FeatureValue::Number(v as f64))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<FeatureValue, E> {
                Ok(FeatureValue::Number(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<FeatureValue, E> {
                Ok(FeatureValue::Text(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<FeatureValue, E> {
                Ok(FeatureValue::Text(v))
            }
        }

        deserializer.deserialize_any(FeatureValueVisitor)
    }
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        FeatureValue::Number(v)
    }
}

impl From<&str> for FeatureValue {
    fn from(v: &str) -> Self {
        FeatureValue::Text(v.to_string())
    }
}

impl From<bool> for FeatureValue {
    fn from(v: bool) -> Self {
        FeatureValue::Bool(v)
    }
}

/// Feature name to value mapping that keeps the order the client sent.
///
/// A repeated key keeps its first position and takes the last value, which is
/// what a JSON object decoded into an ordered dictionary does.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureMap {
    entries: Vec<(String, FeatureValue)>,
    /// Key to its position in `entries`
    index: HashMap<String, usize>,
}

impl FeatureMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Insert or replace a value, keeping the original position on replace.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FeatureValue>) {
        let name = name.into();
        let value = value.into();
        match self.index.get(&name) {
            Some(&i) => self.entries[i].1 = value,
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push((name, value));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.index.get(name).map(|&i| &self.entries[i].1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<FeatureValue>> FromIterator<(K, V)> for FeatureMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = FeatureMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<'de> Deserialize<'de> for FeatureMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FeatureMapVisitor;

        impl<'de> Visitor<'de> for FeatureMapVisitor {
            type Value = FeatureMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object of feature names to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<FeatureMap, A::Error> {
                let mut map = FeatureMap::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, value)) = access.next_entry::<String, FeatureValue>()? {
                    map.insert(name, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(FeatureMapVisitor)
    }
}

/// A coerced cell of the aligned row.
///
/// `Missing` is its own variant so an absent value never collides with a
/// genuine zero or an empty category.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Missing,
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Missing => f.write_str("<missing>"),
            Cell::Number(v) => write!(f, "{v}"),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

/// Single-row table handed to the model, column names parallel to cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedRow {
    columns: Vec<String>,
    cells: Vec<Cell>,
}

impl AlignedRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, column: impl Into<String>, cell: Cell) {
        self.columns.push(column.into());
        self.cells.push(cell);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.cells[i])
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn into_columns(self) -> Vec<String> {
        self.columns
    }
}
