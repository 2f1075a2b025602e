// Decoded value tree

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::fmt;

/// Decoded values keyed by field short name
pub type ValueTree = BTreeMap<String, Value>;

/// Value of one field
///
/// Serializes to plain JSON: numbers, strings, table objects and `null`.
/// A variable reference serializes as its short name, so it reads back as
/// [`Value::Text`]; variable fields accept either.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
    Variable(String),
    Table(TableValue),
    Absent,
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Text or variable short name
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Variable(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&TableValue> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Variable(_) => "variable",
            Value::Table(_) => "table",
            Value::Absent => "absent",
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<TableValue> for Value {
    fn from(t: TableValue) -> Self {
        Value::Table(t)
    }
}

impl From<Option<TableValue>> for Value {
    fn from(t: Option<TableValue>) -> Self {
        t.map(Value::Table).unwrap_or(Value::Absent)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) | Value::Variable(s) => write!(f, "{}", s),
            Value::Table(t) => write!(f, "<table {}x{}>", t.rows(), t.cols()),
            Value::Absent => write!(f, "<absent>"),
        }
    }
}

/// One lookup-table axis: bound variable, decimal exponent and bin edges
///
/// Serialized the way the tune document stores it,
/// `[variable, exponent, bin, bin, ...]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Json>", into = "Vec<Json>")]
pub struct Axis {
    pub variable: String,
    pub exponent: i8,
    pub bins: Vec<f64>,
}

impl Axis {
    pub fn new(variable: impl Into<String>, exponent: i8, bins: Vec<f64>) -> Self {
        Self {
            variable: variable.into(),
            exponent,
            bins,
        }
    }
}

impl TryFrom<Vec<Json>> for Axis {
    type Error = String;

    fn try_from(items: Vec<Json>) -> Result<Self, Self::Error> {
        let mut items = items.into_iter();
        let variable = match items.next() {
            Some(Json::String(s)) => s,
            other => return Err(format!("axis variable must be a string, got {:?}", other)),
        };
        let exponent = items
            .next()
            .and_then(|e| e.as_i64())
            .and_then(|e| i8::try_from(e).ok())
            .ok_or("axis exponent must be a small integer")?;
        let bins = items
            .map(|b| b.as_f64().ok_or_else(|| format!("axis bin {} is not a number", b)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            variable,
            exponent,
            bins,
        })
    }
}

impl From<Axis> for Vec<Json> {
    fn from(axis: Axis) -> Self {
        let mut items = vec![Json::from(axis.variable), Json::from(axis.exponent)];
        items.extend(axis.bins.into_iter().map(Json::from));
        items
    }
}

/// Logical content of an allocated table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableValue {
    pub interpolate: u8,
    #[serde(rename = "interpolate-B")]
    pub interpolate_b: String,
    #[serde(rename = "interpolate-C")]
    pub interpolate_c: String,
    #[serde(rename = "x-axis")]
    pub x_axis: Option<Axis>,
    #[serde(rename = "y-axis")]
    pub y_axis: Option<Axis>,
    pub data: Vec<Vec<f64>>,
}

impl TableValue {
    /// Bin count of an optional axis, empty axes count as absent
    fn bin_count(axis: &Option<Axis>) -> usize {
        axis.as_ref().map(|a| a.bins.len()).unwrap_or(0)
    }

    pub fn x_bins(&self) -> usize {
        Self::bin_count(&self.x_axis)
    }

    pub fn y_bins(&self) -> usize {
        Self::bin_count(&self.y_axis)
    }

    /// Grid rows implied by the axes
    pub fn rows(&self) -> usize {
        super::grid_rows(self.y_bins())
    }

    /// Grid columns implied by the axes
    pub fn cols(&self) -> usize {
        super::grid_cols(self.x_bins())
    }
}
