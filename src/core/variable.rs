// Telemetry/parameter channel catalog

use super::encoding::Encoding;
use crate::error::{SchemaError, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One channel of the controller's live record
///
/// Only metadata lives here; `offset`, `encoding` and `exponent` describe
/// the channel inside the controller's runtime record, not the tune.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "VariableRow", into = "VariableRow")]
pub struct Variable {
    pub name: String,
    pub short_name: String,
    pub can_set: bool,
    pub units: String,
    pub offset: usize,
    pub encoding: f64,
    pub exponent: i32,
}

/// Schema row form: `[name, short_name, can_set, units, offset, encoding, exponent]`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct VariableRow(String, String, bool, String, usize, f64, i32);

impl From<VariableRow> for Variable {
    fn from(row: VariableRow) -> Self {
        let VariableRow(name, short_name, can_set, units, offset, encoding, exponent) = row;
        Self {
            name,
            short_name,
            can_set,
            units,
            offset,
            encoding,
            exponent,
        }
    }
}

impl From<Variable> for VariableRow {
    fn from(v: Variable) -> Self {
        VariableRow(
            v.name,
            v.short_name,
            v.can_set,
            v.units,
            v.offset,
            v.encoding,
            v.exponent,
        )
    }
}

impl Variable {
    pub fn new(
        name: impl Into<String>,
        short_name: impl Into<String>,
        can_set: bool,
        units: impl Into<String>,
        offset: usize,
        encoding: f64,
        exponent: i32,
    ) -> Self {
        Self {
            name: name.into(),
            short_name: short_name.into(),
            can_set,
            units: units.into(),
            offset,
            encoding,
            exponent,
        }
    }

    /// Packed format of the channel, when the schema number is a valid encoding
    pub fn packed_encoding(&self) -> Option<Encoding> {
        Encoding::from_schema(self.encoding)
    }

    /// Group of a `"Group::Label"` display name
    pub fn category(&self) -> Option<&str> {
        self.name.split_once("::").map(|(group, _)| group)
    }

    /// Display name without its group prefix
    pub fn label(&self) -> &str {
        self.name
            .split_once("::")
            .map(|(_, label)| label)
            .unwrap_or(&self.name)
    }
}

/// Ordered variable catalog
///
/// A variable's position is what tune images store, so the order is part
/// of the image format: append only.
#[derive(Debug, Clone, Default)]
pub struct VariableTable {
    entries: Vec<Variable>,
    by_name: HashMap<String, usize>,
}

impl VariableTable {
    pub fn new(entries: Vec<Variable>) -> Result<Self, SchemaError> {
        let mut by_name = HashMap::with_capacity(entries.len());
        for (i, v) in entries.iter().enumerate() {
            if by_name.insert(v.short_name.clone(), i).is_some() {
                return Err(SchemaError::DuplicateVariable(v.short_name.clone()));
            }
        }
        Ok(Self { entries, by_name })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Variable> {
        self.entries.get(index)
    }

    /// Variable stored at @index, or a validation error for a dangling index
    pub fn at(&self, index: usize) -> Result<&Variable, ValidationError> {
        self.get(index)
            .ok_or(ValidationError::VariableIndex { index })
    }

    pub fn by_short_name(&self, short_name: &str) -> Option<&Variable> {
        self.by_name.get(short_name).map(|&i| &self.entries[i])
    }

    /// Position of @short_name, the value stored in tune images
    pub fn index_of(&self, short_name: &str) -> Result<usize, ValidationError> {
        self.by_name
            .get(short_name)
            .copied()
            .ok_or_else(|| ValidationError::UnknownVariable(short_name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.entries.iter()
    }

    /// Variables grouped by their `"Group::"` prefix, in table order
    pub fn by_category(&self) -> Vec<(Option<&str>, Vec<&Variable>)> {
        let mut groups: Vec<(Option<&str>, Vec<&Variable>)> = Vec::new();
        for v in &self.entries {
            let cat = v.category();
            match groups.iter_mut().find(|(c, _)| *c == cat) {
                Some((_, members)) => members.push(v),
                None => groups.push((cat, vec![v])),
            }
        }
        groups
    }
}
