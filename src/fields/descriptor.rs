// Closed set of field variants behind one decode/encode contract

use super::{Scalar, Select, Table, Text, VarSelect};
use crate::arena::ByteArena;
use crate::core::{Value, VariableTable};
use crate::error::{TuneResult, ValidationError};

/// Places variable-sized table regions in an arena
///
/// Implemented by the registry (first-fit over the live tables); tests use
/// simpler allocators.
pub trait RegionAllocator {
    /// Offset of a free range of at least @size bytes
    fn allocate(&self, arena: &ByteArena, size: usize) -> TuneResult<usize>;
}

/// One schema field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDescriptor {
    Scalar(Scalar),
    Select(Select),
    VarSelect(VarSelect),
    Text(Text),
    Table(Table),
}

impl FieldDescriptor {
    pub fn short_name(&self) -> &str {
        match self {
            FieldDescriptor::Scalar(f) => &f.short_name,
            FieldDescriptor::Select(f) => &f.short_name,
            FieldDescriptor::VarSelect(f) => &f.short_name,
            FieldDescriptor::Text(f) => &f.short_name,
            FieldDescriptor::Table(f) => &f.short_name,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            FieldDescriptor::Scalar(f) => &f.name,
            FieldDescriptor::Select(f) => &f.name,
            FieldDescriptor::VarSelect(f) => &f.name,
            FieldDescriptor::Text(f) => &f.name,
            FieldDescriptor::Table(f) => &f.name,
        }
    }

    /// Visibility expression, if any
    pub fn conditional(&self) -> Option<&str> {
        match self {
            FieldDescriptor::Scalar(f) => f.conditional.as_deref(),
            FieldDescriptor::Select(f) => f.conditional.as_deref(),
            FieldDescriptor::VarSelect(f) => f.conditional.as_deref(),
            FieldDescriptor::Text(f) => f.conditional.as_deref(),
            FieldDescriptor::Table(f) => f.conditional.as_deref(),
        }
    }

    /// Schema tag of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            FieldDescriptor::Scalar(_) => "scalar",
            FieldDescriptor::Select(_) => "select",
            FieldDescriptor::VarSelect(_) => "varselect",
            FieldDescriptor::Text(_) => "text",
            FieldDescriptor::Table(_) => "table",
        }
    }

    /// Fixed bytes at the field offset, as (offset, len)
    pub fn span(&self) -> (usize, usize) {
        match self {
            FieldDescriptor::Scalar(f) => (f.offset, f.size()),
            FieldDescriptor::Select(f) => (f.offset, f.size()),
            FieldDescriptor::VarSelect(f) => (f.offset, f.size()),
            FieldDescriptor::Text(f) => (f.offset, f.size()),
            FieldDescriptor::Table(f) => (f.offset, f.size()),
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            FieldDescriptor::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn decode(&self, arena: &ByteArena, variables: &VariableTable) -> TuneResult<Value> {
        let value = match self {
            FieldDescriptor::Scalar(f) => Value::Number(f.get(arena)?),
            FieldDescriptor::Select(f) => Value::Text(f.get(arena)?.to_string()),
            FieldDescriptor::VarSelect(f) => {
                Value::Variable(f.get(arena, variables)?.short_name.clone())
            }
            FieldDescriptor::Text(f) => Value::Text(f.get(arena)?),
            FieldDescriptor::Table(f) => f.decode(arena, variables)?.into(),
        };
        Ok(value)
    }

    /// Write @value; the arena is untouched when validation fails
    pub fn encode(
        &self,
        arena: &mut ByteArena,
        variables: &VariableTable,
        allocator: &dyn RegionAllocator,
        value: &Value,
    ) -> TuneResult<()> {
        match self {
            FieldDescriptor::Scalar(f) => {
                let n = value.as_f64().ok_or_else(|| self.wrong_type("number"))?;
                f.set(arena, n)
            }
            FieldDescriptor::Select(f) => {
                let s = value.as_str().ok_or_else(|| self.wrong_type("string"))?;
                f.set(arena, s)
            }
            FieldDescriptor::VarSelect(f) => {
                let s = value.as_str().ok_or_else(|| self.wrong_type("variable"))?;
                f.set(arena, variables, s)
            }
            FieldDescriptor::Text(f) => {
                let s = value.as_str().ok_or_else(|| self.wrong_type("string"))?;
                f.set(arena, s)
            }
            FieldDescriptor::Table(f) => match value {
                Value::Table(t) => f.encode(arena, variables, allocator, Some(t)),
                Value::Absent => f.encode(arena, variables, allocator, None),
                _ => Err(self.wrong_type("table").into()),
            },
        }
    }

    fn wrong_type(&self, expected: &'static str) -> ValidationError {
        ValidationError::WrongType {
            field: self.short_name().to_string(),
            expected,
        }
    }
}

impl From<Scalar> for FieldDescriptor {
    fn from(f: Scalar) -> Self {
        FieldDescriptor::Scalar(f)
    }
}

impl From<Select> for FieldDescriptor {
    fn from(f: Select) -> Self {
        FieldDescriptor::Select(f)
    }
}

impl From<VarSelect> for FieldDescriptor {
    fn from(f: VarSelect) -> Self {
        FieldDescriptor::VarSelect(f)
    }
}

impl From<Text> for FieldDescriptor {
    fn from(f: Text) -> Self {
        FieldDescriptor::Text(f)
    }
}

impl From<Table> for FieldDescriptor {
    fn from(f: Table) -> Self {
        FieldDescriptor::Table(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Encoding, Variable};
    use crate::error::TuneError;

    struct NoSpace;

    impl RegionAllocator for NoSpace {
        fn allocate(&self, _arena: &ByteArena, size: usize) -> TuneResult<usize> {
            Err(TuneError::OutOfSpace {
                requested: size,
                largest_free: 0,
            })
        }
    }

    fn variables() -> VariableTable {
        VariableTable::new(vec![
            Variable::new("RPM", "rpm", false, "rpm", 0, 2.0, 0),
            Variable::new("Sensors::MAP", "map", false, "kPa", 2, 2.0, -1),
        ])
        .unwrap()
    }

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            Scalar::new("RPM limit", "rpm_limit", "rpm", 0, Encoding::unsigned(16).unwrap(), 0)
                .unwrap()
                .into(),
            Select::new("Mode", "mode", 2, vec!["a".into(), "b".into()]).into(),
            VarSelect::new("Load", "load", 3).into(),
            Text::new("Name", "name", 4, 4).into(),
            Table::new("Fuel", "fuel", "%", 8, Encoding::unsigned(8).unwrap(), 0).into(),
        ]
    }

    #[test]
    fn test_decode_each_kind() {
        let vars = variables();
        let mut arena = ByteArena::zeroed(16);
        arena.set_bytes(0, &[0x64, 0x19, 1, 1, b'a', b'b', 0, 0]).unwrap();

        let values: Vec<Value> = fields()
            .iter()
            .map(|f| f.decode(&arena, &vars).unwrap())
            .collect();
        assert_eq!(
            values,
            vec![
                Value::Number(6500.0),
                Value::Text("b".into()),
                Value::Variable("map".into()),
                Value::Text("ab".into()),
                Value::Absent,
            ]
        );
    }

    #[test]
    fn test_encode_round_trip() {
        let vars = variables();
        let mut src = ByteArena::zeroed(16);
        src.set_bytes(0, &[0x10, 0x27, 1, 0, b'x', b'y', b'z', 0]).unwrap();

        let mut out = ByteArena::zeroed(16);
        for f in fields() {
            let v = f.decode(&src, &vars).unwrap();
            f.encode(&mut out, &vars, &NoSpace, &v).unwrap();
        }
        assert_eq!(out, src);
    }

    #[test]
    fn test_wrong_type() {
        let vars = variables();
        let mut arena = ByteArena::zeroed(16);
        let fields = fields();
        for (f, v) in fields.iter().zip([
            Value::Text("x".into()),
            Value::Number(1.0),
            Value::Absent,
            Value::Number(2.0),
            Value::Number(3.0),
        ]) {
            let err = f.encode(&mut arena, &vars, &NoSpace, &v).unwrap_err();
            assert!(
                matches!(
                    err,
                    TuneError::Validation(ValidationError::WrongType { .. })
                ),
                "{} accepted {:?}",
                f.short_name(),
                v
            );
        }
        assert_eq!(arena, ByteArena::zeroed(16));
    }

    #[test]
    fn test_metadata() {
        let f = &fields()[4];
        assert_eq!(f.kind(), "table");
        assert_eq!(f.span(), (8, 2));
        assert_eq!(f.name(), "Fuel");
        assert!(f.as_table().is_some());
        assert!(f.conditional().is_none());
    }
}
