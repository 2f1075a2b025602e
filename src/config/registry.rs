// Schema registry: the field catalog and whole-image decode/encode

use super::allocator;
use super::schema::{MenuNode, Schema, TuneDocument};
use crate::arena::ByteArena;
use crate::bitwise::format_number;
use crate::conditional::{parse_expr, ConditionEvaluator, ExprEvaluator};
use crate::core::{Axis, Value, ValueTree, VariableTable};
use crate::error::{SchemaError, TuneError, TuneResult};
use crate::fields::{FieldDescriptor, RegionAllocator, Table};
use serde_json::Value as Json;
use std::cell::RefCell;
use std::collections::HashMap;
use std::ops::Range;

/// Largest image whose offsets all fit a 2-byte table pointer
pub const MAX_TABLE_IMAGE: usize = 0x1_0000;

/// Immutable field catalog built from a schema
///
/// Holds no tune state; every operation borrows the arena it works on.
#[derive(Debug, Clone)]
pub struct Config {
    total_size: usize,
    table_offset: usize,
    variables: VariableTable,
    /// Declaration order
    fields: Vec<FieldDescriptor>,
    by_name: HashMap<String, usize>,
    /// Indices into `fields` of every table
    tables: Vec<usize>,
    menu: Vec<MenuNode>,
    source: Json,
}

impl Config {
    pub fn new(schema: Schema) -> Result<Self, SchemaError> {
        let variables = VariableTable::new(schema.variables)?;

        let mut by_name = HashMap::with_capacity(schema.fields.len());
        let mut tables = Vec::new();
        for (i, field) in schema.fields.iter().enumerate() {
            if by_name.insert(field.short_name().to_string(), i).is_some() {
                return Err(SchemaError::DuplicateField(field.short_name().to_string()));
            }

            let (offset, len) = field.span();
            let end = offset + len;
            if end > schema.total_size {
                return Err(SchemaError::FieldOutOfBounds {
                    field: field.short_name().to_string(),
                    end,
                    total: schema.total_size,
                });
            }

            if field.as_table().is_some() {
                tables.push(i);
            }
        }

        // Pointer 0 means "no table", and pointers are two bytes wide
        if !tables.is_empty()
            && (schema.table_offset == 0
                || schema.table_offset > schema.total_size
                || schema.total_size > MAX_TABLE_IMAGE)
        {
            return Err(SchemaError::InvalidTableRegion {
                start: schema.table_offset,
                total: schema.total_size,
            });
        }

        let config = Self {
            total_size: schema.total_size,
            table_offset: schema.table_offset,
            variables,
            fields: schema.fields,
            by_name,
            tables,
            menu: schema.menu,
            source: schema.source,
        };
        config.check_menu_references(&config.menu)?;

        tracing::debug!(
            "Loaded schema: {} bytes, {} fields ({} tables), {} variables",
            config.total_size,
            config.fields.len(),
            config.tables.len(),
            config.variables.len()
        );
        Ok(config)
    }

    pub fn from_json(source: &Json) -> Result<Self, SchemaError> {
        Self::new(Schema::from_json(source)?)
    }

    /// Conditionals and `$field` titles may only name known fields
    fn check_menu_references(&self, nodes: &[MenuNode]) -> Result<(), SchemaError> {
        for node in nodes {
            if let Some((_, name)) = node.title().split_once('$') {
                self.field(name)?;
            }
            if let Some(cond) = node.conditional() {
                let expr = parse_expr(cond).map_err(|e| SchemaError::Malformed(e.to_string()))?;
                for name in expr.names() {
                    self.field(name)?;
                }
            }
            self.check_menu_references(node.children())?;
        }
        Ok(())
    }

    pub fn total_size(&self) -> usize {
        self.total_size
    }

    pub fn table_offset(&self) -> usize {
        self.table_offset
    }

    pub fn variables(&self) -> &VariableTable {
        &self.variables
    }

    pub fn menu(&self) -> &[MenuNode] {
        &self.menu
    }

    /// The schema JSON this registry was built from
    pub fn source(&self) -> &Json {
        &self.source
    }

    /// All fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter()
    }

    pub fn field(&self, short_name: &str) -> Result<&FieldDescriptor, SchemaError> {
        self.by_name
            .get(short_name)
            .map(|&i| &self.fields[i])
            .ok_or_else(|| SchemaError::UnknownField(short_name.to_string()))
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter().filter_map(|&i| self.fields[i].as_table())
    }

    pub fn table(&self, short_name: &str) -> Result<&Table, SchemaError> {
        self.field(short_name)?
            .as_table()
            .ok_or_else(|| SchemaError::UnknownField(short_name.to_string()))
    }

    fn check_size(&self, arena: &ByteArena) -> TuneResult<()> {
        if arena.len() != self.total_size {
            return Err(TuneError::ImageSize {
                expected: self.total_size,
                actual: arena.len(),
            });
        }
        Ok(())
    }

    /// Decode every field
    pub fn decode(&self, arena: &ByteArena) -> TuneResult<ValueTree> {
        self.check_size(arena)?;
        let tree = self
            .fields
            .iter()
            .map(|f| -> TuneResult<(String, Value)> {
                Ok((f.short_name().to_string(), f.decode(arena, &self.variables)?))
            })
            .collect::<TuneResult<ValueTree>>()?;
        tracing::info!("Decoded {} fields from {}-byte tune", tree.len(), arena.len());
        Ok(tree)
    }

    /// Encode @values into a fresh zeroed image
    ///
    /// Fields are written in schema declaration order, so tables land in the
    /// same places whatever order the map iterates in. Fields missing from
    /// @values stay zero.
    pub fn encode(&self, values: &ValueTree) -> TuneResult<ByteArena> {
        if let Some(unknown) = values.keys().find(|k| !self.by_name.contains_key(*k)) {
            return Err(SchemaError::UnknownField(unknown.clone()).into());
        }

        let mut arena = ByteArena::zeroed(self.total_size);
        for field in &self.fields {
            if let Some(value) = values.get(field.short_name()) {
                field.encode(&mut arena, &self.variables, self, value)?;
            }
        }
        tracing::info!("Encoded {} fields into {}-byte tune", values.len(), arena.len());
        Ok(arena)
    }

    /// Encode @values in the order given
    ///
    /// Table placement follows that order, so different orders can yield
    /// different (equally valid) layouts.
    pub fn encode_ordered(&self, values: &[(String, Value)]) -> TuneResult<ByteArena> {
        let fields = values
            .iter()
            .map(|(name, value)| -> TuneResult<_> { Ok((self.field(name)?, value)) })
            .collect::<TuneResult<Vec<_>>>()?;

        let mut arena = ByteArena::zeroed(self.total_size);
        for (field, value) in fields {
            field.encode(&mut arena, &self.variables, self, value)?;
        }
        tracing::info!("Encoded {} fields into {}-byte tune", values.len(), arena.len());
        Ok(arena)
    }

    pub fn get_field(&self, arena: &ByteArena, short_name: &str) -> TuneResult<Value> {
        self.field(short_name)?.decode(arena, &self.variables)
    }

    /// Write one field of a live tune
    pub fn set_field(&self, arena: &mut ByteArena, short_name: &str, value: &Value) -> TuneResult<()> {
        let field = self.field(short_name)?;
        field.encode(arena, &self.variables, self, value)?;
        tracing::debug!("Set {} to {}", short_name, value);
        Ok(())
    }

    pub fn set_table_cell(
        &self,
        arena: &mut ByteArena,
        short_name: &str,
        row: usize,
        col: usize,
        value: f64,
    ) -> TuneResult<()> {
        self.table(short_name)?.set_cell(arena, row, col, value)
    }

    /// `(pointer, size)` of every allocated table
    pub fn live_tables(&self, arena: &ByteArena) -> TuneResult<Vec<(usize, usize)>> {
        let mut live = Vec::new();
        for table in self.tables() {
            let ptr = table.table_ptr(arena)?;
            if ptr != 0 {
                live.push((ptr, table.table_len(arena)?));
            }
        }
        Ok(live)
    }

    /// Free gaps of the table region, in address order
    pub fn free_table_space(&self, arena: &ByteArena) -> TuneResult<Vec<Range<usize>>> {
        let live = self.live_tables(arena)?;
        Ok(allocator::free_ranges(self.table_offset, self.total_size, &live))
    }

    pub fn total_free_table_space(&self, arena: &ByteArena) -> TuneResult<usize> {
        Ok(allocator::total_free(&self.free_table_space(arena)?))
    }

    /// Give a table an empty region if it has none; returns its pointer
    pub fn ensure_table(&self, arena: &mut ByteArena, short_name: &str) -> TuneResult<usize> {
        let table = self.table(short_name)?;
        match table.table_ptr(arena)? {
            0 => table.allocate_empty(arena, self),
            ptr => Ok(ptr),
        }
    }

    /// Move a table to a region sized for new axes
    ///
    /// Interpolation settings carry over and the cells start at zero. On
    /// failure the old table is left as it was.
    pub fn reshape_table(
        &self,
        arena: &mut ByteArena,
        short_name: &str,
        x_axis: Option<&Axis>,
        y_axis: Option<&Axis>,
    ) -> TuneResult<usize> {
        self.table(short_name)?
            .reshape(arena, &self.variables, self, x_axis, y_axis)
    }

    /// Evaluate @expr with the built-in evaluator
    pub fn eval_conditional(&self, arena: &ByteArena, expr: &str) -> TuneResult<bool> {
        self.eval_conditional_with(arena, expr, &ExprEvaluator)
    }

    pub fn eval_conditional_with(
        &self,
        arena: &ByteArena,
        expr: &str,
        evaluator: &dyn ConditionEvaluator,
    ) -> TuneResult<bool> {
        // Unknown names are the evaluator's to report; a field that fails to
        // decode is reported as itself
        let failure = RefCell::new(None);
        let lookup = |name: &str| {
            let field = self.field(name).ok()?;
            match field.decode(arena, &self.variables) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!("Conditional {:?}: can not decode {}: {}", expr, name, e);
                    failure.borrow_mut().get_or_insert(e);
                    None
                }
            }
        };
        let result = evaluator.evaluate(&lookup, expr);
        if let Some(e) = failure.into_inner() {
            return Err(e);
        }
        Ok(result?)
    }

    /// Current state of every conditional in the menu
    ///
    /// Fields are keyed by short name and pages by title, in menu order.
    pub fn conditional_states(&self, arena: &ByteArena) -> TuneResult<Vec<(String, bool)>> {
        let mut states = Vec::new();
        self.collect_states(arena, &self.menu, &mut states)?;
        Ok(states)
    }

    fn collect_states(
        &self,
        arena: &ByteArena,
        nodes: &[MenuNode],
        states: &mut Vec<(String, bool)>,
    ) -> TuneResult<()> {
        for node in nodes {
            if let Some(cond) = node.conditional() {
                let key = match node {
                    MenuNode::Field { short_name, .. } => short_name.clone(),
                    _ => node.title().to_string(),
                };
                states.push((key, self.eval_conditional(arena, cond)?));
            }
            self.collect_states(arena, node.children(), states)?;
        }
        Ok(())
    }

    /// Expand a `"Label$field"` menu title with the field's current value
    pub fn menu_title(&self, arena: &ByteArena, title: &str) -> TuneResult<String> {
        let (label, name) = match title.split_once('$') {
            Some(parts) => parts,
            None => return Ok(title.to_string()),
        };
        let field = self.field(name)?;
        let shown = match field.decode(arena, &self.variables)? {
            Value::Number(n) => match field {
                FieldDescriptor::Scalar(s) => format_number(n, s.exponent),
                _ => n.to_string(),
            },
            Value::Text(s) | Value::Variable(s) => s,
            Value::Table(_) | Value::Absent => String::new(),
        };
        if shown.is_empty() {
            Ok(label.to_string())
        } else {
            Ok(format!("{} - {}", label, shown))
        }
    }

    /// Schema and values together, as saved by an editor
    pub fn decode_document(&self, arena: &ByteArena) -> TuneResult<TuneDocument> {
        Ok(TuneDocument {
            config: self.source.clone(),
            tune: self.decode(arena)?,
        })
    }

    pub fn encode_document(&self, document: &TuneDocument) -> TuneResult<ByteArena> {
        self.encode(&document.tune)
    }

    /// Build the registry a document carries and encode its values
    pub fn load_document(document: &TuneDocument) -> TuneResult<(Config, ByteArena)> {
        let config = Config::from_json(&document.config)?;
        let arena = config.encode_document(document)?;
        Ok((config, arena))
    }
}

impl RegionAllocator for Config {
    fn allocate(&self, arena: &ByteArena, size: usize) -> TuneResult<usize> {
        let ranges = self.free_table_space(arena)?;
        allocator::first_fit(&ranges, size).ok_or_else(|| TuneError::OutOfSpace {
            requested: size,
            largest_free: allocator::largest_free(&ranges),
        })
    }
}
