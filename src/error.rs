// Error types shared by the field, registry and allocator layers

use crate::arena::ArenaError;
use crate::conditional::ConditionError;
use thiserror::Error;

/// Problems found while building a registry from a schema; fatal at load time
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Duplicate field short name: {0}")]
    DuplicateField(String),

    #[error("Duplicate variable short name: {0}")]
    DuplicateVariable(String),

    #[error("Unknown field kind: {0}")]
    UnknownKind(String),

    #[error("Invalid short name {0:?}: must be an identifier")]
    InvalidName(String),

    #[error("Field {field}: invalid encoding {encoding}")]
    InvalidEncoding { field: String, encoding: f64 },

    #[error("Field {field} ends at byte {end}, past the {total}-byte image")]
    FieldOutOfBounds {
        field: String,
        end: usize,
        total: usize,
    },

    #[error("Table region start {start} is invalid for a {total}-byte image")]
    InvalidTableRegion { start: usize, total: usize },

    #[error("Malformed schema: {0}")]
    Malformed(String),

    #[error("Schema JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A value rejected before anything was written to the arena
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Field {field}: {value:?} is not one of the choices")]
    UnknownChoice { field: String, value: String },

    #[error("Field {field}: stored choice index {index} is out of range")]
    ChoiceIndex { field: String, index: usize },

    #[error("Field {field}: text of {len} bytes exceeds the {max}-byte field")]
    TextTooLong {
        field: String,
        len: usize,
        max: usize,
    },

    #[error("Field {field}: stored text is not valid UTF-8")]
    InvalidText { field: String },

    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    #[error("Variable index {index} is out of range")]
    VariableIndex { index: usize },

    #[error("Field {field}: {value} does not fit in {bits} bits")]
    OutOfRange {
        field: String,
        value: f64,
        bits: u32,
    },

    #[error("Field {field}: value is not a finite number")]
    NotFinite { field: String },

    #[error("Field {field}: expected a {expected} value")]
    WrongType {
        field: String,
        expected: &'static str,
    },

    #[error("Field {field}: axis has {count} bins, at most 255 are allowed")]
    TooManyBins { field: String, count: usize },

    #[error("Field {field}: data must be {rows}x{cols}")]
    TableShape {
        field: String,
        rows: usize,
        cols: usize,
    },

    #[error("Field {field}: cell ({row}, {col}) is outside the table")]
    CellOutOfRange {
        field: String,
        row: usize,
        col: usize,
    },
}

/// Crate-level error
#[derive(Error, Debug)]
pub enum TuneError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Arena(#[from] ArenaError),

    #[error(transparent)]
    Condition(#[from] ConditionError),

    #[error("Out of table space: need {requested} bytes, largest free range is {largest_free}")]
    OutOfSpace {
        requested: usize,
        largest_free: usize,
    },

    #[error("Table {field} is not allocated")]
    Layout { field: String },

    #[error("Tune image is {actual} bytes, schema expects {expected}")]
    ImageSize { expected: usize, actual: usize },
}

pub type TuneResult<T> = std::result::Result<T, TuneError>;
