// tune-rs: decode and encode controller tune images
// Copyright 2024 - Licensed under GPLv3

pub mod arena;
pub mod bitwise;
pub mod conditional;
pub mod config;
pub mod core;
pub mod error;
pub mod fields;

// Re-export commonly used types
pub use arena::ByteArena;
pub use conditional::{ConditionError, ConditionEvaluator, ExprEvaluator};
pub use config::{Config, MenuNode, Schema, TuneDocument};
pub use core::{Axis, Encoding, TableValue, Value, ValueTree, Variable, VariableTable};
pub use error::{SchemaError, TuneError, TuneResult, ValidationError};
pub use fields::{FieldDescriptor, RegionAllocator};

/// tune-rs version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
