// Core data model: encodings, variables and decoded values
pub mod encoding;
pub mod value;
pub mod variable;

pub use encoding::Encoding;
pub use value::{Axis, TableValue, Value, ValueTree};
pub use variable::{Variable, VariableTable};

/// Rows of a table grid with @y_bins bins on the y axis (at least two)
pub fn grid_rows(y_bins: usize) -> usize {
    y_bins.max(2)
}

/// Columns of a table grid with @x_bins bins on the x axis (at least one)
pub fn grid_cols(x_bins: usize) -> usize {
    x_bins.max(1)
}
