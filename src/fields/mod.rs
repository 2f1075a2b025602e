// Field descriptors: the typed views of named regions in a tune
pub mod descriptor;
pub mod scalar;
pub mod select;
pub mod table;
pub mod text;
pub mod varselect;

pub use descriptor::{FieldDescriptor, RegionAllocator};
pub use scalar::Scalar;
pub use select::Select;
pub use table::{region_size, BlendVar, Table, TableAxis};
pub use text::Text;
pub use varselect::VarSelect;
