// Schema loading, the field registry and table placement
pub mod allocator;
pub mod registry;
pub mod schema;

pub use allocator::{first_fit, free_ranges};
pub use registry::Config;
pub use schema::{MenuNode, Schema, TuneDocument};
