// Binary encoding helpers for tune images
// Bit-level packing, little-endian elements, decimal scaling and nom parsers

pub mod bits;
pub mod elements;
pub mod parser;
pub mod scale;

pub use bits::{read_bits, write_bits};
pub use elements::ElementError;
pub use parser::{parse_axis, parse_cstring, parse_table_header, RawAxis, RawTableHeader};
pub use scale::{format_number, to_raw, to_real};
