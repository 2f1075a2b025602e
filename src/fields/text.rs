// Fixed-length NUL-padded string

use crate::arena::ByteArena;
use crate::bitwise::parse_cstring;
use crate::error::{TuneResult, ValidationError};

#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub name: String,
    pub short_name: String,
    pub offset: usize,
    pub length: usize,
    pub conditional: Option<String>,
}

impl Text {
    pub fn new(
        name: impl Into<String>,
        short_name: impl Into<String>,
        offset: usize,
        length: usize,
    ) -> Self {
        Self {
            name: name.into(),
            short_name: short_name.into(),
            offset,
            length,
            conditional: None,
        }
    }

    pub fn with_conditional(mut self, conditional: Option<String>) -> Self {
        self.conditional = conditional;
        self
    }

    pub fn size(&self) -> usize {
        self.length
    }

    /// Text up to the first NUL
    ///
    /// Bytes that are not UTF-8 are an error rather than replaced, so a
    /// decoded string always stores back to the same bytes.
    pub fn get(&self, arena: &ByteArena) -> TuneResult<String> {
        let bytes = arena.get(self.offset, self.length)?;
        // The slice is exactly `length` bytes, so the parser can not run short
        let text = parse_cstring(self.length)(bytes)
            .map(|(_, text)| text)
            .unwrap_or_default();
        let s = std::str::from_utf8(text).map_err(|_| ValidationError::InvalidText {
            field: self.short_name.clone(),
        })?;
        Ok(s.to_string())
    }

    /// Store @value, zero-padding the rest of the field
    pub fn set(&self, arena: &mut ByteArena, value: &str) -> TuneResult<()> {
        let bytes = value.as_bytes();
        if bytes.len() > self.length {
            return Err(ValidationError::TextTooLong {
                field: self.short_name.clone(),
                len: bytes.len(),
                max: self.length,
            }
            .into());
        }

        let region = arena.get_mut(self.offset, self.length)?;
        region.fill(0);
        region[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}
