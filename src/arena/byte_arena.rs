// Byte arena holding a whole tune image

use crate::bitwise::bits;
use crate::bitwise::elements::{self, ElementError};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArenaError {
    #[error("Access out of bounds: {offset}+{len} exceeds arena of {size} bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        size: usize,
    },
}

impl From<ElementError> for ArenaError {
    fn from(err: ElementError) -> Self {
        match err {
            ElementError::InsufficientData {
                offset,
                expected,
                actual,
            } => ArenaError::OutOfBounds {
                offset,
                len: expected,
                size: actual,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, ArenaError>;

/// Fixed-length tune image
///
/// The length never changes after creation; every write is bounds checked
/// so a corrupt table pointer can not grow or overrun the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteArena {
    data: Vec<u8>,
}

impl ByteArena {
    /// Wrap existing tune bytes
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Create a zero-filled arena of @size bytes
    pub fn zeroed(size: usize) -> Self {
        Self {
            data: vec![0u8; size],
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn check(&self, offset: usize, len: usize) -> Result<()> {
        match offset.checked_add(len) {
            Some(end) if end <= self.data.len() => Ok(()),
            _ => Err(ArenaError::OutOfBounds {
                offset,
                len,
                size: self.data.len(),
            }),
        }
    }

    /// Borrow @len bytes starting at @start
    pub fn get(&self, start: usize, len: usize) -> Result<&[u8]> {
        self.check(start, len)?;
        Ok(&self.data[start..start + len])
    }

    /// Borrow @len bytes starting at @start, mutably
    pub fn get_mut(&mut self, start: usize, len: usize) -> Result<&mut [u8]> {
        self.check(start, len)?;
        Ok(&mut self.data[start..start + len])
    }

    /// Copy @bytes into the arena at @pos
    pub fn set_bytes(&mut self, pos: usize, bytes: &[u8]) -> Result<()> {
        self.get_mut(pos, bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8> {
        Ok(elements::read_u8(&self.data, offset)?)
    }

    pub fn write_u8(&mut self, offset: usize, value: u8) -> Result<()> {
        Ok(elements::write_u8(&mut self.data, offset, value)?)
    }

    pub fn read_i8(&self, offset: usize) -> Result<i8> {
        Ok(elements::read_i8(&self.data, offset)?)
    }

    pub fn read_u16_le(&self, offset: usize) -> Result<u16> {
        Ok(elements::read_u16_le(&self.data, offset)?)
    }

    pub fn write_u16_le(&mut self, offset: usize, value: u16) -> Result<()> {
        Ok(elements::write_u16_le(&mut self.data, offset, value)?)
    }

    /// Read a packed integer, see [`bits::read_bits`]
    pub fn read_bits(&self, byte: usize, bit: u32, width: u32, signed: bool) -> Result<i64> {
        Ok(bits::read_bits(&self.data, byte, bit, width, signed)?)
    }

    /// Write a packed integer, see [`bits::write_bits`]
    pub fn write_bits(&mut self, byte: usize, bit: u32, width: u32, value: i64) -> Result<()> {
        Ok(bits::write_bits(&mut self.data, byte, bit, width, value)?)
    }

    /// Raw image bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Hex dump of `[start, end)`, clamped to the arena
    pub fn printable(&self, start: Option<usize>, end: Option<usize>) -> String {
        let end = end.unwrap_or(self.data.len()).min(self.data.len());
        let start = start.unwrap_or(0).min(end);
        hexdump(&self.data[start..end], start)
    }
}

impl From<Vec<u8>> for ByteArena {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<&[u8]> for ByteArena {
    fn from(data: &[u8]) -> Self {
        Self::new(data.to_vec())
    }
}

impl AsRef<[u8]> for ByteArena {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Display for ByteArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteArena({} bytes)", self.data.len())
    }
}

/// Hex dump in `hexdump -C` layout, offsets relative to @base
fn hexdump(data: &[u8], base: usize) -> String {
    let mut output = String::new();

    for (i, chunk) in data.chunks(16).enumerate() {
        output.push_str(&format!("{:08x}  ", base + i * 16));

        for j in 0..16 {
            if j == 8 {
                output.push(' ');
            }
            match chunk.get(j) {
                Some(byte) => output.push_str(&format!("{:02x} ", byte)),
                None => output.push_str("   "),
            }
        }

        output.push_str(" |");
        for &byte in chunk {
            if (0x20..=0x7e).contains(&byte) {
                output.push(byte as char);
            } else {
                output.push('.');
            }
        }
        output.push_str("|\n");
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroed() {
        let arena = ByteArena::zeroed(10);
        assert_eq!(arena.len(), 10);
        assert!(!arena.is_empty());
        assert_eq!(arena.get(0, 10).unwrap(), &[0u8; 10]);
        assert!(ByteArena::new(Vec::new()).is_empty());
    }

    #[test]
    fn test_get_set() {
        let mut arena = ByteArena::zeroed(10);
        arena.write_u8(5, 0x42).unwrap();
        assert_eq!(arena.read_u8(5).unwrap(), 0x42);

        arena.set_bytes(0, &[1, 2, 3]).unwrap();
        assert_eq!(arena.get(0, 3).unwrap(), &[1, 2, 3]);

        arena.write_u16_le(8, 0x1234).unwrap();
        assert_eq!(arena.get(8, 2).unwrap(), &[0x34, 0x12]);
        assert_eq!(arena.read_u16_le(8).unwrap(), 0x1234);
    }

    #[test]
    fn test_bounds_checking() {
        let mut arena = ByteArena::zeroed(3);
        assert!(arena.get(2, 2).is_err());
        assert!(arena.get(usize::MAX, 2).is_err());
        assert!(arena.set_bytes(1, &[0; 3]).is_err());
        assert_eq!(
            arena.read_u16_le(2),
            Err(ArenaError::OutOfBounds {
                offset: 2,
                len: 2,
                size: 3
            })
        );
        // A failed write leaves the image alone
        assert_eq!(arena.as_bytes(), &[0, 0, 0]);
    }

    #[test]
    fn test_hexdump() {
        let mut data: Vec<u8> = (0..16).collect();
        data.extend_from_slice(b"ABC");
        let arena = ByteArena::new(data);
        let dump = arena.printable(None, None);
        assert!(dump.contains("00 01 02 03"));
        assert!(dump.contains("41 42 43"));
        assert!(dump.contains("|ABC|"));

        let tail = arena.printable(Some(16), None);
        assert!(tail.starts_with("00000010"));
    }
}
