// Little-endian data elements at byte offsets

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ElementError {
    #[error("Insufficient data: need {expected} bytes at offset {offset}, buffer has {actual}")]
    InsufficientData {
        offset: usize,
        expected: usize,
        actual: usize,
    },
}

pub type Result<T> = std::result::Result<T, ElementError>;

fn span(data: &[u8], offset: usize, len: usize) -> Result<std::ops::Range<usize>> {
    match offset.checked_add(len) {
        Some(end) if end <= data.len() => Ok(offset..end),
        _ => Err(ElementError::InsufficientData {
            offset,
            expected: len,
            actual: data.len(),
        }),
    }
}

pub fn read_u8(data: &[u8], offset: usize) -> Result<u8> {
    let r = span(data, offset, 1)?;
    Ok(data[r.start])
}

pub fn write_u8(data: &mut [u8], offset: usize, value: u8) -> Result<()> {
    let r = span(data, offset, 1)?;
    data[r.start] = value;
    Ok(())
}

pub fn read_i8(data: &[u8], offset: usize) -> Result<i8> {
    Ok(read_u8(data, offset)? as i8)
}

/// Read a u16 in little-endian format
pub fn read_u16_le(data: &[u8], offset: usize) -> Result<u16> {
    let r = span(data, offset, 2)?;
    Ok(u16::from_le_bytes([data[r.start], data[r.start + 1]]))
}

/// Write a u16 in little-endian format
pub fn write_u16_le(data: &mut [u8], offset: usize, value: u16) -> Result<()> {
    let r = span(data, offset, 2)?;
    data[r].copy_from_slice(&value.to_le_bytes());
    Ok(())
}
