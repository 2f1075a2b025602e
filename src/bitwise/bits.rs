// Sub-byte bit packing for table cells

use super::elements::{ElementError, Result};

/// Largest supported field width in bits
pub const MAX_WIDTH: u32 = 32;

/// Mask covering the low @width bits
pub fn width_mask(width: u32) -> u64 {
    (1u64 << width) - 1
}

/// Smallest and largest raw value a field of @width bits can hold
pub fn raw_range(width: u32, signed: bool) -> (i64, i64) {
    if signed {
        let half = 1i64 << (width - 1);
        (-half, half - 1)
    } else {
        (0, width_mask(width) as i64)
    }
}

fn check_args(data: &[u8], byte_offset: usize, bit_offset: u32, width: u32) -> Result<()> {
    assert!(
        (1..=MAX_WIDTH).contains(&width),
        "bit field width {} outside 1..={}",
        width,
        MAX_WIDTH
    );
    assert!(bit_offset < 8, "bit offset {} is not within a byte", bit_offset);

    let bytes = ((bit_offset + width + 7) / 8) as usize;
    match byte_offset.checked_add(bytes) {
        Some(end) if end <= data.len() => Ok(()),
        _ => Err(ElementError::InsufficientData {
            offset: byte_offset,
            expected: bytes,
            actual: data.len(),
        }),
    }
}

/// Read a @width-bit integer starting at bit @bit_offset of @byte_offset
///
/// Bits are taken least-significant first: the remaining high bits of the
/// first byte, then whole bytes, then the low bits of the last byte.
/// Signed fields are sign extended from bit `width - 1`.
///
/// # Panics
/// When `width` is 0 or above [`MAX_WIDTH`], or `bit_offset >= 8`.
pub fn read_bits(
    data: &[u8],
    byte_offset: usize,
    bit_offset: u32,
    width: u32,
    signed: bool,
) -> Result<i64> {
    check_args(data, byte_offset, bit_offset, width)?;

    let mut value: u64 = 0;
    let mut shift = 0;
    let mut remaining = width;
    let mut bit = bit_offset;
    let mut pos = byte_offset;

    while remaining > 0 {
        let take = (8 - bit).min(remaining);
        let chunk = (data[pos] >> bit) as u64 & width_mask(take);
        value |= chunk << shift;
        shift += take;
        remaining -= take;
        bit = 0;
        pos += 1;
    }

    let mut value = value as i64;
    if signed && value & (1i64 << (width - 1)) != 0 {
        value -= 1i64 << width;
    }
    Ok(value)
}

/// Write the low @width bits of @value starting at bit @bit_offset of @byte_offset
///
/// Bits of shared bytes outside the field are preserved. Values wider than
/// the field are truncated to its low bits.
///
/// # Panics
/// When `width` is 0 or above [`MAX_WIDTH`], or `bit_offset >= 8`.
pub fn write_bits(
    data: &mut [u8],
    byte_offset: usize,
    bit_offset: u32,
    width: u32,
    value: i64,
) -> Result<()> {
    check_args(data, byte_offset, bit_offset, width)?;

    let mut value = value as u64 & width_mask(width);
    let mut remaining = width;
    let mut bit = bit_offset;
    let mut pos = byte_offset;

    while remaining > 0 {
        let take = (8 - bit).min(remaining);
        let mask = (width_mask(take) << bit) as u8;
        data[pos] = (data[pos] & !mask) | (((value << bit) as u8) & mask);
        value >>= take;
        remaining -= take;
        bit = 0;
        pos += 1;
    }

    Ok(())
}

/// Split an absolute bit address into (byte, bit)
pub fn split_bit_address(bit_address: usize) -> (usize, u32) {
    (bit_address / 8, (bit_address % 8) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_value_round_trips() {
        for &width in &[4u32, 8, 12, 16] {
            for &signed in &[false, true] {
                let (lo, hi) = raw_range(width, signed);
                for bit in [0u32, 3, 4] {
                    let mut data = [0u8; 4];
                    for v in lo..=hi {
                        write_bits(&mut data, 1, bit, width, v).unwrap();
                        assert_eq!(
                            read_bits(&data, 1, bit, width, signed).unwrap(),
                            v,
                            "width {} signed {} bit {}",
                            width,
                            signed,
                            bit
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_neighbours_are_preserved() {
        // Three 4-bit cells sharing bytes, then a 12-bit cell straddling two bytes
        let mut data = [0u8; 4];
        write_bits(&mut data, 0, 0, 4, 0xA).unwrap();
        write_bits(&mut data, 0, 4, 4, 0x5).unwrap();
        write_bits(&mut data, 1, 0, 4, 0xF).unwrap();
        write_bits(&mut data, 1, 4, 12, 0xABC).unwrap();
        assert_eq!(data, [0x5A, 0xCF, 0xAB, 0x00]);

        // Rewriting a middle cell leaves the others alone
        write_bits(&mut data, 0, 4, 4, 0x0).unwrap();
        assert_eq!(read_bits(&data, 0, 0, 4, false).unwrap(), 0xA);
        assert_eq!(read_bits(&data, 0, 4, 4, false).unwrap(), 0x0);
        assert_eq!(read_bits(&data, 1, 0, 4, false).unwrap(), 0xF);
        assert_eq!(read_bits(&data, 1, 4, 12, false).unwrap(), 0xABC);

        let mut ones = [0xFFu8; 2];
        write_bits(&mut ones, 0, 2, 4, 0).unwrap();
        assert_eq!(ones, [0xC3, 0xFF]);
    }

    #[test]
    fn test_sign_extension() {
        let data = [0x0F];
        assert_eq!(read_bits(&data, 0, 0, 4, true).unwrap(), -1);
        assert_eq!(read_bits(&data, 0, 0, 4, false).unwrap(), 15);
        assert_eq!(read_bits(&[0x08], 0, 0, 4, true).unwrap(), -8);
        assert_eq!(read_bits(&[0x07], 0, 0, 4, true).unwrap(), 7);
    }

    #[test]
    fn test_overflow_is_masked() {
        let mut data = [0u8; 2];
        write_bits(&mut data, 0, 0, 4, 0x1F).unwrap();
        assert_eq!(data, [0x0F, 0x00]);
        write_bits(&mut data, 0, 0, 8, 300).unwrap();
        assert_eq!(data, [44, 0x00]);
    }

    #[test]
    fn test_out_of_bounds() {
        let mut data = [0u8; 2];
        assert!(read_bits(&data, 1, 4, 8, false).is_err());
        assert!(write_bits(&mut data, 2, 0, 1, 1).is_err());
        assert_eq!(data, [0, 0]);
        assert!(read_bits(&data, 1, 4, 4, false).is_ok());
    }

    #[test]
    #[should_panic]
    fn test_zero_width_panics() {
        let _ = read_bits(&[0u8; 2], 0, 0, 0, false);
    }

    #[test]
    fn test_split_bit_address() {
        assert_eq!(split_bit_address(0), (0, 0));
        assert_eq!(split_bit_address(13), (1, 5));
    }
}
