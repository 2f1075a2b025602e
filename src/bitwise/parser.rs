// Parser combinators using nom for tune structures

use nom::{
    bytes::complete::take,
    multi::count,
    number::complete::{le_i16, le_i8, le_u16, le_u8},
    IResult, Parser,
};

/// Parse a NUL-terminated, NUL-padded character field of @max_len bytes
///
/// Yields the bytes before the first NUL; decoding them is up to the caller.
pub fn parse_cstring(max_len: usize) -> impl Fn(&[u8]) -> IResult<&[u8], &[u8]> {
    move |input: &[u8]| {
        let (input, bytes) = take(max_len).parse(input)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok((input, &bytes[..end]))
    }
}

/// Fixed part of a table region preceding the axes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawTableHeader {
    pub interpolate: u8,
    pub blend_b: u8,
    pub blend_c: u8,
}

/// Parse the 4-byte table header (mode, blend B, blend C, reserved)
pub fn parse_table_header(input: &[u8]) -> IResult<&[u8], RawTableHeader> {
    let (input, (interpolate, blend_b, blend_c, _reserved)) =
        (le_u8, le_u8, le_u8, le_u8).parse(input)?;
    Ok((
        input,
        RawTableHeader {
            interpolate,
            blend_b,
            blend_c,
        },
    ))
}

/// One axis exactly as stored: count, exponent, variable index, raw bins
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAxis {
    pub exponent: i8,
    pub variable: u16,
    pub bins: Vec<i16>,
}

/// Parse an axis header followed by its signed 16-bit bins
pub fn parse_axis(input: &[u8]) -> IResult<&[u8], RawAxis> {
    let (input, (nbins, exponent, variable)) = (le_u8, le_i8, le_u16).parse(input)?;
    let (input, bins) = count(le_i16, nbins as usize).parse(input)?;
    Ok((
        input,
        RawAxis {
            exponent,
            variable,
            bins,
        },
    ))
}
