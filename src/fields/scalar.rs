// Fixed-point number at a fixed offset

use crate::arena::ByteArena;
use crate::bitwise::{bits, scale};
use crate::core::Encoding;
use crate::error::{SchemaError, TuneResult, ValidationError};

#[derive(Debug, Clone, PartialEq)]
pub struct Scalar {
    pub name: String,
    pub short_name: String,
    pub units: String,
    pub offset: usize,
    pub encoding: Encoding,
    pub exponent: i32,
    pub conditional: Option<String>,
}

impl Scalar {
    /// Scalars are byte-aligned; fractional encodings are rejected
    pub fn new(
        name: impl Into<String>,
        short_name: impl Into<String>,
        units: impl Into<String>,
        offset: usize,
        encoding: Encoding,
        exponent: i32,
    ) -> Result<Self, SchemaError> {
        let short_name = short_name.into();
        if encoding.byte_width().is_none() {
            return Err(SchemaError::InvalidEncoding {
                field: short_name,
                encoding: encoding.as_schema(),
            });
        }
        Ok(Self {
            name: name.into(),
            short_name,
            units: units.into(),
            offset,
            encoding,
            exponent,
            conditional: None,
        })
    }

    pub fn with_conditional(mut self, conditional: Option<String>) -> Self {
        self.conditional = conditional;
        self
    }

    /// Bytes occupied in the tune
    pub fn size(&self) -> usize {
        self.encoding.byte_width().unwrap_or(0)
    }

    pub fn get(&self, arena: &ByteArena) -> TuneResult<f64> {
        let raw = arena.read_bits(
            self.offset,
            0,
            self.encoding.bits(),
            self.encoding.is_signed(),
        )?;
        Ok(scale::to_real(raw, self.exponent))
    }

    /// Store @value; values the width can not hold are rejected, not wrapped
    pub fn set(&self, arena: &mut ByteArena, value: f64) -> TuneResult<()> {
        if !value.is_finite() {
            return Err(ValidationError::NotFinite {
                field: self.short_name.clone(),
            }
            .into());
        }

        let raw = scale::to_raw(value, self.exponent);
        let (lo, hi) = bits::raw_range(self.encoding.bits(), self.encoding.is_signed());
        if raw < lo || raw > hi {
            return Err(ValidationError::OutOfRange {
                field: self.short_name.clone(),
                value,
                bits: self.encoding.bits(),
            }
            .into());
        }

        arena.write_bits(self.offset, 0, self.encoding.bits(), raw)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TuneError;

    fn scalar(encoding: f64, exponent: i32) -> Scalar {
        Scalar::new(
            "RPM limit",
            "rpm_limit",
            "rpm",
            4,
            Encoding::from_schema(encoding).unwrap(),
            exponent,
        )
        .unwrap()
    }

    #[test]
    fn test_round_trip() {
        let s = scalar(2.0, 0);
        let mut arena = ByteArena::zeroed(8);
        s.set(&mut arena, 6500.0).unwrap();
        assert_eq!(arena.get(4, 2).unwrap(), &6500u16.to_le_bytes());
        assert_eq!(s.get(&arena).unwrap(), 6500.0);
    }

    #[test]
    fn test_exponent_scaling() {
        let s = scalar(-2.0, -2);
        let mut arena = ByteArena::zeroed(8);
        for v in [-12.34, 0.29, 327.67, -327.68] {
            s.set(&mut arena, v).unwrap();
            assert_eq!(s.get(&arena).unwrap(), v);
        }
    }

    #[test]
    fn test_byte_region_round_trip() {
        // Every raw byte pattern decodes to a value that re-encodes identically
        let s = scalar(-1.0, -1);
        for b in 0..=255u8 {
            let arena = ByteArena::new(vec![0, 0, 0, 0, b]);
            let mut out = ByteArena::zeroed(5);
            s.set(&mut out, s.get(&arena).unwrap()).unwrap();
            assert_eq!(out, arena);
        }
    }

    #[test]
    fn test_out_of_range_rejected() {
        let s = scalar(1.0, 0);
        let mut arena = ByteArena::new(vec![0xAA; 6]);
        for v in [256.0, -1.0, f64::NAN] {
            let err = s.set(&mut arena, v).unwrap_err();
            assert!(matches!(err, TuneError::Validation(_)));
        }
        assert_eq!(arena.as_bytes(), &[0xAA; 6]);
    }

    #[test]
    fn test_fractional_encoding_rejected() {
        let err = Scalar::new("x", "x", "", 0, Encoding::from_schema(1.5).unwrap(), 0);
        assert!(matches!(err, Err(SchemaError::InvalidEncoding { .. })));
    }
}
