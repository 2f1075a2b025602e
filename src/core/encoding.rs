// Field encodings: sign convention plus a (possibly fractional) byte width

use crate::bitwise::bits::MAX_WIDTH;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Packed integer format declared by a schema number
///
/// The schema writes encodings as byte counts: `2` is an unsigned 16-bit
/// value, `-0.5` a signed nibble, `1.5` an unsigned 12-bit value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Encoding {
    bits: u32,
    signed: bool,
}

impl Encoding {
    pub fn new(bits: u32, signed: bool) -> Option<Self> {
        if (1..=MAX_WIDTH).contains(&bits) {
            Some(Self { bits, signed })
        } else {
            None
        }
    }

    pub fn unsigned(bits: u32) -> Option<Self> {
        Self::new(bits, false)
    }

    pub fn signed(bits: u32) -> Option<Self> {
        Self::new(bits, true)
    }

    /// Interpret a schema encoding number
    pub fn from_schema(encoding: f64) -> Option<Self> {
        if !encoding.is_finite() {
            return None;
        }
        let bits = (8.0 * encoding.abs()).round();
        if bits < 1.0 || bits > MAX_WIDTH as f64 {
            return None;
        }
        Self::new(bits as u32, encoding < 0.0)
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn is_signed(&self) -> bool {
        self.signed
    }

    /// Whole bytes, if the width is byte-aligned
    pub fn byte_width(&self) -> Option<usize> {
        if self.bits % 8 == 0 {
            Some((self.bits / 8) as usize)
        } else {
            None
        }
    }

    /// The schema number for this encoding
    pub fn as_schema(&self) -> f64 {
        let bytes = self.bits as f64 / 8.0;
        if self.signed {
            -bytes
        } else {
            bytes
        }
    }
}

impl TryFrom<f64> for Encoding {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::from_schema(value).ok_or_else(|| format!("invalid encoding {}", value))
    }
}

impl From<Encoding> for f64 {
    fn from(encoding: Encoding) -> Self {
        encoding.as_schema()
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.signed { "s" } else { "u" };
        write!(f, "{}{}", sign, self.bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_schema() {
        let e = Encoding::from_schema(2.0).unwrap();
        assert_eq!((e.bits(), e.is_signed()), (16, false));
        assert_eq!(e.byte_width(), Some(2));

        let e = Encoding::from_schema(-0.5).unwrap();
        assert_eq!((e.bits(), e.is_signed()), (4, true));
        assert_eq!(e.byte_width(), None);

        let e = Encoding::from_schema(1.5).unwrap();
        assert_eq!(e.bits(), 12);
        assert_eq!(e.to_string(), "u12");
        assert_eq!(e.as_schema(), 1.5);
    }

    #[test]
    fn test_invalid_encodings() {
        assert!(Encoding::from_schema(0.0).is_none());
        assert!(Encoding::from_schema(5.0).is_none());
        assert!(Encoding::from_schema(f64::NAN).is_none());
        assert!(Encoding::new(0, false).is_none());
    }

    #[test]
    fn test_serde() {
        let e: Encoding = serde_json::from_str("-2").unwrap();
        assert_eq!(e, Encoding::signed(16).unwrap());
        assert_eq!(serde_json::to_string(&e).unwrap(), "-2.0");
        assert!(serde_json::from_str::<Encoding>("0").is_err());
    }
}
