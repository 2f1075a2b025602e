// Decimal exponent scaling between stored integers and real values

/// Convert a stored integer into its real value, `raw * 10^exponent`
///
/// Negative exponents divide so the result is the closest `f64` to the
/// decimal (29 with exponent -2 gives exactly `0.29`).
pub fn to_real(raw: i64, exponent: i32) -> f64 {
    if exponent >= 0 {
        raw as f64 * 10f64.powi(exponent)
    } else {
        raw as f64 / 10f64.powi(-exponent)
    }
}

/// Convert a real value into the nearest stored integer, `round(value / 10^exponent)`
///
/// Callers check finiteness first; the cast saturates for huge values.
pub fn to_raw(value: f64, exponent: i32) -> i64 {
    let scaled = if exponent >= 0 {
        value / 10f64.powi(exponent)
    } else {
        value * 10f64.powi(-exponent)
    };
    scaled.round() as i64
}

/// Format @value with as many decimals as @exponent implies
pub fn format_number(value: f64, exponent: i32) -> String {
    let decimals = (-exponent).max(0) as usize;
    format!("{:.*}", decimals, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaling() {
        assert_eq!(to_real(6500, 0), 6500.0);
        assert_eq!(to_real(29, -2), 0.29);
        assert_eq!(to_real(-15, 1), -150.0);

        assert_eq!(to_raw(0.29, -2), 29);
        assert_eq!(to_raw(-150.0, 1), -15);
        assert_eq!(to_raw(154.0, 1), 15);
    }

    #[test]
    fn test_decimal_round_trip() {
        for exponent in -3..=2 {
            for raw in -1200..1200 {
                assert_eq!(to_raw(to_real(raw, exponent), exponent), raw);
            }
        }
    }

    #[test]
    fn test_format() {
        assert_eq!(format_number(1.5, -2), "1.50");
        assert_eq!(format_number(1200.0, 2), "1200");
        assert_eq!(format_number(7.0, 0), "7");
    }
}
