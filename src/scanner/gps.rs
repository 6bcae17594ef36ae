use exif::Value;

/// Normalize a raw EXIF coordinate value to decimal degrees.
///
/// Cameras encode GPS coordinates either as a single numeric value
/// (already decimal degrees) or as a degrees/minutes/seconds rational
/// triple. Anything else is treated as unparseable and yields `None`.
pub fn normalize_coordinate(value: &Value) -> Option<f64> {
    let decimal = match value {
        Value::Rational(v) => match v.len() {
            1 => v[0].to_f64(),
            3 => dms_to_decimal(v[0].to_f64(), v[1].to_f64(), v[2].to_f64()),
            _ => return None,
        },
        Value::SRational(v) => match v.len() {
            1 => v[0].to_f64(),
            3 => dms_to_decimal(v[0].to_f64(), v[1].to_f64(), v[2].to_f64()),
            _ => return None,
        },
        Value::Float(v) if v.len() == 1 => f64::from(v[0]),
        Value::Double(v) if v.len() == 1 => v[0],
        _ => return None,
    };

    // Zero-denominator rationals come out as inf/NaN
    decimal.is_finite().then_some(decimal)
}

/// Sign multiplier from a GPSLatitudeRef/GPSLongitudeRef tag value.
///
/// Returns `None` when the reference letter is missing or unrecognized;
/// the caller then keeps the coordinate's own sign.
pub fn hemisphere_sign(reference: &Value) -> Option<f64> {
    let byte = match reference {
        Value::Ascii(v) => *v.first()?.first()?,
        _ => return None,
    };
    match byte.to_ascii_uppercase() {
        b'N' | b'E' => Some(1.0),
        b'S' | b'W' => Some(-1.0),
        _ => None,
    }
}

/// Round to a fixed number of decimal places for storage.
pub fn round_dp(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn dms_to_decimal(degrees: f64, minutes: f64, seconds: f64) -> f64 {
    degrees + minutes / 60.0 + seconds / 3600.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use exif::Rational;

    fn rationals(parts: &[(u32, u32)]) -> Value {
        Value::Rational(parts.iter().map(|&(num, denom)| Rational { num, denom }).collect())
    }

    #[test]
    fn test_dms_triple() {
        let value = rationals(&[(37, 1), (46, 1), (2964, 100)]);
        let decimal = normalize_coordinate(&value).unwrap();
        assert!((decimal - 37.7749).abs() < 1e-6);
    }

    #[test]
    fn test_single_rational_is_decimal_degrees() {
        let value = rationals(&[(1234567, 100000)]);
        let decimal = normalize_coordinate(&value).unwrap();
        assert!((decimal - 12.34567).abs() < 1e-9);
    }

    #[test]
    fn test_double_value() {
        let value = Value::Double(vec![-122.4194]);
        assert_eq!(normalize_coordinate(&value), Some(-122.4194));
    }

    #[test]
    fn test_two_element_rational_rejected() {
        let value = rationals(&[(37, 1), (46, 1)]);
        assert_eq!(normalize_coordinate(&value), None);
    }

    #[test]
    fn test_ascii_rejected() {
        let value = Value::Ascii(vec![b"37.7749".to_vec()]);
        assert_eq!(normalize_coordinate(&value), None);
    }

    #[test]
    fn test_zero_denominator_rejected() {
        let value = rationals(&[(37, 0)]);
        assert_eq!(normalize_coordinate(&value), None);
    }

    #[test]
    fn test_hemisphere_signs() {
        assert_eq!(hemisphere_sign(&Value::Ascii(vec![b"N".to_vec()])), Some(1.0));
        assert_eq!(hemisphere_sign(&Value::Ascii(vec![b"s".to_vec()])), Some(-1.0));
        assert_eq!(hemisphere_sign(&Value::Ascii(vec![b"E".to_vec()])), Some(1.0));
        assert_eq!(hemisphere_sign(&Value::Ascii(vec![b"W".to_vec()])), Some(-1.0));
        assert_eq!(hemisphere_sign(&Value::Ascii(vec![b"X".to_vec()])), None);
        assert_eq!(hemisphere_sign(&Value::Ascii(vec![])), None);
    }

    #[test]
    fn test_round_dp() {
        assert_eq!(round_dp(37.774912345, 6), 37.774912);
        assert_eq!(round_dp(-122.41941999, 6), -122.41942);
        assert_eq!(round_dp(15.456, 2), 15.46);
    }
}
