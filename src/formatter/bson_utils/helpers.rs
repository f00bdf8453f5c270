//! Helper functions for BSON value conversion

use mongodb::bson::{Binary, DateTime};

/// Convert DateTime to ISO 8601 string
///
/// # Arguments
/// * `dt` - BSON DateTime value
///
/// # Returns
/// RFC 3339 string, or the millisecond timestamp when out of range
pub fn datetime_to_iso_string(dt: &DateTime) -> String {
    dt.try_to_rfc3339_string()
        .unwrap_or_else(|_| format!("{}", dt.timestamp_millis()))
}

/// Convert Binary data to hexadecimal string
pub fn binary_to_hex(bin: &Binary) -> String {
    hex::encode(&bin.bytes)
}

/// Convert Binary data to Base64 string
pub fn binary_to_base64(bin: &Binary) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(&bin.bytes)
}

/// Format a double for display, dropping a zero fraction
pub fn format_double_smart(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e10 {
        format!("{:.0}", f)
    } else {
        format!("{}", f)
    }
}

/// Format a double the way Python's `repr(float)` does
///
/// Shortest round-trip digits. Magnitudes outside `[1e-4, 1e16)` use
/// scientific notation with a signed two-digit exponent; integral values
/// keep a `.0` suffix.
pub fn format_double_repr(f: f64) -> String {
    if f.is_nan() {
        return String::from("nan");
    }
    if f.is_infinite() {
        return String::from(if f > 0.0 { "inf" } else { "-inf" });
    }

    if f == 0.0 || (1e-4..1e16).contains(&f.abs()) {
        let text = f.to_string();
        if text.contains('.') {
            text
        } else {
            format!("{}.0", text)
        }
    } else {
        let text = format!("{:e}", f);
        match text.split_once('e') {
            Some((mantissa, exponent)) => {
                let (sign, digits) = match exponent.strip_prefix('-') {
                    Some(digits) => ('-', digits),
                    None => ('+', exponent),
                };
                format!("{}e{}{:0>2}", mantissa, sign, digits)
            }
            None => text,
        }
    }
}

/// Truncate string with ellipsis if longer than `max_chars` characters
///
/// # Arguments
/// * `s` - Input string
/// * `max_chars` - Maximum length in characters, ellipsis included
///
/// # Returns
/// Truncated string with "..." if needed
pub fn truncate_string(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::spec::BinarySubtype;

    #[test]
    fn test_datetime_to_iso_string() {
        let dt = DateTime::from_millis(1_756_368_000_000);
        assert_eq!(datetime_to_iso_string(&dt), "2025-08-28T08:00:00Z");
    }

    #[test]
    fn test_binary_encodings() {
        let bin = Binary {
            subtype: BinarySubtype::Generic,
            bytes: vec![0x01, 0x02, 0x03, 0xff],
        };
        assert_eq!(binary_to_hex(&bin), "010203ff");
        assert_eq!(binary_to_base64(&bin), "AQID/w==");
    }

    #[test]
    fn test_format_double_smart() {
        assert_eq!(format_double_smart(42.0), "42");
        assert_eq!(format_double_smart(42.5), "42.5");
    }

    #[test]
    fn test_format_double_repr() {
        assert_eq!(format_double_repr(220.0), "220.0");
        assert_eq!(format_double_repr(12.5), "12.5");
        assert_eq!(format_double_repr(0.0), "0.0");
        assert_eq!(format_double_repr(-0.0), "-0.0");
        assert_eq!(format_double_repr(0.0001), "0.0001");
        assert_eq!(format_double_repr(1.5e-5), "1.5e-05");
        assert_eq!(format_double_repr(1e15), "1000000000000000.0");
        assert_eq!(format_double_repr(1e16), "1e+16");
        assert_eq!(format_double_repr(-2.5e120), "-2.5e+120");
        assert_eq!(format_double_repr(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_double_repr(f64::NAN), "nan");
        assert_eq!(format_double_repr(f64::NEG_INFINITY), "-inf");
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("héllo wörld", 8), "héllo...");
    }
}
