//! IPv4 address keys.
//!
//! An address key is the big-endian 32-bit integer of a dotted quad, which is
//! also how the published range table encodes its bounds.

use std::net::Ipv4Addr;

use polars::prelude::AnyValue;

use fraud_common::{any_to_f64, any_to_string, parse_f64};
use fraud_model::KeyFormat;

use crate::error::ParseError;

/// Outcome of reading one address cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressKey {
    Key(u32),
    /// Null or blank cell.
    Absent,
    Invalid(ParseError),
}

impl AddressKey {
    pub fn key(&self) -> Option<u32> {
        match self {
            Self::Key(key) => Some(*key),
            _ => None,
        }
    }
}

impl From<Result<Option<u32>, ParseError>> for AddressKey {
    fn from(value: Result<Option<u32>, ParseError>) -> Self {
        match value {
            Ok(Some(key)) => Self::Key(key),
            Ok(None) => Self::Absent,
            Err(err) => Self::Invalid(err),
        }
    }
}

/// Parses a dotted quad such as `"192.168.1.1"` into its integer key.
///
/// Leading zeros inside an octet are accepted; surrounding whitespace is
/// ignored.
pub fn ip_to_key(text: &str) -> Result<u32, ParseError> {
    let input = text.trim();
    let parts: Vec<&str> = input.split('.').collect();
    if parts.len() != 4 {
        return Err(ParseError::OctetCount {
            input: input.to_string(),
            found: parts.len(),
        });
    }
    let mut key = 0u32;
    for part in parts {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseError::NonNumeric {
                input: input.to_string(),
                token: part.to_string(),
            });
        }
        let octet = part
            .parse::<u32>()
            .ok()
            .and_then(|value| u8::try_from(value).ok())
            .ok_or_else(|| ParseError::OctetRange {
                input: input.to_string(),
                octet: part.to_string(),
            })?;
        key = (key << 8) | u32::from(octet);
    }
    Ok(key)
}

/// Formats a key back into dotted-quad form.
pub fn key_to_ip(key: u32) -> String {
    Ipv4Addr::from(key).to_string()
}

/// Dotted-quad text to an optional key; blank text has no key.
pub fn address_key(text: &str) -> Result<Option<u32>, ParseError> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    ip_to_key(text).map(Some)
}

/// Integer-encoded address, truncated toward zero.
fn key_from_number(value: f64, input: &str) -> Result<u32, ParseError> {
    if !value.is_finite() || value < 0.0 || value >= 4_294_967_296.0 {
        return Err(ParseError::OutOfRange {
            input: input.to_string(),
        });
    }
    Ok(value.trunc() as u32)
}

fn key_from_text(text: &str, format: KeyFormat) -> AddressKey {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return AddressKey::Absent;
    }
    let numeric = parse_f64(trimmed);
    let result = match (format, numeric) {
        (KeyFormat::DottedQuad, _) | (KeyFormat::Auto, None) => ip_to_key(trimmed),
        (KeyFormat::Integer | KeyFormat::Auto, Some(value)) => key_from_number(value, trimmed),
        (KeyFormat::Integer, None) => Err(ParseError::NonNumeric {
            input: trimmed.to_string(),
            token: trimmed.to_string(),
        }),
    };
    result.map(Some).into()
}

/// Reads one table cell as an address key.
pub fn extract_key(value: AnyValue<'_>, format: KeyFormat) -> AddressKey {
    match value {
        AnyValue::Null => AddressKey::Absent,
        AnyValue::String(text) => key_from_text(text, format),
        AnyValue::StringOwned(text) => key_from_text(&text, format),
        other => {
            let input = any_to_string(other.clone());
            match (format, any_to_f64(other)) {
                (KeyFormat::DottedQuad, _) => AddressKey::Invalid(ParseError::NonNumeric {
                    token: input.clone(),
                    input,
                }),
                (_, Some(number)) => key_from_number(number, &input).map(Some).into(),
                // NaN cells are missing values.
                (_, None) if input.eq_ignore_ascii_case("nan") => AddressKey::Absent,
                (_, None) => AddressKey::Invalid(ParseError::NonNumeric {
                    token: input.clone(),
                    input,
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ip_to_key_bounds() {
        assert_eq!(ip_to_key("0.0.0.0"), Ok(0));
        assert_eq!(ip_to_key("0.0.0.1"), Ok(1));
        assert_eq!(ip_to_key("1.0.0.0"), Ok(16_777_216));
        assert_eq!(ip_to_key("255.255.255.255"), Ok(u32::MAX));
        assert_eq!(ip_to_key(" 10.0.0.1 "), Ok(167_772_161));
    }

    #[test]
    fn test_ip_to_key_errors() {
        assert!(matches!(
            ip_to_key("999.1.1.1"),
            Err(ParseError::OctetRange { .. })
        ));
        assert!(matches!(
            ip_to_key("abc"),
            Err(ParseError::OctetCount { found: 1, .. })
        ));
        assert!(matches!(
            ip_to_key("1.2.x.4"),
            Err(ParseError::NonNumeric { .. })
        ));
        assert!(matches!(
            ip_to_key("1..3.4"),
            Err(ParseError::NonNumeric { .. })
        ));
        assert!(matches!(
            ip_to_key("1.2.3.4.5"),
            Err(ParseError::OctetCount { found: 5, .. })
        ));
    }

    #[test]
    fn test_address_key_blank_is_absent() {
        assert_eq!(address_key(""), Ok(None));
        assert_eq!(address_key("   "), Ok(None));
        assert_eq!(address_key("0.0.1.0"), Ok(Some(256)));
    }

    #[test]
    fn test_key_to_ip() {
        assert_eq!(key_to_ip(0), "0.0.0.0");
        assert_eq!(key_to_ip(u32::MAX), "255.255.255.255");
        assert_eq!(key_to_ip(3_232_235_777), "192.168.1.1");
    }

    #[test]
    fn test_extract_key_numeric_cells() {
        assert_eq!(
            extract_key(AnyValue::Float64(732_758_368.799_72), KeyFormat::Auto),
            AddressKey::Key(732_758_368)
        );
        assert_eq!(
            extract_key(AnyValue::Int64(42), KeyFormat::Integer),
            AddressKey::Key(42)
        );
        assert!(matches!(
            extract_key(AnyValue::Float64(-1.0), KeyFormat::Auto),
            AddressKey::Invalid(ParseError::OutOfRange { .. })
        ));
        assert!(matches!(
            extract_key(AnyValue::Float64(5e9), KeyFormat::Integer),
            AddressKey::Invalid(ParseError::OutOfRange { .. })
        ));
        assert!(matches!(
            extract_key(AnyValue::Int64(42), KeyFormat::DottedQuad),
            AddressKey::Invalid(ParseError::NonNumeric { .. })
        ));
        assert_eq!(
            extract_key(AnyValue::Float64(f64::NAN), KeyFormat::Auto),
            AddressKey::Absent
        );
    }

    #[test]
    fn test_extract_key_text_cells() {
        assert_eq!(
            extract_key(AnyValue::String("1.0.0.1"), KeyFormat::Auto),
            AddressKey::Key(16_777_217)
        );
        assert_eq!(
            extract_key(AnyValue::String("16777217"), KeyFormat::Auto),
            AddressKey::Key(16_777_217)
        );
        assert_eq!(
            extract_key(AnyValue::String(""), KeyFormat::Auto),
            AddressKey::Absent
        );
        assert_eq!(extract_key(AnyValue::Null, KeyFormat::Integer), AddressKey::Absent);
        assert!(matches!(
            extract_key(AnyValue::String("abc"), KeyFormat::Integer),
            AddressKey::Invalid(ParseError::NonNumeric { .. })
        ));
        assert!(matches!(
            extract_key(AnyValue::String("16777217"), KeyFormat::DottedQuad),
            AddressKey::Invalid(ParseError::OctetCount { .. })
        ));
    }
}
