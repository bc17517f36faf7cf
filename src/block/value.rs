//! Decoded entry values.

use std::borrow::Cow;
use std::fmt;

/// A decoded block entry.
///
/// Byte strings that spell a canonical decimal `i64` are stored as integers
/// and come back as [`Value::Int`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// An opaque byte string.
    Bytes(Vec<u8>),
    /// An integer stored without its decimal text.
    Int(i64),
}

impl Value {
    /// Returns the integer if this entry was stored as one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Bytes(_) => None,
        }
    }

    /// Returns the byte string form (integers are rendered in decimal).
    pub fn to_bytes(&self) -> Cow<'_, [u8]> {
        match self {
            Value::Bytes(bytes) => Cow::Borrowed(bytes),
            Value::Int(v) => Cow::Owned(v.to_string().into_bytes()),
        }
    }

    /// Consumes the value and returns its byte string form.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Value::Bytes(bytes) => bytes,
            Value::Int(v) => v.to_string().into_bytes(),
        }
    }

    /// Length of the byte string form.
    pub fn byte_len(&self) -> usize {
        match self {
            Value::Bytes(bytes) => bytes.len(),
            Value::Int(v) => decimal_len(*v),
        }
    }

    /// Compares this entry with a caller supplied byte string.
    ///
    /// Integer entries match the canonical decimal spelling of their value.
    pub fn eq_bytes(&self, other: &[u8]) -> bool {
        match self {
            Value::Bytes(bytes) => bytes.as_slice() == other,
            Value::Int(v) => parse_int(other) == Some(*v),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        match parse_int(bytes) {
            Some(v) => Value::Int(v),
            None => Value::Bytes(bytes.to_vec()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::from(s.as_bytes())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bytes(bytes) => write!(f, "{}", String::from_utf8_lossy(bytes)),
            Value::Int(v) => write!(f, "{}", v),
        }
    }
}

/// Parses `bytes` as an `i64` only if it is the canonical decimal spelling:
/// optional leading `-`, no leading zeros, no `+`, no `-0`.
pub(crate) fn parse_int(bytes: &[u8]) -> Option<i64> {
    if bytes.is_empty() || bytes.len() > 20 {
        return None;
    }
    let (negative, digits) = match bytes[0] {
        b'-' => (true, &bytes[1..]),
        _ => (false, bytes),
    };
    match digits {
        [] => return None,
        [b'0'] => return if negative { None } else { Some(0) },
        [b'0', ..] => return None,
        _ => {}
    }

    let mut magnitude: u64 = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            return None;
        }
        magnitude = magnitude.checked_mul(10)?.checked_add((b - b'0') as u64)?;
    }

    if negative {
        if magnitude == i64::MIN.unsigned_abs() {
            Some(i64::MIN)
        } else {
            i64::try_from(magnitude).ok().map(|v| -v)
        }
    } else {
        i64::try_from(magnitude).ok()
    }
}

fn decimal_len(v: i64) -> usize {
    let mut n = v.unsigned_abs();
    let mut len = if v < 0 { 2 } else { 1 };
    while n >= 10 {
        n /= 10;
        len += 1;
    }
    len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int_canonical() {
        assert_eq!(parse_int(b"0"), Some(0));
        assert_eq!(parse_int(b"42"), Some(42));
        assert_eq!(parse_int(b"-17"), Some(-17));
        assert_eq!(parse_int(b"9223372036854775807"), Some(i64::MAX));
        assert_eq!(parse_int(b"-9223372036854775808"), Some(i64::MIN));
    }

    #[test]
    fn test_parse_int_rejects_non_canonical() {
        for input in [
            &b""[..],
            b"-",
            b"-0",
            b"007",
            b"+5",
            b" 5",
            b"5 ",
            b"1e3",
            b"9223372036854775808",
            b"-9223372036854775809",
            b"123456789012345678901",
        ] {
            assert_eq!(parse_int(input), None, "{:?}", String::from_utf8_lossy(input));
        }
    }

    #[test]
    fn test_value_from_bytes() {
        assert_eq!(Value::from("123"), Value::Int(123));
        assert_eq!(Value::from("abc"), Value::Bytes(b"abc".to_vec()));
        assert_eq!(Value::from("0123"), Value::Bytes(b"0123".to_vec()));
    }

    #[test]
    fn test_value_bytes_forms() {
        let v = Value::Int(-305);
        assert_eq!(v.to_bytes().as_ref(), b"-305");
        assert_eq!(v.byte_len(), 4);
        assert_eq!(v.clone().into_bytes(), b"-305".to_vec());
        assert_eq!(Value::Int(i64::MIN).byte_len(), 20);
        assert_eq!(Value::Int(0).byte_len(), 1);
    }

    #[test]
    fn test_eq_bytes() {
        assert!(Value::Int(77).eq_bytes(b"77"));
        assert!(!Value::Int(77).eq_bytes(b"077"));
        assert!(Value::Bytes(b"hello".to_vec()).eq_bytes(b"hello"));
        assert!(!Value::Bytes(b"hello".to_vec()).eq_bytes(b"hell"));
    }
}
