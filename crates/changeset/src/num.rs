//! Radix-36 integers as used by the changeset wire format.
//!
//! Digits are `0-9a-z`, always lowercase. Upper-case digits and signs are
//! rejected so that every number has exactly one encoding.

use crate::error::{malformed, Result};

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Returns the value of a single lowercase radix-36 digit.
pub(crate) fn digit_value(b: u8) -> Option<u32> {
    match b {
        b'0'..=b'9' => Some((b - b'0') as u32),
        b'a'..=b'z' => Some((b - b'a') as u32 + 10),
        _ => None,
    }
}

/// Parses a radix-36 number.
///
/// ```
/// use pad_changeset::num::parse_num;
///
/// assert_eq!(parse_num("0").unwrap(), 0);
/// assert_eq!(parse_num("z").unwrap(), 35);
/// assert_eq!(parse_num("10").unwrap(), 36);
/// assert!(parse_num("").is_err());
/// assert!(parse_num("A").is_err());
/// ```
pub fn parse_num(s: &str) -> Result<usize> {
    if s.is_empty() {
        return Err(malformed("empty number"));
    }
    let mut value: usize = 0;
    for b in s.bytes() {
        let d = digit_value(b).ok_or_else(|| malformed(format!("invalid radix-36 number: {s:?}")))?;
        value = value
            .checked_mul(36)
            .and_then(|v| v.checked_add(d as usize))
            .ok_or_else(|| malformed(format!("number overflow: {s:?}")))?;
    }
    Ok(value)
}

/// Formats a number in radix 36.
///
/// ```
/// use pad_changeset::num::num_to_string;
///
/// assert_eq!(num_to_string(0), "0");
/// assert_eq!(num_to_string(35), "z");
/// assert_eq!(num_to_string(36), "10");
/// ```
pub fn num_to_string(mut n: usize) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(DIGITS[n % 36]);
        n /= 36;
    }
    buf.reverse();
    // Only ASCII digits were pushed.
    buf.into_iter().map(char::from).collect()
}

/// Appends the radix-36 form of `n` to `out`.
pub(crate) fn push_num(out: &mut String, n: usize) {
    out.push_str(&num_to_string(n));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multi_digit_numbers() {
        assert_eq!(parse_num("az").unwrap(), 10 * 36 + 35);
        assert_eq!(parse_num("asdf0").unwrap(), 18_119_916);
    }

    #[test]
    fn rejects_signs_and_uppercase() {
        assert!(parse_num("+1").is_err());
        assert!(parse_num("-1").is_err());
        assert!(parse_num("Z").is_err());
    }

    #[test]
    fn rejects_overflow() {
        assert!(parse_num(&"z".repeat(40)).is_err());
    }

    #[test]
    fn formats_like_lowercase_radix_36() {
        assert_eq!(num_to_string(18_119_916), "asdf0");
        assert_eq!(num_to_string(36 * 36), "100");
    }
}
