use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Digit alphabet of the short URL encoding, indexed by digit value.
pub const ALPHABET: &[u8; 64] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_-";

/// Number of base-64 digits needed to spell `u64::MAX`.
const MAX_LENGTH: usize = 11;

/// A short URL identifier: a non-negative integer written in base 64,
/// most-significant digit first, without leading-zero padding.
///
/// Every reservation row and every mapping row is keyed by one of these.
/// The only way to obtain a `ShortUrl` is through [`ShortUrl::encode`] or a
/// validating constructor, so a value is always in canonical form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShortUrl(String);

impl ShortUrl {
    /// Encodes `value` as a short URL.
    ///
    /// `encode(0)` is `"0"`; no other value starts with `'0'`.
    pub fn encode(mut value: u64) -> Self {
        if value == 0 {
            return Self("0".to_string());
        }

        let mut digits = Vec::with_capacity(MAX_LENGTH);
        while value > 0 {
            digits.push(ALPHABET[(value % 64) as usize]);
            value /= 64;
        }
        digits.reverse();

        Self(digits.into_iter().map(char::from).collect())
    }

    /// Creates a `ShortUrl` after validating that `code` is canonical.
    pub fn new(code: impl Into<String>) -> Result<Self, CoreError> {
        let code = code.into();
        decode_str(&code)?;
        Ok(Self(code))
    }

    /// Decodes the identifier back to the integer it encodes.
    pub fn decode(&self) -> u64 {
        // Construction guarantees a canonical, in-range string.
        decode_str(&self.0).unwrap_or_default()
    }

    /// Returns the short URL as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn digit_value(c: u8) -> Option<u64> {
    let value = match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'z' => c - b'a' + 10,
        b'A'..=b'Z' => c - b'A' + 36,
        b'_' => 62,
        b'-' => 63,
        _ => return None,
    };
    Some(u64::from(value))
}

fn decode_str(code: &str) -> Result<u64, CoreError> {
    if code.is_empty() {
        return Err(CoreError::InvalidShortUrl("short url cannot be empty".to_string()));
    }
    if code.len() > MAX_LENGTH {
        return Err(CoreError::InvalidShortUrl(format!(
            "short url is longer than {MAX_LENGTH} characters: '{code}'"
        )));
    }
    if code.len() > 1 && code.starts_with('0') {
        return Err(CoreError::InvalidShortUrl(format!(
            "short url has a leading zero: '{code}'"
        )));
    }

    code.bytes().try_fold(0_u64, |acc, c| {
        let digit = digit_value(c).ok_or_else(|| {
            CoreError::InvalidShortUrl(format!(
                "must contain only [0-9a-zA-Z_-]: '{code}'"
            ))
        })?;
        acc.checked_mul(64)
            .and_then(|acc| acc.checked_add(digit))
            .ok_or_else(|| CoreError::Overflow(code.to_string()))
    })
}

impl TryFrom<String> for ShortUrl {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ShortUrl> for String {
    fn from(value: ShortUrl) -> Self {
        value.0
    }
}

impl AsRef<str> for ShortUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for ShortUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_zero_is_single_digit() {
        assert_eq!(ShortUrl::encode(0).as_str(), "0");
    }

    #[test]
    fn encode_digit_boundaries() {
        assert_eq!(ShortUrl::encode(9).as_str(), "9");
        assert_eq!(ShortUrl::encode(10).as_str(), "a");
        assert_eq!(ShortUrl::encode(36).as_str(), "A");
        assert_eq!(ShortUrl::encode(62).as_str(), "_");
        assert_eq!(ShortUrl::encode(63).as_str(), "-");
        assert_eq!(ShortUrl::encode(64).as_str(), "10");
        assert_eq!(ShortUrl::encode(64 * 64 - 1).as_str(), "--");
    }

    #[test]
    fn encode_never_pads() {
        for n in 1..5_000_u64 {
            let code = ShortUrl::encode(n);
            assert!(!code.as_str().starts_with('0'), "{n} -> {code}");
        }
    }

    #[test]
    fn decode_inverts_encode_across_seven_digit_space() {
        let max = 64_u64.pow(7) - 1;
        let step = 9_973;
        let mut n = 0;
        while n <= max {
            assert_eq!(ShortUrl::encode(n).decode(), n);
            n += step;
        }
        assert_eq!(ShortUrl::encode(max).as_str(), "-------");
        assert_eq!(ShortUrl::encode(max).decode(), max);
    }

    #[test]
    fn encode_stays_in_alphabet() {
        for n in [0, 1, 63, 64, 4_095, 262_143, u64::MAX] {
            let code = ShortUrl::encode(n);
            assert!(code.as_str().bytes().all(|c| ALPHABET.contains(&c)));
        }
    }

    #[test]
    fn u64_max_round_trips() {
        let code = ShortUrl::encode(u64::MAX);
        assert_eq!(code.as_str().len(), MAX_LENGTH);
        assert_eq!(ShortUrl::new(code.as_str()).unwrap().decode(), u64::MAX);
    }

    #[test]
    fn rejects_invalid_input() {
        assert!(matches!(ShortUrl::new(""), Err(CoreError::InvalidShortUrl(_))));
        assert!(matches!(ShortUrl::new("ab/c"), Err(CoreError::InvalidShortUrl(_))));
        assert!(matches!(ShortUrl::new("007"), Err(CoreError::InvalidShortUrl(_))));
        assert!(matches!(
            ShortUrl::new("a".repeat(12)),
            Err(CoreError::InvalidShortUrl(_))
        ));
        // 11 digits whose leading digit pushes past u64::MAX.
        assert!(matches!(ShortUrl::new("g0000000000"), Err(CoreError::Overflow(_))));
    }

    #[test]
    fn serde_validates_on_the_way_in() {
        let code: ShortUrl = serde_json::from_str("\"a_\"").unwrap();
        assert_eq!(code.decode(), 10 * 64 + 62);
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"a_\"");
        assert!(serde_json::from_str::<ShortUrl>("\"no way\"").is_err());
    }
}
