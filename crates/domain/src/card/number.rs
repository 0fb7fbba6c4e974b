//! Card number validation.
//!
//! `is_valid` is the raw mod-10 check; `CardNumber` is the value type the
//! rest of the domain uses, which only constructs from a 15-16 digit string
//! that passes the check.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Luhn (mod-10) check digit validation.
///
/// Walks the digits right to left, doubling every second digit starting
/// from the second-to-last and subtracting 9 from doubles of 10 or more.
/// The number is valid iff the digit sum is divisible by 10.
///
/// Strings containing anything other than ASCII digits are invalid, as is
/// the empty string.
pub fn is_valid(number: &str) -> bool {
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    let sum: u32 = number
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let digit = u32::from(b - b'0');
            if i % 2 == 1 {
                let doubled = digit * 2;
                if doubled >= 10 { doubled - 9 } else { doubled }
            } else {
                digit
            }
        })
        .sum();

    sum % 10 == 0
}

/// Error returned when a string is not an acceptable card number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid card number")]
pub struct CardNumberError;

/// A validated card number: 15 or 16 digits with a correct check digit.
///
/// Constructing one is the only way to get a card number into the domain,
/// so a `Card` can never hold an invalid number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardNumber(String);

impl CardNumber {
    /// Parses and validates a raw number string.
    pub fn parse(raw: &str) -> Result<Self, CardNumberError> {
        if !(15..=16).contains(&raw.len()) || !is_valid(raw) {
            return Err(CardNumberError);
        }
        Ok(Self(raw.to_string()))
    }

    /// Returns the number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last four digits, as shown in notifications.
    pub fn last_four(&self) -> &str {
        &self.0[self.0.len() - 4..]
    }
}

impl std::fmt::Display for CardNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for CardNumber {
    type Error = CardNumberError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<CardNumber> for String {
    fn from(number: CardNumber) -> Self {
        number.0
    }
}

impl AsRef<str> for CardNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_check_digit() {
        assert!(is_valid("1234567812345670"));
        assert!(is_valid("4539578763621486"));
    }

    #[test]
    fn rejects_wrong_check_digit() {
        assert!(!is_valid("1234567812345678"));
        assert!(!is_valid("4539578763621487"));
    }

    #[test]
    fn rejects_non_numeric_input() {
        assert!(!is_valid(""));
        assert!(!is_valid("1234 5678 1234 5670"));
        assert!(!is_valid("123456781234567a"));
        assert!(!is_valid("-234567812345670"));
    }

    #[test]
    fn fifteen_digit_numbers_are_checked_too() {
        // American Express test number
        assert!(is_valid("378282246310005"));
        assert!(!is_valid("378282246310006"));
    }

    #[test]
    fn parse_enforces_length() {
        assert!(CardNumber::parse("1234567812345670").is_ok());
        assert!(CardNumber::parse("378282246310005").is_ok());
        // Luhn-valid but too short
        assert!(CardNumber::parse("79927398713").is_err());
        assert!(CardNumber::parse("12345678123456700329").is_err());
    }

    #[test]
    fn parse_enforces_check_digit() {
        assert_eq!(
            CardNumber::parse("1234567812345678"),
            Err(CardNumberError)
        );
    }

    #[test]
    fn last_four() {
        let number = CardNumber::parse("1234567812345670").unwrap();
        assert_eq!(number.last_four(), "5670");
    }

    #[test]
    fn serde_rejects_invalid_numbers() {
        let ok: Result<CardNumber, _> = serde_json::from_str("\"1234567812345670\"");
        assert!(ok.is_ok());
        let bad: Result<CardNumber, _> = serde_json::from_str("\"1234567812345678\"");
        assert!(bad.is_err());
    }
}
