//! Auction amounts are kept as integer cents and exchanged as decimal strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

/// Largest amount that fits ten significant digits with two decimals.
pub const MAX_CENTS: i64 = 99_999_999_99;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cents(pub i64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidAmount;

impl FromStr for Cents {
    type Err = InvalidAmount;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };

        if whole.is_empty() || frac.len() > 2 {
            return Err(InvalidAmount);
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidAmount);
        }
        if s.ends_with('.') {
            return Err(InvalidAmount);
        }

        let whole: i64 = whole.parse().map_err(|_| InvalidAmount)?;
        let frac: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| InvalidAmount)? * 10,
            _ => frac.parse().map_err(|_| InvalidAmount)?,
        };

        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac))
            .ok_or(InvalidAmount)?;
        if cents <= 0 || cents > MAX_CENTS {
            return Err(InvalidAmount);
        }
        Ok(Cents(cents))
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Cents {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// An amount as submitted by a client: either `"12.50"` or `12.5`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Text(String),
    Number(serde_json::Number),
}

impl Amount {
    pub fn to_cents(&self) -> Result<Cents, InvalidAmount> {
        match self {
            Amount::Text(s) => s.parse(),
            Amount::Number(n) => n.to_string().parse(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_strings() {
        assert_eq!("12".parse::<Cents>(), Ok(Cents(1200)));
        assert_eq!("12.5".parse::<Cents>(), Ok(Cents(1250)));
        assert_eq!("0.07".parse::<Cents>(), Ok(Cents(7)));
        assert_eq!(" 3.10 ".parse::<Cents>(), Ok(Cents(310)));
    }

    #[test]
    fn rejects_bad_amounts() {
        for bad in ["", "0", "0.00", "-1", "1.234", "abc", "1.", ".5", "1e3", "100000000000"] {
            assert!(bad.parse::<Cents>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn formats_with_two_decimals() {
        assert_eq!(Cents(1250).to_string(), "12.50");
        assert_eq!(Cents(7).to_string(), "0.07");
        assert_eq!(serde_json::to_value(Cents(100)).unwrap(), serde_json::json!("1.00"));
    }

    #[test]
    fn amount_accepts_numbers_and_strings() {
        let from_number: Amount = serde_json::from_str("12.5").unwrap();
        let from_text: Amount = serde_json::from_str("\"12.50\"").unwrap();
        assert_eq!(from_number.to_cents(), Ok(Cents(1250)));
        assert_eq!(from_text.to_cents(), Ok(Cents(1250)));
    }
}
