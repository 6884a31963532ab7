use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Error returned when a quarter label cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuarterKeyError {
    #[error("invalid quarter key {0:?}, expected QX_YYYY (e.g. Q1_2006)")]
    Format(String),
    #[error("quarter {0} out of range, expected 1-4")]
    QuarterRange(u32),
}

/// A fiscal quarter, ordered by year then quarter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QuarterKey {
    pub year: i32,
    pub quarter: u8,
}

impl QuarterKey {
    pub fn new(year: i32, quarter: u32) -> Result<Self, QuarterKeyError> {
        if !(1..=4).contains(&quarter) {
            return Err(QuarterKeyError::QuarterRange(quarter));
        }
        Ok(Self {
            year,
            quarter: quarter as u8,
        })
    }

    /// Quarter label without the year, e.g. "Q3"
    pub fn quarter_label(&self) -> String {
        format!("Q{}", self.quarter)
    }
}

impl fmt::Display for QuarterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}_{}", self.quarter, self.year)
    }
}

impl FromStr for QuarterKey {
    type Err = QuarterKeyError;

    /// Accepts `Q1_2006`, `q1-2006` and `Q1 2006`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let format_err = || QuarterKeyError::Format(s.to_string());

        let mut parts = trimmed.splitn(2, ['_', '-', ' ']);
        let q = parts.next().ok_or_else(format_err)?;
        let y = parts.next().ok_or_else(format_err)?;

        let q = q
            .strip_prefix('Q')
            .or_else(|| q.strip_prefix('q'))
            .ok_or_else(format_err)?;
        let quarter: u32 = q.parse().map_err(|_| format_err())?;
        let year: i32 = y.trim().parse().map_err(|_| format_err())?;

        Self::new(year, quarter)
    }
}

/// Parse a quarter given either as "Q3" or "3"
pub fn parse_quarter_number(s: &str) -> Option<u8> {
    let s = s.trim();
    let digits = s
        .strip_prefix('Q')
        .or_else(|| s.strip_prefix('q'))
        .unwrap_or(s);
    match digits.parse::<u8>() {
        Ok(q @ 1..=4) => Some(q),
        _ => None,
    }
}

impl Serialize for QuarterKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for QuarterKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical() {
        let key: QuarterKey = "Q1_2006".parse().unwrap();
        assert_eq!(key.year, 2006);
        assert_eq!(key.quarter, 1);
        assert_eq!(key.to_string(), "Q1_2006");
    }

    #[test]
    fn test_parse_lenient_separators() {
        assert_eq!("q4-2019".parse::<QuarterKey>().unwrap().to_string(), "Q4_2019");
        assert_eq!("Q2 2021".parse::<QuarterKey>().unwrap().to_string(), "Q2_2021");
    }

    #[test]
    fn test_parse_rejects_bad_keys() {
        assert!("2006".parse::<QuarterKey>().is_err());
        assert!("Q_2006".parse::<QuarterKey>().is_err());
        assert!("X1_2006".parse::<QuarterKey>().is_err());
        assert_eq!(
            "Q5_2006".parse::<QuarterKey>(),
            Err(QuarterKeyError::QuarterRange(5))
        );
    }

    #[test]
    fn test_ordering_is_year_then_quarter() {
        let a: QuarterKey = "Q4_2019".parse().unwrap();
        let b: QuarterKey = "Q1_2020".parse().unwrap();
        let c: QuarterKey = "Q2_2020".parse().unwrap();
        let mut keys = vec![c, a, b];
        keys.sort();
        assert_eq!(keys, vec![a, b, c]);
    }

    #[test]
    fn test_parse_quarter_number() {
        assert_eq!(parse_quarter_number("Q3"), Some(3));
        assert_eq!(parse_quarter_number("2"), Some(2));
        assert_eq!(parse_quarter_number("Q0"), None);
        assert_eq!(parse_quarter_number("abc"), None);
    }

    #[test]
    fn test_serde_uses_canonical_string() {
        let key = QuarterKey::new(2023, 2).unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"Q2_2023\"");
        let back: QuarterKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }
}
