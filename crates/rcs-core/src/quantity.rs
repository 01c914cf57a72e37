//! Kubernetes-style resource quantities.
//!
//! Parses the textual forms used in pod specs and node status
//! (`"500m"`, `"1Gi"`, `"2"`, `"1e3"`, `"128M"`) into an `f64` count of base
//! units: cores for CPU, bytes for memory.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    #[error("empty quantity")]
    Empty,

    #[error("invalid quantity number: {0}")]
    Number(String),

    #[error("unknown quantity suffix: {0}")]
    Suffix(String),
}

/// A parsed quantity. Keeps the original text so round-trips are lossless.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    raw: String,
    value: f64,
}

impl Quantity {
    pub fn parse(raw: &str) -> Result<Self, QuantityError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(QuantityError::Empty);
        }

        let split = trimmed
            .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '+' || c == '-'))
            .unwrap_or(trimmed.len());
        let (number, suffix) = trimmed.split_at(split);

        let base: f64 = number
            .parse()
            .map_err(|_| QuantityError::Number(number.to_string()))?;

        Ok(Self {
            raw: trimmed.to_string(),
            value: base * multiplier(suffix)?,
        })
    }

    /// Approximate value in base units.
    pub fn as_f64(&self) -> f64 {
        self.value
    }

    /// Value in thousandths of a base unit (millicores for CPU).
    pub fn as_milli(&self) -> i64 {
        (self.value * 1000.0).round() as i64
    }
}

fn multiplier(suffix: &str) -> Result<f64, QuantityError> {
    let m = match suffix {
        "" => 1.0,
        "n" => 1e-9,
        "u" => 1e-6,
        "m" => 1e-3,
        "k" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        "P" => 1e15,
        "E" => 1e18,
        "Ki" => 1024.0,
        "Mi" => 1024f64.powi(2),
        "Gi" => 1024f64.powi(3),
        "Ti" => 1024f64.powi(4),
        "Pi" => 1024f64.powi(5),
        "Ei" => 1024f64.powi(6),
        s if s.starts_with(['e', 'E']) => {
            let exp: i32 = s[1..]
                .parse()
                .map_err(|_| QuantityError::Suffix(s.to_string()))?;
            10f64.powi(exp)
        }
        other => return Err(QuantityError::Suffix(other.to_string())),
    };
    Ok(m)
}

impl FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Quantity::parse(s)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Quantity::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(s: &str) -> f64 {
        Quantity::parse(s).unwrap().as_f64()
    }

    #[test]
    fn parses_millicores() {
        assert_eq!(Quantity::parse("500m").unwrap().as_milli(), 500);
        assert!((q("250m") - 0.25).abs() < 1e-12);
    }

    #[test]
    fn parses_binary_suffixes() {
        assert_eq!(q("1Gi"), 1_073_741_824.0);
        assert_eq!(q("128Mi"), 134_217_728.0);
        assert_eq!(q("1Ti"), 1_099_511_627_776.0);
    }

    #[test]
    fn parses_decimal_suffixes_and_exponents() {
        assert_eq!(q("128M"), 128_000_000.0);
        assert_eq!(q("2"), 2.0);
        assert_eq!(q("1.5"), 1.5);
        assert_eq!(q("1e3"), 1000.0);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(Quantity::parse(""), Err(QuantityError::Empty));
        assert!(matches!(Quantity::parse("12Qi"), Err(QuantityError::Suffix(_))));
        assert!(matches!(Quantity::parse("Gi"), Err(QuantityError::Number(_))));
    }

    #[test]
    fn serde_keeps_original_text() {
        let parsed: Quantity = serde_json::from_str("\"750m\"").unwrap();
        assert_eq!(parsed.to_string(), "750m");
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"750m\"");
    }
}
