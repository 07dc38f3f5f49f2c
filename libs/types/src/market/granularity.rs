//! Granularity labels

use crate::common::errors::{Result, TypesError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque label naming a candle bucket size (`"30m"`, `"4h"`, `"1d"`, ...).
///
/// Labels are an open set. Nothing here orders them by bucket duration;
/// venue-specific mappings live in the adapters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Granularity(String);

impl Granularity {
    pub fn new(label: impl Into<String>) -> Result<Self> {
        let label = label.into();
        let trimmed = label.trim();
        if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
            return Err(TypesError::InvalidGranularity { label });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse a comma separated list such as `"1h, 4h,1d"`
    pub fn parse_list(input: &str) -> Result<Vec<Self>> {
        input
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(Self::new)
            .collect()
    }
}

impl FromStr for Granularity {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Granularity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_label() {
        let tf: Granularity = " 4h ".parse().unwrap();
        assert_eq!(tf.as_str(), "4h");
        assert_eq!(tf.to_string(), "4h");
    }

    #[test]
    fn test_reject_blank_label() {
        assert!(matches!(
            Granularity::new("  "),
            Err(TypesError::InvalidGranularity { .. })
        ));
        assert!(Granularity::new("4 h").is_err());
    }

    #[test]
    fn test_parse_list() {
        let list = Granularity::parse_list("1h, 4h,,1d").unwrap();
        let labels: Vec<&str> = list.iter().map(Granularity::as_str).collect();
        assert_eq!(labels, vec!["1h", "4h", "1d"]);
    }

    #[test]
    fn test_serde_transparent() {
        let tf = Granularity::new("30m").unwrap();
        assert_eq!(serde_json::to_string(&tf).unwrap(), "\"30m\"");
    }
}
