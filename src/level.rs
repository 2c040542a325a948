//! Severity levels understood by the MQTT handler.
//!
//! Levels are ordered by their ordinal. [`FemtoLevel::Log`] is the lowest
//! ordinary severity; anything below it is a reserved diagnostic class that
//! is always forwarded regardless of the enabled tags.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use thiserror::Error;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum FemtoLevel {
    /// Always-emit diagnostics. Never subject to tag filtering.
    Diagnostic = 0,
    Log = 1,
    #[default]
    Info = 2,
    Warn = 3,
    Error = 4,
}

/// Returned when a string does not name a known level.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown log level: {0}")]
pub struct ParseLevelError(pub String);

impl FemtoLevel {
    /// Lowest severity that is subject to the tag allow-list.
    pub const FILTER_THRESHOLD: FemtoLevel = FemtoLevel::Log;

    pub fn as_str(self) -> &'static str {
        match self {
            FemtoLevel::Diagnostic => "DIAGNOSTIC",
            FemtoLevel::Log => "LOG",
            FemtoLevel::Info => "INFO",
            FemtoLevel::Warn => "WARN",
            FemtoLevel::Error => "ERROR",
        }
    }

    /// Numeric ordinal used on the wire.
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Whether records at this level must pass the tag filter.
    pub fn is_filtered(self) -> bool {
        self >= Self::FILTER_THRESHOLD
    }
}

impl fmt::Display for FemtoLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FemtoLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DIAGNOSTIC" | "ALWAYS" => Ok(Self::Diagnostic),
            "LOG" => Ok(Self::Log),
            "INFO" => Ok(Self::Info),
            "WARN" | "WARNING" => Ok(Self::Warn),
            "ERROR" => Ok(Self::Error),
            _ => Err(ParseLevelError(s.to_owned())),
        }
    }
}

impl Serialize for FemtoLevel {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.ordinal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn default_level_is_info() {
        assert_eq!(FemtoLevel::default(), FemtoLevel::Info);
    }

    #[rstest]
    #[case("diagnostic", FemtoLevel::Diagnostic)]
    #[case("ALWAYS", FemtoLevel::Diagnostic)]
    #[case("log", FemtoLevel::Log)]
    #[case("Info", FemtoLevel::Info)]
    #[case("warning", FemtoLevel::Warn)]
    #[case(" ERROR ", FemtoLevel::Error)]
    fn parses_level_names(#[case] input: &str, #[case] expected: FemtoLevel) {
        assert_eq!(input.parse::<FemtoLevel>(), Ok(expected));
    }

    #[test]
    fn rejects_unknown_level() {
        let err = "verbose".parse::<FemtoLevel>().unwrap_err();
        assert_eq!(err, ParseLevelError("verbose".into()));
    }

    #[test]
    fn only_diagnostic_bypasses_filter() {
        assert!(!FemtoLevel::Diagnostic.is_filtered());
        for level in [
            FemtoLevel::Log,
            FemtoLevel::Info,
            FemtoLevel::Warn,
            FemtoLevel::Error,
        ] {
            assert!(level.is_filtered(), "{level} should be filtered");
        }
    }

    #[test]
    fn serialises_as_ordinal() {
        let json = serde_json::to_string(&FemtoLevel::Warn).unwrap();
        assert_eq!(json, "3");
    }
}
