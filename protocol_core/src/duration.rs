//! Duration normalization.
//!
//! Prescribed and performed durations are authored in seconds, minutes, or
//! hours. Everything that adds durations together goes through [`to_seconds`]
//! so there is exactly one computation base, and everything that displays a
//! total goes through [`format_clock`].

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unit tag of a [`DurationValue`]
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DurationUnit {
    #[serde(rename = "s")]
    Seconds,
    #[serde(rename = "min")]
    Minutes,
    #[serde(rename = "hr")]
    Hours,
}

impl DurationUnit {
    /// Wire tag for this unit
    pub fn as_str(self) -> &'static str {
        match self {
            DurationUnit::Seconds => "s",
            DurationUnit::Minutes => "min",
            DurationUnit::Hours => "hr",
        }
    }

    fn seconds_per_unit(self) -> f64 {
        match self {
            DurationUnit::Seconds => 1.0,
            DurationUnit::Minutes => 60.0,
            DurationUnit::Hours => 3600.0,
        }
    }
}

impl FromStr for DurationUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "s" => Ok(DurationUnit::Seconds),
            "min" => Ok(DurationUnit::Minutes),
            "hr" => Ok(DurationUnit::Hours),
            other => Err(Error::InvalidUnit(other.to_string())),
        }
    }
}

impl fmt::Display for DurationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-negative magnitude tagged with a unit.
///
/// Immutable once built. Editing a duration means replacing the whole value.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "RawDuration")]
pub struct DurationValue {
    value: f64,
    unit: DurationUnit,
}

/// Unchecked wire form, validated on the way in
#[derive(Deserialize)]
struct RawDuration {
    value: f64,
    unit: String,
}

impl TryFrom<RawDuration> for DurationValue {
    type Error = Error;

    fn try_from(raw: RawDuration) -> Result<Self> {
        let unit = raw.unit.parse()?;
        DurationValue::new(raw.value, unit)
    }
}

impl DurationValue {
    /// Build a duration, rejecting negative or non-finite magnitudes
    pub fn new(value: f64, unit: DurationUnit) -> Result<Self> {
        if !value.is_finite() || value < 0.0 {
            return Err(Error::Validation(format!(
                "duration magnitude must be a non-negative number, got {}",
                value
            )));
        }
        Ok(Self { value, unit })
    }

    pub fn seconds(value: f64) -> Result<Self> {
        Self::new(value, DurationUnit::Seconds)
    }

    pub fn minutes(value: f64) -> Result<Self> {
        Self::new(value, DurationUnit::Minutes)
    }

    pub fn hours(value: f64) -> Result<Self> {
        Self::new(value, DurationUnit::Hours)
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> DurationUnit {
        self.unit
    }

    /// Magnitude in seconds
    pub fn as_seconds(&self) -> f64 {
        self.value * self.unit.seconds_per_unit()
    }
}

impl fmt::Display for DurationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit)
    }
}

/// Parses the compact form used on the command line: `90s`, `2min`, `1.5hr`.
impl FromStr for DurationValue {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let split = s
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(s.len());
        let (magnitude, unit) = s.split_at(split);

        if magnitude.is_empty() {
            return Err(Error::Validation(format!(
                "duration {:?} has no magnitude",
                s
            )));
        }
        let value: f64 = magnitude
            .parse()
            .map_err(|_| Error::Validation(format!("invalid duration magnitude {:?}", magnitude)))?;

        DurationValue::new(value, unit.trim().parse()?)
    }
}

/// Convert an optional duration to seconds.
///
/// An absent duration means "not specified" and counts as zero.
pub fn to_seconds(duration: Option<&DurationValue>) -> f64 {
    duration.map_or(0.0, DurationValue::as_seconds)
}

/// Strict conversion of an untyped magnitude/unit pair.
///
/// Unknown unit tags surface as [`Error::InvalidUnit`] so the caller decides
/// whether to degrade.
pub fn try_to_seconds(value: f64, unit: &str) -> Result<f64> {
    let unit: DurationUnit = unit.parse()?;
    Ok(DurationValue::new(value, unit)?.as_seconds())
}

/// Tolerant conversion for display paths: unknown unit tags count as zero.
pub fn to_seconds_or_zero(value: f64, unit: &str) -> f64 {
    match unit.parse::<DurationUnit>() {
        Ok(unit) => value * unit.seconds_per_unit(),
        Err(e) => {
            tracing::warn!("{}; treating duration as 0s", e);
            0.0
        }
    }
}

/// Render seconds as `MM:SS`.
///
/// Negative input clamps to zero and fractions are truncated. Minutes never
/// roll over into hours: 5400 seconds renders as `90:00`.
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.trunc() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Deserializer for nullable duration fields that must still be present.
///
/// `null` means "not applicable"; a missing key is rejected instead of being
/// read as `null`.
pub(crate) fn required_nullable<'de, D>(deserializer: D) -> std::result::Result<Option<DurationValue>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<DurationValue>::deserialize(deserializer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_seconds_by_unit() {
        assert_eq!(to_seconds(Some(&DurationValue::seconds(0.0).unwrap())), 0.0);
        assert_eq!(to_seconds(None), 0.0);
        assert_eq!(to_seconds(Some(&DurationValue::minutes(2.0).unwrap())), 120.0);
        assert_eq!(to_seconds(Some(&DurationValue::hours(1.0).unwrap())), 3600.0);
    }

    #[test]
    fn test_fractional_units() {
        assert_eq!(DurationValue::minutes(1.5).unwrap().as_seconds(), 90.0);
        assert_eq!(DurationValue::hours(0.25).unwrap().as_seconds(), 900.0);
    }

    #[test]
    fn test_negative_magnitude_rejected() {
        assert!(matches!(
            DurationValue::seconds(-1.0),
            Err(Error::Validation(_))
        ));
        assert!(DurationValue::minutes(f64::NAN).is_err());
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(125.0), "02:05");
        assert_eq!(format_clock(-5.0), "00:00");
        assert_eq!(format_clock(5400.0), "90:00");
        assert_eq!(format_clock(59.9), "00:59");
        assert_eq!(format_clock(0.0), "00:00");
    }

    #[test]
    fn test_strict_conversion_reports_unknown_unit() {
        assert_eq!(try_to_seconds(3.0, "min").unwrap(), 180.0);
        match try_to_seconds(3.0, "days") {
            Err(Error::InvalidUnit(unit)) => assert_eq!(unit, "days"),
            other => panic!("expected InvalidUnit, got {:?}", other),
        }
    }

    #[test]
    fn test_tolerant_conversion_degrades_to_zero() {
        assert_eq!(to_seconds_or_zero(2.0, "hr"), 7200.0);
        assert_eq!(to_seconds_or_zero(2.0, "weeks"), 0.0);
    }

    #[test]
    fn test_wire_format() {
        let d = DurationValue::minutes(2.0).unwrap();
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, r#"{"value":2.0,"unit":"min"}"#);

        let parsed: DurationValue = serde_json::from_str(r#"{"value":30,"unit":"s"}"#).unwrap();
        assert_eq!(parsed.as_seconds(), 30.0);
    }

    #[test]
    fn test_wire_rejects_bad_values() {
        let bad_unit = serde_json::from_str::<DurationValue>(r#"{"value":1,"unit":"days"}"#);
        assert!(bad_unit.unwrap_err().to_string().contains("days"));

        let negative = serde_json::from_str::<DurationValue>(r#"{"value":-3,"unit":"s"}"#);
        assert!(negative.is_err());
    }

    #[test]
    fn test_parse_compact_form() {
        assert_eq!("90s".parse::<DurationValue>().unwrap().as_seconds(), 90.0);
        assert_eq!("2min".parse::<DurationValue>().unwrap().as_seconds(), 120.0);
        assert_eq!(" 1.5hr ".parse::<DurationValue>().unwrap().as_seconds(), 5400.0);
        assert!(matches!(
            "45".parse::<DurationValue>(),
            Err(Error::InvalidUnit(_))
        ));
        assert!(matches!(
            "min".parse::<DurationValue>(),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(DurationValue::seconds(90.0).unwrap().to_string(), "90s");
        assert_eq!(DurationValue::minutes(1.5).unwrap().to_string(), "1.5min");
    }
}
