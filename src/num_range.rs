use std::ops::{RangeFrom, RangeFull, RangeInclusive, RangeToInclusive};

use crate::error::Error;

/// An inclusive range over chapter or volume numbers.
///
/// Chapter numbers on mangadex are free-form strings such as `"4.5"`, so the
/// bounds are floats. Open ends are stored as infinities.
#[derive(PartialEq, Clone, Copy)]
pub struct NumRange {
    low: f64,
    high: f64,
}

impl NumRange {
    /// Builds `[low, high]`, rejecting NaN bounds and inverted ranges.
    pub fn new(low: f64, high: f64) -> Result<Self, Error> {
        if low.is_nan() || high.is_nan() {
            return Err(Error::Validation("Range bound is not a number".into()));
        }
        if low > high {
            return Err(Error::Validation(format!(
                "Range start {} is greater than its end {}",
                low, high
            )));
        }
        Ok(Self { low, high })
    }

    /// Checks to see if the given value is within the range, both ends included.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value <= self.high
    }

    /// Parses `value` as a number and checks it against the range. Values that
    /// do not parse are never contained.
    pub fn contains_str(&self, value: &str) -> bool {
        value
            .trim()
            .parse::<f64>()
            .map_or(false, |value| self.contains(value))
    }
}

impl Default for NumRange {
    fn default() -> Self {
        Self {
            low: f64::NEG_INFINITY,
            high: f64::INFINITY,
        }
    }
}

impl std::fmt::Debug for NumRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}..={}",
            if self.low.is_finite() {
                self.low.to_string()
            } else {
                "".to_string()
            },
            if self.high.is_finite() {
                self.high.to_string()
            } else {
                "".to_string()
            },
        )
    }
}

fn parse_bound(s: &str, what: &str) -> Result<Option<f64>, Error> {
    if s.is_empty() {
        return Ok(None);
    }
    match s.parse::<f64>() {
        Ok(value) if !value.is_nan() => Ok(Some(value)),
        _ => Err(Error::Validation(format!("Invalid {} value {:?}", what, s))),
    }
}

impl std::str::FromStr for NumRange {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let Some((start, end)) = s.split_once("..") else {
            // Unit
            let value = parse_bound(s, "start")?
                .ok_or_else(|| Error::Validation("Invalid range syntax".into()))?;
            return NumRange::new(value, value);
        };

        // Both `a..b` and `a..=b` include their end.
        let end = end.strip_prefix('=').unwrap_or(end);
        let low = parse_bound(start, "start")?.unwrap_or(f64::NEG_INFINITY);
        let high = parse_bound(end, "end")?.unwrap_or(f64::INFINITY);
        NumRange::new(low, high)
    }
}

impl TryFrom<RangeInclusive<f64>> for NumRange {
    type Error = Error;

    fn try_from(value: RangeInclusive<f64>) -> Result<Self, Self::Error> {
        NumRange::new(*value.start(), *value.end())
    }
}

impl TryFrom<RangeFrom<f64>> for NumRange {
    type Error = Error;

    fn try_from(value: RangeFrom<f64>) -> Result<Self, Self::Error> {
        NumRange::new(value.start, f64::INFINITY)
    }
}

impl TryFrom<RangeToInclusive<f64>> for NumRange {
    type Error = Error;

    fn try_from(value: RangeToInclusive<f64>) -> Result<Self, Self::Error> {
        NumRange::new(f64::NEG_INFINITY, value.end)
    }
}

impl TryFrom<[f64; 2]> for NumRange {
    type Error = Error;

    fn try_from([low, high]: [f64; 2]) -> Result<Self, Self::Error> {
        NumRange::new(low, high)
    }
}

impl From<RangeFull> for NumRange {
    fn from(_value: RangeFull) -> Self {
        Self::default()
    }
}
