//! Output time units

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unit a definition reports its per-operation latency in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeUnit {
    /// Nanoseconds
    #[default]
    #[serde(rename = "ns")]
    Nanoseconds,
    /// Microseconds
    #[serde(rename = "us")]
    Microseconds,
    /// Milliseconds
    #[serde(rename = "ms")]
    Milliseconds,
    /// Seconds
    #[serde(rename = "s")]
    Seconds,
}

impl TimeUnit {
    /// Nanoseconds in one of this unit
    pub fn nanos_per_unit(self) -> f64 {
        match self {
            TimeUnit::Nanoseconds => 1.0,
            TimeUnit::Microseconds => 1_000.0,
            TimeUnit::Milliseconds => 1_000_000.0,
            TimeUnit::Seconds => 1_000_000_000.0,
        }
    }

    /// Convert a nanosecond value into this unit
    #[inline]
    pub fn from_nanos(self, nanos: f64) -> f64 {
        nanos / self.nanos_per_unit()
    }

    /// Short symbol, e.g. `ns`
    pub fn symbol(self) -> &'static str {
        match self {
            TimeUnit::Nanoseconds => "ns",
            TimeUnit::Microseconds => "us",
            TimeUnit::Milliseconds => "ms",
            TimeUnit::Seconds => "s",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for TimeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ns" | "nanos" | "nanoseconds" => Ok(TimeUnit::Nanoseconds),
            "us" | "µs" | "micros" | "microseconds" => Ok(TimeUnit::Microseconds),
            "ms" | "millis" | "milliseconds" => Ok(TimeUnit::Milliseconds),
            "s" | "sec" | "seconds" => Ok(TimeUnit::Seconds),
            other => Err(format!("unknown time unit: {other} (expected ns, us, ms or s)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion() {
        assert!((TimeUnit::Microseconds.from_nanos(2_500.0) - 2.5).abs() < 1e-12);
        assert!((TimeUnit::Seconds.from_nanos(1e9) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_parse() {
        assert_eq!("ns".parse::<TimeUnit>().unwrap(), TimeUnit::Nanoseconds);
        assert_eq!("Millis".parse::<TimeUnit>().unwrap(), TimeUnit::Milliseconds);
        assert!("fortnights".parse::<TimeUnit>().is_err());
    }

    #[test]
    fn test_serde_symbol() {
        let json = serde_json::to_string(&TimeUnit::Microseconds).unwrap();
        assert_eq!(json, "\"us\"");
    }
}
