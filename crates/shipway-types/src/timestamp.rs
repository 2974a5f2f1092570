//! Deployment timestamps
//!
//! History entries are keyed by timestamp and rotation evicts the smallest
//! key by string comparison, so the string form must sort the same way the
//! numbers do. `DeployTimestamp` therefore always renders as fixed-width
//! zero-padded epoch seconds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Second-resolution deployment timestamp with a fixed-width string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeployTimestamp(i64);

impl DeployTimestamp {
    /// Current wall-clock time.
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp())
    }

    pub fn from_epoch(secs: i64) -> Self {
        Self(secs)
    }

    pub fn epoch(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for DeployTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 10 digits covers epoch seconds until the year 2286
        write!(f, "{:010}", self.0)
    }
}

impl FromStr for DeployTimestamp {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_width_rendering() {
        assert_eq!(DeployTimestamp::from_epoch(42).to_string(), "0000000042");
        assert_eq!(
            DeployTimestamp::from_epoch(1467100000).to_string(),
            "1467100000"
        );
    }

    #[test]
    fn string_order_matches_numeric_order() {
        let older = DeployTimestamp::from_epoch(999_999_999);
        let newer = DeployTimestamp::from_epoch(1_000_000_000);

        assert!(older < newer);
        assert!(older.to_string() < newer.to_string());
    }

    #[test]
    fn round_trips_through_string() {
        let ts = DeployTimestamp::from_epoch(1467100000);
        let parsed: DeployTimestamp = ts.to_string().parse().unwrap();

        assert_eq!(parsed, ts);
    }
}
