//! Serde adapters for `std::time::Duration` written as humantime strings
//! (`"60s"`, `"1m 30s"`, `"250ms"`).
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use std::time::Duration;
//!
//! #[derive(Serialize, Deserialize)]
//! struct Timeouts {
//!     #[serde(with = "farmwfs_utils::humantime_serde")]
//!     request: Duration,
//! }
//! ```

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer, de};

/// Parses a humantime string into a `Duration`.
///
/// # Errors
/// Fails when the input is not a string or not a valid humantime duration.
pub fn deserialize<'de, D>(d: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(d)?;
    humantime::parse_duration(&raw)
        .map_err(|e| de::Error::custom(format!("invalid duration '{raw}': {e}")))
}

/// Formats a `Duration` as a humantime string.
///
/// # Errors
/// Propagates serializer errors.
#[allow(clippy::trivially_copy_pass_by_ref)]
pub fn serialize<S>(d: &Duration, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.collect_str(&humantime::format_duration(*d))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Serialize, Deserialize)]
    struct Holder {
        #[serde(with = "super")]
        ttl: Duration,
    }

    #[test]
    fn parses_compound_durations() {
        let h: Holder = serde_json::from_str(r#"{"ttl": "1m 30s"}"#).unwrap();
        assert_eq!(h.ttl, Duration::from_secs(90));
    }

    #[test]
    fn writes_compact_form() {
        let h = Holder {
            ttl: Duration::from_secs(60),
        };
        assert_eq!(serde_json::to_string(&h).unwrap(), r#"{"ttl":"1m"}"#);
    }

    #[test]
    fn rejects_garbage() {
        let err = serde_json::from_str::<Holder>(r#"{"ttl": "soon"}"#)
            .err()
            .unwrap();
        assert!(err.to_string().contains("invalid duration 'soon'"));
    }
}
