//! Duration fields as `"500ms"`, `"10s"` or `"2m"` strings.

use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let millis = duration.as_millis();
    if millis % 1000 == 0 {
        serializer.serialize_str(&format!("{}s", millis / 1000))
    } else {
        serializer.serialize_str(&format!("{}ms", millis))
    }
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(serde::de::Error::custom)
}

/// Parses a duration string with an `ms`, `s` or `m` suffix.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    // Check for "ms" BEFORE "s" since "ms" ends with 's'
    if let Some(num_str) = s.strip_suffix("ms") {
        let millis: u64 = num_str.trim().parse().map_err(|_| format!("Invalid duration: {}", s))?;
        Ok(Duration::from_millis(millis))
    } else if let Some(num_str) = s.strip_suffix('s') {
        let secs: u64 = num_str.trim().parse().map_err(|_| format!("Invalid duration: {}", s))?;
        Ok(Duration::from_secs(secs))
    } else if let Some(num_str) = s.strip_suffix('m') {
        let mins: u64 = num_str.trim().parse().map_err(|_| format!("Invalid duration: {}", s))?;
        Ok(Duration::from_secs(mins * 60))
    } else {
        Err(format!("Duration must end with 's', 'ms', or 'm': {}", s))
    }
}
