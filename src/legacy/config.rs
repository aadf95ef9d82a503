use serde::Deserialize;
use std::time::Duration;

/// Name of the database created by earlier releases.
pub const LEGACY_DATABASE_NAME: &str = "signal";

/// How long the probe waits for the host engine before assuming no legacy data.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Legacy probe settings. Every field is optional when deserialized.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub database_name: String,
    #[serde(rename = "timeout_ms", deserialize_with = "millis")]
    pub timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            database_name: LEGACY_DATABASE_NAME.to_string(),
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

fn millis<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}
