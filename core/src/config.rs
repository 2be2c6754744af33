// Polling configuration
use crate::{CommsError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// What a bounded polling buffer does when a message arrives while full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest buffered message to admit the new one
    #[default]
    DropOldest,
    /// Discard the incoming message, keeping what is already buffered
    DropNewest,
}

impl FromStr for OverflowPolicy {
    type Err = CommsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop_oldest" | "drop-oldest" | "oldest" => Ok(OverflowPolicy::DropOldest),
            "drop_newest" | "drop-newest" | "newest" => Ok(OverflowPolicy::DropNewest),
            other => Err(CommsError::Config(format!(
                "unknown overflow policy: {}",
                other
            ))),
        }
    }
}

/// Configuration for a [`ThreadedReceiver`](crate::ThreadedReceiver)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Wait between two polls of the wrapped receiver.
    ///
    /// Written as `poll_interval_ms` in TOML; fractional values are allowed.
    #[serde(rename = "poll_interval_ms", with = "interval_ms")]
    pub poll_interval: Duration,
    /// Maximum number of buffered messages; `None` means unbounded
    pub capacity: Option<usize>,
    /// Behaviour of a full bounded buffer
    pub overflow: OverflowPolicy,
    /// Name of the background thread; defaults to `poll-<address>`
    pub thread_name: Option<String>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            capacity: None,
            overflow: OverflowPolicy::default(),
            thread_name: None,
        }
    }
}

impl PollingConfig {
    /// Defaults overridden by `COMMS_POLL_INTERVAL_MS`, `COMMS_POLL_CAPACITY`
    /// and `COMMS_POLL_OVERFLOW`. Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(raw) = lookup("COMMS_POLL_INTERVAL_MS") {
            match parse_interval_ms(&raw) {
                Some(interval) => config.poll_interval = interval,
                None => warn_ignored("COMMS_POLL_INTERVAL_MS", &raw),
            }
        }
        if let Some(raw) = lookup("COMMS_POLL_CAPACITY") {
            match raw.trim().parse::<usize>() {
                Ok(capacity) => config.capacity = Some(capacity),
                Err(_) => warn_ignored("COMMS_POLL_CAPACITY", &raw),
            }
        }
        if let Some(raw) = lookup("COMMS_POLL_OVERFLOW") {
            match raw.parse::<OverflowPolicy>() {
                Ok(overflow) => config.overflow = overflow,
                Err(_) => warn_ignored("COMMS_POLL_OVERFLOW", &raw),
            }
        }
        config
    }

    /// Parse a TOML table, overlaying present keys onto the defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: PollingConfig =
            toml::from_str(s).map_err(|e| CommsError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn unbounded(mut self) -> Self {
        self.capacity = None;
        self
    }

    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = Some(name.into());
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(CommsError::Config(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if self.capacity == Some(0) {
            return Err(CommsError::Config(
                "capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_interval_ms(raw: &str) -> Option<Duration> {
    millis_f64(raw.trim().parse::<f64>().ok()?)
}

/// Milliseconds to a `Duration`, rounded to the nearest nanosecond.
fn millis_f64(ms: f64) -> Option<Duration> {
    let nanos = (ms * 1_000_000.0).round();
    if !nanos.is_finite() || nanos < 0.0 || nanos >= u64::MAX as f64 {
        return None;
    }
    Some(Duration::from_nanos(nanos as u64))
}

fn warn_ignored(key: &str, raw: &str) {
    warn!(target: "polling_config", key, value = %raw, "Ignoring unparseable environment value");
}

/// `Duration` as a (possibly fractional) number of milliseconds
mod interval_ms {
    use serde::de::{self, Visitor};
    use std::fmt;
    use std::time::Duration;

    use super::{millis_f64, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(interval: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let nanos = interval.subsec_nanos();
        if nanos % 1_000_000 == 0 {
            serializer.serialize_u64(interval.as_millis() as u64)
        } else {
            serializer.serialize_f64(interval.as_secs_f64() * 1000.0)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        deserializer.deserialize_any(MillisVisitor)
    }

    struct MillisVisitor;

    impl<'de> Visitor<'de> for MillisVisitor {
        type Value = Duration;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a non-negative number of milliseconds")
        }

        fn visit_u64<E: de::Error>(self, ms: u64) -> Result<Duration, E> {
            Ok(Duration::from_millis(ms))
        }

        fn visit_i64<E: de::Error>(self, ms: i64) -> Result<Duration, E> {
            u64::try_from(ms)
                .map(Duration::from_millis)
                .map_err(|_| E::custom("poll interval must not be negative"))
        }

        fn visit_f64<E: de::Error>(self, ms: f64) -> Result<Duration, E> {
            millis_f64(ms).ok_or_else(|| E::custom("poll interval must be a non-negative number"))
        }
    }
}
