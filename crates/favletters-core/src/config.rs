//! Engine tuning.

use std::time::Duration;

/// Default period of the heartbeat and eviction ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(1_000);

/// Default silence after which a peer is evicted (3x the tick).
pub const DEFAULT_STALE_THRESHOLD: Duration = Duration::from_millis(3_000);

/// Storage key under which the shared text is persisted.
pub const DEFAULT_STORAGE_KEY: &str = "favletters_text";

/// Text used when storage holds nothing.
pub const DEFAULT_TEXT: &str = "FAV";

/// Configuration for an [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Period of the maintenance tick (heartbeat + eviction).
    pub tick_interval: Duration,

    /// A peer whose last heartbeat is strictly older than this is evicted.
    pub stale_threshold: Duration,

    /// Key used for the durable text value.
    pub storage_key: String,

    /// Text used when storage is empty or unavailable.
    pub default_text: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            stale_threshold: DEFAULT_STALE_THRESHOLD,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            default_text: DEFAULT_TEXT.to_string(),
        }
    }
}

impl EngineConfig {
    /// Set the tick interval.
    #[must_use]
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set the stale threshold.
    #[must_use]
    pub fn with_stale_threshold(mut self, threshold: Duration) -> Self {
        self.stale_threshold = threshold;
        self
    }

    /// Set the text used when nothing is stored.
    #[must_use]
    pub fn with_default_text(mut self, text: impl Into<String>) -> Self {
        self.default_text = text.into();
        self
    }

    /// Set the storage key.
    #[must_use]
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Stale threshold in milliseconds, as compared against peer timestamps.
    pub fn stale_threshold_millis(&self) -> u64 {
        self.stale_threshold.as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_constants() {
        let config = EngineConfig::default();
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert_eq!(config.stale_threshold_millis(), 3_000);
        assert_eq!(config.storage_key, "favletters_text");
        assert_eq!(config.default_text, "FAV");
    }

    #[test]
    fn builders_override_fields() {
        let config = EngineConfig::default()
            .with_tick_interval(Duration::from_millis(20))
            .with_stale_threshold(Duration::from_millis(60))
            .with_default_text("")
            .with_storage_key("other");

        assert_eq!(config.tick_interval, Duration::from_millis(20));
        assert_eq!(config.stale_threshold_millis(), 60);
        assert!(config.default_text.is_empty());
        assert_eq!(config.storage_key, "other");
    }
}
