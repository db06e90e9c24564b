//! Configuration for the batch scheduler.

use std::time::Duration;

/// Default delay after the latest query before an idle window flushes
pub const DEFAULT_DEBOUNCE_INTERVAL: Duration = Duration::from_millis(10);

/// Default ceiling on how long a window may keep accumulating queries
pub const DEFAULT_BATCH_MAX_INTERVAL: Duration = Duration::from_millis(50);

/// Default number of queued queries that allows an eager flush
pub const DEFAULT_BATCH_MAX_SIZE: usize = 100;

/// Configuration for the batch scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Maximum time a window may accumulate before the next query flushes it
    pub batch_max_interval: Duration,

    /// Queue length at which a query flushes eagerly, once the window is
    /// at least `debounce_interval` old
    pub batch_max_size: usize,

    /// Quiet period after the latest query before the timer flushes
    pub debounce_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            batch_max_interval: DEFAULT_BATCH_MAX_INTERVAL,
            batch_max_size: DEFAULT_BATCH_MAX_SIZE,
            debounce_interval: DEFAULT_DEBOUNCE_INTERVAL,
        }
    }
}

impl SchedulerConfig {
    /// Create config optimized for low latency (small, quick batches)
    pub fn low_latency() -> Self {
        Self {
            batch_max_interval: Duration::from_millis(20),
            batch_max_size: 16,
            debounce_interval: Duration::from_millis(2),
        }
    }

    /// Create config optimized for high throughput (fewer, larger batches)
    pub fn high_throughput() -> Self {
        Self {
            batch_max_interval: Duration::from_millis(250),
            batch_max_size: 1000,
            debounce_interval: Duration::from_millis(25),
        }
    }

    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("COALESCE_BATCH_MAX_INTERVAL_MS") {
            if let Ok(n) = val.parse() {
                config.batch_max_interval = Duration::from_millis(n);
            }
        }

        if let Ok(val) = std::env::var("COALESCE_BATCH_MAX_SIZE") {
            if let Ok(n) = val.parse() {
                config.batch_max_size = n;
            }
        }

        if let Ok(val) = std::env::var("COALESCE_DEBOUNCE_MS") {
            if let Ok(n) = val.parse() {
                config.debounce_interval = Duration::from_millis(n);
            }
        }

        config.normalized()
    }

    /// Apply optional overrides on top of this config
    pub fn with_options(mut self, options: SchedulerOptions) -> Self {
        if let Some(interval) = options.batch_max_interval {
            self.batch_max_interval = interval;
        }
        if let Some(size) = options.batch_max_size {
            self.batch_max_size = size;
        }
        if let Some(debounce) = options.debounce_interval {
            self.debounce_interval = debounce;
        }
        self.normalized()
    }

    /// A batch size of zero would flush on every query; treat it as one.
    pub(crate) fn normalized(mut self) -> Self {
        self.batch_max_size = self.batch_max_size.max(1);
        self
    }
}

/// Optional overrides; unset fields fall back to [`SchedulerConfig::default`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerOptions {
    pub batch_max_interval: Option<Duration>,
    pub batch_max_size: Option<usize>,
    pub debounce_interval: Option<Duration>,
}

impl From<SchedulerOptions> for SchedulerConfig {
    fn from(options: SchedulerOptions) -> Self {
        SchedulerConfig::default().with_options(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert_eq!(config.batch_max_interval, Duration::from_millis(50));
        assert_eq!(config.batch_max_size, 100);
        assert_eq!(config.debounce_interval, Duration::from_millis(10));
    }

    #[test]
    fn test_low_latency_config() {
        let config = SchedulerConfig::low_latency();
        assert!(config.debounce_interval < DEFAULT_DEBOUNCE_INTERVAL);
        assert_eq!(config.batch_max_size, 16);
    }

    #[test]
    fn test_high_throughput_config() {
        let config = SchedulerConfig::high_throughput();
        assert_eq!(config.batch_max_size, 1000);
        assert!(config.batch_max_interval > DEFAULT_BATCH_MAX_INTERVAL);
    }

    #[test]
    fn test_options_fall_back_to_defaults() {
        let config = SchedulerConfig::from(SchedulerOptions {
            batch_max_size: Some(3),
            ..Default::default()
        });
        assert_eq!(config.batch_max_size, 3);
        assert_eq!(config.batch_max_interval, DEFAULT_BATCH_MAX_INTERVAL);
        assert_eq!(config.debounce_interval, DEFAULT_DEBOUNCE_INTERVAL);
    }

    #[test]
    fn test_zero_batch_size_is_normalized() {
        let config = SchedulerConfig::from(SchedulerOptions {
            batch_max_size: Some(0),
            ..Default::default()
        });
        assert_eq!(config.batch_max_size, 1);
    }
}
