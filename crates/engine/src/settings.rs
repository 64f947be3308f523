//! Timing and capacity knobs for one engine instance.

use deliberate_config::AppConfig;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Sleep after every deliberation cycle.
    pub idle_delay: Duration,
    /// Action budget for productions without their own timeout.
    pub default_timeout: Duration,
    /// Pause between reflex poll passes. Zero means yield only.
    pub poll_interval: Duration,
    pub event_capacity: usize,
}

impl EngineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            idle_delay: Duration::from_millis(config.deliberation.idle_delay_ms),
            default_timeout: Duration::from_millis(config.deliberation.default_timeout_ms),
            poll_interval: Duration::from_millis(config.reactive.poll_interval_ms),
            event_capacity: config.events.capacity,
        }
    }

    pub fn with_idle_delay(mut self, delay: Duration) -> Self {
        self.idle_delay = delay;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_config_defaults() {
        let s = EngineSettings::default();
        assert_eq!(s.idle_delay, Duration::from_secs(1));
        assert_eq!(s.default_timeout, Duration::from_secs(10));
        assert_eq!(s.poll_interval, Duration::from_millis(10));
        assert_eq!(s.event_capacity, 256);
    }

    #[test]
    fn from_config_overrides() {
        let mut config = AppConfig::default();
        config.deliberation.idle_delay_ms = 0;
        config.reactive.poll_interval_ms = 0;
        let s = EngineSettings::from_config(&config);
        assert!(s.idle_delay.is_zero());
        assert!(s.poll_interval.is_zero());
    }
}
