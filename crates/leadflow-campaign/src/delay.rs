//! Inter-send delay policy.

use leadflow_core::config::CampaignConfig;
use rand::Rng;
use std::time::Duration;

/// Uniform random window, both ends inclusive, in whole milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayPolicy {
    min_ms: u64,
    max_ms: u64,
}

impl DelayPolicy {
    /// Bounds are reordered if given backwards.
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self {
            min_ms: min_ms.min(max_ms),
            max_ms: min_ms.max(max_ms),
        }
    }

    /// Always the same delay.
    pub fn fixed(delay: Duration) -> Self {
        let ms = delay.as_millis() as u64;
        Self { min_ms: ms, max_ms: ms }
    }

    pub fn from_config(config: &CampaignConfig) -> Self {
        Self::new(config.min_delay_ms, config.max_delay_ms)
    }

    pub fn min(&self) -> Duration {
        Duration::from_millis(self.min_ms)
    }

    pub fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }

    pub fn draw(&self) -> Duration {
        let ms = rand::thread_rng().gen_range(self.min_ms..=self.max_ms);
        Duration::from_millis(ms)
    }
}

impl Default for DelayPolicy {
    fn default() -> Self {
        Self::from_config(&CampaignConfig::default())
    }
}
