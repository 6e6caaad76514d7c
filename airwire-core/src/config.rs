//! Sampling pipeline configuration

use crate::baseline::{EARLY_PHASE_TICKS, REFRESH_TICKS};

/// Largest supported moving-average window
pub const MAX_WINDOW: usize = 32;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Sampling period is zero
    ZeroPeriod,
    /// Window is zero or above [`MAX_WINDOW`]
    InvalidWindow,
    /// Stored baseline of zero cannot be restored
    ZeroBaseline,
}

/// Sampling, transform and baseline settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SamplingConfig {
    /// Measurement period in milliseconds (the IAQ algorithm expects 1000)
    pub period_ms: u32,
    /// Samples per moving-average window
    pub window: usize,
    /// How long the transform waits for a sample before giving up
    pub sample_wait_ms: u32,
    /// Ticks before the first baseline read of a fresh sensor
    pub baseline_early_ticks: u32,
    /// Ticks between baseline reads afterwards
    pub baseline_refresh_ticks: u32,
    /// Baseline to restore at start-up
    pub initial_baseline: Option<u32>,
    /// Feed absolute humidity to the air quality sensor
    pub humidity_compensation: bool,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            period_ms: 1000,
            window: 10,
            sample_wait_ms: 2000,
            baseline_early_ticks: EARLY_PHASE_TICKS,
            baseline_refresh_ticks: REFRESH_TICKS,
            initial_baseline: None,
            humidity_compensation: true,
        }
    }
}

impl SamplingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period_ms == 0 {
            return Err(ConfigError::ZeroPeriod);
        }
        if self.window == 0 || self.window > MAX_WINDOW {
            return Err(ConfigError::InvalidWindow);
        }
        if self.initial_baseline == Some(0) {
            return Err(ConfigError::ZeroBaseline);
        }
        Ok(())
    }
}
