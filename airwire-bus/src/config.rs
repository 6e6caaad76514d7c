//! Bus configuration
//!
//! A [`BusConfig`] identifies one logical software I2C bus: its two pins,
//! the bit timing, and a diagnostic name. Degenerate timing is rejected here
//! so the engine never divides by zero or spins forever.

use airwire_hal::PinId;
use heapless::String;

use crate::retry::Retry;

/// Maximum length of a bus name
pub const MAX_NAME_LEN: usize = 32;

/// Default total clock-stretch tolerance
pub const DEFAULT_STRETCH_TIMEOUT_MS: u32 = 150;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Clock period is zero
    ZeroClockPeriod,
    /// Half period is zero (period below 2 ms)
    ZeroHalfPeriod,
    /// SCL and SDA are the same pin
    SamePin,
    /// Name longer than [`MAX_NAME_LEN`]
    NameTooLong,
}

/// Validated bus configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    name: String<MAX_NAME_LEN>,
    scl: PinId,
    sda: PinId,
    clock_period_ms: u32,
    half_period_ms: u32,
    stretch_timeout_ms: u32,
}

impl BusConfig {
    /// Create a bus configuration with `half_period = clock_period / 2`
    pub fn new(
        name: &str,
        scl: PinId,
        sda: PinId,
        clock_period_ms: u32,
    ) -> Result<Self, ConfigError> {
        if clock_period_ms == 0 {
            return Err(ConfigError::ZeroClockPeriod);
        }
        Self::with_half_period(name, scl, sda, clock_period_ms, clock_period_ms / 2)
    }

    /// Create a bus configuration with an explicit half period
    pub fn with_half_period(
        name: &str,
        scl: PinId,
        sda: PinId,
        clock_period_ms: u32,
        half_period_ms: u32,
    ) -> Result<Self, ConfigError> {
        if clock_period_ms == 0 {
            return Err(ConfigError::ZeroClockPeriod);
        }
        if half_period_ms == 0 {
            return Err(ConfigError::ZeroHalfPeriod);
        }
        if scl == sda {
            return Err(ConfigError::SamePin);
        }

        let mut label = String::new();
        label
            .push_str(name)
            .map_err(|_| ConfigError::NameTooLong)?;

        Ok(Self {
            name: label,
            scl,
            sda,
            clock_period_ms,
            half_period_ms,
            stretch_timeout_ms: DEFAULT_STRETCH_TIMEOUT_MS,
        })
    }

    /// Override the total clock-stretch tolerance
    pub fn with_stretch_timeout(mut self, timeout_ms: u32) -> Self {
        self.stretch_timeout_ms = timeout_ms;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scl(&self) -> PinId {
        self.scl
    }

    pub fn sda(&self) -> PinId {
        self.sda
    }

    pub fn clock_period_ms(&self) -> u32 {
        self.clock_period_ms
    }

    pub fn half_period_ms(&self) -> u32 {
        self.half_period_ms
    }

    pub fn stretch_timeout_ms(&self) -> u32 {
        self.stretch_timeout_ms
    }

    /// Polling policy for clock stretching: one SCL read per clock period
    pub fn stretch_retry(&self) -> Retry {
        Retry::for_timeout(self.stretch_timeout_ms, self.clock_period_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_halves_period() {
        let config = BusConfig::new("sgp30", 2, 3, 2).unwrap();
        assert_eq!(config.name(), "sgp30");
        assert_eq!(config.scl(), 2);
        assert_eq!(config.sda(), 3);
        assert_eq!(config.clock_period_ms(), 2);
        assert_eq!(config.half_period_ms(), 1);
        assert_eq!(config.stretch_timeout_ms(), DEFAULT_STRETCH_TIMEOUT_MS);
    }

    #[test]
    fn test_zero_period_rejected() {
        assert_eq!(
            BusConfig::new("bus", 2, 3, 0),
            Err(ConfigError::ZeroClockPeriod)
        );
        assert_eq!(
            BusConfig::with_half_period("bus", 2, 3, 0, 1),
            Err(ConfigError::ZeroClockPeriod)
        );
    }

    #[test]
    fn test_one_ms_period_has_zero_half_period() {
        assert_eq!(
            BusConfig::new("bus", 2, 3, 1),
            Err(ConfigError::ZeroHalfPeriod)
        );
        assert!(BusConfig::with_half_period("bus", 2, 3, 1, 1).is_ok());
    }

    #[test]
    fn test_same_pin_rejected() {
        assert_eq!(BusConfig::new("bus", 4, 4, 2), Err(ConfigError::SamePin));
    }

    #[test]
    fn test_long_name_rejected() {
        let name = "a-very-long-bus-name-that-does-not-fit";
        assert!(name.len() > MAX_NAME_LEN);
        assert_eq!(
            BusConfig::new(name, 2, 3, 2),
            Err(ConfigError::NameTooLong)
        );
    }

    #[test]
    fn test_stretch_retry_scales_with_period() {
        let fast = BusConfig::new("bus", 2, 3, 2).unwrap();
        assert_eq!(fast.stretch_retry(), Retry::new(75, 2));

        let slow = BusConfig::new("bus", 2, 3, 10).unwrap();
        assert_eq!(slow.stretch_retry(), Retry::new(15, 10));

        let custom = fast.with_stretch_timeout(20);
        assert_eq!(custom.stretch_retry().attempts, 10);
    }
}
