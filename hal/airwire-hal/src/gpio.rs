//! GPIO pin abstractions
//!
//! The software I2C engine never drives a line high. A line is either
//! released (input with pull-up, reads high unless another participant pulls
//! it low) or driven low (output at logic 0). [`PinDriver`] exposes exactly
//! those operations, addressed by pin number, so one driver can serve every
//! line of a board.

/// Physical pin identifier (GPIO number on the target chip)
pub type PinId = u8;

/// Logic level read from a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    /// Logic 0
    Low,
    /// Logic 1
    High,
}

impl Level {
    /// Check if the level is high
    pub fn is_high(self) -> bool {
        matches!(self, Level::High)
    }

    /// Check if the level is low
    pub fn is_low(self) -> bool {
        !self.is_high()
    }

    /// The level as a single bit (0 or 1)
    pub fn bit(self) -> u8 {
        match self {
            Level::Low => 0,
            Level::High => 1,
        }
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// The pin identifier is not a usable GPIO on this platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidPin(pub PinId);

/// Open-drain line control
///
/// Implementations should handle the actual hardware register manipulation
/// for the specific chip. Every operation except [`PinDriver::reset`] fails
/// only when the pin identifier is invalid.
pub trait PinDriver {
    /// Configure the pin as input with the internal pull-up enabled
    ///
    /// This "releases" the line: it floats high unless another bus
    /// participant holds it low.
    fn set_input_pullup(&mut self, pin: PinId) -> Result<(), InvalidPin>;

    /// Configure the pin as output driving logic 0
    fn set_output_low(&mut self, pin: PinId) -> Result<(), InvalidPin>;

    /// Read the current level on the pin
    fn read_level(&mut self, pin: PinId) -> Result<Level, InvalidPin>;

    /// Return the pin to its neutral, un-driven power-on state
    ///
    /// Best-effort: never fails.
    fn reset(&mut self, pin: PinId);
}

impl<T: PinDriver + ?Sized> PinDriver for &mut T {
    fn set_input_pullup(&mut self, pin: PinId) -> Result<(), InvalidPin> {
        T::set_input_pullup(self, pin)
    }

    fn set_output_low(&mut self, pin: PinId) -> Result<(), InvalidPin> {
        T::set_output_low(self, pin)
    }

    fn read_level(&mut self, pin: PinId) -> Result<Level, InvalidPin> {
        T::read_level(self, pin)
    }

    fn reset(&mut self, pin: PinId) {
        T::reset(self, pin)
    }
}
