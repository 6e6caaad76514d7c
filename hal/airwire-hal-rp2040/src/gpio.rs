//! GPIO allocation and management
//!
//! Tracks which GPIO pins are in use so two buses never share a line.

use airwire_hal::PinId;
use heapless::FnvIndexSet;

/// Maximum number of GPIO pins on RP2040
pub const GPIO_COUNT: usize = 30;

/// Pin allocation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AllocError {
    /// Pin number out of range (0-29 valid)
    InvalidPin(PinId),
    /// Pin already has an owner
    AlreadyAllocated(PinId),
}

/// GPIO allocator to track pin usage
pub struct GpioAllocator {
    allocated: FnvIndexSet<PinId, 32>,
}

impl Default for GpioAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl GpioAllocator {
    pub fn new() -> Self {
        Self {
            allocated: FnvIndexSet::new(),
        }
    }

    /// Claim a GPIO pin
    pub fn allocate(&mut self, pin: PinId) -> Result<(), AllocError> {
        if usize::from(pin) >= GPIO_COUNT {
            return Err(AllocError::InvalidPin(pin));
        }
        if self.allocated.contains(&pin) {
            return Err(AllocError::AlreadyAllocated(pin));
        }
        self.allocated
            .insert(pin)
            .map_err(|_| AllocError::InvalidPin(pin))?;
        Ok(())
    }

    /// Claim the clock and data lines of one bus
    ///
    /// Nothing is claimed if either pin is unavailable.
    pub fn allocate_pair(&mut self, scl: PinId, sda: PinId) -> Result<(), AllocError> {
        self.allocate(scl)?;
        if let Err(e) = self.allocate(sda) {
            self.release(scl);
            return Err(e);
        }
        Ok(())
    }

    pub fn release(&mut self, pin: PinId) {
        self.allocated.remove(&pin);
    }

    pub fn is_allocated(&self, pin: PinId) -> bool {
        self.allocated.contains(&pin)
    }

    pub fn allocated_count(&self) -> usize {
        self.allocated.len()
    }
}

/// Parse a pin string from config
///
/// Accepts `"gpio11"` or `"^gpio11"`; the pull-up marker is redundant for
/// bus lines, which are always pulled up when released. Inverted pins
/// (`"!gpio11"`) cannot carry an open-drain line and are rejected.
pub fn parse_pin_string(s: &str) -> Option<PinId> {
    let s = s.trim();
    let s = s.strip_prefix('^').unwrap_or(s);
    let num = s.strip_prefix("gpio")?;
    let pin: PinId = num.parse().ok()?;

    if usize::from(pin) >= GPIO_COUNT {
        return None;
    }
    Some(pin)
}
