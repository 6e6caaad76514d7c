//! Board configuration
//!
//! Constants come from board.toml, validated and converted by build.rs.

use airwire_core::config::SamplingConfig;
use airwire_hal::PinId;
use airwire_hal_rp2040::parse_pin_string;

mod generated {
    include!(concat!(env!("OUT_DIR"), "/board_config.rs"));
}

pub use generated::*;

/// Clock and data GPIO of one bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct BusPins {
    pub scl: PinId,
    pub sda: PinId,
}

impl BusPins {
    /// Resolve pin names like "gpio2"
    pub fn parse(scl: &str, sda: &str) -> Option<Self> {
        Some(Self {
            scl: parse_pin_string(scl)?,
            sda: parse_pin_string(sda)?,
        })
    }
}

pub fn sgp30_pins() -> Option<BusPins> {
    BusPins::parse(SGP30_SCL, SGP30_SDA)
}

pub fn si7021_pins() -> Option<BusPins> {
    let (scl, sda) = SI7021_PINS?;
    BusPins::parse(scl, sda)
}

/// Pipeline settings from the board file
pub fn sampling_config() -> SamplingConfig {
    SamplingConfig {
        period_ms: PERIOD_MS,
        window: WINDOW as usize,
        sample_wait_ms: SAMPLE_WAIT_MS,
        initial_baseline: BASELINE,
        humidity_compensation: HUMIDITY_COMPENSATION,
        ..Default::default()
    }
}
