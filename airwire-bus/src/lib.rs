//! Software I2C bus engine
//!
//! Drives two GPIO lines (SCL, SDA) through a [`PinDriver`] to speak the I2C
//! protocol without a hardware peripheral, and layers CRC8-checked word
//! framing on top for the sensor families that use it.
//!
//! # Layers
//!
//! - [`engine`] - START/STOP conditions, clock stretching, byte transfer
//! - [`transaction`] - addressed multi-byte reads and writes
//! - [`framing`] - 16-bit words with trailing CRC8, command buffers
//! - [`sim`] - scripted open-drain bus with a simulated slave (host only)
//!
//! A bus never drives a line high: releasing a line to its pull-up is the
//! only way to produce a logic 1.
//!
//! [`PinDriver`]: airwire_hal::PinDriver

#![no_std]
#![deny(unsafe_code)]

#[cfg(any(test, feature = "std"))]
extern crate std;

#[macro_use]
mod fmt;

pub mod config;
pub mod engine;
pub mod error;
pub mod framing;
pub mod retry;
#[cfg(any(test, feature = "std"))]
pub mod sim;
pub mod transaction;

pub use config::{BusConfig, ConfigError};
pub use engine::SoftI2c;
pub use error::{BusError, Phase, TransferError};
pub use framing::{CommandError, Crc8, FramingError};
pub use retry::Retry;
