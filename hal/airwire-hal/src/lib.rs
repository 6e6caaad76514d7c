//! Airwire Hardware Abstraction Layer
//!
//! This crate defines the capabilities the software I2C engine and the
//! sensor drivers consume. Chip-specific HALs implement them so the same
//! bus engine and drivers run on real pins or on the host simulator.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Drivers (airwire-drivers: SGP30, ...)  │
//! └─────────────────────────────────────────┘
//!                     │  I2cBus
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  airwire-bus (software I2C engine)      │
//! └─────────────────────────────────────────┘
//!                     │  PinDriver
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ airwire-hal-  │       │ airwire-bus   │
//! │    rp2040     │       │ sim (host)    │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::PinDriver`] - Open-drain line control by pin identifier
//! - [`i2c::I2cBus`] - Addressed I2C read/write transactions

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod i2c;

// Re-export key traits at crate root for convenience
pub use gpio::{InvalidPin, Level, PinDriver, PinId};
pub use i2c::I2cBus;
