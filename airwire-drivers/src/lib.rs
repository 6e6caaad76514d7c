//! Device command drivers
//!
//! This crate provides concrete implementations of the sensor traits
//! defined in airwire-core, built on the software I2C bus:
//!
//! - SGP30 air quality sensor (VOC / equivalent CO2)
//! - Si7021 relative humidity and temperature sensor
//!
//! Drivers talk to any [`airwire_hal::I2cBus`]; in firmware that is an
//! [`airwire_bus::SoftI2c`] on a dedicated pair of GPIO lines.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

#[macro_use]
mod fmt;

pub mod sensor;
