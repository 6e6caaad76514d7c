//! RP2040-specific HAL for the air quality station
//!
//! This crate provides RP2040 implementations of the shared `airwire-hal`
//! traits:
//!
//! - Open-drain line control over embassy-rp `Flex` pins
//! - GPIO allocation and pin-string parsing for config-driven setup
//! - A pin bank handing out GPIOs by number

#![no_std]

pub mod gpio;
pub mod pins;

pub use gpio::{parse_pin_string, AllocError, GpioAllocator, GPIO_COUNT};
pub use pins::{FlexPins, PinBank};
