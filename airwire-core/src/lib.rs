//! Board-agnostic core logic for the air quality station
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Sensor traits (air quality, humidity)
//! - Sample types
//! - Absolute humidity conversion
//! - Baseline persistence schedule
//! - Moving-average transform
//! - JSON encoding of transformed samples
//! - The per-second station tick
//! - Start/stop control of the sampling and transform stages

#![no_std]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod baseline;
pub mod config;
pub mod control;
pub mod encode;
pub mod humidity;
pub mod sample;
pub mod station;
pub mod traits;
pub mod transform;
