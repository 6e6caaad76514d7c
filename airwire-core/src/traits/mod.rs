//! Hardware abstraction traits
//!
//! These traits define the interface between the sampling pipeline and the
//! device drivers.

pub mod sensor;

pub use sensor::{AirQualitySensor, HumiditySensor, SensorError};
