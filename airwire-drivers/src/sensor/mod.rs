//! Sensor drivers

pub mod sgp30;
pub mod si7021;

pub use sgp30::{Sgp30, Sgp30Error};
pub use si7021::{Si7021, Si7021Error};
