//! Air quality and humidity sensor traits

use crate::sample::{AirQuality, Climate};

/// Errors that can occur while talking to a sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// Bus transfer failed (NACK, clock timeout, bad pin)
    Bus,
    /// Response failed its checksum
    Checksum,
    /// Device rejected an argument or reported an unusable value
    InvalidData,
    /// Device does not support the requested operation
    Unsupported,
    /// Reading out of the supported conversion range
    OutOfRange,
}

/// Trait for VOC / equivalent-CO2 sensors
///
/// Implementations wrap a device command driver (e.g. SGP30) and expose the
/// operations the sampling pipeline needs.
pub trait AirQualitySensor {
    /// Start the on-chip IAQ algorithm
    fn init_air_quality(&mut self) -> Result<(), SensorError>;

    /// Run one IAQ measurement and return the result
    ///
    /// Should be called once per second after init for the on-chip
    /// baseline compensation to work.
    fn measure_air_quality(&mut self) -> Result<AirQuality, SensorError>;

    /// Feed absolute humidity (mg/m³) for on-chip humidity compensation
    ///
    /// Zero disables compensation.
    fn set_absolute_humidity(&mut self, mg_per_m3: u32) -> Result<(), SensorError>;

    /// Read the current IAQ baseline
    fn baseline(&mut self) -> Result<u32, SensorError>;

    /// Restore a previously read IAQ baseline
    fn set_baseline(&mut self, baseline: u32) -> Result<(), SensorError>;
}

/// Trait for relative humidity / temperature sensors
pub trait HumiditySensor {
    /// Measure relative humidity and temperature
    fn measure_climate(&mut self) -> Result<Climate, SensorError>;
}

impl<T: AirQualitySensor + ?Sized> AirQualitySensor for &mut T {
    fn init_air_quality(&mut self) -> Result<(), SensorError> {
        T::init_air_quality(self)
    }

    fn measure_air_quality(&mut self) -> Result<AirQuality, SensorError> {
        T::measure_air_quality(self)
    }

    fn set_absolute_humidity(&mut self, mg_per_m3: u32) -> Result<(), SensorError> {
        T::set_absolute_humidity(self, mg_per_m3)
    }

    fn baseline(&mut self) -> Result<u32, SensorError> {
        T::baseline(self)
    }

    fn set_baseline(&mut self, baseline: u32) -> Result<(), SensorError> {
        T::set_baseline(self, baseline)
    }
}

impl<T: HumiditySensor + ?Sized> HumiditySensor for &mut T {
    fn measure_climate(&mut self) -> Result<Climate, SensorError> {
        T::measure_climate(self)
    }
}
