//! Sample types flowing through the pipeline
//!
//! All values are integers; fractional quantities use fixed-point with the
//! scale in the field name (`_x100` = hundredths).

/// One IAQ measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AirQuality {
    /// Equivalent CO2 in ppm
    pub co2_eq_ppm: u16,
    /// Total VOC in ppb
    pub tvoc_ppb: u16,
}

/// One humidity/temperature measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Climate {
    /// Relative humidity in 0.01 %RH (4550 = 45.50 %RH)
    pub rh_x100: i32,
    /// Temperature in 0.01 °C (2312 = 23.12 °C)
    pub celsius_x100: i32,
}

/// Raw CO2 sample handed from sampling to transform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sample {
    /// Milliseconds since boot
    pub timestamp_ms: u64,
    pub co2_eq_ppm: u16,
}

/// Averaged CO2 sample handed from transform to encode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransformedSample {
    /// Timestamp of the newest sample in the window
    pub timestamp_ms: u64,
    /// Window mean in 0.01 ppm
    pub co2_eq_ppm_mean_x100: u32,
}

impl TransformedSample {
    /// Mean as a float, for presentation only
    pub fn mean_ppm(&self) -> f32 {
        self.co2_eq_ppm_mean_x100 as f32 / 100.0
    }
}

/// Latest value of each reading; `None` until the first one arrives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Readings {
    pub tvoc_ppb: Option<u16>,
    pub co2_eq_ppm: Option<u16>,
    pub baseline: Option<u32>,
    pub rh_x100: Option<i32>,
    pub celsius_x100: Option<i32>,
}

impl Readings {
    /// Take every value `newer` carries, keep the rest
    pub fn update(&mut self, newer: Readings) {
        self.tvoc_ppb = newer.tvoc_ppb.or(self.tvoc_ppb);
        self.co2_eq_ppm = newer.co2_eq_ppm.or(self.co2_eq_ppm);
        self.baseline = newer.baseline.or(self.baseline);
        self.rh_x100 = newer.rh_x100.or(self.rh_x100);
        self.celsius_x100 = newer.celsius_x100.or(self.celsius_x100);
    }

    pub fn air_quality(&self) -> Option<AirQuality> {
        Some(AirQuality {
            co2_eq_ppm: self.co2_eq_ppm?,
            tvoc_ppb: self.tvoc_ppb?,
        })
    }

    pub fn climate(&self) -> Option<Climate> {
        Some(Climate {
            rh_x100: self.rh_x100?,
            celsius_x100: self.celsius_x100?,
        })
    }
}
