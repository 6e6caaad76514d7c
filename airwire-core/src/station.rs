//! Station tick
//!
//! One call to [`Station::tick`] per measurement period: read humidity and
//! temperature (if a humidity sensor is fitted), feed the derived absolute
//! humidity to the air quality sensor, take one IAQ measurement, and read
//! the baseline when the schedule says so.
//!
//! A failing humidity sensor never blocks the IAQ measurement; every
//! failure is logged and simply leaves the corresponding report field empty.

use crate::baseline::BaselineSchedule;
use crate::config::SamplingConfig;
use crate::humidity::absolute_humidity_mg_m3;
use crate::sample::{AirQuality, Climate};
use crate::traits::{AirQualitySensor, HumiditySensor, SensorError};

/// Placeholder for stations without a humidity sensor
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHumidity;

impl HumiditySensor for NoHumidity {
    fn measure_climate(&mut self) -> Result<Climate, SensorError> {
        Err(SensorError::Unsupported)
    }
}

/// What one tick produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickReport {
    pub air_quality: Option<AirQuality>,
    pub climate: Option<Climate>,
    /// Set on ticks where the baseline was due and read successfully
    pub baseline: Option<u32>,
}

/// Air quality sensor plus optional humidity sensor, driven once per period
pub struct Station<A, H = NoHumidity> {
    air: A,
    humidity: Option<H>,
    schedule: BaselineSchedule,
    config: SamplingConfig,
}

impl<A: AirQualitySensor> Station<A, NoHumidity> {
    pub fn without_humidity(air: A, config: SamplingConfig) -> Self {
        Station::new(air, None, config)
    }
}

impl<A: AirQualitySensor, H: HumiditySensor> Station<A, H> {
    pub fn new(air: A, humidity: Option<H>, config: SamplingConfig) -> Self {
        let schedule = Self::schedule(&config, false);
        Self {
            air,
            humidity,
            schedule,
            config,
        }
    }

    fn schedule(config: &SamplingConfig, restored: bool) -> BaselineSchedule {
        BaselineSchedule::with_periods(
            restored,
            config.baseline_early_ticks,
            config.baseline_refresh_ticks,
        )
    }

    /// Start the IAQ algorithm and restore the configured baseline
    ///
    /// A baseline that fails to restore is logged; the schedule then treats
    /// the sensor as fresh.
    pub fn start(&mut self) -> Result<(), SensorError> {
        self.air.init_air_quality()?;

        let mut restored = false;
        if let Some(baseline) = self.config.initial_baseline {
            match self.air.set_baseline(baseline) {
                Ok(()) => {
                    info!("restored IAQ baseline {=u32:#x}", baseline);
                    restored = true;
                }
                Err(e) => warn!("baseline restore failed: {}", e),
            }
        }
        self.schedule = Self::schedule(&self.config, restored);
        Ok(())
    }

    /// Run one measurement period
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport {
            climate: self.read_climate(),
            ..Default::default()
        };

        match self.air.measure_air_quality() {
            Ok(air_quality) => {
                debug!(
                    "co2eq={} ppm tvoc={} ppb",
                    air_quality.co2_eq_ppm, air_quality.tvoc_ppb
                );
                report.air_quality = Some(air_quality);
            }
            Err(e) => warn!("IAQ measurement failed: {}", e),
        }

        if self.schedule.tick() {
            match self.air.baseline() {
                Ok(baseline) => {
                    info!("IAQ baseline {=u32:#x}", baseline);
                    report.baseline = Some(baseline);
                }
                Err(e) => warn!("baseline read failed: {}", e),
            }
        }

        report
    }

    pub fn schedule_state(&self) -> &BaselineSchedule {
        &self.schedule
    }

    pub fn air_sensor(&mut self) -> &mut A {
        &mut self.air
    }

    pub fn humidity_sensor(&mut self) -> Option<&mut H> {
        self.humidity.as_mut()
    }

    fn read_climate(&mut self) -> Option<Climate> {
        let sensor = self.humidity.as_mut()?;
        let climate = match sensor.measure_climate() {
            Ok(climate) => climate,
            Err(e) => {
                warn!("humidity measurement failed: {}", e);
                return None;
            }
        };

        if self.config.humidity_compensation {
            let applied = absolute_humidity_mg_m3(&climate)
                .and_then(|ah| self.air.set_absolute_humidity(ah));
            if let Err(e) = applied {
                warn!("humidity compensation failed: {}", e);
            }
        }
        Some(climate)
    }
}
