//! Sensirion SGP30 air quality sensor
//!
//! Multi-pixel gas sensor reporting total VOC and equivalent CO2. Commands
//! are 16-bit opcodes; every response word carries a CRC8 (init 0xFF).
//!
//! The on-chip IAQ algorithm expects `measure_iaq` once per second after
//! `iaq_init`. During the first 15 s it returns fixed values
//! (400 ppm CO2eq, 0 ppb TVOC).

use airwire_bus::config::{BusConfig, ConfigError};
use airwire_bus::framing::{self, CommandError, Crc8, FramingError};
use airwire_core::sample::AirQuality;
use airwire_core::traits::{AirQualitySensor, SensorError};
use airwire_hal::{I2cBus, PinId};

/// Fixed 7-bit I2C address
pub const ADDRESS: u8 = 0x58;

/// Bus clock period used for this device
pub const CLOCK_PERIOD_MS: u32 = 2;

/// Word checksum parameters
pub const CRC: Crc8 = Crc8::SENSIRION;

/// Product type reported by the feature set word
pub const PRODUCT_TYPE: u8 = 0;

/// Feature set version needed by the driver
pub const MIN_FEATURE_SET: u8 = 0x21;

/// Largest absolute humidity the sensor accepts (mg/m³)
pub const MAX_ABSOLUTE_HUMIDITY: u32 = 256_000;

/// Self-test pass pattern
pub const SELF_TEST_OK: u16 = 0xD400;

/// Command opcodes
pub mod cmd {
    pub const IAQ_INIT: u16 = 0x2003;
    pub const MEASURE_IAQ: u16 = 0x2008;
    pub const GET_IAQ_BASELINE: u16 = 0x2015;
    pub const SET_IAQ_BASELINE: u16 = 0x201E;
    pub const SET_ABSOLUTE_HUMIDITY: u16 = 0x2061;
    pub const MEASURE_TEST: u16 = 0x2032;
    pub const GET_FEATURE_SET: u16 = 0x202F;
    pub const MEASURE_RAW: u16 = 0x2050;
    pub const GET_TVOC_INCEPTIVE_BASELINE: u16 = 0x20B3;
    pub const SET_TVOC_BASELINE: u16 = 0x2077;
    pub const GET_SERIAL_ID: u16 = 0x3682;
}

/// Command execution times (ms)
pub mod delay {
    pub const IAQ_INIT: u32 = 10;
    pub const MEASURE_IAQ: u32 = 12;
    pub const GET_IAQ_BASELINE: u32 = 10;
    pub const SET_IAQ_BASELINE: u32 = 10;
    pub const SET_ABSOLUTE_HUMIDITY: u32 = 10;
    pub const MEASURE_TEST: u32 = 220;
    pub const GET_FEATURE_SET: u32 = 10;
    pub const MEASURE_RAW: u32 = 25;
    pub const GET_TVOC_INCEPTIVE_BASELINE: u32 = 10;
    pub const SET_TVOC_BASELINE: u32 = 10;
    /// 0.5 ms rounded up to the sleep granularity
    pub const GET_SERIAL_ID: u32 = 1;
}

/// SGP30 errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Sgp30Error<E> {
    /// Bus transfer failed
    Bus(E),
    /// Response failed its checksum or had the wrong shape
    Framing(FramingError),
    /// On-chip self test returned something other than 0xD400
    SelfTestFailed(u16),
    /// Feature set older than required
    UnsupportedFeatureSet(u8),
    /// Product type is not an SGP30
    InvalidProductType(u8),
    /// Argument out of range
    InvalidArgument,
    /// Baseline of zero (not yet valid, or rejected as an argument)
    ZeroBaseline,
}

impl<E> From<CommandError<E>> for Sgp30Error<E> {
    fn from(err: CommandError<E>) -> Self {
        match err {
            CommandError::Transport(e) => Sgp30Error::Bus(e),
            CommandError::Framing(e) => Sgp30Error::Framing(e),
        }
    }
}

impl<E> From<Sgp30Error<E>> for SensorError {
    fn from(err: Sgp30Error<E>) -> Self {
        match err {
            Sgp30Error::Bus(_) => SensorError::Bus,
            Sgp30Error::Framing(_) => SensorError::Checksum,
            Sgp30Error::UnsupportedFeatureSet(_) | Sgp30Error::InvalidProductType(_) => {
                SensorError::Unsupported
            }
            Sgp30Error::SelfTestFailed(_)
            | Sgp30Error::InvalidArgument
            | Sgp30Error::ZeroBaseline => SensorError::InvalidData,
        }
    }
}

/// Decoded feature set word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FeatureSet {
    /// Bits 0-7
    pub version: u8,
    /// Bits 12-15
    pub product_type: u8,
}

impl FeatureSet {
    pub fn from_word(word: u16) -> Self {
        Self {
            version: (word & 0x00FF) as u8,
            product_type: ((word & 0xF000) >> 12) as u8,
        }
    }
}

/// Raw sensor signals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawSignals {
    pub h2: u16,
    pub ethanol: u16,
}

/// SGP30 driver
pub struct Sgp30<B> {
    bus: B,
}

impl<B: I2cBus> Sgp30<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Bus configuration for an SGP30 on the given lines
    pub fn bus_config(name: &str, scl: PinId, sda: PinId) -> Result<BusConfig, ConfigError> {
        BusConfig::new(name, scl, sda, CLOCK_PERIOD_MS)
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Release the driver, returning the bus
    pub fn free(self) -> B {
        self.bus
    }

    fn write(&mut self, cmd: u16, args: &[u16]) -> Result<(), Sgp30Error<B::Error>> {
        framing::write_command(&mut self.bus, ADDRESS, cmd, args, CRC)?;
        Ok(())
    }

    fn read<const N: usize>(&mut self) -> Result<[u16; N], Sgp30Error<B::Error>> {
        let words = framing::read_words(&mut self.bus, ADDRESS, N, CRC)?;
        let mut out = [0u16; N];
        out.copy_from_slice(&words);
        Ok(out)
    }

    fn command_read<const N: usize>(
        &mut self,
        cmd: u16,
        delay_ms: u32,
    ) -> Result<[u16; N], Sgp30Error<B::Error>> {
        let words = framing::delayed_command_read(&mut self.bus, ADDRESS, cmd, delay_ms, N, CRC)?;
        let mut out = [0u16; N];
        out.copy_from_slice(&words);
        Ok(out)
    }

    /// Start the IAQ algorithm
    ///
    /// The execution time is waited out even if the write failed.
    pub fn iaq_init(&mut self) -> Result<(), Sgp30Error<B::Error>> {
        let result = self.write(cmd::IAQ_INIT, &[]);
        self.bus.sleep_ms(delay::IAQ_INIT);
        if result.is_err() {
            error!("sgp30: iaq_init failed");
        }
        result
    }

    /// Trigger an IAQ measurement without waiting for it
    pub fn measure_iaq(&mut self) -> Result<(), Sgp30Error<B::Error>> {
        debug!("sgp30: measure iaq");
        self.write(cmd::MEASURE_IAQ, &[])
    }

    /// Read the result of a previously triggered IAQ measurement
    pub fn read_iaq(&mut self) -> Result<AirQuality, Sgp30Error<B::Error>> {
        let [co2_eq_ppm, tvoc_ppb] = self.read::<2>()?;
        Ok(AirQuality {
            co2_eq_ppm,
            tvoc_ppb,
        })
    }

    /// Trigger an IAQ measurement, wait for it and read it
    pub fn measure_iaq_blocking(&mut self) -> Result<AirQuality, Sgp30Error<B::Error>> {
        self.measure_iaq()?;
        self.bus.sleep_ms(delay::MEASURE_IAQ);
        self.read_iaq()
    }

    /// Trigger a raw signal measurement without waiting for it
    pub fn measure_raw(&mut self) -> Result<(), Sgp30Error<B::Error>> {
        self.write(cmd::MEASURE_RAW, &[])
    }

    /// Read the result of a previously triggered raw measurement
    pub fn read_raw(&mut self) -> Result<RawSignals, Sgp30Error<B::Error>> {
        let [h2, ethanol] = self.read::<2>()?;
        Ok(RawSignals { h2, ethanol })
    }

    pub fn measure_raw_blocking(&mut self) -> Result<RawSignals, Sgp30Error<B::Error>> {
        self.measure_raw()?;
        self.bus.sleep_ms(delay::MEASURE_RAW);
        self.read_raw()
    }

    /// Read the IAQ baseline
    ///
    /// The sensor reports zero until its baseline is valid; that is an error.
    pub fn iaq_baseline(&mut self) -> Result<u32, Sgp30Error<B::Error>> {
        let [low, high] = self.command_read::<2>(cmd::GET_IAQ_BASELINE, delay::GET_IAQ_BASELINE)?;
        let baseline = (u32::from(high) << 16) | u32::from(low);
        if baseline == 0 {
            error!("sgp30: baseline not yet valid");
            return Err(Sgp30Error::ZeroBaseline);
        }
        Ok(baseline)
    }

    /// Restore an IAQ baseline previously read with [`Self::iaq_baseline`]
    pub fn set_iaq_baseline(&mut self, baseline: u32) -> Result<(), Sgp30Error<B::Error>> {
        if baseline == 0 {
            return Err(Sgp30Error::ZeroBaseline);
        }
        let words = [(baseline >> 16) as u16, baseline as u16];
        self.write(cmd::SET_IAQ_BASELINE, &words)?;
        self.bus.sleep_ms(delay::SET_IAQ_BASELINE);
        Ok(())
    }

    /// TVOC inceptive baseline (feature set 0x21 and later)
    pub fn tvoc_inceptive_baseline(&mut self) -> Result<u16, Sgp30Error<B::Error>> {
        self.check_feature_set(MIN_FEATURE_SET)?;
        let [baseline] = self.command_read::<1>(
            cmd::GET_TVOC_INCEPTIVE_BASELINE,
            delay::GET_TVOC_INCEPTIVE_BASELINE,
        )?;
        Ok(baseline)
    }

    /// Set the TVOC baseline (feature set 0x21 and later)
    pub fn set_tvoc_baseline(&mut self, baseline: u16) -> Result<(), Sgp30Error<B::Error>> {
        self.check_feature_set(MIN_FEATURE_SET)?;
        if baseline == 0 {
            return Err(Sgp30Error::ZeroBaseline);
        }
        self.write(cmd::SET_TVOC_BASELINE, &[baseline])?;
        self.bus.sleep_ms(delay::SET_TVOC_BASELINE);
        Ok(())
    }

    /// Set absolute humidity for on-chip compensation
    ///
    /// Takes mg/m³ (0 disables compensation) and sends it as 8.8 fixed-point
    /// g/m³.
    pub fn set_absolute_humidity(&mut self, mg_per_m3: u32) -> Result<(), Sgp30Error<B::Error>> {
        if mg_per_m3 > MAX_ABSOLUTE_HUMIDITY {
            return Err(Sgp30Error::InvalidArgument);
        }
        // mg/m³ * 256 / 1000, as (ah * 16777) >> 16
        let scaled = ((mg_per_m3 * 16_777) >> 16) as u16;
        self.write(cmd::SET_ABSOLUTE_HUMIDITY, &[scaled])?;
        self.bus.sleep_ms(delay::SET_ABSOLUTE_HUMIDITY);
        Ok(())
    }

    /// Run the on-chip self test
    ///
    /// Must not be run after `iaq_init`; it resets the IAQ algorithm.
    pub fn measure_test(&mut self) -> Result<(), Sgp30Error<B::Error>> {
        let [result] = self.command_read::<1>(cmd::MEASURE_TEST, delay::MEASURE_TEST)?;
        if result != SELF_TEST_OK {
            error!("sgp30: self test returned {=u16:#x}", result);
            return Err(Sgp30Error::SelfTestFailed(result));
        }
        Ok(())
    }

    pub fn feature_set(&mut self) -> Result<FeatureSet, Sgp30Error<B::Error>> {
        let [word] = self.command_read::<1>(cmd::GET_FEATURE_SET, delay::GET_FEATURE_SET)?;
        Ok(FeatureSet::from_word(word))
    }

    /// Check product type and minimum feature set version
    pub fn check_feature_set(&mut self, needed: u8) -> Result<(), Sgp30Error<B::Error>> {
        let features = self.feature_set()?;
        if features.product_type != PRODUCT_TYPE {
            error!("sgp30: product type {}", features.product_type);
            return Err(Sgp30Error::InvalidProductType(features.product_type));
        }
        if features.version < needed {
            error!(
                "sgp30: feature set {=u8:#x} (min {=u8:#x})",
                features.version, needed
            );
            return Err(Sgp30Error::UnsupportedFeatureSet(features.version));
        }
        Ok(())
    }

    /// Verify the device and start the IAQ algorithm
    pub fn probe(&mut self) -> Result<(), Sgp30Error<B::Error>> {
        self.check_feature_set(MIN_FEATURE_SET)?;
        self.iaq_init()
    }

    /// 48-bit serial number
    pub fn serial_id(&mut self) -> Result<u64, Sgp30Error<B::Error>> {
        let words = self.command_read::<3>(cmd::GET_SERIAL_ID, delay::GET_SERIAL_ID)?;
        Ok(words
            .iter()
            .fold(0u64, |serial, word| (serial << 16) | u64::from(*word)))
    }
}

impl<B: I2cBus> AirQualitySensor for Sgp30<B> {
    fn init_air_quality(&mut self) -> Result<(), SensorError> {
        Ok(self.iaq_init()?)
    }

    fn measure_air_quality(&mut self) -> Result<AirQuality, SensorError> {
        Ok(self.measure_iaq_blocking()?)
    }

    fn set_absolute_humidity(&mut self, mg_per_m3: u32) -> Result<(), SensorError> {
        Ok(Sgp30::set_absolute_humidity(self, mg_per_m3)?)
    }

    fn baseline(&mut self) -> Result<u32, SensorError> {
        Ok(self.iaq_baseline()?)
    }

    fn set_baseline(&mut self, baseline: u32) -> Result<(), SensorError> {
        Ok(self.set_iaq_baseline(baseline)?)
    }
}
