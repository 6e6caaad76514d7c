//! Silicon Labs Si7021 humidity and temperature sensor
//!
//! Single-byte opcodes for measurements and registers, two-byte opcodes for
//! the electronic ID and firmware revision. Measurement words carry a CRC8
//! with init 0x00.

use airwire_bus::config::{BusConfig, ConfigError};
use airwire_bus::framing::{self, CommandError, Crc8, FramingError, WORD_FRAME_LEN};
use airwire_core::sample::Climate;
use airwire_core::traits::{HumiditySensor, SensorError};
use airwire_hal::{I2cBus, PinId};

/// Fixed 7-bit I2C address
pub const ADDRESS: u8 = 0x40;

/// Bus clock period used for this device
pub const CLOCK_PERIOD_MS: u32 = 2;

/// Word checksum parameters
pub const CRC: Crc8 = Crc8::SILABS;

/// Command opcodes
pub mod cmd {
    pub const RESET: u8 = 0xFE;
    pub const MEASURE_RH: u8 = 0xE5;
    pub const MEASURE_TEMPERATURE: u8 = 0xE3;
    pub const TEMPERATURE_FROM_PREVIOUS_RH: u8 = 0xE0;
    pub const WRITE_USER_REG: u8 = 0xE6;
    pub const READ_USER_REG: u8 = 0xE7;
    pub const WRITE_HEATER_REG: u8 = 0x51;
    pub const READ_HEATER_REG: u8 = 0x11;
    pub const READ_ID_FIRST: u16 = 0xFA0F;
    pub const READ_ID_SECOND: u16 = 0xFCC9;
    pub const FIRMWARE_REVISION: u16 = 0x84B8;
}

/// Command execution times (ms)
pub mod delay {
    pub const RESET: u32 = 30;
    pub const MEASURE_RH: u32 = 24;
    pub const MEASURE_TEMPERATURE: u32 = 22;
    pub const REGISTER: u32 = 10;
    pub const ID: u32 = 10;
}

/// User register bits
mod user_reg {
    pub const RES1: u8 = 0x80;
    pub const HEATER: u8 = 0x04;
    pub const RES0: u8 = 0x01;
}

const HEATER_CURRENT_MASK: u8 = 0x0F;

/// Si7021 errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Si7021Error<E> {
    /// Bus transfer failed
    Bus(E),
    /// Response failed its checksum or had the wrong shape
    Framing(FramingError),
    /// Argument out of range
    InvalidArgument,
}

impl<E> From<CommandError<E>> for Si7021Error<E> {
    fn from(err: CommandError<E>) -> Self {
        match err {
            CommandError::Transport(e) => Si7021Error::Bus(e),
            CommandError::Framing(e) => Si7021Error::Framing(e),
        }
    }
}

impl<E> From<FramingError> for Si7021Error<E> {
    fn from(err: FramingError) -> Self {
        Si7021Error::Framing(err)
    }
}

impl<E> From<Si7021Error<E>> for SensorError {
    fn from(err: Si7021Error<E>) -> Self {
        match err {
            Si7021Error::Bus(_) => SensorError::Bus,
            Si7021Error::Framing(_) => SensorError::Checksum,
            Si7021Error::InvalidArgument => SensorError::InvalidData,
        }
    }
}

/// Measurement resolution (user register bits 7 and 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resolution {
    /// 12-bit RH, 14-bit temperature (power-on default)
    #[default]
    Rh12Temp14,
    Rh8Temp12,
    Rh10Temp13,
    Rh11Temp11,
}

impl Resolution {
    fn bits(self) -> u8 {
        match self {
            Resolution::Rh12Temp14 => 0,
            Resolution::Rh8Temp12 => user_reg::RES0,
            Resolution::Rh10Temp13 => user_reg::RES1,
            Resolution::Rh11Temp11 => user_reg::RES1 | user_reg::RES0,
        }
    }

    fn from_user_reg(reg: u8) -> Self {
        match (reg & user_reg::RES1 != 0, reg & user_reg::RES0 != 0) {
            (false, false) => Resolution::Rh12Temp14,
            (false, true) => Resolution::Rh8Temp12,
            (true, false) => Resolution::Rh10Temp13,
            (true, true) => Resolution::Rh11Temp11,
        }
    }
}

/// Relative humidity in 0.01 %RH from a raw RH code
pub fn rh_x100_from_raw(raw: u16) -> i32 {
    (12_500 * i32::from(raw)) / 65_536 - 600
}

/// Temperature in 0.01 °C from a raw temperature code
pub fn celsius_x100_from_raw(raw: u16) -> i32 {
    (17_572 * i32::from(raw)) / 65_536 - 4_685
}

/// Si7021 driver
pub struct Si7021<B> {
    bus: B,
}

impl<B: I2cBus> Si7021<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Bus configuration for an Si7021 on the given lines
    pub fn bus_config(name: &str, scl: PinId, sda: PinId) -> Result<BusConfig, ConfigError> {
        BusConfig::new(name, scl, sda, CLOCK_PERIOD_MS)
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn free(self) -> B {
        self.bus
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), Si7021Error<B::Error>> {
        self.bus.write(ADDRESS, bytes).map_err(Si7021Error::Bus)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<(), Si7021Error<B::Error>> {
        self.bus.read(ADDRESS, buf).map_err(Si7021Error::Bus)
    }

    fn measure_word(&mut self, opcode: u8, delay_ms: u32) -> Result<u16, Si7021Error<B::Error>> {
        self.send(&[opcode])?;
        self.bus.sleep_ms(delay_ms);
        let mut raw = [0u8; WORD_FRAME_LEN];
        self.receive(&mut raw)?;
        let words = framing::decode_words(&raw, 1, CRC)?;
        Ok(words[0])
    }

    fn read_register(&mut self, opcode: u8) -> Result<u8, Si7021Error<B::Error>> {
        self.send(&[opcode])?;
        self.bus.sleep_ms(delay::REGISTER);
        let mut value = [0u8; 1];
        self.receive(&mut value)?;
        Ok(value[0])
    }

    /// Software reset; registers return to their power-on values
    pub fn reset(&mut self) -> Result<(), Si7021Error<B::Error>> {
        self.send(&[cmd::RESET])?;
        self.bus.sleep_ms(delay::RESET);
        Ok(())
    }

    /// Raw RH code
    pub fn measure_rh(&mut self) -> Result<u16, Si7021Error<B::Error>> {
        self.measure_word(cmd::MEASURE_RH, delay::MEASURE_RH)
    }

    /// Raw temperature code from a dedicated conversion
    pub fn measure_temperature(&mut self) -> Result<u16, Si7021Error<B::Error>> {
        self.measure_word(cmd::MEASURE_TEMPERATURE, delay::MEASURE_TEMPERATURE)
    }

    /// Raw temperature code captured during the last RH conversion
    ///
    /// This response has no checksum.
    pub fn temperature_from_previous_rh(&mut self) -> Result<u16, Si7021Error<B::Error>> {
        self.send(&[cmd::TEMPERATURE_FROM_PREVIOUS_RH])?;
        let mut raw = [0u8; 2];
        self.receive(&mut raw)?;
        Ok(u16::from_be_bytes(raw))
    }

    /// RH and temperature from a single conversion, in hundredths
    pub fn measure_converted(&mut self) -> Result<Climate, Si7021Error<B::Error>> {
        let rh = self.measure_rh()?;
        let temperature = self.temperature_from_previous_rh()?;
        let climate = Climate {
            rh_x100: rh_x100_from_raw(rh),
            celsius_x100: celsius_x100_from_raw(temperature),
        };
        debug!(
            "si7021: rh {} t {}",
            climate.rh_x100, climate.celsius_x100
        );
        Ok(climate)
    }

    pub fn user_register(&mut self) -> Result<u8, Si7021Error<B::Error>> {
        self.read_register(cmd::READ_USER_REG)
    }

    pub fn set_user_register(&mut self, value: u8) -> Result<(), Si7021Error<B::Error>> {
        self.send(&[cmd::WRITE_USER_REG, value])?;
        self.bus.sleep_ms(delay::REGISTER);
        Ok(())
    }

    pub fn heater_register(&mut self) -> Result<u8, Si7021Error<B::Error>> {
        self.read_register(cmd::READ_HEATER_REG)
    }

    pub fn set_heater_register(&mut self, value: u8) -> Result<(), Si7021Error<B::Error>> {
        self.send(&[cmd::WRITE_HEATER_REG, value])?;
        self.bus.sleep_ms(delay::REGISTER);
        Ok(())
    }

    pub fn heater_enable(&mut self) -> Result<(), Si7021Error<B::Error>> {
        let reg = self.user_register()?;
        self.set_user_register(reg | user_reg::HEATER)
    }

    pub fn heater_disable(&mut self) -> Result<(), Si7021Error<B::Error>> {
        let reg = self.user_register()?;
        self.set_user_register(reg & !user_reg::HEATER)
    }

    /// Set the heater current step (0..=15), keeping the reserved high bits
    pub fn heater_set_current(&mut self, level: u8) -> Result<(), Si7021Error<B::Error>> {
        if level > HEATER_CURRENT_MASK {
            return Err(Si7021Error::InvalidArgument);
        }
        let reg = self.heater_register()?;
        self.set_heater_register((reg & !HEATER_CURRENT_MASK) | level)
    }

    pub fn resolution(&mut self) -> Result<Resolution, Si7021Error<B::Error>> {
        Ok(Resolution::from_user_reg(self.user_register()?))
    }

    pub fn set_resolution(&mut self, resolution: Resolution) -> Result<(), Si7021Error<B::Error>> {
        let reg = self.user_register()?;
        let cleared = reg & !(user_reg::RES1 | user_reg::RES0);
        self.set_user_register(cleared | resolution.bits())
    }

    /// Electronic ID first access: SNA3..SNA0, each byte checksummed
    pub fn serial_a(&mut self) -> Result<[u8; 4], Si7021Error<B::Error>> {
        self.send(&cmd::READ_ID_FIRST.to_be_bytes())?;
        self.bus.sleep_ms(delay::ID);
        let mut raw = [0u8; 8];
        self.receive(&mut raw)?;
        let bytes = framing::decode_checked_bytes(&raw, CRC)?;
        let mut out = [0u8; 4];
        out.copy_from_slice(&bytes);
        Ok(out)
    }

    /// Electronic ID second access: SNB3..SNB0 as two checksummed words
    pub fn serial_b(&mut self) -> Result<[u8; 4], Si7021Error<B::Error>> {
        let words =
            framing::delayed_command_read(&mut self.bus, ADDRESS, cmd::READ_ID_SECOND, delay::ID, 2, CRC)?;
        let [b3, b2] = words[0].to_be_bytes();
        let [b1, b0] = words[1].to_be_bytes();
        Ok([b3, b2, b1, b0])
    }

    /// 64-bit serial number, SNA3 in the most significant byte
    pub fn serial_number(&mut self) -> Result<u64, Si7021Error<B::Error>> {
        let a = self.serial_a()?;
        let b = self.serial_b()?;
        Ok(u64::from_be_bytes([a[0], a[1], a[2], a[3], b[0], b[1], b[2], b[3]]))
    }

    /// Firmware revision byte (0xFF = 1.0, 0x20 = 2.0)
    pub fn firmware_revision(&mut self) -> Result<u8, Si7021Error<B::Error>> {
        self.send(&cmd::FIRMWARE_REVISION.to_be_bytes())?;
        self.bus.sleep_ms(delay::ID);
        let mut rev = [0u8; 1];
        self.receive(&mut rev)?;
        Ok(rev[0])
    }
}

impl<B: I2cBus> HumiditySensor for Si7021<B> {
    fn measure_climate(&mut self) -> Result<Climate, SensorError> {
        Ok(self.measure_converted()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airwire_bus::sim::{SimDelay, SimPins};
    use airwire_bus::{BusError, Phase, SoftI2c, TransferError};

    type SimBus = SoftI2c<SimPins, SimDelay>;

    fn sensor() -> Si7021<SimBus> {
        let config = Si7021::<SimBus>::bus_config("si7021", 4, 5).unwrap();
        let mut bus = SoftI2c::new(config, SimPins::new(4, 5, ADDRESS), SimDelay::new());
        bus.init().unwrap();
        Si7021::new(bus)
    }

    fn respond(si: &mut Si7021<SimBus>, bytes: &[u8]) {
        si.bus_mut().pins_mut().respond(bytes);
    }

    fn writes(si: &Si7021<SimBus>) -> &[std::vec::Vec<u8>] {
        si.bus.pins().writes()
    }

    #[test]
    fn test_conversions() {
        assert_eq!(rh_x100_from_raw(0x664E), 4395);
        assert_eq!(celsius_x100_from_raw(0x683A), 2469);
        assert_eq!(rh_x100_from_raw(0), -600);
        assert_eq!(celsius_x100_from_raw(0), -4685);
    }

    #[test]
    fn test_measure_converted() {
        let mut si = sensor();
        respond(&mut si, &[0x66, 0x4E, 0x2D, 0x68, 0x3A]);
        let climate = si.measure_converted().unwrap();
        assert_eq!(
            climate,
            Climate {
                rh_x100: 4395,
                celsius_x100: 2469
            }
        );
        assert_eq!(writes(&si), &[std::vec![0xE5], std::vec![0xE0]]);
        assert!(si.bus.delay().elapsed_ms() >= u64::from(delay::MEASURE_RH));
    }

    #[test]
    fn test_measure_temperature_checks_crc() {
        let mut si = sensor();
        respond(&mut si, &[0x68, 0x3A, 0x7C]);
        assert_eq!(si.measure_temperature(), Ok(0x683A));

        respond(&mut si, &[0x68, 0x3A, 0x7D]);
        assert_eq!(
            si.measure_temperature(),
            Err(Si7021Error::Framing(FramingError::ChecksumMismatch { word: 0 }))
        );
        assert_eq!(si.measure_climate(), Err(SensorError::Checksum));
    }

    #[test]
    fn test_heater_bits() {
        let mut si = sensor();
        respond(&mut si, &[0x3A]);
        si.heater_enable().unwrap();
        assert_eq!(si.bus.pins().last_write(), Some(&[0xE6, 0x3E][..]));

        respond(&mut si, &[0x3E]);
        si.heater_disable().unwrap();
        assert_eq!(si.bus.pins().last_write(), Some(&[0xE6, 0x3A][..]));
    }

    #[test]
    fn test_heater_current() {
        let mut si = sensor();
        respond(&mut si, &[0xF3]);
        si.heater_set_current(0x09).unwrap();
        assert_eq!(si.bus.pins().last_write(), Some(&[0x51, 0xF9][..]));
        assert_eq!(si.heater_set_current(0x10), Err(Si7021Error::InvalidArgument));
    }

    #[test]
    fn test_resolution_bits() {
        let mut si = sensor();
        respond(&mut si, &[0x3A]);
        si.set_resolution(Resolution::Rh11Temp11).unwrap();
        assert_eq!(si.bus.pins().last_write(), Some(&[0xE6, 0xBB][..]));

        respond(&mut si, &[0xBB]);
        si.set_resolution(Resolution::Rh10Temp13).unwrap();
        assert_eq!(si.bus.pins().last_write(), Some(&[0xE6, 0xBA][..]));

        respond(&mut si, &[0x3B]);
        assert_eq!(si.resolution(), Ok(Resolution::Rh8Temp12));
    }

    #[test]
    fn test_serial_number() {
        let mut si = sensor();
        let sna = [0x12u8, 0x34, 0x56, 0x78];
        let mut first = std::vec::Vec::new();
        for byte in sna {
            first.push(byte);
            first.push(CRC.checksum(&[byte]));
        }
        respond(&mut si, &first);
        si.bus_mut().pins_mut().respond_words(&[0x0615, 0xFFFF], CRC);

        assert_eq!(si.serial_number(), Ok(0x1234_5678_0615_FFFF));
        assert_eq!(writes(&si), &[std::vec![0xFA, 0x0F], std::vec![0xFC, 0xC9]]);
    }

    #[test]
    fn test_firmware_revision() {
        let mut si = sensor();
        respond(&mut si, &[0x20]);
        assert_eq!(si.firmware_revision(), Ok(0x20));
        assert_eq!(writes(&si), &[std::vec![0x84, 0xB8]]);
    }

    #[test]
    fn test_register_writes_wait() {
        let mut si = sensor();

        let start = si.bus.delay().elapsed_ms();
        si.bus_mut().write(ADDRESS, &[0xE6, 0x3A]).unwrap();
        let bare = si.bus.delay().elapsed_ms() - start;

        let start = si.bus.delay().elapsed_ms();
        si.set_user_register(0x3A).unwrap();
        let user = si.bus.delay().elapsed_ms() - start;
        assert!(user >= bare + u64::from(delay::REGISTER));

        let start = si.bus.delay().elapsed_ms();
        si.set_heater_register(0x03).unwrap();
        let heater = si.bus.delay().elapsed_ms() - start;
        assert!(heater >= bare + u64::from(delay::REGISTER));
        assert_eq!(si.bus.pins().last_write(), Some(&[0x51, 0x03][..]));
    }

    #[test]
    fn test_reset_waits() {
        let mut si = sensor();
        si.reset().unwrap();
        assert_eq!(si.bus.pins().last_write(), Some(&[0xFE][..]));
        assert!(si.bus.delay().elapsed_ms() >= u64::from(delay::RESET));
    }

    #[test]
    fn test_absent_device() {
        let mut si = sensor();
        si.bus_mut().pins_mut().set_nack_address(true);
        assert_eq!(
            si.measure_rh(),
            Err(Si7021Error::Bus(TransferError::new(Phase::Address, BusError::Nack)))
        );
        assert_eq!(si.measure_climate(), Err(SensorError::Bus));
    }
}
