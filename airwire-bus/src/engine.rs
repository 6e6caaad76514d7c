//! Bit-level bus engine
//!
//! [`SoftI2c`] owns a pin driver, a delay source and a [`BusConfig`], and
//! implements the I2C primitives on top of them. Lines are only ever
//! released (input with pull-up) or driven low.
//!
//! Per transaction the engine moves through
//! `Idle -> Started -> (8 bits + ACK)* -> Stopped`; the transaction layer
//! in [`crate::transaction`] composes the primitives.

use airwire_hal::{Level, PinDriver};
use embedded_hal::delay::DelayNs;

use crate::config::BusConfig;
use crate::error::BusError;
use crate::retry::Retry;

/// Software I2C master over two open-drain GPIO lines
///
/// Exclusively owns its pins. Callers must serialize access; one
/// transaction at a time per engine.
pub struct SoftI2c<P, D> {
    config: BusConfig,
    pins: P,
    delay: D,
    stretch: Retry,
}

impl<P: PinDriver, D: DelayNs> SoftI2c<P, D> {
    /// Create an engine. Pins are left untouched until [`Self::init`].
    pub fn new(config: BusConfig, pins: P, delay: D) -> Self {
        let stretch = config.stretch_retry();
        Self {
            config,
            pins,
            delay,
            stretch,
        }
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    pub fn pins(&self) -> &P {
        &self.pins
    }

    pub fn pins_mut(&mut self) -> &mut P {
        &mut self.pins
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }

    /// Reset both pins, then release both lines to their pull-ups
    ///
    /// Idempotent: leaves the bus idle.
    pub fn init(&mut self) -> Result<(), BusError> {
        let (scl, sda) = (self.config.scl(), self.config.sda());
        self.pins.reset(scl);
        self.pins.reset(sda);
        self.scl_release()?;
        self.sda_release()?;
        debug!("bus {}: init scl={} sda={}", self.config.name(), scl, sda);
        Ok(())
    }

    /// Release both lines, then reset both pins to their neutral state
    ///
    /// Idempotent. Pins are reset even if releasing fails; the first error
    /// is returned.
    pub fn release(&mut self) -> Result<(), BusError> {
        let scl = self.scl_release();
        let sda = self.sda_release();
        self.pins.reset(self.config.scl());
        self.pins.reset(self.config.sda());
        debug!("bus {}: released", self.config.name());
        scl.and(sda)
    }

    /// Release the bus and hand back the pin driver and delay
    pub fn free(mut self) -> (P, D) {
        if let Err(e) = self.release() {
            warn!("bus {}: release failed: {}", self.config.name(), e);
        }
        (self.pins, self.delay)
    }

    /// Generate a START condition
    ///
    /// Expects an idle bus. Leaves SCL and SDA both driven low.
    pub fn start(&mut self) -> Result<(), BusError> {
        self.scl_release()?;
        self.wait_for_clock_high()?;
        self.sda_low()?;
        self.half_delay();
        self.scl_low()?;
        self.half_delay();
        Ok(())
    }

    /// Generate a STOP condition
    ///
    /// Leaves both lines released.
    pub fn stop(&mut self) -> Result<(), BusError> {
        self.sda_low()?;
        self.half_delay();
        self.scl_release()?;
        self.half_delay();
        self.sda_release()?;
        self.half_delay();
        Ok(())
    }

    /// Wait for a slave to stop stretching the clock
    ///
    /// Polls SCL once per clock period until it reads high, for at most the
    /// configured stretch timeout.
    pub fn wait_for_clock_high(&mut self) -> Result<(), BusError> {
        let scl = self.config.scl();
        let pins = &mut self.pins;
        let released = self.stretch.run(&mut self.delay, || {
            Ok::<_, BusError>(pins.read_level(scl)?.is_high().then_some(()))
        })?;

        match released {
            Some(()) => Ok(()),
            None => {
                debug!(
                    "bus {}: clock held low for {} ms",
                    self.config.name(),
                    self.stretch.budget_ms()
                );
                Err(BusError::ClockTimeout)
            }
        }
    }

    /// Write one byte MSB first and read the slave's acknowledge
    ///
    /// Returns [`BusError::Nack`] if the slave left SDA high in the ACK slot.
    /// Ends with SCL driven low and SDA released.
    pub fn write_byte(&mut self, byte: u8) -> Result<(), BusError> {
        for bit in (0..8).rev() {
            self.scl_low()?;
            if byte & (1 << bit) != 0 {
                self.sda_release()?;
            } else {
                self.sda_low()?;
            }
            self.half_delay();
            self.scl_release()?;
            self.half_delay();
            self.wait_for_clock_high()?;
        }

        // ACK slot: the slave owns SDA
        self.scl_low()?;
        self.sda_release()?;
        self.half_delay();
        self.scl_release()?;
        self.wait_for_clock_high()?;
        let ack = self.pins.read_level(self.config.sda())?;
        self.scl_low()?;

        trace!("bus {}: wrote {=u8:#x} ack={}", self.config.name(), byte, ack.is_low());
        match ack {
            Level::Low => Ok(()),
            Level::High => Err(BusError::Nack),
        }
    }

    /// Read one byte MSB first, then ACK it or NACK it
    ///
    /// `send_ack = false` tells the slave this was the last byte. Ends with
    /// SCL driven low and SDA released.
    pub fn read_byte(&mut self, send_ack: bool) -> Result<u8, BusError> {
        let mut byte = 0u8;

        self.sda_release()?;
        for bit in (0..8).rev() {
            self.half_delay();
            self.scl_release()?;
            self.wait_for_clock_high()?;
            let level = self.pins.read_level(self.config.sda())?;
            byte |= level.bit() << bit;
            self.scl_low()?;
        }

        if send_ack {
            self.sda_low()?;
        } else {
            self.sda_release()?;
        }
        self.half_delay();
        self.scl_release()?;
        self.half_delay();
        self.wait_for_clock_high()?;
        self.scl_low()?;
        self.sda_release()?;

        trace!("bus {}: read {=u8:#x} ack={}", self.config.name(), byte, send_ack);
        Ok(byte)
    }

    /// Block for `ms` milliseconds on the engine's delay source
    pub fn sleep_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    fn half_delay(&mut self) {
        self.delay.delay_ms(self.config.half_period_ms());
    }

    fn scl_release(&mut self) -> Result<(), BusError> {
        Ok(self.pins.set_input_pullup(self.config.scl())?)
    }

    fn scl_low(&mut self) -> Result<(), BusError> {
        Ok(self.pins.set_output_low(self.config.scl())?)
    }

    fn sda_release(&mut self) -> Result<(), BusError> {
        Ok(self.pins.set_input_pullup(self.config.sda())?)
    }

    fn sda_low(&mut self) -> Result<(), BusError> {
        Ok(self.pins.set_output_low(self.config.sda())?)
    }
}
