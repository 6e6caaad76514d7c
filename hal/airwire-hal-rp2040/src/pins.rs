//! Open-drain bus lines on RP2040 GPIOs
//!
//! Pin numbers come from the board config, so pins are handed out by number
//! from a [`PinBank`] and wrapped into [`FlexPins`], which implements the
//! shared [`PinDriver`] trait.

use airwire_hal::{InvalidPin, Level, PinDriver, PinId};
use embassy_rp::gpio::{AnyPin, Flex, Pull};
use embassy_rp::Peri;

use crate::gpio::GPIO_COUNT;

/// Every GPIO, taken out of the peripherals so they can be claimed by number
pub struct PinBank {
    pins: [Option<Peri<'static, AnyPin>>; GPIO_COUNT],
}

impl PinBank {
    /// Move all GPIO pins out of the peripherals struct
    pub fn new(p: embassy_rp::Peripherals) -> Self {
        Self {
            pins: [
                Some(p.PIN_0.into()),
                Some(p.PIN_1.into()),
                Some(p.PIN_2.into()),
                Some(p.PIN_3.into()),
                Some(p.PIN_4.into()),
                Some(p.PIN_5.into()),
                Some(p.PIN_6.into()),
                Some(p.PIN_7.into()),
                Some(p.PIN_8.into()),
                Some(p.PIN_9.into()),
                Some(p.PIN_10.into()),
                Some(p.PIN_11.into()),
                Some(p.PIN_12.into()),
                Some(p.PIN_13.into()),
                Some(p.PIN_14.into()),
                Some(p.PIN_15.into()),
                Some(p.PIN_16.into()),
                Some(p.PIN_17.into()),
                Some(p.PIN_18.into()),
                Some(p.PIN_19.into()),
                Some(p.PIN_20.into()),
                Some(p.PIN_21.into()),
                Some(p.PIN_22.into()),
                Some(p.PIN_23.into()),
                Some(p.PIN_24.into()),
                Some(p.PIN_25.into()),
                Some(p.PIN_26.into()),
                Some(p.PIN_27.into()),
                Some(p.PIN_28.into()),
                Some(p.PIN_29.into()),
            ],
        }
    }

    /// Take a pin by number
    pub fn take(&mut self, pin: PinId) -> Result<Peri<'static, AnyPin>, InvalidPin> {
        self.pins
            .get_mut(usize::from(pin))
            .and_then(Option::take)
            .ok_or(InvalidPin(pin))
    }

    pub fn is_available(&self, pin: PinId) -> bool {
        matches!(self.pins.get(usize::from(pin)), Some(Some(_)))
    }

    /// Return a pin to the bank
    pub fn return_pin(&mut self, pin: PinId, peri: Peri<'static, AnyPin>) {
        if let Some(slot) = self.pins.get_mut(usize::from(pin)) {
            *slot = Some(peri);
        }
    }
}

/// The clock and data lines of one bus
pub struct FlexPins<'d> {
    scl_id: PinId,
    scl: Flex<'d>,
    sda_id: PinId,
    sda: Flex<'d>,
}

impl<'d> FlexPins<'d> {
    /// Wrap two GPIOs; both start released
    pub fn new(
        scl_id: PinId,
        scl: Peri<'d, AnyPin>,
        sda_id: PinId,
        sda: Peri<'d, AnyPin>,
    ) -> Self {
        let mut pins = Self {
            scl_id,
            scl: Flex::new(scl),
            sda_id,
            sda: Flex::new(sda),
        };
        release(&mut pins.scl);
        release(&mut pins.sda);
        pins
    }

    /// Claim both lines from a pin bank
    pub fn take(bank: &mut PinBank, scl: PinId, sda: PinId) -> Result<Self, InvalidPin> {
        let scl_pin = bank.take(scl)?;
        let sda_pin = match bank.take(sda) {
            Ok(pin) => pin,
            Err(e) => {
                bank.return_pin(scl, scl_pin);
                return Err(e);
            }
        };
        Ok(Self::new(scl, scl_pin, sda, sda_pin))
    }

    fn line(&mut self, pin: PinId) -> Result<&mut Flex<'d>, InvalidPin> {
        if pin == self.scl_id {
            Ok(&mut self.scl)
        } else if pin == self.sda_id {
            Ok(&mut self.sda)
        } else {
            Err(InvalidPin(pin))
        }
    }
}

fn release(flex: &mut Flex<'_>) {
    flex.set_pull(Pull::Up);
    flex.set_as_input();
}

impl PinDriver for FlexPins<'_> {
    fn set_input_pullup(&mut self, pin: PinId) -> Result<(), InvalidPin> {
        release(self.line(pin)?);
        Ok(())
    }

    fn set_output_low(&mut self, pin: PinId) -> Result<(), InvalidPin> {
        let flex = self.line(pin)?;
        // Latch low before enabling the output driver
        flex.set_low();
        flex.set_as_output();
        Ok(())
    }

    fn read_level(&mut self, pin: PinId) -> Result<Level, InvalidPin> {
        Ok(Level::from(self.line(pin)?.is_high()))
    }

    fn reset(&mut self, pin: PinId) {
        if let Ok(flex) = self.line(pin) {
            flex.set_pull(Pull::None);
            flex.set_as_input();
        }
    }
}
