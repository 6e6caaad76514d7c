//! Addressed transactions
//!
//! Each call is bounded by one START and one STOP. Any failure after START
//! triggers a best-effort STOP before the original error is returned, so the
//! bus is left idle for the next caller.

use airwire_hal::{I2cBus, PinDriver};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorType, I2c, Operation, SevenBitAddress};

use crate::engine::SoftI2c;
use crate::error::{BusError, Phase, TransferError};

/// Highest 7-bit address
pub const MAX_ADDRESS: u8 = 0x7F;

fn check_address(address: u8) -> Result<(), TransferError> {
    if address > MAX_ADDRESS {
        return Err(TransferError::new(
            Phase::Address,
            BusError::InvalidAddress(address),
        ));
    }
    Ok(())
}

fn in_phase(phase: Phase) -> impl FnOnce(BusError) -> TransferError {
    move |kind| TransferError::new(phase, kind)
}

impl<P: PinDriver, D: DelayNs> SoftI2c<P, D> {
    /// Write `data` to the slave at `address`
    pub fn write(&mut self, address: u8, data: &[u8]) -> Result<(), TransferError> {
        check_address(address)?;
        let result = self.write_frame(address, data);
        self.finish(result)?;
        debug!("bus {}: wrote {} bytes to {=u8:#x}", self.config().name(), data.len(), address);
        Ok(())
    }

    /// Read `buf.len()` bytes from the slave at `address`
    ///
    /// The last byte is NACKed. An empty buffer sends only the address byte,
    /// then STOP. A slave that acks a read address starts driving SDA, so
    /// use `probe` for presence checks.
    pub fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), TransferError> {
        check_address(address)?;
        let result = self.read_frame(address, buf, true);
        self.finish(result)?;
        debug!("bus {}: read {} bytes from {=u8:#x}", self.config().name(), buf.len(), address);
        Ok(())
    }

    /// Check whether a slave answers at `address`
    ///
    /// Sends a zero-length write, so the slave never owns SDA and the STOP
    /// always lands.
    pub fn probe(&mut self, address: u8) -> Result<bool, TransferError> {
        match self.write(address, &[]) {
            Ok(()) => Ok(true),
            Err(e) if e.is_nack() && e.phase == Phase::Address => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn write_frame(&mut self, address: u8, data: &[u8]) -> Result<(), TransferError> {
        self.start().map_err(in_phase(Phase::Start))?;
        self.write_byte(address << 1)
            .map_err(in_phase(Phase::Address))?;
        for (i, byte) in data.iter().enumerate() {
            self.write_byte(*byte)
                .map_err(in_phase(Phase::Data(i)))?;
        }
        Ok(())
    }

    /// `nack_last` is false when another read follows without STOP
    fn read_frame(
        &mut self,
        address: u8,
        buf: &mut [u8],
        nack_last: bool,
    ) -> Result<(), TransferError> {
        self.start().map_err(in_phase(Phase::Start))?;
        self.write_byte((address << 1) | 1)
            .map_err(in_phase(Phase::Address))?;
        self.read_into(buf, nack_last)
    }

    fn read_into(&mut self, buf: &mut [u8], nack_last: bool) -> Result<(), TransferError> {
        let count = buf.len();
        for (i, slot) in buf.iter_mut().enumerate() {
            let send_ack = i + 1 < count || !nack_last;
            *slot = self
                .read_byte(send_ack)
                .map_err(in_phase(Phase::Data(i)))?;
        }
        Ok(())
    }

    /// STOP after a frame, keeping the frame's error if it failed
    fn finish(&mut self, result: Result<(), TransferError>) -> Result<(), TransferError> {
        match result {
            Ok(()) => self.stop().map_err(in_phase(Phase::Stop)),
            Err(e) => {
                if let Err(stop) = self.stop() {
                    warn!("bus {}: cleanup STOP failed: {}", self.config().name(), stop);
                }
                debug!("bus {}: transfer failed: {}", self.config().name(), e);
                Err(e)
            }
        }
    }
}

impl<P: PinDriver, D: DelayNs> I2cBus for SoftI2c<P, D> {
    type Error = TransferError;

    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error> {
        SoftI2c::write(self, address, data)
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        SoftI2c::read(self, address, buf)
    }

    fn sleep_ms(&mut self, ms: u32) {
        SoftI2c::sleep_ms(self, ms)
    }
}

impl<P: PinDriver, D: DelayNs> ErrorType for SoftI2c<P, D> {
    type Error = TransferError;
}

impl<P: PinDriver, D: DelayNs> I2c<SevenBitAddress> for SoftI2c<P, D> {
    /// Run `operations` as one transaction
    ///
    /// A repeated START separates a write from a read and vice versa.
    /// Adjacent reads are merged, so only the last byte before a change of
    /// direction or the final STOP is NACKed.
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        check_address(address)?;
        let result = self.run_operations(address, operations);
        self.finish(result)
    }
}

impl<P: PinDriver, D: DelayNs> SoftI2c<P, D> {
    fn run_operations(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), TransferError> {
        let count = operations.len();
        let mut previous_read: Option<bool> = None;
        let mut index: usize = 0;

        for i in 0..count {
            let next_is_read = match operations.get(i + 1) {
                Some(Operation::Read(_)) => Some(true),
                Some(Operation::Write(_)) => Some(false),
                None => None,
            };

            match &mut operations[i] {
                Operation::Write(data) => {
                    if previous_read != Some(false) {
                        self.start().map_err(in_phase(Phase::Start))?;
                        self.write_byte(address << 1)
                            .map_err(in_phase(Phase::Address))?;
                        index = 0;
                    }
                    for byte in data.iter() {
                        self.write_byte(*byte)
                            .map_err(in_phase(Phase::Data(index)))?;
                        index = index.saturating_add(1);
                    }
                    previous_read = Some(false);
                }
                Operation::Read(buf) => {
                    let nack_last = next_is_read != Some(true);
                    if previous_read != Some(true) {
                        self.read_frame(address, buf, nack_last)?;
                    } else {
                        self.read_into(buf, nack_last)?;
                    }
                    previous_read = Some(true);
                }
            }
        }

        // A transaction with no operations still addresses the slave
        if count == 0 {
            self.start().map_err(in_phase(Phase::Start))?;
            self.write_byte(address << 1)
                .map_err(in_phase(Phase::Address))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BusConfig;
    use crate::sim::{Event, LineState, SimDelay, SimPins};

    const SCL: u8 = 4;
    const SDA: u8 = 5;

    fn bus(address: u8) -> SoftI2c<SimPins, SimDelay> {
        let config = BusConfig::new("test", SCL, SDA, 2).unwrap();
        let mut bus = SoftI2c::new(config, SimPins::new(SCL, SDA, address), SimDelay::new());
        bus.init().unwrap();
        bus
    }

    fn reads(bus: &SoftI2c<SimPins, SimDelay>) -> std::vec::Vec<(u8, bool)> {
        bus.pins()
            .events()
            .iter()
            .filter_map(|e| match e {
                Event::Read { byte, master_ack } => Some((*byte, *master_ack)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_single_byte_read() {
        let mut bus = bus(0x58);
        bus.pins_mut().respond(&[0xD4]);

        let mut buf = [0u8; 1];
        assert_eq!(bus.read(0x58, &mut buf), Ok(()));
        assert_eq!(buf, [0xD4]);
        assert_eq!(
            bus.pins().events(),
            &[
                Event::Start,
                Event::Address {
                    address: 0x58,
                    read: true,
                    acked: true
                },
                Event::Read {
                    byte: 0xD4,
                    master_ack: false
                },
                Event::Stop,
            ]
        );
    }

    #[test]
    fn test_last_byte_nacked() {
        for count in 1..=6usize {
            let mut bus = bus(0x58);
            let data = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66];
            bus.pins_mut().respond(&data[..count]);

            let mut buf = [0u8; 6];
            bus.read(0x58, &mut buf[..count]).unwrap();
            assert_eq!(&buf[..count], &data[..count]);

            let acks = reads(&bus);
            assert_eq!(acks.len(), count);
            for (i, (_, ack)) in acks.iter().enumerate() {
                assert_eq!(*ack, i + 1 < count, "byte {} of {}", i, count);
            }
        }
    }

    #[test]
    fn test_write_sends_address_then_data() {
        let mut bus = bus(0x40);
        assert_eq!(bus.write(0x40, &[0xE5, 0x01]), Ok(()));
        assert_eq!(bus.pins().last_write(), Some(&[0xE5, 0x01][..]));
        assert_eq!(bus.pins().events().last(), Some(&Event::Stop));
    }

    #[test]
    fn test_address_nack_aborts_write_and_stops() {
        let mut bus = bus(0x40);
        bus.pins_mut().set_nack_address(true);

        let err = bus.write(0x40, &[0x01]).unwrap_err();
        assert_eq!(err, TransferError::new(Phase::Address, BusError::Nack));
        assert_eq!(
            bus.pins().events(),
            &[
                Event::Start,
                Event::Address {
                    address: 0x40,
                    read: false,
                    acked: false
                },
                Event::Stop,
            ]
        );
        assert_eq!(bus.pins().master_scl(), LineState::Released);
        assert_eq!(bus.pins().master_sda(), LineState::Released);
    }

    #[test]
    fn test_data_nack_reports_index() {
        let mut bus = bus(0x40);
        bus.pins_mut().set_nack_data_at(Some(1));

        let err = bus.write(0x40, &[0xAA, 0xBB, 0xCC]).unwrap_err();
        assert_eq!(err.phase, Phase::Data(1));
        assert!(err.is_nack());
        // 0xCC is never sent
        assert!(!bus
            .pins()
            .events()
            .contains(&Event::Write {
                byte: 0xCC,
                acked: true
            }));
        assert_eq!(bus.pins().events().last(), Some(&Event::Stop));
    }

    #[test]
    fn test_zero_length_read_addresses_only() {
        let mut bus = bus(0x58);
        assert_eq!(bus.read(0x58, &mut []), Ok(()));
        assert_eq!(
            bus.pins().events(),
            &[
                Event::Start,
                Event::Address {
                    address: 0x58,
                    read: true,
                    acked: true
                },
                Event::Stop,
            ]
        );
        assert!(reads(&bus).is_empty());
    }

    #[test]
    fn test_probe() {
        let mut bus = bus(0x58);
        assert_eq!(bus.probe(0x58), Ok(true));
        assert_eq!(bus.probe(0x59), Ok(false));
    }

    #[test]
    fn test_presence_check_leaves_bus_usable() {
        let mut bus = bus(0x40);
        // a read-direction check would have the slave shift this out
        bus.pins_mut().respond(&[0x3A]);

        assert_eq!(bus.probe(0x40), Ok(true));
        assert_eq!(
            bus.pins().events(),
            &[
                Event::Start,
                Event::Address {
                    address: 0x40,
                    read: false,
                    acked: true
                },
                Event::Stop,
            ]
        );

        bus.pins_mut().clear_events();
        assert_eq!(bus.write(0x40, &[0xE5]), Ok(()));
        assert_eq!(bus.pins().last_write(), Some(&[0xE5][..]));
        assert_eq!(bus.pins().events().last(), Some(&Event::Stop));
        assert!(reads(&bus).is_empty());
    }

    #[test]
    fn test_data_nack_index_beyond_u16() {
        let mut bus = bus(0x40);
        bus.pins_mut().set_nack_data_at(Some(65_537));

        let data = std::vec![0x5Au8; 65_540];
        let err = bus.write(0x40, &data).unwrap_err();
        assert_eq!(err, TransferError::new(Phase::Data(65_537), BusError::Nack));
    }

    #[test]
    fn test_invalid_address_rejected_before_start() {
        let mut bus = bus(0x58);
        let err = bus.write(0x80, &[0x00]).unwrap_err();
        assert_eq!(err.bus_error(), BusError::InvalidAddress(0x80));
        assert!(bus.pins().events().is_empty());
    }

    #[test]
    fn test_clock_timeout_still_attempts_stop() {
        let mut bus = bus(0x58);
        bus.pins_mut().respond(&[0x01, 0x02]);
        bus.pins_mut().hold_clock_low();

        let mut buf = [0u8; 2];
        let err = bus.read(0x58, &mut buf).unwrap_err();
        assert_eq!(err, TransferError::new(Phase::Start, BusError::ClockTimeout));
        // STOP was attempted: the master released both lines
        assert_eq!(bus.pins().master_sda(), LineState::Released);
        assert_eq!(bus.pins().master_scl(), LineState::Released);
    }

    #[test]
    fn test_invalid_pin_surfaces_from_start() {
        let config = BusConfig::new("bad", 30, SDA, 2).unwrap();
        let mut bus = SoftI2c::new(config, SimPins::new(SCL, SDA, 0x58), SimDelay::new());
        let err = bus.write(0x58, &[0x00]).unwrap_err();
        assert_eq!(err, TransferError::new(Phase::Start, BusError::InvalidPin(30)));
    }

    #[test]
    fn test_i2c_bus_trait_forwards() {
        fn ping<B: I2cBus>(bus: &mut B) -> Result<(), B::Error> {
            bus.write(0x40, &[0xFE])?;
            bus.sleep_ms(15);
            Ok(())
        }

        let mut bus = bus(0x40);
        let before = bus.delay().elapsed_ms();
        ping(&mut bus).unwrap();
        assert!(bus.delay().elapsed_ms() >= before + 15);
        assert_eq!(bus.pins().last_write(), Some(&[0xFE][..]));
    }

    #[test]
    fn test_embedded_hal_write_read_uses_repeated_start() {
        let mut bus = bus(0x40);
        bus.pins_mut().respond(&[0x3A, 0x01]);

        let mut buf = [0u8; 2];
        I2c::write_read(&mut bus, 0x40, &[0xE7], &mut buf).unwrap();
        assert_eq!(buf, [0x3A, 0x01]);

        let starts = bus
            .pins()
            .events()
            .iter()
            .filter(|e| **e == Event::Start)
            .count();
        assert_eq!(starts, 2);
        assert_eq!(reads(&bus), [(0x3A, true), (0x01, false)]);
        assert_eq!(bus.pins().events().last(), Some(&Event::Stop));
    }

    #[test]
    fn test_embedded_hal_adjacent_reads_merge() {
        let mut bus = bus(0x40);
        bus.pins_mut().respond(&[1, 2, 3]);

        let mut a = [0u8; 1];
        let mut b = [0u8; 2];
        bus.transaction(0x40, &mut [Operation::Read(&mut a), Operation::Read(&mut b)])
            .unwrap();
        assert_eq!((a, b), ([1], [2, 3]));
        assert_eq!(reads(&bus), [(1, true), (2, true), (3, false)]);
    }

    #[test]
    fn test_embedded_hal_nack_kind() {
        use embedded_hal::i2c::{Error, ErrorKind, NoAcknowledgeSource};

        let mut bus = bus(0x40);
        let err = I2c::write(&mut bus, 0x41, &[0x00]).unwrap_err();
        assert_eq!(
            Error::kind(&err),
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
        );
    }
}
