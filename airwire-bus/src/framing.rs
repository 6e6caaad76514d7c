//! Word/CRC framing
//!
//! Sensirion-style devices exchange 16-bit big-endian words, each followed
//! by a CRC8 over its two bytes. Commands are a bare 16-bit opcode followed
//! by zero or more checksummed argument words.
//!
//! Frame layout for `n` words:
//! ```text
//! [MSB0][LSB0][CRC0] [MSB1][LSB1][CRC1] ...
//! ```

use airwire_hal::I2cBus;
use heapless::Vec;

/// CRC8 generator polynomial (x^8 + x^5 + x^4 + 1)
pub const CRC8_POLYNOMIAL: u8 = 0x31;

/// Bytes per word on the wire, including the CRC
pub const WORD_FRAME_LEN: usize = 3;

/// Maximum words per read
pub const MAX_WORDS: usize = 16;

/// Maximum argument words per command
pub const MAX_ARGS: usize = 8;

/// Largest encoded command: opcode plus framed arguments
pub const MAX_COMMAND_LEN: usize = 2 + MAX_ARGS * WORD_FRAME_LEN;

/// Largest framed read
pub const MAX_READ_LEN: usize = MAX_WORDS * WORD_FRAME_LEN;

/// Largest byte-checksummed read (data byte + CRC pairs)
pub const MAX_CHECKED_BYTES: usize = MAX_READ_LEN / 2;

/// CRC8 over `bytes`, MSB first, no final XOR
pub fn crc8(bytes: &[u8], init: u8) -> u8 {
    let mut crc = init;
    for &byte in bytes {
        crc ^= byte;
        for _ in 0..8 {
            if crc & 0x80 != 0 {
                crc = (crc << 1) ^ CRC8_POLYNOMIAL;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

/// CRC8 parameters for one device family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Crc8 {
    pub init: u8,
}

impl Crc8 {
    /// Sensirion gas sensors (SGP30): init 0xFF
    pub const SENSIRION: Self = Self { init: 0xFF };

    /// Silicon Labs humidity sensors (Si7021): init 0x00
    pub const SILABS: Self = Self { init: 0x00 };

    pub fn checksum(&self, bytes: &[u8]) -> u8 {
        crc8(bytes, self.init)
    }
}

/// Framing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FramingError {
    /// CRC of the given word (or byte) did not match
    ChecksumMismatch { word: u8 },
    /// Raw buffer length does not match the requested word count
    Length,
    /// More words than a single frame can carry
    TooManyWords,
}

/// Either the transport failed or the data failed its checksum
///
/// Transport errors may be worth a retry; a checksum error means the data
/// read is untrustworthy and the whole transaction must be repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError<E> {
    Transport(E),
    Framing(FramingError),
}

impl<E> From<FramingError> for CommandError<E> {
    fn from(err: FramingError) -> Self {
        CommandError::Framing(err)
    }
}

/// Build `cmd` (big-endian) followed by each argument word and its CRC
pub fn encode_command(
    cmd: u16,
    args: &[u16],
    crc: Crc8,
) -> Result<Vec<u8, MAX_COMMAND_LEN>, FramingError> {
    if args.len() > MAX_ARGS {
        return Err(FramingError::TooManyWords);
    }

    let mut buf = Vec::new();
    buf.extend_from_slice(&cmd.to_be_bytes())
        .map_err(|_| FramingError::TooManyWords)?;
    for arg in args {
        let bytes = arg.to_be_bytes();
        buf.extend_from_slice(&bytes)
            .map_err(|_| FramingError::TooManyWords)?;
        buf.push(crc.checksum(&bytes)).map_err(|_| FramingError::TooManyWords)?;
    }
    Ok(buf)
}

/// Validate and strip the CRC of each 3-byte group
///
/// Aborts on the first mismatch; no partial data is returned.
pub fn decode_words(
    raw: &[u8],
    num_words: usize,
    crc: Crc8,
) -> Result<Vec<u16, MAX_WORDS>, FramingError> {
    if num_words > MAX_WORDS {
        return Err(FramingError::TooManyWords);
    }
    if raw.len() != num_words * WORD_FRAME_LEN {
        return Err(FramingError::Length);
    }

    let mut words = Vec::new();
    for (i, group) in raw.chunks_exact(WORD_FRAME_LEN).enumerate() {
        let (data, check) = group.split_at(2);
        if crc.checksum(data) != check[0] {
            return Err(FramingError::ChecksumMismatch { word: i as u8 });
        }
        words
            .push(u16::from_be_bytes([data[0], data[1]]))
            .map_err(|_| FramingError::TooManyWords)?;
    }
    Ok(words)
}

/// Validate pairs of `[byte, crc(byte)]` and return the data bytes
pub fn decode_checked_bytes(
    raw: &[u8],
    crc: Crc8,
) -> Result<Vec<u8, MAX_CHECKED_BYTES>, FramingError> {
    if raw.len() % 2 != 0 {
        return Err(FramingError::Length);
    }
    if raw.len() / 2 > MAX_CHECKED_BYTES {
        return Err(FramingError::TooManyWords);
    }

    let mut bytes = Vec::new();
    for (i, pair) in raw.chunks_exact(2).enumerate() {
        if crc.checksum(&pair[..1]) != pair[1] {
            return Err(FramingError::ChecksumMismatch { word: i as u8 });
        }
        bytes.push(pair[0]).map_err(|_| FramingError::TooManyWords)?;
    }
    Ok(bytes)
}

/// Write a command with optional checksummed arguments
pub fn write_command<B: I2cBus>(
    bus: &mut B,
    address: u8,
    cmd: u16,
    args: &[u16],
    crc: Crc8,
) -> Result<(), CommandError<B::Error>> {
    let frame = encode_command(cmd, args, crc)?;
    bus.write(address, &frame).map_err(CommandError::Transport)
}

/// Read `num_words` checksummed words
pub fn read_words<B: I2cBus>(
    bus: &mut B,
    address: u8,
    num_words: usize,
    crc: Crc8,
) -> Result<Vec<u16, MAX_WORDS>, CommandError<B::Error>> {
    if num_words > MAX_WORDS {
        return Err(FramingError::TooManyWords.into());
    }

    let mut raw = [0u8; MAX_READ_LEN];
    let raw = &mut raw[..num_words * WORD_FRAME_LEN];
    bus.read(address, raw).map_err(CommandError::Transport)?;
    Ok(decode_words(raw, num_words, crc)?)
}

/// Send `cmd`, wait `delay_ms` for the device to execute it, read the result
pub fn delayed_command_read<B: I2cBus>(
    bus: &mut B,
    address: u8,
    cmd: u16,
    delay_ms: u32,
    num_words: usize,
    crc: Crc8,
) -> Result<Vec<u16, MAX_WORDS>, CommandError<B::Error>> {
    if num_words > MAX_WORDS {
        return Err(FramingError::TooManyWords.into());
    }
    write_command(bus, address, cmd, &[], crc)?;
    bus.sleep_ms(delay_ms);
    read_words(bus, address, num_words, crc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BusConfig;
    use crate::engine::SoftI2c;
    use crate::error::{BusError, Phase, TransferError};
    use crate::sim::{SimDelay, SimPins};
    use proptest::prelude::*;

    #[test]
    fn test_crc8_known_values() {
        assert_eq!(crc8(&[0xBE, 0xEF], 0xFF), 0x92);
        assert_eq!(crc8(&[0xD4, 0x00], 0xFF), 0xC6);
        assert_eq!(crc8(&[0x00, 0x00], 0xFF), 0x81);
        assert_eq!(crc8(&[0x00, 0x20], 0xFF), 0x07);
        assert_eq!(crc8(&[0x66, 0x4E], 0x00), 0x2D);
        assert_eq!(crc8(&[0x68, 0x3A], 0x00), 0x7C);
        assert_eq!(crc8(&[], 0xFF), 0xFF);
    }

    #[test]
    fn test_crc_presets_differ() {
        let bytes = [0x12, 0x34];
        assert_ne!(
            Crc8::SENSIRION.checksum(&bytes),
            Crc8::SILABS.checksum(&bytes)
        );
    }

    #[test]
    fn test_encode_command_without_args() {
        let frame = encode_command(0x2008, &[], Crc8::SENSIRION).unwrap();
        assert_eq!(frame.as_slice(), &[0x20, 0x08]);
    }

    #[test]
    fn test_encode_command_with_args() {
        let frame = encode_command(0x201E, &[0xBEEF, 0x0000], Crc8::SENSIRION).unwrap();
        assert_eq!(
            frame.as_slice(),
            &[0x20, 0x1E, 0xBE, 0xEF, 0x92, 0x00, 0x00, 0x81]
        );
    }

    #[test]
    fn test_encode_command_too_many_args() {
        let args = [0u16; MAX_ARGS + 1];
        assert_eq!(
            encode_command(0x2061, &args, Crc8::SENSIRION),
            Err(FramingError::TooManyWords)
        );
        assert!(encode_command(0x2061, &args[..MAX_ARGS], Crc8::SENSIRION).is_ok());
    }

    #[test]
    fn test_frames_at_capacity_keep_every_word() {
        let crc = Crc8::SENSIRION;
        let args: [u16; MAX_ARGS] = core::array::from_fn(|i| 0x1111 * i as u16);
        let frame = encode_command(0x2061, &args, crc).unwrap();
        assert_eq!(frame.len(), MAX_COMMAND_LEN);

        let words = decode_words(&frame[2..], MAX_ARGS, crc).unwrap();
        assert_eq!(words.as_slice(), &args);

        let mut raw = std::vec::Vec::new();
        for i in 0..MAX_WORDS as u16 {
            raw.extend_from_slice(&i.to_be_bytes());
            raw.push(crc.checksum(&i.to_be_bytes()));
        }
        let words = decode_words(&raw, MAX_WORDS, crc).unwrap();
        assert_eq!(words.len(), MAX_WORDS);
        assert_eq!(words.last(), Some(&(MAX_WORDS as u16 - 1)));

        let mut pairs = std::vec::Vec::new();
        for b in 0..MAX_CHECKED_BYTES as u8 {
            pairs.push(b);
            pairs.push(Crc8::SILABS.checksum(&[b]));
        }
        let bytes = decode_checked_bytes(&pairs, Crc8::SILABS).unwrap();
        assert_eq!(bytes.len(), MAX_CHECKED_BYTES);
        assert_eq!(bytes[MAX_CHECKED_BYTES - 1], MAX_CHECKED_BYTES as u8 - 1);
    }

    #[test]
    fn test_decode_words() {
        let raw = [0xD4, 0x00, 0xC6, 0x00, 0x20, 0x07];
        let words = decode_words(&raw, 2, Crc8::SENSIRION).unwrap();
        assert_eq!(words.as_slice(), &[0xD400, 0x0020]);
    }

    #[test]
    fn test_decode_aborts_on_first_mismatch() {
        let raw = [0xD4, 0x00, 0xC6, 0x00, 0x20, 0x08];
        assert_eq!(
            decode_words(&raw, 2, Crc8::SENSIRION),
            Err(FramingError::ChecksumMismatch { word: 1 })
        );
    }

    #[test]
    fn test_decode_length_checked() {
        assert_eq!(
            decode_words(&[0xD4, 0x00, 0xC6], 2, Crc8::SENSIRION),
            Err(FramingError::Length)
        );
        assert_eq!(
            decode_words(&[], MAX_WORDS + 1, Crc8::SENSIRION),
            Err(FramingError::TooManyWords)
        );
        assert_eq!(decode_words(&[], 0, Crc8::SENSIRION).unwrap().len(), 0);
    }

    #[test]
    fn test_decode_checked_bytes() {
        let crc = Crc8::SILABS;
        let raw = [0x15, crc.checksum(&[0x15]), 0xA0, crc.checksum(&[0xA0])];
        assert_eq!(
            decode_checked_bytes(&raw, crc).unwrap().as_slice(),
            &[0x15, 0xA0]
        );

        let bad = [0x15, crc.checksum(&[0x15]), 0xA0, 0x00];
        assert_eq!(
            decode_checked_bytes(&bad, crc),
            Err(FramingError::ChecksumMismatch { word: 1 })
        );
        assert_eq!(
            decode_checked_bytes(&raw[..3], crc),
            Err(FramingError::Length)
        );
    }

    fn sim_bus() -> SoftI2c<SimPins, SimDelay> {
        let config = BusConfig::new("sgp30", 2, 3, 2).unwrap();
        let mut bus = SoftI2c::new(config, SimPins::new(2, 3, 0x58), SimDelay::new());
        bus.init().unwrap();
        bus
    }

    #[test]
    fn test_delayed_command_read() {
        let mut bus = sim_bus();
        bus.pins_mut().respond_words(&[0x0190, 0x0000], Crc8::SENSIRION);

        let words = delayed_command_read(&mut bus, 0x58, 0x2008, 12, 2, Crc8::SENSIRION).unwrap();
        assert_eq!(words.as_slice(), &[0x0190, 0x0000]);
        assert_eq!(bus.pins().last_write(), Some(&[0x20, 0x08][..]));
        assert!(bus.delay().elapsed_ms() >= 12);
    }

    #[test]
    fn test_checksum_error_distinct_from_transport() {
        let mut bus = sim_bus();
        bus.pins_mut().respond(&[0x01, 0x90, 0x00]);
        assert_eq!(
            read_words(&mut bus, 0x58, 1, Crc8::SENSIRION),
            Err(CommandError::Framing(FramingError::ChecksumMismatch { word: 0 }))
        );

        bus.pins_mut().set_nack_address(true);
        assert_eq!(
            read_words(&mut bus, 0x58, 1, Crc8::SENSIRION),
            Err(CommandError::Transport(TransferError::new(
                Phase::Address,
                BusError::Nack
            )))
        );
    }

    #[test]
    fn test_write_command_frames_args() {
        let mut bus = sim_bus();
        write_command(&mut bus, 0x58, 0x2061, &[0x0F80], Crc8::SENSIRION).unwrap();
        let frame = encode_command(0x2061, &[0x0F80], Crc8::SENSIRION).unwrap();
        assert_eq!(bus.pins().last_write(), Some(frame.as_slice()));
    }

    proptest! {
        #[test]
        fn prop_word_roundtrip(b0 in any::<u8>(), b1 in any::<u8>(), init in prop_oneof![Just(0x00u8), Just(0xFFu8)]) {
            let crc = Crc8 { init };
            let raw = [b0, b1, crc8(&[b0, b1], init)];
            let words = decode_words(&raw, 1, crc).unwrap();
            prop_assert_eq!(words.as_slice(), &[u16::from_be_bytes([b0, b1])]);
        }

        #[test]
        fn prop_single_bit_flip_detected(b0 in any::<u8>(), b1 in any::<u8>(), bit in 0usize..24, init in prop_oneof![Just(0x00u8), Just(0xFFu8)]) {
            let crc = Crc8 { init };
            let mut raw = [b0, b1, crc8(&[b0, b1], init)];
            raw[bit / 8] ^= 1 << (bit % 8);
            prop_assert_eq!(
                decode_words(&raw, 1, crc),
                Err(FramingError::ChecksumMismatch { word: 0 })
            );
        }
    }

    #[test]
    fn test_single_bit_flips_exhaustive_for_one_word() {
        for bit in 0..24 {
            let mut raw = [0xBE, 0xEF, 0x92];
            raw[bit / 8] ^= 1 << (bit % 8);
            assert!(decode_words(&raw, 1, Crc8::SENSIRION).is_err(), "bit {}", bit);
        }
    }
}
