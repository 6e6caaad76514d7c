//! Scripted open-drain bus for host tests
//!
//! [`SimPins`] implements [`PinDriver`] for one SCL/SDA pair with a single
//! simulated 7-bit slave attached. Both lines are modelled as wired-AND: a
//! line reads high only when neither the master nor the slave drives it low.
//! After every master pin change the bus levels are re-evaluated and the
//! slave reacts to START/STOP conditions and clock edges:
//!
//! - SDA falling while SCL is high is a START, SDA rising is a STOP
//! - on SCL rising edges the slave samples SDA
//! - on SCL falling edges the slave drives its ACK or its next data bit
//!
//! Everything the slave observes is recorded as [`Event`]s.

use std::collections::VecDeque;
use std::vec::Vec;

use airwire_hal::{InvalidPin, Level, PinDriver, PinId};
use embedded_hal::delay::DelayNs;

use crate::framing::Crc8;

/// What the master is doing with a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineState {
    /// Input with pull-up
    Released,
    /// Output driving logic 0
    DrivenLow,
}

/// Bus activity as seen by the slave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Start,
    Stop,
    /// Address byte; `acked` is whether the slave answered
    Address { address: u8, read: bool, acked: bool },
    /// Data byte written by the master
    Write { byte: u8, acked: bool },
    /// Data byte sent by the slave; `master_ack` is false for a NACK
    Read { byte: u8, master_ack: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rx {
    Address,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slave {
    Idle,
    Receiving { kind: Rx, shift: u8, bits: u8 },
    Acking { read: bool },
    Transmitting { byte: u8, bit: u8 },
    AwaitingAck { byte: u8 },
    Acked { ack: bool },
}

/// Simulated pin pair with one slave device
pub struct SimPins {
    scl: PinId,
    sda: PinId,
    address: u8,

    master_scl: LineState,
    master_sda: LineState,
    slave_scl_low: bool,
    slave_sda_low: bool,
    bus_scl: bool,
    bus_sda: bool,

    stuck: bool,
    stretch_armed: Option<u32>,
    stretch_remaining: u32,
    nack_address: bool,
    nack_data_at: Option<usize>,

    state: Slave,
    data_index: usize,
    responses: VecDeque<u8>,
    events: Vec<Event>,
    writes: Vec<Vec<u8>>,
    scl_polls: usize,
    resets: usize,
}

impl SimPins {
    /// Pins `scl`/`sda` with a slave answering at `address`
    pub fn new(scl: PinId, sda: PinId, address: u8) -> Self {
        Self {
            scl,
            sda,
            address,
            master_scl: LineState::Released,
            master_sda: LineState::Released,
            slave_scl_low: false,
            slave_sda_low: false,
            bus_scl: true,
            bus_sda: true,
            stuck: false,
            stretch_armed: None,
            stretch_remaining: 0,
            nack_address: false,
            nack_data_at: None,
            state: Slave::Idle,
            data_index: 0,
            responses: VecDeque::new(),
            events: Vec::new(),
            writes: Vec::new(),
            scl_polls: 0,
            resets: 0,
        }
    }

    /// Queue bytes the slave sends on subsequent reads
    ///
    /// When the queue runs dry the slave sends 0xFF.
    pub fn respond(&mut self, bytes: &[u8]) {
        self.responses.extend(bytes.iter().copied());
    }

    /// Queue 16-bit words, each followed by its CRC
    pub fn respond_words(&mut self, words: &[u16], crc: Crc8) {
        for word in words {
            let bytes = word.to_be_bytes();
            self.respond(&bytes);
            self.respond(&[crc.checksum(&bytes)]);
        }
    }

    /// Bytes still queued for the slave to send
    pub fn pending_responses(&self) -> usize {
        self.responses.len()
    }

    /// Make the slave decline its address
    pub fn set_nack_address(&mut self, nack: bool) {
        self.nack_address = nack;
    }

    /// Make the slave decline the data byte at `index` of each write
    pub fn set_nack_data_at(&mut self, index: Option<usize>) {
        self.nack_data_at = index;
    }

    /// Stretch the clock the next time the master releases SCL
    ///
    /// The slave keeps SCL low for `polls` reads of the line.
    pub fn stretch_clock(&mut self, polls: u32) {
        self.stretch_armed = Some(polls);
    }

    /// Hold SCL low for good, like a hung slave
    pub fn hold_clock_low(&mut self) {
        self.stuck = true;
        self.slave_scl_low = true;
        self.settle();
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Data bytes of each write transaction the slave acknowledged
    pub fn writes(&self) -> &[Vec<u8>] {
        &self.writes
    }

    pub fn last_write(&self) -> Option<&[u8]> {
        self.writes.last().map(Vec::as_slice)
    }

    pub fn master_scl(&self) -> LineState {
        self.master_scl
    }

    pub fn master_sda(&self) -> LineState {
        self.master_sda
    }

    /// Number of times the master read SCL
    pub fn scl_polls(&self) -> usize {
        self.scl_polls
    }

    /// Number of pin resets
    pub fn reset_count(&self) -> usize {
        self.resets
    }

    fn check(&self, pin: PinId) -> Result<(), InvalidPin> {
        if pin == self.scl || pin == self.sda {
            Ok(())
        } else {
            Err(InvalidPin(pin))
        }
    }

    fn set_master(&mut self, pin: PinId, state: LineState) {
        if pin == self.scl {
            self.master_scl = state;
            if state == LineState::Released {
                if let Some(polls) = self.stretch_armed.take() {
                    self.slave_scl_low = polls > 0;
                    self.stretch_remaining = polls;
                }
            }
        } else {
            self.master_sda = state;
        }
        self.settle();
    }

    fn levels(&self) -> (bool, bool) {
        let scl = self.master_scl == LineState::Released && !self.slave_scl_low;
        let sda = self.master_sda == LineState::Released && !self.slave_sda_low;
        (scl, sda)
    }

    fn settle(&mut self) {
        let (old_scl, old_sda) = (self.bus_scl, self.bus_sda);
        let (scl, sda) = self.levels();
        self.bus_scl = scl;
        self.bus_sda = sda;

        if old_scl && scl && old_sda != sda {
            if sda {
                self.on_stop();
            } else {
                self.on_start();
            }
        } else if !old_scl && scl {
            self.on_rising(sda);
        } else if old_scl && !scl {
            self.on_falling();
        }

        // The slave only moves SDA while SCL is low
        self.bus_sda = self.levels().1;
    }

    fn on_start(&mut self) {
        self.events.push(Event::Start);
        self.slave_sda_low = false;
        self.state = Slave::Receiving {
            kind: Rx::Address,
            shift: 0,
            bits: 0,
        };
    }

    fn on_stop(&mut self) {
        self.events.push(Event::Stop);
        self.slave_sda_low = false;
        self.state = Slave::Idle;
    }

    fn on_rising(&mut self, sda: bool) {
        match self.state {
            Slave::Receiving { kind, shift, bits } if bits < 8 => {
                self.state = Slave::Receiving {
                    kind,
                    shift: (shift << 1) | u8::from(sda),
                    bits: bits + 1,
                };
            }
            Slave::AwaitingAck { byte } => {
                let ack = !sda;
                self.events.push(Event::Read {
                    byte,
                    master_ack: ack,
                });
                self.state = Slave::Acked { ack };
            }
            _ => {}
        }
    }

    fn on_falling(&mut self) {
        match self.state {
            Slave::Receiving {
                kind: Rx::Address,
                shift,
                bits: 8,
            } => {
                let address = shift >> 1;
                let read = shift & 1 == 1;
                let acked = address == self.address && !self.nack_address;
                self.events.push(Event::Address {
                    address,
                    read,
                    acked,
                });
                if acked {
                    if !read {
                        self.writes.push(Vec::new());
                        self.data_index = 0;
                    }
                    self.slave_sda_low = true;
                    self.state = Slave::Acking { read };
                } else {
                    self.state = Slave::Idle;
                }
            }
            Slave::Receiving {
                kind: Rx::Data,
                shift,
                bits: 8,
            } => {
                let acked = self.nack_data_at != Some(self.data_index);
                self.data_index += 1;
                self.events.push(Event::Write { byte: shift, acked });
                if acked {
                    if let Some(current) = self.writes.last_mut() {
                        current.push(shift);
                    }
                    self.slave_sda_low = true;
                    self.state = Slave::Acking { read: false };
                } else {
                    self.state = Slave::Idle;
                }
            }
            Slave::Acking { read } => {
                self.slave_sda_low = false;
                if read {
                    self.load_next();
                } else {
                    self.state = Slave::Receiving {
                        kind: Rx::Data,
                        shift: 0,
                        bits: 0,
                    };
                }
            }
            Slave::Transmitting { byte, bit } => {
                if bit == 0 {
                    self.slave_sda_low = false;
                    self.state = Slave::AwaitingAck { byte };
                } else {
                    let bit = bit - 1;
                    self.slave_sda_low = byte & (1 << bit) == 0;
                    self.state = Slave::Transmitting { byte, bit };
                }
            }
            Slave::Acked { ack: true } => self.load_next(),
            Slave::Acked { ack: false } => {
                self.slave_sda_low = false;
                self.state = Slave::Idle;
            }
            _ => {}
        }
    }

    fn load_next(&mut self) {
        let byte = self.responses.pop_front().unwrap_or(0xFF);
        self.slave_sda_low = byte & 0x80 == 0;
        self.state = Slave::Transmitting { byte, bit: 7 };
    }
}

impl PinDriver for SimPins {
    fn set_input_pullup(&mut self, pin: PinId) -> Result<(), InvalidPin> {
        self.check(pin)?;
        self.set_master(pin, LineState::Released);
        Ok(())
    }

    fn set_output_low(&mut self, pin: PinId) -> Result<(), InvalidPin> {
        self.check(pin)?;
        self.set_master(pin, LineState::DrivenLow);
        Ok(())
    }

    fn read_level(&mut self, pin: PinId) -> Result<Level, InvalidPin> {
        self.check(pin)?;
        if pin == self.scl {
            self.scl_polls += 1;
            if self.slave_scl_low && !self.stuck {
                if self.stretch_remaining > 0 {
                    self.stretch_remaining -= 1;
                } else {
                    self.slave_scl_low = false;
                    self.settle();
                }
            }
            Ok(Level::from(self.bus_scl))
        } else {
            Ok(Level::from(self.bus_sda))
        }
    }

    fn reset(&mut self, pin: PinId) {
        self.resets += 1;
        if self.check(pin).is_ok() {
            self.set_master(pin, LineState::Released);
        }
    }
}

/// Delay source that only counts time
#[derive(Debug, Default)]
pub struct SimDelay {
    elapsed_ns: u64,
}

impl SimDelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total time slept, in whole milliseconds
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ns / 1_000_000
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns += u64::from(ns);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.elapsed_ns += u64::from(ms) * 1_000_000;
    }
}
