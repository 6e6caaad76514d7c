//! Bus error types

use airwire_hal::InvalidPin;

/// Errors raised by the bus engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// The pin driver rejected a pin identifier
    InvalidPin(u8),
    /// A slave held SCL low beyond the stretch timeout
    ClockTimeout,
    /// A slave declined an address or data byte
    Nack,
    /// Address does not fit in 7 bits
    InvalidAddress(u8),
}

impl From<InvalidPin> for BusError {
    fn from(err: InvalidPin) -> Self {
        BusError::InvalidPin(err.0)
    }
}

/// Where in a transaction an error happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// START condition
    Start,
    /// Address byte
    Address,
    /// Data byte at the given index
    Data(usize),
    /// STOP condition after an otherwise complete transfer
    Stop,
}

/// A bus error with its transaction phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferError {
    pub phase: Phase,
    pub kind: BusError,
}

impl TransferError {
    pub fn new(phase: Phase, kind: BusError) -> Self {
        Self { phase, kind }
    }

    /// The underlying engine error
    pub fn bus_error(&self) -> BusError {
        self.kind
    }

    /// True if the slave NACKed (absent, busy, or out of sync)
    pub fn is_nack(&self) -> bool {
        self.kind == BusError::Nack
    }
}

impl embedded_hal::i2c::Error for TransferError {
    fn kind(&self) -> embedded_hal::i2c::ErrorKind {
        use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};

        match (self.kind, self.phase) {
            (BusError::Nack, Phase::Address) => {
                ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
            }
            (BusError::Nack, Phase::Data(_)) => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data),
            (BusError::Nack, _) => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Unknown),
            _ => ErrorKind::Other,
        }
    }
}
