//! I2C bus abstractions
//!
//! Provides the transaction-level seam between device drivers and whatever
//! moves the bytes (the software engine in `airwire-bus`, or a hardware
//! peripheral on another board).

/// I2C bus master
///
/// Provides basic I2C read/write operations for communicating with
/// peripheral devices. Each call is one complete START..STOP transaction.
pub trait I2cBus {
    /// Error type for I2C operations
    type Error;

    /// Write data to a device at the given address
    ///
    /// # Arguments
    /// * `address` - 7-bit I2C address
    /// * `data` - Bytes to write
    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error>;

    /// Read data from a device at the given address
    ///
    /// The final byte is always NACKed. An empty buffer sends only the read
    /// address, then STOP.
    ///
    /// # Arguments
    /// * `address` - 7-bit I2C address
    /// * `buf` - Buffer to read into
    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Block for the given number of milliseconds
    ///
    /// Device drivers use this to wait out command execution times between
    /// the command write and the response read.
    fn sleep_ms(&mut self, ms: u32);
}

impl<T: I2cBus + ?Sized> I2cBus for &mut T {
    type Error = T::Error;

    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error> {
        T::write(self, address, data)
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        T::read(self, address, buf)
    }

    fn sleep_ms(&mut self, ms: u32) {
        T::sleep_ms(self, ms)
    }
}
