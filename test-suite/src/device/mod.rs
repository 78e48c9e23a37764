//! The devices on the I2C bus, as seen by the verification procedures
//!
//! The procedures only ever talk to the [`TemperatureSensor`] and
//! [`ByteStore`] capabilities. Where those are backed by, is up to the
//! [`Bus`] implementation:
//!
//! - [`remote::Target`] forwards everything to the firmware on the test target.
//! - [`hal::HalBus`] drives the devices directly through `embedded-hal`.
//! - [`sim::SimBus`] simulates the bus and both devices.


pub mod hal;
pub mod remote;
pub mod sim;


use std::{
    fmt::{
        self,
        Debug,
    },
    num::NonZeroUsize,
};


/// A temperature sensor
pub trait TemperatureSensor {
    type Error: Debug;

    /// Indicates whether the sensor responds on the bus
    fn is_open(&mut self) -> Result<bool, Self::Error>;

    /// Read the current temperature, in degrees Celsius
    fn read_temperature(&mut self) -> Result<f32, Self::Error>;
}

impl<T> TemperatureSensor for &mut T
    where T: TemperatureSensor + ?Sized
{
    type Error = T::Error;

    fn is_open(&mut self) -> Result<bool, Self::Error> {
        T::is_open(self)
    }

    fn read_temperature(&mut self) -> Result<f32, Self::Error> {
        T::read_temperature(self)
    }
}


/// Byte-addressable persistent memory
///
/// The multi-byte operations return how many bytes were actually transferred.
/// A transfer that is cut short by a bus fault returns a lower count instead
/// of an error, so the caller can tell how far it got.
pub trait ByteStore {
    type Error: Debug;

    /// Write `data`, starting at `address`
    fn write(&mut self, address: u16, data: &[u8])
        -> Result<usize, Self::Error>;

    /// Read `buf.len()` bytes, starting at `address`
    fn read(&mut self, address: u16, buf: &mut [u8])
        -> Result<usize, Self::Error>;

    /// Write a single byte, using the device's single-byte write operation
    fn write_byte(&mut self, address: u16, value: u8)
        -> Result<(), Self::Error>;

    /// Read a single byte, using the device's single-byte read operation
    fn read_byte(&mut self, address: u16) -> Result<u8, Self::Error>;
}

impl<T> ByteStore for &mut T
    where T: ByteStore + ?Sized
{
    type Error = T::Error;

    fn write(&mut self, address: u16, data: &[u8])
        -> Result<usize, Self::Error>
    {
        T::write(self, address, data)
    }

    fn read(&mut self, address: u16, buf: &mut [u8])
        -> Result<usize, Self::Error>
    {
        T::read(self, address, buf)
    }

    fn write_byte(&mut self, address: u16, value: u8)
        -> Result<(), Self::Error>
    {
        T::write_byte(self, address, value)
    }

    fn read_byte(&mut self, address: u16) -> Result<u8, Self::Error> {
        T::read_byte(self, address)
    }
}


/// The shared I2C bus, with a temperature sensor and a byte store on it
///
/// Both devices share one bus, so only one of them can be used at a time. The
/// proxies returned by `sensor` and `store` borrow the bus mutably, which
/// gives the procedure using them exclusive access until it drops them.
pub trait Bus {
    type Sensor<'r>: TemperatureSensor where Self: 'r;
    type Store<'r>:  ByteStore         where Self: 'r;

    /// Acquire the temperature sensor
    fn sensor(&mut self) -> Self::Sensor<'_>;

    /// Acquire the byte store
    fn store(&mut self) -> Self::Store<'_>;
}


/// A contiguous region of a byte store
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AddressWindow {
    base: u16,
    len:  NonZeroUsize,
}

impl AddressWindow {
    /// Create a window of `len` bytes, starting at `base`
    ///
    /// Returns an error, if `len` is zero, or if the window extends beyond
    /// the 16-bit address space.
    pub fn new(base: u16, len: usize) -> Result<Self, InvalidWindowError> {
        let len = NonZeroUsize::new(len)
            .ok_or(InvalidWindowError::Empty)?;

        let window = Self { base, len };
        if window.end() > 1 << 16 {
            return Err(InvalidWindowError::OutOfRange { end: window.end() });
        }

        Ok(window)
    }

    /// The address of the first byte
    pub fn base(&self) -> u16 {
        self.base
    }

    /// The length of the window, in bytes
    pub fn len(&self) -> NonZeroUsize {
        self.len
    }

    /// The address one past the last byte
    pub fn end(&self) -> usize {
        self.base as usize + self.len.get()
    }

    /// Check the window against the capacity of a store
    pub fn fits(&self, capacity: usize) -> bool {
        self.end() <= capacity
    }
}

impl fmt::Display for AddressWindow {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#06x}..{:#06x}", self.base, self.end())
    }
}


#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InvalidWindowError {
    /// A window must contain at least one byte
    Empty,

    /// The window ends beyond the 16-bit address space
    OutOfRange { end: usize },
}
