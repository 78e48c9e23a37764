//! Drivers for the devices, on top of `embedded-hal`
//!
//! These are used, when the host has direct access to the I2C bus (or a
//! simulation of it), instead of going through the firmware on the target.


use std::num::NonZeroUsize;

use embedded_hal::i2c::{
    ErrorKind,
    I2c,
};

use crate::config::DeviceConfig;

use super::{
    Bus,
    ByteStore,
    TemperatureSensor,
};


/// The LM75B temperature register
const LM75B_TEMP: u8 = 0x00;

/// The LM75B configuration register
const LM75B_CONF: u8 = 0x01;

/// How many times to poll the EEPROM for the end of its write cycle
///
/// The write cycle takes at most 5 ms. Each poll takes at least a full address
/// byte, which is 25 us at 400 kHz.
const MAX_POLLS: usize = 400;


/// Driver for the NXP LM75B temperature sensor
pub struct Lm75b<I2C> {
    i2c:     I2C,
    address: u8,
}

impl<I2C> Lm75b<I2C>
    where I2C: I2c
{
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
        }
    }

    /// Put the sensor into normal operation
    ///
    /// Returns `false`, if the sensor doesn't acknowledge.
    pub fn open(&mut self) -> Result<bool, I2C::Error> {
        match self.i2c.write(self.address, &[LM75B_CONF, 0x00]) {
            Ok(()) => {
                Ok(true)
            }
            Err(err) if is_nack(&err) => {
                Ok(false)
            }
            Err(err) => {
                Err(err)
            }
        }
    }

    /// Read the temperature, in degrees Celsius
    ///
    /// The temperature register holds an 11-bit two's complement value in its
    /// upper bits, with a resolution of 0.125 degrees.
    pub fn temperature(&mut self) -> Result<f32, I2C::Error> {
        let mut buf = [0; 2];
        self.i2c.write_read(self.address, &[LM75B_TEMP], &mut buf)?;

        let raw = i16::from_be_bytes(buf) >> 5;
        Ok(raw as f32 * 0.125)
    }
}

impl<I2C> TemperatureSensor for Lm75b<I2C>
    where I2C: I2c
{
    type Error = I2C::Error;

    fn is_open(&mut self) -> Result<bool, Self::Error> {
        self.open()
    }

    fn read_temperature(&mut self) -> Result<f32, Self::Error> {
        self.temperature()
    }
}


/// Driver for 24xx-style I2C EEPROMs with two address bytes
///
/// Writes are split at page boundaries, as the EEPROM would wrap around to the
/// start of the page otherwise. After each page, the driver polls the EEPROM
/// until its write cycle is over.
pub struct I2cEeprom<I2C> {
    i2c:       I2C,
    address:   u8,
    page_size: NonZeroUsize,
    capacity:  usize,
}

impl<I2C> I2cEeprom<I2C>
    where I2C: I2c
{
    pub fn new(
        i2c:       I2C,
        address:   u8,
        page_size: NonZeroUsize,
        capacity:  usize,
    )
        -> Self
    {
        Self {
            i2c,
            address,
            page_size,
            capacity,
        }
    }

    /// Write data, starting at `address`
    ///
    /// If a page write fails, the remaining pages are skipped. Returns the
    /// number of bytes in the pages that were written successfully.
    pub fn write(&mut self, address: u16, data: &[u8])
        -> Result<usize, EepromError<I2C::Error>>
    {
        self.check_range(address, data.len())?;

        let page_size = self.page_size.get();

        let mut written = 0;
        let mut frame   = Vec::with_capacity(2 + page_size);

        while written < data.len() {
            let start = address as usize + written;
            let room  = page_size - start % page_size;
            let n     = room.min(data.len() - written);

            frame.clear();
            frame.extend_from_slice(&(start as u16).to_be_bytes());
            frame.extend_from_slice(&data[written .. written + n]);

            let result = self.i2c.write(self.address, &frame)
                .map_err(|err| EepromError::Bus(err))
                .and_then(|()| self.wait_for_write_cycle());
            if let Err(err) = result {
                tracing::warn!(start, n, ?err, "EEPROM page write failed");
                break;
            }

            written += n;
        }

        Ok(written)
    }

    /// Read `buf.len()` bytes, starting at `address`
    ///
    /// Reads one page at a time. Stops at the first failed read and returns
    /// the number of bytes read up to that point.
    pub fn read(&mut self, address: u16, buf: &mut [u8])
        -> Result<usize, EepromError<I2C::Error>>
    {
        self.check_range(address, buf.len())?;

        let mut read = 0;

        for chunk in buf.chunks_mut(self.page_size.get()) {
            let start = (address as usize + read) as u16;

            let result = self.i2c.write_read(
                self.address,
                &start.to_be_bytes(),
                chunk,
            );
            if let Err(err) = result {
                tracing::warn!(start, ?err, "EEPROM read failed");
                break;
            }

            read += chunk.len();
        }

        Ok(read)
    }

    /// Write a single byte
    pub fn write_byte(&mut self, address: u16, value: u8)
        -> Result<(), EepromError<I2C::Error>>
    {
        self.check_range(address, 1)?;

        let [hi, lo] = address.to_be_bytes();
        self.i2c.write(self.address, &[hi, lo, value])
            .map_err(|err| EepromError::Bus(err))?;

        self.wait_for_write_cycle()
    }

    /// Read a single byte
    pub fn read_byte(&mut self, address: u16)
        -> Result<u8, EepromError<I2C::Error>>
    {
        self.check_range(address, 1)?;

        let mut value = 0;
        self.i2c
            .write_read(
                self.address,
                &address.to_be_bytes(),
                core::slice::from_mut(&mut value),
            )
            .map_err(|err| EepromError::Bus(err))?;

        Ok(value)
    }

    fn check_range(&self, address: u16, len: usize)
        -> Result<(), EepromError<I2C::Error>>
    {
        let end = address as usize + len;
        if end > self.capacity {
            return Err(EepromError::OutOfRange { end, capacity: self.capacity });
        }

        Ok(())
    }

    /// Poll the EEPROM, until it acknowledges its address again
    ///
    /// The EEPROM doesn't acknowledge anything, while its internal write cycle
    /// is in progress.
    fn wait_for_write_cycle(&mut self) -> Result<(), EepromError<I2C::Error>> {
        for _ in 0 .. MAX_POLLS {
            match self.i2c.write(self.address, &[]) {
                Ok(()) => {
                    return Ok(());
                }
                Err(err) if is_nack(&err) => {
                    continue;
                }
                Err(err) => {
                    return Err(EepromError::Bus(err));
                }
            }
        }

        Err(EepromError::WriteCycleTimeout)
    }
}

impl<I2C> ByteStore for I2cEeprom<I2C>
    where I2C: I2c
{
    type Error = EepromError<I2C::Error>;

    fn write(&mut self, address: u16, data: &[u8])
        -> Result<usize, Self::Error>
    {
        I2cEeprom::write(self, address, data)
    }

    fn read(&mut self, address: u16, buf: &mut [u8])
        -> Result<usize, Self::Error>
    {
        I2cEeprom::read(self, address, buf)
    }

    fn write_byte(&mut self, address: u16, value: u8)
        -> Result<(), Self::Error>
    {
        I2cEeprom::write_byte(self, address, value)
    }

    fn read_byte(&mut self, address: u16) -> Result<u8, Self::Error> {
        I2cEeprom::read_byte(self, address)
    }
}


#[derive(Debug)]
pub enum EepromError<E> {
    /// An I2C transfer failed
    Bus(E),

    /// The access extends beyond the end of the EEPROM
    OutOfRange {
        end:      usize,
        capacity: usize,
    },

    /// The EEPROM didn't finish its write cycle in time
    WriteCycleTimeout,
}


/// An I2C bus that the host has direct access to
///
/// Hands out drivers for the temperature sensor and EEPROM that borrow the
/// bus, at the addresses from the device configuration.
pub struct HalBus<I2C> {
    i2c:     I2C,
    devices: DeviceConfig,
}

impl<I2C> HalBus<I2C>
    where I2C: I2c
{
    pub fn new(i2c: I2C, devices: DeviceConfig) -> Self {
        Self {
            i2c,
            devices,
        }
    }

    /// Access the underlying bus
    pub fn i2c(&mut self) -> &mut I2C {
        &mut self.i2c
    }
}

impl<I2C> Bus for HalBus<I2C>
    where I2C: I2c
{
    type Sensor<'r> = Lm75b<&'r mut I2C> where Self: 'r;
    type Store<'r>  = I2cEeprom<&'r mut I2C> where Self: 'r;

    fn sensor(&mut self) -> Self::Sensor<'_> {
        Lm75b::new(&mut self.i2c, self.devices.sensor_address)
    }

    fn store(&mut self) -> Self::Store<'_> {
        I2cEeprom::new(
            &mut self.i2c,
            self.devices.eeprom_address,
            self.devices.eeprom_page_size,
            self.devices.eeprom_capacity,
        )
    }
}


fn is_nack<E>(err: &E) -> bool
    where E: embedded_hal::i2c::Error
{
    matches!(err.kind(), ErrorKind::NoAcknowledge(_))
}
