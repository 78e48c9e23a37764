//! Protocol between the I2C test suite on the host and the test target
//!
//! The test target is a microcontroller with an LM75B temperature sensor and
//! an I2C EEPROM on its I2C bus. The firmware running on it owns the device
//! drivers; the host only ever talks to it through these messages.


#![no_std]


use serde::{
    Deserialize,
    Serialize,
};


/// The largest number of bytes a single EEPROM request or reply may carry
///
/// Longer transfers have to be split into multiple requests by the host.
pub const MAX_TRANSFER: usize = 128;


/// A message from the test suite on the host to the target
#[derive(Debug, Deserialize, Serialize)]
pub enum HostToTarget<'r> {
    /// Ask the target whether the temperature sensor responds on the bus
    SensorIsOpen,

    /// Ask the target for one temperature reading
    ReadTemperature,

    /// Instruct the target to write data to the EEPROM
    WriteEeprom {
        /// The memory address of the first byte
        address: u16,

        /// The data to write, at most `MAX_TRANSFER` bytes
        data: &'r [u8],
    },

    /// Instruct the target to read data from the EEPROM
    ReadEeprom {
        /// The memory address of the first byte
        address: u16,

        /// How many bytes to read, at most `MAX_TRANSFER`
        len: u16,
    },

    /// Instruct the target to write a single byte to the EEPROM
    WriteEepromByte {
        address: u16,
        value:   u8,
    },

    /// Instruct the target to read a single byte from the EEPROM
    ReadEepromByte {
        address: u16,
    },
}


/// A message from the target to the test suite on the host
#[derive(Debug, Deserialize, Serialize)]
pub enum TargetToHost<'r> {
    /// Reply to `SensorIsOpen`
    SensorStatus {
        open: bool,
    },

    /// Reply to `ReadTemperature`, in degrees Celsius
    Temperature(f32),

    /// Reply to `WriteEeprom`
    ///
    /// `written` can be lower than the requested length, if the EEPROM
    /// stopped acknowledging in the middle of the transfer.
    EepromWritten {
        written: u16,
    },

    /// Reply to `ReadEeprom`
    ///
    /// `data` can be shorter than the requested length, if the transfer was
    /// cut short.
    EepromRead {
        data: &'r [u8],
    },

    /// Reply to `WriteEepromByte`
    EepromByteWritten,

    /// Reply to `ReadEepromByte`
    EepromByte(u8),

    /// The driver on the target reported an error while handling a request
    DriverError(DriverError),
}


/// An error reported by a device driver on the target
#[derive(Clone, Copy, Debug, Deserialize, Serialize, Eq, PartialEq)]
pub enum DriverError {
    /// The device did not acknowledge its address or data
    NoAcknowledge,

    /// The bus controller lost arbitration
    ArbitrationLoss,

    /// Any other bus error
    Bus,

    /// The requested address range is outside of the device
    OutOfRange,
}
