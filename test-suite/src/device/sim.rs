//! A simulated I2C bus, with an LM75B and an EEPROM attached
//!
//! Lets the whole suite run without a test stand. The device models follow
//! the behavior of the real parts closely enough for the `hal` drivers to work
//! against them, including page wrap-around and the EEPROM ignoring its
//! address during the internal write cycle. Faults can be injected to check
//! that they are detected.


use std::num::NonZeroUsize;

use embedded_hal::i2c::{
    self,
    ErrorKind,
    ErrorType,
    NoAcknowledgeSource,
    Operation,
};

use crate::config::DeviceConfig;


/// How many polls the simulated EEPROM ignores after each write
const BUSY_POLLS: usize = 3;


pub struct SimBus {
    sensor_address: u8,
    eeprom_address: u8,

    sensor: Option<SimSensor>,
    eeprom: Option<SimEeprom>,
}

impl SimBus {
    /// Create a bus with both devices at their configured addresses
    pub fn new(devices: &DeviceConfig) -> Self {
        Self {
            sensor_address: devices.sensor_address,
            eeprom_address: devices.eeprom_address,

            sensor: Some(SimSensor::new(25.0)),
            eeprom: Some(
                SimEeprom::new(
                    devices.eeprom_page_size,
                    devices.eeprom_capacity,
                )
            ),
        }
    }

    /// Disconnect the temperature sensor from the bus
    pub fn remove_sensor(&mut self) {
        self.sensor = None;
    }

    pub fn sensor_mut(&mut self) -> Option<&mut SimSensor> {
        self.sensor.as_mut()
    }

    pub fn eeprom_mut(&mut self) -> Option<&mut SimEeprom> {
        self.eeprom.as_mut()
    }
}

impl ErrorType for SimBus {
    type Error = SimError;
}

impl i2c::I2c for SimBus {
    fn transaction(&mut self,
        address:    u8,
        operations: &mut [Operation<'_>],
    )
        -> Result<(), Self::Error>
    {
        if address == self.sensor_address {
            if let Some(sensor) = &mut self.sensor {
                return sensor.transaction(operations);
            }
        }
        if address == self.eeprom_address {
            if let Some(eeprom) = &mut self.eeprom {
                return eeprom.transaction(operations);
            }
        }

        Err(SimError::nack_address())
    }
}


/// Model of the LM75B temperature sensor
pub struct SimSensor {
    temperature: f32,
    config:      u8,
    pointer:     u8,
}

impl SimSensor {
    fn new(temperature: f32) -> Self {
        Self {
            temperature,
            // The sensor starts up in normal operation.
            config:  0x00,
            pointer: 0x00,
        }
    }

    pub fn set_temperature(&mut self, temperature: f32) {
        self.temperature = temperature;
    }

    /// The temperature register, as the sensor would send it
    fn temperature_register(&self) -> [u8; 2] {
        let raw = (self.temperature / 0.125).round()
            .clamp(-1024.0, 1023.0) as i16;
        (raw << 5).to_be_bytes()
    }

    fn transaction(&mut self, operations: &mut [Operation<'_>])
        -> Result<(), SimError>
    {
        for operation in operations {
            match operation {
                Operation::Write(bytes) => {
                    if let Some((&pointer, rest)) = bytes.split_first() {
                        self.pointer = pointer;
                        if pointer == 0x01 {
                            if let Some(&config) = rest.first() {
                                self.config = config;
                            }
                        }
                    }
                }
                Operation::Read(buf) => {
                    let register = match self.pointer {
                        0x00 => self.temperature_register(),
                        0x01 => [self.config, self.config],
                        _    => [0, 0],
                    };
                    for (i, b) in buf.iter_mut().enumerate() {
                        *b = register[i % 2];
                    }
                }
            }
        }

        Ok(())
    }
}


/// Model of a 24xx EEPROM with two address bytes
pub struct SimEeprom {
    memory:    Vec<u8>,
    page_size: usize,
    pointer:   usize,
    busy:      usize,

    page_writes: usize,
    committed:   usize,

    nack_writes_after: Option<usize>,
    fail_reads_after:  Option<usize>,
    corrupt:           Option<(usize, u8)>,
    stuck_bits:        u8,
    bytes_read:        usize,
}

impl SimEeprom {
    fn new(page_size: NonZeroUsize, capacity: usize) -> Self {
        Self {
            // Erased EEPROM cells read as `0xff`.
            memory:    vec![0xff; capacity],
            page_size: page_size.get(),
            pointer: 0,
            busy:    0,

            page_writes: 0,
            committed:   0,

            nack_writes_after: None,
            fail_reads_after:  None,
            corrupt:           None,
            stuck_bits:        0,
            bytes_read:        0,
        }
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    /// The number of page writes the EEPROM has accepted
    pub fn page_writes(&self) -> usize {
        self.page_writes
    }

    /// Stop acknowledging data, once `n` bytes have been written
    ///
    /// A page write that would go beyond `n` is not acknowledged and leaves
    /// the memory untouched.
    pub fn nack_writes_after(&mut self, n: usize) {
        self.nack_writes_after = Some(n);
        self.committed         = 0;
    }

    /// Fail with a bus error, once `n` bytes have been read
    pub fn fail_reads_after(&mut self, n: usize) {
        self.fail_reads_after = Some(n);
        self.bytes_read       = 0;
    }

    /// Return `value` instead of the stored byte, whenever `address` is read
    pub fn corrupt_reads_at(&mut self, address: u16, value: u8) {
        self.corrupt = Some((address as usize, value));
    }

    /// Force the bits in `mask` high, in every byte that is read
    pub fn stick_bits(&mut self, mask: u8) {
        self.stuck_bits = mask;
    }

    fn transaction(&mut self, operations: &mut [Operation<'_>])
        -> Result<(), SimError>
    {
        if self.busy > 0 {
            self.busy -= 1;
            return Err(SimError::nack_address());
        }

        let mut frame = Vec::new();

        for operation in operations {
            match operation {
                Operation::Write(bytes) => {
                    frame.extend_from_slice(*bytes);
                }
                Operation::Read(buf) => {
                    if let [hi, lo, ..] = frame[..] {
                        self.pointer = u16::from_be_bytes([hi, lo]) as usize;
                    }
                    frame.clear();

                    self.read(buf)?;
                }
            }
        }

        // An empty frame is either a poll, or what's left after a read.
        match frame.len() {
            0 | 1 => Ok(()),
            _     => self.write(&frame),
        }
    }

    fn write(&mut self, frame: &[u8]) -> Result<(), SimError> {
        let address = u16::from_be_bytes([frame[0], frame[1]]) as usize
            % self.memory.len();
        let data = &frame[2..];

        if data.is_empty() {
            self.pointer = address;
            return Ok(());
        }

        if let Some(limit) = self.nack_writes_after {
            if self.committed + data.len() > limit {
                return Err(SimError::nack_data());
            }
        }

        // Writes that go beyond the end of the page wrap around to its start.
        let page   = address - address % self.page_size;
        let offset = address % self.page_size;
        for (i, &b) in data.iter().enumerate() {
            let address = page + (offset + i) % self.page_size;
            self.memory[address] = b;
        }

        self.pointer      = page + (offset + data.len()) % self.page_size;
        self.committed   += data.len();
        self.page_writes += 1;
        self.busy         = BUSY_POLLS;

        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<(), SimError> {
        for b in buf.iter_mut() {
            if let Some(limit) = self.fail_reads_after {
                if self.bytes_read >= limit {
                    return Err(SimError(ErrorKind::Bus));
                }
            }

            let address = self.pointer % self.memory.len();
            *b = match self.corrupt {
                Some((corrupt, value)) if corrupt == address => value,
                _ => self.memory[address],
            };
            *b |= self.stuck_bits;

            self.pointer     = address + 1;
            self.bytes_read += 1;
        }

        Ok(())
    }
}


#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SimError(pub ErrorKind);

impl SimError {
    fn nack_address() -> Self {
        Self(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address))
    }

    fn nack_data() -> Self {
        Self(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data))
    }
}

impl i2c::Error for SimError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}
