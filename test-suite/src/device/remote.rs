//! Devices that are driven by the firmware on the test target


use std::time::Duration;

use host_lib::conn::{
    Conn,
    ConnReceiveError,
    ConnSendError,
};
use protocol::{
    DriverError,
    HostToTarget,
    MAX_TRANSFER,
    TargetToHost,
};

use super::{
    Bus,
    ByteStore,
    TemperatureSensor,
};


/// The connection to the test target
///
/// The firmware on the target owns the I2C bus and the drivers for the
/// temperature sensor and the EEPROM. Every method sends one request and
/// waits for the reply.
pub struct Target {
    conn:    Conn,
    timeout: Duration,
}

impl Target {
    pub fn new(conn: Conn) -> Self {
        Self {
            conn,
            timeout: Duration::from_millis(500),
        }
    }

    /// Change how long to wait for each reply from the target
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Ask the target whether the temperature sensor responds
    pub fn sensor_is_open(&mut self) -> Result<bool, TargetError> {
        self.request(&HostToTarget::SensorIsOpen, |reply| {
            match reply {
                TargetToHost::SensorStatus { open } => Ok(open),
                reply                               => Err(reply),
            }
        })
    }

    /// Ask the target for a temperature reading
    pub fn temperature(&mut self) -> Result<f32, TargetError> {
        self.request(&HostToTarget::ReadTemperature, |reply| {
            match reply {
                TargetToHost::Temperature(temperature) => Ok(temperature),
                reply                                  => Err(reply),
            }
        })
    }

    /// Instruct the target to write data to the EEPROM
    ///
    /// Data that doesn't fit into one request is split up. Stops at the first
    /// request that the target didn't complete, and returns how many bytes
    /// were written up to that point.
    pub fn write_eeprom(&mut self, address: u16, data: &[u8])
        -> Result<usize, TargetError>
    {
        let mut written = 0;

        for chunk in data.chunks(MAX_TRANSFER) {
            let address = offset(address, written)?;

            let n = self.request(
                &HostToTarget::WriteEeprom { address, data: chunk },
                |reply| {
                    match reply {
                        TargetToHost::EepromWritten { written } => {
                            Ok(written as usize)
                        }
                        reply => {
                            Err(reply)
                        }
                    }
                },
            )?;

            written += n.min(chunk.len());
            if n < chunk.len() {
                break;
            }
        }

        Ok(written)
    }

    /// Instruct the target to read data from the EEPROM
    ///
    /// Like `write_eeprom`, this stops at the first short reply and returns
    /// how many bytes were read.
    pub fn read_eeprom(&mut self, address: u16, buf: &mut [u8])
        -> Result<usize, TargetError>
    {
        let mut read = 0;

        for chunk in buf.chunks_mut(MAX_TRANSFER) {
            let address = offset(address, read)?;
            let len     = chunk.len() as u16;

            let n = self.request(
                &HostToTarget::ReadEeprom { address, len },
                |reply| {
                    match reply {
                        TargetToHost::EepromRead { data } => {
                            let n = data.len().min(chunk.len());
                            chunk[..n].copy_from_slice(&data[..n]);
                            Ok(n)
                        }
                        reply => {
                            Err(reply)
                        }
                    }
                },
            )?;

            read += n;
            if n < chunk.len() {
                break;
            }
        }

        Ok(read)
    }

    /// Instruct the target to write a single byte to the EEPROM
    pub fn write_eeprom_byte(&mut self, address: u16, value: u8)
        -> Result<(), TargetError>
    {
        self.request(
            &HostToTarget::WriteEepromByte { address, value },
            |reply| {
                match reply {
                    TargetToHost::EepromByteWritten => Ok(()),
                    reply                           => Err(reply),
                }
            },
        )
    }

    /// Instruct the target to read a single byte from the EEPROM
    pub fn read_eeprom_byte(&mut self, address: u16)
        -> Result<u8, TargetError>
    {
        self.request(&HostToTarget::ReadEepromByte { address }, |reply| {
            match reply {
                TargetToHost::EepromByte(value) => Ok(value),
                reply                           => Err(reply),
            }
        })
    }

    /// Send a request and hand the reply to `handle`
    ///
    /// `handle` returns the reply back, if it's not the one it expected. A
    /// driver error is handled here, before `handle` ever sees it.
    fn request<T, F>(&mut self, request: &HostToTarget, handle: F)
        -> Result<T, TargetError>
        where F: for<'r> FnOnce(TargetToHost<'r>) -> Result<T, TargetToHost<'r>>
    {
        self.conn.send(request)
            .map_err(|err| TargetError::Send(err))?;

        let mut buf = Vec::new();
        let reply = self.conn.receive::<TargetToHost>(self.timeout, &mut buf)
            .map_err(|err| TargetError::Receive(err))?;

        if let TargetToHost::DriverError(err) = reply {
            tracing::debug!(?request, ?err, "Target reported driver error");
            return Err(TargetError::Driver(err));
        }

        handle(reply)
            .map_err(|reply|
                TargetError::UnexpectedMessage(format!("{:?}", reply))
            )
    }
}

impl TemperatureSensor for Target {
    type Error = TargetError;

    fn is_open(&mut self) -> Result<bool, Self::Error> {
        self.sensor_is_open()
    }

    fn read_temperature(&mut self) -> Result<f32, Self::Error> {
        self.temperature()
    }
}

impl ByteStore for Target {
    type Error = TargetError;

    fn write(&mut self, address: u16, data: &[u8])
        -> Result<usize, Self::Error>
    {
        self.write_eeprom(address, data)
    }

    fn read(&mut self, address: u16, buf: &mut [u8])
        -> Result<usize, Self::Error>
    {
        self.read_eeprom(address, buf)
    }

    fn write_byte(&mut self, address: u16, value: u8)
        -> Result<(), Self::Error>
    {
        self.write_eeprom_byte(address, value)
    }

    fn read_byte(&mut self, address: u16) -> Result<u8, Self::Error> {
        self.read_eeprom_byte(address)
    }
}

impl Bus for Target {
    type Sensor<'r> = &'r mut Target;
    type Store<'r>  = &'r mut Target;

    fn sensor(&mut self) -> Self::Sensor<'_> {
        self
    }

    fn store(&mut self) -> Self::Store<'_> {
        self
    }
}


fn offset(address: u16, offset: usize) -> Result<u16, TargetError> {
    u16::try_from(address as usize + offset)
        .map_err(|_| TargetError::Driver(DriverError::OutOfRange))
}


#[derive(Debug)]
pub enum TargetError {
    Send(ConnSendError),
    Receive(ConnReceiveError),
    Driver(DriverError),
    UnexpectedMessage(String),
}


#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        io,
        sync::{
            Arc,
            Mutex,
        },
        time::Duration,
    };

    use host_lib::{
        Conn,
        conn::Port,
    };
    use protocol::{
        DriverError,
        MAX_TRANSFER,
        TargetToHost,
    };

    use crate::device::ByteStore as _;

    use super::{
        Target,
        TargetError,
    };


    /// A fake target that answers each request with the next queued reply
    #[derive(Clone, Default)]
    struct FakeTarget {
        replies:  Arc<Mutex<VecDeque<Vec<u8>>>>,
        pending:  Arc<Mutex<VecDeque<u8>>>,
        requests: Arc<Mutex<Vec<u8>>>,
    }

    impl FakeTarget {
        fn reply(&self, reply: TargetToHost) -> &Self {
            let mut buf = [0; 256];
            let frame = postcard::to_slice_cobs(&reply, &mut buf).unwrap();
            self.replies.lock().unwrap().push_back(frame.to_vec());
            self
        }

        fn requests(&self) -> usize {
            let requests = self.requests.lock().unwrap();
            requests.iter().filter(|&&b| b == 0).count()
        }
    }

    impl io::Read for FakeTarget {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let mut pending = self.pending.lock().unwrap();
            match pending.pop_front() {
                Some(b) => {
                    buf[0] = b;
                    Ok(1)
                }
                None => {
                    Err(io::ErrorKind::TimedOut.into())
                }
            }
        }
    }

    impl io::Write for FakeTarget {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.requests.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            // A complete request has been sent. Make the next reply available.
            if let Some(reply) = self.replies.lock().unwrap().pop_front() {
                self.pending.lock().unwrap().extend(reply);
            }
            Ok(())
        }
    }

    impl Port for FakeTarget {
        fn set_timeout(&mut self, _: Duration) -> host_lib::Result {
            Ok(())
        }
    }

    fn target(fake: &FakeTarget) -> Target {
        Target::new(Conn::from_port(fake.clone()))
            .with_timeout(Duration::from_millis(10))
    }


    #[test]
    fn it_should_read_the_temperature() {
        let fake = FakeTarget::default();
        fake.reply(TargetToHost::Temperature(25.0));

        let temperature = target(&fake).temperature().unwrap();

        assert_eq!(temperature, 25.0);
    }

    #[test]
    fn it_should_split_long_writes_into_multiple_requests() {
        let fake = FakeTarget::default();
        fake.reply(TargetToHost::EepromWritten { written: MAX_TRANSFER as u16 })
            .reply(TargetToHost::EepromWritten { written: 22 });

        let data = [b'A'; MAX_TRANSFER + 22];
        let written = target(&fake).write(1, &data).unwrap();

        assert_eq!(written, MAX_TRANSFER + 22);
        assert_eq!(fake.requests(), 2);
    }

    #[test]
    fn it_should_stop_at_the_first_short_write() {
        let fake = FakeTarget::default();
        fake.reply(TargetToHost::EepromWritten { written: 100 });

        let data = [b'A'; MAX_TRANSFER + 22];
        let written = target(&fake).write(1, &data).unwrap();

        assert_eq!(written, 100);
        assert_eq!(fake.requests(), 1);
    }

    #[test]
    fn it_should_pass_through_a_truncated_read() {
        let fake = FakeTarget::default();
        fake.reply(TargetToHost::EepromRead { data: b"ABCDEFGH" });

        let mut buf = [0; 10];
        let read = target(&fake).read(1, &mut buf).unwrap();

        assert_eq!(read, 8);
        assert_eq!(&buf, b"ABCDEFGH\0\0");
    }

    #[test]
    fn it_should_turn_driver_errors_into_errors() {
        let fake = FakeTarget::default();
        fake.reply(TargetToHost::DriverError(DriverError::NoAcknowledge));

        let err = target(&fake).read_byte(1).unwrap_err();

        assert!(matches!(err, TargetError::Driver(DriverError::NoAcknowledge)));
    }

    #[test]
    fn it_should_reject_unexpected_replies() {
        let fake = FakeTarget::default();
        fake.reply(TargetToHost::EepromByte(b'Q'));

        let err = target(&fake).sensor_is_open().unwrap_err();

        assert!(matches!(err, TargetError::UnexpectedMessage(_)));
    }

    #[test]
    fn it_should_time_out_on_a_silent_target() {
        let fake = FakeTarget::default();

        let err = target(&fake).write_byte(1, b'Q').unwrap_err();

        match err {
            TargetError::Receive(err) => assert!(err.is_timeout()),
            err                       => panic!("unexpected error: {:?}", err),
        }
    }
}
