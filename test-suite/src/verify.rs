//! The verification procedures
//!
//! Each procedure drives one device through a check and turns everything
//! that goes wrong into a failed [`Outcome`]. None of them returns early on
//! the first mismatch. All failed checks end up in the message.


use rand::Rng;

use crate::{
    case::Outcome,
    device::{
        AddressWindow,
        ByteStore,
        TemperatureSensor,
    },
    payload::{
        Payload,
        Text,
        random_char,
        until_terminator,
    },
};


/// Check that the temperature reading is plausible
///
/// Fails, if the sensor doesn't report itself as open, as a sensor that is
/// not on the bus might still yield a reading of zero. Also fails, if the
/// reading is not within `tolerance` of `expected`.
pub fn verify_temperature<S>(sensor: &mut S, expected: f32, tolerance: f32)
    -> Outcome
    where S: TemperatureSensor
{
    let mut failures = Vec::new();

    match sensor.read_temperature() {
        Ok(reading) => {
            tracing::info!(reading, "Temperature read");

            // A NaN reading is never within the tolerance.
            let within = (reading - expected).abs() <= tolerance;
            if !within {
                failures.push(format!(
                    "temperature {} is not within {} of {}",
                    reading, tolerance, expected,
                ));
            }
        }
        Err(err) => {
            failures.push(format!("failed to read temperature: {:?}", err));
        }
    }

    match sensor.is_open() {
        Ok(true) => {}
        Ok(false) => {
            failures.push("failed to open sensor".to_owned());
        }
        Err(err) => {
            failures.push(format!("failed to open sensor: {:?}", err));
        }
    }

    Outcome::from_failures(failures)
}


/// Write a random payload to `window` and read it back
///
/// Passes, only if the data read back equals the data written, both as a
/// string and over the whole window, and the same number of bytes was
/// written and read.
pub fn verify_range_roundtrip<S, R>(
    store:  &mut S,
    rng:    &mut R,
    window: AddressWindow,
)
    -> Outcome
    where
        S: ByteStore,
        R: Rng + ?Sized,
{
    let len     = window.len().get();
    let payload = Payload::generate(rng, window.len());

    tracing::debug!(%window, len, %payload, "Writing payload");

    let written = match store.write(window.base(), payload.as_bytes()) {
        Ok(written) => written,
        Err(err)    => return Outcome::fail(format!("write failed: {:?}", err)),
    };

    let mut buf = vec![0; len];
    let read = match store.read(window.base(), &mut buf) {
        Ok(read) => read,
        Err(err) => return Outcome::fail(format!("read failed: {:?}", err)),
    };

    tracing::debug!(
        %window,
        written,
        read,
        sent     = %payload,
        received = %Text(&buf),
        "Read back payload",
    );

    let mut failures = Vec::new();

    if until_terminator(payload.as_bytes()) != until_terminator(&buf) {
        failures.push(format!(
            "string mismatch: wrote \"{}\", read \"{}\"",
            payload,
            Text(&buf),
        ));
    }
    if let Some(offset) = first_difference(payload.as_bytes(), &buf) {
        failures.push(format!(
            "data mismatch at {:#06x}: wrote {:#04x}, read {:#04x}",
            window.base() as usize + offset,
            payload.as_bytes()[offset],
            buf[offset],
        ));
    }
    if written != read {
        failures.push(format!(
            "count mismatch: wrote {} bytes, read {} bytes",
            written, read,
        ));
    }
    else if written != len {
        failures.push(format!(
            "short transfer: {} of {} bytes",
            written, len,
        ));
    }

    Outcome::from_failures(failures)
}


/// Write a single random character to `address` and read it back
///
/// Uses the single-byte operations of the store, not the multi-byte ones.
pub fn verify_single_byte<S, R>(store: &mut S, rng: &mut R, address: u16)
    -> Outcome
    where
        S: ByteStore,
        R: Rng + ?Sized,
{
    let written = random_char(rng);

    if let Err(err) = store.write_byte(address, written) {
        return Outcome::fail(format!("write failed: {:?}", err));
    }
    let read = match store.read_byte(address) {
        Ok(read) => read,
        Err(err) => return Outcome::fail(format!("read failed: {:?}", err)),
    };

    tracing::debug!(
        address,
        written = %written.escape_ascii(),
        read    = %read.escape_ascii(),
        "Single byte round trip",
    );

    if read != written {
        return Outcome::fail(format!(
            "character read ('{}') does not equal character written ('{}')",
            read.escape_ascii(),
            written.escape_ascii(),
        ));
    }

    Outcome::pass()
}


fn first_difference(a: &[u8], b: &[u8]) -> Option<usize> {
    a.iter()
        .zip(b)
        .position(|(a, b)| a != b)
        .or_else(|| (a.len() != b.len()).then_some(a.len().min(b.len())))
}
