//! Random test data for the EEPROM checks


use std::{
    fmt,
    num::NonZeroUsize,
};

use rand::Rng;


/// The first symbol of the payload alphabet
pub const ALPHABET_START: u8 = b'A';

/// The number of symbols in the payload alphabet
pub const ALPHABET_LEN: u8 = 26;

/// Marks the end of a payload, when it is treated as a string
pub const TERMINATOR: u8 = 0;


/// A string of random upper-case letters, followed by a terminator
///
/// The terminator always occupies the last byte, so a payload of length `n`
/// carries `n - 1` random characters.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Payload(Vec<u8>);

impl Payload {
    /// Generate a fresh payload of the given length
    pub fn generate<R>(rng: &mut R, len: NonZeroUsize) -> Self
        where R: Rng + ?Sized
    {
        let mut bytes = Vec::with_capacity(len.get());

        bytes.extend((1 .. len.get()).map(|_| random_char(&mut *rng)));
        bytes.push(TERMINATOR);

        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for Payload {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", Text(&self.0))
    }
}


/// Draw one character from the payload alphabet
pub fn random_char<R>(rng: &mut R) -> u8
    where R: Rng + ?Sized
{
    ALPHABET_START + rng.gen_range(0 .. ALPHABET_LEN)
}

/// The part of a buffer that precedes its first terminator
///
/// Returns the whole buffer, if it contains no terminator. Two buffers hold
/// the same string, if these slices are equal.
pub fn until_terminator(buf: &[u8]) -> &[u8] {
    match buf.iter().position(|&b| b == TERMINATOR) {
        Some(end) => &buf[..end],
        None      => buf,
    }
}


/// Displays a buffer as the string it holds
///
/// Stops at the first terminator. Bytes that aren't printable ASCII are
/// escaped, as a buffer read back from a faulty EEPROM can contain anything.
pub struct Text<'r>(pub &'r [u8]);

impl fmt::Display for Text<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for &b in until_terminator(self.0) {
            write!(f, "{}", b.escape_ascii())?;
        }
        Ok(())
    }
}
