//! Test stand configuration


use std::{
    fs::File,
    io::prelude::*,
    path::{
        Path,
        PathBuf,
    },
};

use serde::{
    Deserialize,
    de::DeserializeOwned,
};

use crate::Error;


/// The configuration file that is read, unless another one is specified
pub const DEFAULT_PATH: &str = "test-stand.toml";


/// The configuration options for the test stand itself
///
/// The configuration file can contain more than this. Test suites read their
/// own options from the same file, using [`read_file`].
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Path to the serial device connected to the test target
    pub target: Option<String>,
}

impl Config {
    /// Read configuration from the `test-stand.toml` file
    pub fn read() -> Result<Self, ConfigReadError> {
        Self::read_from(DEFAULT_PATH)
    }

    /// Read configuration from the given file
    pub fn read_from(path: impl AsRef<Path>) -> Result<Self, ConfigReadError> {
        read_file(path)
    }
}


/// Read and parse any TOML configuration file
pub fn read_file<T>(path: impl AsRef<Path>) -> Result<T, ConfigReadError>
    where T: DeserializeOwned
{
    let path = path.as_ref();

    read_inner(path)
        .map_err(|err| ConfigReadError { path: path.to_path_buf(), err })
}

fn read_inner<T>(path: &Path) -> Result<T, Error>
    where T: DeserializeOwned
{
    // Read configuration file
    let mut config = Vec::new();
    File::open(path)?
        .read_to_end(&mut config)?;

    // Parse configuration file
    let config = toml::from_slice(&config)?;

    Ok(config)
}


/// Error reading the configuration file
#[derive(Debug)]
pub struct ConfigReadError {
    pub path: PathBuf,
    pub err:  Error,
}
