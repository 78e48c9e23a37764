//! Configuration of the test suite
//!
//! The suite shares the `test-stand.toml` file with `host-lib`, which reads
//! the test stand options (like the serial device of the target) from it. The
//! options in here describe the devices on the bus and the cases to run.


use std::{
    collections::HashSet,
    num::NonZeroUsize,
    path::Path,
    time::Duration,
};

use host_lib::config::{
    self,
    ConfigReadError,
};
use serde::Deserialize;

use crate::{
    case::FailurePolicy,
    device::{
        AddressWindow,
        InvalidWindowError,
    },
};


/// The options of the test suite
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SuiteConfig {
    /// The time budget for the whole run, in seconds
    pub timeout: u64,

    /// Seed for the payload generator
    ///
    /// A fresh seed is drawn for every run, if this is not specified.
    pub seed: Option<u64>,

    pub devices: DeviceConfig,

    /// The cases to run, in order
    pub cases: Vec<CaseConfig>,
}

impl SuiteConfig {
    /// Read the suite configuration from the given file
    pub fn read_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = config::read_file(path)
            .map_err(|err| ConfigError::Read(err))?;
        Ok(config)
    }

    /// Parse the suite configuration from a string
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config = toml::from_str(s)
            .map_err(|err| ConfigError::Parse(err))?;
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Check the configuration, before anything touches the bus
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.cases.is_empty() {
            return Err(ConfigError::NoCases);
        }

        let mut names = HashSet::new();
        for case in &self.cases {
            if !is_reportable(&case.name) {
                return Err(ConfigError::InvalidName(case.name.clone()));
            }
            if !names.insert(case.name.as_str()) {
                return Err(ConfigError::DuplicateName(case.name.clone()));
            }

            case.check.validate(&case.name, &self.devices)?;
        }

        Ok(())
    }
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            timeout: 40,
            seed:    None,
            devices: DeviceConfig::default(),
            cases:   default_cases(),
        }
    }
}


/// The devices on the I2C bus
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct DeviceConfig {
    /// 7-bit address of the temperature sensor
    pub sensor_address: u8,

    /// 7-bit address of the EEPROM
    pub eeprom_address: u8,

    /// EEPROM page size, in bytes
    ///
    /// A page size of zero is rejected when parsing.
    pub eeprom_page_size: NonZeroUsize,

    /// EEPROM size, in bytes
    pub eeprom_capacity: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            sensor_address:   0x48,
            eeprom_address:   0x50,
            eeprom_page_size: DEFAULT_PAGE_SIZE,
            eeprom_capacity:  4096,
        }
    }
}

const DEFAULT_PAGE_SIZE: NonZeroUsize = match NonZeroUsize::new(32) {
    Some(page_size) => page_size,
    None            => panic!("page size must not be zero"),
};


/// One entry in the `[[cases]]` list
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CaseConfig {
    pub name: String,

    #[serde(default)]
    pub policy: FailurePolicy,

    #[serde(flatten)]
    pub check: Check,
}

impl CaseConfig {
    pub fn new(name: impl Into<String>, check: Check) -> Self {
        Self {
            name:   name.into(),
            policy: FailurePolicy::default(),
            check,
        }
    }
}


/// What a case checks, and its parameters
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum Check {
    /// Read the temperature and compare it to the expected value
    Temperature {
        expected:  f32,
        tolerance: f32,
    },

    /// Write random data to a range of the EEPROM and read it back
    Range {
        address: u16,
        len:     usize,
    },

    /// Write a single random byte to the EEPROM and read it back
    SingleByte {
        address: u16,
    },
}

impl Check {
    fn validate(&self, case: &str, devices: &DeviceConfig)
        -> Result<(), ConfigError>
    {
        match *self {
            Check::Temperature { tolerance, .. } => {
                if tolerance.is_nan() || tolerance < 0.0 {
                    return Err(ConfigError::InvalidTolerance {
                        case: case.to_owned(),
                        tolerance,
                    });
                }
            }
            Check::Range { address, len } => {
                let window = AddressWindow::new(address, len)
                    .map_err(|err| ConfigError::InvalidWindow {
                        case: case.to_owned(),
                        err,
                    })?;
                check_capacity(case, window, devices)?;
            }
            Check::SingleByte { address } => {
                // Can't fail, the length is not zero and `address` is a `u16`.
                if let Ok(window) = AddressWindow::new(address, 1) {
                    check_capacity(case, window, devices)?;
                }
            }
        }

        Ok(())
    }
}

/// Indicates whether a case name can go into a `{{key;value}}` report line
fn is_reportable(name: &str) -> bool {
    !name.is_empty()
        && !name.chars().any(|c| matches!(c, ';' | '{' | '}') || c.is_control())
}

fn check_capacity(case: &str, window: AddressWindow, devices: &DeviceConfig)
    -> Result<(), ConfigError>
{
    if !window.fits(devices.eeprom_capacity) {
        return Err(ConfigError::BeyondCapacity {
            case:     case.to_owned(),
            window,
            capacity: devices.eeprom_capacity,
        });
    }

    Ok(())
}


/// The cases that run, if the configuration file doesn't list any
pub fn default_cases() -> Vec<CaseConfig> {
    vec![
        CaseConfig::new(
            "I2C - LM75B Temperature Read",
            Check::Temperature { expected: 25.0, tolerance: 20.0 },
        ),
        CaseConfig::new(
            "I2C - EEPROM WR 10 Bytes",
            Check::Range { address: 1, len: 10 },
        ),
        CaseConfig::new(
            "I2C - EEPROM WR 100 Bytes",
            Check::Range { address: 1, len: 100 },
        ),
        CaseConfig::new(
            "I2C - EEPROM WR Single Byte",
            Check::SingleByte { address: 1 },
        ),
    ]
}


#[derive(Debug)]
pub enum ConfigError {
    /// The configuration file could not be read or parsed
    Read(ConfigReadError),

    /// A configuration string could not be parsed
    Parse(toml::de::Error),

    ZeroTimeout,
    NoCases,

    /// Two cases have the same name
    DuplicateName(String),

    /// A case name is empty, or contains `;`, braces or control characters
    InvalidName(String),

    InvalidTolerance {
        case:      String,
        tolerance: f32,
    },

    InvalidWindow {
        case: String,
        err:  InvalidWindowError,
    },

    /// A window extends beyond the end of the EEPROM
    BeyondCapacity {
        case:     String,
        window:   AddressWindow,
        capacity: usize,
    },
}


#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use crate::{
        case::FailurePolicy,
        device::InvalidWindowError,
    };

    use super::{
        Check,
        ConfigError,
        DeviceConfig,
        SuiteConfig,
    };


    #[test]
    fn an_empty_file_yields_the_defaults() {
        let config = SuiteConfig::parse("").unwrap();

        assert_eq!(config, SuiteConfig::default());
        assert_eq!(config.cases.len(), 4);
        config.validate().unwrap();
    }

    #[test]
    fn it_should_parse_a_complete_file() {
        let config = SuiteConfig::parse(r#"
            target  = "/dev/ttyACM0"
            timeout = 10
            seed    = 1234

            [devices]
            sensor_address   = 0x49
            eeprom_address   = 0x51
            eeprom_page_size = 64
            eeprom_capacity  = 8192

            [[cases]]
            name      = "temperature"
            check     = "temperature"
            expected  = 22.5
            tolerance = 5.0
            policy    = "abort"

            [[cases]]
            name    = "range"
            check   = "range"
            address = 0x100
            len     = 200

            [[cases]]
            name    = "byte"
            check   = "single_byte"
            address = 7
        "#).unwrap();

        assert_eq!(config.timeout, 10);
        assert_eq!(config.seed, Some(1234));
        assert_eq!(config.devices, DeviceConfig {
            sensor_address:   0x49,
            eeprom_address:   0x51,
            eeprom_page_size: NonZeroUsize::new(64).unwrap(),
            eeprom_capacity:  8192,
        });

        assert_eq!(config.cases.len(), 3);
        assert_eq!(config.cases[0].policy, FailurePolicy::Abort);
        assert_eq!(
            config.cases[0].check,
            Check::Temperature { expected: 22.5, tolerance: 5.0 },
        );
        assert_eq!(config.cases[1].policy, FailurePolicy::Continue);
        assert_eq!(config.cases[1].check, Check::Range { address: 0x100, len: 200 });
        assert_eq!(config.cases[2].check, Check::SingleByte { address: 7 });

        config.validate().unwrap();
    }

    #[test]
    fn unknown_checks_are_rejected() {
        let result = SuiteConfig::parse(r#"
            [[cases]]
            name  = "flash"
            check = "flash"
        "#);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn zero_length_windows_are_rejected() {
        let config = SuiteConfig::parse(r#"
            [[cases]]
            name    = "empty"
            check   = "range"
            address = 1
            len     = 0
        "#).unwrap();

        match config.validate() {
            Err(ConfigError::InvalidWindow { case, err }) => {
                assert_eq!(case, "empty");
                assert_eq!(err, InvalidWindowError::Empty);
            }
            result => panic!("unexpected result: {:?}", result),
        }
    }

    #[test]
    fn windows_beyond_the_capacity_are_rejected() {
        let config = SuiteConfig::parse(r#"
            [devices]
            eeprom_capacity = 256

            [[cases]]
            name    = "too long"
            check   = "range"
            address = 200
            len     = 100
        "#).unwrap();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::BeyondCapacity { capacity: 256, .. }),
        ));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let config = SuiteConfig::parse(r#"
            [[cases]]
            name    = "byte"
            check   = "single_byte"
            address = 1

            [[cases]]
            name    = "byte"
            check   = "single_byte"
            address = 2
        "#).unwrap();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateName(name)) if name == "byte",
        ));
    }

    #[test]
    fn names_that_would_break_the_report_are_rejected() {
        for name in ["", "a;b", "a}}b", "{{a", "a\nb"] {
            let mut config = SuiteConfig::default();
            config.cases[0].name = name.to_owned();

            assert!(
                matches!(
                    config.validate(),
                    Err(ConfigError::InvalidName(ref n)) if n == name,
                ),
                "{:?} was accepted",
                name,
            );
        }
    }

    #[test]
    fn a_zero_page_size_is_rejected() {
        let result = SuiteConfig::parse(r#"
            [devices]
            eeprom_page_size = 0
        "#);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn negative_tolerances_are_rejected() {
        let mut config = SuiteConfig::default();
        config.cases[0].check =
            Check::Temperature { expected: 25.0, tolerance: -1.0 };

        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTolerance { .. }),
        ));
    }

    #[test]
    fn a_zero_timeout_is_rejected() {
        let config = SuiteConfig { timeout: 0, .. SuiteConfig::default() };

        assert!(matches!(config.validate(), Err(ConfigError::ZeroTimeout)));
    }
}
