//! Validation of the I2C bus on the test target
//!
//! Checks the LM75B temperature sensor and the EEPROM on the bus. The cases
//! run one after the other. A failed case is recorded, and the run goes on
//! with the next one.
//!
//! The verification procedures in [`verify`] only know about the device
//! capabilities in [`device`]. They run unchanged against the firmware on
//! the test target, against devices driven directly through `embedded-hal`,
//! and against the simulated bus.


pub mod case;
pub mod config;
pub mod device;
pub mod error;
pub mod logging;
pub mod payload;
pub mod registry;
pub mod report;
pub mod scheduler;
pub mod session;
pub mod test_stand;
pub mod verify;


pub use self::{
    case::{
        FailurePolicy,
        Outcome,
        TestCase,
    },
    config::SuiteConfig,
    error::{
        Error,
        Result,
    },
    registry::Bench,
    scheduler::{
        RunSummary,
        Scheduler,
        Verdict,
    },
    test_stand::TestStand,
};
