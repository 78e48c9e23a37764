use std::{
    path::Path,
    sync::{
        LockResult,
        MutexGuard,
    },
};

use host_lib::config;

use crate::{
    Result,
    device::remote::Target,
};


/// An instance of the test stand
///
/// Used to access all resources that a test case requires.
pub struct TestStand {
    _guard: LockResult<MutexGuard<'static, ()>>,

    pub target: Target,
}

impl TestStand {
    /// Initializes the test stand
    ///
    /// Reads the `test-stand.toml` configuration file and initializes test
    /// stand resources, as configured in there.
    pub fn new() -> Result<Self> {
        Self::from_config(config::DEFAULT_PATH)
    }

    /// Initializes the test stand from the given configuration file
    pub fn from_config(path: impl AsRef<Path>) -> Result<Self> {
        let test_stand = host_lib::TestStand::from_config(path)?;

        Ok(
            Self {
                _guard: test_stand.guard,
                target: Target::new(test_stand.target?),
            }
        )
    }
}
