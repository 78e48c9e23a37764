use host_lib::test_stand::{
    NotConfiguredError,
    TestStandInitError,
};

use crate::{
    config::ConfigError,
    device::remote::TargetError,
};


/// Result type specific to this test suite
pub type Result<T = ()> = std::result::Result<T, Error>;


/// Error type specific to this test suite
#[derive(Debug)]
pub enum Error {
    Config(ConfigError),
    NotConfigured(NotConfiguredError),
    Target(TargetError),
    TestStandInit(TestStandInitError),
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<NotConfiguredError> for Error {
    fn from(err: NotConfiguredError) -> Self {
        Self::NotConfigured(err)
    }
}

impl From<TargetError> for Error {
    fn from(err: TargetError) -> Self {
        Self::Target(err)
    }
}

impl From<TestStandInitError> for Error {
    fn from(err: TestStandInitError) -> Self {
        Self::TestStandInit(err)
    }
}
