use std::{
    path::Path,
    sync::{
        LockResult,
        Mutex,
        MutexGuard,
    },
};

use lazy_static::lazy_static;

use crate::{
    config::{
        self,
        Config,
        ConfigReadError,
    },
    conn::{
        Conn,
        ConnInitError,
    },
};


/// An instance of the test stand
///
/// Holds all the resources that a test case might require.
pub struct TestStand {
    /// Guarantees exclusive access to the I2C bus on the test target
    ///
    /// Must not be dropped while this exclusive access is required. Once it is
    /// dropped, another test case might start running immediately.
    pub guard: LockResult<MutexGuard<'static, ()>>,

    /// Connection to the test target
    ///
    /// This field will be `Err`, if the test target has not been specified in
    /// the configuration file.
    pub target: Result<Conn, NotConfiguredError>,
}

impl TestStand {
    /// Create a new instance of `TestStand` from `test-stand.toml`
    pub fn new() -> Result<Self, TestStandInitError> {
        Self::from_config(config::DEFAULT_PATH)
    }

    /// Create a new instance of `TestStand` from the given configuration file
    pub fn from_config(path: impl AsRef<Path>)
        -> Result<Self, TestStandInitError>
    {
        let guard = Self::lock();

        let config = Config::read_from(path)
            .map_err(|err| TestStandInitError::ConfigRead(err))?;

        let mut target = Err(NotConfiguredError("target"));

        if let Some(path) = config.target {
            target = Ok(
                Conn::new(&path)
                    .map_err(|err| TestStandInitError::ConnInit(err))?
            );
        }

        Ok(
            Self {
                guard,
                target,
            },
        )
    }

    /// Acquire exclusive access to the test stand
    ///
    /// All test cases share one physical I2C bus, so they must never run
    /// concurrently. By default, Rust runs tests in parallel on multiple
    /// threads, and there doesn't seem to be a way to configure that in
    /// `Cargo.toml`.
    ///
    /// The returned guard keeps the mutex locked until it is dropped.
    /// Concurrent calls block here, until the holder of the guard is done.
    ///
    /// Please note that this returns a `Result` that we don't unwrap. Doing so
    /// is not necessary, as the error case just tells us that another thread
    /// holding this lock panicked. We don't care about that, as the mutex is
    /// still acquired in that case.
    pub fn lock() -> LockResult<MutexGuard<'static, ()>> {
        lazy_static! { static ref MUTEX: Mutex<()> = Mutex::new(()); }
        MUTEX.lock()
    }
}


/// Error initializing the test stand
#[derive(Debug)]
pub enum TestStandInitError {
    /// Error reading configuration
    ConfigRead(ConfigReadError),

    /// Error initializing a serial connection
    ConnInit(ConnInitError),
}

/// The resource you tried to access was not specified in the configuration file
///
/// If something isn't specified the configuration file, it is not going to be
/// available.
#[derive(Clone, Copy, Debug)]
pub struct NotConfiguredError(pub &'static str);
