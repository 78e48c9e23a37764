//! Turns the configured cases into runnable test cases


use rand::{
    Rng,
    SeedableRng as _,
    rngs::StdRng,
};

use crate::{
    case::{
        Outcome,
        Procedure,
        TestCase,
    },
    config::{
        Check,
        ConfigError,
        SuiteConfig,
    },
    device::{
        AddressWindow,
        Bus,
    },
    report::Reporter,
    scheduler::{
        RunSummary,
        Scheduler,
    },
    verify::{
        verify_range_roundtrip,
        verify_single_byte,
        verify_temperature,
    },
};


/// Everything the verification procedures need
///
/// The fields are public, so a procedure can borrow the bus and the random
/// source at the same time.
pub struct Bench<B, R> {
    pub bus: B,
    pub rng: R,
}

impl<B> Bench<B, StdRng> {
    /// Create a bench with a seeded random source
    ///
    /// Draws a fresh seed, if none is given. The seed is logged either way, so
    /// a failing run can be repeated with the same payloads.
    pub fn seeded(bus: B, seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(rand::random);
        tracing::info!(seed, "Seeding payload generator");

        Self {
            bus,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}


/// A validated check, ready to run
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Verification {
    Temperature {
        expected:  f32,
        tolerance: f32,
    },
    Range(AddressWindow),
    SingleByte {
        address: u16,
    },
}

impl Verification {
    pub fn new(case: &str, check: &Check) -> Result<Self, ConfigError> {
        let verification = match *check {
            Check::Temperature { expected, tolerance } => {
                Verification::Temperature { expected, tolerance }
            }
            Check::Range { address, len } => {
                let window = AddressWindow::new(address, len)
                    .map_err(|err| ConfigError::InvalidWindow {
                        case: case.to_owned(),
                        err,
                    })?;
                Verification::Range(window)
            }
            Check::SingleByte { address } => {
                Verification::SingleByte { address }
            }
        };

        Ok(verification)
    }
}

impl<B, R> Procedure<Bench<B, R>> for Verification
    where
        B: Bus,
        R: Rng,
{
    fn run(&self, bench: &mut Bench<B, R>) -> Outcome {
        match *self {
            Verification::Temperature { expected, tolerance } => {
                let mut sensor = bench.bus.sensor();
                verify_temperature(&mut sensor, expected, tolerance)
            }
            Verification::Range(window) => {
                let mut store = bench.bus.store();
                verify_range_roundtrip(&mut store, &mut bench.rng, window)
            }
            Verification::SingleByte { address } => {
                let mut store = bench.bus.store();
                verify_single_byte(&mut store, &mut bench.rng, address)
            }
        }
    }
}


/// Build the test cases from the configuration
///
/// Validates the whole configuration first. Nothing is built, if any of it is
/// invalid.
pub fn build<C>(config: &SuiteConfig) -> Result<Vec<TestCase<C>>, ConfigError>
    where Verification: Procedure<C>
{
    config.validate()?;

    config.cases
        .iter()
        .map(|case| {
            let verification = Verification::new(&case.name, &case.check)?;
            Ok(TestCase::new(case.name.clone(), case.policy, verification))
        })
        .collect()
}


/// Run the configured cases against a bus
///
/// Returns an error without touching the bus, if the configuration is
/// invalid.
pub fn run<B>(config: &SuiteConfig, bus: B, reporter: &mut dyn Reporter)
    -> Result<RunSummary, ConfigError>
    where B: Bus
{
    let cases = build(config)?;

    let mut bench     = Bench::seeded(bus, config.seed);
    let mut scheduler = Scheduler::new(cases);

    Ok(scheduler.run_session(&mut bench, reporter, config.timeout()))
}
