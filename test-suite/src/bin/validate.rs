//! Runs the I2C validation cases and reports to the test host
//!
//! Exits with 0, if all cases passed, 1 if any case failed, 2 if the session
//! timed out, and 3 if the run couldn't even start.


use std::{
    io,
    path::PathBuf,
    process::ExitCode,
};

use clap::Parser;

use i2c_test_suite::{
    Result,
    SuiteConfig,
    TestStand,
    Verdict,
    device::{
        hal::HalBus,
        sim::SimBus,
    },
    logging,
    registry,
    report::GreenteaReporter,
};


const SETUP_ERROR: u8 = 3;


/// Validate the temperature sensor and EEPROM on the I2C bus
#[derive(Debug, Parser)]
#[command(name = "i2c-validate", version)]
struct Args {
    /// The configuration file
    #[arg(long, default_value = host_lib::config::DEFAULT_PATH)]
    config: PathBuf,

    /// Seed for the payload generator
    #[arg(long)]
    seed: Option<u64>,

    /// The time budget for the whole run, in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Run against the simulated bus, instead of the test target
    #[arg(long)]
    simulate: bool,
}


fn main() -> ExitCode {
    logging::init();

    let args = Args::parse();

    match run(&args) {
        Ok(verdict) => {
            ExitCode::from(verdict.exit_code())
        }
        Err(err) => {
            tracing::error!(?err, "Failed to run validation");
            ExitCode::from(SETUP_ERROR)
        }
    }
}

fn run(args: &Args) -> Result<Verdict> {
    let mut config = if args.simulate && !args.config.exists() {
        tracing::info!(
            path = %args.config.display(),
            "No configuration file; using defaults",
        );
        SuiteConfig::default()
    }
    else {
        SuiteConfig::read_from(&args.config)?
    };

    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(timeout) = args.timeout {
        config.timeout = timeout;
    }

    // Reject a broken configuration, before opening the connection.
    config.validate()?;

    let mut reporter = GreenteaReporter::new(io::stdout().lock());

    let summary = if args.simulate {
        let bus = HalBus::new(SimBus::new(&config.devices), config.devices);
        registry::run(&config, bus, &mut reporter)?
    }
    else {
        let test_stand = TestStand::from_config(&args.config)?;
        registry::run(&config, test_stand.target, &mut reporter)?
    };

    Ok(summary.verdict())
}
