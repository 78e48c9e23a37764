//! Log output
//!
//! Everything is logged through `tracing`. The filter comes from `RUST_LOG`
//! and defaults to `info`, so the payloads and byte counts only show up with
//! `RUST_LOG=debug`.


use std::sync::Once;

use tracing_subscriber::{
    EnvFilter,
    layer::SubscriberExt as _,
    util::SubscriberInitExt as _,
};


/// Install the log subscriber for the runner
///
/// Logs go to stderr, as stdout carries the report.
pub fn init() {
    let result = tracing_subscriber::registry()
        .with(filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();

    if let Err(err) = result {
        eprintln!("Failed to install log subscriber: {}", err);
    }
}

/// Install a log subscriber that writes through the test harness
///
/// Can be called from every test. Only the first call has an effect.
pub fn init_for_tests() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // Fails, if another test binary installed a subscriber already. That
        // one will do.
        let _ = tracing_subscriber::registry()
            .with(filter())
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .compact(),
            )
            .try_init();
    });
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
