//! The verification session
//!
//! A session holds the time budget of a run and the channel its results are
//! reported through.


use std::time::{
    Duration,
    Instant,
};

use crate::{
    case::Outcome,
    report::Reporter,
    scheduler::{
        RunSummary,
        Verdict,
    },
};


pub struct Session<'r> {
    reporter: &'r mut dyn Reporter,
    timeout:  Duration,
    started:  Instant,
}

impl<'r> Session<'r> {
    /// Start a session, before the first case runs
    ///
    /// Announces the cases to the reporter and starts the clock.
    pub fn start(
        reporter: &'r mut dyn Reporter,
        timeout:  Duration,
        cases:    &[&str],
    )
        -> Self
    {
        tracing::info!(?timeout, cases = cases.len(), "Starting session");
        reporter.session_started(timeout, cases);

        Self {
            reporter,
            timeout,
            started: Instant::now(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Indicates whether the time budget is used up
    pub fn expired(&self) -> bool {
        self.elapsed() >= self.timeout
    }

    pub fn case_started(&mut self, name: &str) {
        self.reporter.case_started(name);
    }

    pub fn case_finished(&mut self, name: &str, outcome: &Outcome) {
        self.reporter.case_finished(name, outcome);
    }

    /// Finish the session, after the last case
    ///
    /// Hands the summary to the reporter and returns the verdict of the run.
    pub fn finish(self, summary: &RunSummary) -> Verdict {
        let verdict = summary.verdict();

        tracing::info!(
            %verdict,
            passed  = summary.passed(),
            failed  = summary.failed(),
            not_run = summary.not_run(),
            elapsed = ?self.elapsed(),
            "Session finished",
        );
        self.reporter.session_finished(summary);

        verdict
    }
}
