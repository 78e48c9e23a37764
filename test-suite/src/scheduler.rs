//! Runs test cases in order, and keeps track of how they went


use std::{
    fmt,
    time::Duration,
};

use crate::{
    case::{
        CaseState,
        FailurePolicy,
        Outcome,
        TestCase,
    },
    report::Reporter,
    session::Session,
};


/// Runs a fixed list of test cases, one after the other
///
/// A failed case doesn't stop the run, unless its policy says so. Cases are
/// independent of each other, so the run goes on with the next one.
pub struct Scheduler<C> {
    cases: Vec<TestCase<C>>,
    state: RunState,
}

impl<C> Scheduler<C> {
    pub fn new(cases: Vec<TestCase<C>>) -> Self {
        Self {
            cases,
            state: RunState::NotStarted,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Run all cases within a new session
    pub fn run_session(&mut self,
        context:  &mut C,
        reporter: &mut dyn Reporter,
        timeout:  Duration,
    )
        -> RunSummary
    {
        let names: Vec<_> = self.cases.iter().map(|case| case.name()).collect();
        let mut session = Session::start(reporter, timeout, &names);

        let summary = self.run(context, &mut session);
        session.finish(&summary);

        summary
    }

    /// Run all cases, in order
    ///
    /// The session is checked for expiry before each case. A case that is
    /// running when the budget runs out is not interrupted, but the run still
    /// counts as timed out once it returns.
    pub fn run(&mut self, context: &mut C, session: &mut Session) -> RunSummary {
        let mut cases: Vec<_> = self.cases.iter()
            .map(|case| CaseRecord::pending(case.name()))
            .collect();

        self.state = RunState::InProgress;

        for (case, record) in self.cases.iter().zip(&mut cases) {
            if session.expired() {
                tracing::warn!(
                    timeout = ?session.timeout(),
                    next    = case.name(),
                    "Session timed out",
                );
                self.state = RunState::TimedOut;
                break;
            }

            record.state = CaseState::Running;
            session.case_started(case.name());
            tracing::info!(case = case.name(), "Running");

            let outcome = case.run(context);

            if outcome.passed {
                record.state = CaseState::Passed;
                tracing::info!(case = case.name(), "Passed");
            }
            else {
                record.state = CaseState::Failed;
                tracing::warn!(
                    case    = case.name(),
                    message = outcome.message.as_deref().unwrap_or(""),
                    "Failed",
                );
            }

            session.case_finished(case.name(), &outcome);
            record.outcome = Some(outcome);

            if record.state == CaseState::Failed
                && case.policy() == FailurePolicy::Abort
            {
                tracing::warn!(case = case.name(), "Aborting run");
                self.state = RunState::Aborted;
                break;
            }
        }

        if self.state == RunState::InProgress {
            self.state = if session.expired() {
                tracing::warn!(
                    timeout = ?session.timeout(),
                    elapsed = ?session.elapsed(),
                    "Session ran past its time budget",
                );
                RunState::TimedOut
            }
            else {
                RunState::Complete
            };
        }

        RunSummary {
            state: self.state,
            cases,
        }
    }
}


#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RunState {
    NotStarted,
    InProgress,

    /// Every case ran
    Complete,

    /// A case with the abort policy failed
    Aborted,

    /// The session ran out of time
    ///
    /// Either before every case ran, or while the last one was running.
    TimedOut,
}


/// What happened to a single case
#[derive(Clone, Debug, PartialEq)]
pub struct CaseRecord {
    pub name:    String,
    pub state:   CaseState,

    /// Only available, if the case ran
    pub outcome: Option<Outcome>,
}

impl CaseRecord {
    fn pending(name: &str) -> Self {
        Self {
            name:    name.to_owned(),
            state:   CaseState::Pending,
            outcome: None,
        }
    }
}


/// The result of a run
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub state: RunState,

    /// One record per case, in the order they were registered
    pub cases: Vec<CaseRecord>,
}

impl RunSummary {
    pub fn passed(&self) -> usize {
        self.count(CaseState::Passed)
    }

    pub fn failed(&self) -> usize {
        self.count(CaseState::Failed)
    }

    /// The number of cases that never ran
    pub fn not_run(&self) -> usize {
        self.count(CaseState::Pending)
    }

    pub fn timed_out(&self) -> bool {
        self.state == RunState::TimedOut
    }

    pub fn verdict(&self) -> Verdict {
        if self.timed_out() {
            return Verdict::Incomplete;
        }
        if self.failed() > 0 || self.state != RunState::Complete {
            return Verdict::Failed;
        }

        Verdict::Passed
    }

    fn count(&self, state: CaseState) -> usize {
        self.cases.iter().filter(|case| case.state == state).count()
    }
}


/// The aggregate result of a run
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Verdict {
    /// Every case ran and passed
    Passed,

    /// At least one case failed
    Failed,

    /// The session ran out of time
    Incomplete,
}

impl Verdict {
    /// The exit code of the runner
    pub fn exit_code(&self) -> u8 {
        match self {
            Verdict::Passed     => 0,
            Verdict::Failed     => 1,
            Verdict::Incomplete => 2,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Verdict::Passed     => "passed",
            Verdict::Failed     => "failed",
            Verdict::Incomplete => "incomplete",
        };

        write!(f, "{}", s)
    }
}
