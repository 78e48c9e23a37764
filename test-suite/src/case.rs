//! Test cases and their outcomes


use std::fmt;

use serde::Deserialize;


/// The result of running one test case
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Outcome {
    pub passed:  bool,
    pub message: Option<String>,
}

impl Outcome {
    pub fn pass() -> Self {
        Self {
            passed:  true,
            message: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed:  false,
            message: Some(message.into()),
        }
    }

    /// Passes, if no check failed
    ///
    /// Otherwise fails, with a message listing every failed check.
    pub fn from_failures(failures: Vec<String>) -> Self {
        if failures.is_empty() {
            return Self::pass();
        }

        Self::fail(failures.join("; "))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let verdict = if self.passed { "passed" } else { "FAILED" };

        match &self.message {
            Some(message) => write!(f, "{}: {}", verdict, message),
            None          => write!(f, "{}", verdict),
        }
    }
}


/// What the scheduler does, when a case fails
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the run. The remaining cases are not run.
    Abort,

    /// Record the failure and go on with the next case
    #[default]
    Continue,
}


/// The state of a single case within a run
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CaseState {
    Pending,
    Running,
    Passed,
    Failed,
}


/// A check that a test case runs
///
/// `C` is the context the check runs in. It holds whatever the check needs
/// to access, usually the bus and the random source.
pub trait Procedure<C> {
    fn run(&self, context: &mut C) -> Outcome;
}


/// A named procedure, with the policy that applies when it fails
pub struct TestCase<C> {
    name:      String,
    policy:    FailurePolicy,
    procedure: Box<dyn Procedure<C>>,
}

impl<C> TestCase<C> {
    pub fn new(
        name:      impl Into<String>,
        policy:    FailurePolicy,
        procedure: impl Procedure<C> + 'static,
    )
        -> Self
    {
        Self {
            name:      name.into(),
            policy,
            procedure: Box::new(procedure),
        }
    }

    /// Create a test case that runs a closure
    pub fn from_fn<F>(name: impl Into<String>, policy: FailurePolicy, f: F)
        -> Self
        where F: Fn(&mut C) -> Outcome + 'static
    {
        Self::new(name, policy, FnProcedure(f))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn run(&self, context: &mut C) -> Outcome {
        self.procedure.run(context)
    }
}

impl<C> fmt::Debug for TestCase<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}


struct FnProcedure<F>(F);

impl<C, F> Procedure<C> for FnProcedure<F>
    where F: Fn(&mut C) -> Outcome
{
    fn run(&self, context: &mut C) -> Outcome {
        (self.0)(context)
    }
}
