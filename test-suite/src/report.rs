//! Reporting results to the test orchestration host


use std::{
    io,
    time::Duration,
};

use crate::{
    case::Outcome,
    scheduler::{
        RunSummary,
        Verdict,
    },
};


/// Receives the events of a run, as they happen
pub trait Reporter {
    /// The session has started, and the given cases are about to run
    fn session_started(&mut self, timeout: Duration, cases: &[&str]);

    fn case_started(&mut self, name: &str);

    fn case_finished(&mut self, name: &str, outcome: &Outcome);

    /// The run is over. Cases that never ran are still pending in `summary`.
    fn session_finished(&mut self, summary: &RunSummary);
}


/// Reports using the key-value protocol of the greentea test host
///
/// Every event becomes a line like `{{key;value}}`. Anything else written to
/// the same stream is ignored by the host, which is where failure messages
/// go.
pub struct GreenteaReporter<W> {
    writer: W,
}

impl<W> GreenteaReporter<W>
    where W: io::Write
{
    pub fn new(writer: W) -> Self {
        Self {
            writer,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn kv(&mut self, key: &str, value: impl std::fmt::Display) {
        self.line(format_args!("{{{{{};{}}}}}", key, value));
    }

    fn line(&mut self, line: std::fmt::Arguments) {
        let result = writeln!(self.writer, "{}", line)
            .and_then(|()| self.writer.flush());

        if let Err(err) = result {
            tracing::error!(?err, "Failed to write report");
        }
    }
}

impl<W> Reporter for GreenteaReporter<W>
    where W: io::Write
{
    fn session_started(&mut self, timeout: Duration, cases: &[&str]) {
        self.kv("__timeout", timeout.as_secs());
        self.kv("__host_test_name", "default_auto");
        self.kv("__testcase_count", cases.len());
        for name in cases {
            self.kv("__testcase_name", name);
        }
    }

    fn case_started(&mut self, name: &str) {
        self.kv("__testcase_start", name);
    }

    fn case_finished(&mut self, name: &str, outcome: &Outcome) {
        if let Some(message) = &outcome.message {
            self.line(format_args!(">>> '{}': {}", name, message));
        }

        let (passed, failed) = if outcome.passed { (1, 0) } else { (0, 1) };
        self.kv("__testcase_finish", format_args!("{};{};{}", name, passed, failed));
    }

    fn session_finished(&mut self, summary: &RunSummary) {
        self.kv(
            "__testcase_summary",
            format_args!("{};{}", summary.passed(), summary.failed()),
        );

        let end = match summary.verdict() {
            Verdict::Passed => {
                "success"
            }
            Verdict::Failed => {
                "failure"
            }
            Verdict::Incomplete => {
                self.kv("timeout", summary.not_run());
                "failure"
            }
        };
        self.kv("end", end);
    }
}


/// Records every event in memory
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<Event>,
}

impl Reporter for Recorder {
    fn session_started(&mut self, timeout: Duration, cases: &[&str]) {
        self.events.push(Event::SessionStarted {
            timeout,
            cases: cases.iter().map(|&name| name.to_owned()).collect(),
        });
    }

    fn case_started(&mut self, name: &str) {
        self.events.push(Event::CaseStarted(name.to_owned()));
    }

    fn case_finished(&mut self, name: &str, outcome: &Outcome) {
        self.events.push(Event::CaseFinished(name.to_owned(), outcome.clone()));
    }

    fn session_finished(&mut self, summary: &RunSummary) {
        self.events.push(Event::SessionFinished(summary.verdict()));
    }
}


#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    SessionStarted {
        timeout: Duration,
        cases:   Vec<String>,
    },
    CaseStarted(String),
    CaseFinished(String, Outcome),
    SessionFinished(Verdict),
}


#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::{
        case::{
            CaseState,
            Outcome,
        },
        scheduler::{
            CaseRecord,
            RunState,
            RunSummary,
        },
    };

    use super::{
        GreenteaReporter,
        Reporter as _,
    };


    fn output(reporter: GreenteaReporter<Vec<u8>>) -> String {
        String::from_utf8(reporter.into_inner()).unwrap()
    }


    #[test]
    fn it_should_announce_the_session() {
        let mut reporter = GreenteaReporter::new(Vec::new());

        reporter.session_started(Duration::from_secs(40), &["a", "b"]);

        assert_eq!(output(reporter), "\
            {{__timeout;40}}\n\
            {{__host_test_name;default_auto}}\n\
            {{__testcase_count;2}}\n\
            {{__testcase_name;a}}\n\
            {{__testcase_name;b}}\n\
        ");
    }

    #[test]
    fn it_should_report_failures_with_their_message() {
        let mut reporter = GreenteaReporter::new(Vec::new());

        reporter.case_started("a");
        reporter.case_finished("a", &Outcome::fail("count mismatch"));

        assert_eq!(output(reporter), "\
            {{__testcase_start;a}}\n\
            >>> 'a': count mismatch\n\
            {{__testcase_finish;a;0;1}}\n\
        ");
    }

    #[test]
    fn it_should_mark_an_incomplete_run() {
        let mut reporter = GreenteaReporter::new(Vec::new());
        let summary = RunSummary {
            state: RunState::TimedOut,
            cases: vec![
                CaseRecord {
                    name:    "a".into(),
                    state:   CaseState::Passed,
                    outcome: Some(Outcome::pass()),
                },
                CaseRecord {
                    name:    "b".into(),
                    state:   CaseState::Pending,
                    outcome: None,
                },
            ],
        };

        reporter.session_finished(&summary);

        assert_eq!(output(reporter), "\
            {{__testcase_summary;1;0}}\n\
            {{timeout;1}}\n\
            {{end;failure}}\n\
        ");
    }
}
