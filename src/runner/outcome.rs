//! Outcomes of examples and test methods, and the per-run state they feed.

use std::path::PathBuf;

/// An exception as the report renders it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    /// Final traceback line, `Type: message`.
    pub exception_only: String,
    /// Full `Traceback (most recent call last):` text.
    pub traceback: String,
}

/// Outcome of one documentation example.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExampleOutcome {
    Success,
    /// Output (or a raised exception's line) did not match the expected text.
    Failure { got: String },
    /// The example raised and no exception was expected.
    UnexpectedException(Fault),
}

impl ExampleOutcome {
    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::Success)
    }
}

/// Outcome of one test method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodOutcome {
    Success,
    /// An assertion failed.
    Failure(Fault),
    /// Anything else went wrong.
    Error(Fault),
    Skip(String),
    /// Marked as a known failure, and it failed; counts as a success.
    ExpectedFailure(Fault),
    /// Marked as a known failure, but passed; counts as a failure.
    UnexpectedSuccess,
}

impl MethodOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_) | Self::Error(_) | Self::UnexpectedSuccess)
    }
}

/// Attempted, failed and skipped counts for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResultCounters {
    pub attempted: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// The header most recently printed, used to avoid repeating it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LastSeen {
    #[default]
    Nothing,
    Block { name: String, file: PathBuf },
    Class { name: String, file: PathBuf, line: usize },
}

/// Mutable state of one run, threaded through the driver, engine and formatter.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    pub counters: ResultCounters,
    pub last_seen: LastSeen,
    /// Stop after the first recorded failure.
    pub fail_fast: bool,
}

impl RunState {
    pub fn new(fail_fast: bool) -> Self {
        Self {
            fail_fast,
            ..Self::default()
        }
    }

    pub fn record_attempt(&mut self) {
        self.counters.attempted += 1;
    }

    pub fn record_failure(&mut self) {
        self.counters.failed += 1;
    }

    pub fn record_skip(&mut self) {
        self.counters.skipped += 1;
    }

    /// Whether the run should stop before the next unit.
    pub fn should_stop(&self) -> bool {
        self.fail_fast && self.counters.failed > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_fast_stops_after_first_failure() {
        let mut state = RunState::new(true);
        state.record_attempt();
        assert!(!state.should_stop());
        state.record_failure();
        assert!(state.should_stop());

        let mut relaxed = RunState::new(false);
        relaxed.record_failure();
        assert!(!relaxed.should_stop());
    }

    #[test]
    fn test_method_outcomes_that_count_as_failures() {
        let fault = Fault {
            exception_only: "AssertionError".to_string(),
            traceback: String::new(),
        };
        assert!(MethodOutcome::Failure(fault.clone()).is_failure());
        assert!(MethodOutcome::UnexpectedSuccess.is_failure());
        assert!(!MethodOutcome::ExpectedFailure(fault).is_failure());
        assert!(!MethodOutcome::Skip("later".to_string()).is_failure());
    }
}
