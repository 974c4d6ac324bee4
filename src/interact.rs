//! Seams to the interactive front end
//!
//! The engine never talks to a terminal. Two traits stand in for the user:
//!
//! - [`ErrorReporter`] is shown every recoverable I/O error and may answer
//!   "ignore all further errors", which silences it for the rest of the walk.
//! - [`InterruptSource`] is polled without blocking once per directory entry
//!   and once per content comparison, and may ask to skip the remaining
//!   content comparisons or to stop the walk.
//!
//! The implementations here are non-interactive: they log, record, or replay
//! a script. The CLI provides terminal-backed ones.

use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Answer of an [`ErrorReporter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorResponse {
    /// Keep reporting
    Continue,
    /// Stop reporting for the rest of the walk
    IgnoreAll,
}

/// Receives recoverable I/O errors
pub trait ErrorReporter {
    /// Show one error; `operation` names the failing call (`stat`, `open`, ...)
    fn report(&mut self, path: &Path, operation: &str, error: &io::Error) -> ErrorResponse;
}

/// Cooperative signal raised by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Assume all remaining file pairs of this walk are equal
    SkipCompare,
    /// End the walk, keeping what was recorded so far
    Stop,
}

/// Non-blocking source of [`Signal`]s
pub trait InterruptSource {
    /// Return a pending signal, if any, without waiting
    fn poll(&mut self) -> Option<Signal>;
}

/// Reporter that only logs; never asks to ignore
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&mut self, path: &Path, operation: &str, error: &io::Error) -> ErrorResponse {
        warn!("{} {:?}: {}", operation, path, error);
        ErrorResponse::Continue
    }
}

/// One error as seen by a [`RecordingReporter`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedError {
    /// Path the operation failed on
    pub path: PathBuf,
    /// Failing operation
    pub operation: String,
    /// Error kind
    pub kind: io::ErrorKind,
}

/// Reporter that keeps every report and answers with a fixed response
#[derive(Debug, Clone)]
pub struct RecordingReporter {
    /// Reports received, oldest first
    pub reports: Vec<ReportedError>,
    response: ErrorResponse,
}

impl RecordingReporter {
    /// Record and always continue
    pub fn new() -> Self {
        Self::answering(ErrorResponse::Continue)
    }

    /// Record and answer with `response`
    pub fn answering(response: ErrorResponse) -> Self {
        Self {
            reports: Vec::new(),
            response,
        }
    }
}

impl Default for RecordingReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorReporter for RecordingReporter {
    fn report(&mut self, path: &Path, operation: &str, error: &io::Error) -> ErrorResponse {
        self.reports.push(ReportedError {
            path: path.to_path_buf(),
            operation: operation.to_string(),
            kind: error.kind(),
        });
        self.response
    }
}

/// Interrupt source that never fires
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInterrupt;

impl InterruptSource for NoInterrupt {
    fn poll(&mut self) -> Option<Signal> {
        None
    }
}

/// Interrupt source replaying a fixed sequence of poll results
///
/// Each poll consumes one slot; once the script runs out every poll yields
/// `None`. Useful to fire a signal at an exact point of a walk.
#[derive(Debug, Default, Clone)]
pub struct ScriptedInterrupt {
    script: VecDeque<Option<Signal>>,
    polls: usize,
}

impl ScriptedInterrupt {
    /// Replay `script`
    pub fn new(script: impl IntoIterator<Item = Option<Signal>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            polls: 0,
        }
    }

    /// Fire `signal` on poll number `n` (zero-based)
    pub fn at(n: usize, signal: Signal) -> Self {
        let mut script = vec![None; n];
        script.push(Some(signal));
        Self::new(script)
    }

    /// How often this source has been polled
    pub fn polls(&self) -> usize {
        self.polls
    }
}

impl InterruptSource for ScriptedInterrupt {
    fn poll(&mut self) -> Option<Signal> {
        self.polls += 1;
        self.script.pop_front().flatten()
    }
}
