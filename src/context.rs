//! Per-walk state
//!
//! A [`WalkContext`] is created for every top-level walk and passed by
//! reference through the probe, comparator and walker. It owns the two path
//! builders and the sticky flags, so nothing leaks from one walk into the
//! next:
//!
//! - `ignore_errors`: the reporter answered [`ErrorResponse::IgnoreAll`]
//! - `skip_compare`: the user asked to assume all remaining pairs are equal
//! - `stopped`: the user asked to end the walk

use crate::error::Result;
use crate::interact::{ErrorReporter, ErrorResponse, InterruptSource, Signal};
use crate::path_builder::PathBuilder;
use crate::types::{CompareOptions, Side};
use std::io;
use std::path::Path;
use tracing::debug;

/// State shared by all components during one walk
pub struct WalkContext<'a> {
    paths: [PathBuilder; 2],
    /// Options of the comparison
    pub options: &'a CompareOptions,
    reporter: &'a mut dyn ErrorReporter,
    interrupt: &'a mut dyn InterruptSource,
    ignore_errors: bool,
    skip_compare: bool,
    stopped: bool,
    errors_reported: usize,
}

impl<'a> WalkContext<'a> {
    /// Start a walk at the two roots
    ///
    /// # Errors
    ///
    /// - [`crate::TwindirError::PathOverflow`] if a root exceeds the configured capacity
    pub fn new(
        left: &Path,
        right: &Path,
        options: &'a CompareOptions,
        reporter: &'a mut dyn ErrorReporter,
        interrupt: &'a mut dyn InterruptSource,
    ) -> Result<Self> {
        Ok(Self {
            paths: [
                PathBuilder::new(left, options.path_capacity)?,
                PathBuilder::new(right, options.path_capacity)?,
            ],
            options,
            reporter,
            interrupt,
            ignore_errors: false,
            skip_compare: false,
            stopped: false,
            errors_reported: 0,
        })
    }

    /// Path builder of one side
    pub fn path(&self, side: Side) -> &PathBuilder {
        &self.paths[side.index()]
    }

    /// Mutable path builder of one side
    pub fn path_mut(&mut self, side: Side) -> &mut PathBuilder {
        &mut self.paths[side.index()]
    }

    /// Current lengths of both builders, for [`restore`](Self::restore)
    pub fn mark(&self) -> [usize; 2] {
        [self.paths[0].len(), self.paths[1].len()]
    }

    /// Truncate both builders back to a [`mark`](Self::mark)
    pub fn restore(&mut self, mark: [usize; 2]) {
        self.paths[0].truncate(mark[0]);
        self.paths[1].truncate(mark[1]);
    }

    /// Show a recoverable error to the reporter unless errors are ignored
    pub fn report(&mut self, path: &Path, operation: &str, error: &io::Error) {
        self.errors_reported += 1;
        if self.ignore_errors {
            debug!("{} {:?}: {} (ignored)", operation, path, error);
            return;
        }
        debug!("{} {:?}: {}", operation, path, error);
        if self.reporter.report(path, operation, error) == ErrorResponse::IgnoreAll {
            self.ignore_errors = true;
        }
    }

    /// Poll the interrupt source once and latch whatever it says
    pub fn poll(&mut self) -> Option<Signal> {
        let signal = self.interrupt.poll();
        match signal {
            Some(Signal::SkipCompare) => {
                if !self.skip_compare {
                    debug!("content comparison disabled for the rest of this walk");
                }
                self.skip_compare = true;
            }
            Some(Signal::Stop) => {
                debug!("walk stopped by user");
                self.stopped = true;
            }
            None => {}
        }
        signal
    }

    /// Poll once and tell whether the walk has to end
    pub fn should_stop(&mut self) -> bool {
        if !self.stopped {
            self.poll();
        }
        self.stopped
    }

    /// The walk was stopped
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Remaining content comparisons are assumed equal
    pub fn skip_compare(&self) -> bool {
        self.skip_compare
    }

    /// The reporter asked to ignore further errors
    pub fn ignore_errors(&self) -> bool {
        self.ignore_errors
    }

    /// Errors seen so far, reported or ignored
    pub fn errors_reported(&self) -> usize {
        self.errors_reported
    }
}
