//! External diff tool
//!
//! The engine only decides *whether* two files differ. Showing *how* is left
//! to an external program configured as a shell command line. `$1` and `$2`
//! in the command stand for the left and right path; a command without
//! either placeholder gets both paths appended. Paths are single-quoted for
//! the shell, so names with spaces or quotes are passed through intact.
//!
//! ```rust
//! use twindir::difftool::DiffTool;
//! use std::path::Path;
//!
//! let tool = DiffTool::new("cmp -s").unwrap();
//! assert_eq!(
//!     tool.command_line(Path::new("/l/a b"), Path::new("/r/a b")),
//!     "cmp -s '/l/a b' '/r/a b'"
//! );
//! ```

use crate::error::{Result, TwindirError};
use std::path::Path;
use std::process::{Command, ExitStatus};
use tracing::debug;

/// Command used when none is configured
pub const DEFAULT_DIFF_TOOL: &str = "diff -u $1 $2";

/// Configured external diff command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffTool {
    template: String,
}

impl Default for DiffTool {
    fn default() -> Self {
        Self {
            template: DEFAULT_DIFF_TOOL.to_string(),
        }
    }
}

impl DiffTool {
    /// Wrap a command line
    ///
    /// # Errors
    ///
    /// - [`TwindirError::InvalidConfiguration`] if the command is blank
    pub fn new(template: &str) -> Result<Self> {
        let template = template.trim();
        if template.is_empty() {
            return Err(TwindirError::config("diff tool command is empty"));
        }
        Ok(Self {
            template: template.to_string(),
        })
    }

    /// The command line as configured
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Whether the command names `$1` or `$2` itself
    pub fn has_placeholders(&self) -> bool {
        self.template.contains("$1") || self.template.contains("$2")
    }

    /// Shell command line for one pair of paths
    pub fn command_line(&self, left: &Path, right: &Path) -> String {
        let left = shell_quote(left);
        let right = shell_quote(right);
        if self.has_placeholders() {
            substitute(&self.template, &left, &right)
        } else {
            format!("{} {} {}", self.template, left, right)
        }
    }

    /// Process ready to run through `sh -c`
    pub fn command(&self, left: &Path, right: &Path) -> Command {
        let line = self.command_line(left, right);
        debug!("diff tool: {}", line);
        let mut command = Command::new("sh");
        command.arg("-c").arg(line);
        command
    }

    /// Run the tool in the foreground and wait for it
    ///
    /// # Errors
    ///
    /// - [`TwindirError::Io`] if the shell cannot be started
    pub fn run(&self, left: &Path, right: &Path) -> Result<ExitStatus> {
        Ok(self.command(left, right).status()?)
    }
}

/// Replace `$1` and `$2` in one pass; other `$` sequences are kept
fn substitute(template: &str, left: &str, right: &str) -> String {
    let mut out = String::with_capacity(template.len() + left.len() + right.len());
    let mut rest = template;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        match after.as_bytes().first() {
            Some(b'1') => {
                out.push_str(left);
                rest = &after[1..];
            }
            Some(b'2') => {
                out.push_str(right);
                rest = &after[1..];
            }
            _ => {
                out.push('$');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Single-quote a path for `sh`
pub fn shell_quote(path: &Path) -> String {
    let raw = path.to_string_lossy();
    format!("'{}'", raw.replace('\'', r"'\''"))
}
