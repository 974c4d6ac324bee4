//! Name and content filters for find and grep scans
//!
//! Filters only apply to the quick scan. With a filter active the scan no
//! longer looks for differences; it marks the directories that contain
//! matching entries instead.
//!
//! - [`NameFilter`]: one regex over the basename.
//! - [`ContentFilter`]: any number of regexes over the file bytes, all of
//!   which must match. Each pattern is searched from the start of the file
//!   in [`CONTENT_CHUNK`] pieces; consecutive pieces overlap by
//!   [`CONTENT_OVERLAP`] bytes so that matches spanning a boundary are found
//!   as long as they are shorter than the overlap.

use crate::error::Result;
use crate::types::CompareOptions;
use regex::bytes::{Regex as BytesRegex, RegexBuilder as BytesRegexBuilder};
use regex::{Regex, RegexBuilder};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Bytes searched per step
pub const CONTENT_CHUNK: usize = 1024 * 1024;

/// Bytes shared by consecutive steps
pub const CONTENT_OVERLAP: usize = 4 * 1024;

/// Basename predicate
#[derive(Debug, Clone)]
pub struct NameFilter {
    regex: Regex,
}

impl NameFilter {
    /// Compile `pattern`
    ///
    /// # Errors
    ///
    /// - [`crate::TwindirError::InvalidPattern`] if the regex does not compile
    pub fn new(pattern: &str, ignore_case: bool) -> Result<Self> {
        let regex = RegexBuilder::new(pattern).case_insensitive(ignore_case).build()?;
        Ok(Self { regex })
    }

    /// Whether `name` matches
    pub fn is_match(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

/// Conjunction of content predicates
#[derive(Debug, Clone)]
pub struct ContentFilter {
    patterns: Vec<BytesRegex>,
}

impl ContentFilter {
    /// Compile all `patterns`; `^` and `$` match at line boundaries
    ///
    /// # Errors
    ///
    /// - [`crate::TwindirError::InvalidPattern`] for the first pattern that does not compile
    pub fn new<S: AsRef<str>>(patterns: &[S], ignore_case: bool) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                BytesRegexBuilder::new(p.as_ref())
                    .case_insensitive(ignore_case)
                    .multi_line(true)
                    .build()
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Number of patterns
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// No patterns at all; matches everything
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether the file at `path` matches every pattern
    pub fn matches_path(&self, path: &Path) -> io::Result<bool> {
        let mut file = File::open(path)?;
        self.matches_reader(&mut file)
    }

    /// Whether the stream matches every pattern
    pub fn matches_reader<R: Read + Seek>(&self, reader: &mut R) -> io::Result<bool> {
        let mut buf = vec![0u8; CONTENT_CHUNK];
        for pattern in &self.patterns {
            reader.seek(SeekFrom::Start(0))?;
            if !search(pattern, reader, &mut buf)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn search<R: Read>(pattern: &BytesRegex, reader: &mut R, buf: &mut [u8]) -> io::Result<bool> {
    // bytes at the front of `buf` carried over from the previous step
    let mut carried = 0;
    loop {
        let filled = carried + fill(reader, &mut buf[carried..])?;
        if pattern.is_match(&buf[..filled]) {
            return Ok(true);
        }
        if filled < buf.len() {
            return Ok(false);
        }
        let keep = CONTENT_OVERLAP.min(filled);
        buf.copy_within(filled - keep..filled, 0);
        carried = keep;
    }
}

fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

/// Filters configured for a scan
#[derive(Debug, Clone, Default)]
pub struct Filters {
    /// Basename filter
    pub name: Option<NameFilter>,
    /// Content filter
    pub content: Option<ContentFilter>,
}

impl Filters {
    /// Compile the filters named in `options`
    pub fn from_options(options: &CompareOptions) -> Result<Self> {
        let name = options
            .name_pattern
            .as_deref()
            .map(|p| NameFilter::new(p, options.ignore_case))
            .transpose()?;
        let content = if options.content_patterns.is_empty() {
            None
        } else {
            Some(ContentFilter::new(&options.content_patterns, options.ignore_case)?)
        };
        Ok(Self { name, content })
    }

    /// Any filter configured
    pub fn is_active(&self) -> bool {
        self.name.is_some() || self.content.is_some()
    }
}
