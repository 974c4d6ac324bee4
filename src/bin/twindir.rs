//! # twindir CLI - compare two directory trees
//!
//! A command-line front end for the twindir comparison engine.
//!
//! ## Features
//! - List one directory level of both trees side by side, or the whole tree
//! - Quick scan for directories that contain any difference
//! - `diff -qr` style brief report
//! - Find names or contents in one or both trees
//! - Hand a file pair to an external diff tool
//!
//! ## Usage
//! ```bash
//! # Compare the top level of two directories
//! twindir list old/ new/
//!
//! # Whole tree, differences only, directories flagged by a quick scan
//! twindir list old/ new/ --recursive --differences --prescan
//!
//! # Which directories differ at all?
//! twindir scan old/ new/
//!
//! # Find Rust files mentioning "unsafe" in one tree
//! twindir find src/ --name '\.rs$' --grep unsafe
//!
//! # Show how one file differs
//! twindir tool old/ new/ src/main.rs
//! ```
//!
//! With `--interactive`, `%` skips all remaining content comparisons, `q`
//! stops the walk, and every I/O error asks whether to ignore the rest.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use crossterm::event::{self, Event, KeyCode, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use humantime::format_duration;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use twindir::interact::{LogReporter, NoInterrupt};
use twindir::utils::{format_bytes, format_mtime};
use twindir::{
    CompareOptions, Comparer, ComparerBuilder, DiffEntry, DiffListing, DiffStatus, DiffTree, ErrorReporter,
    ErrorResponse, InterruptSource, ScanSet, ScanSummary, Side, SideState, Signal, SortKey, TwindirError,
    WalkSummary,
};

/// twindir CLI - compare two directory trees
#[derive(Parser)]
#[command(name = "twindir")]
#[command(version)]
#[command(about = "Compare two directory trees and report what differs")]
#[command(long_about = None)]
struct Cli {
    /// Follow symbolic links
    #[arg(short = 'L', long, global = true)]
    follow: bool,

    /// Only regular files count as differences
    #[arg(short, long, global = true)]
    regular_only: bool,

    /// Listing order
    #[arg(long, value_enum, global = true)]
    sort: Option<SortMode>,

    /// Match name and content patterns case-sensitively
    #[arg(short = 'I', long, global = true)]
    case_sensitive: bool,

    /// JSON file with comparison options
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Read skip/stop keys and prompt on errors
    #[arg(short, long, global = true)]
    interactive: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List entries of both trees
    #[command(alias = "ls")]
    List {
        /// Left directory
        left: PathBuf,

        /// Right directory
        right: PathBuf,

        /// Directory below both roots
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Descend into sub-directories
        #[arg(short = 'R', long)]
        recursive: bool,

        /// Only show differences
        #[arg(short, long)]
        differences: bool,

        /// Flag directories containing differences with a quick scan first
        #[arg(long)]
        prescan: bool,
    },

    /// Mark the directories that contain differences
    Scan {
        /// Left directory
        left: PathBuf,

        /// Right directory
        right: PathBuf,
    },

    /// Report differences like `diff -qr`
    Brief {
        /// Left directory
        left: PathBuf,

        /// Right directory
        right: PathBuf,
    },

    /// Find entries by name and/or content
    Find {
        /// Directory to search
        left: PathBuf,

        /// Second directory to search
        right: Option<PathBuf>,

        /// Regex over basenames
        #[arg(short, long)]
        name: Option<String>,

        /// Regex over file contents; repeat to require several
        #[arg(short, long)]
        grep: Vec<String>,
    },

    /// Run the external diff tool on one file pair
    Tool {
        /// Left directory
        left: PathBuf,

        /// Right directory
        right: PathBuf,

        /// File below both roots
        file: PathBuf,

        /// Command line to use instead of the configured one
        #[arg(long)]
        command: Option<String>,

        /// Print the command line instead of running it
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum SortMode {
    DirsFirst,
    FilesFirst,
    Mixed,
}

impl From<SortMode> for SortKey {
    fn from(mode: SortMode) -> Self {
        match mode {
            SortMode::DirsFirst => SortKey::DirsFirst,
            SortMode::FilesFirst => SortKey::FilesFirst,
            SortMode::Mixed => SortKey::Mixed,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    // Disable colors if needed
    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    }

    // Run command
    if let Err(e) = run(cli) {
        let message = match e.downcast_ref::<TwindirError>() {
            Some(err) => err.user_message(),
            None => format!("{:#}", e),
        };
        eprintln!("{}: {}", "Error".red().bold(), message);
        std::process::exit(1);
    }
}

/// Main command runner
fn run(cli: Cli) -> anyhow::Result<()> {
    let options = load_options(&cli)?;
    let out = Output {
        json: cli.json,
        interactive: cli.interactive,
    };

    match cli.command {
        Commands::List {
            left,
            right,
            path,
            recursive,
            differences,
            prescan,
        } => {
            let rel = path.unwrap_or_default();
            cmd_list(options, out, &left, &right, &rel, recursive, differences, prescan)
        }
        Commands::Scan { left, right } => cmd_scan(options, out, &left, &right),
        Commands::Brief { left, right } => cmd_brief(options, out, &left, &right),
        Commands::Find {
            left,
            right,
            name,
            grep,
        } => cmd_find(options, out, &left, right.as_deref(), name, grep),
        Commands::Tool {
            left,
            right,
            file,
            command,
            dry_run,
        } => cmd_tool(options, &left, &right, &file, command, dry_run),
    }
}

/// Options from `--config`, overlaid with the command-line flags
fn load_options(cli: &Cli) -> anyhow::Result<CompareOptions> {
    let mut options = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => CompareOptions::default(),
    };

    if cli.follow {
        options.follow_symlinks = true;
    }
    if cli.regular_only {
        options.regular_only = true;
    }
    if let Some(sort) = cli.sort {
        options.sort = sort.into();
    }
    if cli.case_sensitive {
        options.ignore_case = false;
    }
    Ok(options)
}

/// Global output flags
#[derive(Clone, Copy)]
struct Output {
    json: bool,
    interactive: bool,
}

impl Output {
    fn spinner(&self, message: &str) -> ProgressBar {
        if self.json {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    fn print_json<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

/// Terminal raw mode for the duration of a walk
struct RawMode;

impl RawMode {
    fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(RawMode)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

/// Keyboard-backed interrupt source
struct KeyInterrupt;

impl InterruptSource for KeyInterrupt {
    fn poll(&mut self) -> Option<Signal> {
        while event::poll(Duration::ZERO).unwrap_or(false) {
            match event::read() {
                Ok(Event::Key(key)) => match key.code {
                    KeyCode::Char('%') => return Some(Signal::SkipCompare),
                    KeyCode::Char('q') | KeyCode::Esc => return Some(Signal::Stop),
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        return Some(Signal::Stop)
                    }
                    _ => {}
                },
                Ok(_) => {}
                Err(_) => return None,
            }
        }
        None
    }
}

/// Error reporter asking on the terminal
struct PromptReporter {
    progress: ProgressBar,
}

impl ErrorReporter for PromptReporter {
    fn report(&mut self, path: &Path, operation: &str, error: &io::Error) -> ErrorResponse {
        self.progress.suspend(|| {
            // raw mode: lines need an explicit carriage return
            eprint!(
                "{} {} {}: {}\r\n  {}\r\n",
                "!".red().bold(),
                operation,
                path.display(),
                error,
                "'i' ignore further errors, any other key continues".dimmed()
            );
            loop {
                match event::read() {
                    Ok(Event::Key(key)) => {
                        return match key.code {
                            KeyCode::Char('i') | KeyCode::Char('I') => ErrorResponse::IgnoreAll,
                            _ => ErrorResponse::Continue,
                        }
                    }
                    Ok(_) => continue,
                    Err(_) => return ErrorResponse::Continue,
                }
            }
        })
    }
}

/// Reporter and interrupt source for one walk
struct Hooks {
    reporter: Box<dyn ErrorReporter>,
    interrupt: Box<dyn InterruptSource>,
    _raw: Option<RawMode>,
}

impl Hooks {
    fn new(out: Output, progress: &ProgressBar) -> anyhow::Result<Self> {
        if !out.interactive {
            return Ok(Hooks {
                reporter: Box::new(LogReporter),
                interrupt: Box::new(NoInterrupt),
                _raw: None,
            });
        }
        let raw = RawMode::enable().context("switching the terminal to raw mode")?;
        Ok(Hooks {
            reporter: Box::new(PromptReporter {
                progress: progress.clone(),
            }),
            interrupt: Box::new(KeyInterrupt),
            _raw: Some(raw),
        })
    }
}

/// Result of `list`
enum Listed {
    Level(DiffListing, WalkSummary),
    Tree(DiffTree),
}

/// List entries of both trees
///
/// Without `--recursive` one directory level is shown; `--path` selects
/// which one. With `--recursive` the whole tree is built and the subtree at
/// `--path` is shown.
#[allow(clippy::too_many_arguments)]
fn cmd_list(
    options: CompareOptions,
    out: Output,
    left: &Path,
    right: &Path,
    rel: &Path,
    recursive: bool,
    differences: bool,
    prescan: bool,
) -> anyhow::Result<()> {
    let comparer = ComparerBuilder::new().options(options).build(left, right)?;
    let start = Instant::now();
    let progress = out.spinner("Comparing...");

    let listed = {
        let mut hooks = Hooks::new(out, &progress)?;
        if recursive {
            Listed::Tree(comparer.build_tree_with(prescan, hooks.reporter.as_mut(), hooks.interrupt.as_mut())?)
        } else {
            let (mut listing, summary) =
                comparer.build_listing_with(rel, hooks.reporter.as_mut(), hooks.interrupt.as_mut())?;
            if prescan {
                let (scan, _) = comparer.quick_scan_with(hooks.reporter.as_mut(), hooks.interrupt.as_mut())?;
                listing.apply_scan(&scan, &left.join(rel), &right.join(rel));
            }
            Listed::Level(listing, summary)
        }
    };
    progress.finish_and_clear();

    match listed {
        Listed::Level(listing, summary) => {
            if out.json {
                return out.print_json(&listing);
            }
            for entry in listing.entries() {
                if !differences || entry.is_difference() {
                    print_entry(Path::new(&entry.name), entry);
                }
            }
            print_walk_summary(&summary, start);
        }
        Listed::Tree(tree) => {
            let Some(subtree) = tree.find(rel) else {
                bail!("{} was not reached by the walk", rel.display());
            };
            if out.json {
                return out.print_json(subtree);
            }
            for (path, entry) in subtree.entries() {
                if !differences || entry.is_difference() {
                    let shown = path.strip_prefix(&subtree.path).unwrap_or(&path);
                    print_entry(shown, entry);
                }
            }
            print_walk_summary(&tree.summary, start);
        }
    }
    Ok(())
}

/// Mark the directories that contain differences
fn cmd_scan(options: CompareOptions, out: Output, left: &Path, right: &Path) -> anyhow::Result<()> {
    let comparer = ComparerBuilder::new().options(options).build(left, right)?;
    let start = Instant::now();
    let progress = out.spinner("Scanning...");
    let (scan, summary) = {
        let mut hooks = Hooks::new(out, &progress)?;
        comparer.quick_scan_with(hooks.reporter.as_mut(), hooks.interrupt.as_mut())?
    };
    progress.finish_and_clear();
    report_scan(out, &scan, &summary, start)
}

/// Report differences like `diff -qr`
fn cmd_brief(options: CompareOptions, out: Output, left: &Path, right: &Path) -> anyhow::Result<()> {
    let comparer = ComparerBuilder::new().options(options).build(left, right)?;
    let progress = out.spinner("Comparing...");
    let tree = {
        let mut hooks = Hooks::new(out, &progress)?;
        comparer.build_tree_with(false, hooks.reporter.as_mut(), hooks.interrupt.as_mut())?
    };
    progress.finish_and_clear();

    let lines = tree.brief_lines(comparer.left_root(), comparer.right_root());
    if out.json {
        return out.print_json(&lines);
    }
    for line in &lines {
        println!("{}", line);
    }
    if tree.summary.cancelled {
        println!("{}", "Walk stopped, report is incomplete".yellow());
    }
    Ok(())
}

/// Find entries by name and/or content
fn cmd_find(
    mut options: CompareOptions,
    out: Output,
    left: &Path,
    right: Option<&Path>,
    name: Option<String>,
    grep: Vec<String>,
) -> anyhow::Result<()> {
    if name.is_some() {
        options.name_pattern = name;
    }
    if !grep.is_empty() {
        options.content_patterns = grep;
    }

    let builder = ComparerBuilder::new().options(options);
    let comparer: Comparer = match right {
        Some(right) => builder.build(left, right)?,
        None => builder.build_single(left)?,
    };

    let start = Instant::now();
    let progress = out.spinner("Searching...");
    let (scan, summary) = {
        let mut hooks = Hooks::new(out, &progress)?;
        comparer.find_with(hooks.reporter.as_mut(), hooks.interrupt.as_mut())?
    };
    progress.finish_and_clear();
    report_scan(out, &scan, &summary, start)
}

/// Run the external diff tool on one file pair
fn cmd_tool(
    mut options: CompareOptions,
    left: &Path,
    right: &Path,
    file: &Path,
    command: Option<String>,
    dry_run: bool,
) -> anyhow::Result<()> {
    if let Some(command) = command {
        options.diff_tool = command;
    }
    let comparer = ComparerBuilder::new().options(options).build(left, right)?;

    if dry_run {
        println!(
            "{}",
            comparer
                .diff_tool()
                .command_line(&comparer.left_root().join(file), &comparer.right_root().join(file))
        );
        return Ok(());
    }

    let status = comparer
        .diff_command(file)
        .status()
        .with_context(|| format!("running {}", comparer.diff_tool().template()))?;
    if !status.success() {
        // diff tools exit non-zero when the files differ
        std::process::exit(status.code().unwrap_or(1));
    }
    Ok(())
}

#[derive(Serialize)]
struct ScanReport<'a> {
    summary: &'a ScanSummary,
    paths: Vec<PathBuf>,
}

fn report_scan(out: Output, scan: &ScanSet, summary: &ScanSummary, start: Instant) -> anyhow::Result<()> {
    let paths = scan.sorted();
    if out.json {
        return out.print_json(&ScanReport { summary, paths });
    }

    for path in &paths {
        println!("{}", path.display().to_string().yellow());
    }
    println!();
    println!(
        "{} {} directories, {} hits, {} marked in {}",
        "✓".green().bold(),
        summary.directories.to_string().cyan(),
        summary.hits.to_string().cyan(),
        summary.marked.to_string().cyan(),
        format_duration(trim(start.elapsed())).to_string().cyan()
    );
    if summary.unreadable > 0 {
        println!("  Unreadable: {}", summary.unreadable.to_string().red());
    }
    if summary.cancelled {
        println!("  {}", "Scan stopped, results are incomplete".yellow());
    }
    Ok(())
}

fn print_entry(path: &Path, entry: &DiffEntry) {
    let tag = entry.kind().map(|k| k.tag()).filter(|t| *t != ' ');
    let name = match tag {
        Some(tag) => format!("{}{}", path.display(), tag),
        None => path.display().to_string(),
    };

    let marker = match entry.only_in() {
        Some(Side::Left) => "<".yellow().bold(),
        Some(Side::Right) => ">".green().bold(),
        None => match entry.status {
            DiffStatus::Differ => "!".red().bold(),
            DiffStatus::Error => "-".red(),
            DiffStatus::Equal if entry.subtree_differs == Some(true) => "*".yellow(),
            DiffStatus::Equal => "=".dimmed(),
            DiffStatus::Unknown => " ".normal(),
        },
    };
    let name = if entry.is_difference() { name.bold() } else { name.normal() };

    println!(
        "{} {:<40} {} | {}",
        marker,
        name,
        side_info(entry.side(Side::Left)),
        side_info(entry.side(Side::Right))
    );
    for side in Side::ALL {
        if let Some(target) = entry.link_target(side) {
            let arrow = if side == Side::Left { "  <-" } else { "  ->" };
            println!("{} {}", arrow.dimmed(), target.cyan());
        }
    }
}

fn side_info(state: &SideState) -> String {
    match state {
        SideState::Absent => format!("{:>27}", "-"),
        SideState::Failed(msg) => format!("error: {}", msg),
        SideState::Present(meta) => format!("{:>10} {}", format_bytes(meta.size), format_mtime(meta.mtime)),
    }
}

fn print_walk_summary(summary: &WalkSummary, start: Instant) {
    println!();
    println!(
        "{} {} entries in {} directories, {} compared in {}",
        "✓".green().bold(),
        summary.entries.to_string().cyan(),
        summary.directories.to_string().cyan(),
        summary.comparisons.to_string().cyan(),
        format_duration(trim(start.elapsed())).to_string().cyan()
    );
    if summary.errors > 0 {
        println!("  Errors: {}", summary.errors.to_string().red());
    }
    if summary.comparisons_skipped > 0 {
        println!("  Skipped comparisons: {}", summary.comparisons_skipped.to_string().yellow());
    }
    if summary.omitted > 0 {
        println!("  Omitted links: {}", summary.omitted.to_string().yellow());
    }
    if summary.cancelled {
        println!("  {}", "Walk stopped, results are incomplete".yellow());
    }
}

/// Millisecond precision is plenty for a summary line
fn trim(elapsed: Duration) -> Duration {
    Duration::from_millis(elapsed.as_millis() as u64)
}
