//! C-family code-line counter.
//!
//! Scans a directory tree for C-family source files (C, C++, Java, C#,
//! JavaScript, TypeScript, Go, Scala, Protobuf) and reports, per directory
//! and per language, how many physical lines carry actual code. Blank lines
//! and lines consisting solely of `//` or `/* ... */` comments do not count;
//! comment markers inside double-quoted string literals are ignored.

use clap::{ArgAction, Parser};
use std::collections::HashMap;
use std::env;
use std::ffi::OsString;
use std::fmt::Write as FmtWrite;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use colored::*;
use glob::Pattern;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

// Fixed width for the directory column.
const DIR_WIDTH: usize = 40;
const LANG_WIDTH: usize = 16;

// Performance metrics structure
struct PerformanceMetrics {
    files_processed: Arc<AtomicU64>,
    lines_processed: Arc<AtomicU64>,
    start_time: Instant,
    last_update: Instant,
    writer: Box<dyn Write + Send>,
    progress_enabled: bool,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Code-line counter for C-family source files",
    long_about = "Counts physical lines that carry code in C-family sources (C, C++, Java, C#, JavaScript, TypeScript, Go, Scala, Protobuf). Lines holding only whitespace or comments are excluded; // and /* */ markers inside string literals are ignored.",
    color = clap::ColorChoice::Always
)]
struct Args {
    #[arg(default_value = ".")]
    path: String,

    #[arg(short, long, action = ArgAction::Append)]
    ignore: Vec<String>,

    #[arg(short, long)]
    verbose: bool,

    /// Dump the classifier state after every character (very noisy).
    #[arg(short, long)]
    trace: bool,

    #[arg(short, long, default_value = "1000000")]
    max_entries: usize,

    #[arg(short = 'd', long, default_value = "100")]
    max_depth: usize,

    #[arg(short = 'n', long)]
    non_recursive: bool,

    #[arg(short = 'f', long)]
    filespec: Option<String>,
}

#[derive(Debug, Default, Clone, Copy)]
struct LanguageTally {
    code_lines: u64,
    total_lines: u64,
}

#[derive(Debug, Default)]
struct DirectoryStats {
    language_stats: HashMap<String, (u64, LanguageTally)>, // (file_count, tally) per language
}

fn merge_directory_stats(
    target: &mut HashMap<PathBuf, DirectoryStats>,
    dir: PathBuf,
    stat: DirectoryStats,
) {
    if let Some(existing) = target.get_mut(&dir) {
        for (lang, (count, tally)) in stat.language_stats {
            let (existing_count, existing_tally) = existing
                .language_stats
                .entry(lang)
                .or_insert((0, LanguageTally::default()));
            *existing_count += count;
            existing_tally.code_lines += tally.code_lines;
            existing_tally.total_lines += tally.total_lines;
        }
    } else {
        target.insert(dir, stat);
    }
}

impl PerformanceMetrics {
    fn new() -> Self {
        PerformanceMetrics::with_writer(Box::new(io::stdout()), true)
    }

    fn with_writer(writer: Box<dyn Write + Send>, progress_enabled: bool) -> Self {
        PerformanceMetrics {
            files_processed: Arc::new(AtomicU64::new(0)),
            lines_processed: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
            last_update: Instant::now(),
            writer,
            progress_enabled,
        }
    }

    fn update(&mut self, new_lines: u64) {
        self.files_processed.fetch_add(1, Ordering::Relaxed);
        self.lines_processed.fetch_add(new_lines, Ordering::Relaxed);

        // Update progress every second
        let now = Instant::now();
        if now.duration_since(self.last_update) >= Duration::from_secs(1) {
            self.print_progress();
            self.last_update = now;
        }
    }

    fn print_progress(&mut self) {
        if !self.progress_enabled {
            return;
        }

        let elapsed = self.start_time.elapsed().as_secs_f64();
        let files = self.files_processed.load(Ordering::Relaxed);
        let lines = self.lines_processed.load(Ordering::Relaxed);

        let writer = &mut self.writer;
        let _ = write!(
            writer,
            "\rProcessed {} files ({:.1} files/sec) and {} lines ({:.1} lines/sec)...",
            files,
            files as f64 / elapsed,
            lines,
            lines as f64 / elapsed
        );
        let _ = writer.flush();
    }

    fn print_final_stats(&mut self) {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        let files = self.files_processed.load(Ordering::Relaxed);
        let lines = self.lines_processed.load(Ordering::Relaxed);

        let writer = &mut self.writer;
        let _ = writeln!(writer, "\n\n{}", "Performance Summary:".blue().bold());
        let _ = writeln!(
            writer,
            "Total time: {} seconds",
            format!("{:.2}", elapsed).bright_yellow()
        );
        let _ = writeln!(
            writer,
            "Files processed: {} ({})",
            files.to_string().bright_yellow(),
            format!("{:.1} files/sec", safe_rate(files, elapsed)).bright_yellow()
        );
        let _ = writeln!(
            writer,
            "Lines processed: {} ({})",
            lines.to_string().bright_yellow(),
            format!("{:.1} lines/sec", safe_rate(lines, elapsed)).bright_yellow()
        );
    }
}

/// Failures the line classifier can surface.
#[derive(Debug, thiserror::Error)]
enum CountError {
    /// `count()` was invoked a second time on an already-consumed counter.
    #[error("count() may only be called once per counter instance")]
    AlreadyConsumed,
    /// A newline was reached while still inside a double-quoted string.
    #[error("unterminated string literal (newline at character offset {offset})")]
    UnterminatedString { offset: usize },
}

/// Classifier state. One variant per lexical situation; the transition
/// function matches exhaustively, so adding a variant without a rule is a
/// compile error rather than a silent misclassification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// At the start of a physical line (or back at line level after a block
    /// comment closed); no code seen on this line yet.
    LineBegin,
    /// Code already confirmed on the current line.
    LineWithCode,
    /// The line opened with a single `/` whose role (division or comment
    /// opener) is still unresolved.
    LineStartsWithSlash,
    /// Inside a double-quoted string literal.
    InString,
    /// Inside a `//` comment; ends at the next newline.
    InLineComment,
    /// Inside `/* ... */` with no code before the opener on its line.
    InBlockCommentNoCode,
    /// Inside `/* ... */` with code before the opener on its line.
    InBlockCommentAfterCode,
}

impl State {
    fn is_block_comment(self) -> bool {
        matches!(
            self,
            State::InBlockCommentNoCode | State::InBlockCommentAfterCode
        )
    }
}

/// Single-pass line classifier over one in-memory source buffer.
///
/// Consumes the text one character at a time and counts the physical lines
/// that carry at least one code token. The two recorded delimiter positions
/// (`block_open_pos`, `block_close_pos`) stop a single character from being
/// read as part of two overlapping two-character markers, which is what makes
/// sequences like `/*/`, `*//` and `*/*` come out right.
///
/// An instance is single-use: `count()` may be called exactly once.
struct LineCounter {
    code: Vec<char>,
    count: u64,
    pos: usize,
    prev: Option<char>,
    cur: char,
    state: State,
    /// Position of the `*` that most recently opened a block comment.
    block_open_pos: Option<usize>,
    /// Position of the `/` that most recently closed a block comment.
    block_close_pos: Option<usize>,
    consumed: bool,
    trace: Option<Box<dyn Write + Send>>,
}

impl LineCounter {
    fn new(text: &str) -> Self {
        LineCounter {
            code: text.chars().collect(),
            count: 0,
            pos: 0,
            prev: None,
            cur: '\0',
            state: State::LineBegin,
            block_open_pos: None,
            block_close_pos: None,
            consumed: false,
            trace: None,
        }
    }

    /// Turns on the per-character trace, written to stderr.
    fn enable_trace(&mut self) {
        self.trace_to(Box::new(io::stderr()));
    }

    fn trace_to(&mut self, writer: Box<dyn Write + Send>) {
        self.trace = Some(writer);
    }

    /// Runs the scan and returns the number of code-bearing lines.
    ///
    /// Callable exactly once; a second call fails with
    /// [`CountError::AlreadyConsumed`]. An empty buffer yields 0 without
    /// entering the state machine.
    fn count(&mut self) -> Result<u64, CountError> {
        if self.consumed {
            return Err(CountError::AlreadyConsumed);
        }
        self.consumed = true;
        if self.code.is_empty() {
            return Ok(0);
        }
        self.cur = self.code[self.pos];
        loop {
            self.step()?;
            if self.trace.is_some() {
                self.trace_step();
            }
            if !self.advance() {
                break;
            }
        }
        Ok(self.count)
    }

    fn step(&mut self) -> Result<(), CountError> {
        match self.state {
            State::LineBegin => {
                if self.is_newline() || self.is_blank() {
                    // still nothing on this line
                } else if self.was('/') && self.is('/') {
                    if self.can_start_line_comment() {
                        self.set_state(State::InLineComment);
                    }
                } else if self.was('/') && self.is('*') {
                    if self.can_open_block_comment() {
                        self.set_state(State::InBlockCommentNoCode);
                    }
                } else if self.is('/') {
                    self.set_state(State::LineStartsWithSlash);
                } else if self.is('"') {
                    self.set_state(State::InString);
                    self.count += 1;
                } else {
                    self.set_state(State::LineWithCode);
                    self.count += 1;
                }
            }
            State::LineWithCode => {
                if self.is_newline() {
                    self.set_state(State::LineBegin);
                } else if self.was('/') && self.is('/') {
                    if self.can_start_line_comment() {
                        self.set_state(State::InLineComment);
                    }
                } else if self.was('/') && self.is('*') {
                    if self.can_open_block_comment() {
                        self.set_state(State::InBlockCommentAfterCode);
                    }
                } else if self.was('\'') && self.is('"') {
                    // a quote right after an apostrophe is a character
                    // literal ('"'), not a string opener
                } else if self.is('"') {
                    self.set_state(State::InString);
                }
            }
            State::InString => {
                if self.is_newline() {
                    return Err(CountError::UnterminatedString { offset: self.pos });
                } else if self.was('\\') && self.is('"') {
                    // escaped quote stays inside the literal
                } else if self.is('"') {
                    self.set_state(State::LineWithCode);
                }
            }
            State::InLineComment => {
                if self.is_newline() {
                    self.set_state(State::LineBegin);
                }
            }
            State::InBlockCommentNoCode => {
                if self.was('*') && self.is('/') && self.can_close_block_comment() {
                    self.set_state(State::LineBegin);
                }
            }
            State::InBlockCommentAfterCode => {
                if self.is_newline() {
                    // the comment rolls over onto a fresh line that has no
                    // code of its own yet
                    if self.can_open_block_comment() {
                        self.set_state(State::InBlockCommentNoCode);
                    }
                } else if self.was('*') && self.is('/') && self.can_close_block_comment() {
                    self.set_state(State::LineWithCode);
                }
            }
            State::LineStartsWithSlash => {
                if self.is_newline() {
                    // a lone / before the newline is a division operator,
                    // so the line held code after all
                    self.count += 1;
                    self.set_state(State::LineBegin);
                } else if self.is('*') {
                    if self.can_open_block_comment() {
                        self.set_state(State::InBlockCommentNoCode);
                    }
                } else if self.is('/') {
                    if self.can_start_line_comment() {
                        self.set_state(State::InLineComment);
                    }
                } else {
                    // the slash was division; the line counts from here
                    self.count += 1;
                    self.set_state(State::LineWithCode);
                }
            }
        }
        Ok(())
    }

    /// Records delimiter positions as state changes go through: entering a
    /// block comment pins the `*` of the opener, leaving one pins the `/` of
    /// the closer.
    fn set_state(&mut self, next: State) {
        if next.is_block_comment() {
            self.block_open_pos = Some(self.pos);
        } else if self.state.is_block_comment() {
            self.block_close_pos = Some(self.pos);
        }
        self.state = next;
    }

    // The `*` of `/*` cannot double as the first character of `*/`.
    fn can_close_block_comment(&self) -> bool {
        self.block_open_pos.map_or(true, |p| p + 1 != self.pos)
    }

    // The `/` that closed a block comment cannot double as the first
    // character of `//` or `/*`.
    fn can_start_line_comment(&self) -> bool {
        self.block_close_pos.map_or(true, |p| p + 1 != self.pos)
    }

    fn can_open_block_comment(&self) -> bool {
        self.block_close_pos.map_or(true, |p| p + 1 != self.pos)
    }

    fn is(&self, c: char) -> bool {
        self.cur == c
    }

    fn was(&self, c: char) -> bool {
        self.prev == Some(c)
    }

    fn is_newline(&self) -> bool {
        self.cur == '\n'
    }

    fn is_blank(&self) -> bool {
        self.cur != '\n' && self.cur.is_whitespace()
    }

    fn advance(&mut self) -> bool {
        self.prev = Some(self.cur);
        self.pos += 1;
        match self.code.get(self.pos) {
            Some(&c) => {
                self.cur = c;
                true
            }
            None => false,
        }
    }

    fn trace_step(&mut self) {
        let prev = fmt_trace_char(self.prev);
        let cur = fmt_trace_char(Some(self.cur));
        if let Some(writer) = self.trace.as_mut() {
            let _ = writeln!(
                writer,
                "count={}. {}{} : {:?}",
                self.count, prev, cur, self.state
            );
        }
    }
}

fn fmt_trace_char(c: Option<char>) -> String {
    match c {
        None => "none".to_string(),
        Some('\n') => "\\n  ".to_string(),
        Some(c) => format!("'{}' ", c),
    }
}

/// Identify the language from the file extension (case-insensitive).
/// Returns a static string to avoid allocations; callers can `.to_string()`
/// when needed. Only C-family extensions are recognised.
fn language_from_extension(file_name: &str) -> Option<&'static str> {
    let ext = match file_name.rsplit_once('.') {
        Some((stem, e)) if !stem.is_empty() => e.to_lowercase(),
        _ => return None,
    };
    match ext.as_str() {
        "c" => Some("C"),
        "h" | "hh" | "hpp" | "hxx" => Some("C/C++ header"),
        "cc" | "cpp" | "cxx" => Some("C++"),
        "java" => Some("Java"),
        "cs" => Some("C#"),
        "js" | "jsx" => Some("JavaScript"),
        "ts" | "tsx" => Some("TypeScript"),
        "go" => Some("Go"),
        "scala" | "sbt" => Some("Scala"),
        "proto" => Some("Protobuf"),
        _ => None,
    }
}

fn is_ignored_dir(path: &Path) -> bool {
    let dir_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ignored = [
        "target",
        "node_modules",
        "build",
        "dist",
        ".git",
        "venv",
        "__pycache__",
        "bin",
        "obj",
    ];
    ignored.contains(&dir_name)
}

/// Truncates the given string to a maximum number of characters by keeping
/// the last characters. If truncation occurs, the returned string is prefixed
/// with "..." so that its total length equals max_len.
fn truncate_start(s: &str, max_len: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_len {
        s.to_string()
    } else {
        let skip_count = char_count - (max_len - 3);
        let truncated: String = s.chars().skip(skip_count).collect();
        format!("...{}", truncated)
    }
}

fn format_directory_display(path: &Path, current_dir: &Path) -> String {
    let raw = match path.strip_prefix(current_dir) {
        Ok(p) if p.as_os_str().is_empty() => ".".to_string(),
        Ok(p) => p.to_string_lossy().into_owned(),
        Err(_) => path.to_string_lossy().into_owned(),
    };
    truncate_start(&raw, DIR_WIDTH)
}

fn safe_rate(value: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs <= f64::EPSILON {
        0.0
    } else {
        value as f64 / elapsed_secs
    }
}

fn safe_percentage(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        (numerator as f64 / denominator as f64) * 100.0
    }
}

/// Reads the whole file, replacing invalid UTF-8 bytes with the replacement
/// character. The classifier works over one in-memory buffer, not lines.
fn read_source_lossy(file_path: &Path) -> io::Result<String> {
    let bytes = fs::read(file_path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Counts code-bearing lines in a single file, returning (code_lines,
/// total_lines). A classifier rejection (unterminated string) surfaces as
/// `InvalidData` so callers can treat it like any other per-file failure.
fn count_code_lines(file_path: &Path, trace: bool) -> io::Result<(u64, u64)> {
    let text = read_source_lossy(file_path)?;
    let total_lines = text.lines().count() as u64;
    let mut counter = LineCounter::new(&text);
    if trace {
        counter.enable_trace();
    }
    let code_lines = counter
        .count()
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err.to_string()))?;
    Ok((code_lines, total_lines))
}

fn should_process_file(filespec: Option<&Pattern>, root_path: &Path, file_path: &Path) -> bool {
    filespec
        .map(|pattern| filespec_matches(pattern, root_path, file_path))
        .unwrap_or(true)
}

fn filespec_matches(pattern: &Pattern, root_path: &Path, file_path: &Path) -> bool {
    if file_path
        .file_name()
        .and_then(|name| name.to_str())
        .map(|name| pattern.matches(name))
        .unwrap_or(false)
    {
        return true;
    }

    let relative = match file_path.strip_prefix(root_path) {
        Ok(rel) => rel,
        Err(_) => return false,
    };

    let rel_str = match relative.to_str() {
        Some(s) => s.replace('\\', "/"),
        None => return false,
    };

    pattern.matches(&rel_str)
}

#[allow(clippy::too_many_arguments)]
fn process_file(
    file_path: &Path,
    args: &Args,
    root_path: &Path,
    metrics: &mut PerformanceMetrics,
    stats: &mut HashMap<PathBuf, DirectoryStats>,
    entries_count: &mut usize,
    error_count: &mut usize,
    filespec: Option<&Pattern>,
) -> io::Result<()> {
    if !should_process_file(filespec, root_path, file_path) {
        return Ok(());
    }

    *entries_count += 1;
    if *entries_count > args.max_entries {
        return Err(io::Error::other("Too many entries in directory tree"));
    }

    let Some(language) = file_path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(language_from_extension)
    else {
        return Ok(());
    };

    match count_code_lines(file_path, args.trace) {
        Ok((code_lines, total_lines)) => {
            metrics.update(total_lines);
            let dir_path = file_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();
            let dir_stats = stats.entry(dir_path).or_default();
            let (count, tally) = dir_stats
                .language_stats
                .entry(language.to_string())
                .or_insert((0, LanguageTally::default()));
            *count += 1;
            tally.code_lines += code_lines;
            tally.total_lines += total_lines;

            if args.verbose {
                println!("File: {}", file_path.display());
                println!("  Code lines: {}", code_lines);
                println!("  Total lines: {}", total_lines);
                println!();
            }
        }
        Err(err) => {
            eprintln!("Error counting lines in {}: {}", file_path.display(), err);
            *error_count += 1;
        }
    }

    Ok(())
}

/// Recursively scan directories and collect statistics.
/// Errors on individual entries are reported and counted; the walk continues.
#[allow(clippy::too_many_arguments)]
fn scan_directory_impl(
    path: &Path,
    args: &Args,
    root_path: &Path,
    metrics: &mut PerformanceMetrics,
    current_depth: usize,
    entries_count: &mut usize,
    error_count: &mut usize,
    filespec: Option<&Pattern>,
) -> io::Result<HashMap<PathBuf, DirectoryStats>> {
    if current_depth > args.max_depth {
        eprintln!(
            "Warning: Maximum directory depth ({}) reached at {}",
            args.max_depth,
            path.display()
        );
        *error_count += 1;
        return Ok(HashMap::new());
    }

    if args.non_recursive && current_depth > 0 {
        return Ok(HashMap::new());
    }

    let mut stats: HashMap<PathBuf, DirectoryStats> =
        HashMap::with_capacity(if path.is_dir() { 128 } else { 1 });

    if is_ignored_dir(path) || args.ignore.iter().any(|d| path.ends_with(Path::new(d))) {
        return Ok(stats);
    }

    let metadata = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(err) => {
            eprintln!("Error reading metadata for {}: {}", path.display(), err);
            *error_count += 1;
            return Ok(stats);
        }
    };

    if metadata.is_file() {
        process_file(
            path,
            args,
            root_path,
            metrics,
            &mut stats,
            entries_count,
            error_count,
            filespec,
        )?;
        return Ok(stats);
    }

    if !metadata.is_dir() {
        return Ok(stats);
    }

    let read_dir = match fs::read_dir(path) {
        Ok(iter) => iter,
        Err(err) => {
            eprintln!("Error reading directory {}: {}", path.display(), err);
            *error_count += 1;
            return Ok(stats);
        }
    };

    for entry_result in read_dir {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(err) => {
                eprintln!("Error reading entry in {}: {}", path.display(), err);
                *error_count += 1;
                continue;
            }
        };

        let entry_path = entry.path();
        let file_type = match entry.file_type() {
            Ok(ft) => ft,
            Err(err) => {
                eprintln!("Error reading type for {}: {}", entry_path.display(), err);
                *error_count += 1;
                continue;
            }
        };

        if file_type.is_dir() && !file_type.is_symlink() {
            if args.non_recursive {
                continue;
            }
            match scan_directory_impl(
                &entry_path,
                args,
                root_path,
                metrics,
                current_depth + 1,
                entries_count,
                error_count,
                filespec,
            ) {
                Ok(sub_stats) => {
                    for (dir, stat) in sub_stats {
                        merge_directory_stats(&mut stats, dir, stat);
                    }
                }
                Err(err) => {
                    eprintln!("Error scanning directory {}: {}", entry_path.display(), err);
                    *error_count += 1;
                }
            }
        } else if file_type.is_file() && !file_type.is_symlink() {
            process_file(
                &entry_path,
                args,
                root_path,
                metrics,
                &mut stats,
                entries_count,
                error_count,
                filespec,
            )?;
        }
    }

    Ok(stats)
}

fn scan_directory(
    path: &Path,
    args: &Args,
    _current_dir: &Path,
    metrics: &mut PerformanceMetrics,
    current_depth: usize,
    entries_count: &mut usize,
    error_count: &mut usize,
) -> io::Result<HashMap<PathBuf, DirectoryStats>> {
    let filespec_pattern = match args.filespec.as_deref() {
        Some(spec) => Some(Pattern::new(spec).map_err(|err| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Invalid filespec pattern '{}': {}", spec, err),
            )
        })?),
        None => None,
    };

    let root_path = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());

    scan_directory_impl(
        &root_path,
        args,
        &root_path,
        metrics,
        current_depth,
        entries_count,
        error_count,
        filespec_pattern.as_ref(),
    )
}

/// Helper function to print stats for a language
fn format_language_line(
    prefix: &str,
    lang: &str,
    file_count: u64,
    tally: &LanguageTally,
) -> String {
    format!(
        "{:<40} {:<width$} {:>8} {:>10} {:>10}",
        prefix,
        lang,
        file_count,
        tally.code_lines,
        tally.total_lines,
        width = LANG_WIDTH
    )
}

fn build_analysis_report(
    current_dir: &Path,
    stats: &HashMap<PathBuf, DirectoryStats>,
    files_processed: u64,
    lines_processed: u64,
    error_count: usize,
) -> String {
    let mut output = String::new();
    let mut sorted_stats: Vec<_> = stats.iter().collect();
    sorted_stats.sort_by(|(a, _), (b, _)| a.to_string_lossy().cmp(&b.to_string_lossy()));

    let mut total_by_language: HashMap<String, (u64, LanguageTally)> = HashMap::new();

    let _ = writeln!(output, "\n\nDetailed code-line analysis:");
    let _ = writeln!(output, "{}", "-".repeat(88));
    let _ = writeln!(
        output,
        "{:<40} {:<width$} {:>8} {:>10} {:>10}",
        "Directory",
        "Language",
        "Files",
        "Code",
        "Total",
        width = LANG_WIDTH
    );
    let _ = writeln!(output, "{}", "-".repeat(88));

    for (path, dir_stats) in sorted_stats {
        let display_path = format_directory_display(path, current_dir);
        let mut languages: Vec<_> = dir_stats.language_stats.iter().collect();
        languages.sort_by(|(a, _), (b, _)| a.cmp(b));

        for (lang, (file_count, tally)) in languages {
            let line = format_language_line(&display_path, lang, *file_count, tally);
            let _ = writeln!(output, "{}", line);
            let (total_count, total_tally) = total_by_language
                .entry(lang.to_string())
                .or_insert((0, LanguageTally::default()));
            *total_count += file_count;
            total_tally.code_lines += tally.code_lines;
            total_tally.total_lines += tally.total_lines;
        }
    }

    let _ = writeln!(output, "{:-<88}", "");
    let _ = writeln!(output, "Totals by language:");

    let mut sorted_totals: Vec<_> = total_by_language.iter().collect();
    sorted_totals.sort_by(|(a, _), (b, _)| a.cmp(b));

    for (lang, (file_count, tally)) in sorted_totals {
        let line = format_language_line("", lang, *file_count, tally);
        let _ = writeln!(output, "{}", line);
    }

    let mut grand_total = LanguageTally::default();
    for (_, (_files, tally)) in total_by_language.iter() {
        grand_total.code_lines += tally.code_lines;
        grand_total.total_lines += tally.total_lines;
    }

    if files_processed > 0 || lines_processed > 0 {
        let _ = writeln!(output, "\n{}", "Overall Summary:".blue().bold());
        let _ = writeln!(
            output,
            "Total files processed: {}",
            files_processed.to_string().bright_yellow()
        );
        let _ = writeln!(
            output,
            "Total lines processed: {}",
            lines_processed.to_string().bright_yellow()
        );
        let _ = writeln!(
            output,
            "Code lines: {} ({})",
            grand_total.code_lines.to_string().bright_yellow(),
            format!(
                "{:.1}%",
                safe_percentage(grand_total.code_lines, lines_processed)
            )
            .bright_yellow()
        );

        if error_count > 0 {
            let _ = writeln!(
                output,
                "\n{}: {}",
                "Warning".red().bold(),
                error_count.to_string().bright_yellow()
            );
        }
    }

    output
}

fn main() -> io::Result<()> {
    run_with_args(env::args_os())
}

fn run_with_args<I, T>(args: I) -> io::Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args = Args::parse_from(args);
    let mut metrics = PerformanceMetrics::new();
    run_cli_with_metrics(args, &mut metrics)
}

fn run_cli_with_metrics(args: Args, metrics: &mut PerformanceMetrics) -> io::Result<()> {
    println!(
        "{} {}",
        env!("CARGO_PKG_NAME").bright_cyan().bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_yellow()
    );

    let path = Path::new(&args.path);
    let current_dir = env::current_dir()?;
    let mut error_count = 0;

    if !path.exists() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("Path does not exist: {}", path.display()),
        ));
    }

    println!("Starting code-line analysis...");
    // Start with depth 0 and track errors
    let mut entries_count: usize = 0;
    let stats = scan_directory(
        path,
        &args,
        &current_dir,
        metrics,
        0,
        &mut entries_count,
        &mut error_count,
    )?;
    metrics.print_final_stats();
    let files_processed = metrics.files_processed.load(Ordering::Relaxed);
    let lines_processed = metrics.lines_processed.load(Ordering::Relaxed);

    // Print detailed analysis with fixed-width directory field.
    let report = build_analysis_report(
        &current_dir,
        &stats,
        files_processed,
        lines_processed,
        error_count,
    );
    print!("{}", report);

    Ok(())
}
