use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::models::{DependencyCategory, DependencyEntry, DependencyReport, ReportBuilder};

/// Shortest run of `=` that counts as a banner line
const BANNER_MIN_LEN: usize = 10;

fn timestamp_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?Z\s?")
            .expect("timestamp pattern is valid")
    })
}

fn ansi_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").expect("ansi pattern is valid"))
}

fn cmake_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^--+\s*").expect("marker pattern is valid"))
}

fn title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^=\s*dependency report\s*=$").expect("title pattern is valid")
    })
}

// `fmt 10.1.1  (11.0.2 BUILT LOCALLY)` or `fmt  (11.0.2 BUILT LOCALLY)`
fn built_locally_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<pkg>\S+)(?:\s+\S+)?\s+\((?P<ver>\S+)\s+(?i:built locally)\)$")
            .expect("built locally pattern is valid")
    })
}

// `OpenCV  (found 3.2, needed 4.0)` or `boost (1.83.0)`
fn parenthesized_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<pkg>\S+)\s+\((?:found\s+)?(?P<ver>v?\d[^,\s)]*)[^)]*\)$")
            .expect("parenthesized pattern is valid")
    })
}

// `cmake 3.28.1`, `missing_package`, `boost 1.83.0 (needed 1.84)`
fn plain_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<pkg>\S+)(?:\s+(?P<ver>v?\d\S*))?(?:\s+\([^)]*\))?$")
            .expect("plain pattern is valid")
    })
}

/// Strip the GitHub timestamp, ANSI colors and the CMake `--` prefix from a log line
pub fn clean_line(line: &str) -> String {
    let line = line.trim().trim_start_matches('\u{feff}');
    let line = timestamp_re().replace(line, "");
    let line = ansi_re().replace_all(&line, "");
    let line = cmake_marker_re().replace(line.trim(), "");
    line.trim().to_string()
}

fn is_banner(line: &str) -> bool {
    line.len() >= BANNER_MIN_LEN && line.chars().all(|c| c == '=')
}

/// Locate the dependency report block and return its cleaned body lines
///
/// The block is a banner / `= Dependency report =` / banner header followed by
/// the body, closed by the next banner. Returns `None` if the header is missing
/// or the block is never closed.
pub fn extract_section(log_text: &str) -> Option<Vec<String>> {
    let lines: Vec<String> = log_text.lines().map(clean_line).collect();

    let title = lines.windows(3).position(|w| {
        is_banner(&w[0]) && title_re().is_match(&w[1]) && is_banner(&w[2])
    })?;
    let body_start = title + 3;

    let Some(body_len) = lines[body_start..].iter().position(|l| is_banner(l)) else {
        debug!("Dependency report opened at line {} but never closed", title + 1);
        return None;
    };

    Some(
        lines
            .into_iter()
            .skip(body_start)
            .take(body_len)
            .collect(),
    )
}

enum Header {
    Known(DependencyCategory),
    Unknown,
}

fn parse_header(line: &str) -> Option<Header> {
    let lower = line.to_lowercase();
    if !lower.contains("dependencies") {
        return None;
    }

    // "not found (BUILT LOCALLY)" has to be checked before plain "not found"
    let category = if lower.contains("built locally") {
        DependencyCategory::BuiltLocally
    } else if lower.contains("found externally") {
        DependencyCategory::FoundExternally
    } else if lower.contains("too old") {
        DependencyCategory::TooOld
    } else if lower.contains("not found") {
        DependencyCategory::NotFound
    } else {
        return Some(Header::Unknown);
    };

    Some(Header::Known(category))
}

/// A package line, plus the category it forces (if any)
struct ParsedEntry {
    entry: DependencyEntry,
    category_override: Option<DependencyCategory>,
}

fn parse_entry(line: &str) -> Option<ParsedEntry> {
    if let Some(caps) = built_locally_re().captures(line) {
        return Some(ParsedEntry {
            entry: DependencyEntry::new(&caps["pkg"], Some(caps["ver"].to_string())),
            category_override: Some(DependencyCategory::BuiltLocally),
        });
    }

    let caps = parenthesized_re()
        .captures(line)
        .or_else(|| plain_re().captures(line))?;

    Some(ParsedEntry {
        entry: DependencyEntry::new(
            &caps["pkg"],
            caps.name("ver").map(|v| v.as_str().to_string()),
        ),
        category_override: None,
    })
}

/// Sort already-cleaned body lines into categories
pub fn parse_section<S: AsRef<str>>(lines: &[S]) -> DependencyReport {
    let mut builder = ReportBuilder::new();
    let mut current: Option<DependencyCategory> = None;

    for line in lines {
        let line = line.as_ref().trim();
        if line.is_empty() {
            continue;
        }

        if let Some(header) = parse_header(line) {
            current = match header {
                Header::Known(category) => Some(category),
                Header::Unknown => {
                    debug!("Ignoring unrecognised report header: {}", line);
                    None
                }
            };
            continue;
        }

        let Some(category) = current else {
            continue;
        };

        match parse_entry(line) {
            Some(parsed) => {
                builder.push(parsed.category_override.unwrap_or(category), parsed.entry);
            }
            None => debug!("Skipping malformed {} line: {}", category, line),
        }
    }

    builder.build()
}

/// Parse a raw job log into a dependency report
///
/// A log without a report section gives an empty report.
pub fn parse(log_text: &str) -> DependencyReport {
    match extract_section(log_text) {
        Some(body) => parse_section(&body),
        None => {
            debug!("No dependency report section in log");
            DependencyReport::default()
        }
    }
}
