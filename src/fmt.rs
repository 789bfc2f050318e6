//! Result output formatters.
//!
//! Each `fmt_*` function writes one run's results to `w`. In text mode,
//! when `color` is true, matches are styled with ANSI escape codes via
//! `owo_colors`; without color they are written as plain text.

use crate::error::{CsError, Result};
use crate::services::SearchOutcome;
use crate::snippet::{extract_snippet, Segment, Snippet};
use crate::types::{FileJob, MatchSpan};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

/// Markers around matches in the JSON `highlighted` field.
pub const JSON_HIGHLIGHT: (&str, &str) = ("<mark>", "</mark>");

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "Invalid format: '{other}'. Valid formats: text, json"
            )),
        }
    }
}

fn snippet_for(job: &FileJob, snippet_length: usize) -> Snippet {
    let spans: Vec<MatchSpan> = job.all_spans().collect();
    extract_snippet(&job.content, &spans, snippet_length)
}

// ── text ────────────────────────────────────────────────────────────────────

pub fn fmt_text(
    w: &mut impl Write,
    outcome: &SearchOutcome,
    snippet_length: usize,
    color: bool,
) -> io::Result<()> {
    for job in &outcome.results {
        let location = job.location.display().to_string();
        if color {
            writeln!(w, "{} {}", location.magenta(), format_args!("({})", job.score).dimmed())?;
        } else {
            writeln!(w, "{location} ({})", job.score)?;
        }

        let snippet = snippet_for(job, snippet_length);
        if color {
            for segment in snippet.segments() {
                match segment {
                    Segment::Plain(s) => write!(w, "{s}")?,
                    Segment::Match(s) => write!(w, "{}", s.red().bold())?,
                }
            }
        } else {
            write!(w, "{}", snippet.text)?;
        }
        writeln!(w)?;
        writeln!(w)?;
    }

    if outcome.has_more() {
        let more = outcome.total_matches - outcome.results.len();
        let note = format!("... {more} more matching files");
        if color {
            writeln!(w, "{}", note.dimmed())?;
        } else {
            writeln!(w, "{note}")?;
        }
    }

    Ok(())
}

// ── json ────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct JsonResult<'a> {
    location: String,
    filename: &'a str,
    score: f64,
    matches: &'a BTreeMap<String, Vec<MatchSpan>>,
    snippet: String,
    highlighted: String,
}

pub fn fmt_json(
    w: &mut impl Write,
    outcome: &SearchOutcome,
    snippet_length: usize,
) -> Result<()> {
    let results: Vec<JsonResult<'_>> = outcome
        .results
        .iter()
        .map(|job| {
            let snippet = snippet_for(job, snippet_length);
            let (enter, exit) = JSON_HIGHLIGHT;
            JsonResult {
                location: job.location.display().to_string(),
                filename: &job.filename,
                score: job.score.as_f64(),
                matches: &job.match_locations,
                highlighted: snippet.highlighted(enter, exit),
                snippet: snippet.text,
            }
        })
        .collect();

    serde_json::to_writer_pretty(&mut *w, &results)?;
    writeln!(w)?;
    Ok(())
}

/// Writes results in `format` to `output`, or stdout when `None`.
///
/// # Errors
///
/// Returns `CsError::Output` if the output file cannot be created, or an
/// I/O or JSON error if writing fails.
pub fn write_results(
    outcome: &SearchOutcome,
    format: OutputFormat,
    snippet_length: usize,
    color: bool,
    output: Option<&Path>,
) -> Result<()> {
    match output {
        Some(path) => {
            let file = File::create(path).map_err(|source| CsError::Output {
                path: path.to_path_buf(),
                source,
            })?;
            let mut w = BufWriter::new(file);
            // Never color a file
            render(&mut w, outcome, format, snippet_length, false)?;
            w.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut w = BufWriter::new(stdout.lock());
            render(&mut w, outcome, format, snippet_length, color)?;
            w.flush()?;
        }
    }
    Ok(())
}

fn render(
    w: &mut impl Write,
    outcome: &SearchOutcome,
    format: OutputFormat,
    snippet_length: usize,
    color: bool,
) -> Result<()> {
    match format {
        OutputFormat::Text => fmt_text(w, outcome, snippet_length, color)?,
        OutputFormat::Json => fmt_json(w, outcome, snippet_length)?,
    }
    Ok(())
}
