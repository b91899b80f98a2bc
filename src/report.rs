//! Text rendering for the console and the results log.

use crate::summary::Verdict;
use crate::{ProbeError, ProbeResult};
use chrono::{DateTime, Utc};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Prefix of each command header in the log.
pub const COMMAND_MARKER: &str = ">>> ";
/// Logged in place of the response when the device stayed silent.
pub const NO_RESPONSE: &str = "<no response>";
/// Indentation of response lines in the console progress.
pub const PROGRESS_INDENT: &str = "   ";

/// Renders the progress block printed after each command.
pub fn render_progress(result: &ProbeResult) -> String {
    let mut out = format!("Sent: {}  -> {} line(s)\n", result.command(), result.lines().len());
    for line in result.lines() {
        out.push_str(PROGRESS_INDENT);
        out.push_str(line);
        out.push('\n');
    }
    out
}

// ISO 8601 without offset; microseconds only when non-zero.
fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    let mut out = timestamp.format("%Y-%m-%dT%H:%M:%S").to_string();
    let micros = timestamp.timestamp_subsec_micros();
    if micros != 0 {
        out.push_str(&format!(".{:06}", micros));
    }
    out
}

/// Renders the complete results log.
pub fn render_log(port: &str, baud: u32, timestamp: DateTime<Utc>, results: &[ProbeResult]) -> String {
    let mut out = format!(
        "ESP AT probe results - {} UTC\nPort: {} Baud: {}\n\n",
        format_timestamp(timestamp),
        port,
        baud
    );

    for result in results {
        out.push_str(&format!("{}{}\n", COMMAND_MARKER, result.command()));
        if result.is_empty() {
            out.push_str(NO_RESPONSE);
            out.push('\n');
        }
        for line in result.lines() {
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
    }

    out
}

/// Writes `contents` to `path`, replacing any previous log and creating the
/// parent directory if needed.
///
/// The data goes to a temporary file next to `path` that is then renamed over
/// it, so a failed write leaves the previous log untouched.
pub fn write_log(path: &Path, contents: &str) -> Result<(), ProbeError> {
    let to_error = |source: io::Error| ProbeError::WriteLog {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(to_error)?;

    let mut file = NamedTempFile::new_in(dir).map_err(to_error)?;
    file.write_all(contents.as_bytes()).map_err(to_error)?;
    file.as_file().sync_all().map_err(to_error)?;
    file.persist(path).map_err(|e| to_error(e.error))?;
    Ok(())
}

/// Renders the closing summary printed once all commands have been sent.
pub fn render_summary(verdicts: &[Verdict<'_>], log_path: &Path) -> String {
    let mut out = String::from("\nSummary: possible support for the following commands: \n");
    if verdicts.is_empty() {
        out.push_str(&format!(
            "  No clear MQTT-related responses detected. See {} for full logs.\n",
            log_path.display()
        ));
    }
    for verdict in verdicts {
        out.push_str(&format!(" - {} : {}\n", verdict.command, verdict.reason));
    }
    out.push_str(&format!("Full log written to {}\n", log_path.display()));
    out
}
