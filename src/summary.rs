//! Best-effort classification of probe responses.
//!
//! This is a text heuristic, not an AT response parser. It never fails, whatever
//! the device sent back.

use crate::ProbeResult;
use std::fmt;

/// Why a command is reported as possibly supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictReason {
    /// Some response line mentions MQTT.
    ContainsMqtt,
    /// A response line is a bare `OK`.
    Ok,
}

impl VerdictReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictReason::ContainsMqtt => "contains mqtt",
            VerdictReason::Ok => "OK",
        }
    }
}

impl fmt::Display for VerdictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// A command that looks supported, borrowed from the result it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict<'a> {
    pub command: &'a str,
    pub reason: VerdictReason,
}

/// Classifies one response. `None` means no verdict.
#[allow(clippy::if_same_then_else)]
pub fn classify(lines: &[String]) -> Option<VerdictReason> {
    let joined = lines.join("\n").to_lowercase();

    if joined.contains("mqtt") {
        Some(VerdictReason::ContainsMqtt)
    } else if lines.iter().any(|line| line.trim().to_uppercase() == "OK") {
        Some(VerdictReason::Ok)
    } else if lines.iter().any(|line| line.to_lowercase().contains("error")) {
        // An error reply is never a sign of support.
        None
    } else {
        None
    }
}

/// Returns a verdict for every result that looks supported, in probe order.
pub fn summarize(results: &[ProbeResult]) -> Vec<Verdict<'_>> {
    results
        .iter()
        .filter_map(|result| {
            classify(result.lines()).map(|reason| Verdict {
                command: result.command(),
                reason,
            })
        })
        .collect()
}
