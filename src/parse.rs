//! Parsers for remote build output (make / gcc style)

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

static PERCENT_RE: OnceLock<Option<Regex>> = OnceLock::new();
static DIAGNOSTIC_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn percent_re() -> Option<&'static Regex> {
    PERCENT_RE
        .get_or_init(|| Regex::new(r"([0-9]+)%").ok())
        .as_ref()
}

fn diagnostic_re() -> Option<&'static Regex> {
    DIAGNOSTIC_RE
        .get_or_init(|| Regex::new(r"(?m)^(.*):([0-9]+):[0-9]+: (warning|error): (.*)$").ok())
        .as_ref()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// One `file:line:col: severity: message` line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDiagnostic {
    pub file: String,
    pub line: u32,
    pub severity: Severity,
    pub message: String,
}

/// Every `NN%` in `text`, in order, duplicates kept.
///
/// ```
/// use fleetprobe::parse::parse_progress_percentages;
/// assert_eq!(parse_progress_percentages("building... 10% done\nlinking 55%\n"), vec![10, 55]);
/// ```
pub fn parse_progress_percentages(text: &str) -> Vec<u32> {
    let Some(re) = percent_re() else {
        return Vec::new();
    };

    re.captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| m.as_str().parse::<u32>().ok())
        .collect()
}

/// Compiler warnings and errors found in `text`, one per matching line
pub fn parse_build_diagnostics(text: &str) -> Vec<BuildDiagnostic> {
    let Some(re) = diagnostic_re() else {
        return Vec::new();
    };

    re.captures_iter(text)
        .filter_map(|caps| {
            let line = caps.get(2)?.as_str().parse::<u32>().ok()?;
            let severity = match caps.get(3)?.as_str() {
                "warning" => Severity::Warning,
                _ => Severity::Error,
            };
            Some(BuildDiagnostic {
                file: caps.get(1)?.as_str().to_string(),
                line,
                severity,
                message: caps.get(4)?.as_str().trim_end_matches('\r').to_string(),
            })
        })
        .collect()
}
