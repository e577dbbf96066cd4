//! Heuristics for an agent that declined to run the test command.
//!
//! The vocabulary is not exhaustive; every positive decision is logged by the
//! caller.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::results::TestExecutionResult;

const REJECTION_PHRASES: &[&str] = &[
    "i can't run",
    "i cannot run",
    "i can't execute",
    "i cannot execute",
    "i'm unable to run",
    "i am unable to run",
    "i'm not able to run",
    "i won't run",
    "i will not run",
    "not allowed to run",
    "not permitted to run",
    "command was not executed",
    "user rejected",
];

fn vocabulary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(refus(e|ed|es|ing) to (run|execute)|declin(e|ed|es|ing) to (run|execute)|execution (was )?(rejected|denied|blocked)|tool (call|use) (was )?(rejected|denied)|requires? (user )?approval)\b",
        )
        .expect("rejection vocabulary regex")
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Vocabulary(String),
    Phrase(&'static str),
    EmptyResult,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vocabulary(m) => write!(f, "stderr matched rejection vocabulary ({m})"),
            Self::Phrase(p) => write!(f, "stderr matched rejection phrase \"{p}\""),
            Self::EmptyResult => f.write_str("empty result"),
        }
    }
}

fn is_empty_result(r: &TestExecutionResult) -> bool {
    r.exit_code.is_none()
        && r.duration_ms == 0
        && r.signal.is_none()
        && r.stdout.is_empty()
        && r.stderr.is_empty()
        && r.error_message.as_deref().map_or(true, str::is_empty)
}

/// Classifies an agent-mediated result. `None` means it is accepted as is.
pub fn detect_rejection(result: &TestExecutionResult) -> Option<Rejection> {
    if let Some(m) = vocabulary_re().find(&result.stderr) {
        return Some(Rejection::Vocabulary(m.as_str().to_string()));
    }
    let lower = result.stderr.to_lowercase();
    if let Some(p) = REJECTION_PHRASES.iter().copied().find(|p| lower.contains(p)) {
        return Some(Rejection::Phrase(p));
    }
    is_empty_result(result).then_some(Rejection::EmptyResult)
}
