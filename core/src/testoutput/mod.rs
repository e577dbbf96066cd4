//! Line-oriented recognizer for mocha-style reporter output.
//!
//! Three independent line shapes are recognized after styling escapes are
//! stripped: suite headers (2–4 leading spaces), pass lines (`✔`/`✓`) and
//! fail lines (`✖`/`✗` or a numbered `N) name`).

use std::sync::OnceLock;

use regex::Regex;

use crate::results::TestState;
use crate::util::strip_ansi;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextCase {
    pub suite: String,
    pub title: String,
    pub state: TestState,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTestOutput {
    /// False when no pass/fail line matched: "wrong format", not "no tests".
    pub parsed: bool,
    pub passed: u64,
    pub failed: u64,
    pub suites: Vec<String>,
    pub cases: Vec<TextCase>,
}

impl ParsedTestOutput {
    pub fn total(&self) -> u64 {
        self.passed.saturating_add(self.failed)
    }
}

struct Patterns {
    pass: Regex,
    fail_glyph: Regex,
    fail_numbered: Regex,
    suite: Regex,
    summary: Regex,
    duration_suffix: Regex,
}

fn patterns() -> &'static Patterns {
    static P: OnceLock<Patterns> = OnceLock::new();
    P.get_or_init(|| Patterns {
        pass: Regex::new(r"^\s*[✔✓]\s+(.+?)\s*$").expect("pass regex"),
        fail_glyph: Regex::new(r"^\s*[✖✗]\s+(.+?)\s*$").expect("fail regex"),
        fail_numbered: Regex::new(r"^\s*\d+\)\s+(.+?)\s*$").expect("numbered fail regex"),
        suite: Regex::new(r"^ {2,4}(\S.*?)\s*$").expect("suite regex"),
        summary: Regex::new(r"^\s*\d+\s+(?:passing|failing|pending)\b").expect("summary regex"),
        duration_suffix: Regex::new(r"\s*\(\d+(?:\.\d+)?\s*m?s\)$").expect("duration regex"),
    })
}

fn clean_title(p: &Patterns, raw: &str) -> String {
    p.duration_suffix.replace(raw, "").trim().to_string()
}

pub fn parse_test_output(stdout: &str) -> ParsedTestOutput {
    let p = patterns();
    let cleaned = strip_ansi(stdout);

    let mut out = ParsedTestOutput::default();
    let mut current_suite = String::new();
    // Set after a "N passing/failing" summary line. The failure details that
    // follow repeat the numbered names and must not be counted twice. A suite
    // header or a glyph line starts the next run and clears it.
    let mut in_summary = false;

    for line in cleaned.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        if p.summary.is_match(line) {
            in_summary = true;
            continue;
        }

        if let Some(c) = p.pass.captures(line) {
            in_summary = false;
            out.passed += 1;
            out.cases.push(TextCase {
                suite: current_suite.clone(),
                title: clean_title(p, &c[1]),
                state: TestState::Passed,
            });
            continue;
        }

        let fail = p
            .fail_glyph
            .captures(line)
            .map(|c| (c, true))
            .or_else(|| p.fail_numbered.captures(line).map(|c| (c, false)));
        if let Some((c, glyph)) = fail {
            if glyph {
                in_summary = false;
            } else if in_summary {
                continue;
            }
            out.failed += 1;
            out.cases.push(TextCase {
                suite: current_suite.clone(),
                title: clean_title(p, &c[1]),
                state: TestState::Failed,
            });
            continue;
        }

        // Deeper-indented lines fail the 2–4 space match and leave the
        // current suite untouched.
        if let Some(c) = p.suite.captures(line) {
            in_summary = false;
            current_suite = c[1].to_string();
            if !out.suites.contains(&current_suite) {
                out.suites.push(current_suite.clone());
            }
        }
    }

    out.parsed = out.total() > 0;
    out
}
