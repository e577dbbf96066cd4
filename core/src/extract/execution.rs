//! Test-execution payloads returned by an agent: JSON v1 and the marker protocol.

use crate::error::ExtractionResult;
use crate::provider::CommandOutput;

use super::coerce::{duration_or_zero, opt_exit_code, opt_string, string_or_empty};
use super::json::extract_versioned_object;
use super::marker::{extract_block, extract_last_block};

pub const EXECUTION_JSON_VERSION: u64 = 1;

pub const RESULT_BEGIN: &str = "===TESTGEN_EXECUTION_RESULT_BEGIN===";
pub const RESULT_END: &str = "===TESTGEN_EXECUTION_RESULT_END===";
pub const STDOUT_BEGIN: &str = "===TESTGEN_STDOUT_BEGIN===";
pub const STDOUT_END: &str = "===TESTGEN_STDOUT_END===";
pub const STDERR_BEGIN: &str = "===TESTGEN_STDERR_BEGIN===";
pub const STDERR_END: &str = "===TESTGEN_STDERR_END===";

/// `{version:1, exitCode, signal, durationMs, stdout, stderr}`.
pub fn parse_test_execution_json(text: &str) -> ExtractionResult<CommandOutput> {
    let obj = extract_versioned_object(text, EXECUTION_JSON_VERSION)?;
    Ok(CommandOutput {
        exit_code: opt_exit_code(&obj, "exitCode"),
        signal: opt_string(&obj, "signal").filter(|s| !s.is_empty()),
        duration_ms: duration_or_zero(&obj, "durationMs"),
        stdout: string_or_empty(&obj, "stdout"),
        stderr: string_or_empty(&obj, "stderr"),
    })
}

/// The output contract given to the agent-mediated runner.
pub fn marker_contract() -> String {
    format!(
        "{RESULT_BEGIN}\n\
         exitCode: <integer exit code, or null if unknown>\n\
         signal: <signal name, or null>\n\
         durationMs: <integer milliseconds>\n\
         {STDOUT_BEGIN}\n\
         <complete stdout, verbatim>\n\
         {STDOUT_END}\n\
         {STDERR_BEGIN}\n\
         <complete stderr, verbatim>\n\
         {STDERR_END}\n\
         {RESULT_END}"
    )
}

fn parse_null_or<T>(value: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
    let v = value.trim().trim_matches('`').trim();
    if v.is_empty() || v.eq_ignore_ascii_case("null") || v.eq_ignore_ascii_case("none") {
        return None;
    }
    parse(v)
}

/// Parses the last complete marker-delimited payload in `text`.
///
/// Returns `None` when no complete begin/end pair is present.
pub fn parse_marked_execution(text: &str) -> Option<CommandOutput> {
    let payload = extract_last_block(text, RESULT_BEGIN, RESULT_END)?;

    let stdout = extract_block(payload, STDOUT_BEGIN, STDOUT_END).unwrap_or_default();
    let stderr = extract_block(payload, STDERR_BEGIN, STDERR_END).unwrap_or_default();

    // Key/value lines live outside the verbatim blocks.
    let header_end = [payload.find(STDOUT_BEGIN), payload.find(STDERR_BEGIN)]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(payload.len());
    let header = &payload[..header_end];

    let mut out = CommandOutput {
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
        ..CommandOutput::default()
    };

    for line in header.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        match key.trim().trim_start_matches(&['-', '*', ' '][..]) {
            "exitCode" => {
                out.exit_code = parse_null_or(value, |v| v.parse::<i32>().ok());
            }
            "signal" => {
                out.signal = parse_null_or(value, |v| Some(v.trim_matches('"').to_string()));
            }
            "durationMs" => {
                out.duration_ms = parse_null_or(value, |v| {
                    v.parse::<f64>()
                        .ok()
                        .filter(|n| n.is_finite() && *n >= 0.0)
                        .map(|n| n.round() as u64)
                })
                .unwrap_or(0);
            }
            _ => {}
        }
    }
    Some(out)
}
