//! Records produced by one test-execution phase.

use serde::{Deserialize, Serialize};

use crate::provider::CommandOutput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestState {
    Passed,
    Failed,
    Pending,
    Unknown,
}

impl TestState {
    /// Unrecognized values map to `Unknown` rather than failing.
    pub fn from_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "passed" | "pass" => Self::Passed,
            "failed" | "fail" => Self::Failed,
            "pending" | "skipped" => Self::Pending,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Pending => "pending",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseRecord {
    pub suite: String,
    pub title: String,
    pub full_title: String,
    pub state: TestState,
    pub duration_ms: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedTestRecord {
    pub title: String,
    pub full_title: String,
    pub error: String,
    pub stack: Option<String>,
    pub code: Option<String>,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

/// Structured result file written by the test run itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResultFile {
    pub platform: Option<String>,
    pub arch: Option<String>,
    pub node_version: Option<String>,
    pub host_version: Option<String>,
    pub failures: Option<u64>,
    pub passes: Option<u64>,
    pub pending: Option<u64>,
    pub total: Option<u64>,
    pub duration_ms: Option<f64>,
    pub tests: Option<Vec<TestCaseRecord>>,
    pub failed_tests: Option<Vec<FailedTestRecord>>,
}

impl TestResultFile {
    pub fn has_counters(&self) -> bool {
        self.failures.is_some()
            || self.passes.is_some()
            || self.pending.is_some()
            || self.total.is_some()
    }
}

/// Immutable record of one test-execution phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestExecutionResult {
    pub command: String,
    pub cwd: String,
    pub exit_code: Option<i32>,
    pub signal: Option<String>,
    pub duration_ms: u64,
    pub stdout: String,
    pub stderr: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
    pub skip_reason: Option<String>,
    pub error_message: Option<String>,
    pub test_result: Option<TestResultFile>,
}

impl TestExecutionResult {
    pub fn skipped(command: &str, cwd: &str, reason: impl Into<String>) -> Self {
        Self {
            command: command.to_string(),
            cwd: cwd.to_string(),
            exit_code: None,
            signal: None,
            duration_ms: 0,
            skipped: true,
            skip_reason: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn from_output(command: &str, cwd: &str, out: CommandOutput) -> Self {
        Self {
            command: command.to_string(),
            cwd: cwd.to_string(),
            exit_code: out.exit_code,
            signal: out.signal,
            duration_ms: out.duration_ms,
            stdout: out.stdout,
            stderr: out.stderr,
            ..Self::default()
        }
    }

    pub fn failed_to_run(command: &str, cwd: &str, message: impl Into<String>) -> Self {
        Self {
            command: command.to_string(),
            cwd: cwd.to_string(),
            error_message: Some(message.into()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loose_states_fall_back_to_unknown() {
        assert_eq!(TestState::from_loose("PASSED"), TestState::Passed);
        assert_eq!(TestState::from_loose("failed"), TestState::Failed);
        assert_eq!(TestState::from_loose("pending"), TestState::Pending);
        assert_eq!(TestState::from_loose("flaky"), TestState::Unknown);
    }

    #[test]
    fn skipped_result_has_null_exit_and_zero_duration() {
        let r = TestExecutionResult::skipped("", "/w", "no test command configured");
        assert!(r.skipped);
        assert_eq!(r.exit_code, None);
        assert_eq!(r.duration_ms, 0);
        assert_eq!(r.skip_reason.as_deref(), Some("no test command configured"));
    }
}
