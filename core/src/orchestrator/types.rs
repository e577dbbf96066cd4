use std::path::PathBuf;

use serde::Serialize;

use crate::aggregate::ResultSummary;
use crate::config::TestRunnerKind;
use crate::results::TestExecutionResult;

/// Pipeline states of one generation task, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Preparing,
    Perspectives,
    Generating,
    Testing,
    Completed,
}

impl Phase {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Preparing => "preparing",
            Self::Perspectives => "perspectives",
            Self::Generating => "generating",
            Self::Testing => "testing",
            Self::Completed => "completed",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Preparing => "Preparing",
            Self::Perspectives => "Generating test perspectives",
            Self::Generating => "Generating tests",
            Self::Testing => "Running tests",
            Self::Completed => "Done",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub task_id: String,
    pub label: String,
    pub workspace_root: PathBuf,
    /// Files or directories the tests should cover. Empty means "the workspace".
    pub targets: Vec<String>,
    /// Extra instruction appended to the generation prompt.
    pub instruction: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PerspectiveOutcome {
    Disabled,
    Extracted {
        cases: usize,
        report_path: Option<PathBuf>,
    },
    Failed {
        error_code: String,
        report_path: Option<PathBuf>,
    },
}

#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub result: TestExecutionResult,
    pub summary: ResultSummary,
    /// Runner whose result ended up in the report.
    pub runner: TestRunnerKind,
    /// Why the agent-mediated result was discarded, when it was.
    pub fallback_reason: Option<String>,
    pub report_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub task_id: String,
    pub perspective: PerspectiveOutcome,
    pub generation_exit_code: Option<i32>,
    pub generation_timed_out: bool,
    pub cleaned_up: Vec<PathBuf>,
    /// `None` when the run was cancelled before test execution.
    pub execution: Option<ExecutionOutcome>,
    pub cancelled: bool,
}
