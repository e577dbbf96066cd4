use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// One event in a task's stream. Produced by the provider or the orchestrator
/// and forwarded unchanged, in production order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskEvent {
    pub task_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: TaskEventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TaskEventKind {
    Started {
        label: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    Log {
        level: LogLevel,
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    FileWrite {
        path: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        lines_created: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        bytes_written: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    Phase {
        phase: String,
        phase_label: String,
    },
    #[serde(rename_all = "camelCase")]
    Completed { exit_code: Option<i32> },
}

impl TaskEvent {
    pub fn new(task_id: impl Into<String>, kind: TaskEventKind) -> Self {
        Self {
            task_id: task_id.into(),
            timestamp: Utc::now(),
            kind,
        }
    }

    pub fn started(task_id: &str, label: impl Into<String>, detail: Option<String>) -> Self {
        Self::new(
            task_id,
            TaskEventKind::Started {
                label: label.into(),
                detail,
            },
        )
    }

    pub fn log(task_id: &str, level: LogLevel, message: impl Into<String>) -> Self {
        Self::new(
            task_id,
            TaskEventKind::Log {
                level,
                message: message.into(),
            },
        )
    }

    pub fn phase(task_id: &str, phase: impl Into<String>, phase_label: impl Into<String>) -> Self {
        Self::new(
            task_id,
            TaskEventKind::Phase {
                phase: phase.into(),
                phase_label: phase_label.into(),
            },
        )
    }

    pub fn completed(task_id: &str, exit_code: Option<i32>) -> Self {
        Self::new(task_id, TaskEventKind::Completed { exit_code })
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.kind, TaskEventKind::Completed { .. })
    }
}
