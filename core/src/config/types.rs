use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub perspective: PerspectiveConfig,

    #[serde(default)]
    pub test_execution: TestExecutionConfig,

    #[serde(default)]
    pub reports: ReportsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default = "default_logging_file")]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "testgen_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_file() -> bool {
    false
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: default_logging_file(),
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Agent binary name or path (cursor-agent, claude, codex, gemini).
    #[serde(default = "default_agent_command")]
    pub command: String,

    #[serde(default)]
    pub model: Option<String>,

    /// Bounded wait for the generation phase. `None` or 0 waits forever.
    #[serde(default = "default_agent_timeout_ms")]
    pub timeout_ms: Option<u64>,
}

fn default_agent_command() -> String {
    "cursor-agent".to_string()
}

fn default_agent_timeout_ms() -> Option<u64> {
    Some(30 * 60 * 1000)
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            command: default_agent_command(),
            model: None,
            timeout_ms: default_agent_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerspectiveConfig {
    #[serde(default = "default_perspective_enabled")]
    pub enabled: bool,

    #[serde(default = "default_perspective_timeout_ms")]
    pub timeout_ms: Option<u64>,
}

fn default_perspective_enabled() -> bool {
    true
}

fn default_perspective_timeout_ms() -> Option<u64> {
    Some(10 * 60 * 1000)
}

impl Default for PerspectiveConfig {
    fn default() -> Self {
        Self {
            enabled: default_perspective_enabled(),
            timeout_ms: default_perspective_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestRunnerKind {
    #[default]
    Local,
    Agent,
}

impl TestRunnerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Agent => "agent",
        }
    }
}

impl std::str::FromStr for TestRunnerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "agent" | "cursoragent" | "cursor-agent" => Ok(Self::Agent),
            other => Err(format!("unknown test runner '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestExecutionConfig {
    /// Blank means the execution phase is skipped.
    #[serde(default = "default_test_command")]
    pub command: String,

    #[serde(default)]
    pub runner: TestRunnerKind,

    /// Working directory relative to the workspace root; empty means the root.
    #[serde(default)]
    pub cwd: Option<String>,

    /// Structured result file written by the test run, relative to the cwd.
    #[serde(default)]
    pub result_file: Option<String>,

    /// Bounded wait for the agent-mediated runner.
    #[serde(default = "default_execution_timeout_ms")]
    pub timeout_ms: Option<u64>,
}

fn default_test_command() -> String {
    "npm test".to_string()
}

fn default_execution_timeout_ms() -> Option<u64> {
    Some(15 * 60 * 1000)
}

impl Default for TestExecutionConfig {
    fn default() -> Self {
        Self {
            command: default_test_command(),
            runner: TestRunnerKind::default(),
            cwd: None,
            result_file: None,
            timeout_ms: default_execution_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportsConfig {
    /// Report directory relative to the workspace root.
    #[serde(default = "default_reports_directory")]
    pub directory: String,

    #[serde(default = "default_perspective_prefix")]
    pub perspective_prefix: String,

    #[serde(default = "default_execution_prefix")]
    pub execution_prefix: String,
}

fn default_reports_directory() -> String {
    "docs/test-reports".to_string()
}

fn default_perspective_prefix() -> String {
    "test_perspectives".to_string()
}

fn default_execution_prefix() -> String {
    "test_execution".to_string()
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            directory: default_reports_directory(),
            perspective_prefix: default_perspective_prefix(),
            execution_prefix: default_execution_prefix(),
        }
    }
}
