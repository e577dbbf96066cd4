//! Test-execution phase: runner selection, agent rejection fallback and
//! result-file attachment. Never fails; problems are recorded on the result.

use std::path::{Path, PathBuf};

use crate::config::{AppConfig, TestRunnerKind};
use crate::events::{EventBus, LogLevel, TaskEvent};
use crate::extract::{parse_marked_execution, parse_test_execution_json, parse_test_result_file};
use crate::invocation::run_with_bounded_wait;
use crate::provider::{AgentProvider, AgentRequest, CommandRunner, OutputFormat};
use crate::registry::TaskRegistry;
use crate::results::TestExecutionResult;
use crate::util::truncate;

use super::advisory::check_nested_host;
use super::prompts::agent_execution_prompt;
use super::rejection::detect_rejection;

const TRANSCRIPT_TAIL_CHARS: usize = 16 * 1024;

pub(crate) struct ExecutionRun {
    pub result: TestExecutionResult,
    pub runner: TestRunnerKind,
    pub fallback_reason: Option<String>,
}

pub(crate) struct TestExecutor<'a> {
    pub provider: &'a dyn AgentProvider,
    pub command_runner: &'a dyn CommandRunner,
    pub registry: &'a TaskRegistry,
    pub bus: &'a EventBus,
    pub cfg: &'a AppConfig,
    pub task_id: &'a str,
    pub workspace_root: &'a Path,
}

pub(crate) fn resolve_cwd(workspace_root: &Path, cwd: Option<&str>) -> PathBuf {
    match cwd.map(str::trim).filter(|c| !c.is_empty()) {
        Some(c) => workspace_root.join(c),
        None => workspace_root.to_path_buf(),
    }
}

fn tail(s: &str, max_chars: usize) -> String {
    let count = s.chars().count();
    if count <= max_chars {
        return s.to_string();
    }
    s.chars().skip(count - max_chars).collect()
}

impl TestExecutor<'_> {
    fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.bus.emit(TaskEvent::log(self.task_id, level, message));
    }

    pub async fn run(&self) -> ExecutionRun {
        let command = self.cfg.test_execution.command.trim();
        let cwd = resolve_cwd(self.workspace_root, self.cfg.test_execution.cwd.as_deref());
        let cwd_str = cwd.display().to_string();
        let configured = self.cfg.test_execution.runner;

        if command.is_empty() {
            tracing::info!(task_id = self.task_id, "test command is blank; skipping execution");
            self.log(LogLevel::Warn, "test command is blank; execution skipped");
            return ExecutionRun {
                result: TestExecutionResult::skipped(command, &cwd_str, "test command is empty"),
                runner: configured,
                fallback_reason: None,
            };
        }

        if let Some(reason) = check_nested_host(command, &cwd).await {
            self.log(
                LogLevel::Warn,
                format!("test command may launch a nested editor host: {reason}"),
            );
        }

        let mut run = match configured {
            TestRunnerKind::Local => ExecutionRun {
                result: self.run_local(command, &cwd).await,
                runner: TestRunnerKind::Local,
                fallback_reason: None,
            },
            TestRunnerKind::Agent => {
                let agent_result = self.run_via_agent(command, &cwd).await;
                match detect_rejection(&agent_result) {
                    None => ExecutionRun {
                        result: agent_result,
                        runner: TestRunnerKind::Agent,
                        fallback_reason: None,
                    },
                    Some(rejection) => {
                        tracing::warn!(
                            task_id = self.task_id,
                            reason = %rejection,
                            "agent-mediated test run rejected; falling back to local runner"
                        );
                        self.log(
                            LogLevel::Warn,
                            format!("agent test run rejected ({rejection}); re-running locally"),
                        );
                        ExecutionRun {
                            result: self.run_local(command, &cwd).await,
                            runner: TestRunnerKind::Local,
                            fallback_reason: Some(rejection.to_string()),
                        }
                    }
                }
            }
        };

        if let Some(rel) = self.cfg.test_execution.result_file.as_deref() {
            run.result.test_result = self.read_result_file(&cwd.join(rel)).await;
        }
        run
    }

    async fn run_local(&self, command: &str, cwd: &Path) -> TestExecutionResult {
        let cwd_str = cwd.display().to_string();
        tracing::info!(
            task_id = self.task_id,
            runner = self.command_runner.name(),
            command,
            cwd = %cwd_str,
            "running tests locally"
        );
        match self.command_runner.execute(command, cwd).await {
            Ok(out) => TestExecutionResult::from_output(command, &cwd_str, out),
            Err(e) => {
                tracing::error!(task_id = self.task_id, error = %e, "failed to run test command");
                self.log(LogLevel::Error, format!("failed to run test command: {e}"));
                TestExecutionResult::failed_to_run(
                    command,
                    &cwd_str,
                    format!("failed to run test command: {e:#}"),
                )
            }
        }
    }

    async fn run_via_agent(&self, command: &str, cwd: &Path) -> TestExecutionResult {
        let cwd_str = cwd.display().to_string();
        let request = AgentRequest {
            task_id: self.task_id.to_string(),
            workspace_root: self.workspace_root.to_path_buf(),
            agent_command: self.cfg.agent.command.clone(),
            prompt: agent_execution_prompt(command, cwd),
            model: self.cfg.agent.model.clone(),
            output_format: OutputFormat::StreamJson,
            allow_write: false,
        };
        tracing::info!(task_id = self.task_id, command, "running tests through the agent");

        let outcome = match run_with_bounded_wait(
            self.provider,
            self.registry,
            self.bus,
            request,
            self.cfg.test_execution.timeout_ms,
        )
        .await
        {
            Ok(o) => o,
            Err(e) => {
                tracing::error!(task_id = self.task_id, error = %e, "agent test run failed to start");
                return TestExecutionResult::failed_to_run(command, &cwd_str, e.to_string());
            }
        };

        if let Some(out) = parse_marked_execution(&outcome.transcript) {
            return TestExecutionResult::from_output(command, &cwd_str, out);
        }
        if let Ok(out) = parse_test_execution_json(&outcome.transcript) {
            return TestExecutionResult::from_output(command, &cwd_str, out);
        }

        let message = if outcome.timed_out {
            "agent test run timed out before reporting a result".to_string()
        } else {
            format!(
                "agent reply contained no execution result (agent exit code {})",
                outcome
                    .exit_code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "null".to_string())
            )
        };
        tracing::warn!(task_id = self.task_id, "{message}");
        TestExecutionResult {
            stderr: tail(&outcome.transcript, TRANSCRIPT_TAIL_CHARS),
            ..TestExecutionResult::failed_to_run(command, &cwd_str, message)
        }
    }

    async fn read_result_file(&self, path: &Path) -> Option<crate::results::TestResultFile> {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "no test result file");
                return None;
            }
        };
        match parse_test_result_file(&raw) {
            Ok(file) => Some(file),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    sample = %truncate(&raw, 200),
                    "ignoring unparsable test result file"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cwd_is_resolved_against_the_workspace_root() {
        let root = Path::new("/w");
        assert_eq!(resolve_cwd(root, None), PathBuf::from("/w"));
        assert_eq!(resolve_cwd(root, Some("  ")), PathBuf::from("/w"));
        assert_eq!(resolve_cwd(root, Some("pkg")), PathBuf::from("/w/pkg"));
    }

    #[test]
    fn tail_keeps_the_end() {
        assert_eq!(tail("abcdef", 3), "def");
        assert_eq!(tail("ab", 3), "ab");
    }
}
