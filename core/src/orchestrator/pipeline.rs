//! Phase pipeline of one generation task:
//! preparing -> perspectives (optional) -> generating -> testing -> completed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;

use crate::aggregate::{summarize, Verdict};
use crate::config::AppConfig;
use crate::events::{EventBus, LogLevel, TaskEvent};
use crate::extract::{
    extract_last_block, parse_perspective_json, render_extraction_error_table,
    render_perspective_table,
};
use crate::error::ExtractError;
use crate::invocation::run_with_bounded_wait;
use crate::provider::{AgentProvider, AgentRequest, CommandRunner, OutputFormat};
use crate::registry::{TaskGuard, TaskRegistry};
use crate::report::{
    render_execution_report, render_perspective_report, ExecutionReportInput,
    PerspectiveReportInput, ReportKind, ReportStore,
};

use super::cleanup::sweep_duplicate_tables;
use super::execution::{ExecutionRun, TestExecutor};
use super::notify::Notifier;
use super::prompts::{
    generation_prompt, perspective_prompt, scope_restriction, PERSPECTIVES_BEGIN, PERSPECTIVES_END,
};
use super::types::{ExecutionOutcome, GenerationOutcome, GenerationRequest, Phase, PerspectiveOutcome};

pub struct TaskOrchestrator {
    registry: Arc<TaskRegistry>,
    bus: Arc<EventBus>,
    provider: Arc<dyn AgentProvider>,
    command_runner: Arc<dyn CommandRunner>,
    reports: Arc<dyn ReportStore>,
    notifier: Arc<dyn Notifier>,
    cfg: AppConfig,
}

/// Perspective phase result fed into the generation prompt.
struct PerspectiveStep {
    outcome: PerspectiveOutcome,
    table: Option<String>,
}

pub fn perspective_task_id(task_id: &str) -> String {
    format!("{task_id}-perspectives")
}

impl TaskOrchestrator {
    pub fn new(
        registry: Arc<TaskRegistry>,
        bus: Arc<EventBus>,
        provider: Arc<dyn AgentProvider>,
        command_runner: Arc<dyn CommandRunner>,
        reports: Arc<dyn ReportStore>,
        notifier: Arc<dyn Notifier>,
        cfg: AppConfig,
    ) -> Self {
        Self {
            registry,
            bus,
            provider,
            command_runner,
            reports,
            notifier,
            cfg,
        }
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    fn enter(&self, task_id: &str, phase: Phase) {
        tracing::info!(target: "testgen.orchestrator", task_id, phase = phase.tag(), "phase");
        self.bus.emit(TaskEvent::phase(task_id, phase.tag(), phase.label()));
    }

    fn emit_log(&self, task_id: &str, level: LogLevel, message: impl Into<String>) {
        self.bus.emit(TaskEvent::log(task_id, level, message));
    }

    /// Warning plus a null-exit completion when the task was cancelled.
    fn stop_if_cancelled(&self, guard: &TaskGuard, checkpoint: &str) -> bool {
        if !guard.is_cancelled() {
            return false;
        }
        tracing::warn!(
            target: "testgen.orchestrator",
            task_id = guard.task_id(),
            checkpoint,
            "task cancelled"
        );
        self.emit_log(
            guard.task_id(),
            LogLevel::Warn,
            format!("cancelled after {checkpoint}"),
        );
        self.notifier.notify(LogLevel::Warn, "Test generation cancelled");
        self.bus.emit(TaskEvent::completed(guard.task_id(), None));
        true
    }

    /// Runs the full pipeline. The task is registered for the duration of the
    /// call and unregistered on every exit path.
    #[tracing::instrument(
        name = "orchestrator.generate",
        skip(self, request),
        fields(task_id = %request.task_id)
    )]
    pub async fn run_generation(&self, request: GenerationRequest) -> GenerationOutcome {
        let guard = self.registry.register(&request.task_id, &request.label);
        let task_id = guard.task_id().to_string();
        self.bus.emit(TaskEvent::started(
            &task_id,
            &request.label,
            (!request.targets.is_empty()).then(|| request.targets.join(", ")),
        ));
        self.enter(&task_id, Phase::Preparing);

        let mut outcome = GenerationOutcome {
            task_id: task_id.clone(),
            perspective: PerspectiveOutcome::Disabled,
            generation_exit_code: None,
            generation_timed_out: false,
            cleaned_up: Vec::new(),
            execution: None,
            cancelled: false,
        };

        let step = if self.cfg.perspective.enabled {
            self.enter(&task_id, Phase::Perspectives);
            self.run_perspectives(&request).await
        } else {
            PerspectiveStep {
                outcome: PerspectiveOutcome::Disabled,
                table: None,
            }
        };
        outcome.perspective = step.outcome.clone();

        if self.stop_if_cancelled(&guard, "perspective generation") {
            outcome.cancelled = true;
            return outcome;
        }

        self.enter(&task_id, Phase::Generating);
        let mut prompt = generation_prompt(&request.targets, request.instruction.as_deref());
        if let Some(table) = &step.table {
            let saved = match &step.outcome {
                PerspectiveOutcome::Extracted { report_path, .. } => report_path.as_deref(),
                _ => None,
            };
            prompt.push_str(&scope_restriction(table, saved));
        }
        let gen_request = AgentRequest {
            task_id: task_id.clone(),
            workspace_root: request.workspace_root.clone(),
            agent_command: self.cfg.agent.command.clone(),
            prompt,
            model: self.cfg.agent.model.clone(),
            output_format: OutputFormat::StreamJson,
            allow_write: true,
        };
        match run_with_bounded_wait(
            self.provider.as_ref(),
            &self.registry,
            &self.bus,
            gen_request,
            self.cfg.agent.timeout_ms,
        )
        .await
        {
            Ok(o) => {
                outcome.generation_exit_code = o.exit_code;
                outcome.generation_timed_out = o.timed_out;
                if o.timed_out {
                    self.notifier.notify(LogLevel::Error, "Test generation timed out");
                } else if o.exit_code == Some(0) {
                    self.notifier.notify(LogLevel::Info, "Test generation finished");
                } else {
                    self.notifier.notify(
                        LogLevel::Warn,
                        &format!(
                            "Test generation ended with exit code {}",
                            o.exit_code
                                .map(|c| c.to_string())
                                .unwrap_or_else(|| "null".to_string())
                        ),
                    );
                }
            }
            Err(e) => {
                tracing::error!(task_id = %task_id, error = %e, "test generation failed");
                self.emit_log(&task_id, LogLevel::Error, format!("test generation failed: {e}"));
                self.notifier
                    .notify(LogLevel::Error, &format!("Test generation failed: {e}"));
            }
        }

        outcome.cleaned_up = sweep_duplicate_tables(
            &request.workspace_root,
            &self.cfg.reports.perspective_prefix,
        )
        .await;

        if self.stop_if_cancelled(&guard, "test generation") {
            outcome.cancelled = true;
            return outcome;
        }

        let execution = self
            .execution_phase(&task_id, &request.label, &request.workspace_root)
            .await;
        self.enter(&task_id, Phase::Completed);
        self.bus
            .emit(TaskEvent::completed(&task_id, execution.result.exit_code));
        outcome.execution = Some(execution);
        drop(guard);
        outcome
    }

    /// Runs only the test-execution phase under its own task.
    #[tracing::instrument(name = "orchestrator.run_tests", skip(self, workspace_root))]
    pub async fn run_test_execution(
        &self,
        task_id: &str,
        label: &str,
        workspace_root: &Path,
    ) -> ExecutionOutcome {
        let guard = self.registry.register(task_id, label);
        self.bus.emit(TaskEvent::started(task_id, label, None));
        let execution = self.execution_phase(task_id, label, workspace_root).await;
        self.enter(task_id, Phase::Completed);
        self.bus
            .emit(TaskEvent::completed(task_id, execution.result.exit_code));
        drop(guard);
        execution
    }

    async fn run_perspectives(&self, request: &GenerationRequest) -> PerspectiveStep {
        let p_task_id = perspective_task_id(&request.task_id);
        let _guard = self
            .registry
            .register(&p_task_id, &format!("{} (perspectives)", request.label));

        let p_request = AgentRequest {
            task_id: p_task_id.clone(),
            workspace_root: request.workspace_root.clone(),
            agent_command: self.cfg.agent.command.clone(),
            prompt: perspective_prompt(&request.targets, request.instruction.as_deref()),
            model: self.cfg.agent.model.clone(),
            output_format: OutputFormat::StreamJson,
            allow_write: false,
        };

        let (parsed, raw_log) = match run_with_bounded_wait(
            self.provider.as_ref(),
            &self.registry,
            &self.bus,
            p_request,
            self.cfg.perspective.timeout_ms,
        )
        .await
        {
            Ok(o) => {
                let payload = extract_last_block(&o.transcript, PERSPECTIVES_BEGIN, PERSPECTIVES_END)
                    .unwrap_or(&o.transcript);
                (parse_perspective_json(payload), o.transcript.clone())
            }
            Err(e) => {
                tracing::error!(task_id = %p_task_id, error = %e, "perspective generation failed");
                (Err(ExtractError::Empty), e.to_string())
            }
        };

        let (status, table) = match &parsed {
            Ok(cases) => (Ok(cases.len()), render_perspective_table(cases)),
            Err(err) => {
                tracing::warn!(
                    task_id = %p_task_id,
                    code = err.code(),
                    detail = err.detail().unwrap_or_default(),
                    "perspective extraction failed; continuing without a table"
                );
                (
                    Err(err.to_string()),
                    render_extraction_error_table(err, &raw_log),
                )
            }
        };

        let markdown = render_perspective_report(&PerspectiveReportInput {
            label: &request.label,
            targets: &request.targets,
            generated_at: Local::now(),
            status: status.clone(),
            table_markdown: &table,
        });
        let report_path = self.save_report(ReportKind::Perspective, &markdown).await;

        match status {
            Ok(cases) => {
                self.notifier.notify(
                    LogLevel::Info,
                    &format!("Test perspectives generated ({cases} cases)"),
                );
                PerspectiveStep {
                    outcome: PerspectiveOutcome::Extracted { cases, report_path },
                    table: Some(table),
                }
            }
            Err(error_code) => {
                self.notifier.notify(
                    LogLevel::Warn,
                    &format!("Test perspectives could not be extracted ({error_code})"),
                );
                PerspectiveStep {
                    outcome: PerspectiveOutcome::Failed {
                        error_code,
                        report_path,
                    },
                    table: None,
                }
            }
        }
    }

    async fn execution_phase(
        &self,
        task_id: &str,
        label: &str,
        workspace_root: &Path,
    ) -> ExecutionOutcome {
        self.enter(task_id, Phase::Testing);
        let ExecutionRun {
            result,
            runner,
            fallback_reason,
        } = TestExecutor {
            provider: self.provider.as_ref(),
            command_runner: self.command_runner.as_ref(),
            registry: &self.registry,
            bus: &self.bus,
            cfg: &self.cfg,
            task_id,
            workspace_root,
        }
        .run()
        .await;

        let summary = summarize(&result);
        let markdown = render_execution_report(&ExecutionReportInput {
            label,
            runner: runner.as_str(),
            fallback_reason: fallback_reason.as_deref(),
            generated_at: Local::now(),
            result: &result,
        });
        let report_path = self.save_report(ReportKind::Execution, &markdown).await;

        tracing::info!(
            target: "testgen.orchestrator",
            task_id,
            verdict = ?summary.verdict,
            passed = ?summary.counts.passed,
            failed = ?summary.counts.failed,
            "test execution finished"
        );
        match summary.verdict {
            Verdict::Success => self.notifier.notify(LogLevel::Info, "Tests passed"),
            Verdict::Failure => self.notifier.notify(LogLevel::Error, "Tests failed"),
            Verdict::Indeterminate => self.notifier.notify(LogLevel::Warn, "Tests skipped"),
        }

        ExecutionOutcome {
            result,
            summary,
            runner,
            fallback_reason,
            report_path,
        }
    }

    async fn save_report(&self, kind: ReportKind, markdown: &str) -> Option<PathBuf> {
        match self.reports.save(kind, Local::now(), markdown).await {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::error!(kind = kind.as_str(), error = %e, "failed to save report");
                self.notifier
                    .notify(LogLevel::Error, &format!("Failed to save {} report: {e}", kind.as_str()));
                None
            }
        }
    }
}
