//! Wires the orchestrator to the process-backed adapters and runs one command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use testgen_core::config::{AppConfig, TestRunnerKind};
use testgen_core::error::CliError;
use testgen_core::events::{EventBus, LogLevel, TaskEvent, TaskEventKind};
use testgen_core::orchestrator::{
    perspective_task_id, GenerationRequest, TaskOrchestrator, TracingNotifier,
};
use testgen_core::registry::TaskRegistry;
use testgen_core::report::{FsReportStore, ReportKind, ReportStore};
use testgen_plugins::{CodeCliProvider, ShellCommandRunner};

use crate::commands::cli::{ExecArgs, GenerateArgs, LatestArgs, ReportArg, RunTestsArgs, RunnerArg};

fn apply_exec_args(cfg: &mut AppConfig, exec: &ExecArgs) {
    if let Some(cmd) = &exec.test_command {
        cfg.test_execution.command = cmd.clone();
    }
    if let Some(r) = exec.runner {
        cfg.test_execution.runner = match r {
            RunnerArg::Local => TestRunnerKind::Local,
            RunnerArg::Agent => TestRunnerKind::Agent,
        };
    }
}

async fn resolve_workspace(path: &Path) -> Result<PathBuf, CliError> {
    tokio::fs::canonicalize(path)
        .await
        .map_err(|e| CliError::Config(format!("workspace {}: {e}", path.display())))
}

fn new_task_id(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}", &id[..8])
}

fn build_orchestrator(cfg: AppConfig, workspace_root: &Path) -> TaskOrchestrator {
    let reports = FsReportStore::from_config(workspace_root, &cfg.reports);
    TaskOrchestrator::new(
        TaskRegistry::new(),
        Arc::new(EventBus::new()),
        Arc::new(CodeCliProvider::new()),
        Arc::new(ShellCommandRunner::new()),
        Arc::new(reports),
        Arc::new(TracingNotifier),
        cfg,
    )
}

fn mirror_event(ev: &TaskEvent) {
    let task_id = ev.task_id.as_str();
    match &ev.kind {
        TaskEventKind::Started { label, detail } => {
            tracing::info!(target: "testgen.event", task_id, detail = ?detail, "started: {label}")
        }
        TaskEventKind::Log { level, message } => match level {
            LogLevel::Info => tracing::debug!(target: "testgen.event", task_id, "{message}"),
            LogLevel::Warn => tracing::warn!(target: "testgen.event", task_id, "{message}"),
            LogLevel::Error => tracing::error!(target: "testgen.event", task_id, "{message}"),
        },
        TaskEventKind::FileWrite {
            path,
            lines_created,
            bytes_written,
        } => tracing::info!(
            target: "testgen.event",
            task_id,
            lines = ?lines_created,
            bytes = ?bytes_written,
            "wrote {path}"
        ),
        TaskEventKind::Phase { phase, phase_label } => {
            tracing::info!(target: "testgen.event", task_id, phase = %phase, "{phase_label}")
        }
        TaskEventKind::Completed { exit_code } => {
            tracing::info!(target: "testgen.event", task_id, exit_code = ?exit_code, "completed")
        }
    }
}

/// Mirrors events into tracing and, optionally, a JSONL file. Ends when the
/// bus is dropped.
fn spawn_event_printer(
    mut rx: mpsc::UnboundedReceiver<TaskEvent>,
    events_out: Option<PathBuf>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut out = match events_out {
            Some(path) => match tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await
            {
                Ok(f) => Some(f),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "events-out disabled");
                    None
                }
            },
            None => None,
        };

        while let Some(ev) = rx.recv().await {
            mirror_event(&ev);
            if let Some(f) = out.as_mut() {
                match serde_json::to_string(&ev) {
                    Ok(mut line) => {
                        line.push('\n');
                        if let Err(e) = f.write_all(line.as_bytes()).await {
                            tracing::warn!(error = %e, "events-out write failed; disabling");
                            out = None;
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "event serialization failed"),
                }
            }
        }
        if let Some(mut f) = out {
            let _ = f.flush().await;
        }
    })
}

/// First Ctrl-C cancels cooperatively; the second disposes running agents.
fn spawn_interrupt_handler(registry: Arc<TaskRegistry>, task_ids: Vec<String>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!("cancelling after the current phase; press Ctrl-C again to stop the agent");
        for id in &task_ids {
            registry.cancel(id);
        }
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!("stopping the running agent");
        for id in &task_ids {
            registry.dispose(id);
        }
    })
}

pub async fn run_generate(
    mut cfg: AppConfig,
    args: GenerateArgs,
    events_out: Option<PathBuf>,
) -> Result<i32, CliError> {
    let root = resolve_workspace(&args.workspace.workspace).await?;
    if args.no_perspective {
        cfg.perspective.enabled = false;
    }
    if let Some(m) = args.model.filter(|m| !m.trim().is_empty()) {
        cfg.agent.model = Some(m);
    }
    if let Some(a) = args.agent.filter(|a| !a.trim().is_empty()) {
        cfg.agent.command = a;
    }
    if let Some(t) = args.timeout_ms {
        cfg.agent.timeout_ms = Some(t);
    }
    apply_exec_args(&mut cfg, &args.exec);

    let task_id = new_task_id("gen");
    let label = if args.targets.is_empty() {
        "generate tests".to_string()
    } else {
        format!("generate tests for {}", args.targets.join(", "))
    };

    let orchestrator = build_orchestrator(cfg, &root);
    let printer = spawn_event_printer(orchestrator.bus().subscribe(), events_out);
    let interrupt = spawn_interrupt_handler(
        Arc::clone(orchestrator.registry()),
        vec![task_id.clone(), perspective_task_id(&task_id)],
    );

    let outcome = orchestrator
        .run_generation(GenerationRequest {
            task_id,
            label,
            workspace_root: root,
            targets: args.targets,
            instruction: args.instruction,
        })
        .await;

    interrupt.abort();
    drop(orchestrator);
    let _ = printer.await;

    if outcome.cancelled {
        eprintln!("cancelled");
        return Ok(1);
    }
    Ok(match outcome.execution {
        Some(exec) => {
            if let Some(path) = &exec.report_path {
                println!("{}", path.display());
            }
            if exec.summary.verdict.is_success() {
                0
            } else {
                1
            }
        }
        None => 1,
    })
}

pub async fn run_tests(
    mut cfg: AppConfig,
    args: RunTestsArgs,
    events_out: Option<PathBuf>,
) -> Result<i32, CliError> {
    let root = resolve_workspace(&args.workspace.workspace).await?;
    apply_exec_args(&mut cfg, &args.exec);

    let task_id = new_task_id("run");
    let orchestrator = build_orchestrator(cfg, &root);
    let printer = spawn_event_printer(orchestrator.bus().subscribe(), events_out);
    let interrupt = spawn_interrupt_handler(Arc::clone(orchestrator.registry()), vec![task_id.clone()]);

    let exec = orchestrator
        .run_test_execution(&task_id, "run tests", &root)
        .await;

    interrupt.abort();
    drop(orchestrator);
    let _ = printer.await;

    if let Some(path) = &exec.report_path {
        println!("{}", path.display());
    }
    Ok(if exec.summary.verdict.is_success() { 0 } else { 1 })
}

pub async fn print_latest(cfg: &AppConfig, args: LatestArgs) -> Result<i32, CliError> {
    let root = resolve_workspace(&args.workspace.workspace).await?;
    let store = FsReportStore::from_config(&root, &cfg.reports);
    let kind = match args.kind {
        ReportArg::Perspective => ReportKind::Perspective,
        ReportArg::Execution => ReportKind::Execution,
    };
    match store.latest(kind).await? {
        Some(path) => {
            println!("{}", path.display());
            Ok(0)
        }
        None => {
            eprintln!("no {} report under {}", kind.as_str(), store.dir().display());
            Ok(1)
        }
    }
}
