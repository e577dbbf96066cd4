#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use testgen_core::events::{EventBus, LogLevel, TaskEvent, TaskEventKind};
use testgen_core::orchestrator::{Notifier, TaskOrchestrator};
use testgen_core::provider::{AgentProvider, AgentRequest, CommandOutput, CommandRunner, RunningTask};
use testgen_core::registry::TaskRegistry;
use testgen_core::report::FsReportStore;
use testgen_core::AppConfig;

/// What the scripted agent does for one `run` call.
pub enum Reply {
    /// Each line becomes an info log, then `completed(exit_code)`.
    Text { lines: Vec<String>, exit_code: Option<i32> },
    /// Never emits anything and keeps the stream open.
    Hang,
    /// Drops the stream without a `completed` event.
    CloseWithoutCompleting,
    FailToStart(String),
}

impl Reply {
    pub fn text(body: &str, exit_code: Option<i32>) -> Self {
        Self::Text {
            lines: body.lines().map(str::to_string).collect(),
            exit_code,
        }
    }
}

type RunHook = Box<dyn Fn(&AgentRequest) + Send + Sync>;

pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<AgentRequest>>,
    disposed: Arc<AtomicUsize>,
    on_run: Option<RunHook>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            disposed: Arc::new(AtomicUsize::new(0)),
            on_run: None,
        }
    }

    pub fn with_hook(mut self, hook: impl Fn(&AgentRequest) + Send + Sync + 'static) -> Self {
        self.on_run = Some(Box::new(hook));
        self
    }

    pub fn requests(&self) -> Vec<AgentRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn dispose_count(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }
}

struct ScriptedHandle {
    disposed: Arc<AtomicUsize>,
    // Held so a hanging invocation keeps its stream open.
    _tx: Option<mpsc::UnboundedSender<TaskEvent>>,
}

impl RunningTask for ScriptedHandle {
    fn dispose(&mut self) {
        self.disposed.fetch_add(1, Ordering::SeqCst);
        self._tx = None;
    }
}

#[async_trait]
impl AgentProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn run(
        &self,
        request: AgentRequest,
        events: mpsc::UnboundedSender<TaskEvent>,
    ) -> anyhow::Result<Box<dyn RunningTask>> {
        if let Some(hook) = &self.on_run {
            hook(&request);
        }
        self.requests.lock().unwrap().push(request.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::text("", Some(0)));

        let task_id = request.task_id.as_str();
        let mut handle = ScriptedHandle {
            disposed: Arc::clone(&self.disposed),
            _tx: None,
        };
        match reply {
            Reply::FailToStart(msg) => anyhow::bail!(msg),
            Reply::Text { lines, exit_code } => {
                let _ = events.send(TaskEvent::started(task_id, "scripted", None));
                for line in lines {
                    let _ = events.send(TaskEvent::log(task_id, LogLevel::Info, line));
                }
                let _ = events.send(TaskEvent::completed(task_id, exit_code));
            }
            Reply::Hang => handle._tx = Some(events),
            Reply::CloseWithoutCompleting => {
                let _ = events.send(TaskEvent::started(task_id, "scripted", None));
            }
        }
        Ok(Box::new(handle))
    }
}

pub struct RecordingCommandRunner {
    outputs: Mutex<VecDeque<Result<CommandOutput, String>>>,
    calls: Mutex<Vec<(String, PathBuf)>>,
}

impl RecordingCommandRunner {
    pub fn new(outputs: Vec<Result<CommandOutput, String>>) -> Self {
        Self {
            outputs: Mutex::new(outputs.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn passing(stdout: &str) -> Self {
        Self::new(vec![Ok(CommandOutput {
            exit_code: Some(0),
            duration_ms: 120,
            stdout: stdout.to_string(),
            ..CommandOutput::default()
        })])
    }

    pub fn calls(&self) -> Vec<(String, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for RecordingCommandRunner {
    fn name(&self) -> &str {
        "recording"
    }

    async fn execute(&self, command: &str, cwd: &Path) -> anyhow::Result<CommandOutput> {
        self.calls
            .lock()
            .unwrap()
            .push((command.to_string(), cwd.to_path_buf()));
        match self.outputs.lock().unwrap().pop_front() {
            Some(Ok(out)) => Ok(out),
            Some(Err(msg)) => Err(anyhow::anyhow!(msg)),
            None => anyhow::bail!("no scripted output left"),
        }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<(LogLevel, String)>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: LogLevel, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push((level, message.to_string()));
    }
}

pub struct Harness {
    pub orchestrator: TaskOrchestrator,
    pub registry: Arc<TaskRegistry>,
    pub bus: Arc<EventBus>,
    pub provider: Arc<ScriptedProvider>,
    pub runner: Arc<RecordingCommandRunner>,
    pub notifier: Arc<RecordingNotifier>,
    pub reports_dir: PathBuf,
}

pub fn harness(
    root: &Path,
    cfg: AppConfig,
    provider: ScriptedProvider,
    runner: RecordingCommandRunner,
) -> Harness {
    let registry = TaskRegistry::new();
    let bus = Arc::new(EventBus::new());
    let provider = Arc::new(provider);
    let runner = Arc::new(runner);
    let notifier = Arc::new(RecordingNotifier::default());
    let store = FsReportStore::from_config(root, &cfg.reports);
    let reports_dir = store.dir().to_path_buf();
    let orchestrator = TaskOrchestrator::new(
        Arc::clone(&registry),
        Arc::clone(&bus),
        provider.clone(),
        runner.clone(),
        Arc::new(store),
        notifier.clone(),
        cfg,
    );
    Harness {
        orchestrator,
        registry,
        bus,
        provider,
        runner,
        notifier,
        reports_dir,
    }
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<TaskEvent>) -> Vec<TaskEvent> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}

pub fn phases_of(events: &[TaskEvent], task_id: &str) -> Vec<String> {
    events
        .iter()
        .filter(|e| e.task_id == task_id)
        .filter_map(|e| match &e.kind {
            TaskEventKind::Phase { phase, .. } => Some(phase.clone()),
            _ => None,
        })
        .collect()
}

pub fn completions_of(events: &[TaskEvent], task_id: &str) -> Vec<Option<i32>> {
    events
        .iter()
        .filter(|e| e.task_id == task_id)
        .filter_map(|e| match &e.kind {
            TaskEventKind::Completed { exit_code } => Some(*exit_code),
            _ => None,
        })
        .collect()
}

/// Config with short timeouts and reports under `reports/`.
pub fn test_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.reports.directory = "reports".to_string();
    cfg.agent.timeout_ms = Some(5_000);
    cfg.perspective.timeout_ms = Some(5_000);
    cfg.test_execution.timeout_ms = Some(5_000);
    cfg
}

pub fn report_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|rd| {
            rd.filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
