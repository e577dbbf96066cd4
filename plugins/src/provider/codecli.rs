use std::process::Stdio;

use anyhow::Context;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};

use testgen_core::events::{LogLevel, TaskEvent};
use testgen_core::provider::{AgentProvider, AgentRequest, RunningTask};

use super::plan::{build_args, AgentKind};
use super::stream_json::StreamJsonEventMapper;

/// Spawns a coding-agent CLI per request and streams its output as events.
pub struct CodeCliProvider {}

impl CodeCliProvider {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for CodeCliProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentProvider for CodeCliProvider {
    fn name(&self) -> &str {
        "codecli"
    }

    async fn run(
        &self,
        request: AgentRequest,
        events: mpsc::UnboundedSender<TaskEvent>,
    ) -> anyhow::Result<Box<dyn RunningTask>> {
        let kind = AgentKind::detect(&request.agent_command);
        let args = build_args(kind, &request);
        tracing::info!(
            task_id = %request.task_id,
            agent = kind.as_str(),
            cmd = %request.agent_command,
            allow_write = request.allow_write,
            prompt_len = request.prompt.len(),
            "spawning agent"
        );

        let mut child = Command::new(&request.agent_command)
            .args(&args)
            .current_dir(&request.workspace_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn agent `{}`", request.agent_command))?;

        let task_id = request.task_id;
        let _ = events.send(TaskEvent::started(
            &task_id,
            request.agent_command.clone(),
            Some(format!(
                "{} (pid {})",
                kind.as_str(),
                child.id().map(|p| p.to_string()).unwrap_or_else(|| "?".into())
            )),
        ));

        let stdout = child.stdout.take().context("agent stdout not piped")?;
        let stderr = child.stderr.take().context("agent stderr not piped")?;
        let (kill_tx, kill_rx) = oneshot::channel();

        tokio::spawn(supervise(child, stdout, stderr, kill_rx, events, task_id));

        Ok(Box::new(CodeCliHandle {
            kill: Some(kill_tx),
        }))
    }
}

struct CodeCliHandle {
    kill: Option<oneshot::Sender<()>>,
}

impl RunningTask for CodeCliHandle {
    fn dispose(&mut self) {
        if let Some(tx) = self.kill.take() {
            let _ = tx.send(());
        }
    }
}

async fn forward_stdout<R>(rd: R, events: mpsc::UnboundedSender<TaskEvent>, task_id: String)
where
    R: AsyncRead + Unpin,
{
    let mut mapper = StreamJsonEventMapper::new();
    let mut lines = BufReader::new(rd).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                for kind in mapper.map_line(&line) {
                    let _ = events.send(TaskEvent::new(task_id.as_str(), kind));
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(task_id = %task_id, error = %e, "agent stdout read failed");
                break;
            }
        }
    }
    for kind in mapper.flush() {
        let _ = events.send(TaskEvent::new(task_id.as_str(), kind));
    }
}

async fn forward_stderr<R>(rd: R, events: mpsc::UnboundedSender<TaskEvent>, task_id: String)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(rd).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        tracing::warn!(target: "testgen.agent.stderr", task_id = %task_id, "{line}");
        let _ = events.send(TaskEvent::log(&task_id, LogLevel::Warn, line));
    }
}

/// Drains both pipes, waits for exit (or kills on dispose) and emits the
/// single `completed` event after every other event.
async fn supervise<O, E>(
    mut child: Child,
    stdout: O,
    stderr: E,
    mut kill_rx: oneshot::Receiver<()>,
    events: mpsc::UnboundedSender<TaskEvent>,
    task_id: String,
) where
    O: AsyncRead + Unpin + Send + 'static,
    E: AsyncRead + Unpin + Send + 'static,
{
    let out_task = tokio::spawn(forward_stdout(stdout, events.clone(), task_id.clone()));
    let err_task = tokio::spawn(forward_stderr(stderr, events.clone(), task_id.clone()));

    let status = tokio::select! {
        status = child.wait() => status,
        res = &mut kill_rx => {
            // A dropped handle without dispose leaves the agent running.
            if res.is_ok() {
                tracing::info!(task_id = %task_id, "disposing agent process");
                if let Err(e) = child.start_kill() {
                    tracing::warn!(task_id = %task_id, error = %e, "failed to kill agent");
                }
            }
            child.wait().await
        }
    };

    let _ = out_task.await;
    let _ = err_task.await;

    let exit_code = match status {
        Ok(s) => s.code(),
        Err(e) => {
            tracing::error!(task_id = %task_id, error = %e, "failed to wait for agent");
            None
        }
    };
    tracing::info!(task_id = %task_id, exit_code = ?exit_code, "agent exited");
    let _ = events.send(TaskEvent::completed(&task_id, exit_code));
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::Path;
    use testgen_core::events::TaskEventKind;
    use testgen_core::provider::OutputFormat;

    /// `sh <script>`: the generic plan passes the prompt as the only argument.
    fn sh_request(dir: &Path, script: &str) -> AgentRequest {
        let path = dir.join("agent.sh");
        std::fs::write(&path, script).unwrap();
        AgentRequest {
            task_id: "t".into(),
            workspace_root: dir.to_path_buf(),
            agent_command: "sh".into(),
            prompt: path.display().to_string(),
            model: None,
            output_format: OutputFormat::StreamJson,
            allow_write: false,
        }
    }

    async fn collect(mut rx: mpsc::UnboundedReceiver<TaskEvent>) -> Vec<TaskEventKind> {
        let mut out = Vec::new();
        while let Some(ev) = rx.recv().await {
            out.push(ev.kind);
        }
        out
    }

    #[tokio::test]
    async fn streams_events_and_completes_once() {
        let dir = tempfile::tempdir().unwrap();
        let req = sh_request(
            dir.path(),
            r#"echo '{"type":"assistant","message":{"content":[{"type":"text","text":"hi"}]}}'
echo 'warning here' >&2
echo plain
exit 3
"#,
        );
        let (tx, rx) = mpsc::unbounded_channel();
        let _handle = CodeCliProvider::new().run(req, tx).await.unwrap();

        let kinds = collect(rx).await;
        assert!(matches!(kinds.first(), Some(TaskEventKind::Started { .. })));
        assert!(kinds.contains(&TaskEventKind::Log {
            level: LogLevel::Info,
            message: "hi".into()
        }));
        assert!(kinds.contains(&TaskEventKind::Log {
            level: LogLevel::Info,
            message: "plain".into()
        }));
        assert!(kinds.contains(&TaskEventKind::Log {
            level: LogLevel::Warn,
            message: "warning here".into()
        }));
        let completions: Vec<_> = kinds
            .iter()
            .filter(|k| matches!(k, TaskEventKind::Completed { .. }))
            .collect();
        assert_eq!(completions, vec![&TaskEventKind::Completed { exit_code: Some(3) }]);
        assert!(matches!(kinds.last(), Some(TaskEventKind::Completed { .. })));
    }

    #[tokio::test]
    async fn dispose_kills_the_agent() {
        let dir = tempfile::tempdir().unwrap();
        let req = sh_request(dir.path(), "exec sleep 30\n");
        let (tx, rx) = mpsc::unbounded_channel();
        let mut handle = CodeCliProvider::new().run(req, tx).await.unwrap();
        handle.dispose();
        handle.dispose();

        let kinds = tokio::time::timeout(std::time::Duration::from_secs(10), collect(rx))
            .await
            .unwrap();
        assert_eq!(kinds.last(), Some(&TaskEventKind::Completed { exit_code: None }));
    }

    #[tokio::test]
    async fn missing_binary_fails_to_start() {
        let dir = tempfile::tempdir().unwrap();
        let mut req = sh_request(dir.path(), "");
        req.agent_command = "/nonexistent/agent-binary".into();
        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(CodeCliProvider::new().run(req, tx).await.is_err());
    }
}
