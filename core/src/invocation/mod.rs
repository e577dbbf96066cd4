//! Runs one provider invocation under an optional bounded wait.
//!
//! Every provider event is forwarded to the bus. The wait resolves exactly
//! once: on the first `completed` event, when the provider drops its event
//! stream, or when the timeout elapses (the handle is then disposed and the
//! outcome carries a null exit code).

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::error::RunnerError;
use crate::events::{EventBus, LogLevel, TaskEvent, TaskEventKind};
use crate::provider::{AgentProvider, AgentRequest, RunningTask};
use crate::registry::TaskRegistry;
use crate::util::RingBytes;

/// Largest delay a single-shot timer can represent (signed 32-bit milliseconds).
/// Larger configured values mean "no timeout" instead of wrapping to an
/// almost-immediate deadline.
pub const MAX_TIMER_MS: u64 = 2_147_483_647;

const TRANSCRIPT_CAPTURE_BYTES: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct InvocationOutcome {
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    /// Assistant text (info-level log messages), newline separated. Only the
    /// tail is kept for very long runs.
    pub transcript: String,
}

/// Timeout actually armed for a configured value; `None` waits forever.
pub fn effective_timeout(timeout_ms: Option<u64>) -> Option<Duration> {
    match timeout_ms {
        None | Some(0) => None,
        Some(ms) if ms > MAX_TIMER_MS => {
            tracing::debug!(
                timeout_ms = ms,
                max_ms = MAX_TIMER_MS,
                "timeout exceeds timer range; waiting without timeout"
            );
            None
        }
        Some(ms) => Some(Duration::from_millis(ms)),
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(d) => tokio::time::sleep_until(d).await,
        None => std::future::pending::<()>().await,
    }
}

/// Handle kept locally when the task is not in the registry.
struct HandleSlot<'a> {
    registry: &'a TaskRegistry,
    task_id: &'a str,
    local: Option<Box<dyn RunningTask>>,
}

impl HandleSlot<'_> {
    fn dispose(&mut self) {
        if let Some(mut h) = self.local.take() {
            h.dispose();
        } else {
            self.registry.dispose(self.task_id);
        }
    }

    fn finish(&mut self) {
        self.local = None;
        self.registry.clear_handle(self.task_id);
    }
}

#[tracing::instrument(
    name = "invocation.run",
    skip(provider, registry, bus, request),
    fields(task_id = %request.task_id, provider = provider.name())
)]
pub async fn run_with_bounded_wait(
    provider: &dyn AgentProvider,
    registry: &TaskRegistry,
    bus: &EventBus,
    request: AgentRequest,
    timeout_ms: Option<u64>,
) -> Result<InvocationOutcome, RunnerError> {
    let task_id = request.task_id.clone();
    let timeout = effective_timeout(timeout_ms);
    // Armed before the provider starts so spawn time counts against the budget.
    let deadline = timeout.map(|d| Instant::now() + d);

    let (tx, mut rx) = mpsc::unbounded_channel::<TaskEvent>();
    let handle = provider.run(request, tx).await.map_err(|e| {
        if e.downcast_ref::<std::io::Error>().is_some() {
            RunnerError::Spawn(format!("{e:#}"))
        } else {
            RunnerError::Plugin(e)
        }
    })?;

    let mut slot = HandleSlot {
        registry,
        task_id: &task_id,
        local: registry.update_handle(&task_id, handle).err(),
    };

    let transcript = RingBytes::new(TRANSCRIPT_CAPTURE_BYTES);
    let timer = sleep_until_deadline(deadline);
    tokio::pin!(timer);

    let (exit_code, timed_out) = loop {
        tokio::select! {
            biased;
            ev = rx.recv() => {
                let Some(ev) = ev else {
                    tracing::warn!(task_id = %task_id, "provider closed its event stream without completing");
                    break (None, false);
                };
                let completed = match &ev.kind {
                    TaskEventKind::Completed { exit_code } => Some(*exit_code),
                    TaskEventKind::Log { level: LogLevel::Info, message } => {
                        transcript.push_line(message);
                        None
                    }
                    TaskEventKind::Started { .. }
                    | TaskEventKind::Log { .. }
                    | TaskEventKind::FileWrite { .. }
                    | TaskEventKind::Phase { .. } => None,
                };
                bus.emit(ev);
                if let Some(code) = completed {
                    break (code, false);
                }
            }
            _ = &mut timer => {
                let ms = timeout.map(|d| d.as_millis()).unwrap_or_default();
                tracing::error!(task_id = %task_id, timeout_ms = %ms, "agent invocation timed out");
                slot.dispose();
                bus.emit(TaskEvent::log(
                    &task_id,
                    LogLevel::Error,
                    format!("agent invocation timed out after {ms} ms"),
                ));
                break (None, true);
            }
        }
    };

    slot.finish();
    if transcript.dropped() > 0 {
        tracing::debug!(task_id = %task_id, dropped = transcript.dropped(), "transcript head evicted");
    }

    Ok(InvocationOutcome {
        exit_code,
        timed_out,
        transcript: transcript.to_string_lossy(),
    })
}
