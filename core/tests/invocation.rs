mod common;

use std::sync::Arc;

use testgen_core::error::RunnerError;
use testgen_core::events::{EventBus, LogLevel, TaskEventKind};
use testgen_core::invocation::{run_with_bounded_wait, MAX_TIMER_MS};
use testgen_core::provider::{AgentRequest, OutputFormat};
use testgen_core::registry::TaskRegistry;

use common::{drain, Reply, ScriptedProvider};

fn request(task_id: &str) -> AgentRequest {
    AgentRequest {
        task_id: task_id.into(),
        workspace_root: std::env::temp_dir(),
        agent_command: "cursor-agent".into(),
        prompt: "hi".into(),
        model: None,
        output_format: OutputFormat::StreamJson,
        allow_write: false,
    }
}

#[tokio::test(start_paused = true)]
async fn timeout_at_the_clamp_boundary_fires_once_with_null_exit() {
    let registry = TaskRegistry::new();
    let bus = EventBus::new();
    let mut rx = bus.subscribe();
    let provider = ScriptedProvider::new(vec![Reply::Hang]);
    let _guard = registry.register("t", "t");

    let started = tokio::time::Instant::now();
    let outcome = run_with_bounded_wait(&provider, &registry, &bus, request("t"), Some(MAX_TIMER_MS))
        .await
        .unwrap();

    assert!(started.elapsed().as_millis() >= u128::from(MAX_TIMER_MS));
    assert_eq!(outcome.exit_code, None);
    assert!(outcome.timed_out);
    assert_eq!(provider.dispose_count(), 1);

    let errors = drain(&mut rx)
        .into_iter()
        .filter(|e| matches!(e.kind, TaskEventKind::Log { level: LogLevel::Error, .. }))
        .count();
    assert_eq!(errors, 1);
}

#[tokio::test(start_paused = true)]
async fn completion_wins_over_a_pending_timeout() {
    let registry = TaskRegistry::new();
    let bus = Arc::new(EventBus::new());
    let provider = ScriptedProvider::new(vec![Reply::text("line one\nline two", Some(3))]);

    let outcome = run_with_bounded_wait(&provider, &registry, &bus, request("t"), Some(1_000))
        .await
        .unwrap();

    assert_eq!(outcome.exit_code, Some(3));
    assert!(!outcome.timed_out);
    assert_eq!(outcome.transcript, "line one\nline two\n");
    assert_eq!(provider.dispose_count(), 0);
}

#[tokio::test]
async fn closed_stream_without_completion_resolves_with_null_exit() {
    let registry = TaskRegistry::new();
    let bus = EventBus::new();
    let provider = ScriptedProvider::new(vec![Reply::CloseWithoutCompleting]);

    let outcome = run_with_bounded_wait(&provider, &registry, &bus, request("t"), None)
        .await
        .unwrap();

    assert_eq!(outcome.exit_code, None);
    assert!(!outcome.timed_out);
}

#[tokio::test]
async fn start_failure_surfaces_as_plugin_error() {
    let registry = TaskRegistry::new();
    let bus = EventBus::new();
    let provider = ScriptedProvider::new(vec![Reply::FailToStart("boom".into())]);

    let err = run_with_bounded_wait(&provider, &registry, &bus, request("t"), None)
        .await
        .unwrap_err();

    assert!(matches!(err, RunnerError::Plugin(_)));
}

#[tokio::test]
async fn handle_is_cleared_after_completion() {
    let registry = TaskRegistry::new();
    let bus = EventBus::new();
    let provider = ScriptedProvider::new(vec![Reply::text("ok", Some(0))]);
    let _guard = registry.register("t", "t");

    run_with_bounded_wait(&provider, &registry, &bus, request("t"), None)
        .await
        .unwrap();

    // Nothing left to dispose.
    assert!(!registry.dispose("t"));
}
