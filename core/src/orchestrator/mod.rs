//! Task orchestration: phase sequencing, cancellation checkpoints and the
//! runner fallback protocol for test execution.

mod advisory;
mod cleanup;
mod execution;
mod notify;
mod pipeline;
mod prompts;
mod rejection;
mod types;

pub use advisory::check_nested_host;
pub use cleanup::sweep_duplicate_tables;
pub use notify::{Notifier, TracingNotifier};
pub use pipeline::{perspective_task_id, TaskOrchestrator};
pub use prompts::{
    agent_execution_prompt, generation_prompt, perspective_prompt, scope_restriction,
    PERSPECTIVES_BEGIN, PERSPECTIVES_END,
};
pub use rejection::{detect_rejection, Rejection};
pub use types::{
    ExecutionOutcome, GenerationOutcome, GenerationRequest, Phase, PerspectiveOutcome,
};
