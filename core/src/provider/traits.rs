use std::path::Path;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::events::TaskEvent;

use super::types::{AgentRequest, CommandOutput};

/// Exclusively-owned reference to one in-flight invocation.
pub trait RunningTask: Send {
    /// Best-effort early termination. Must be safe to call more than once.
    fn dispose(&mut self);
}

/// Streams an agent process's events back to the caller.
///
/// Implementations emit exactly one `completed` event per successful `run`,
/// after every other event of that invocation.
#[async_trait]
pub trait AgentProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn run(
        &self,
        request: AgentRequest,
        events: mpsc::UnboundedSender<TaskEvent>,
    ) -> anyhow::Result<Box<dyn RunningTask>>;
}

/// Runs a command to completion as a direct child process.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    fn name(&self) -> &str;

    async fn execute(&self, command: &str, cwd: &Path) -> anyhow::Result<CommandOutput>;
}
