mod traits;
mod types;

pub use traits::{AgentProvider, CommandRunner, RunningTask};
pub use types::{AgentRequest, CommandOutput, OutputFormat};
