//! Core of the test-generation pipeline: task registry, event model, agent
//! invocation under a bounded wait, structured output extraction, result
//! aggregation, reports and the phase orchestrator.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod events;
pub mod extract;
pub mod invocation;
pub mod orchestrator;
pub mod provider;
pub mod registry;
pub mod report;
pub mod results;
pub mod testoutput;
pub mod util;

pub use config::AppConfig;
pub use error::{CliError, ExtractError, RunnerError};
pub use events::{EventBus, LogLevel, TaskEvent, TaskEventKind};
pub use orchestrator::{GenerationRequest, TaskOrchestrator};
pub use provider::{AgentProvider, AgentRequest, CommandOutput, CommandRunner, RunningTask};
pub use registry::{TaskGuard, TaskRegistry};
