//! Concrete adapters for the two collaborator contracts of `testgen-core`:
//! a process-spawning agent provider and a shell-backed command runner.

pub mod provider;
pub mod runner;

pub use provider::CodeCliProvider;
pub use runner::ShellCommandRunner;
