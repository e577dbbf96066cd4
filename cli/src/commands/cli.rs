use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerArg {
    Local,
    Agent,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportArg {
    Perspective,
    Execution,
}

#[derive(Parser, Debug)]
#[command(name = "testgen", version, about = "Agent-driven test generation")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file to use instead of the default lookup.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Append every task event as one JSON line to this file.
    #[arg(long, global = true)]
    pub events_out: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate perspectives and tests, then run the tests.
    Generate(GenerateArgs),
    /// Run only the test-execution phase and write a report.
    RunTests(RunTestsArgs),
    /// Print the path of the most recent report.
    Latest(LatestArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct WorkspaceArgs {
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ExecArgs {
    /// Test command; an empty string skips execution.
    #[arg(long)]
    pub test_command: Option<String>,

    #[arg(long, value_enum)]
    pub runner: Option<RunnerArg>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct GenerateArgs {
    /// Files or directories to cover.
    pub targets: Vec<String>,

    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    #[arg(long)]
    pub no_perspective: bool,

    #[command(flatten)]
    pub exec: ExecArgs,

    #[arg(long)]
    pub model: Option<String>,

    /// Agent binary (cursor-agent, claude, codex, gemini or a path).
    #[arg(long)]
    pub agent: Option<String>,

    /// Bounded wait for the generation invocation; 0 disables it.
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Extra instruction appended to the prompts.
    #[arg(long)]
    pub instruction: Option<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunTestsArgs {
    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    #[command(flatten)]
    pub exec: ExecArgs,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct LatestArgs {
    #[arg(value_enum)]
    pub kind: ReportArg,

    #[command(flatten)]
    pub workspace: WorkspaceArgs,
}
