mod shell;

pub use shell::ShellCommandRunner;
