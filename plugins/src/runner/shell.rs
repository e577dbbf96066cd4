use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Instant;

use anyhow::Context;
use async_trait::async_trait;
use tokio::process::Command;

use testgen_core::provider::{CommandOutput, CommandRunner};

/// Runs the test command through the platform shell as a direct child.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellCommandRunner;

impl ShellCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

fn shell_command(command: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command);
        c
    }
}

#[cfg(unix)]
fn signal_name(status: &ExitStatus) -> Option<String> {
    use std::os::unix::process::ExitStatusExt;

    let sig = status.signal()?;
    let name = match sig {
        1 => "SIGHUP",
        2 => "SIGINT",
        3 => "SIGQUIT",
        6 => "SIGABRT",
        9 => "SIGKILL",
        11 => "SIGSEGV",
        13 => "SIGPIPE",
        14 => "SIGALRM",
        15 => "SIGTERM",
        other => return Some(format!("SIG{other}")),
    };
    Some(name.to_string())
}

#[cfg(not(unix))]
fn signal_name(_status: &ExitStatus) -> Option<String> {
    None
}

#[async_trait]
impl CommandRunner for ShellCommandRunner {
    fn name(&self) -> &str {
        "shell"
    }

    async fn execute(&self, command: &str, cwd: &Path) -> anyhow::Result<CommandOutput> {
        let started = Instant::now();
        let output = shell_command(command)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("failed to spawn `{command}` in {}", cwd.display()))?;
        let duration_ms = started.elapsed().as_millis() as u64;

        let result = CommandOutput {
            exit_code: output.status.code(),
            signal: signal_name(&output.status),
            duration_ms,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        tracing::info!(
            command,
            exit_code = ?result.exit_code,
            signal = ?result.signal,
            duration_ms,
            stdout_bytes = output.stdout.len(),
            stderr_bytes = output.stderr.len(),
            "command finished"
        );
        Ok(result)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_streams_and_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let out = ShellCommandRunner::new()
            .execute("echo out; echo err >&2; exit 4", dir.path())
            .await
            .unwrap();
        assert_eq!(out.exit_code, Some(4));
        assert_eq!(out.signal, None);
        assert_eq!(out.stdout, "out\n");
        assert_eq!(out.stderr, "err\n");
    }

    #[tokio::test]
    async fn runs_in_the_given_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "x").unwrap();
        let out = ShellCommandRunner::new()
            .execute("ls", dir.path())
            .await
            .unwrap();
        assert!(out.stdout.contains("marker.txt"));
    }

    #[tokio::test]
    async fn reports_the_terminating_signal() {
        let dir = tempfile::tempdir().unwrap();
        let out = ShellCommandRunner::new()
            .execute("kill -9 $$", dir.path())
            .await
            .unwrap();
        assert_eq!(out.exit_code, None);
        assert_eq!(out.signal.as_deref(), Some("SIGKILL"));
    }

    #[tokio::test]
    async fn missing_directory_is_a_spawn_error() {
        let err = ShellCommandRunner::new()
            .execute("true", Path::new("/nonexistent/testgen-dir"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to spawn"));
    }
}
