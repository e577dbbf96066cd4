//! Per-agent command line for one non-interactive invocation.

use std::path::Path;

use testgen_core::provider::AgentRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    CursorAgent,
    Claude,
    Codex,
    Gemini,
    Generic,
}

impl AgentKind {
    /// Detected from the executable's file stem, so absolute paths and
    /// `.cmd`/`.exe` shims resolve the same way.
    pub fn detect(agent_command: &str) -> Self {
        let stem = Path::new(agent_command.trim())
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(agent_command)
            .to_ascii_lowercase();
        if stem.contains("cursor-agent") || stem == "cursor" {
            Self::CursorAgent
        } else if stem.contains("claude") {
            Self::Claude
        } else if stem.contains("codex") {
            Self::Codex
        } else if stem.contains("gemini") {
            Self::Gemini
        } else {
            Self::Generic
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CursorAgent => "cursor-agent",
            Self::Claude => "claude",
            Self::Codex => "codex",
            Self::Gemini => "gemini",
            Self::Generic => "generic",
        }
    }
}

fn model_of(request: &AgentRequest) -> Option<&str> {
    request
        .model
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
}

pub fn build_args(kind: AgentKind, request: &AgentRequest) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    let format = request.output_format.as_str();

    match kind {
        AgentKind::CursorAgent => {
            args.push("-p".into());
            args.push("--output-format".into());
            args.push(format.into());
            if let Some(m) = model_of(request) {
                args.push("--model".into());
                args.push(m.into());
            }
            if request.allow_write {
                args.push("--force".into());
            }
            args.push(request.prompt.clone());
        }
        AgentKind::Claude => {
            // Prompt goes last; flags after a positional prompt can drop the
            // CLI back into interactive mode.
            args.push("-p".into());
            args.push("--output-format".into());
            args.push(format.into());
            args.push("--verbose".into());
            if let Some(m) = model_of(request) {
                args.push("--model".into());
                args.push(m.into());
            }
            if request.allow_write {
                args.push("--dangerously-skip-permissions".into());
            } else {
                args.push("--permission-mode".into());
                args.push("plan".into());
            }
            args.push(request.prompt.clone());
        }
        AgentKind::Codex => {
            args.push("exec".into());
            args.push("--skip-git-repo-check".into());
            args.push("--json".into());
            if let Some(m) = model_of(request) {
                args.push("--model".into());
                args.push(m.into());
            }
            args.push("--sandbox".into());
            args.push(if request.allow_write { "workspace-write" } else { "read-only" }.into());
            args.push("--cd".into());
            args.push(request.workspace_root.display().to_string());
            args.push(request.prompt.clone());
        }
        AgentKind::Gemini => {
            args.push("-p".into());
            args.push(request.prompt.clone());
            args.push("-o".into());
            args.push(format.into());
            if let Some(m) = model_of(request) {
                args.push("-m".into());
                args.push(m.into());
            }
            if request.allow_write {
                args.push("-y".into());
            }
        }
        AgentKind::Generic => {
            if let Some(m) = model_of(request) {
                args.push("--model".into());
                args.push(m.into());
            }
            args.push(request.prompt.clone());
        }
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use testgen_core::provider::OutputFormat;

    fn request(allow_write: bool, model: Option<&str>) -> AgentRequest {
        AgentRequest {
            task_id: "t".into(),
            workspace_root: PathBuf::from("/w"),
            agent_command: "x".into(),
            prompt: "write tests".into(),
            model: model.map(str::to_string),
            output_format: OutputFormat::StreamJson,
            allow_write,
        }
    }

    #[test]
    fn detects_agents_from_paths_and_shims() {
        assert_eq!(AgentKind::detect("cursor-agent"), AgentKind::CursorAgent);
        assert_eq!(AgentKind::detect("/usr/local/bin/claude"), AgentKind::Claude);
        assert_eq!(AgentKind::detect("C:\\npm\\codex.cmd"), AgentKind::Codex);
        assert_eq!(AgentKind::detect("gemini"), AgentKind::Gemini);
        assert_eq!(AgentKind::detect("my-agent"), AgentKind::Generic);
    }

    #[test]
    fn cursor_agent_gets_force_only_when_writing() {
        let w = build_args(AgentKind::CursorAgent, &request(true, Some("gpt-5")));
        assert_eq!(
            w,
            vec!["-p", "--output-format", "stream-json", "--model", "gpt-5", "--force", "write tests"]
        );
        let r = build_args(AgentKind::CursorAgent, &request(false, None));
        assert!(!r.contains(&"--force".to_string()));
        assert_eq!(r.last().map(String::as_str), Some("write tests"));
    }

    #[test]
    fn claude_read_only_uses_plan_mode() {
        let args = build_args(AgentKind::Claude, &request(false, Some("  ")));
        assert!(args.windows(2).any(|w| w == ["--permission-mode", "plan"]));
        assert!(!args.contains(&"--model".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("write tests"));
    }

    #[test]
    fn codex_sandbox_follows_write_permission() {
        let args = build_args(AgentKind::Codex, &request(false, None));
        assert!(args.windows(2).any(|w| w == ["--sandbox", "read-only"]));
        assert!(args.windows(2).any(|w| w == ["--cd", "/w"]));
        let args = build_args(AgentKind::Codex, &request(true, None));
        assert!(args.windows(2).any(|w| w == ["--sandbox", "workspace-write"]));
    }

    #[test]
    fn gemini_takes_prompt_flag() {
        let args = build_args(AgentKind::Gemini, &request(true, Some("pro")));
        assert_eq!(args, vec!["-p", "write tests", "-o", "stream-json", "-m", "pro", "-y"]);
    }
}
