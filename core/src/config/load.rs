use std::path::{Path, PathBuf};

use super::types::AppConfig;

/// Get the default testgen data directory: ~/.testgen
pub fn get_testgen_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".testgen"))
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: ~/.testgen/config.toml
    let data_dir = get_testgen_data_dir()?;
    let user_config = data_dir.join("config.toml");

    // Priority 2: ./testgen.toml (current directory)
    let local_config = Path::new("testgen.toml");

    let mut cfg = if user_config.exists() {
        load_from_path(&user_config)?
    } else if local_config.exists() {
        load_from_path(local_config)?
    } else {
        AppConfig::default()
    };

    if cfg
        .logging
        .directory
        .as_deref()
        .map(|s| s.trim().is_empty())
        .unwrap_or(true)
    {
        cfg.logging.directory = Some(data_dir.join("logs").to_string_lossy().to_string());
    }

    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok());
    Ok(cfg)
}

pub fn load_from_path(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)?;
    let cfg = toml::from_str::<AppConfig>(&s)
        .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))?;
    Ok(cfg)
}

/// Environment variable overrides (highest priority below CLI flags).
pub fn apply_env_overrides<F>(cfg: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = non_blank("TESTGEN_AGENT_COMMAND") {
        cfg.agent.command = v;
    }
    if let Some(v) = non_blank("TESTGEN_MODEL") {
        cfg.agent.model = Some(v);
    }
    // A blank test command is meaningful (skip execution), so only presence matters here.
    if let Some(v) = lookup("TESTGEN_TEST_COMMAND") {
        cfg.test_execution.command = v;
    }
    if let Some(v) = non_blank("TESTGEN_TEST_RUNNER") {
        match v.parse() {
            Ok(kind) => cfg.test_execution.runner = kind,
            Err(e) => tracing::warn!("ignoring TESTGEN_TEST_RUNNER: {}", e),
        }
    }
}
