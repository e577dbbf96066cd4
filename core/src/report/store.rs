use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Local};

use crate::config::ReportsConfig;

use super::naming::{artifact_file_name, find_latest_artifact};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Perspective,
    Execution,
}

impl ReportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Perspective => "perspective",
            Self::Execution => "execution",
        }
    }
}

/// Persists rendered reports.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn save(
        &self,
        kind: ReportKind,
        at: DateTime<Local>,
        markdown: &str,
    ) -> std::io::Result<PathBuf>;

    async fn latest(&self, kind: ReportKind) -> std::io::Result<Option<PathBuf>>;
}

/// Timestamped markdown files under one directory.
#[derive(Debug, Clone)]
pub struct FsReportStore {
    dir: PathBuf,
    perspective_prefix: String,
    execution_prefix: String,
}

impl FsReportStore {
    pub fn new(dir: impl Into<PathBuf>, perspective_prefix: &str, execution_prefix: &str) -> Self {
        Self {
            dir: dir.into(),
            perspective_prefix: perspective_prefix.to_string(),
            execution_prefix: execution_prefix.to_string(),
        }
    }

    pub fn from_config(workspace_root: &Path, cfg: &ReportsConfig) -> Self {
        Self::new(
            workspace_root.join(&cfg.directory),
            &cfg.perspective_prefix,
            &cfg.execution_prefix,
        )
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn prefix(&self, kind: ReportKind) -> &str {
        match kind {
            ReportKind::Perspective => &self.perspective_prefix,
            ReportKind::Execution => &self.execution_prefix,
        }
    }
}

#[async_trait]
impl ReportStore for FsReportStore {
    async fn save(
        &self,
        kind: ReportKind,
        at: DateTime<Local>,
        markdown: &str,
    ) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(artifact_file_name(self.prefix(kind), &at));
        tokio::fs::write(&path, markdown).await?;
        tracing::info!(kind = kind.as_str(), path = %path.display(), "report saved");
        Ok(path)
    }

    async fn latest(&self, kind: ReportKind) -> std::io::Result<Option<PathBuf>> {
        find_latest_artifact(&self.dir, self.prefix(kind)).await
    }
}
