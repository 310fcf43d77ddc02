//! On-disk journal: `<name>.json` state snapshot and `<name>.log` event log
//!
//! File names use the lowercased agent name. Both files are observability
//! only; write failures are logged and swallowed.

use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use echonade_types::AgentStateView;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone)]
pub struct AgentJournal {
    state_path: PathBuf,
    log_path: PathBuf,
}

impl AgentJournal {
    pub fn new(dir: impl AsRef<Path>, name: &str) -> Self {
        let dir = dir.as_ref();
        let stem = name.to_lowercase();
        Self {
            state_path: dir.join(format!("{}.json", stem)),
            log_path: dir.join(format!("{}.log", stem)),
        }
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Overwrite the state snapshot
    pub async fn write_state(&self, view: &AgentStateView) {
        let body = match serde_json::to_string_pretty(view) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize agent state");
                return;
            }
        };
        if let Err(e) = self.ensure_dir().await {
            tracing::warn!(path = %self.state_path.display(), error = %e, "failed to create journal dir");
            return;
        }
        if let Err(e) = tokio::fs::write(&self.state_path, body).await {
            tracing::warn!(path = %self.state_path.display(), error = %e, "failed to write agent state");
        }
    }

    /// Append one `<timestamp> - <message>` line to the event log
    pub async fn append(&self, message: &str) {
        let line = format!(
            "{} - {}\n",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            message
        );
        if let Err(e) = self.append_line(&line).await {
            tracing::warn!(path = %self.log_path.display(), error = %e, "failed to append to agent log");
        }
    }

    async fn append_line(&self, line: &str) -> std::io::Result<()> {
        self.ensure_dir().await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }

    async fn ensure_dir(&self) -> std::io::Result<()> {
        match self.state_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => tokio::fs::create_dir_all(parent).await,
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("echonade-journal-{}-{}", tag, std::process::id()))
    }

    #[tokio::test]
    async fn test_append_writes_timestamped_lines() {
        let dir = scratch_dir("append");
        let journal = AgentJournal::new(&dir, "Lemo");

        journal.append("Lemo has responded to the job #1").await;
        journal.append("Lemo has responded to the job #2").await;

        assert!(journal.log_path().ends_with("lemo.log"));
        let log = tokio::fs::read_to_string(journal.log_path()).await.unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with(" - Lemo has responded to the job #2"));

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_unwritable_dir_is_not_fatal() {
        let file = scratch_dir("blocker");
        tokio::fs::write(&file, b"not a directory").await.unwrap();

        // The journal dir is a regular file, so every write fails.
        let journal = AgentJournal::new(&file, "Evo");
        journal.append("ignored").await;
        assert!(!journal.log_path().exists());

        let _ = tokio::fs::remove_file(&file).await;
    }
}
