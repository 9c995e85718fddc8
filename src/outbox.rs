//! Outbound message writer: drops chat submissions into the agent's
//! filesystem queue, one whole file per message.

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::store::Database;

/// Suffix identifying the dashboard as the origin of a queued file.
const FILE_SUFFIX: &str = "dashboard.json";

#[derive(Debug, Error)]
pub enum OutboxError {
    #[error("channel '{0}' is not registered")]
    ChannelUnresolved(String),
    #[error("channel lookup failed: {0}")]
    Lookup(anyhow::Error),
    #[error("failed to write outbound message")]
    WriteFailed(#[source] std::io::Error),
}

/// One-shot envelope consumed (and deleted) by the external agent.
#[derive(Debug, Serialize)]
struct OutboundMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    channel: &'a str,
    text: &'a str,
    source: &'static str,
}

/// Writes submissions into `{queue_dir}/{channel_folder}/input/`.
#[derive(Debug)]
pub struct OutboxWriter {
    db: Database,
    queue_dir: PathBuf,
    seq: AtomicU64,
}

impl OutboxWriter {
    pub fn new(db: Database, queue_dir: PathBuf) -> Self {
        Self {
            db,
            queue_dir,
            seq: AtomicU64::new(0),
        }
    }

    /// Queue `text` for the logical `channel`.
    ///
    /// The file name embeds wall-clock milliseconds plus a process-wide
    /// sequence number, so two submissions in the same millisecond land in
    /// distinct files. The envelope is written in a single call; a reader
    /// never observes a partial file.
    pub async fn send(&self, channel: &str, text: &str) -> Result<(), OutboxError> {
        let resolved = self
            .db
            .find_channel_by_folder(channel)
            .await
            .map_err(OutboxError::Lookup)?
            .ok_or_else(|| OutboxError::ChannelUnresolved(channel.to_string()))?;

        let input_dir = self.queue_dir.join(&resolved.folder).join("input");
        std::fs::create_dir_all(&input_dir).map_err(OutboxError::WriteFailed)?;

        let envelope = OutboundMessage {
            kind: "message",
            channel: &resolved.id,
            text,
            source: "dashboard",
        };
        let body = serde_json::to_vec_pretty(&envelope)
            .map_err(|err| OutboxError::WriteFailed(err.into()))?;

        let millis = chrono::Utc::now().timestamp_millis();
        // create_new guards against another process racing on the same name.
        loop {
            let seq = self.seq.fetch_add(1, Ordering::Relaxed);
            let path = input_dir.join(format!("{millis}-{seq}-{FILE_SUFFIX}"));
            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(mut file) => {
                    file.write_all(&body).map_err(OutboxError::WriteFailed)?;
                    debug!(path = %path.display(), "queued outbound message");
                    break;
                }
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(OutboxError::WriteFailed(err)),
            }
        }

        info!(channel, preview = %text.chars().take(50).collect::<String>(), "chat message queued");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn writer_with_channel() -> (OutboxWriter, TempDir) {
        let db = Database::in_memory().await.unwrap();
        db.register_channel("chan-1", "Main", "main").await.unwrap();
        let temp = TempDir::new().unwrap();
        let writer = OutboxWriter::new(db, temp.path().to_path_buf());
        (writer, temp)
    }

    #[tokio::test]
    async fn send_writes_one_envelope() {
        let (writer, temp) = writer_with_channel().await;

        writer.send("main", "hello").await.unwrap();

        let input_dir = temp.path().join("main").join("input");
        let files: Vec<_> = std::fs::read_dir(&input_dir).unwrap().collect();
        assert_eq!(files.len(), 1);

        let name = files[0].as_ref().unwrap().file_name();
        assert!(name.to_string_lossy().ends_with("-dashboard.json"));

        let body = std::fs::read_to_string(files[0].as_ref().unwrap().path()).unwrap();
        let envelope: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(envelope["type"], "message");
        assert_eq!(envelope["channel"], "chan-1");
        assert_eq!(envelope["text"], "hello");
        assert_eq!(envelope["source"], "dashboard");
    }

    #[tokio::test]
    async fn same_millisecond_submissions_get_distinct_files() {
        let (writer, temp) = writer_with_channel().await;

        // Back to back sends land well within the same millisecond window
        // often enough that the sequence number is what keeps them apart.
        writer.send("main", "first").await.unwrap();
        writer.send("main", "second").await.unwrap();

        let input_dir = temp.path().join("main").join("input");
        let files: Vec<_> = std::fs::read_dir(&input_dir).unwrap().collect();
        assert_eq!(files.len(), 2);
    }

    #[tokio::test]
    async fn unresolved_channel_fails_without_touching_disk() {
        let db = Database::in_memory().await.unwrap();
        let temp = TempDir::new().unwrap();
        let writer = OutboxWriter::new(db, temp.path().to_path_buf());

        let err = writer.send("ghost", "hello").await.unwrap_err();
        assert!(matches!(err, OutboxError::ChannelUnresolved(_)));

        // No fallback directory may be created for an unresolved channel.
        assert!(!temp.path().join("ghost").exists());
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }
}
