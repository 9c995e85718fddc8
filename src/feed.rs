//! The polling bridge core: record model, query adapter, and change detector.
//!
//! Records carry RFC 3339 timestamps in a fixed format, so "newer than" is
//! plain lexical string comparison. Nothing in this module may reformat a
//! timestamp.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::store::{ActivityRow, Database, MessageRow};

/// High-water mark used before any record has been seen.
pub const EPOCH_MARK: &str = "1970-01-01T00:00:00.000Z";

/// Poll query size once a stream is past its bootstrap send.
pub const POLL_LIMIT: i64 = 10;

/// The two record kinds the dashboard displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Chat,
    Activity,
}

impl RecordKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "chat" => Some(Self::Chat),
            "activity" => Some(Self::Activity),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Activity => "activity",
        }
    }

    /// Wall-clock poll interval for a stream of this kind.
    pub fn poll_interval(self) -> Duration {
        match self {
            Self::Chat => Duration::from_secs(1),
            Self::Activity => Duration::from_secs(2),
        }
    }

    /// Query size for the initial full send.
    pub fn bootstrap_limit(self) -> i64 {
        match self {
            Self::Chat => 50,
            Self::Activity => 20,
        }
    }
}

/// Who sent a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Agent,
}

/// A chat message as the dashboard displays it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub sender: Sender,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    pub timestamp: String,
}

/// Activity event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Message,
    TaskRun,
}

/// An activity feed event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    pub timestamp: String,
}

/// A timestamped domain item, either kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Record {
    Chat(ChatMessage),
    Activity(ActivityEvent),
}

impl Record {
    pub fn id(&self) -> &str {
        match self {
            Self::Chat(m) => &m.id,
            Self::Activity(a) => &a.id,
        }
    }

    pub fn timestamp(&self) -> &str {
        match self {
            Self::Chat(m) => &m.timestamp,
            Self::Activity(a) => &a.timestamp,
        }
    }
}

impl From<MessageRow> for Record {
    fn from(row: MessageRow) -> Self {
        let sender = if row.is_bot {
            Sender::Agent
        } else {
            Sender::User
        };
        Self::Chat(ChatMessage {
            id: row.id,
            text: row.content,
            sender,
            agent_name: if row.is_bot { row.agent_name } else { None },
            timestamp: row.timestamp,
        })
    }
}

impl From<ActivityRow> for Record {
    fn from(row: ActivityRow) -> Self {
        let kind = match row.kind.as_str() {
            "task_run" => ActivityKind::TaskRun,
            _ => ActivityKind::Message,
        };
        Self::Activity(ActivityEvent {
            id: row.id,
            kind,
            content: row.content,
            sender_name: row.sender_name,
            task_prompt: row.task_prompt,
            status: row.status,
            duration_ms: row.duration_ms,
            timestamp: row.timestamp,
        })
    }
}

/// Compute the records strictly newer than `mark` and the advanced mark.
///
/// New items keep their batch order; the returned mark is the maximum
/// timestamp seen, or `mark` unchanged when the batch holds nothing newer.
pub fn diff(mark: &str, batch: Vec<Record>) -> (Vec<Record>, String) {
    let mut new_mark = mark.to_string();
    let mut new_items = Vec::new();

    for record in batch {
        if record.timestamp() > mark {
            if record.timestamp() > new_mark.as_str() {
                new_mark = record.timestamp().to_string();
            }
            new_items.push(record);
        }
    }

    (new_items, new_mark)
}

/// Read-only query adapter over the agent store.
///
/// Every query is a pure function of (kind, channel, limit). A store failure
/// degrades to an empty batch: the dashboard deliberately cannot tell "no
/// data" from "store down" on read paths.
#[derive(Debug, Clone)]
pub struct FeedService {
    db: Database,
}

impl FeedService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Latest records of `kind` for the logical `channel`, newest-first.
    ///
    /// An unknown channel or a store error both return an empty batch.
    pub async fn recent(&self, kind: RecordKind, channel: &str, limit: i64) -> Vec<Record> {
        match self.try_recent(kind, channel, limit).await {
            Ok(records) => records,
            Err(err) => {
                error!(kind = kind.as_str(), channel, ?err, "store query failed");
                Vec::new()
            }
        }
    }

    async fn try_recent(
        &self,
        kind: RecordKind,
        channel: &str,
        limit: i64,
    ) -> anyhow::Result<Vec<Record>> {
        match kind {
            RecordKind::Chat => {
                let Some(resolved) = self.db.find_channel_by_folder(channel).await? else {
                    return Ok(Vec::new());
                };
                let rows = self.db.recent_messages(&resolved.id, limit).await?;
                Ok(rows.into_iter().map(Record::from).collect())
            }
            RecordKind::Activity => {
                let rows = self.db.recent_activity(channel, limit).await?;
                Ok(rows.into_iter().map(Record::from).collect())
            }
        }
    }
}
