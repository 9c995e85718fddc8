//! Read access to the agent's SQLite store.
//!
//! The external agent process owns this database and writes messages,
//! activity events, and the channel registry into it. The dashboard only
//! reads; the insert helpers below exist for test seeding and tooling.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

/// Schema matching what the agent writer creates. `CREATE IF NOT EXISTS`
/// keeps opening the dashboard before the agent's first run harmless.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS channels (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    folder TEXT UNIQUE NOT NULL
);

CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY,
    channel_id TEXT NOT NULL,
    content TEXT NOT NULL,
    is_bot INTEGER NOT NULL DEFAULT 0,
    agent_name TEXT,
    timestamp TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_messages_channel_ts ON messages(channel_id, timestamp);

CREATE TABLE IF NOT EXISTS activity (
    id TEXT PRIMARY KEY,
    channel_folder TEXT NOT NULL,
    kind TEXT NOT NULL CHECK(kind IN ('message', 'task_run')),
    content TEXT,
    sender_name TEXT,
    task_prompt TEXT,
    status TEXT,
    duration_ms INTEGER,
    timestamp TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_activity_folder_ts ON activity(channel_folder, timestamp);
"#;

/// A registered channel: a physical id (assigned by the transport the agent
/// speaks) plus the folder name used for its filesystem queue.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub folder: String,
}

/// Raw chat message row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MessageRow {
    pub id: String,
    pub channel_id: String,
    pub content: String,
    pub is_bot: bool,
    pub agent_name: Option<String>,
    pub timestamp: String,
}

/// Raw activity row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActivityRow {
    pub id: String,
    pub channel_folder: String,
    pub kind: String,
    pub content: Option<String>,
    pub sender_name: Option<String>,
    pub task_prompt: Option<String>,
    pub status: Option<String>,
    pub duration_ms: Option<i64>,
    pub timestamp: String,
}

/// Connection to the agent store.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    path: PathBuf,
}

impl Database {
    /// Open (or create) the store at the given path.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating store directory: {}", parent.display()))?;
        }

        let database_url = format!("sqlite://{}?mode=rwc", path.display());

        let options = SqliteConnectOptions::from_str(&database_url)
            .context("parsing database URL")?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(3)
            .connect_with(options)
            .await
            .with_context(|| format!("connecting to store: {}", path.display()))?;

        let db = Self {
            pool,
            path: path.to_path_buf(),
        };
        db.initialize_schema().await?;

        Ok(db)
    }

    /// Open an in-memory store (tests).
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .context("parsing in-memory database URL")?;

        // A single connection keeps every query on the same in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("connecting to in-memory store")?;

        let db = Self {
            pool,
            path: PathBuf::from(":memory:"),
        };
        db.initialize_schema().await?;

        Ok(db)
    }

    async fn initialize_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .context("initializing store schema")?;
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get the database file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Check that the store answers queries.
    pub async fn is_healthy(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }

    /// Look up a channel by its queue folder name.
    pub async fn find_channel_by_folder(&self, folder: &str) -> Result<Option<Channel>> {
        sqlx::query_as::<_, Channel>("SELECT id, name, folder FROM channels WHERE folder = ?")
            .bind(folder)
            .fetch_optional(&self.pool)
            .await
            .context("looking up channel")
    }

    /// Latest messages for a channel, newest-first.
    pub async fn recent_messages(&self, channel_id: &str, limit: i64) -> Result<Vec<MessageRow>> {
        sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, channel_id, content, is_bot, agent_name, timestamp
            FROM messages
            WHERE channel_id = ?
            ORDER BY timestamp DESC
            LIMIT ?
            "#,
        )
        .bind(channel_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("fetching recent messages")
    }

    /// Latest activity for a channel folder, newest-first.
    pub async fn recent_activity(&self, folder: &str, limit: i64) -> Result<Vec<ActivityRow>> {
        sqlx::query_as::<_, ActivityRow>(
            r#"
            SELECT id, channel_folder, kind, content, sender_name, task_prompt,
                   status, duration_ms, timestamp
            FROM activity
            WHERE channel_folder = ?
            ORDER BY timestamp DESC
            LIMIT ?
            "#,
        )
        .bind(folder)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("fetching recent activity")
    }

    /// Register a channel. Used by tests and setup tooling.
    pub async fn register_channel(&self, id: &str, name: &str, folder: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO channels (id, name, folder) VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET name = excluded.name, folder = excluded.folder
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(folder)
        .execute(&self.pool)
        .await
        .context("registering channel")?;
        Ok(())
    }

    /// Insert a chat message. Used by tests and setup tooling.
    pub async fn insert_message(&self, row: &MessageRow) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO messages (id, channel_id, content, is_bot, agent_name, timestamp)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.id)
        .bind(&row.channel_id)
        .bind(&row.content)
        .bind(row.is_bot)
        .bind(&row.agent_name)
        .bind(&row.timestamp)
        .execute(&self.pool)
        .await
        .context("inserting message")?;
        Ok(())
    }

    /// Insert an activity event. Used by tests and setup tooling.
    pub async fn insert_activity(&self, row: &ActivityRow) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO activity (id, channel_folder, kind, content, sender_name,
                                  task_prompt, status, duration_ms, timestamp)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.id)
        .bind(&row.channel_folder)
        .bind(&row.kind)
        .bind(&row.content)
        .bind(&row.sender_name)
        .bind(&row.task_prompt)
        .bind(&row.status)
        .bind(row.duration_ms)
        .bind(&row.timestamp)
        .execute(&self.pool)
        .await
        .context("inserting activity event")?;
        Ok(())
    }
}
