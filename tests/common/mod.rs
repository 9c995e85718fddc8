//! Test utilities and common setup.

use std::sync::Arc;

use axum::Router;
use tempfile::TempDir;

use pulseboard::api::{self, AppState};
use pulseboard::feed::FeedService;
use pulseboard::outbox::OutboxWriter;
use pulseboard::store::{ActivityRow, Database, MessageRow};

pub const PRIMARY_CHANNEL: &str = "main";
pub const CHANNEL_ID: &str = "chan-1";

/// A router wired to an in-memory store and a throwaway queue directory.
pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub queue: TempDir,
}

/// Create a test application with the primary channel registered.
pub async fn test_app() -> TestApp {
    let app = test_app_without_channel().await;
    app.db
        .register_channel(CHANNEL_ID, "Main", PRIMARY_CHANNEL)
        .await
        .unwrap();
    app
}

/// Create a test application with an empty channel registry.
pub async fn test_app_without_channel() -> TestApp {
    let db = Database::in_memory().await.unwrap();
    let queue = TempDir::new().unwrap();

    let feed = FeedService::new(db.clone());
    let outbox = Arc::new(OutboxWriter::new(db.clone(), queue.path().to_path_buf()));
    let state = AppState::new(feed, outbox, PRIMARY_CHANNEL.to_string());

    TestApp {
        app: api::create_router(state),
        db,
        queue,
    }
}

pub fn message_row(id: &str, content: &str, is_bot: bool, timestamp: &str) -> MessageRow {
    MessageRow {
        id: id.to_string(),
        channel_id: CHANNEL_ID.to_string(),
        content: content.to_string(),
        is_bot,
        agent_name: is_bot.then(|| "Agent".to_string()),
        timestamp: timestamp.to_string(),
    }
}

pub fn activity_row(id: &str, kind: &str, timestamp: &str) -> ActivityRow {
    ActivityRow {
        id: id.to_string(),
        channel_folder: PRIMARY_CHANNEL.to_string(),
        kind: kind.to_string(),
        content: (kind == "message").then(|| format!("activity {id}")),
        sender_name: (kind == "message").then(|| "Main".to_string()),
        task_prompt: (kind == "task_run").then(|| "run the thing".to_string()),
        status: (kind == "task_run").then(|| "success".to_string()),
        duration_ms: (kind == "task_run").then_some(1200),
        timestamp: timestamp.to_string(),
    }
}
