//! Shared application state for API handlers.

use std::sync::Arc;

use crate::feed::FeedService;
use crate::outbox::OutboxWriter;

/// State handed to every handler. Cheap to clone; per-connection stream
/// state (the high-water mark) never lives here.
#[derive(Clone)]
pub struct AppState {
    pub feed: FeedService,
    pub outbox: Arc<OutboxWriter>,
    /// Logical name of the conversation the dashboard fronts.
    pub primary_channel: String,
}

impl AppState {
    pub fn new(feed: FeedService, outbox: Arc<OutboxWriter>, primary_channel: String) -> Self {
        Self {
            feed,
            outbox,
            primary_channel,
        }
    }
}
