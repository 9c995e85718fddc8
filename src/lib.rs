//! Pulseboard library: the JSON/SSE bridge between an agent's message store
//! and a local browser dashboard.

pub mod api;
pub mod feed;
pub mod outbox;
pub mod server;
pub mod store;
