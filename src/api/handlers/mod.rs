//! API request handlers, organized by domain:
//! - `feed`: one-shot record listing and the SSE bridge streams
//! - `chat`: chat submission into the outbound queue
//! - `misc`: health check

mod chat;
mod feed;
mod misc;

pub use chat::submit_message;
pub use feed::{list_records, stream_records};
pub use misc::health;
