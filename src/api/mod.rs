//! HTTP API module.
//!
//! Provides the dashboard's JSON endpoints and the SSE bridge streams.

mod error;
pub mod handlers;
mod routes;
mod state;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use routes::create_router;
pub use state::AppState;
