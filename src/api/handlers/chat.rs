//! Chat submission into the agent's filesystem queue.

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::outbox::OutboxError;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Queue a chat message for the primary channel.
///
/// The browser client already rejects blank input, but the field is
/// re-validated here; the server never trusts the client.
pub async fn submit_message(
    State(state): State<AppState>,
    payload: Result<Json<SubmitRequest>, JsonRejection>,
) -> ApiResult<Json<SubmitResponse>> {
    let Json(request) = payload.map_err(|_| ApiError::bad_request("Invalid JSON body"))?;

    let text = request
        .text
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing text field"))?;

    match state.outbox.send(&state.primary_channel, text).await {
        Ok(()) => Ok(Json(SubmitResponse {
            success: true,
            error: None,
        })),
        Err(err @ OutboxError::ChannelUnresolved(_)) => {
            warn!(channel = %state.primary_channel, "chat submission rejected: {err}");
            Ok(Json(SubmitResponse {
                success: false,
                error: Some(err.to_string()),
            }))
        }
        Err(err) => {
            // Underlying cause stays server-side; the client gets a generic
            // submission failure rather than a crash.
            error!(channel = %state.primary_channel, ?err, "chat submission failed");
            Ok(Json(SubmitResponse {
                success: false,
                error: Some("Failed to send message".to_string()),
            }))
        }
    }
}
