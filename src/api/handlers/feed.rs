//! Record listing and the SSE bridge streams.
//!
//! A stream session performs one bootstrap query, pushes an `initial` frame,
//! then polls on a per-kind interval and pushes `update` frames for records
//! newer than its private high-water mark, or a heartbeat comment when
//! nothing changed. Dropping the connection drops the stream, which cancels
//! the interval; no tick can write after close.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    response::sse::{Event, Sse},
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio_stream::{StreamExt, wrappers::IntervalStream};
use tracing::warn;

use crate::feed::{EPOCH_MARK, POLL_LIMIT, Record, RecordKind, diff};

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FeedParams {
    kind: Option<String>,
    channel: Option<String>,
    limit: Option<i64>,
}

/// One SSE payload frame.
#[derive(Debug, Serialize)]
struct StreamFrame {
    #[serde(rename = "type")]
    frame_type: &'static str,
    items: Vec<Record>,
}

fn parse_kind(kind: Option<&str>) -> Result<RecordKind, ApiError> {
    let raw = kind.ok_or_else(|| ApiError::bad_request("Missing kind parameter"))?;
    RecordKind::parse(raw)
        .ok_or_else(|| ApiError::bad_request(format!("Unknown kind '{raw}'")))
}

/// One-shot record listing, newest-first.
pub async fn list_records(
    State(state): State<AppState>,
    Query(params): Query<FeedParams>,
) -> ApiResult<Json<Vec<Record>>> {
    let kind = parse_kind(params.kind.as_deref())?;
    let channel = params
        .channel
        .unwrap_or_else(|| state.primary_channel.clone());
    let limit = params.limit.unwrap_or(50);

    let records = state.feed.recent(kind, &channel, limit).await;
    Ok(Json(records))
}

/// Long-lived SSE bridge stream for one record kind.
pub async fn stream_records(
    State(state): State<AppState>,
    Query(params): Query<FeedParams>,
) -> ApiResult<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>> {
    let kind = parse_kind(params.kind.as_deref())?;
    let channel = params
        .channel
        .unwrap_or_else(|| state.primary_channel.clone());

    // OPEN: bootstrap send, always emitted even when empty.
    let bootstrap = state
        .feed
        .recent(kind, &channel, kind.bootstrap_limit())
        .await;
    let mark = bootstrap
        .iter()
        .map(|record| record.timestamp().to_string())
        .max()
        .unwrap_or_else(|| EPOCH_MARK.to_string());
    let initial = frame_event("initial", kind, bootstrap);

    // POLLING: the mark is private to this session; two viewers of the same
    // channel each derive their own deltas.
    let mark = Arc::new(Mutex::new(mark));
    let feed = state.feed.clone();
    let period = kind.poll_interval();
    let interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

    let updates = IntervalStream::new(interval).then(move |_| {
        let feed = feed.clone();
        let channel = channel.clone();
        let mark = mark.clone();
        async move {
            let batch = feed.recent(kind, &channel, POLL_LIMIT).await;
            let mut mark_guard = mark.lock().await;
            let (new_items, new_mark) = diff(&mark_guard, batch);
            if new_items.is_empty() {
                Ok(Event::default().comment("heartbeat"))
            } else {
                *mark_guard = new_mark;
                Ok(frame_event("update", kind, new_items))
            }
        }
    });

    let stream = tokio_stream::once(Ok::<Event, Infallible>(initial)).chain(updates);
    Ok(Sse::new(stream))
}

/// Build one `data:` frame. Chat items are displayed oldest-first, so the
/// newest-first batch is reversed at this edge; activity stays newest-first.
fn frame_event(frame_type: &'static str, kind: RecordKind, mut items: Vec<Record>) -> Event {
    if kind == RecordKind::Chat {
        items.reverse();
    }
    let frame = StreamFrame { frame_type, items };
    match serde_json::to_string(&frame) {
        Ok(data) => Event::default().data(data),
        Err(err) => {
            warn!(?err, "failed to serialize stream frame");
            Event::default().data(r#"{"error":"frame_serialization_failed"}"#)
        }
    }
}
