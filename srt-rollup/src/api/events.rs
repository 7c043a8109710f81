//! Server-Sent Events stream of score and sync changes

use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

use crate::AppState;

/// GET /events
///
/// Streams every SrtEvent (EditStaged, FlushSucceeded, ...). Clients
/// re-read the views they display on any event.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    srt_common::sse::event_bus_sse_stream("srt-rollup", state.assessment.events())
}
