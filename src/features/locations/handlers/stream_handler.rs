use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};

use super::LocationsState;

/// Long-lived stream of location changes
///
/// Sends a `ping` first, then one `locations:update` frame per mutation.
#[utoipa::path(
    get,
    path = "/api/locations/stream",
    responses(
        (status = 200, description = "SSE stream of location events", body = String, content_type = "text/event-stream")
    ),
    tag = "locations"
)]
pub async fn stream_locations(
    State(state): State<LocationsState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.broadcaster.open();
    tracing::debug!(connection_id = %subscription.id(), "Location stream opened");

    let stream = subscription
        .map(|frame| Ok::<_, Infallible>(Event::default().event(frame.event).data(&*frame.data)));

    Sse::new(stream).keep_alive(KeepAlive::new().interval(state.keep_alive).text("ping"))
}
