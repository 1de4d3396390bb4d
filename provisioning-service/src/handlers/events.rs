use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Server-sent stream of provisioning notifications.
///
/// GET /events
pub async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.coordinator.broadcaster().subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => match event.payload() {
            Ok(data) => Some(Ok(Event::default().event(event.name()).data(data))),
            Err(e) => {
                tracing::warn!(event = event.name(), error = %e, "Failed to encode event");
                None
            }
        },
        // Lagged subscriber; missed events are gone.
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
