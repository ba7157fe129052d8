use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::{
    extract::State,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures_core::stream::Stream;
use stockpulse_core::events::RefreshEvent;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};

use crate::main_lib::AppState;

fn event_name(event: &RefreshEvent) -> &'static str {
    match event {
        RefreshEvent::Started { .. } => "refresh:started",
        RefreshEvent::Ready { .. } => "refresh:ready",
        RefreshEvent::Failed { .. } => "refresh:failed",
    }
}

async fn stream_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let receiver = BroadcastStream::new(state.events.subscribe());
    let stream = tokio_stream::StreamExt::filter_map(receiver, |event| match event {
        Ok(evt) => {
            let name = event_name(&evt);
            match SseEvent::default().event(name).json_data(&evt) {
                Ok(sse_event) => Some(Ok(sse_event)),
                Err(err) => {
                    tracing::error!("Failed to serialize SSE payload for {}: {}", name, err);
                    None
                }
            }
        }
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::debug!("SSE subscriber lagged, {} events skipped", skipped);
            None
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/events/stream", get(stream_events))
}
