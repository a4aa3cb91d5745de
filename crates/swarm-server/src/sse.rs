//! SSE framing of an agent's event stream.
//!
//! Framing: `event:` carries the event's type, `id:` its log index, and
//! `data:` the full JSON record. With `close_on_done` the stream ends at
//! the first `done` observed; the replay endpoint always passes `false`,
//! so historical `done` events replay without ending the connection.

use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;

use swarm_events::{EventKind, EventRecord, Subscription};

/// Build the SSE response for a subscription.
pub fn event_stream(
    subscription: Subscription,
    close_on_done: bool,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = futures::stream::unfold(Some(subscription), move |state| async move {
        let mut subscription = state?;
        let record = subscription.recv().await?;
        let terminal = record.event.kind == EventKind::Destroyed
            || (close_on_done && record.event.kind == EventKind::Done);
        let next = if terminal { None } else { Some(subscription) };
        Some((Ok(sse_event(&record)), next))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// One event record as an SSE frame.
fn sse_event(record: &EventRecord) -> Event {
    let data = serde_json::to_string(&record.event)
        .unwrap_or_else(|_| "{\"type\":\"raw\",\"text\":\"unserializable event\"}".into());
    Event::default()
        .event(record.event.kind.as_str())
        .id(record.index.to_string())
        .data(data)
}
