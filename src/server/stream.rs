//! `GET /logs`: server-sent events fed by the log hub.

use std::collections::VecDeque;
use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures_util::stream::{self, Stream};
use tracing::debug;

use super::AppState;

/// First event sent on every connection.
pub const CONNECTED_LINE: &str = "[logs] connected";

/// Replay the recent tail, then follow new lines until the client goes away.
///
/// No keep-alive comments are sent. When the peer disconnects, hyper drops
/// the body and with it the subscriber; the hub is never touched.
pub async fn handle_logs(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (replay, subscriber) = state.hub.subscribe(state.settings.replay_lines);
    debug!(watermark = subscriber.last_seen(), "log viewer connected");

    let mut pending: VecDeque<String> = VecDeque::with_capacity(replay.len() + 1);
    pending.push_back(CONNECTED_LINE.to_string());
    pending.extend(replay.into_iter().map(|line| line.text));

    let wait = state.settings.stream_wait;
    let events = stream::unfold(
        (subscriber, pending),
        move |(mut subscriber, mut pending)| async move {
            loop {
                if let Some(text) = pending.pop_front() {
                    return Some((Ok(Event::default().data(text)), (subscriber, pending)));
                }
                // empty batch on timeout: just wait again
                let batch = subscriber.next_batch(wait).await;
                pending.extend(batch.into_iter().map(|line| line.text));
            }
        },
    );
    Sse::new(events)
}
