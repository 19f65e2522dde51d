use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::{
    dto::sse::{Handshake, ServerEvent},
    state::{SharedState, hub::LobbyChange},
};

/// Subscribe to committed lobby changes.
pub fn subscribe(state: &SharedState) -> broadcast::Receiver<LobbyChange> {
    state.hub().subscribe()
}

fn to_event(payload: ServerEvent) -> Event {
    let event = Event::default().data(payload.data);
    match payload.event {
        Some(name) => event.event(name),
        None => event,
    }
}

/// Convert a change receiver into an SSE response, forwarding the changes of
/// `guild_id` (or every guild) until the client disconnects.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<LobbyChange>,
    guild_id: Option<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        let handshake = ServerEvent::json(
            Some("handshake".to_string()),
            &Handshake {
                message: "lobby stream connected".into(),
                guild_id: guild_id.clone(),
            },
        );
        if let Ok(handshake) = handshake {
            if tx.send(Ok(to_event(handshake))).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(change) => {
                            if guild_id.as_deref().is_some_and(|guild| guild != change.guild_id) {
                                continue;
                            }
                            let payload = match ServerEvent::from_change(&change) {
                                Ok(payload) => payload,
                                Err(err) => {
                                    warn!(lobby_id = %change.lobby_id, error = %err, "failed to encode lobby change");
                                    continue;
                                }
                            };
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            // Skip lagged messages but keep the stream alive.
                            warn!(skipped, "lobby SSE subscriber lagged");
                            continue;
                        }
                    }
                }
            }
        }

        info!("Lobby SSE stream disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
