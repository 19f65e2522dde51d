use std::convert::Infallible;

use axum::{
    Router,
    extract::{Query, State},
    response::sse::Sse,
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{dto::sse::LobbyStreamQuery, services::sse_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/sse/lobbies",
    tag = "sse",
    params(LobbyStreamQuery),
    responses((status = 200, description = "Lobby change stream", content_type = "text/event-stream", body = String))
)]
/// Stream lobby creations, updates and deletions.
pub async fn lobby_stream(
    State(state): State<SharedState>,
    Query(query): Query<LobbyStreamQuery>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    let receiver = sse_service::subscribe(&state);
    info!(guild_id = ?query.guild_id, "New lobby SSE connection");
    sse_service::to_sse_stream(receiver, query.guild_id)
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sse/lobbies", get(lobby_stream))
}
