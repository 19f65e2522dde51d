use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::gateway::{InboundEvent, InteractionResponse},
    error::AppError,
    state::SharedState,
};

/// Route a chat event (command, button press or reaction) forwarded by a gateway bridge.
#[utoipa::path(
    post,
    path = "/gateway/events",
    tag = "gateway",
    request_body = InboundEvent,
    responses(
        (status = 200, description = "Event handled", body = InteractionResponse),
        (status = 503, description = "Lobby store unavailable")
    )
)]
pub async fn gateway_event(
    State(state): State<SharedState>,
    Json(event): Json<InboundEvent>,
) -> Result<Json<InteractionResponse>, AppError> {
    let outcome = state.interactions().handle(event).await?;
    Ok(Json(outcome.into()))
}

/// Configure the gateway routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/gateway/events", post(gateway_event))
}
