use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::lobby::{CreateLobbyRequest, LobbyResponse, ParticipantRequest, UpdateLobbyRequest},
    error::AppError,
    state::{
        SharedState,
        lobby::{LobbyPatch, NewLobby},
    },
};

/// Lobby management endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/lobbies", post(create_lobby))
        .route(
            "/lobbies/{id}",
            get(get_lobby).put(update_lobby).delete(delete_lobby),
        )
        .route(
            "/lobbies/{id}/participants",
            post(join_lobby).delete(leave_lobby),
        )
        .route("/lobbies/{id}/start", post(start_lobby))
        .route("/lobbies/{id}/cancel", post(cancel_lobby))
        .route("/lobbies/{id}/complete", post(complete_lobby))
        .route("/guilds/{guild_id}/lobbies", get(list_guild_lobbies))
}

/// Open a lobby and post its message when a chat gateway is configured.
#[utoipa::path(
    post,
    path = "/lobbies",
    tag = "lobbies",
    request_body = CreateLobbyRequest,
    responses(
        (status = 201, description = "Lobby created", body = LobbyResponse),
        (status = 400, description = "Invalid payload"),
        (status = 503, description = "Lobby store unavailable")
    )
)]
pub async fn create_lobby(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateLobbyRequest>>,
) -> Result<(StatusCode, Json<LobbyResponse>), AppError> {
    let new = NewLobby::try_from(payload)?;
    let lobby = state.lobbies().create(new).await?;
    Ok((StatusCode::CREATED, Json(lobby.into())))
}

#[utoipa::path(
    get,
    path = "/lobbies/{id}",
    tag = "lobbies",
    params(("id" = Uuid, Path, description = "Lobby identifier")),
    responses(
        (status = 200, description = "Lobby found", body = LobbyResponse),
        (status = 404, description = "Lobby not found or expired")
    )
)]
pub async fn get_lobby(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<LobbyResponse>, AppError> {
    Ok(Json(state.lobbies().get(id).await?.into()))
}

/// Live lobbies of a guild, newest first.
#[utoipa::path(
    get,
    path = "/guilds/{guild_id}/lobbies",
    tag = "lobbies",
    params(("guild_id" = String, Path, description = "Guild identifier")),
    responses((status = 200, description = "Guild lobbies", body = [LobbyResponse]))
)]
pub async fn list_guild_lobbies(
    State(state): State<SharedState>,
    Path(guild_id): Path<String>,
) -> Result<Json<Vec<LobbyResponse>>, AppError> {
    let lobbies = state.lobbies().list_by_guild(&guild_id).await?;
    Ok(Json(lobbies.iter().map(LobbyResponse::from).collect()))
}

/// Edit title, schedule or capacity of a pending lobby.
#[utoipa::path(
    put,
    path = "/lobbies/{id}",
    tag = "lobbies",
    params(("id" = Uuid, Path, description = "Lobby identifier")),
    request_body = UpdateLobbyRequest,
    responses(
        (status = 200, description = "Lobby updated", body = LobbyResponse),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Lobby not found"),
        (status = 409, description = "Lobby is no longer pending or too many participants")
    )
)]
pub async fn update_lobby(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<UpdateLobbyRequest>>,
) -> Result<Json<LobbyResponse>, AppError> {
    let patch = LobbyPatch::try_from(payload)?;
    Ok(Json(state.lobbies().update(id, patch).await?.into()))
}

#[utoipa::path(
    delete,
    path = "/lobbies/{id}",
    tag = "lobbies",
    params(("id" = Uuid, Path, description = "Lobby identifier")),
    responses(
        (status = 204, description = "Lobby deleted"),
        (status = 404, description = "Lobby not found")
    )
)]
pub async fn delete_lobby(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.lobbies().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/lobbies/{id}/participants",
    tag = "lobbies",
    params(("id" = Uuid, Path, description = "Lobby identifier")),
    request_body = ParticipantRequest,
    responses(
        (status = 200, description = "User joined", body = LobbyResponse),
        (status = 404, description = "Lobby not found"),
        (status = 409, description = "Lobby full, not pending, or user already joined")
    )
)]
pub async fn join_lobby(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<ParticipantRequest>>,
) -> Result<Json<LobbyResponse>, AppError> {
    let lobby = state.lobbies().add_participant(id, &payload.user_id).await?;
    Ok(Json(lobby.into()))
}

#[utoipa::path(
    delete,
    path = "/lobbies/{id}/participants",
    tag = "lobbies",
    params(("id" = Uuid, Path, description = "Lobby identifier")),
    request_body = ParticipantRequest,
    responses(
        (status = 200, description = "User left", body = LobbyResponse),
        (status = 400, description = "User is the creator or not a participant"),
        (status = 404, description = "Lobby not found"),
        (status = 409, description = "Lobby is no longer pending")
    )
)]
pub async fn leave_lobby(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<ParticipantRequest>>,
) -> Result<Json<LobbyResponse>, AppError> {
    let lobby = state
        .lobbies()
        .remove_participant(id, &payload.user_id)
        .await?;
    Ok(Json(lobby.into()))
}

#[utoipa::path(
    post,
    path = "/lobbies/{id}/start",
    tag = "lobbies",
    params(("id" = Uuid, Path, description = "Lobby identifier")),
    responses(
        (status = 200, description = "Lobby started", body = LobbyResponse),
        (status = 404, description = "Lobby not found"),
        (status = 409, description = "Lobby not pending or scheduled time not reached")
    )
)]
pub async fn start_lobby(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<LobbyResponse>, AppError> {
    Ok(Json(state.lobbies().start(id).await?.into()))
}

#[utoipa::path(
    post,
    path = "/lobbies/{id}/cancel",
    tag = "lobbies",
    params(("id" = Uuid, Path, description = "Lobby identifier")),
    responses(
        (status = 200, description = "Lobby cancelled", body = LobbyResponse),
        (status = 404, description = "Lobby not found"),
        (status = 409, description = "Lobby already cancelled or completed")
    )
)]
pub async fn cancel_lobby(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<LobbyResponse>, AppError> {
    Ok(Json(state.lobbies().cancel(id).await?.into()))
}

/// Mark an active lobby as played.
#[utoipa::path(
    post,
    path = "/lobbies/{id}/complete",
    tag = "lobbies",
    params(("id" = Uuid, Path, description = "Lobby identifier")),
    responses(
        (status = 200, description = "Lobby completed", body = LobbyResponse),
        (status = 404, description = "Lobby not found"),
        (status = 409, description = "Lobby is not active")
    )
)]
pub async fn complete_lobby(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<LobbyResponse>, AppError> {
    Ok(Json(state.lobbies().complete(id).await?.into()))
}
