use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the scrim lobby service.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::lobby_stream,
        crate::routes::lobby::create_lobby,
        crate::routes::lobby::get_lobby,
        crate::routes::lobby::list_guild_lobbies,
        crate::routes::lobby::update_lobby,
        crate::routes::lobby::delete_lobby,
        crate::routes::lobby::join_lobby,
        crate::routes::lobby::leave_lobby,
        crate::routes::lobby::start_lobby,
        crate::routes::lobby::cancel_lobby,
        crate::routes::lobby::complete_lobby,
        crate::routes::gateway::gateway_event,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::lobby::CreateLobbyRequest,
            crate::dto::lobby::UpdateLobbyRequest,
            crate::dto::lobby::ParticipantRequest,
            crate::dto::lobby::LobbyResponse,
            crate::dto::gateway::InboundEvent,
            crate::dto::gateway::CommandOptions,
            crate::dto::gateway::InteractionResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::LobbyDeletedEvent,
            crate::state::state_machine::LobbyStatus,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "lobbies", description = "Lobby management"),
        (name = "gateway", description = "Chat gateway events"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
