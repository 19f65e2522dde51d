/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Chat events to lobby operations.
pub mod interaction_router;
/// Lobby state machine over the store.
pub mod lobby_engine;
/// Lobby operations followed by message re-rendering.
pub mod lobby_service;
/// Rendering of lobbies into chat messages.
pub mod reconciler;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
