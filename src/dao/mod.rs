/// Lobby persistence with expiring records and secondary indexes.
pub mod lobby_store;
/// Persisted record definitions.
pub mod models;
/// Storage abstraction layer for database operations.
pub mod storage;
