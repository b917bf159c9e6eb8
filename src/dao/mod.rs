/// Database model definitions.
pub mod models;
/// External store holding the catalog, the selections and the config row.
pub mod selection_store;
/// Storage abstraction layer for database operations.
pub mod storage;
