//! Library crate for club-pick-back, exposing modules for binaries and integration tests.

mod config;
/// Store abstraction and backends.
pub mod dao;
mod dto;
mod error;
/// HTTP routers.
pub mod routes;
/// Business logic behind the routes.
pub mod services;
/// Shared application state.
pub mod state;

pub use config::AppConfig;
