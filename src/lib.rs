//! Resource server: schema-driven CRUD routes over PostgreSQL or an in-process store.

pub mod auth;
pub mod config;
pub mod docs;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod migration;
pub mod query;
pub mod render;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use config::{builtin_resources, load_from_path, resolve, ResourceConfig, ResourceRegistry, ResourceSchema, Settings, StorageKind};
pub use error::{AppError, ConfigError};
pub use migration::apply_migrations;
pub use routes::app;
pub use service::CrudService;
pub use state::AppState;
pub use store::{MemoryStore, PgStore, Store};
