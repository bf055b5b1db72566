//! # Entities
//!
//! Data layer and JSON API for collaborative text annotation: user accounts,
//! uploaded texts in content-addressed storage, annotation graphs, studies,
//! and per-user permissions on texts and annotations.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! entities = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use entities::config::ServerConfig;
//! use entities::server::{AppState, create_router};
//! use entities::store::{SqliteStore, Store};
//!
//! let config = ServerConfig::default();
//! let store = SqliteStore::new(config.db_path(), config.text_storage_dir()).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(Arc::new(store), config));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes CLI module. Disable with `default-features = false`.

pub mod access;
pub mod auth;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod server;
pub mod store;
pub mod types;
