//! Waypoint Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports defined in
//! the application layer: the reqwest-backed HTTP transport and the
//! JSON file stores for configuration and cookies.

pub mod adapters;
pub mod persistence;
pub mod settings;

pub use adapters::ReqwestTransport;
pub use persistence::{ConfigDocument, JsonFileConfigStore, JsonFileCookieStore};
pub use settings::StaticSettingsProvider;
