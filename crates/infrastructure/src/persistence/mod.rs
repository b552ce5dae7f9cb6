//! JSON file-backed storage adapters.

mod config_store;
mod cookie_store;

pub use config_store::{ConfigDocument, JsonFileConfigStore};
pub use cookie_store::JsonFileCookieStore;
