//! Port traits implemented by infrastructure adapters.

mod settings;
mod stores;
mod transport;

pub use settings::SettingsProvider;
pub use stores::{ConfigStore, CookieStore, StoreError};
pub use transport::{
    CancellationToken, HttpTransport, TransportError, TransportRequest, TransportResponse,
};
