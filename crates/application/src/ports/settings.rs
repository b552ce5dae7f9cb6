//! The settings port.

use waypoint_domain::AppSettings;

/// Supplies the global settings snapshot read at send time.
pub trait SettingsProvider: Send + Sync {
    /// The current settings.
    fn settings(&self) -> AppSettings;
}
