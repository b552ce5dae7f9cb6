//! Settings provider implementations.

use waypoint_application::SettingsProvider;
use waypoint_domain::AppSettings;

/// A provider serving a fixed settings snapshot.
///
/// The executor re-reads settings on every send, so embedders that
/// support live settings changes supply their own provider instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticSettingsProvider(AppSettings);

impl StaticSettingsProvider {
    /// Creates a provider over the given settings.
    #[must_use]
    pub const fn new(settings: AppSettings) -> Self {
        Self(settings)
    }
}

impl SettingsProvider for StaticSettingsProvider {
    fn settings(&self) -> AppSettings {
        self.0
    }
}
