//! Effective application settings consumed by the request executor.

use serde::{Deserialize, Serialize};

/// Settings that shape how requests are performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Request timeout in milliseconds. `0` means no timeout.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum number of redirects to follow.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// When true, server certificates are not validated for any request.
    #[serde(default)]
    pub ignore_certificate_validation: bool,
}

const fn default_timeout_ms() -> u64 {
    30_000
}

const fn default_max_redirects() -> usize {
    10
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            max_redirects: default_max_redirects(),
            ignore_certificate_validation: false,
        }
    }
}

impl AppSettings {
    /// Returns true if a timeout should be applied to transport calls.
    #[must_use]
    pub const fn has_timeout(&self) -> bool {
        self.timeout_ms > 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = AppSettings::default();
        assert_eq!(settings.timeout_ms, 30_000);
        assert_eq!(settings.max_redirects, 10);
        assert!(!settings.ignore_certificate_validation);
        assert!(settings.has_timeout());
    }

    #[test]
    fn test_zero_timeout_means_none() {
        let settings = AppSettings {
            timeout_ms: 0,
            ..Default::default()
        };
        assert!(!settings.has_timeout());
    }

    #[test]
    fn test_deserialize_with_missing_fields() {
        let settings: AppSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.timeout_ms, 30_000);
    }
}
