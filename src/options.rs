use serde::Deserialize;

use crate::error::ConfigurationError;

/// Tracker configuration, supplied once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct TrackingOptions {
    /// When `false`, every record operation is a silent no-op.
    pub enable_lineage_tracking: bool,
    /// When `true`, mapping with a null source fails with
    /// [`MissingSourceError`](crate::MissingSourceError) instead of skipping it.
    pub throw_on_null_sources: bool,
}

impl Default for TrackingOptions {
    fn default() -> Self {
        Self {
            enable_lineage_tracking: true,
            throw_on_null_sources: false,
        }
    }
}

impl TrackingOptions {
    /// Options with tracking switched off.
    pub fn disabled() -> Self {
        Self {
            enable_lineage_tracking: false,
            ..Self::default()
        }
    }

    pub fn strict() -> Self {
        Self {
            throw_on_null_sources: true,
            ..Self::default()
        }
    }

    /// Parses options from a JSON object such as
    /// `{"enableLineageTracking": true, "throwOnNullSources": false}`.
    /// Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        serde_json::from_str(json).map_err(|e| ConfigurationError::Options(e.to_string()))
    }
}
