//! Tracker configuration

use serde::{Deserialize, Serialize};

use crate::error::{Result, TelemetryError};
use crate::logging::{self, DEFAULT_LOG_FILTER};

/// Namespace key the interaction record is stored under
pub const DEFAULT_STORAGE_KEY: &str = "portfolio-interaction-state";

/// Total skill hovers that must be exceeded to unlock full ghostline mode
pub const UNLOCK_HOVER_THRESHOLD: u64 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryConfig {
    /// Key of the record in the browser's local storage
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// Section forced active near the top of the page
    #[serde(default = "default_home_section")]
    pub home_section: String,

    /// Scroll offset (px) below which the home section is always active
    #[serde(default = "default_home_threshold")]
    pub home_threshold_px: f64,

    /// Path of the scrollable single-page route
    #[serde(default = "default_scroll_route")]
    pub scroll_route: String,

    /// Unlock fires when total skill hovers exceed this
    #[serde(default = "default_unlock_threshold")]
    pub unlock_hover_threshold: u64,

    /// `rootMargin` of the section observer
    #[serde(default = "default_root_margin")]
    pub observer_root_margin: String,

    /// `EnvFilter` directives for console logging
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

// Defaults
fn default_storage_key() -> String { DEFAULT_STORAGE_KEY.to_string() }
fn default_home_section() -> String { "home".to_string() }
fn default_home_threshold() -> f64 { 100.0 }
fn default_scroll_route() -> String { "/".to_string() }
fn default_unlock_threshold() -> u64 { UNLOCK_HOVER_THRESHOLD }
fn default_root_margin() -> String { "-20% 0px -60% 0px".to_string() }
fn default_log_filter() -> String { DEFAULT_LOG_FILTER.to_string() }

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            storage_key: default_storage_key(),
            home_section: default_home_section(),
            home_threshold_px: default_home_threshold(),
            scroll_route: default_scroll_route(),
            unlock_hover_threshold: default_unlock_threshold(),
            observer_root_margin: default_root_margin(),
            log_filter: default_log_filter(),
        }
    }
}

impl TelemetryConfig {
    /// Parse a JSON config object. Missing fields take their defaults and an
    /// empty (or whitespace) string yields the default config.
    pub fn from_json(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_json::from_str(json)
            .map_err(|e| TelemetryError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage_key.is_empty() {
            return Err(TelemetryError::Config("storageKey must not be empty".into()));
        }
        if self.home_section.is_empty() {
            return Err(TelemetryError::Config("homeSection must not be empty".into()));
        }
        if self.scroll_route.is_empty() {
            return Err(TelemetryError::Config("scrollRoute must not be empty".into()));
        }
        if !self.home_threshold_px.is_finite() || self.home_threshold_px < 0.0 {
            return Err(TelemetryError::Config(format!(
                "homeThresholdPx must be a non-negative number, got {}",
                self.home_threshold_px
            )));
        }
        logging::parse_filter(&self.log_filter)?;
        Ok(())
    }
}
