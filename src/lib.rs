//! Portfolio Telemetry - Interaction Tracker & Ghostline Unlocks
//!
//! Client-side state behind the portfolio site's gamified UI:
//! - Per-section visit counts driven by a scroll spy
//! - Per-skill hover counts
//! - Sound and ghostline feature flags, plus the one-way full-mode unlock
//! - The derived "system load" value shown on the dashboard gauge
//!
//! Everything lives in one [`InteractionRecord`] persisted as JSON under a
//! single `localStorage` key. Loading tolerates missing, mistyped and unknown
//! fields; saving is write-through and best-effort.
//!
//! ## Usage in JavaScript
//!
//! ```javascript
//! import init, { PortfolioTelemetry } from 'portfolio-telemetry';
//!
//! await init();
//!
//! const telemetry = new PortfolioTelemetry('{"logFilter": "portfolio_telemetry=debug"}', audio);
//! telemetry.observe_sections(['home', 'about', 'skills', 'projects', 'contact']);
//! telemetry.increment_skill_hover('rust');
//! if (telemetry.unlock_ghostline_full_mode()) showGhostline();
//! gauge.value = telemetry.system_load(depth, seconds);
//! ```
//!
//! ## Usage in Rust
//!
//! ```rust
//! use portfolio_telemetry::{InteractionState, MemoryStorage, TelemetryConfig};
//!
//! let mut state = InteractionState::load(MemoryStorage::new(), TelemetryConfig::default());
//! state.increment_skill_hover("rust");
//! state.increment_skill_hover("sql");
//! state.increment_skill_hover("wasm");
//! assert!(state.unlock_ghostline_full_mode());
//! ```
//!
//! ## Build
//!
//! ```bash
//! wasm-pack build --target web --out-dir pkg
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod gauge;
pub mod logging;
pub mod record;
pub mod state;
pub mod store;
pub mod tracker;
pub mod unlock;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use audio::AudioEngine;
pub use config::{TelemetryConfig, DEFAULT_STORAGE_KEY, UNLOCK_HOVER_THRESHOLD};
pub use error::{Result, TelemetryError};
pub use gauge::{scroll_depth_percent, system_load, LoadInputs};
pub use record::{InteractionRecord, SkillHover};
pub use state::InteractionState;
pub use store::{InteractionStore, KeyValueStore, MemoryStorage};
pub use tracker::{ActiveSection, IntersectionSample, RouteChange, SectionTracker};
pub use unlock::{should_unlock, should_unlock_with};

/// Better panic messages in the browser console
#[cfg(feature = "console_error_panic_hook")]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

/// Get current time in milliseconds
pub(crate) fn current_time_ms() -> u64 {
    #[cfg(target_arch = "wasm32")]
    {
        js_sys::Date::now() as u64
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}
