//! Browser bindings (wasm32 only)
//!
//! - [`BrowserStorage`]: `window.localStorage` as a [`KeyValueStore`](crate::KeyValueStore)
//! - [`JsAudioEngine`] / [`BrowserSpawner`]: the page's audio object and
//!   `spawn_local` behind the [`AudioEngine`](crate::AudioEngine) seam
//! - [`ScrollSpy`]: `IntersectionObserver` feeding the section tracker
//! - [`init_logging`]: `tracing` output to the devtools console
//! - [`PortfolioTelemetry`]: the class exported to JavaScript

mod audio;
mod console;
mod facade;
mod scroll_spy;
mod storage;

pub use audio::{BrowserSpawner, JsAudioEngine};
pub use console::init_logging;
pub use facade::PortfolioTelemetry;
pub use scroll_spy::ScrollSpy;
pub use storage::{BrowserStorage, PageStorage};

use wasm_bindgen::JsValue;

/// Best-effort text for a thrown JS value
pub(crate) fn js_error(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

// ============================================================================
// WASM-specific Tests
// ============================================================================
