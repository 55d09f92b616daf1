use tracing::Level;
use wasm_bindgen::prelude::*;
use web_sys::console;

use crate::logging;

/// Route a formatted line to the console method matching its level
pub(crate) fn console_line(level: Level, line: &str) {
    let line = JsValue::from_str(line);
    match level {
        Level::ERROR => console::error_1(&line),
        Level::WARN => console::warn_1(&line),
        Level::INFO => console::info_1(&line),
        _ => console::debug_1(&line),
    }
}

/// Send this crate's `tracing` events to the devtools console.
///
/// `filter` takes `EnvFilter` directives (default
/// `portfolio_telemetry=info`). Returns `false` if a subscriber was already
/// installed; the `PortfolioTelemetry` constructor calls this with the
/// configured `logFilter`.
#[wasm_bindgen]
pub fn init_logging(filter: Option<String>) -> Result<bool, JsValue> {
    let filter = filter.unwrap_or_else(|| logging::DEFAULT_LOG_FILTER.to_string());
    logging::init(&filter, console_line).map_err(|e| JsValue::from_str(&e.to_string()))
}
