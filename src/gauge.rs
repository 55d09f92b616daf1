//! Derived "system load" gauge
//!
//! load = min(100, scroll_depth/2 + seconds_on_page/6 + fast_scrolls*5 + skill_hovers/2)
//!
//! Display only; recomputed on every render tick and never persisted.

use crate::record::InteractionRecord;

pub const MAX_LOAD: f64 = 100.0;

/// Inputs to the load gauge
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LoadInputs {
    /// 0-100
    pub scroll_depth_percent: f64,
    pub seconds_on_page: f64,
    pub fast_scroll_count: u64,
    pub total_skill_hovers: u64,
}

impl LoadInputs {
    /// Take the counters from a record and the live metrics from the page
    pub fn from_record(record: &InteractionRecord, scroll_depth_percent: f64, seconds_on_page: f64) -> Self {
        Self {
            scroll_depth_percent,
            seconds_on_page,
            fast_scroll_count: record.fast_scroll_count,
            total_skill_hovers: record.total_skill_hovers(),
        }
    }
}

/// Compute the load value, always within [0, 100]
pub fn system_load(inputs: &LoadInputs) -> f64 {
    let raw = sanitize(inputs.scroll_depth_percent) / 2.0
        + sanitize(inputs.seconds_on_page) / 6.0
        + inputs.fast_scroll_count as f64 * 5.0
        + inputs.total_skill_hovers as f64 / 2.0;
    raw.clamp(0.0, MAX_LOAD)
}

/// Percentage of the scrollable height already scrolled past.
///
/// Pages that fit in the viewport report 0.
pub fn scroll_depth_percent(scroll_y: f64, document_height: f64, viewport_height: f64) -> f64 {
    let scrollable = sanitize(document_height) - sanitize(viewport_height);
    if scrollable <= 0.0 {
        return 0.0;
    }
    (sanitize(scroll_y) / scrollable * 100.0).clamp(0.0, 100.0)
}

// Negative, NaN and infinite inputs count as zero
fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}
