use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::debug;
use wasm_bindgen::prelude::*;

use super::audio::{BrowserSpawner, JsAudioEngine};
use super::console::console_line;
use super::scroll_spy::ScrollSpy;
use super::storage::PageStorage;
use crate::config::TelemetryConfig;
use crate::error::TelemetryError;
use crate::gauge;
use crate::logging;
use crate::state::InteractionState;
use crate::tracker::{RouteChange, SectionTracker};

struct Inner {
    state: RefCell<InteractionState<PageStorage>>,
    tracker: RefCell<SectionTracker>,
    spy: RefCell<Option<ScrollSpy>>,
}

/// Interaction tracker for one page session
#[wasm_bindgen]
pub struct PortfolioTelemetry {
    inner: Rc<Inner>,
}

#[wasm_bindgen]
impl PortfolioTelemetry {
    /// Load the tracker.
    ///
    /// # Arguments
    /// * `config_json` - JSON config object, `""` for defaults
    /// * `audio` - page audio object, or `undefined` to run silent
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str, audio: JsValue) -> Result<PortfolioTelemetry, JsValue> {
        #[cfg(feature = "console_error_panic_hook")]
        crate::init_panic_hook();

        let config = TelemetryConfig::from_json(config_json).map_err(to_js)?;
        if logging::init(&config.log_filter, console_line).map_err(to_js)? {
            debug!(filter = %config.log_filter, "Console logging installed");
        }
        let tracker = SectionTracker::new(&config);
        let mut state = InteractionState::load(PageStorage::detect(), config);
        if audio.is_object() {
            state = state.with_audio(JsAudioEngine::new(audio), BrowserSpawner);
        }

        Ok(PortfolioTelemetry {
            inner: Rc::new(Inner {
                state: RefCell::new(state),
                tracker: RefCell::new(tracker),
                spy: RefCell::new(None),
            }),
        })
    }

    pub fn increment_section_visit(&self, section_id: &str) {
        self.inner.state.borrow_mut().increment_section_visit(section_id);
    }

    pub fn increment_skill_hover(&self, skill_id: &str) {
        self.inner.state.borrow_mut().increment_skill_hover(skill_id);
    }

    pub fn toggle_sound_enabled(&self) -> bool {
        self.inner.state.borrow_mut().toggle_sound_enabled()
    }

    pub fn toggle_ghostline_mode(&self) -> bool {
        self.inner.state.borrow_mut().toggle_ghostline_mode()
    }

    pub fn log_fast_scroll(&self) {
        self.inner.state.borrow_mut().log_fast_scroll();
    }

    pub fn unlock_ghostline_full_mode(&self) -> bool {
        self.inner.state.borrow_mut().unlock_ghostline_full_mode()
    }

    pub fn should_unlock(&self) -> bool {
        self.inner.state.borrow().should_unlock()
    }

    pub fn play_sound(&self, name: &str) -> bool {
        self.inner.state.borrow().play_sound(name)
    }

    /// Fold in the latest write from another tab; counts never go down
    pub fn reload(&self) {
        self.inner.state.borrow_mut().reload();
    }

    #[wasm_bindgen(getter)]
    pub fn is_sound_enabled(&self) -> bool {
        self.inner.state.borrow().record().is_sound_enabled
    }

    #[wasm_bindgen(getter)]
    pub fn is_ghostline_mode_enabled(&self) -> bool {
        self.inner.state.borrow().record().is_ghostline_mode_enabled
    }

    #[wasm_bindgen(getter)]
    pub fn is_ghostline_full_mode_unlocked(&self) -> bool {
        self.inner.state.borrow().record().is_ghostline_full_mode_unlocked
    }

    #[wasm_bindgen(getter)]
    pub fn fast_scroll_count(&self) -> f64 {
        self.inner.state.borrow().record().fast_scroll_count as f64
    }

    #[wasm_bindgen(getter)]
    pub fn total_skill_hovers(&self) -> f64 {
        self.inner.state.borrow().total_skill_hovers() as f64
    }

    pub fn section_visits(&self, section_id: &str) -> f64 {
        self.inner.state.borrow().record().section_visits(section_id) as f64
    }

    /// The full record as stored
    pub fn record_json(&self) -> Result<String, JsValue> {
        self.inner.state.borrow().record().to_json().map_err(to_js)
    }

    /// Dashboard gauge value in [0, 100]
    pub fn system_load(&self, scroll_depth_percent: f64, seconds_on_page: f64) -> f64 {
        self.inner.state.borrow().system_load(scroll_depth_percent, seconds_on_page)
    }

    /// Register section ids and start observing their elements
    pub fn observe_sections(&self, section_ids: Vec<String>) -> Result<(), JsValue> {
        {
            let mut tracker = self.inner.tracker.borrow_mut();
            for id in section_ids {
                tracker.register(id);
            }
        }
        if self.inner.tracker.borrow().is_observing() {
            attach_spy(&self.inner).map_err(to_js)?;
        }
        Ok(())
    }

    /// Nav click; returns whether the active section changed
    pub fn navigate_to(&self, section_id: &str) -> bool {
        let mut state = self.inner.state.borrow_mut();
        self.inner
            .tracker
            .borrow_mut()
            .navigate_into(&mut *state, section_id)
            .is_some()
    }

    /// Report the current route path
    pub fn set_route(&self, path: &str) -> Result<(), JsValue> {
        let change = self.inner.tracker.borrow_mut().set_route(path);
        match change {
            RouteChange::Detach => {
                self.inner.spy.borrow_mut().take();
            }
            RouteChange::Attach => attach_spy(&self.inner).map_err(to_js)?,
            RouteChange::Unchanged => {}
        }
        Ok(())
    }

    /// Active section id, or the sub-page path
    #[wasm_bindgen(getter)]
    pub fn active_section(&self) -> Option<String> {
        self.inner.tracker.borrow().active_indicator().map(str::to_string)
    }
}

/// Scroll depth of the page in percent, for the gauge
#[wasm_bindgen]
pub fn scroll_depth_percent(scroll_y: f64, document_height: f64, viewport_height: f64) -> f64 {
    gauge::scroll_depth_percent(scroll_y, document_height, viewport_height)
}

// (Re)create the observer over every registered section
fn attach_spy(inner: &Rc<Inner>) -> crate::error::Result<()> {
    // Drop the old observer first so it stops delivering batches
    inner.spy.borrow_mut().take();

    let weak: Weak<Inner> = Rc::downgrade(inner);
    let root_margin = inner.state.borrow().config().observer_root_margin.clone();
    let tracker = inner.tracker.borrow();

    let spy = ScrollSpy::attach(tracker.sections(), &root_margin, move |batch, scroll_y| {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let mut state = inner.state.borrow_mut();
        if let Some(section) = inner.tracker.borrow_mut().observe_into(&mut *state, batch, scroll_y) {
            debug!(section = %section, "Entered section");
        }
    })?;
    drop(tracker);

    *inner.spy.borrow_mut() = Some(spy);
    Ok(())
}

fn to_js(err: TelemetryError) -> JsValue {
    JsValue::from_str(&err.to_string())
}
