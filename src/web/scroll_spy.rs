use js_sys::Array;
use tracing::{debug, warn};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{IntersectionObserver, IntersectionObserverEntry, IntersectionObserverInit};

use super::js_error;
use crate::error::{Result, TelemetryError};
use crate::tracker::IntersectionSample;

type ObserverClosure = Closure<dyn FnMut(Array, IntersectionObserver)>;

/// `IntersectionObserver` over the section elements.
///
/// Each callback batch is converted to [`IntersectionSample`]s (the element
/// id is the section id) and handed to `on_batch` with the current
/// `window.scrollY`. Dropping the spy disconnects the observer.
pub struct ScrollSpy {
    observer: IntersectionObserver,
    // Must outlive the observer
    _callback: ObserverClosure,
}

impl ScrollSpy {
    pub fn attach<'a>(
        section_ids: impl IntoIterator<Item = &'a str>,
        root_margin: &str,
        mut on_batch: impl FnMut(&[IntersectionSample], f64) + 'static,
    ) -> Result<Self> {
        let window = web_sys::window()
            .ok_or_else(|| TelemetryError::Config("no window".to_string()))?;
        let document = window
            .document()
            .ok_or_else(|| TelemetryError::Config("no document".to_string()))?;

        let callback = Closure::wrap(Box::new(move |entries: Array, _observer: IntersectionObserver| {
            let batch: Vec<IntersectionSample> = entries
                .iter()
                .filter_map(|entry| entry.dyn_into::<IntersectionObserverEntry>().ok())
                .map(|entry| IntersectionSample {
                    target: entry.target().id(),
                    is_intersecting: entry.is_intersecting(),
                    bounding_top: entry.bounding_client_rect().top(),
                })
                .collect();
            let scroll_y = web_sys::window()
                .and_then(|w| w.scroll_y().ok())
                .unwrap_or(0.0);
            on_batch(&batch, scroll_y);
        }) as Box<dyn FnMut(Array, IntersectionObserver)>);

        let options = IntersectionObserverInit::new();
        options.set_root_margin(root_margin);
        options.set_threshold(&JsValue::from_f64(0.0));

        let observer = IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &options)
            .map_err(|e| TelemetryError::Config(js_error(&e)))?;

        let mut observed = 0usize;
        for id in section_ids {
            match document.get_element_by_id(id) {
                Some(element) => {
                    observer.observe(&element);
                    observed += 1;
                }
                None => warn!(section = id, "Section element not found, not observed"),
            }
        }
        debug!(observed, root_margin, "Scroll spy attached");

        Ok(Self {
            observer,
            _callback: callback,
        })
    }

    pub fn disconnect(&self) {
        self.observer.disconnect();
    }
}

impl Drop for ScrollSpy {
    fn drop(&mut self) {
        self.disconnect();
    }
}
