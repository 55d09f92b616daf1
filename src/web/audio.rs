use futures::future::LocalBoxFuture;
use futures::task::{LocalFutureObj, LocalSpawn, SpawnError};
use js_sys::{Array, Function, Promise, Reflect};
use tracing::warn;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

use super::js_error;
use crate::audio::AudioEngine;
use crate::error::{Result, TelemetryError};

/// Page audio object exposing `startContext()`, `isAudioContextStarted()`
/// and `playSound(name)`
#[derive(Clone, Debug)]
pub struct JsAudioEngine {
    target: JsValue,
}

impl JsAudioEngine {
    pub fn new(target: JsValue) -> Self {
        Self { target }
    }

    fn call(&self, method: &str, args: &Array) -> Result<JsValue> {
        let func = Reflect::get(&self.target, &JsValue::from_str(method))
            .map_err(|e| TelemetryError::Audio(js_error(&e)))?;
        let func: Function = func
            .dyn_into()
            .map_err(|_| TelemetryError::Audio(format!("{method} is not a function")))?;
        func.apply(&self.target, args)
            .map_err(|e| TelemetryError::Audio(js_error(&e)))
    }
}

impl AudioEngine for JsAudioEngine {
    fn is_started(&self) -> bool {
        match self.call("isAudioContextStarted", &Array::new()) {
            Ok(value) => value.as_bool().unwrap_or(false),
            Err(e) => {
                warn!(error = %e, "Could not query audio context");
                false
            }
        }
    }

    fn start(&self) -> LocalBoxFuture<'static, Result<()>> {
        let started = self.call("startContext", &Array::new());
        Box::pin(async move {
            let value = started?;
            // startContext may be sync or return a promise
            if let Ok(promise) = value.dyn_into::<Promise>() {
                JsFuture::from(promise)
                    .await
                    .map_err(|e| TelemetryError::Audio(js_error(&e)))?;
            }
            Ok(())
        })
    }

    fn play(&self, name: &str) {
        if let Err(e) = self.call("playSound", &Array::of1(&JsValue::from_str(name))) {
            warn!(sound = name, error = %e, "Sound playback failed");
        }
    }
}

/// Runs detached tasks on the browser microtask queue
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserSpawner;

impl LocalSpawn for BrowserSpawner {
    fn spawn_local_obj(&self, future: LocalFutureObj<'static, ()>) -> std::result::Result<(), SpawnError> {
        wasm_bindgen_futures::spawn_local(future);
        Ok(())
    }
}
