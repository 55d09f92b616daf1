//! Audio playback collaborator
//!
//! The tracker never owns audio. It only asks an [`AudioEngine`] to start its
//! context the first time sound is switched on, and to play short cues while
//! sound is enabled. Starting is async and runs as a detached task whose
//! failure is logged inside the task. The engine is not touched until that
//! task is first polled, so callers may hold their own state borrowed while
//! spawning it.

use std::rc::Rc;

use futures::future::LocalBoxFuture;
use futures::task::LocalSpawn;
use tracing::{debug, warn};

use crate::error::Result;

pub trait AudioEngine {
    /// Whether the playback context is already running
    fn is_started(&self) -> bool;

    /// Start the playback context (browsers require a user gesture first)
    fn start(&self) -> LocalBoxFuture<'static, Result<()>>;

    /// Fire-and-forget playback of a named cue
    fn play(&self, name: &str);
}

/// Spawn a task that starts the engine if it is idle, without waiting for it.
///
/// Returns whether a task was handed to the spawner.
pub fn start_detached(engine: Rc<dyn AudioEngine>, spawner: &dyn LocalSpawn) -> bool {
    let task = async move {
        if engine.is_started() {
            return;
        }
        match engine.start().await {
            Ok(()) => debug!("Audio context started"),
            Err(e) => warn!(error = %e, "Audio context failed to start, continuing without sound"),
        }
    };

    match spawner.spawn_local_obj(Box::pin(task).into()) {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Could not spawn audio start task");
            false
        }
    }
}
