//! Interaction state
//!
//! [`InteractionState`] is the single owner of the live [`InteractionRecord`].
//! Every mutation goes through the operations below, each of which computes
//! the next record, writes it through the store, and then replaces the
//! in-memory copy. There is no ambient global: the host keeps one instance
//! per page (the browser binding wraps it in `Rc<RefCell<_>>`).
//!
//! Tabs sharing the same storage key are not coordinated; the last save wins.

use std::rc::Rc;

use futures::task::LocalSpawn;
use tracing::{debug, info};

use crate::audio::{self, AudioEngine};
use crate::config::TelemetryConfig;
use crate::current_time_ms;
use crate::gauge::{self, LoadInputs};
use crate::record::{InteractionRecord, SkillHover};
use crate::store::{InteractionStore, KeyValueStore};
use crate::unlock;

pub struct InteractionState<S: KeyValueStore> {
    record: InteractionRecord,
    store: InteractionStore<S>,
    config: TelemetryConfig,
    audio: Option<Rc<dyn AudioEngine>>,
    spawner: Option<Box<dyn LocalSpawn>>,
}

impl<S: KeyValueStore> InteractionState<S> {
    /// Load the stored record (or defaults) from `backend`
    pub fn load(backend: S, config: TelemetryConfig) -> Self {
        Self::load_at(backend, config, current_time_ms())
    }

    pub fn load_at(backend: S, config: TelemetryConfig, now_ms: u64) -> Self {
        let store = InteractionStore::new(backend, config.storage_key.clone());
        let record = store.load_at(now_ms);
        debug!(
            key = %store.key(),
            sections = record.section_visit_counts.len(),
            skills = record.skill_hover_counts.len(),
            "Interaction state loaded"
        );
        Self {
            record,
            store,
            config,
            audio: None,
            spawner: None,
        }
    }

    /// Attach the audio collaborator and the spawner used for its start task
    pub fn with_audio(
        mut self,
        engine: impl AudioEngine + 'static,
        spawner: impl LocalSpawn + 'static,
    ) -> Self {
        self.audio = Some(Rc::new(engine));
        self.spawner = Some(Box::new(spawner));
        self
    }

    pub fn record(&self) -> &InteractionRecord {
        &self.record
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    pub fn store(&self) -> &InteractionStore<S> {
        &self.store
    }

    pub fn increment_section_visit(&mut self, section_id: &str) {
        let mut next = self.record.clone();
        let count = next
            .section_visit_counts
            .entry(section_id.to_string())
            .or_insert(0);
        *count = count.saturating_add(1);
        debug!(section = section_id, visits = *count, "Section visit");
        self.commit(next);
    }

    pub fn increment_skill_hover(&mut self, skill_id: &str) {
        self.increment_skill_hover_at(skill_id, current_time_ms());
    }

    pub fn increment_skill_hover_at(&mut self, skill_id: &str, now_ms: u64) {
        let mut next = self.record.clone();
        let entry = next
            .skill_hover_counts
            .entry(skill_id.to_string())
            .or_insert_with(SkillHover::default);
        entry.count = entry.count.saturating_add(1);
        entry.last_timestamp = now_ms;
        debug!(skill = skill_id, hovers = entry.count, "Skill hover");
        self.commit(next);
    }

    /// Flip sound on/off and return the new value.
    ///
    /// Switching on spawns a detached task that starts an idle audio engine;
    /// the flip itself never waits for or depends on that task.
    pub fn toggle_sound_enabled(&mut self) -> bool {
        let mut next = self.record.clone();
        next.is_sound_enabled = !next.is_sound_enabled;
        let enabled = next.is_sound_enabled;
        self.commit(next);

        if enabled {
            if let (Some(engine), Some(spawner)) = (&self.audio, &self.spawner) {
                audio::start_detached(Rc::clone(engine), spawner.as_ref());
            }
        }
        debug!(enabled, "Sound toggled");
        enabled
    }

    pub fn toggle_ghostline_mode(&mut self) -> bool {
        let mut next = self.record.clone();
        next.is_ghostline_mode_enabled = !next.is_ghostline_mode_enabled;
        let enabled = next.is_ghostline_mode_enabled;
        self.commit(next);
        debug!(enabled, "Ghostline mode toggled");
        enabled
    }

    pub fn log_fast_scroll(&mut self) {
        let mut next = self.record.clone();
        next.fast_scroll_count = next.fast_scroll_count.saturating_add(1);
        self.commit(next);
    }

    /// Unlock full ghostline mode if the hover rule allows it.
    ///
    /// Idempotent; writes only on the false -> true transition. Returns the
    /// flag after evaluation.
    pub fn unlock_ghostline_full_mode(&mut self) -> bool {
        if self.record.is_ghostline_full_mode_unlocked {
            return true;
        }
        if !unlock::should_unlock_with(&self.record, self.config.unlock_hover_threshold) {
            return false;
        }

        let mut next = self.record.clone();
        next.is_ghostline_full_mode_unlocked = true;
        info!(hovers = next.total_skill_hovers(), "Ghostline full mode unlocked");
        self.commit(next);
        true
    }

    /// Whether the unlock rule currently holds
    pub fn should_unlock(&self) -> bool {
        unlock::should_unlock_with(&self.record, self.config.unlock_hover_threshold)
    }

    /// Play a sound cue when sound is on and the context is running
    pub fn play_sound(&self, name: &str) -> bool {
        if !self.record.is_sound_enabled {
            return false;
        }
        match &self.audio {
            Some(engine) if engine.is_started() => {
                engine.play(name);
                true
            }
            _ => false,
        }
    }

    pub fn total_skill_hovers(&self) -> u64 {
        self.record.total_skill_hovers()
    }

    pub fn system_load(&self, scroll_depth_percent: f64, seconds_on_page: f64) -> f64 {
        gauge::system_load(&LoadInputs::from_record(
            &self.record,
            scroll_depth_percent,
            seconds_on_page,
        ))
    }

    /// Re-read the store and fold in whatever another tab last wrote.
    ///
    /// Counters never go down: each takes the larger of the stored and the
    /// local value, and the unlock flag stays set once set on either side.
    /// Toggles follow the stored record. A merge that changed anything is
    /// written back so the other tab picks it up on its next reload.
    pub fn reload(&mut self) {
        self.reload_at(current_time_ms());
    }

    pub fn reload_at(&mut self, now_ms: u64) {
        let stored = self.store.load_at(now_ms);
        let mut merged = stored.clone();
        merged.absorb_counts(&self.record);
        if merged == stored {
            self.record = merged;
        } else {
            debug!("Local counters ahead of storage, writing merged record");
            self.commit(merged);
        }
    }

    // Write-through, then adopt
    fn commit(&mut self, next: InteractionRecord) {
        self.store.save(&next);
        self.record = next;
    }
}
