//! Section visit tracker
//!
//! Decides which page section is active from batches of viewport
//! intersection samples and reports each transition exactly once. The
//! tracker is a plain state machine; the browser binding in `web` owns the
//! `IntersectionObserver` and feeds it.
//!
//! ```text
//!            observe / navigate_to             set_route(other)
//!   None ─────────────────────────▶ Section(id) ───────────────▶ SubPage(path)
//!     ▲                                 │  ▲                           │
//!     │                                 └──┘ transition to new id      │
//!     └─────────────────────── set_route(scroll route) ◀──────────────┘
//! ```

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::config::TelemetryConfig;
use crate::state::InteractionState;
use crate::store::KeyValueStore;

/// One entry of an intersection batch
#[derive(Clone, Debug, PartialEq)]
pub struct IntersectionSample {
    /// Section id of the observed element
    pub target: String,
    pub is_intersecting: bool,
    /// Top edge relative to the viewport, in px
    pub bounding_top: f64,
}

impl IntersectionSample {
    pub fn new(target: impl Into<String>, is_intersecting: bool, bounding_top: f64) -> Self {
        Self {
            target: target.into(),
            is_intersecting,
            bounding_top,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ActiveSection {
    #[default]
    None,
    Section(String),
    /// A distinct route; observation is torn down
    SubPage(String),
}

/// What the binding must do with its observer after a route change
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteChange {
    /// Back on the scrollable route: (re)create the observer
    Attach,
    /// Left for a sub-page: disconnect the observer
    Detach,
    Unchanged,
}

#[derive(Clone, Debug)]
pub struct SectionTracker {
    sections: BTreeSet<String>,
    /// Registered sections currently in view, with their latest top edge
    visible: BTreeMap<String, f64>,
    active: ActiveSection,
    home_section: String,
    home_threshold_px: f64,
    scroll_route: String,
}

impl SectionTracker {
    pub fn new(config: &TelemetryConfig) -> Self {
        Self {
            sections: BTreeSet::new(),
            visible: BTreeMap::new(),
            active: ActiveSection::None,
            home_section: config.home_section.clone(),
            home_threshold_px: config.home_threshold_px,
            scroll_route: config.scroll_route.clone(),
        }
    }

    /// Track a navigable section (one per nav anchor)
    pub fn register(&mut self, section_id: impl Into<String>) {
        self.sections.insert(section_id.into());
    }

    pub fn unregister(&mut self, section_id: &str) {
        self.sections.remove(section_id);
        self.visible.remove(section_id);
    }

    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(String::as_str)
    }

    pub fn active(&self) -> &ActiveSection {
        &self.active
    }

    /// Section id, or the sub-page path, for the nav highlight
    pub fn active_indicator(&self) -> Option<&str> {
        match &self.active {
            ActiveSection::None => None,
            ActiveSection::Section(id) | ActiveSection::SubPage(id) => Some(id),
        }
    }

    pub fn is_observing(&self) -> bool {
        !matches!(self.active, ActiveSection::SubPage(_))
    }

    /// Process one intersection batch.
    ///
    /// A batch only carries the sections whose intersection changed, so the
    /// choice is made over every section still in view, not just the batch.
    /// Returns the newly active section on a transition, `None` otherwise.
    pub fn observe(&mut self, batch: &[IntersectionSample], scroll_y: f64) -> Option<String> {
        if !self.is_observing() {
            return None;
        }
        self.apply(batch);

        // The top section may not count as intersecting under the observer
        // margins, so near the top of the page it wins outright.
        let candidate = if scroll_y < self.home_threshold_px {
            Some(self.home_section.clone())
        } else {
            self.closest_to_top()
        };

        candidate.and_then(|id| self.transition(id))
    }

    /// Select a section directly (nav click)
    pub fn navigate_to(&mut self, section_id: &str) -> Option<String> {
        if !self.is_observing() {
            return None;
        }
        self.transition(section_id.to_string())
    }

    pub fn set_route(&mut self, path: &str) -> RouteChange {
        if path == self.scroll_route {
            if let ActiveSection::SubPage(_) = self.active {
                debug!(path, "Back on the scrollable route, observing sections");
                self.active = ActiveSection::None;
                self.visible.clear();
                return RouteChange::Attach;
            }
            return RouteChange::Unchanged;
        }

        let next = ActiveSection::SubPage(path.to_string());
        if self.active == next {
            return RouteChange::Unchanged;
        }
        let was_observing = self.is_observing();
        self.active = next;
        if was_observing {
            debug!(path, "Sub-page active, section observation stopped");
            self.visible.clear();
            RouteChange::Detach
        } else {
            RouteChange::Unchanged
        }
    }

    /// [`observe`](Self::observe) and count the visit on a transition
    pub fn observe_into<S: KeyValueStore>(
        &mut self,
        state: &mut InteractionState<S>,
        batch: &[IntersectionSample],
        scroll_y: f64,
    ) -> Option<String> {
        let entered = self.observe(batch, scroll_y)?;
        state.increment_section_visit(&entered);
        Some(entered)
    }

    /// [`navigate_to`](Self::navigate_to) and count the visit on a transition
    pub fn navigate_into<S: KeyValueStore>(
        &mut self,
        state: &mut InteractionState<S>,
        section_id: &str,
    ) -> Option<String> {
        let entered = self.navigate_to(section_id)?;
        state.increment_section_visit(&entered);
        Some(entered)
    }

    fn apply(&mut self, batch: &[IntersectionSample]) {
        for sample in batch {
            let in_view = sample.is_intersecting
                && sample.bounding_top.is_finite()
                && self.sections.contains(&sample.target);
            if in_view {
                self.visible.insert(sample.target.clone(), sample.bounding_top);
            } else {
                self.visible.remove(&sample.target);
            }
        }
    }

    // Closest top edge to the viewport top; ties go to the smaller top
    fn closest_to_top(&self) -> Option<String> {
        self.visible
            .iter()
            .min_by(|(_, a), (_, b)| a.abs().total_cmp(&b.abs()).then(a.total_cmp(b)))
            .map(|(id, _)| id.clone())
    }

    fn transition(&mut self, id: String) -> Option<String> {
        if matches!(&self.active, ActiveSection::Section(current) if *current == id) {
            return None;
        }
        debug!(section = %id, "Active section changed");
        self.active = ActiveSection::Section(id.clone());
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStorage;

    fn tracker() -> SectionTracker {
        let mut tracker = SectionTracker::new(&TelemetryConfig::default());
        for id in ["home", "about", "skills", "projects", "contact"] {
            tracker.register(id);
        }
        tracker
    }

    fn hit(id: &str, top: f64) -> IntersectionSample {
        IntersectionSample::new(id, true, top)
    }

    #[test]
    fn test_initial_state() {
        let tracker = tracker();
        assert_eq!(tracker.active(), &ActiveSection::None);
        assert_eq!(tracker.active_indicator(), None);
        assert!(tracker.is_observing());
    }

    #[test]
    fn test_picks_section_closest_to_top() {
        let mut tracker = tracker();
        let batch = [hit("about", 320.0), hit("skills", -40.0), hit("projects", 700.0)];
        assert_eq!(tracker.observe(&batch, 900.0), Some("skills".to_string()));
    }

    #[test]
    fn test_tie_goes_to_smaller_top() {
        let mut tracker = tracker();
        let batch = [hit("projects", 50.0), hit("skills", -50.0)];
        assert_eq!(tracker.observe(&batch, 900.0), Some("skills".to_string()));
    }

    #[test]
    fn test_ignores_non_intersecting_and_unknown() {
        let mut tracker = tracker();
        let batch = [
            IntersectionSample::new("about", false, 0.0),
            hit("footer", 1.0),
            hit("contact", 400.0),
        ];
        assert_eq!(tracker.observe(&batch, 2000.0), Some("contact".to_string()));

        let nothing = [IntersectionSample::new("about", false, 0.0)];
        assert_eq!(tracker.observe(&nothing, 2000.0), None);
        assert_eq!(tracker.active_indicator(), Some("contact"));
    }

    #[test]
    fn test_sections_stay_visible_across_batches() {
        let mut tracker = tracker();
        assert_eq!(tracker.observe(&[hit("about", -5.0)], 600.0), Some("about".to_string()));

        // Only skills changed; about is still in view and still closest
        assert_eq!(tracker.observe(&[hit("skills", 400.0)], 650.0), None);
        assert_eq!(tracker.active_indicator(), Some("about"));

        // about leaves, skills takes over without a new skills sample
        let left = [IntersectionSample::new("about", false, -300.0)];
        assert_eq!(tracker.observe(&left, 900.0), Some("skills".to_string()));
    }

    #[test]
    fn test_route_change_forgets_visible_sections() {
        let mut tracker = tracker();
        tracker.observe(&[hit("about", 0.0), hit("skills", 300.0)], 600.0);

        tracker.set_route("/resume");
        assert_eq!(tracker.set_route("/"), RouteChange::Attach);
        assert_eq!(tracker.observe(&[], 600.0), None);
        assert_eq!(tracker.observe(&[hit("contact", 50.0)], 2000.0), Some("contact".to_string()));
    }

    #[test]
    fn test_unregistered_section_drops_out() {
        let mut tracker = tracker();
        tracker.observe(&[hit("about", 0.0), hit("skills", 300.0)], 600.0);
        tracker.unregister("about");
        assert_eq!(tracker.observe(&[], 600.0), Some("skills".to_string()));
    }

    #[test]
    fn test_near_top_forces_home() {
        let mut tracker = tracker();
        let batch = [hit("about", 10.0)];
        assert_eq!(tracker.observe(&batch, 99.0), Some("home".to_string()));
        assert_eq!(tracker.observe(&[], 0.0), None);
        assert_eq!(tracker.observe(&batch, 100.0), Some("about".to_string()));
    }

    #[test]
    fn test_reports_transition_once() {
        let mut tracker = tracker();
        let batch = [hit("about", 5.0)];
        assert!(tracker.observe(&batch, 500.0).is_some());
        assert!(tracker.observe(&batch, 510.0).is_none());
        assert!(tracker.observe(&batch, 520.0).is_none());
        assert_eq!(tracker.navigate_to("about"), None);
        assert_eq!(tracker.navigate_to("contact"), Some("contact".to_string()));
    }

    #[test]
    fn test_sub_page_short_circuits() {
        let mut tracker = tracker();
        tracker.observe(&[hit("about", 0.0)], 500.0);

        assert_eq!(tracker.set_route("/resume"), RouteChange::Detach);
        assert_eq!(tracker.active_indicator(), Some("/resume"));
        assert!(!tracker.is_observing());
        assert_eq!(tracker.observe(&[hit("skills", 0.0)], 500.0), None);
        assert_eq!(tracker.observe(&[], 0.0), None);
        assert_eq!(tracker.navigate_to("skills"), None);

        assert_eq!(tracker.set_route("/resume"), RouteChange::Unchanged);
        assert_eq!(tracker.set_route("/certifications"), RouteChange::Unchanged);
        assert_eq!(tracker.active_indicator(), Some("/certifications"));

        assert_eq!(tracker.set_route("/"), RouteChange::Attach);
        assert_eq!(tracker.active(), &ActiveSection::None);
        assert_eq!(tracker.observe(&[hit("about", 0.0)], 500.0), Some("about".to_string()));
        assert_eq!(tracker.set_route("/"), RouteChange::Unchanged);
    }

    #[test]
    fn test_transitions_count_visits() {
        let backend = MemoryStorage::new();
        let mut state = InteractionState::load_at(backend, TelemetryConfig::default(), 0);
        let mut tracker = tracker();

        for scroll_y in [0.0, 20.0, 60.0] {
            tracker.observe_into(&mut state, &[], scroll_y);
        }
        tracker.observe_into(&mut state, &[hit("about", 10.0)], 600.0);
        tracker.observe_into(&mut state, &[hit("about", -10.0)], 700.0);
        tracker.navigate_into(&mut state, "home");
        tracker.observe_into(&mut state, &[hit("about", 0.0)], 650.0);

        assert_eq!(state.record().section_visits("home"), 2);
        assert_eq!(state.record().section_visits("about"), 2);
    }
}
