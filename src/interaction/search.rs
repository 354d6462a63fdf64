use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::graph_utils::model::EntryId;
use crate::query::GraphSnapshot;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Graph search box state. Typing restarts a single debounce timer; the match set is only
/// recomputed once that timer has elapsed, or immediately when the box is cleared.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchState {
    input: String,
    due: Option<Instant>,
    query: String,
    matches: HashSet<EntryId>,
    debounce: Duration,
}

impl Default for SearchState {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl SearchState {
    pub fn new(debounce: Duration) -> Self {
        Self { input: String::new(), due: None, query: String::new(), matches: HashSet::new(), debounce }
    }

    /// Text currently in the box.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Query the current match set was computed from.
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn matches(&self) -> &HashSet<EntryId> {
        &self.matches
    }

    /// Match styling applies only while at least one node matches.
    pub fn is_active(&self) -> bool {
        !self.matches.is_empty()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.due
    }

    pub fn is_pending(&self) -> bool {
        self.due.is_some()
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Record a keystroke; cancels any pending recompute and schedules a new one.
    pub fn type_text(&mut self, text: &str, at: Instant) {
        self.input = text.to_string();
        self.due = Some(at + self.debounce);
    }

    /// Apply the pending query if its timer has elapsed. Returns true if matches were recomputed.
    pub fn poll(&mut self, now: Instant, graph: &GraphSnapshot) -> bool {
        match self.due {
            Some(due) if now >= due => {
                self.due = None;
                self.query = self.input.trim().to_string();
                self.matches = graph.search_matches(&self.query);
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        self.input.clear();
        self.query.clear();
        self.matches.clear();
        self.due = None;
    }

    /// Recompute the applied query against a new graph.
    pub fn refresh(&mut self, graph: &GraphSnapshot) {
        self.matches = graph.search_matches(&self.query);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keystrokes_restart_the_timer() {
        let graph = GraphSnapshot::default();
        let t0 = Instant::now();
        let mut s = SearchState::default();
        s.type_text("re", t0);
        s.type_text("rea", t0 + Duration::from_millis(200));
        assert!(!s.poll(t0 + Duration::from_millis(350), &graph));
        assert!(s.poll(t0 + Duration::from_millis(500), &graph));
        assert_eq!(s.query(), "rea");
        assert!(!s.is_pending());
    }

    #[test]
    fn clear_is_immediate() {
        let mut s = SearchState::default();
        s.type_text("x", Instant::now());
        s.clear();
        assert!(!s.is_pending());
        assert_eq!(s.input(), "");
        assert!(!s.is_active());
    }
}
