//! Bounded undo/redo history over drawing snapshots
//!
//! The last entry of the undo sequence is always the state currently on
//! screen, so stepping back needs at least two entries. The first snapshot
//! pushed after construction or `clear()` acts as a floor that can never be
//! undone past.

use doc_model::Snapshot;
use std::collections::VecDeque;

/// Default number of snapshots kept on the undo side
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Linear undo/redo stack for one document
#[derive(Debug, Clone)]
pub struct HistoryStack {
    /// Oldest first; back is the current state
    undo: VecDeque<Snapshot>,

    /// Most recently undone last
    redo: Vec<Snapshot>,

    /// Maximum length of `undo`
    limit: usize,
}

impl HistoryStack {
    /// Create an empty stack with the default limit
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }

    /// Create an empty stack keeping at most `limit` undo entries
    ///
    /// A limit of zero is treated as one so the current state always fits.
    pub fn with_limit(limit: usize) -> Self {
        let limit = limit.max(1);
        Self { undo: VecDeque::with_capacity(limit + 1), redo: Vec::new(), limit }
    }

    /// Record `snapshot` as the new current state
    ///
    /// Any redo entries are discarded. When the undo side grows past the
    /// limit the oldest entry is dropped.
    pub fn push(&mut self, snapshot: Snapshot) {
        self.undo.push_back(snapshot);
        self.redo.clear();

        if self.undo.len() > self.limit {
            self.undo.pop_front();
        }
    }

    /// Step back one state
    ///
    /// Returns the prior snapshot, or `None` when only the floor state is left
    /// (the stack is not modified in that case).
    pub fn undo(&mut self) -> Option<Snapshot> {
        if !self.can_undo() {
            return None;
        }

        let current = self.undo.pop_back()?;
        self.redo.push(current);
        self.undo.back().cloned()
    }

    /// Step forward to the most recently undone state
    pub fn redo(&mut self) -> Option<Snapshot> {
        let next = self.redo.pop()?;
        self.undo.push_back(next.clone());
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        self.undo.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Drop every entry on both sides
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    /// The state at the top of the undo side, if any
    pub fn current(&self) -> Option<&Snapshot> {
        self.undo.back()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl Default for HistoryStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(n: u32) -> Snapshot {
        Snapshot::from_bytes(format!("ink-{n}").into_bytes())
    }

    #[test]
    fn test_new_stack_has_nothing_to_step() {
        let mut history = HistoryStack::new();
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert_eq!(history.undo(), None);
        assert_eq!(history.redo(), None);
        assert_eq!(history.limit(), DEFAULT_HISTORY_LIMIT);
    }

    #[test]
    fn test_first_push_is_a_floor() {
        let mut history = HistoryStack::new();
        history.push(snap(0));

        assert!(!history.can_undo());
        assert_eq!(history.undo(), None);
        assert_eq!(history.undo_depth(), 1);
        assert_eq!(history.current(), Some(&snap(0)));
    }

    #[test]
    fn test_can_undo_tracks_push_count() {
        let mut history = HistoryStack::new();
        for n in 0..30 {
            history.push(snap(n));
            assert_eq!(history.can_undo(), n >= 1, "after push #{}", n + 1);
        }

        history.clear();
        history.push(snap(99));
        assert!(!history.can_undo());
    }

    #[test]
    fn test_undo_returns_prior_state() {
        let mut history = HistoryStack::new();
        history.push(snap(1));
        history.push(snap(2));
        history.push(snap(3));

        assert_eq!(history.undo(), Some(snap(2)));
        assert_eq!(history.undo(), Some(snap(1)));
        assert_eq!(history.undo(), None);
        assert_eq!(history.current(), Some(&snap(1)));
        assert_eq!(history.redo_depth(), 2);
    }

    #[test]
    fn test_undo_then_redo_round_trips() {
        let mut history = HistoryStack::new();
        for n in 0..5 {
            history.push(snap(n));
        }

        while history.can_undo() {
            let before = history.current().cloned();
            history.undo().expect("undo available");
            assert_eq!(history.redo(), before);
            history.undo();
        }
    }

    #[test]
    fn test_push_clears_redo() {
        let mut history = HistoryStack::new();
        history.push(snap(1));
        history.push(snap(2));
        history.undo();
        assert!(history.can_redo());

        history.push(snap(3));
        assert!(!history.can_redo());
        assert_eq!(history.redo(), None);
        assert_eq!(history.undo(), Some(snap(1)));
    }

    #[test]
    fn test_limit_discards_oldest() {
        let mut history = HistoryStack::new();
        for n in 1..=21 {
            history.push(snap(n));
        }
        assert_eq!(history.undo_depth(), DEFAULT_HISTORY_LIMIT);

        let mut reached = Vec::new();
        while let Some(snapshot) = history.undo() {
            reached.push(snapshot);
        }

        assert_eq!(reached.last(), Some(&snap(2)));
        assert!(!reached.contains(&snap(1)));
        assert_eq!(reached.len(), DEFAULT_HISTORY_LIMIT - 1);
    }

    #[test]
    fn test_custom_limit() {
        let mut history = HistoryStack::with_limit(3);
        for n in 0..10 {
            history.push(snap(n));
        }
        assert_eq!(history.undo_depth(), 3);
        assert_eq!(history.undo(), Some(snap(8)));
        assert_eq!(history.undo(), Some(snap(7)));
        assert_eq!(history.undo(), None);
    }

    #[test]
    fn test_zero_limit_keeps_current() {
        let mut history = HistoryStack::with_limit(0);
        history.push(snap(1));
        history.push(snap(2));
        assert_eq!(history.limit(), 1);
        assert_eq!(history.current(), Some(&snap(2)));
        assert!(!history.can_undo());
    }

    #[test]
    fn test_clear_empties_both_sides() {
        let mut history = HistoryStack::new();
        history.push(snap(1));
        history.push(snap(2));
        history.undo();

        history.clear();
        assert_eq!(history.undo_depth(), 0);
        assert_eq!(history.redo_depth(), 0);
        assert!(history.current().is_none());
    }
}
