//! Session-wide map from document key to annotation state

use crate::document::DocumentState;
use crate::history::{HistoryStack, DEFAULT_HISTORY_LIMIT};
use doc_model::{DocumentKey, Snapshot};
use std::collections::HashMap;

/// Owns every [`DocumentState`] opened during a session
///
/// States are created on first reference and live until `clear_state`.
/// Lookups never fail: an unknown key yields a fresh blank state.
#[derive(Debug)]
pub struct StateRegistry {
    states: HashMap<DocumentKey, DocumentState>,
    history_limit: usize,
}

impl StateRegistry {
    pub fn new() -> Self {
        Self::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }

    /// Registry whose new states keep at most `limit` undo entries
    pub fn with_history_limit(limit: usize) -> Self {
        Self { states: HashMap::new(), history_limit: limit }
    }

    /// Existing state for `key`, or a new blank one stored under it
    pub fn get_state(&mut self, key: &DocumentKey) -> &mut DocumentState {
        let limit = self.history_limit;
        self.states.entry(key.clone()).or_insert_with(|| {
            log::debug!("creating annotation state for {key}");
            DocumentState::with_history(Snapshot::blank(), HistoryStack::with_limit(limit))
        })
    }

    /// Set `snapshot` as current for `key` and push it onto its history
    pub fn update_state(&mut self, key: &DocumentKey, snapshot: Snapshot) -> &mut DocumentState {
        let state = self.get_state(key);
        state.commit(snapshot);
        state
    }

    /// Forget `key`; the next lookup starts from a blank state
    pub fn clear_state(&mut self, key: &DocumentKey) -> Option<DocumentState> {
        self.states.remove(key)
    }

    /// Read-only lookup that does not create a state
    pub fn peek(&self, key: &DocumentKey) -> Option<&DocumentState> {
        self.states.get(key)
    }

    pub fn contains(&self, key: &DocumentKey) -> bool {
        self.states.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &DocumentKey> {
        self.states.keys()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }
}

impl Default for StateRegistry {
    fn default() -> Self {
        Self::new()
    }
}
