//! Per-document annotation state
//!
//! Pairs the snapshot currently shown for a document with the history that
//! produced it.

use crate::history::HistoryStack;
use doc_model::{DocumentKey, Snapshot};

/// Current snapshot plus owned history for one open document
#[derive(Debug, Clone)]
pub struct DocumentState {
    current: Snapshot,
    history: HistoryStack,
}

impl DocumentState {
    /// Create a state showing `initial`
    ///
    /// The initial snapshot is pushed right away so the history floor matches
    /// what is on screen.
    pub fn new(initial: Snapshot) -> Self {
        Self::with_history(initial, HistoryStack::new())
    }

    /// Create a state with a preconfigured (usually empty) history
    pub fn with_history(initial: Snapshot, mut history: HistoryStack) -> Self {
        history.push(initial.clone());
        Self { current: initial, history }
    }

    pub fn current(&self) -> &Snapshot {
        &self.current
    }

    /// Replace the current snapshot without recording history
    pub fn set_current(&mut self, snapshot: Snapshot) {
        self.current = snapshot;
    }

    /// Record a forward edit: set it as current and push it
    pub fn commit(&mut self, snapshot: Snapshot) {
        self.current = snapshot.clone();
        self.history.push(snapshot);
    }

    /// Step back and apply the prior snapshot
    pub fn undo(&mut self) -> Option<Snapshot> {
        let previous = self.history.undo()?;
        self.set_current(previous.clone());
        Some(previous)
    }

    /// Step forward and apply the restored snapshot
    pub fn redo(&mut self) -> Option<Snapshot> {
        let next = self.history.redo()?;
        self.set_current(next.clone());
        Some(next)
    }

    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Read model handed to the presentation layer
    pub fn view(&self, key: &DocumentKey) -> DocumentView {
        DocumentView {
            key: key.clone(),
            current: self.current.clone(),
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
            undo_depth: self.history.undo_depth(),
            redo_depth: self.history.redo_depth(),
        }
    }
}

impl Default for DocumentState {
    fn default() -> Self {
        Self::new(Snapshot::blank())
    }
}

/// What the UI needs to render a document's ink layer and toolbar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentView {
    pub key: DocumentKey,
    pub current: Snapshot,
    pub can_undo: bool,
    pub can_redo: bool,
    pub undo_depth: usize,
    pub redo_depth: usize,
}
