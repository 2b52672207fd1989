//! Serialized annotation session
//!
//! A [`Session`] owns the state registry and update coordinator. All
//! mutations go through [`Session::handle`], which takes `&mut self`, so
//! whoever owns the session is the single execution context for every
//! document's state and history. The session never performs I/O itself: a
//! save request becomes an [`Effect::Persist`] job and its outcome comes back
//! later as [`Command::SaveCompleted`].

use crate::config::SessionConfig;
use crate::coordinator::{UpdateCoordinator, UpdateOutcome};
use crate::document::DocumentView;
use crate::gateway::SaveJob;
use crate::registry::StateRegistry;
use doc_model::{DocumentKey, SavedPaths, Snapshot, DEFAULT_FILE_NAME};
use std::time::Instant;

/// Input to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// The drawing surface reported a new snapshot
    SnapshotChanged { key: DocumentKey, snapshot: Snapshot, observed_at: Instant },
    /// A previously saved snapshot was loaded for the document
    LoadBaseline { key: DocumentKey, snapshot: Snapshot },
    Undo { key: DocumentKey },
    Redo { key: DocumentKey },
    /// Persist the document; `live` is the surface's current ink if available
    Save {
        key: DocumentKey,
        file_name: Option<String>,
        source: Vec<u8>,
        live: Option<Snapshot>,
    },
    /// Outcome of an earlier persistence job
    SaveCompleted { key: DocumentKey, result: Result<SavedPaths, String> },
    /// Forget the document's state and history
    Clear { key: DocumentKey },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    Undo,
    Redo,
}

/// Output for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    StateChanged(DocumentView),
    /// Undo or redo was requested with nothing to step to
    NothingTo { key: DocumentKey, action: HistoryAction },
    Saved { key: DocumentKey, paths: SavedPaths },
    /// Non-fatal; in-memory state is untouched and the save can be retried
    SaveFailed { key: DocumentKey, reason: String },
    Cleared { key: DocumentKey },
}

/// What the owner of a session must do after handling a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Notify(Notification),
    Persist(SaveJob),
}

#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    registry: StateRegistry,
    coordinator: UpdateCoordinator,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            registry: StateRegistry::with_history_limit(config.history_limit),
            coordinator: UpdateCoordinator::new(config.debounce_interval),
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn registry(&self) -> &StateRegistry {
        &self.registry
    }

    /// Current view of `key`, creating a blank state if it is unknown
    pub fn view(&mut self, key: &DocumentKey) -> DocumentView {
        self.registry.get_state(key).view(key)
    }

    pub fn handle(&mut self, command: Command) -> Vec<Effect> {
        match command {
            Command::SnapshotChanged { key, snapshot, observed_at } => {
                match self.coordinator.snapshot_changed(
                    &mut self.registry,
                    &key,
                    snapshot,
                    observed_at,
                ) {
                    UpdateOutcome::Accepted => vec![self.state_changed(&key)],
                    UpdateOutcome::Dropped { .. } => Vec::new(),
                }
            }
            Command::LoadBaseline { key, snapshot } => {
                self.coordinator.load_baseline(&mut self.registry, &key, snapshot);
                vec![self.state_changed(&key)]
            }
            Command::Undo { key } => self.step(key, HistoryAction::Undo),
            Command::Redo { key } => self.step(key, HistoryAction::Redo),
            Command::Save { key, file_name, source, live } => {
                let snapshot = match live {
                    Some(live) => live,
                    None => self.registry.get_state(&key).current().clone(),
                };
                let file_name = file_name.unwrap_or_else(|| DEFAULT_FILE_NAME.to_owned());
                log::info!("saving {key} as {file_name} ({} byte ink layer)", snapshot.len());
                vec![Effect::Persist(SaveJob { key, file_name, source, snapshot })]
            }
            Command::SaveCompleted { key, result } => match result {
                Ok(paths) => {
                    log::info!("saved {key} to {}", paths.pdf.display());
                    vec![Effect::Notify(Notification::Saved { key, paths })]
                }
                Err(reason) => {
                    log::warn!("failed to save {key}: {reason}");
                    vec![Effect::Notify(Notification::SaveFailed { key, reason })]
                }
            },
            Command::Clear { key } => {
                self.registry.clear_state(&key);
                self.coordinator.forget(&key);
                vec![Effect::Notify(Notification::Cleared { key })]
            }
        }
    }

    fn step(&mut self, key: DocumentKey, action: HistoryAction) -> Vec<Effect> {
        let state = self.registry.get_state(&key);
        let stepped = match action {
            HistoryAction::Undo => state.undo(),
            HistoryAction::Redo => state.redo(),
        };

        match stepped {
            Some(_) => {
                log::debug!("{action:?} on {key}");
                vec![self.state_changed(&key)]
            }
            None => vec![Effect::Notify(Notification::NothingTo { key, action })],
        }
    }

    fn state_changed(&mut self, key: &DocumentKey) -> Effect {
        Effect::Notify(Notification::StateChanged(self.view(key)))
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use std::path::PathBuf;

    fn snap(text: &str) -> Snapshot {
        Snapshot::from_bytes(text.as_bytes().to_vec())
    }

    fn changed(key: &DocumentKey, text: &str, clock: &ManualClock) -> Command {
        Command::SnapshotChanged { key: key.clone(), snapshot: snap(text), observed_at: clock.now() }
    }

    fn views(effects: &[Effect]) -> Vec<&DocumentView> {
        effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::Notify(Notification::StateChanged(view)) => Some(view),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_accepted_edit_notifies() {
        let mut session = Session::default();
        let clock = ManualClock::new();
        let key = DocumentKey::from("doc");

        let effects = session.handle(changed(&key, "a", &clock));
        let views = views(&effects);
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].current, snap("a"));
        assert!(views[0].can_undo);
    }

    #[test]
    fn test_dropped_edit_is_silent() {
        let mut session = Session::default();
        let clock = ManualClock::new();
        let key = DocumentKey::from("doc");

        session.handle(changed(&key, "a", &clock));
        clock.advance_ms(10);
        assert!(session.handle(changed(&key, "ab", &clock)).is_empty());
        assert_eq!(session.view(&key).current, snap("a"));
    }

    #[test]
    fn test_undo_redo_notifications() {
        let mut session = Session::default();
        let clock = ManualClock::new();
        let key = DocumentKey::from("doc");

        session.handle(changed(&key, "a", &clock));
        clock.advance_ms(100);
        session.handle(changed(&key, "ab", &clock));

        let effects = session.handle(Command::Undo { key: key.clone() });
        assert_eq!(views(&effects)[0].current, snap("a"));
        assert!(views(&effects)[0].can_redo);

        let effects = session.handle(Command::Redo { key: key.clone() });
        assert_eq!(views(&effects)[0].current, snap("ab"));

        let effects = session.handle(Command::Redo { key: key.clone() });
        assert_eq!(
            effects,
            vec![Effect::Notify(Notification::NothingTo { key, action: HistoryAction::Redo })]
        );
    }

    #[test]
    fn test_undo_on_fresh_document_is_noop() {
        let mut session = Session::default();
        let key = DocumentKey::from("fresh");

        let effects = session.handle(Command::Undo { key: key.clone() });
        assert_eq!(
            effects,
            vec![Effect::Notify(Notification::NothingTo { key, action: HistoryAction::Undo })]
        );
    }

    #[test]
    fn test_undo_does_not_grow_history() {
        let mut session = Session::default();
        let clock = ManualClock::new();
        let key = DocumentKey::from("doc");

        session.handle(changed(&key, "a", &clock));
        clock.advance_ms(100);
        session.handle(changed(&key, "ab", &clock));
        session.handle(Command::Undo { key: key.clone() });

        let view = session.view(&key);
        assert_eq!(view.undo_depth, 2);
        assert_eq!(view.redo_depth, 1);
    }

    #[test]
    fn test_baseline_is_committed() {
        let mut session = Session::default();
        let key = DocumentKey::from("doc");

        let effects = session.handle(Command::LoadBaseline { key: key.clone(), snapshot: snap("saved") });
        assert_eq!(views(&effects)[0].current, snap("saved"));
        assert_eq!(session.view(&key).undo_depth, 2);
    }

    #[test]
    fn test_save_prefers_live_snapshot() {
        let mut session = Session::default();
        let clock = ManualClock::new();
        let key = DocumentKey::from("doc");
        session.handle(changed(&key, "a", &clock));

        let effects = session.handle(Command::Save {
            key: key.clone(),
            file_name: Some("notes.pdf".into()),
            source: b"%PDF".to_vec(),
            live: Some(snap("abc")),
        });

        assert_eq!(
            effects,
            vec![Effect::Persist(SaveJob {
                key: key.clone(),
                file_name: "notes.pdf".into(),
                source: b"%PDF".to_vec(),
                snapshot: snap("abc"),
            })]
        );
        assert_eq!(session.view(&key).current, snap("a"));
    }

    #[test]
    fn test_save_falls_back_to_current_and_default_name() {
        let mut session = Session::default();
        let clock = ManualClock::new();
        let key = DocumentKey::from("doc");
        session.handle(changed(&key, "a", &clock));

        let effects =
            session.handle(Command::Save { key, file_name: None, source: Vec::new(), live: None });
        let Effect::Persist(job) = &effects[0] else {
            panic!("expected a persist effect, got {effects:?}");
        };
        assert_eq!(job.file_name, DEFAULT_FILE_NAME);
        assert_eq!(job.snapshot, snap("a"));
    }

    #[test]
    fn test_failed_save_leaves_state_untouched() {
        let mut session = Session::default();
        let clock = ManualClock::new();
        let key = DocumentKey::from("doc");
        session.handle(changed(&key, "a", &clock));
        let before = session.view(&key);

        let effects = session.handle(Command::SaveCompleted {
            key: key.clone(),
            result: Err("disk full".into()),
        });

        assert_eq!(
            effects,
            vec![Effect::Notify(Notification::SaveFailed {
                key: key.clone(),
                reason: "disk full".into()
            })]
        );
        assert_eq!(session.view(&key), before);
    }

    #[test]
    fn test_successful_save_notifies_paths() {
        let mut session = Session::default();
        let key = DocumentKey::from("doc");
        let paths = SavedPaths { pdf: PathBuf::from("/l/a.pdf"), drawing: PathBuf::from("/l/a.drawing") };

        let effects = session.handle(Command::SaveCompleted { key: key.clone(), result: Ok(paths.clone()) });
        assert_eq!(effects, vec![Effect::Notify(Notification::Saved { key, paths })]);
    }

    #[test]
    fn test_clear_resets_state_and_gate() {
        let mut session = Session::default();
        let clock = ManualClock::new();
        let key = DocumentKey::from("doc");
        session.handle(changed(&key, "a", &clock));

        let effects = session.handle(Command::Clear { key: key.clone() });
        assert_eq!(effects, vec![Effect::Notify(Notification::Cleared { key: key.clone() })]);
        assert!(!session.registry().contains(&key));

        let effects = session.handle(changed(&key, "b", &clock));
        assert_eq!(views(&effects)[0].current, snap("b"));
    }

    #[test]
    fn test_config_is_applied() {
        let config = SessionConfig::new().with_history_limit(2);
        let mut session = Session::new(config.clone());
        let clock = ManualClock::new();
        let key = DocumentKey::from("doc");

        for text in ["a", "b", "c"] {
            session.handle(changed(&key, text, &clock));
            clock.advance_ms(100);
        }

        assert_eq!(session.config(), &config);
        assert_eq!(session.view(&key).undo_depth, 2);
    }
}
