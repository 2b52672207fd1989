//! InkPaper annotation core
//!
//! Per-document ink history, the session registry that owns it, and the
//! rate-limited path from a live drawing surface into that history.
//!
//! # Example
//!
//! ```
//! use annotation_core::{Command, Session, SessionConfig};
//! use doc_model::{DocumentKey, Snapshot};
//! use std::time::Instant;
//!
//! let mut session = Session::new(SessionConfig::default());
//! let key = DocumentKey::from("notes.pdf");
//!
//! session.handle(Command::SnapshotChanged {
//!     key: key.clone(),
//!     snapshot: Snapshot::from_bytes(b"stroke".to_vec()),
//!     observed_at: Instant::now(),
//! });
//! session.handle(Command::Undo { key: key.clone() });
//!
//! assert!(session.view(&key).current.is_blank());
//! assert!(session.view(&key).can_redo);
//! ```

mod actor;
mod clock;
mod config;
mod coordinator;
mod document;
mod gateway;
mod history;
mod registry;
mod session;

pub use actor::{SessionActor, SessionError, SessionHandle};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, SessionConfig, DEFAULT_DEBOUNCE_INTERVAL};
pub use coordinator::{RateLimiter, UpdateCoordinator, UpdateOutcome};
pub use document::{DocumentState, DocumentView};
pub use gateway::{PersistenceGateway, SaveJob};
pub use history::{HistoryStack, DEFAULT_HISTORY_LIMIT};
pub use registry::StateRegistry;
pub use session::{Command, Effect, HistoryAction, Notification, Session};
