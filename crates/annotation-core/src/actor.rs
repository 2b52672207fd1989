//! Threaded host for a [`Session`]
//!
//! The session lives on one dedicated thread and is only reachable through a
//! channel, so registry lookups and history pushes can never interleave.
//! Gateway writes run on a second thread; their results are posted back onto
//! the session channel and turned into notifications there.

use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::document::DocumentView;
use crate::gateway::{PersistenceGateway, SaveJob};
use crate::session::{Command, Effect, Notification, Session};
use doc_model::{DocumentKey, Snapshot};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("annotation session has shut down")]
    Disconnected,
}

enum Message {
    Command(Command),
    Inspect { key: DocumentKey, reply: Sender<DocumentView> },
    Shutdown,
}

/// Cloneable sender side of a running session
///
/// Surface updates are stamped with the handle's clock when they are sent,
/// which is the moment the change was observed.
#[derive(Clone)]
pub struct SessionHandle {
    tx: Sender<Message>,
    clock: Arc<dyn Clock>,
}

impl SessionHandle {
    pub fn send(&self, command: Command) -> Result<(), SessionError> {
        self.tx.send(Message::Command(command)).map_err(|_| SessionError::Disconnected)
    }

    pub fn snapshot_changed(&self, key: &DocumentKey, snapshot: Snapshot) -> Result<(), SessionError> {
        let observed_at = self.clock.now();
        self.send(Command::SnapshotChanged { key: key.clone(), snapshot, observed_at })
    }

    pub fn load_baseline(&self, key: &DocumentKey, snapshot: Snapshot) -> Result<(), SessionError> {
        self.send(Command::LoadBaseline { key: key.clone(), snapshot })
    }

    pub fn undo(&self, key: &DocumentKey) -> Result<(), SessionError> {
        self.send(Command::Undo { key: key.clone() })
    }

    pub fn redo(&self, key: &DocumentKey) -> Result<(), SessionError> {
        self.send(Command::Redo { key: key.clone() })
    }

    pub fn save(
        &self,
        key: &DocumentKey,
        file_name: Option<String>,
        source: Vec<u8>,
        live: Option<Snapshot>,
    ) -> Result<(), SessionError> {
        self.send(Command::Save { key: key.clone(), file_name, source, live })
    }

    pub fn clear(&self, key: &DocumentKey) -> Result<(), SessionError> {
        self.send(Command::Clear { key: key.clone() })
    }

    /// Current view of `key`, after every command sent before this call
    pub fn inspect(&self, key: &DocumentKey) -> Result<DocumentView, SessionError> {
        let (reply, response) = mpsc::channel();
        self.tx
            .send(Message::Inspect { key: key.clone(), reply })
            .map_err(|_| SessionError::Disconnected)?;
        response.recv().map_err(|_| SessionError::Disconnected)
    }
}

/// Owns the session thread and its I/O thread
pub struct SessionActor {
    handle: SessionHandle,
    thread: Option<JoinHandle<()>>,
}

impl SessionActor {
    /// Start a session that reports to `notifications`
    pub fn spawn<G: PersistenceGateway>(
        config: SessionConfig,
        clock: Arc<dyn Clock>,
        gateway: G,
        notifications: Sender<Notification>,
    ) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let (io_tx, io_rx) = mpsc::channel();

        let io_thread = thread::Builder::new()
            .name("inkpaper-io".to_string())
            .spawn({
                let tx = tx.clone();
                move || run_io(gateway, io_rx, tx)
            })?;

        let session = Session::new(config);
        let thread = thread::Builder::new()
            .name("inkpaper-session".to_string())
            .spawn(move || run_session(session, rx, io_tx, io_thread, notifications))?;

        Ok(Self { handle: SessionHandle { tx, clock }, thread: Some(thread) })
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Stop the session after pending commands and in-flight saves finish
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };

        let _ = self.handle.tx.send(Message::Shutdown);
        if thread.join().is_err() {
            log::error!("annotation session thread panicked");
        }
    }
}

impl Drop for SessionActor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_io<G: PersistenceGateway>(gateway: G, jobs: Receiver<SaveJob>, session: Sender<Message>) {
    for job in jobs {
        let result = gateway.save(&job).map_err(|err| err.to_string());
        let done = Command::SaveCompleted { key: job.key, result };
        if session.send(Message::Command(done)).is_err() {
            break;
        }
    }
}

fn run_session(
    mut session: Session,
    rx: Receiver<Message>,
    io_tx: Sender<SaveJob>,
    io_thread: JoinHandle<()>,
    notifications: Sender<Notification>,
) {
    let mut dispatch = Dispatch { io_tx: Some(io_tx), notifications };

    for message in rx.iter() {
        match message {
            Message::Command(command) => dispatch.apply(session.handle(command)),
            Message::Inspect { key, reply } => {
                let _ = reply.send(session.view(&key));
            }
            Message::Shutdown => break,
        }
    }

    // Let in-flight saves finish, then report their results.
    dispatch.io_tx = None;
    if io_thread.join().is_err() {
        log::error!("annotation I/O thread panicked");
    }

    while let Ok(message) = rx.try_recv() {
        match message {
            Message::Command(command) => dispatch.apply(session.handle(command)),
            Message::Inspect { key, reply } => {
                let _ = reply.send(session.view(&key));
            }
            Message::Shutdown => {}
        }
    }
}

struct Dispatch {
    io_tx: Option<Sender<SaveJob>>,
    notifications: Sender<Notification>,
}

impl Dispatch {
    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Notify(notification) => self.notify(notification),
                Effect::Persist(job) => {
                    let key = job.key.clone();
                    let queued = match &self.io_tx {
                        Some(io_tx) => io_tx.send(job).is_ok(),
                        None => false,
                    };
                    if !queued {
                        self.notify(Notification::SaveFailed {
                            key,
                            reason: "session is shutting down".to_string(),
                        });
                    }
                }
            }
        }
    }

    fn notify(&self, notification: Notification) {
        if self.notifications.send(notification).is_err() {
            log::trace!("notification dropped, no listener");
        }
    }
}
