//! Boundary to durable storage

use doc_model::{DocumentKey, SavedPaths, Snapshot};

/// Everything needed to write one document and its ink layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveJob {
    pub key: DocumentKey,
    pub file_name: String,
    pub source: Vec<u8>,
    pub snapshot: Snapshot,
}

/// Writes documents to durable storage
///
/// Implementations run on the session's I/O thread, never on the thread that
/// owns annotation state.
pub trait PersistenceGateway: Send + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    fn save(&self, job: &SaveJob) -> Result<SavedPaths, Self::Error>;
}
