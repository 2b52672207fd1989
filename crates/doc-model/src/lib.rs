use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// File name used when a document has no storage location of its own.
pub const DEFAULT_FILE_NAME: &str = "Untitled.pdf";

/// Extension of the sidecar file holding a document's ink layer.
pub const DRAWING_EXTENSION: &str = "drawing";

/// One complete state of a document's ink annotations.
///
/// The bytes are owned by the editing surface and never interpreted here.
/// Equality is structural and clones share the underlying buffer, so history
/// entries are cheap to keep around.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<u8>", into = "Vec<u8>")]
pub struct Snapshot(Arc<[u8]>);

impl Snapshot {
    pub fn blank() -> Self {
        Self::default()
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes: Vec<u8> = bytes.into();
        Self(Arc::from(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_blank(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self(Arc::from(Vec::<u8>::new()))
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Snapshot({} bytes)", self.0.len())
    }
}

impl From<Vec<u8>> for Snapshot {
    fn from(value: Vec<u8>) -> Self {
        Self::from_bytes(value)
    }
}

impl From<&[u8]> for Snapshot {
    fn from(value: &[u8]) -> Self {
        Self(Arc::from(value))
    }
}

impl From<Snapshot> for Vec<u8> {
    fn from(value: Snapshot) -> Self {
        value.0.to_vec()
    }
}

/// Identifies an open document for the lifetime of a session.
///
/// Documents with a storage location are keyed by that location, so opening
/// the same file twice resolves to the same state. Documents without one get
/// a random token.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentKey(String);

impl DocumentKey {
    pub fn for_location(location: Option<&Path>) -> Self {
        match location {
            Some(path) => Self::from_path(path),
            None => Self::fresh(),
        }
    }

    pub fn from_path(path: &Path) -> Self {
        Self(path.to_string_lossy().into_owned())
    }

    pub fn fresh() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentKey {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for DocumentKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Paths written by a successful save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedPaths {
    pub pdf: PathBuf,
    pub drawing: PathBuf,
}

/// A document found in the local library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedDocument {
    pub id: uuid::Uuid,
    pub file_name: String,
    pub file_path: PathBuf,
    pub drawing_path: PathBuf,
    pub date_created: SystemTime,
    pub last_modified: Option<SystemTime>,
}

impl SavedDocument {
    pub fn key(&self) -> DocumentKey {
        DocumentKey::from_path(&self.file_path)
    }
}

/// Sidecar path for a PDF's ink layer: `notes.pdf` -> `notes.drawing`.
pub fn drawing_path(pdf_path: &Path) -> PathBuf {
    pdf_path.with_extension(DRAWING_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshots_compare_by_content() {
        let a = Snapshot::from_bytes(b"stroke".to_vec());
        let b = Snapshot::from(&b"stroke"[..]);

        assert_eq!(a, b);
        assert_ne!(a, Snapshot::blank());
        assert!(Snapshot::default().is_blank());
        assert_eq!(a.len(), 6);
    }

    #[test]
    fn snapshot_serializes_as_plain_bytes() {
        let snapshot = Snapshot::from_bytes(vec![1, 2, 3]);
        let json = serde_json::to_string(&snapshot).expect("serialize");
        assert_eq!(json, "[1,2,3]");

        let back: Snapshot = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, snapshot);
    }

    #[test]
    fn same_location_resolves_to_same_key() {
        let path = Path::new("/library/notes.pdf");
        assert_eq!(DocumentKey::for_location(Some(path)), DocumentKey::from_path(path));
        assert_eq!(DocumentKey::from_path(path).as_str(), "/library/notes.pdf");
    }

    #[test]
    fn unsaved_documents_get_distinct_keys() {
        let first = DocumentKey::for_location(None);
        let second = DocumentKey::for_location(None);
        assert_ne!(first, second);
    }

    #[test]
    fn drawing_sidecar_replaces_pdf_extension() {
        assert_eq!(
            drawing_path(Path::new("/library/notes.pdf")),
            PathBuf::from("/library/notes.drawing")
        );
    }
}
