//! Local document library
//!
//! Each saved document is a PDF in the library root with its ink layer in a
//! sibling `<stem>.drawing` file. Both are written atomically through a
//! temporary file and a rename.

use annotation_core::{PersistenceGateway, SaveJob};
use directories::ProjectDirs;
use doc_model::{drawing_path, SavedDocument, SavedPaths, Snapshot};
use lopdf::{dictionary, Document, Object, Stream};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub const LIBRARY_DIR_ENV: &str = "INKPAPER_LIBRARY_DIR";

/// US Letter in PDF points
const BLANK_PAGE_SIZE: (i64, i64) = (612, 792);

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unable to resolve local data directory")]
    NoDataDirectory,
    #[error("invalid file name: {0:?}")]
    InvalidFileName(String),
    #[error("not a PDF file: {}", .0.display())]
    NotAPdf(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone)]
pub struct LibraryStore {
    root: PathBuf,
}

impl LibraryStore {
    pub fn from_default_project() -> Result<Self, StorageError> {
        let dirs = ProjectDirs::from("dev", "InkPaper", "InkPaper")
            .ok_or(StorageError::NoDataDirectory)?;

        Ok(Self { root: dirs.data_local_dir().join("library") })
    }

    /// Library at `INKPAPER_LIBRARY_DIR` if set, else the platform default
    pub fn from_env_or_default() -> Result<Self, StorageError> {
        match std::env::var_os(LIBRARY_DIR_ENV) {
            Some(dir) if !dir.is_empty() => Ok(Self::with_root(dir)),
            _ => Self::from_default_project(),
        }
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path a document named `file_name` is stored at
    ///
    /// Only plain `.pdf` names are accepted.
    pub fn document_path(&self, file_name: &str) -> Result<PathBuf, StorageError> {
        validate_file_name(file_name)?;
        let path = self.root.join(file_name);
        if !has_pdf_extension(&path) {
            return Err(StorageError::NotAPdf(path));
        }
        Ok(path)
    }

    /// Write the PDF bytes and ink layer for `file_name`
    pub fn save_document(
        &self,
        pdf_bytes: &[u8],
        file_name: &str,
        drawing: &Snapshot,
    ) -> Result<SavedPaths, StorageError> {
        let pdf = self.document_path(file_name)?;
        let drawing_file = drawing_path(&pdf);

        fs::create_dir_all(&self.root)?;
        write_atomic(&pdf, pdf_bytes)?;
        write_atomic(&drawing_file, drawing.as_bytes())?;

        log::debug!("wrote {} and {}", pdf.display(), drawing_file.display());
        Ok(SavedPaths { pdf, drawing: drawing_file })
    }

    /// Every PDF in the library, sorted by file name
    ///
    /// A missing library directory is an empty library.
    pub fn list_documents(&self) -> Result<Vec<SavedDocument>, StorageError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut documents = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() || !has_pdf_extension(&path) {
                continue;
            }

            let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
                log::warn!("skipping non UTF-8 file name {}", path.display());
                continue;
            };

            let metadata = fs::metadata(&path)?;
            documents.push(SavedDocument {
                id: uuid::Uuid::new_v4(),
                file_name: file_name.to_owned(),
                drawing_path: drawing_path(&path),
                date_created: metadata.created().unwrap_or_else(|_| SystemTime::now()),
                last_modified: metadata.modified().ok(),
                file_path: path,
            });
        }

        documents.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(documents)
    }

    /// Ink layer stored at `drawing_path`, or `None` if there is none
    pub fn load_drawing(&self, drawing_path: &Path) -> Result<Option<Snapshot>, StorageError> {
        match fs::read(drawing_path) {
            Ok(bytes) => Ok(Some(Snapshot::from_bytes(bytes))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Copy a PDF from outside the library in, replacing any file of the same name
    pub fn import(&self, source: &Path) -> Result<PathBuf, StorageError> {
        if !has_pdf_extension(source) {
            return Err(StorageError::NotAPdf(source.to_path_buf()));
        }

        let file_name = source
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| StorageError::InvalidFileName(source.display().to_string()))?;
        let destination = self.document_path(file_name)?;

        if is_same_file(source, &destination) {
            log::debug!("{} is already in the library", destination.display());
            return Ok(destination);
        }

        fs::create_dir_all(&self.root)?;
        let temp = temp_path(&destination);
        fs::copy(source, &temp)?;
        fs::rename(&temp, &destination)?;

        log::info!("imported {} into library", file_name);
        Ok(destination)
    }

    /// Write a one-page blank PDF named `Untitled-<uuid>.pdf`
    pub fn create_blank_document(&self) -> Result<PathBuf, StorageError> {
        let file_name = format!("Untitled-{}.pdf", uuid::Uuid::new_v4());
        let path = self.document_path(&file_name)?;

        fs::create_dir_all(&self.root)?;
        write_atomic(&path, &blank_pdf()?)?;

        log::info!("created blank document {}", path.display());
        Ok(path)
    }

    /// Remove a PDF and its ink layer; files already gone are ignored
    pub fn delete_document(&self, pdf_path: &Path) -> Result<(), StorageError> {
        remove_if_exists(pdf_path)?;
        remove_if_exists(&drawing_path(pdf_path))?;
        Ok(())
    }
}

impl PersistenceGateway for LibraryStore {
    type Error = StorageError;

    fn save(&self, job: &SaveJob) -> Result<SavedPaths, StorageError> {
        self.save_document(&job.source, &job.file_name, &job.snapshot)
    }
}

fn validate_file_name(file_name: &str) -> Result<(), StorageError> {
    let is_plain = !file_name.is_empty()
        && file_name != "."
        && file_name != ".."
        && !file_name.contains(['/', '\\']);

    if is_plain {
        Ok(())
    } else {
        Err(StorageError::InvalidFileName(file_name.to_owned()))
    }
}

fn has_pdf_extension(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()).is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    PathBuf::from(temp)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let temp = temp_path(path);
    fs::write(&temp, bytes)?;
    fs::rename(&temp, path)
}

fn blank_pdf() -> io::Result<Vec<u8>> {
    let (width, height) = BLANK_PAGE_SIZE;
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}
