use annotation_core::{ManualClock, Notification, SessionActor, SessionConfig, SessionHandle};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use doc_model::{drawing_path, DocumentKey, Snapshot};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use storage::LibraryStore;

#[derive(Debug, Parser)]
#[command(name = "inkpaper-cli")]
#[command(about = "InkPaper annotation library CLI")]
pub struct Cli {
    /// Library directory (defaults to $INKPAPER_LIBRARY_DIR, then the platform data directory).
    #[arg(long, global = true, value_name = "DIR")]
    library: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the saved documents as JSON.
    List,
    /// Create a blank one-page document in the library.
    New,
    /// Copy a PDF into the library.
    Import {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Print details of one saved document as JSON.
    Show {
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Remove a document and its ink layer from the library.
    Delete {
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Replay an ink script against a saved document.
    Annotate {
        #[arg(value_name = "NAME")]
        name: String,
        #[arg(long, value_name = "FILE")]
        script: PathBuf,
    },
    /// Print CLI version.
    Version,
}

/// One step of an annotation script
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum ScriptStep {
    /// The surface now shows `ink`, `after_ms` after the previous step.
    Draw {
        ink: String,
        #[serde(default)]
        after_ms: u64,
    },
    Undo,
    Redo,
    Save,
}

#[derive(Debug, Serialize)]
struct ListEntry {
    created_unix: Option<u64>,
    drawing_path: String,
    file_name: String,
    has_drawing: bool,
    modified_unix: Option<u64>,
    pdf_path: String,
}

#[derive(Debug, Serialize)]
struct ShowOutput {
    drawing_bytes: Option<usize>,
    drawing_path: String,
    file_name: String,
    pdf_bytes: u64,
    pdf_path: String,
}

#[derive(Debug, Serialize)]
struct AnnotateOutput {
    can_redo: bool,
    can_undo: bool,
    current_ink: String,
    document: String,
    redo_depth: usize,
    saves: Vec<SaveOutput>,
    undo_depth: usize,
}

#[derive(Debug, Serialize)]
struct SaveOutput {
    error: Option<String>,
    saved: bool,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    if let Commands::Version = cli.command {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let store = match cli.library {
        Some(root) => LibraryStore::with_root(root),
        None => LibraryStore::from_env_or_default().context("failed to locate library")?,
    };

    match cli.command {
        Commands::List => run_list(&store),
        Commands::New => run_new(&store),
        Commands::Import { file } => run_import(&store, &file),
        Commands::Show { name } => run_show(&store, &name),
        Commands::Delete { name } => run_delete(&store, &name),
        Commands::Annotate { name, script } => run_annotate(&store, &name, &script),
        Commands::Version => Ok(()),
    }
}

fn run_list(store: &LibraryStore) -> Result<()> {
    let documents = store.list_documents().context("failed to list library")?;

    let entries: Vec<ListEntry> = documents
        .into_iter()
        .map(|doc| ListEntry {
            created_unix: unix_seconds(doc.date_created),
            has_drawing: doc.drawing_path.is_file(),
            drawing_path: doc.drawing_path.display().to_string(),
            file_name: doc.file_name,
            modified_unix: doc.last_modified.and_then(unix_seconds),
            pdf_path: doc.file_path.display().to_string(),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

fn run_new(store: &LibraryStore) -> Result<()> {
    let created = store.create_blank_document().context("failed to create blank document")?;
    println!("{}", created.display());
    Ok(())
}

fn run_import(store: &LibraryStore, file: &Path) -> Result<()> {
    ensure_pdf_exists(file)?;

    let stored = store
        .import(file)
        .with_context(|| format!("failed to import {}", file.display()))?;

    println!("{}", stored.display());
    Ok(())
}

fn run_show(store: &LibraryStore, name: &str) -> Result<()> {
    let pdf_path = store.document_path(name)?;
    ensure_pdf_exists(&pdf_path)?;

    let drawing = drawing_path(&pdf_path);
    let ink = store.load_drawing(&drawing).context("failed to read ink layer")?;

    let payload = ShowOutput {
        drawing_bytes: ink.map(|snapshot| snapshot.len()),
        drawing_path: drawing.display().to_string(),
        file_name: name.to_owned(),
        pdf_bytes: fs::metadata(&pdf_path)?.len(),
        pdf_path: pdf_path.display().to_string(),
    };

    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn run_delete(store: &LibraryStore, name: &str) -> Result<()> {
    let pdf_path = store.document_path(name)?;
    store
        .delete_document(&pdf_path)
        .with_context(|| format!("failed to delete {}", pdf_path.display()))?;

    println!("deleted:{}", pdf_path.display());
    Ok(())
}

fn run_annotate(store: &LibraryStore, name: &str, script: &Path) -> Result<()> {
    let pdf_path = store.document_path(name)?;
    ensure_pdf_exists(&pdf_path)?;

    let script_bytes = fs::read(script)
        .with_context(|| format!("failed to read script {}", script.display()))?;
    let steps: Vec<ScriptStep> =
        serde_json::from_slice(&script_bytes).context("invalid annotation script")?;

    let source = fs::read(&pdf_path)?;
    let key = DocumentKey::from_path(&pdf_path);
    let config = SessionConfig::from_env()?;

    let clock = ManualClock::new();
    let (tx, rx) = mpsc::channel();
    let actor = SessionActor::spawn(config, Arc::new(clock.clone()), store.clone(), tx)
        .context("failed to start annotation session")?;

    let mut surface = Surface { handle: actor.handle(), notifications: rx, key, live: Snapshot::blank() };

    if let Some(baseline) = store.load_drawing(&drawing_path(&pdf_path))? {
        surface.handle.load_baseline(&surface.key, baseline.clone())?;
        surface.live = baseline;
    }

    let mut saves = Vec::new();
    for step in steps {
        match step {
            ScriptStep::Draw { ink, after_ms } => {
                clock.advance_ms(after_ms);
                surface.draw(Snapshot::from_bytes(ink.into_bytes()))?;
            }
            ScriptStep::Undo => {
                surface.handle.undo(&surface.key)?;
                surface.sync()?;
            }
            ScriptStep::Redo => {
                surface.handle.redo(&surface.key)?;
                surface.sync()?;
            }
            ScriptStep::Save => saves.push(surface.save(name, source.clone())?),
        }
    }

    let view = surface.handle.inspect(&surface.key)?;
    drop(surface);
    actor.shutdown();

    let payload = AnnotateOutput {
        can_redo: view.can_redo,
        can_undo: view.can_undo,
        current_ink: String::from_utf8_lossy(view.current.as_bytes()).into_owned(),
        document: name.to_owned(),
        redo_depth: view.redo_depth,
        saves,
        undo_depth: view.undo_depth,
    };

    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

/// Stand-in for a drawing surface: holds the live ink and talks to the session.
struct Surface {
    handle: SessionHandle,
    notifications: Receiver<Notification>,
    key: DocumentKey,
    live: Snapshot,
}

impl Surface {
    fn draw(&mut self, snapshot: Snapshot) -> Result<()> {
        self.live = snapshot.clone();
        self.handle.snapshot_changed(&self.key, snapshot)?;
        Ok(())
    }

    /// Adopt whatever the session last told us to render.
    fn sync(&mut self) -> Result<()> {
        // Inspect is answered after every earlier command, so the reply to the
        // last undo/redo is the newest queued notification.
        self.handle.inspect(&self.key)?;

        if let Some(Notification::StateChanged(view)) = self.notifications.try_iter().last() {
            if view.key == self.key {
                self.live = view.current;
            }
        }
        Ok(())
    }

    fn save(&mut self, name: &str, source: Vec<u8>) -> Result<SaveOutput> {
        self.handle.save(&self.key, Some(name.to_owned()), source, Some(self.live.clone()))?;

        for notification in self.notifications.iter() {
            match notification {
                Notification::Saved { key, paths } if key == self.key => {
                    log::info!("saved ink layer to {}", paths.drawing.display());
                    return Ok(SaveOutput { error: None, saved: true });
                }
                Notification::SaveFailed { key, reason } if key == self.key => {
                    return Ok(SaveOutput { error: Some(reason), saved: false });
                }
                _ => {}
            }
        }

        anyhow::bail!("annotation session stopped before the save finished")
    }
}

fn ensure_pdf_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}

fn unix_seconds(time: std::time::SystemTime) -> Option<u64> {
    time.duration_since(UNIX_EPOCH).ok().map(|elapsed| elapsed.as_secs())
}
