use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing::{debug, info};

use strata_core::{Document, Result, StrataError};

use crate::codec::Format;

/// The format collaborator: loads and persists whole documents by locator.
///
/// Implementations own the only blocking I/O in the engine; everything
/// above this trait is synchronous in-memory work.
pub trait DocumentStore: Send + Sync {
    /// Parse the document at `locator`. Malformed or unreadable content is
    /// a [`StrataError::Load`].
    fn load(&self, locator: &str) -> Result<Document>;

    /// Load with an explicit format override. Stores without any notion of
    /// format selection ignore the override.
    fn load_with(&self, locator: &str, format: Option<Format>) -> Result<Document> {
        let _ = format;
        self.load(locator)
    }

    /// Persist `document` at `locator`. I/O or serialization failure is a
    /// [`StrataError::Write`].
    fn save(&self, locator: &str, document: &Document) -> Result<()>;
}

/// Filesystem-backed store. Format is chosen per locator by file extension
/// unless a fixed override is set.
#[derive(Debug, Default)]
pub struct FileStore {
    format_override: Option<Format>,
}

impl FileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force every locator through one format regardless of extension.
    pub fn with_format(format: Format) -> Self {
        Self {
            format_override: Some(format),
        }
    }

    fn resolve_format(&self, locator: &str) -> Option<Format> {
        self.format_override.or_else(|| Format::from_locator(locator))
    }
}

impl DocumentStore for FileStore {
    fn load(&self, locator: &str) -> Result<Document> {
        self.load_with(locator, None)
    }

    fn load_with(&self, locator: &str, format: Option<Format>) -> Result<Document> {
        let format = format
            .or_else(|| self.resolve_format(locator))
            .ok_or_else(|| StrataError::Load {
                locator: locator.to_string(),
                reason: "unrecognized format extension".to_string(),
            })?;
        let raw = std::fs::read_to_string(locator).map_err(|e| StrataError::Load {
            locator: locator.to_string(),
            reason: e.to_string(),
        })?;
        let document = format.decode(&raw).map_err(|reason| StrataError::Load {
            locator: locator.to_string(),
            reason,
        })?;
        info!(locator, %format, "loaded document");
        Ok(document)
    }

    fn save(&self, locator: &str, document: &Document) -> Result<()> {
        let format = self.resolve_format(locator).ok_or_else(|| StrataError::Write {
            locator: locator.to_string(),
            reason: "unrecognized format extension".to_string(),
        })?;
        let raw = format.encode(document).map_err(|reason| StrataError::Write {
            locator: locator.to_string(),
            reason,
        })?;
        std::fs::write(locator, raw).map_err(|e| StrataError::Write {
            locator: locator.to_string(),
            reason: e.to_string(),
        })?;
        debug!(locator, %format, "saved document");
        Ok(())
    }
}

/// In-memory store for tests and ephemeral documents.
///
/// Save failures can be injected to exercise the dirty-state retry paths,
/// and every successful save is counted so batching behavior is observable.
#[derive(Default)]
pub struct MemoryStore {
    documents: Mutex<HashMap<String, Document>>,
    fail_saves: AtomicBool,
    save_count: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document under `locator`.
    pub fn insert(&self, locator: &str, document: Document) {
        self.documents
            .lock()
            .insert(locator.to_string(), document);
    }

    /// Snapshot of the stored document, if any.
    pub fn get(&self, locator: &str) -> Option<Document> {
        self.documents.lock().get(locator).cloned()
    }

    /// When set, every `save` fails with a write error until cleared.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves across all locators.
    pub fn save_count(&self) -> usize {
        self.save_count.load(Ordering::SeqCst)
    }
}

impl DocumentStore for MemoryStore {
    fn load(&self, locator: &str) -> Result<Document> {
        self.documents
            .lock()
            .get(locator)
            .cloned()
            .ok_or_else(|| StrataError::Load {
                locator: locator.to_string(),
                reason: "no such document".to_string(),
            })
    }

    fn save(&self, locator: &str, document: &Document) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StrataError::Write {
                locator: locator.to_string(),
                reason: "injected save failure".to_string(),
            });
        }
        self.documents
            .lock()
            .insert(locator.to_string(), document.clone());
        self.save_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
