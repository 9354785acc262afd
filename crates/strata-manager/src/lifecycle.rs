use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use tracing::{debug, info, warn};

use strata_core::{Document, Result, StrataError, Value};
use strata_format::DocumentStore;

/// Where a managed document stands relative to its backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// No in-memory document; nothing has been loaded yet (or it was
    /// unloaded).
    NotLoaded,
    /// In-memory document matches the last successful load or save.
    Loaded,
    /// At least one mutation since the last successful load or save.
    Dirty,
}

/// What a [`BatchGuard`] does with accumulated mutations when it is dropped
/// without an explicit commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushPolicy {
    /// Flush pending mutations on every exit path, including unwinds.
    FlushOnExit,
    /// Skip the flush; the document stays dirty for a later save.
    Discard,
}

/// Owns one document and its relationship to a backing store: load, save,
/// reload, unload, and the dirty flag that decides when a persist is due.
///
/// With autoflush enabled every mutation persists immediately; a
/// [`BatchGuard`] from [`DocumentManager::batch`] suspends that and folds
/// any number of mutations into at most one physical save.
///
/// Single-threaded by design: no internal locking, no suspension. The only
/// blocking work is the store's load/save, called synchronously.
pub struct DocumentManager {
    store: Arc<dyn DocumentStore>,
    locator: String,
    document: Option<Document>,
    state: LifecycleState,
    autoflush: bool,
}

impl DocumentManager {
    /// Manager in `NotLoaded` state; call [`load`](Self::load) before any
    /// key access. Autoflush starts disabled.
    pub fn new(store: Arc<dyn DocumentStore>, locator: impl Into<String>) -> Self {
        Self {
            store,
            locator: locator.into(),
            document: None,
            state: LifecycleState::NotLoaded,
            autoflush: false,
        }
    }

    /// Adopt an already-built document (e.g. a merge result) as `Loaded`.
    pub fn with_document(
        store: Arc<dyn DocumentStore>,
        locator: impl Into<String>,
        document: Document,
    ) -> Self {
        Self {
            store,
            locator: locator.into(),
            document: Some(document),
            state: LifecycleState::Loaded,
            autoflush: false,
        }
    }

    pub fn autoflush(mut self, enabled: bool) -> Self {
        self.autoflush = enabled;
        self
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_dirty(&self) -> bool {
        self.state == LifecycleState::Dirty
    }

    pub fn is_loaded(&self) -> bool {
        self.state != LifecycleState::NotLoaded
    }

    /// The managed document, if loaded.
    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    /// Load from the store. Any in-memory document is discarded first, so a
    /// failed load always leaves the manager in `NotLoaded`.
    pub fn load(&mut self) -> Result<()> {
        self.document = None;
        self.state = LifecycleState::NotLoaded;
        let document = self.store.load(&self.locator)?;
        self.document = Some(document);
        self.state = LifecycleState::Loaded;
        info!(locator = %self.locator, "document loaded");
        Ok(())
    }

    /// Persist the document. A failed save leaves the state `Dirty`, so
    /// retrying is safe and idempotent.
    pub fn save(&mut self) -> Result<()> {
        let document = self
            .document
            .as_ref()
            .ok_or_else(|| StrataError::NotLoaded(self.locator.clone()))?;
        self.store.save(&self.locator, document)?;
        self.state = LifecycleState::Loaded;
        debug!(locator = %self.locator, "document saved");
        Ok(())
    }

    /// Persist only when there are unsaved mutations. Returns whether a
    /// physical save happened.
    pub fn save_if_dirty(&mut self) -> Result<bool> {
        if self.state != LifecycleState::Dirty {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    /// Drop the in-memory document and return to `NotLoaded`. Unsaved
    /// mutations are silently lost; callers needing durability save first.
    pub fn unload(&mut self) {
        if self.state == LifecycleState::Dirty {
            warn!(locator = %self.locator, "unloading with unsaved mutations");
        }
        self.document = None;
        self.state = LifecycleState::NotLoaded;
    }

    /// Unload then load, discarding any unsaved mutations by construction.
    pub fn reload(&mut self) -> Result<()> {
        self.unload();
        self.load()
    }

    /// Read the value at `key`; `Ok(None)` when absent.
    pub fn get(&self, key: &str) -> Result<Option<&Value>> {
        self.loaded()?.get(key)
    }

    /// Read the value at `key`, falling back to `default` when absent.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a Value) -> Result<&'a Value> {
        self.loaded()?.get_or(key, default)
    }

    pub fn has(&self, key: &str) -> Result<bool> {
        self.loaded()?.has(key)
    }

    /// Write through the navigator. A change marks the document dirty and,
    /// with autoflush on, persists immediately.
    pub fn set(&mut self, key: &str, value: Value, overwrite: bool) -> Result<bool> {
        let document = self
            .document
            .as_mut()
            .ok_or_else(|| StrataError::NotLoaded(self.locator.clone()))?;
        let changed = document.set(key, value, overwrite)?;
        if changed {
            self.mark_dirty()?;
        }
        Ok(changed)
    }

    /// Delete through the navigator; only an actual removal dirties.
    pub fn delete(&mut self, key: &str) -> Result<bool> {
        let document = self
            .document
            .as_mut()
            .ok_or_else(|| StrataError::NotLoaded(self.locator.clone()))?;
        let removed = document.delete(key)?;
        if removed {
            self.mark_dirty()?;
        }
        Ok(removed)
    }

    /// Open a deferred-flush scope: autoflush is suspended and any number
    /// of mutations fold into at most one save, decided by `policy` on
    /// exit.
    pub fn batch(&mut self, policy: FlushPolicy) -> BatchGuard<'_> {
        let restore_autoflush = self.autoflush;
        self.autoflush = false;
        BatchGuard {
            manager: self,
            policy,
            restore_autoflush,
            committed: false,
        }
    }

    fn loaded(&self) -> Result<&Document> {
        self.document
            .as_ref()
            .ok_or_else(|| StrataError::NotLoaded(self.locator.clone()))
    }

    fn mark_dirty(&mut self) -> Result<()> {
        self.state = LifecycleState::Dirty;
        if self.autoflush {
            self.save()?;
        }
        Ok(())
    }
}

/// RAII scope batching mutations into a single persist.
///
/// Dereferences to the manager, so mutations go through the usual calls.
/// [`commit`](Self::commit) flushes exactly once and reports the store's
/// error; dropping without a commit applies the guard's [`FlushPolicy`] —
/// a best-effort flush (failure logged, document stays dirty) or an
/// explicit skip. Either way the manager's autoflush setting is restored
/// on every exit path, including unwinds.
pub struct BatchGuard<'a> {
    manager: &'a mut DocumentManager,
    policy: FlushPolicy,
    restore_autoflush: bool,
    committed: bool,
}

impl BatchGuard<'_> {
    /// Flush pending mutations now and end the scope.
    pub fn commit(mut self) -> Result<()> {
        self.committed = true;
        self.manager.autoflush = self.restore_autoflush;
        self.manager.save_if_dirty()?;
        Ok(())
    }

    /// End the scope without flushing, regardless of policy.
    pub fn discard(mut self) {
        self.committed = true;
        self.manager.autoflush = self.restore_autoflush;
    }
}

impl Deref for BatchGuard<'_> {
    type Target = DocumentManager;

    fn deref(&self) -> &DocumentManager {
        self.manager
    }
}

impl DerefMut for BatchGuard<'_> {
    fn deref_mut(&mut self) -> &mut DocumentManager {
        self.manager
    }
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        self.manager.autoflush = self.restore_autoflush;
        match self.policy {
            FlushPolicy::Discard => {
                if self.manager.is_dirty() {
                    debug!(
                        locator = %self.manager.locator,
                        "batch scope ended without flush, document stays dirty"
                    );
                }
            }
            FlushPolicy::FlushOnExit => {
                if let Err(e) = self.manager.save_if_dirty() {
                    warn!(
                        locator = %self.manager.locator,
                        error = %e,
                        "deferred flush failed, document stays dirty"
                    );
                }
            }
        }
    }
}
