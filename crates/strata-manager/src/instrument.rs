use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use strata_core::{Result, Value};

use crate::lifecycle::DocumentManager;

/// The key-level capability surface of a managed document. The lifecycle
/// manager implements it directly; [`Instrumented`] wraps any
/// implementation without changing behavior.
pub trait DocumentOps {
    fn get_value(&self, key: &str) -> Result<Option<Value>>;
    fn has(&self, key: &str) -> Result<bool>;
    fn set(&mut self, key: &str, value: Value, overwrite: bool) -> Result<bool>;
    fn delete(&mut self, key: &str) -> Result<bool>;
    fn save(&mut self) -> Result<()>;
    fn is_dirty(&self) -> bool;
}

impl DocumentOps for DocumentManager {
    fn get_value(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.get(key)?.cloned())
    }

    fn has(&self, key: &str) -> Result<bool> {
        DocumentManager::has(self, key)
    }

    fn set(&mut self, key: &str, value: Value, overwrite: bool) -> Result<bool> {
        DocumentManager::set(self, key, value, overwrite)
    }

    fn delete(&mut self, key: &str) -> Result<bool> {
        DocumentManager::delete(self, key)
    }

    fn save(&mut self) -> Result<()> {
        DocumentManager::save(self)
    }

    fn is_dirty(&self) -> bool {
        DocumentManager::is_dirty(self)
    }
}

/// Observer invoked around every instrumented operation.
pub trait OpHook: Send + Sync {
    fn before(&self, _op: &str, _key: Option<&str>) {}
    fn after(&self, _op: &str, _key: Option<&str>, _elapsed: Duration, _ok: bool) {}
}

/// Transparent instrumentation wrapper: forwards every call to the inner
/// ops value, measures timing, emits a `tracing` event, and notifies hooks
/// before and after. Results and errors pass through unchanged.
pub struct Instrumented<O> {
    inner: O,
    hooks: Vec<Arc<dyn OpHook>>,
}

fn observed<T>(
    hooks: &[Arc<dyn OpHook>],
    op: &str,
    key: Option<&str>,
    call: impl FnOnce() -> Result<T>,
) -> Result<T> {
    for hook in hooks {
        hook.before(op, key);
    }
    let start = Instant::now();
    let result = call();
    let elapsed = start.elapsed();
    debug!(op, key, ?elapsed, ok = result.is_ok(), "document op");
    for hook in hooks {
        hook.after(op, key, elapsed, result.is_ok());
    }
    result
}

impl<O> Instrumented<O> {
    pub fn new(inner: O) -> Self {
        Self {
            inner,
            hooks: Vec::new(),
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn OpHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }

    pub fn into_inner(self) -> O {
        self.inner
    }
}

impl<O: DocumentOps> DocumentOps for Instrumented<O> {
    fn get_value(&self, key: &str) -> Result<Option<Value>> {
        observed(&self.hooks, "get", Some(key), || self.inner.get_value(key))
    }

    fn has(&self, key: &str) -> Result<bool> {
        observed(&self.hooks, "has", Some(key), || self.inner.has(key))
    }

    fn set(&mut self, key: &str, value: Value, overwrite: bool) -> Result<bool> {
        let hooks = self.hooks.clone();
        observed(&hooks, "set", Some(key), || {
            self.inner.set(key, value, overwrite)
        })
    }

    fn delete(&mut self, key: &str) -> Result<bool> {
        let hooks = self.hooks.clone();
        observed(&hooks, "delete", Some(key), || self.inner.delete(key))
    }

    fn save(&mut self) -> Result<()> {
        let hooks = self.hooks.clone();
        observed(&hooks, "save", None, || self.inner.save())
    }

    fn is_dirty(&self) -> bool {
        self.inner.is_dirty()
    }
}
