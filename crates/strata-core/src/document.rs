use serde::{Deserialize, Serialize};

use crate::error::{Result, StrataError};
use crate::path::{KeyPath, SEPARATOR};
use crate::value::{Mapping, Value};

/// A configuration document: a tree of [`Value`] nodes rooted at a mapping.
///
/// All key-level access goes through dot keys (see [`KeyPath`]). Navigation
/// never destroys data implicitly: descending through an existing
/// non-mapping node is a [`StrataError::TypeConflict`], even when the walk
/// was asked to create missing intermediate mappings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    root: Mapping,
}

impl Document {
    /// An empty document.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_mapping(root: Mapping) -> Self {
        Self { root }
    }

    pub fn as_mapping(&self) -> &Mapping {
        &self.root
    }

    pub fn as_mapping_mut(&mut self) -> &mut Mapping {
        &mut self.root
    }

    pub fn into_mapping(self) -> Mapping {
        self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Read the value at `key`. Absent paths and absent leaves are `None`,
    /// not errors. Never mutates the document.
    pub fn get(&self, key: &str) -> Result<Option<&Value>> {
        let path = KeyPath::parse(key)?;
        match walk(&self.root, path.segments())? {
            Some(parent) => Ok(parent.get(path.leaf())),
            None => Ok(None),
        }
    }

    /// Read the value at `key`, falling back to `default` when the path or
    /// leaf is absent.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a Value) -> Result<&'a Value> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    /// Whether a value exists at `key`.
    pub fn has(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Write `value` at `key`, creating intermediate mappings as needed.
    ///
    /// Returns `Ok(false)` without touching the document when the leaf
    /// already exists and `overwrite` is false; `Ok(true)` when the value
    /// was assigned.
    pub fn set(&mut self, key: &str, value: Value, overwrite: bool) -> Result<bool> {
        let path = KeyPath::parse(key)?;
        let parent = walk_create(&mut self.root, path.segments())?;
        if !overwrite && parent.contains_key(path.leaf()) {
            return Ok(false);
        }
        parent.insert(path.leaf().to_string(), value);
        Ok(true)
    }

    /// Remove the value at `key`. Returns whether a removal happened; an
    /// absent path is `Ok(false)`, never creates anything.
    pub fn delete(&mut self, key: &str) -> Result<bool> {
        let path = KeyPath::parse(key)?;
        match walk_mut(&mut self.root, path.segments())? {
            Some(parent) => Ok(parent.remove(path.leaf()).is_some()),
            None => Ok(false),
        }
    }
}

impl From<Mapping> for Document {
    fn from(root: Mapping) -> Self {
        Self { root }
    }
}

fn type_conflict(segments: &[String], index: usize, found: &'static str) -> StrataError {
    let mut path = String::new();
    for seg in &segments[..=index] {
        if !path.is_empty() {
            path.push(SEPARATOR);
        }
        path.push_str(seg);
    }
    StrataError::TypeConflict { path, found }
}

/// Walk `segments` downward without creating anything. `Ok(None)` means the
/// path does not exist; a non-mapping in the way is a type conflict.
fn walk<'a>(mut current: &'a Mapping, segments: &[String]) -> Result<Option<&'a Mapping>> {
    for (i, seg) in segments.iter().enumerate() {
        current = match current.get(seg) {
            Some(Value::Mapping(next)) => next,
            Some(other) => return Err(type_conflict(segments, i, other.kind())),
            None => return Ok(None),
        };
    }
    Ok(Some(current))
}

fn walk_mut<'a>(
    mut current: &'a mut Mapping,
    segments: &[String],
) -> Result<Option<&'a mut Mapping>> {
    for (i, seg) in segments.iter().enumerate() {
        current = match current.get_mut(seg) {
            Some(Value::Mapping(next)) => next,
            Some(other) => return Err(type_conflict(segments, i, other.kind())),
            None => return Ok(None),
        };
    }
    Ok(Some(current))
}

/// Walk `segments` downward, inserting empty mappings where the path is
/// absent. Existing non-mapping nodes are never replaced.
fn walk_create<'a>(
    mut current: &'a mut Mapping,
    segments: &[String],
) -> Result<&'a mut Mapping> {
    for (i, seg) in segments.iter().enumerate() {
        let node = current
            .entry(seg.clone())
            .or_insert_with(|| Value::Mapping(Mapping::new()));
        current = match node {
            Value::Mapping(next) => next,
            other => return Err(type_conflict(segments, i, other.kind())),
        };
    }
    Ok(current)
}
