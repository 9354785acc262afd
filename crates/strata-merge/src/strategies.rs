use tracing::debug;

use strata_core::{Document, Mapping, Result, Value};

use crate::strategy::{MergeSource, MergeStrategy};

/// How colliding sequences are combined during a recursive merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SequenceRule {
    /// Later source replaces the earlier sequence wholesale.
    Replace,
    /// Later elements are appended after the earlier ones.
    Concat,
}

/// Recursive union of `overlay` into `dst`. Mapping-vs-mapping collisions
/// recurse; every other collision (including mapping-vs-scalar) is resolved
/// later-wins. That asymmetric case is intentional, not an error.
fn merge_mapping(dst: &mut Mapping, overlay: &Mapping, sequences: SequenceRule) {
    for (key, incoming) in overlay {
        let merged_in_place = match dst.get_mut(key) {
            Some(Value::Mapping(existing)) => match incoming {
                Value::Mapping(overlay) => {
                    merge_mapping(existing, overlay, sequences);
                    true
                }
                _ => false,
            },
            Some(Value::Sequence(existing)) => match (incoming, sequences) {
                (Value::Sequence(overlay), SequenceRule::Concat) => {
                    existing.extend(overlay.iter().cloned());
                    true
                }
                _ => false,
            },
            _ => false,
        };
        if !merged_in_place {
            dst.insert(key.clone(), incoming.clone());
        }
    }
}

fn merge_in_order(sources: &[MergeSource], sequences: SequenceRule) -> Document {
    let mut root = Mapping::new();
    for source in sources {
        merge_mapping(&mut root, source.document.as_mapping(), sequences);
    }
    Document::from_mapping(root)
}

/// Recursive union; later sources win on every collision, with
/// mapping-vs-mapping collisions merged key by key.
pub struct Deep;

impl MergeStrategy for Deep {
    fn name(&self) -> &str {
        "deep"
    }

    fn merge(&self, sources: &[MergeSource]) -> Result<Document> {
        debug!(sources = sources.len(), "deep merge");
        Ok(merge_in_order(sources, SequenceRule::Replace))
    }
}

/// Places each source's tree verbatim under its own namespace key instead
/// of combining across sources. The namespace identifier is derived from the
/// source id (its base name, extension stripped); an explicit prefix nests
/// every namespace under one extra top-level mapping.
pub struct Namespace {
    prefix: Option<String>,
}

impl Namespace {
    pub fn new() -> Self {
        Self { prefix: None }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    /// Base name of a source id: path and extension stripped, so
    /// `conf/db.toml` namespaces as `db`.
    pub fn derive_identifier(id: &str) -> String {
        let base = id
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(id);
        match base.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem.to_string(),
            _ => base.to_string(),
        }
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}

impl MergeStrategy for Namespace {
    fn name(&self) -> &str {
        "namespace"
    }

    fn merge(&self, sources: &[MergeSource]) -> Result<Document> {
        let mut spaces = Mapping::new();
        for source in sources {
            let key = Self::derive_identifier(&source.id);
            // Colliding namespace keys are last-source-wins at this level.
            spaces.insert(key, Value::Mapping(source.document.as_mapping().clone()));
        }
        let root = match &self.prefix {
            Some(prefix) => {
                let mut wrapped = Mapping::new();
                wrapped.insert(prefix.clone(), Value::Mapping(spaces));
                wrapped
            }
            None => spaces,
        };
        Ok(Document::from_mapping(root))
    }
}

/// Deep merge after a stable reorder by weight: higher weight merges later
/// and therefore wins; equal weights keep their original relative order.
pub struct Priority;

impl MergeStrategy for Priority {
    fn name(&self) -> &str {
        "priority"
    }

    fn merge(&self, sources: &[MergeSource]) -> Result<Document> {
        let mut ordered: Vec<&MergeSource> = sources.iter().collect();
        ordered.sort_by_key(|s| s.weight);
        let mut root = Mapping::new();
        for source in ordered {
            merge_mapping(&mut root, source.document.as_mapping(), SequenceRule::Replace);
        }
        Ok(Document::from_mapping(root))
    }
}

/// Deep merge, except colliding sequences concatenate (earlier source's
/// elements first) instead of being replaced.
pub struct Append;

impl MergeStrategy for Append {
    fn name(&self) -> &str {
        "append"
    }

    fn merge(&self, sources: &[MergeSource]) -> Result<Document> {
        Ok(merge_in_order(sources, SequenceRule::Concat))
    }
}

/// Selects the last source's document outright, discarding all others.
pub struct Replace;

impl MergeStrategy for Replace {
    fn name(&self) -> &str {
        "replace"
    }

    fn merge(&self, sources: &[MergeSource]) -> Result<Document> {
        Ok(sources
            .last()
            .map(|s| s.document.clone())
            .unwrap_or_default())
    }
}

/// Predicate deciding whether a `(source id, document)` pair participates
/// in a conditional merge.
pub type SourcePredicate = Box<dyn Fn(&str, &Document) -> bool + Send + Sync>;

/// Filters sources through a predicate, then deep-merges the survivors.
/// Without a predicate every source is accepted, making this equivalent to
/// [`Deep`].
pub struct Conditional {
    predicate: Option<SourcePredicate>,
}

impl Conditional {
    pub fn accept_all() -> Self {
        Self { predicate: None }
    }

    pub fn with_predicate(
        predicate: impl Fn(&str, &Document) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            predicate: Some(Box::new(predicate)),
        }
    }
}

impl MergeStrategy for Conditional {
    fn name(&self) -> &str {
        "conditional"
    }

    fn merge(&self, sources: &[MergeSource]) -> Result<Document> {
        let mut root = Mapping::new();
        for source in sources {
            let accepted = match &self.predicate {
                Some(p) => p(&source.id, &source.document),
                None => true,
            };
            if accepted {
                merge_mapping(&mut root, source.document.as_mapping(), SequenceRule::Replace);
            } else {
                debug!(source = %source.id, "conditional merge skipped source");
            }
        }
        Ok(Document::from_mapping(root))
    }
}
