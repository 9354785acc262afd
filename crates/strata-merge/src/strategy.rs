use strata_core::{Document, Result};

/// One input to a merge: an identifier (typically the source locator) and
/// the document it produced. Order in the input slice encodes precedence —
/// later sources override earlier ones unless a strategy reorders them.
#[derive(Debug, Clone)]
pub struct MergeSource {
    pub id: String,
    pub document: Document,
    /// Priority weight, only consulted by the `priority` strategy.
    pub weight: i64,
}

impl MergeSource {
    pub fn new(id: impl Into<String>, document: Document) -> Self {
        Self {
            id: id.into(),
            document,
            weight: 0,
        }
    }

    pub fn with_weight(mut self, weight: i64) -> Self {
        self.weight = weight;
        self
    }
}

/// A policy for combining an ordered sequence of documents into one.
///
/// Implementations never mutate their inputs, and the returned document
/// shares no structure with them — callers may freely mutate either side
/// afterwards.
pub trait MergeStrategy: Send + Sync {
    /// Token this strategy registers under, e.g. `"deep"`.
    fn name(&self) -> &str;

    /// Combine `sources` into a single new document.
    fn merge(&self, sources: &[MergeSource]) -> Result<Document>;
}
