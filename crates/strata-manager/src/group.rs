use std::collections::HashMap;

use serde::Deserialize;
use tracing::info;

use strata_core::{Document, Result, StrataError};
use strata_format::{DocumentStore, Format};
use strata_merge::{MergeSource, MergeStrategy, Namespace, StrategyRegistry};

fn default_strategy() -> String {
    "deep".to_string()
}

/// One named group of configuration sources and how to combine them.
///
/// Typically deserialized from a TOML descriptor:
///
/// ```toml
/// [groups.app]
/// sources = ["defaults.toml", "env/prod.toml"]
/// strategy = "priority"
///
/// [groups.app.weights]
/// "defaults.toml" = 0
/// "env/prod.toml" = 10
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct GroupSpec {
    /// Ordered locators; later sources take precedence.
    pub sources: Vec<String>,
    /// Merge strategy selector token.
    #[serde(default = "default_strategy")]
    pub strategy: String,
    /// Namespace nesting prefix, only used by the `namespace` strategy.
    #[serde(default)]
    pub namespace_prefix: Option<String>,
    /// Priority weights by locator, only used by the `priority` strategy.
    #[serde(default)]
    pub weights: HashMap<String, i64>,
    /// Format override token (`json`, `toml`, `yaml`) applied to every
    /// source in the group, for locators whose extension is absent or
    /// misleading.
    #[serde(default)]
    pub format: Option<String>,
}

/// A set of named file groups, the unit a descriptor file defines.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupConfig {
    #[serde(default)]
    pub groups: HashMap<String, GroupSpec>,
}

impl GroupConfig {
    /// Parse a descriptor from TOML text.
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| StrataError::Load {
            locator: "<group descriptor>".to_string(),
            reason: e.to_string(),
        })
    }
}

/// Load every source of `spec` through `store` and merge them with the
/// strategy the spec names.
pub fn load_group(
    store: &dyn DocumentStore,
    registry: &StrategyRegistry,
    spec: &GroupSpec,
) -> Result<Document> {
    // A namespace prefix parameterizes the strategy, so it cannot come from
    // the registry's unparameterized instance. Resolve before touching the
    // store so a bad selector fails without I/O.
    let registered = registry.get(&spec.strategy)?;
    let parameterized: Option<Namespace> = match (&spec.namespace_prefix, spec.strategy.as_str()) {
        (Some(prefix), "namespace") => Some(Namespace::with_prefix(prefix.clone())),
        _ => None,
    };
    let strategy: &dyn MergeStrategy = match &parameterized {
        Some(ns) => ns,
        None => registered.as_ref(),
    };

    let format = match &spec.format {
        Some(token) => Some(Format::from_token(token).ok_or_else(|| StrataError::Load {
            locator: "<group descriptor>".to_string(),
            reason: format!("unrecognized format token: {token}"),
        })?),
        None => None,
    };

    let mut sources = Vec::with_capacity(spec.sources.len());
    for locator in &spec.sources {
        let document = store.load_with(locator, format)?;
        let weight = spec.weights.get(locator).copied().unwrap_or(0);
        sources.push(MergeSource::new(locator.clone(), document).with_weight(weight));
    }

    let merged = strategy.merge(&sources)?;
    info!(
        strategy = %spec.strategy,
        sources = spec.sources.len(),
        "merged file group"
    );
    Ok(merged)
}
