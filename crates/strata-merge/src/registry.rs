use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use strata_core::{Result, StrataError};

use crate::strategies::{Append, Conditional, Deep, Namespace, Priority, Replace};
use crate::strategy::{MergeSource, MergeStrategy};

/// Token → strategy lookup, pre-populated with the six built-in policies.
///
/// Caller-supplied strategies are checked against the merge contract when
/// registered, so a bad strategy fails loudly up front rather than at the
/// first merge.
pub struct StrategyRegistry {
    strategies: HashMap<String, Arc<dyn MergeStrategy>>,
}

impl StrategyRegistry {
    /// Registry containing only the built-in strategies.
    pub fn with_builtins() -> Self {
        let builtins: Vec<Arc<dyn MergeStrategy>> = vec![
            Arc::new(Deep),
            Arc::new(Namespace::new()),
            Arc::new(Priority),
            Arc::new(Append),
            Arc::new(Replace),
            Arc::new(Conditional::accept_all()),
        ];
        let mut strategies = HashMap::new();
        for strategy in builtins {
            strategies.insert(strategy.name().to_string(), strategy);
        }
        Self { strategies }
    }

    /// Look up a strategy by its selector token.
    pub fn get(&self, token: &str) -> Result<Arc<dyn MergeStrategy>> {
        self.strategies
            .get(token)
            .cloned()
            .ok_or_else(|| StrataError::UnknownStrategy(token.to_string()))
    }

    pub fn contains(&self, token: &str) -> bool {
        self.strategies.contains_key(token)
    }

    /// Tokens currently registered, sorted.
    pub fn tokens(&self) -> Vec<String> {
        let mut tokens: Vec<String> = self.strategies.keys().cloned().collect();
        tokens.sort();
        tokens
    }

    /// Register a caller-supplied strategy.
    ///
    /// Validation happens here, not at merge time: the token must be a
    /// non-empty lowercase identifier that does not shadow an existing
    /// registration, and the strategy must honor the merge contract on the
    /// empty source list (an empty document, not an error).
    pub fn register(&mut self, strategy: Arc<dyn MergeStrategy>) -> Result<()> {
        let token = strategy.name().to_string();
        if token.is_empty() {
            return Err(StrataError::StrategyValidation(
                "strategy name must not be empty".to_string(),
            ));
        }
        if !token
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
        {
            return Err(StrataError::StrategyValidation(format!(
                "strategy name '{token}' must be a lowercase identifier"
            )));
        }
        if self.strategies.contains_key(&token) {
            return Err(StrataError::StrategyValidation(format!(
                "strategy '{token}' is already registered"
            )));
        }
        let probe: &[MergeSource] = &[];
        match strategy.merge(probe) {
            Ok(doc) if doc.is_empty() => {}
            Ok(_) => {
                return Err(StrataError::StrategyValidation(format!(
                    "strategy '{token}' must produce an empty document from no sources"
                )));
            }
            Err(e) => {
                return Err(StrataError::StrategyValidation(format!(
                    "strategy '{token}' failed on the empty source list: {e}"
                )));
            }
        }
        info!(strategy = %token, "registered merge strategy");
        self.strategies.insert(token, strategy);
        Ok(())
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
