//! # strata-merge
//!
//! The Strata merge engine: combines an ordered sequence of configuration
//! documents into one under a chosen policy. Six built-in strategies
//! (`deep`, `namespace`, `priority`, `append`, `replace`, `conditional`)
//! plus an open extension point via the [`MergeStrategy`] trait and the
//! [`StrategyRegistry`].

pub mod registry;
pub mod strategies;
pub mod strategy;

pub use registry::StrategyRegistry;
pub use strategies::{Append, Conditional, Deep, Namespace, Priority, Replace, SourcePredicate};
pub use strategy::{MergeSource, MergeStrategy};
