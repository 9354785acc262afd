//! # strata-format
//!
//! The format collaborator for Strata: codecs for JSON, TOML, and YAML,
//! selected by file extension or an explicit override token, behind the
//! [`DocumentStore`] trait that the lifecycle layer persists through.

pub mod codec;
pub mod store;

pub use codec::Format;
pub use store::{DocumentStore, FileStore, MemoryStore};
