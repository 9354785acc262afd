//! # strata-core
//!
//! Core types for the Strata layered configuration engine: the
//! format-agnostic document tree, dot-key parsing, path navigation, and the
//! unified error type shared by every other crate in the workspace.

pub mod document;
pub mod error;
pub mod path;
pub mod value;

pub use document::Document;
pub use error::{Result, StrataError};
pub use path::{KeyPath, SEPARATOR};
pub use value::{Mapping, Value};
