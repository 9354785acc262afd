//! # strata-cli
//!
//! Command-line interface for the Strata configuration engine.
//!
//! ## Commands
//!
//! - `strata get` — Read a value by dot key
//! - `strata set` — Write a value and save
//! - `strata delete` — Remove a key
//! - `strata show` — Print a document as JSON
//! - `strata merge` — Combine files under a merge strategy
//! - `strata group` — Merge a named group from a descriptor
//! - `strata strategies` — List merge strategy tokens

pub mod commands;

pub use commands::Cli;
