use thiserror::Error;

/// Unified error type for the Strata configuration engine.
#[derive(Error, Debug)]
pub enum StrataError {
    // ── Key / navigation errors ────────────────────────────────
    #[error("invalid key format: {0:?}")]
    InvalidKey(String),

    #[error("type conflict at '{path}': expected a mapping, found {found}")]
    TypeConflict { path: String, found: &'static str },

    #[error("key not found: {0}")]
    KeyNotFound(String),

    // ── Merge errors ───────────────────────────────────────────
    #[error("unknown merge strategy: {0}")]
    UnknownStrategy(String),

    #[error("strategy validation failed: {0}")]
    StrategyValidation(String),

    // ── Store / format errors ──────────────────────────────────
    #[error("failed to load {locator}: {reason}")]
    Load { locator: String, reason: String },

    #[error("failed to write {locator}: {reason}")]
    Write { locator: String, reason: String },

    // ── Lifecycle errors ───────────────────────────────────────
    #[error("document not loaded: {0}")]
    NotLoaded(String),

    // ── Generic wrappers ───────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StrataError>;
