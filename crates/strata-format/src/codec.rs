use std::path::Path;

use strata_core::Document;

/// A concrete wire format for configuration documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Toml,
    Yaml,
}

impl Format {
    /// Resolve a format from an explicit override token, e.g. `"toml"`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "json" => Some(Format::Json),
            "toml" => Some(Format::Toml),
            "yaml" | "yml" => Some(Format::Yaml),
            _ => None,
        }
    }

    /// Resolve a format from a locator's file extension.
    pub fn from_locator(locator: &str) -> Option<Self> {
        Path::new(locator)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_token)
    }

    pub fn token(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Toml => "toml",
            Format::Yaml => "yaml",
        }
    }

    /// Parse raw text into a document. The error is the codec's own
    /// message; callers wrap it with the locator for the load taxonomy.
    pub fn decode(&self, raw: &str) -> Result<Document, String> {
        match self {
            Format::Json => serde_json::from_str(raw).map_err(|e| e.to_string()),
            Format::Toml => toml::from_str(raw).map_err(|e| e.to_string()),
            Format::Yaml => serde_yaml::from_str(raw).map_err(|e| e.to_string()),
        }
    }

    /// Serialize a document to text in this format.
    pub fn encode(&self, document: &Document) -> Result<String, String> {
        match self {
            Format::Json => serde_json::to_string_pretty(document).map_err(|e| e.to_string()),
            Format::Toml => toml::to_string_pretty(document).map_err(|e| e.to_string()),
            Format::Yaml => serde_yaml::to_string(document).map_err(|e| e.to_string()),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}
