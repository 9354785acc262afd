use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use strata_core::{Document, Result, StrataError, Value};
use strata_format::{DocumentStore, FileStore, Format};
use strata_manager::{DocumentManager, GroupConfig, load_group};
use strata_merge::{MergeSource, StrategyRegistry};

/// Strata — layered configuration-document engine
#[derive(Parser)]
#[command(name = "strata", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Force a format for every file regardless of extension (json, toml, yaml)
    #[arg(short, long, global = true)]
    format: Option<String>,

    /// Log level override (e.g. debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all log output (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a value by dot-notation key (e.g. database.pool.max_size)
    Get {
        /// Configuration file
        file: PathBuf,
        /// Key in dot notation
        key: String,
        /// Fallback printed when the key is absent (JSON literal)
        #[arg(short, long)]
        default: Option<String>,
    },
    /// Write a value at a dot-notation key and save the file
    Set {
        /// Configuration file
        file: PathBuf,
        /// Key in dot notation
        key: String,
        /// Value, parsed as a JSON literal with plain-string fallback
        value: String,
        /// Keep an existing value instead of overwriting it
        #[arg(long)]
        keep_existing: bool,
    },
    /// Remove a key from a configuration file
    Delete {
        /// Configuration file
        file: PathBuf,
        /// Key in dot notation
        key: String,
    },
    /// Print a whole document as pretty JSON
    Show {
        /// Configuration file
        file: PathBuf,
    },
    /// Merge several files into one under a strategy
    Merge {
        /// Input files, in precedence order (later wins)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Output file; its extension decides the output format
        #[arg(short, long)]
        out: PathBuf,
        /// Strategy token: deep, namespace, priority, append, replace, conditional
        #[arg(short, long, default_value = "deep")]
        strategy: String,
        /// Priority weight per input as FILE=WEIGHT (repeatable)
        #[arg(short, long, value_parser = parse_weight)]
        weight: Vec<(String, i64)>,
    },
    /// Merge a named group from a TOML descriptor file
    Group {
        /// Descriptor file defining [groups.NAME] tables
        descriptor: PathBuf,
        /// Group name to merge
        name: String,
        /// Output file for the merged document
        #[arg(short, long)]
        out: PathBuf,
    },
    /// List the available merge strategies
    Strategies,
}

/// Parse a `FILE=WEIGHT` pair for `--weight`.
fn parse_weight(s: &str) -> std::result::Result<(String, i64), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid FILE=WEIGHT: no `=` found in `{s}`"))?;
    let weight = s[pos + 1..]
        .parse::<i64>()
        .map_err(|e| format!("invalid weight in `{s}`: {e}"))?;
    Ok((s[..pos].to_string(), weight))
}

/// Parse a CLI value argument: JSON literal first, plain string fallback,
/// so `5`, `true`, `[1,2]`, and `hello` all do what they look like.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            self.log_level.as_deref().unwrap_or("warn")
        };
        // try_init: embedding callers (and tests) may already own a
        // subscriber.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
            )
            .with_target(false)
            .try_init();

        let store = self.store()?;

        match self.command {
            Commands::Get { file, key, default } => Self::cmd_get(store, &file, &key, default),
            Commands::Set {
                file,
                key,
                value,
                keep_existing,
            } => Self::cmd_set(store, &file, &key, &value, keep_existing),
            Commands::Delete { file, key } => Self::cmd_delete(store, &file, &key),
            Commands::Show { file } => Self::cmd_show(store, &file),
            Commands::Merge {
                inputs,
                out,
                strategy,
                weight,
            } => Self::cmd_merge(store, inputs, &out, &strategy, weight),
            Commands::Group {
                descriptor,
                name,
                out,
            } => Self::cmd_group(store, &descriptor, &name, &out),
            Commands::Strategies => Self::cmd_strategies(),
        }
    }

    fn store(&self) -> Result<Arc<dyn DocumentStore>> {
        let store = match &self.format {
            Some(token) => {
                let format = Format::from_token(token).ok_or_else(|| StrataError::Load {
                    locator: "--format".to_string(),
                    reason: format!("unrecognized format token: {token}"),
                })?;
                FileStore::with_format(format)
            }
            None => FileStore::new(),
        };
        Ok(Arc::new(store))
    }

    fn cmd_get(
        store: Arc<dyn DocumentStore>,
        file: &Path,
        key: &str,
        default: Option<String>,
    ) -> Result<()> {
        let locator = file.to_string_lossy();
        let document = store.load(&locator)?;
        match document.get(key)? {
            Some(value) => println!("{}", serde_json::to_string_pretty(value)?),
            None => match default {
                Some(raw) => println!("{}", serde_json::to_string_pretty(&parse_value(&raw))?),
                None => return Err(StrataError::KeyNotFound(key.to_string())),
            },
        }
        Ok(())
    }

    fn cmd_set(
        store: Arc<dyn DocumentStore>,
        file: &Path,
        key: &str,
        raw: &str,
        keep_existing: bool,
    ) -> Result<()> {
        let locator = file.to_string_lossy().to_string();
        let mut manager = DocumentManager::new(store, &locator);
        manager.load()?;
        let changed = manager.set(key, parse_value(raw), !keep_existing)?;
        if changed {
            manager.save()?;
            println!("{key} set in {locator}");
        } else {
            println!("{key} already set, left unchanged");
        }
        Ok(())
    }

    fn cmd_delete(store: Arc<dyn DocumentStore>, file: &Path, key: &str) -> Result<()> {
        let locator = file.to_string_lossy().to_string();
        let mut manager = DocumentManager::new(store, &locator);
        manager.load()?;
        if manager.delete(key)? {
            manager.save()?;
            println!("{key} removed from {locator}");
        } else {
            println!("{key} not present, nothing to do");
        }
        Ok(())
    }

    fn cmd_show(store: Arc<dyn DocumentStore>, file: &Path) -> Result<()> {
        let document = store.load(&file.to_string_lossy())?;
        println!("{}", serde_json::to_string_pretty(&document)?);
        Ok(())
    }

    fn cmd_merge(
        store: Arc<dyn DocumentStore>,
        inputs: Vec<PathBuf>,
        out: &Path,
        strategy: &str,
        weights: Vec<(String, i64)>,
    ) -> Result<()> {
        let registry = StrategyRegistry::with_builtins();
        let strategy = registry.get(strategy)?;
        let mut sources = Vec::with_capacity(inputs.len());
        for input in &inputs {
            let locator = input.to_string_lossy().to_string();
            let document = store.load(&locator)?;
            let weight = weights
                .iter()
                .find(|(file, _)| *file == locator)
                .map(|(_, w)| *w)
                .unwrap_or(0);
            sources.push(MergeSource::new(locator, document).with_weight(weight));
        }
        let merged = strategy.merge(&sources)?;
        store.save(&out.to_string_lossy(), &merged)?;
        println!("merged {} sources into {}", inputs.len(), out.display());
        Ok(())
    }

    fn cmd_group(
        store: Arc<dyn DocumentStore>,
        descriptor: &Path,
        name: &str,
        out: &Path,
    ) -> Result<()> {
        let raw = std::fs::read_to_string(descriptor)?;
        let config = GroupConfig::from_toml(&raw)?;
        let spec = config.groups.get(name).ok_or_else(|| StrataError::Load {
            locator: descriptor.to_string_lossy().to_string(),
            reason: format!("no such group: {name}"),
        })?;
        let registry = StrategyRegistry::with_builtins();
        let merged: Document = load_group(store.as_ref(), &registry, spec)?;
        store.save(&out.to_string_lossy(), &merged)?;
        println!("group '{name}' merged into {}", out.display());
        Ok(())
    }

    fn cmd_strategies() -> Result<()> {
        for token in StrategyRegistry::with_builtins().tokens() {
            println!("{token}");
        }
        Ok(())
    }
}
