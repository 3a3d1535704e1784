//! Index configuration.
//!
//! `IndexConfig` can be built in code, deserialized with serde, or parsed from
//! flat `key=value` properties using the `indexer.*` keys.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;
use std::thread;

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};

pub const THREADS_COUNT_PROPERTY: &str = "indexer.threads.count";
pub const BLOCK_REQUEST_PROPERTY: &str = "indexer.block.request";
pub const MAX_FILE_SIZE_PROPERTY: &str = "indexer.max.file.size";
pub const IGNORE_LIST_PROPERTY: &str = "indexer.ignore.list.file";
pub const SKIP_EXTENSIONLESS_PROPERTY: &str = "indexer.skip.no.ext";
pub const INDEX_KIND_PROPERTY: &str = "indexer.index.kind";

/// Default maximum indexable file size (30 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 30 * 1024 * 1024;

/// Worker threads per available processor.
const THREADS_PER_CPU: usize = 3;

/// Storage layout used by the manager.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// Word → paths storage plus a reverse map. Fast lookups.
    #[default]
    Inverted,
    /// Reverse map only, lookups scan every known path.
    Compact,
}

impl IndexKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inverted => "inverted",
            Self::Compact => "compact",
        }
    }
}

impl FromStr for IndexKind {
    type Err = IndexError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "inverted" => Ok(Self::Inverted),
            "compact" => Ok(Self::Compact),
            other => Err(IndexError::InvalidConfig(format!(
                "{INDEX_KIND_PROPERTY} must be `inverted` or `compact`, got `{other}`"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Size of the indexing worker pool.
    pub threads: usize,
    /// Whether queries wait for pending index updates to drain.
    pub block_requests: bool,
    /// Files larger than this many bytes are not indexed.
    pub max_file_size: u64,
    /// Optional newline-delimited list of ignore regular expressions.
    pub ignore_list_file: Option<PathBuf>,
    /// Skip regular files that have no extension.
    pub skip_extensionless: bool,
    pub index_kind: IndexKind,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            threads: default_thread_count(),
            block_requests: false,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            ignore_list_file: None,
            skip_extensionless: false,
            index_kind: IndexKind::default(),
        }
    }
}

impl IndexConfig {
    /// Builds a config from `indexer.*` properties, falling back to defaults
    /// for missing keys. Unknown keys are ignored.
    pub fn from_properties(properties: &HashMap<String, String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(value) = properties.get(THREADS_COUNT_PROPERTY) {
            config.threads = parse_value(THREADS_COUNT_PROPERTY, value)?;
        }
        if let Some(value) = properties.get(BLOCK_REQUEST_PROPERTY) {
            config.block_requests = parse_value(BLOCK_REQUEST_PROPERTY, value)?;
        }
        if let Some(value) = properties.get(MAX_FILE_SIZE_PROPERTY) {
            config.max_file_size = parse_value(MAX_FILE_SIZE_PROPERTY, value)?;
        }
        if let Some(value) = properties.get(IGNORE_LIST_PROPERTY) {
            let value = value.trim();
            config.ignore_list_file = (!value.is_empty()).then(|| PathBuf::from(value));
        }
        if let Some(value) = properties.get(SKIP_EXTENSIONLESS_PROPERTY) {
            config.skip_extensionless = parse_value(SKIP_EXTENSIONLESS_PROPERTY, value)?;
        }
        if let Some(value) = properties.get(INDEX_KIND_PROPERTY) {
            config.index_kind = value.parse()?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Parses `key=value` lines. Blank lines and `#` comments are skipped.
    pub fn parse_properties(text: &str) -> Result<HashMap<String, String>> {
        let mut properties = HashMap::new();
        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(IndexError::InvalidConfig(format!(
                    "line {}: expected key=value, got `{line}`",
                    line_no + 1
                )));
            };
            properties.insert(key.trim().to_string(), value.trim().to_string());
        }
        Ok(properties)
    }

    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(IndexError::InvalidConfig(format!(
                "{THREADS_COUNT_PROPERTY} must be greater than zero"
            )));
        }
        Ok(())
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_block_requests(mut self, block_requests: bool) -> Self {
        self.block_requests = block_requests;
        self
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn with_ignore_list_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.ignore_list_file = Some(path.into());
        self
    }

    pub fn with_skip_extensionless(mut self, skip: bool) -> Self {
        self.skip_extensionless = skip;
        self
    }

    pub fn with_index_kind(mut self, kind: IndexKind) -> Self {
        self.index_kind = kind;
        self
    }
}

impl std::fmt::Display for IndexConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{THREADS_COUNT_PROPERTY}={}; {BLOCK_REQUEST_PROPERTY}={}; {MAX_FILE_SIZE_PROPERTY}={}; {IGNORE_LIST_PROPERTY}={}; {SKIP_EXTENSIONLESS_PROPERTY}={}; {INDEX_KIND_PROPERTY}={}",
            self.threads,
            self.block_requests,
            self.max_file_size,
            self.ignore_list_file
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_default(),
            self.skip_extensionless,
            self.index_kind.as_str(),
        )
    }
}

fn default_thread_count() -> usize {
    let cpus = thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1);
    cpus * THREADS_PER_CPU
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| IndexError::InvalidConfig(format!("invalid value for {key}: `{value}`")))
}
