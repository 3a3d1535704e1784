//! Path filtering.
//!
//! Decides whether a path may ever be indexed. Rules run in order and the
//! first rejection wins:
//! 1. ignore regular expressions (from an optional newline-delimited file)
//! 2. optional "skip extensionless regular files"
//! 3. binary heuristic: known binary extensions, then a NUL byte in the head
//!
//! Directories are only checked against the ignore expressions.

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use regex::Regex;

use crate::config::IndexConfig;
use crate::error::{IndexError, Result};

/// Bytes inspected by the binary content sniff.
pub const BINARY_SNIFF_BYTES: usize = 8 * 1024;

/// Extensions that are never indexed, compared case-insensitively.
const BINARY_EXTENSIONS: &[&str] = &[
    // archives
    "7z", "bz2", "gz", "jar", "rar", "tar", "tgz", "war", "xz", "zip", "zst",
    // executables and objects
    "a", "bin", "class", "dll", "dylib", "exe", "o", "obj", "pyc", "rlib", "so",
    // images
    "bmp", "gif", "ico", "jpeg", "jpg", "png", "psd", "tif", "tiff", "webp",
    // audio and video
    "avi", "flac", "mkv", "mov", "mp3", "mp4", "ogg", "wav", "webm", "wmv",
    // documents and data
    "db", "doc", "docx", "iso", "pdf", "ppt", "pptx", "sqlite", "xls", "xlsx",
    // fonts
    "otf", "ttf", "woff", "woff2",
];

#[derive(Debug, Default)]
pub struct PathFilter {
    patterns: Vec<Regex>,
    skip_extensionless: bool,
}

impl PathFilter {
    /// Filter with no ignore expressions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles one expression per non-blank line of `text`.
    pub fn from_patterns(text: &str) -> Result<Self> {
        let patterns = text
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .map(|line| {
                Regex::new(line).map_err(|error| {
                    IndexError::InvalidConfig(format!("invalid ignore pattern `{line}`: {error}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            patterns,
            skip_extensionless: false,
        })
    }

    /// Reads ignore expressions from `path`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|error| {
            IndexError::InvalidConfig(format!(
                "unable to read ignore list {}: {error}",
                path.display()
            ))
        })?;
        Self::from_patterns(&text)
    }

    /// Builds the filter described by `config`. A configured ignore list that
    /// is not a file is treated as absent.
    pub fn from_config(config: &IndexConfig) -> Result<Self> {
        let filter = match config.ignore_list_file.as_deref() {
            Some(path) if path.is_file() => Self::from_file(path)?,
            Some(path) => {
                log::warn!("ignore list {} is not a file, skipping", path.display());
                Self::new()
            }
            None => Self::new(),
        };
        Ok(filter.with_skip_extensionless(config.skip_extensionless))
    }

    pub fn with_skip_extensionless(mut self, skip: bool) -> Self {
        self.skip_extensionless = skip;
        self
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn accept(&self, path: &Path) -> bool {
        let text = path.to_string_lossy();
        if self.patterns.iter().any(|pattern| pattern.is_match(&text)) {
            return false;
        }
        match fs::metadata(path) {
            Ok(metadata) if metadata.is_dir() => true,
            Ok(metadata) if metadata.is_file() => {
                if self.skip_extensionless && path.extension().is_none() {
                    return false;
                }
                !looks_binary(path)
            }
            // Vanished or special files: let the index task sort it out.
            _ => !has_binary_extension(path),
        }
    }
}

impl std::fmt::Display for PathFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.patterns.is_empty() {
            return write!(f, "empty path filter");
        }
        let patterns: Vec<&str> = self.patterns.iter().map(Regex::as_str).collect();
        write!(f, "path filter patterns: {patterns:?}")
    }
}

fn has_binary_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            BINARY_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

fn looks_binary(path: &Path) -> bool {
    if has_binary_extension(path) {
        return true;
    }
    let Ok(file) = File::open(path) else {
        return false;
    };
    let mut head = Vec::with_capacity(BINARY_SNIFF_BYTES);
    if file
        .take(BINARY_SNIFF_BYTES as u64)
        .read_to_end(&mut head)
        .is_err()
    {
        return false;
    }
    memchr::memchr(0, &head).is_some()
}
