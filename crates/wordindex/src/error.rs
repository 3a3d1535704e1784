use std::fs;
use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("File has zero length: {0}")]
    EmptyFile(PathBuf),

    #[error("File is too big: {path} ({size} > {limit} bytes)")]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("Directory {0} is not watched")]
    NotWatched(PathBuf),

    #[error("Index is terminated")]
    Terminated,

    #[error("Watch error: {0}")]
    Watch(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IndexError {
    /// Returns true for per-file failures that leave the file simply
    /// contributing no words: empty or oversized content, or a file that
    /// vanished between listing and reading.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::EmptyFile(_) | Self::FileTooLarge { .. } => true,
            Self::Io(error) => error.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated)
    }
}

pub type Result<T> = std::result::Result<T, IndexError>;

/// Canonicalizes a path, returning the original if canonicalization fails.
pub fn canonicalize_existing_path(path: PathBuf) -> PathBuf {
    fs::canonicalize(&path).unwrap_or(path)
}
