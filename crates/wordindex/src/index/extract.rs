//! Word extraction from file content.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use fnv::FnvHashSet;

use crate::error::{IndexError, Result};

/// Characters that separate words in the default text tokenizer.
pub const WORD_DELIMITERS: &[char] = &[
    ' ', '\t', '\n', '\r', '\u{c}', ',', '.', ':', ';', '?', '!', '[', ']', '\'', '(', ')',
];

/// Turns a file into the set of words it contains.
pub trait WordExtractor: Send + Sync {
    /// Extracts the distinct words of `path`.
    ///
    /// Must fail with [`IndexError::EmptyFile`] or [`IndexError::FileTooLarge`]
    /// for content the extractor refuses to read.
    fn extract(&self, path: &Path) -> Result<FnvHashSet<String>>;
}

/// Splits file content on [`WORD_DELIMITERS`]. Content is decoded as UTF-8,
/// invalid sequences are replaced.
#[derive(Debug, Clone)]
pub struct TextWordExtractor {
    max_file_size: u64,
}

impl TextWordExtractor {
    pub fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    fn read_content(&self, path: &Path) -> Result<Vec<u8>> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        if size == 0 {
            return Err(IndexError::EmptyFile(path.to_path_buf()));
        }
        if size > self.max_file_size {
            return Err(IndexError::FileTooLarge {
                path: path.to_path_buf(),
                size,
                limit: self.max_file_size,
            });
        }
        let mut content = Vec::with_capacity(size as usize);
        // The file may grow between stat and read.
        file.take(self.max_file_size).read_to_end(&mut content)?;
        Ok(content)
    }
}

impl WordExtractor for TextWordExtractor {
    fn extract(&self, path: &Path) -> Result<FnvHashSet<String>> {
        let content = self.read_content(path)?;
        Ok(split_words(&String::from_utf8_lossy(&content)))
    }
}

/// Splits `text` into its distinct words.
pub fn split_words(text: &str) -> FnvHashSet<String> {
    text.split(WORD_DELIMITERS)
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}
