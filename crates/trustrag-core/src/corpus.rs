//! Corpus loading and chunking.
//!
//! A corpus is a read-only snapshot of plain-text documents, split
//! into word-window chunks. Chunk source ids use the
//! `"{filename}#{index}"` form where the index is a global counter
//! across all files, so an id names exactly one chunk for the lifetime
//! of the snapshot.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Maximum words per chunk.
pub const MAX_CHUNK_WORDS: usize = 200;

/// Overlapping words between consecutive chunks of the same paragraph.
pub const CHUNK_OVERLAP_WORDS: usize = 40;

/// Errors from corpus loading.
#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("corpus path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("no .txt files found in directory: {0}")]
    NoDocuments(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One retrievable chunk of corpus text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub source_id: String,
    pub text: String,
}

/// An in-memory corpus snapshot.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    chunks: Vec<Chunk>,
}

impl Corpus {
    /// Load every `.txt` file in a directory, in sorted filename
    /// order, splitting each into paragraph-then-word-window chunks.
    pub fn load_dir(path: impl AsRef<Path>) -> Result<Self, CorpusError> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(CorpusError::NotADirectory(path.to_path_buf()));
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(path)
            .map_err(|source| CorpusError::Io {
                path: path.to_path_buf(),
                source,
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "txt"))
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(CorpusError::NoDocuments(path.to_path_buf()));
        }

        let mut docs = Vec::with_capacity(files.len());
        for file in files {
            let content = std::fs::read_to_string(&file).map_err(|source| CorpusError::Io {
                path: file.clone(),
                source,
            })?;
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.display().to_string());
            docs.push((filename, content));
        }

        Ok(Self::from_documents(
            docs.iter().map(|(name, text)| (name.as_str(), text.as_str())),
        ))
    }

    /// Build a corpus from in-memory `(filename, content)` documents.
    /// Chunking matches [`Corpus::load_dir`]; document order is
    /// preserved as insertion order.
    pub fn from_documents<'a>(docs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut chunks = Vec::new();
        let mut chunk_index = 0usize;

        for (filename, content) in docs {
            for paragraph in content.split("\n\n") {
                let paragraph = paragraph.trim();
                if paragraph.is_empty() {
                    continue;
                }
                for text in split_into_chunks(paragraph, MAX_CHUNK_WORDS, CHUNK_OVERLAP_WORDS) {
                    chunks.push(Chunk {
                        source_id: format!("{filename}#{chunk_index}"),
                        text,
                    });
                    chunk_index += 1;
                }
            }
        }

        Self { chunks }
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Split a paragraph into word-window chunks with overlap.
///
/// `overlap` must be smaller than `max_words` or the window cannot
/// advance.
pub fn split_into_chunks(text: &str, max_words: usize, overlap: usize) -> Vec<String> {
    debug_assert!(overlap < max_words);

    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }
    if words.len() <= max_words {
        return vec![words.join(" ")];
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < words.len() {
        let end = (start + max_words).min(words.len());
        chunks.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }
        start = end - overlap;
    }
    chunks
}
