use crate::document::Document;
use crate::error::{RagError, Result};

/// Default window size, in characters
pub const DEFAULT_CHUNK_SIZE: usize = 500;
/// Default overlap between consecutive windows, in characters
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

/// Represents a text chunk with metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// The actual text content of this chunk
    pub text: String,
    /// Source of the document this chunk belongs to
    pub source_id: String,
    /// Character offset of this chunk in the original document
    pub offset: usize,
}

/// Window size and overlap for the splitter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl ChunkerConfig {
    /// Overlap must be strictly smaller than a non-zero window
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::InvalidConfig(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::InvalidConfig(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                chunk_overlap, chunk_size
            )));
        }

        Ok(ChunkerConfig {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    fn step(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        ChunkerConfig {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Split every document, keeping document order
pub fn split_documents(documents: &[Document], config: &ChunkerConfig) -> Vec<Chunk> {
    documents
        .iter()
        .flat_map(|document| split_into_chunks(&document.text, &document.source_id, config))
        .collect()
}

/// Slide a window of `chunk_size` characters over `text`, advancing by
/// `chunk_size - chunk_overlap`. Only the last window may be shorter.
pub fn split_into_chunks(text: &str, source_id: &str, config: &ChunkerConfig) -> Vec<Chunk> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    // Byte position of every character boundary, including the end of the text
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_count = boundaries.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + config.chunk_size).min(char_count);
        chunks.push(Chunk {
            text: text[boundaries[start]..boundaries[end]].to_string(),
            source_id: source_id.to_string(),
            offset: start,
        });

        if end == char_count {
            break;
        }
        start += config.step();
    }

    chunks
}
