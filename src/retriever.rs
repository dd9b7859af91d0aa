use crate::embeddings::Embedder;
use crate::error::{RagError, Result};
use crate::index::{ScoredChunk, VectorIndex};
use log::debug;

/// Number of chunks retrieved per query by default
pub const DEFAULT_TOP_K: usize = 3;

/// Fixed top-k similarity search over a built index
pub struct Retriever<E> {
    index: VectorIndex,
    embedder: E,
    top_k: usize,
}

impl<E: Embedder> Retriever<E> {
    pub fn new(index: VectorIndex, embedder: E, top_k: usize) -> Result<Self> {
        if top_k == 0 {
            return Err(RagError::InvalidConfig(
                "top-k must be at least 1".to_string(),
            ));
        }

        Ok(Retriever {
            index,
            embedder,
            top_k,
        })
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Embed the query and return the nearest chunks, most similar first
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ScoredChunk>> {
        let query_embedding = self.embedder.embed_query(query).await?;
        let results = self.index.search(&query_embedding, self.top_k)?;

        for result in &results {
            debug!(
                "Retrieved {}@{} (distance {:.4})",
                result.chunk.source_id, result.chunk.offset, result.distance
            );
        }

        Ok(results)
    }
}
