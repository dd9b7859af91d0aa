use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Representation of a vector embedding
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Embedding { values }
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }
}

/// Turns text into vectors.
///
/// Corpus chunks and queries go through separate methods so a provider can
/// embed them for their respective retrieval roles.
#[allow(async_fn_in_trait)]
pub trait Embedder {
    /// Generate the embedding for a search query
    async fn embed_query(&self, text: &str) -> Result<Embedding>;

    /// Generate embeddings for corpus chunks, one per input in input order
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Embedding>>;
}

impl<T: Embedder + ?Sized> Embedder for &T {
    async fn embed_query(&self, text: &str) -> Result<Embedding> {
        (**self).embed_query(text).await
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        (**self).embed_documents(texts).await
    }
}
