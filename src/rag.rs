use crate::chunking::{split_documents, ChunkerConfig};
use crate::document::{load_corpus, CorpusPaths, Document};
use crate::embeddings::Embedder;
use crate::error::{RagError, Result};
use crate::index::{ScoredChunk, VectorIndex};
use crate::llm::ChatModel;
use crate::prompt::PromptTemplate;
use crate::retriever::{Retriever, DEFAULT_TOP_K};
use log::{debug, info};

/// Tunables for building the pipeline
#[derive(Debug, Clone)]
pub struct RagSettings {
    pub chunker: ChunkerConfig,
    pub top_k: usize,
    pub template: PromptTemplate,
}

impl Default for RagSettings {
    fn default() -> Self {
        RagSettings {
            chunker: ChunkerConfig::default(),
            top_k: DEFAULT_TOP_K,
            template: PromptTemplate::default(),
        }
    }
}

/// An answer together with the chunks it was grounded on
#[derive(Debug, Clone)]
pub struct RagAnswer {
    pub text: String,
    pub sources: Vec<ScoredChunk>,
}

/// RAG (Retrieval-Augmented Generation) system.
///
/// Expensive to build; construct once at startup and share by reference.
/// Nothing in it changes after construction.
pub struct RagSystem<E, L> {
    retriever: Retriever<E>,
    template: PromptTemplate,
    llm: L,
}

impl<E: Embedder, L: ChatModel> RagSystem<E, L> {
    /// Load the corpus from disk and build the index.
    ///
    /// Missing corpus files are reported before any service is called.
    pub async fn initialize(
        paths: &CorpusPaths,
        settings: RagSettings,
        embedder: E,
        llm: L,
    ) -> Result<Self> {
        let documents = load_corpus(paths)?;
        Self::from_documents(documents, settings, embedder, llm).await
    }

    /// Chunk, embed and index already loaded documents
    pub async fn from_documents(
        documents: Vec<Document>,
        settings: RagSettings,
        embedder: E,
        llm: L,
    ) -> Result<Self> {
        let chunks = split_documents(&documents, &settings.chunker);
        info!(
            "Split {} documents into {} chunks",
            documents.len(),
            chunks.len()
        );

        info!("Generating embeddings for chunks...");
        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = embedder.embed_documents(&texts).await.map_err(|e| {
            RagError::Initialization(format!("Failed to embed corpus: {}", e))
        })?;

        let index = VectorIndex::build(chunks, embeddings)?;
        let retriever = Retriever::new(index, embedder, settings.top_k)?;

        Ok(RagSystem {
            retriever,
            template: settings.template,
            llm,
        })
    }

    pub fn retriever(&self) -> &Retriever<E> {
        &self.retriever
    }

    /// Retrieve context for `question` and assemble the prompt
    pub async fn build_prompt(&self, question: &str) -> Result<(String, Vec<ScoredChunk>)> {
        let sources = self.retriever.retrieve(question).await?;
        let chunks: Vec<_> = sources.iter().map(|scored| scored.chunk.clone()).collect();
        let prompt = self.template.assemble(&chunks, question);
        debug!("Assembled prompt of {} characters", prompt.len());

        Ok((prompt, sources))
    }

    /// Answer a question: retrieve, assemble, generate
    pub async fn answer(&self, question: &str) -> Result<RagAnswer> {
        let (prompt, sources) = self.build_prompt(question).await?;
        let text = self.llm.generate(&prompt).await?;

        Ok(RagAnswer { text, sources })
    }
}
