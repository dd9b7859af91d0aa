//! In-process stand-ins for the embedding and chat services.

use crate::embeddings::{Embedder, Embedding};
use crate::error::{RagError, Result};
use crate::llm::ChatModel;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

const VOCABULARY: &[&str] = &[
    "sustainability",
    "net-zero",
    "engineering",
    "team",
    "revenue",
    "quarter",
    "office",
    "hiring",
    "research",
    "capital",
    "france",
];

/// Embeds text as normalized keyword counts plus a constant bias component
#[derive(Default)]
pub struct KeywordEmbedder {
    calls: AtomicUsize,
    fail_queries: AtomicBool,
    fail_documents: AtomicBool,
}

impl KeywordEmbedder {
    pub fn fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    pub fn fail_documents(&self, fail: bool) {
        self.fail_documents.store(fail, Ordering::SeqCst);
    }

    /// Number of embedding calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn embed(text: &str) -> Embedding {
        let text = text.to_lowercase();
        let mut values: Vec<f32> = VOCABULARY
            .iter()
            .map(|word| text.matches(word).count() as f32)
            .collect();
        values.push(1.0);

        let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        Embedding::new(values.into_iter().map(|v| v / norm).collect())
    }
}

impl Embedder for KeywordEmbedder {
    async fn embed_query(&self, text: &str) -> Result<Embedding> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(RagError::EmbeddingService(
                "Request failed: connection reset".to_string(),
            ));
        }
        Ok(Self::embed(text))
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_documents.load(Ordering::SeqCst) {
            return Err(RagError::EmbeddingService(
                "API request failed: 429 Too Many Requests".to_string(),
            ));
        }
        Ok(texts.iter().map(|text| Self::embed(text)).collect())
    }
}

/// Records every prompt and replies with a fixed answer
pub struct RecordingChatModel {
    reply: String,
    prompts: Mutex<Vec<String>>,
}

impl RecordingChatModel {
    pub fn new(reply: &str) -> Self {
        RecordingChatModel {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl ChatModel for RecordingChatModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.reply.trim().is_empty() {
            return Err(RagError::LlmEmptyResponse);
        }
        Ok(self.reply.clone())
    }
}

/// Never answers; stands in for a request that is still in flight
pub struct PendingChatModel;

impl ChatModel for PendingChatModel {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        std::future::pending().await
    }
}
