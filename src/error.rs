use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, RagError>;

/// Failure kinds of the retrieval pipeline.
///
/// Startup failures (`MissingData`, `Initialization`, `InvalidConfig`) are fatal.
/// Query failures (`EmbeddingService`, `LlmService`, `LlmEmptyResponse`) are
/// reported for that query only.
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Data files not found: {}", display_paths(.missing))]
    MissingData { missing: Vec<PathBuf> },
    #[error("Failed to initialize RAG system: {0}")]
    Initialization(String),
    #[error("Embedding service error: {0}")]
    EmbeddingService(String),
    #[error("LLM service error: {0}")]
    LlmService(String),
    #[error("LLM returned no usable content")]
    LlmEmptyResponse,
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("A query is already being processed")]
    SessionBusy,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<String>>()
        .join(", ")
}
