pub mod chunking;
pub mod document;
pub mod embeddings;
pub mod error;
pub mod gemini;
pub mod index;
pub mod llm;
pub mod prompt;
pub mod rag;
pub mod retriever;
pub mod session;

#[cfg(test)]
mod testing;

pub use error::{RagError, Result};
