use crate::embeddings::{Embedder, Embedding};
use crate::error::{RagError, Result};
use crate::llm::{ChatModel, DEFAULT_TEMPERATURE};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Environment variable holding the API credential
pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";

const API_KEY_HEADER: &str = "x-goog-api-key";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_EMBEDDING_MODEL: &str = "models/gemini-embedding-001";
const DEFAULT_CHAT_MODEL: &str = "models/gemini-2.5-flash";

/// Upper bound on requests per `batchEmbedContents` call
const MAX_EMBED_BATCH: usize = 100;

/// Configuration for Gemini API
#[derive(Clone, Debug)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
    pub temperature: f32,
    /// No timeout when `None`
    pub request_timeout: Option<Duration>,
}

impl GeminiConfig {
    /// Configuration with the default models and endpoint
    pub fn new(api_key: impl Into<String>) -> Self {
        GeminiConfig {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            request_timeout: None,
        }
    }

    /// Create a new configuration from environment variables.
    ///
    /// A missing key is left for the service to reject.
    pub fn from_env() -> Self {
        let api_key = env::var(API_KEY_VAR).unwrap_or_else(|_| {
            warn!("{} is not set; requests will not be authenticated", API_KEY_VAR);
            String::new()
        });

        GeminiConfig::new(api_key)
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn method_url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/{}:{}",
            self.base_url.trim_end_matches('/'),
            model,
            method
        )
    }
}

/// Client for interacting with Gemini API
#[derive(Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            RagError::Initialization(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(GeminiClient { config, client })
    }

    /// Get the client configuration
    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// POST a JSON body, mapping every failure through `service_error`
    async fn post<B, R>(
        &self,
        url: &str,
        body: &B,
        service_error: fn(String) -> RagError,
    ) -> Result<R>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| service_error(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(service_error(format!(
                "API request failed: {} {}",
                status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| service_error(format!("Malformed response: {}", e)))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let request = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| {
                    EmbedRequest::new(
                        &self.config.embedding_model,
                        text,
                        TaskType::RetrievalDocument,
                    )
                })
                .collect(),
        };

        let url = self
            .config
            .method_url(&self.config.embedding_model, "batchEmbedContents");
        let response: BatchEmbedResponse = self
            .post(&url, &request, RagError::EmbeddingService)
            .await?;

        if response.embeddings.len() != texts.len() {
            return Err(RagError::EmbeddingService(format!(
                "Expected {} embeddings, received {}",
                texts.len(),
                response.embeddings.len()
            )));
        }

        Ok(response
            .embeddings
            .into_iter()
            .map(|data| Embedding::new(data.values))
            .collect())
    }
}

impl Embedder for GeminiClient {
    async fn embed_query(&self, text: &str) -> Result<Embedding> {
        let request =
            EmbedRequest::new(&self.config.embedding_model, text, TaskType::RetrievalQuery);
        let url = self
            .config
            .method_url(&self.config.embedding_model, "embedContent");

        let response: EmbeddingResponse = self
            .post(&url, &request, RagError::EmbeddingService)
            .await?;

        Ok(Embedding::new(response.embedding.values))
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let mut embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(MAX_EMBED_BATCH) {
            debug!("Embedding batch of {} chunks", batch.len());
            embeddings.extend(self.embed_batch(batch).await?);
        }

        Ok(embeddings)
    }
}

impl ChatModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content::new_with_role(prompt, "user")],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
            },
        };

        let url = self
            .config
            .method_url(&self.config.chat_model, "generateContent");
        let response: GenerateResponse = self.post(&url, &request, RagError::LlmService).await?;

        extract_answer(response)
    }
}

/// Concatenate the text parts of the first candidate
fn extract_answer(response: GenerateResponse) -> Result<String> {
    let candidate = match response.candidates.into_iter().next() {
        Some(candidate) => candidate,
        None => return Err(RagError::LlmEmptyResponse),
    };

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        warn!(
            "Empty answer from model (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        );
        return Err(RagError::LlmEmptyResponse);
    }

    Ok(text)
}

// Request/response structures for the Gemini API

#[derive(Serialize, Debug, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum TaskType {
    RetrievalDocument,
    RetrievalQuery,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest<'a> {
    model: &'a str,
    content: EmbedContent<'a>,
    task_type: TaskType,
}

impl<'a> EmbedRequest<'a> {
    fn new(model: &'a str, text: &'a str, task_type: TaskType) -> Self {
        EmbedRequest {
            model,
            content: EmbedContent {
                parts: vec![Part { text }],
            },
            task_type,
        }
    }
}

#[derive(Serialize)]
struct EmbedContent<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedRequest<'a>>,
}

#[derive(Deserialize, Debug)]
struct EmbeddingResponse {
    embedding: EmbeddingData,
}

#[derive(Deserialize, Debug)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingData>,
}

#[derive(Deserialize, Debug)]
struct EmbeddingData {
    values: Vec<f32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
    role: &'static str,
}

impl<'a> Content<'a> {
    fn new_with_role(text: &'a str, role: &'static str) -> Self {
        Content {
            parts: vec![Part { text }],
            role,
        }
    }
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}
