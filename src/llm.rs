use crate::error::Result;

/// Default decoding temperature for answers
pub const DEFAULT_TEMPERATURE: f32 = 0.5;

/// A chat-completion service that answers a fully assembled prompt
#[allow(async_fn_in_trait)]
pub trait ChatModel {
    /// Generate the answer text for `prompt`
    async fn generate(&self, prompt: &str) -> Result<String>;
}

impl<T: ChatModel + ?Sized> ChatModel for &T {
    async fn generate(&self, prompt: &str) -> Result<String> {
        (**self).generate(prompt).await
    }
}
