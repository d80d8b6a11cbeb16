pub mod gemini;
pub mod prompts;

use crate::errors::Result;
use async_trait::async_trait;

pub use gemini::GeminiClient;

/// A completion model that turns a prompt into prose
#[async_trait]
pub trait TextGenerator {
    fn model_name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String>;
}
