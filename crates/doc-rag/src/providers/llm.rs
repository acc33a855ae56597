//! LLM provider trait for generating answers

use async_trait::async_trait;
use crate::error::Result;

/// Trait for LLM-based answer generation
///
/// Implementations:
/// - `OllamaLlm`: Local Ollama server
/// - `OpenAiCompatLlm`: Groq or any OpenAI-compatible chat API
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete a fully rendered prompt with the given model
    async fn generate(&self, model: &str, prompt: &str) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
