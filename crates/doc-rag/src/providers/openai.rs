//! OpenAI-compatible chat completions (Groq by default)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::{Error, Result};

use super::llm::LlmProvider;
use super::retry::Backoff;

/// Chat-completions client for hosted models
pub struct OpenAiCompatLlm {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    api_key_env: String,
    temperature: f32,
    backoff: Backoff,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiCompatLlm {
    /// Build the client, reading the API key from the configured variable
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
        Self::with_api_key(config, api_key)
    }

    /// Build the client with an explicit key
    pub fn with_api_key(config: &LlmConfig, api_key: Option<String>) -> Result<Self> {
        if api_key.is_none() {
            tracing::warn!(
                "{} is not set; answer generation via {} will fail",
                config.api_key_env,
                config.base_url
            );
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            api_key_env: config.api_key_env.clone(),
            temperature: config.temperature,
            backoff: Backoff::new(config.max_retries),
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatLlm {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::llm(format!("API key not configured ({})", self.api_key_env)))?;

        let url = format!("{}/chat/completions", self.base_url);
        let url = url.as_str();
        let client = &self.client;
        let temperature = self.temperature;

        tracing::info!("Generating answer with hosted model: {}", model);

        self.backoff
            .run("Chat completion", || async move {
                let request = ChatRequest {
                    model,
                    messages: [ChatMessage {
                        role: "user",
                        content: prompt,
                    }],
                    temperature,
                };

                let response = client
                    .post(url)
                    .bearer_auth(api_key)
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| Error::llm(format!("Chat request failed: {}", e)))?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(Error::llm(format!(
                        "Chat completion failed: HTTP {} - {}",
                        status, body
                    )));
                }

                let chat: ChatResponse = response
                    .json()
                    .await
                    .map_err(|e| Error::llm(format!("Failed to parse chat response: {}", e)))?;

                chat.choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.message.content)
                    .ok_or_else(|| Error::llm("Chat response contained no answer"))
            })
            .await
    }

    async fn health_check(&self) -> Result<bool> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(false);
        };
        let url = format!("{}/models", self.base_url);
        match self.client.get(&url).bearer_auth(api_key).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "openai-compatible"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_shape() {
        let request = ChatRequest {
            model: "llama-3.1-8b-instant",
            messages: [ChatMessage {
                role: "user",
                content: "question",
            }],
            temperature: 0.25,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "question");
        assert_eq!(json["temperature"], 0.25);
    }

    #[test]
    fn test_chat_response_parse() {
        let raw = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"42"}}]}"#;
        let chat: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(chat.choices[0].message.content.as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_network() {
        let llm = OpenAiCompatLlm::with_api_key(&LlmConfig::default(), None).unwrap();
        let err = llm.generate("allam-2-7b", "hello").await.unwrap_err();
        assert!(matches!(err, Error::Llm(ref msg) if msg.contains("GROQ_API_KEY")));
        assert!(!llm.health_check().await.unwrap());
    }
}
