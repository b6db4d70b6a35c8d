//! Chat-completion client abstraction and the OpenAI implementation.
//!
//! [`ChatModel`] is the seam between the answer assembler and the hosted
//! language model, so tests can verify the no-context path never reaches
//! the API. The answer path makes exactly one completion call per
//! question; failures surface directly to the caller.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::OpenAiConfig;

/// A client that answers a (system, user) prompt pair with text.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier (e.g. `"gpt-4o-mini"`).
    fn model_name(&self) -> &str;
    /// Run one completion and return the answer text.
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

/// Chat-completion client for the OpenAI API (`POST /v1/chat/completions`).
pub struct OpenAiChat {
    model: String,
    api_key: String,
    client: reqwest::Client,
}

/// Sampling temperature for answers. Low, so the model stays close to
/// the supplied context.
const ANSWER_TEMPERATURE: f64 = 0.2;

impl OpenAiChat {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `OPENAI_API_KEY` is not set in the environment.
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            model: config.chat_model.clone(),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "temperature": ANSWER_TEMPERATURE,
        });

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("OpenAI chat API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        parse_completion_response(&json)
    }
}

/// Extract `choices[0].message.content` from the completion response.
fn parse_completion_response(json: &serde_json::Value) -> Result<String> {
    let content = json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing message content"))?;

    if content.trim().is_empty() {
        bail!("OpenAI chat API returned an empty answer");
    }

    Ok(content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_response_parsed() {
        let json = serde_json::json!({
            "choices": [
                { "message": { "role": "assistant", "content": "The answer [1]." } }
            ]
        });
        assert_eq!(
            parse_completion_response(&json).unwrap(),
            "The answer [1]."
        );
    }

    #[test]
    fn missing_choices_is_error() {
        let json = serde_json::json!({ "choices": [] });
        assert!(parse_completion_response(&json).is_err());
    }

    #[test]
    fn empty_content_is_error() {
        let json = serde_json::json!({
            "choices": [ { "message": { "content": "   " } } ]
        });
        assert!(parse_completion_response(&json).is_err());
    }
}
