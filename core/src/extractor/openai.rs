//! OpenAI-compatible `LlmPort`, following `arbiter::llm_provider::OpenAILlmProvider`:
//! a `reqwest::Client` built once with a request timeout, a stable system
//! prompt, and the user prompt templated with the Master snapshot and recent
//! log entries.

use super::{ExtractionInput, LlmContract, LlmPort};
use crate::errors::ExtractionError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SYSTEM_PROMPT: &str = include_str!("../../assets/extractor_system_prompt.txt");

#[derive(Debug, Clone)]
pub struct OpenAiLlmPortConfig {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
}

pub struct OpenAiCompatibleLlmPort {
    config: OpenAiLlmPortConfig,
    client: reqwest::Client,
}

impl OpenAiCompatibleLlmPort {
    pub fn new(config: OpenAiLlmPortConfig) -> Result<Self, ExtractionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ExtractionError::LlmUnavailable(format!("failed to build http client: {e}")))?;
        Ok(Self { config, client })
    }

    fn user_prompt(input: &ExtractionInput<'_>) -> String {
        let master_json = serde_json::to_string(input.master_snapshot).unwrap_or_default();
        let log: Vec<String> = input
            .recent_log
            .iter()
            .map(|e| format!("{:?}: {}", e.role, e.text))
            .collect();
        format!(
            "current_state: {:?}\nmaster_snapshot: {}\nrecent_log:\n{}\nuser_message: {}",
            input.current_state,
            master_json,
            log.join("\n"),
            input.user_message
        )
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
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
    content: String,
}

#[async_trait]
impl LlmPort for OpenAiCompatibleLlmPort {
    async fn extract(
        &self,
        input: ExtractionInput<'_>,
        deadline: Duration,
    ) -> Result<LlmContract, ExtractionError> {
        let request = ChatRequest {
            model: &self.config.model,
            temperature: 0.0,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: Self::user_prompt(&input),
                },
            ],
        };

        let send = self
            .client
            .post(format!("{}/chat/completions", self.config.api_base))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send();

        let response = tokio::time::timeout(deadline, send)
            .await
            .map_err(|_| ExtractionError::DeadlineExceeded)?
            .map_err(|e| ExtractionError::LlmUnavailable(e.to_string()))?;

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::LlmUnavailable(e.to_string()))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ExtractionError::InvalidContract("empty choices array".to_string()))?;

        serde_json::from_str(&content)
            .map_err(|e| ExtractionError::InvalidContract(format!("failed to parse contract json: {e}")))
    }

    async fn is_ready(&self) -> bool {
        !self.config.api_key.is_empty()
    }
}
