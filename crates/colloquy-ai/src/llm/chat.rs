use std::time::Duration;

use async_trait::async_trait;
use colloquy_core::{GenerationParams, ResponseGenerator, Unavailable};
use serde::{Deserialize, Serialize};

/// Generator for OpenAI-compatible `/chat/completions` endpoints
/// (Groq, OpenAI, llama.cpp server, vLLM, ...).
pub struct ChatCompletionGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    params: GenerationParams,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionGenerator {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        params: GenerationParams,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
            params,
        })
    }

    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    fn build_request<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if !self.params.system_instructions.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: &self.params.system_instructions,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });
        ChatRequest {
            model: &self.model,
            messages,
            max_tokens: self.params.max_tokens,
            temperature: self.params.temperature,
        }
    }
}

#[async_trait]
impl ResponseGenerator for ChatCompletionGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, Unavailable> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = self.build_request(prompt);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Unavailable::Transport(format!("Generation request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(Unavailable::Status { status, body });
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| Unavailable::Malformed(format!("Generation response: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| Unavailable::Malformed("no completion content".into()))?;

        tracing::debug!("Generated {} chars with {}", content.len(), self.model);
        Ok(content)
    }
}
