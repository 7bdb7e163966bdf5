use std::time::Duration;

use async_trait::async_trait;

use async_openai::{
    config::OpenAIConfig,
    types::{
        chat::{
            ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
            ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
            CreateChatCompletionRequestArgs,
        },
        embeddings::{CreateEmbeddingRequestArgs, EmbeddingInput},
    },
    Client,
};

use crate::error::{ArborBotError, Result};
use crate::interfaces::providers::{EmbeddingProvider, LlmProvider};

pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// OpenAI-compatible chat + embeddings endpoint. The generation call is
/// bounded by an explicit timeout so a stalled upstream surfaces as
/// `UpstreamTimeout` instead of hanging the pipeline.
#[derive(Clone)]
pub struct OpenAiProvider {
    model: String,
    embedding_model: String,
    timeout: Duration,
    client: Client<OpenAIConfig>,
}

impl OpenAiProvider {
    pub fn new(
        api_key: String,
        model: Option<String>,
        embedding_model: Option<String>,
        base_url: Option<String>,
    ) -> Self {
        let model = model.unwrap_or_else(|| "gpt-4o-mini".to_string());
        let embedding_model =
            embedding_model.unwrap_or_else(|| "text-embedding-3-small".to_string());
        let base_url = base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string());
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(base_url);
        Self {
            model,
            embedding_model,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            client: Client::with_config(config),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn build_system_message(system_prompt: &str) -> Result<Option<ChatCompletionRequestMessage>> {
        if system_prompt.is_empty() {
            return Ok(None);
        }
        let message = ChatCompletionRequestSystemMessageArgs::default()
            .content(system_prompt)
            .build()
            .map_err(|e| ArborBotError::Runtime(e.to_string()))?;
        Ok(Some(ChatCompletionRequestMessage::System(message)))
    }

    fn build_user_message(prompt: &str) -> Result<ChatCompletionRequestMessage> {
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(ChatCompletionRequestUserMessageContent::Text(
                prompt.to_string(),
            ))
            .build()
            .map_err(|e| ArborBotError::Runtime(e.to_string()))?;
        Ok(ChatCompletionRequestMessage::User(message))
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String> {
        let mut messages = Vec::new();
        if let Some(system) = Self::build_system_message(system_prompt)? {
            messages.push(system);
        }
        messages.push(Self::build_user_message(prompt)?);

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.clone())
            .messages(messages)
            .max_completion_tokens(max_tokens)
            .temperature(temperature)
            .build()
            .map_err(|e| ArborBotError::Runtime(e.to_string()))?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| ArborBotError::UpstreamTimeout(self.timeout.as_secs()))?
            .map_err(|e| ArborBotError::Upstream(e.to_string()))?;

        let text = response
            .choices
            .first()
            .ok_or_else(|| ArborBotError::Upstream("no choices returned".to_string()))?
            .message
            .content
            .clone()
            .unwrap_or_default();
        Ok(text)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(ArborBotError::Embedding(
                "cannot embed empty text".to_string(),
            ));
        }

        let request = CreateEmbeddingRequestArgs::default()
            .model(self.embedding_model.clone())
            .input(EmbeddingInput::String(text.to_string()))
            .build()
            .map_err(|e| ArborBotError::Embedding(e.to_string()))?;

        let response = tokio::time::timeout(self.timeout, self.client.embeddings().create(request))
            .await
            .map_err(|_| ArborBotError::UpstreamTimeout(self.timeout.as_secs()))?
            .map_err(|e| ArborBotError::Embedding(e.to_string()))?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| ArborBotError::Embedding("no embedding data returned".to_string()))
    }
}
