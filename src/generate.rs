use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_bedrockruntime::Client;
use aws_sdk_bedrockruntime::config::retry::RetryConfig;
use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::types::{
    ContentBlock, ConversationRole, InferenceConfiguration, Message,
};
use log::{debug, info, warn};
use thiserror::Error;

const DEFAULT_MODEL_ID: &str = "amazon.nova-micro-v1:0";

pub const MODEL_CONTEXT_TOKENS: u32 = 4097;
pub const MIN_OUTPUT_TOKENS: u32 = 128;
const PROMPT_TOKEN_OVERHEAD: u32 = 256;
const CHARS_PER_TOKEN: u32 = 4;

pub const REQUEST_RETRIES: u32 = 3;
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const INITIAL_TEMPERATURE: f32 = 0.2;
const TEMPERATURE_STEP: f32 = 0.2;
const MAX_TEMPERATURE: f32 = 1.0;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("request exceeded the model's input limit: {0}")]
    InputTooLarge(String),

    #[error("response of {length} chars exceeds the {max} char limit")]
    ResponseTooLong { length: usize, max: usize },

    #[error("response contained no text")]
    EmptyResponse,

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("completion request failed: {0}")]
    Request(String),
}

impl GenerationError {
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::InputTooLarge(_) => "InputTooLargeError",
            GenerationError::ResponseTooLong { .. } => "ResponseTooLongError",
            GenerationError::EmptyResponse => "EmptyResponseError",
            GenerationError::Timeout(_) => "TimeoutError",
            GenerationError::Request(_) => "RequestError",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionRequest<'a> {
    pub prompt: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A single chat-completion attempt against a text generation backend.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, GenerationError>;
}

/// Rough accounting of how much of the model context the prompt occupies.
#[derive(Debug, Clone, Copy, PartialEq)]
struct TokenBudget {
    prompt_estimate: u32,
}

impl TokenBudget {
    fn for_prompt(prompt: &str) -> Self {
        let chars = u32::try_from(prompt.chars().count()).unwrap_or(u32::MAX);
        Self {
            prompt_estimate: (chars / CHARS_PER_TOKEN)
                .saturating_add(PROMPT_TOKEN_OVERHEAD)
                .min(MODEL_CONTEXT_TOKENS),
        }
    }

    fn grow(&mut self) {
        // +20%
        self.prompt_estimate =
            (self.prompt_estimate.saturating_mul(6) / 5).min(MODEL_CONTEXT_TOKENS);
    }

    fn max_output_tokens(&self) -> u32 {
        MODEL_CONTEXT_TOKENS
            .saturating_sub(self.prompt_estimate)
            .max(MIN_OUTPUT_TOKENS)
    }
}

pub struct TextGenerator {
    completion: Box<dyn Completion>,
    retries: u32,
    timeout: Duration,
}

impl TextGenerator {
    pub fn new(completion: Box<dyn Completion>) -> Self {
        Self {
            completion,
            retries: REQUEST_RETRIES,
            timeout: REQUEST_TIMEOUT,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[cfg(test)]
    pub(crate) fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries.max(1);
        self
    }

    pub async fn generate(
        &self,
        prompt: &str,
        max_response_length: usize,
    ) -> Result<String, GenerationError> {
        let mut budget = TokenBudget::for_prompt(prompt);
        let mut temperature = INITIAL_TEMPERATURE;
        let mut attempt = 0;

        loop {
            attempt += 1;

            let request = CompletionRequest {
                prompt,
                temperature,
                max_tokens: budget.max_output_tokens(),
            };
            debug!(
                "Requesting completion: temperature={:.1}, max_tokens={}",
                request.temperature, request.max_tokens
            );

            let error = match self.attempt(request, max_response_length).await {
                Ok(text) => return Ok(text),
                Err(e) => e,
            };

            warn!(
                "Got {}: {} (try {}/{})",
                error.kind(),
                error,
                attempt,
                self.retries
            );

            if attempt >= self.retries {
                return Err(error);
            }

            if let GenerationError::InputTooLarge(_) = error {
                budget.grow();
                info!(
                    "Increasing prompt token estimate to {}",
                    budget.prompt_estimate
                );
            } else {
                temperature = (temperature + TEMPERATURE_STEP).min(MAX_TEMPERATURE);
            }
        }
    }

    async fn attempt(
        &self,
        request: CompletionRequest<'_>,
        max_response_length: usize,
    ) -> Result<String, GenerationError> {
        let text = tokio::time::timeout(self.timeout, self.completion.complete(request))
            .await
            .map_err(|_| GenerationError::Timeout(self.timeout))??;

        let length = text.chars().count();
        if length > max_response_length {
            debug!("Rejected response: {text}");
            return Err(GenerationError::ResponseTooLong {
                length,
                max: max_response_length,
            });
        }

        Ok(text)
    }
}

pub struct BedrockCompletion {
    client: Client,
    model_id: String,
}

impl BedrockCompletion {
    pub fn new(client: Client, model_id: impl Into<String>) -> Self {
        Self {
            client,
            model_id: model_id.into(),
        }
    }

    pub fn from_env(sdk_config: &aws_config::SdkConfig) -> Self {
        let model_id =
            std::env::var("BEDROCK_MODEL_ID").unwrap_or_else(|_| DEFAULT_MODEL_ID.to_owned());
        debug!("Using Bedrock model {model_id}");

        Self::new(Client::from_conf(bedrock_config(sdk_config)), model_id)
    }
}

/// `TextGenerator` owns the retry policy, so each `complete` call is a single Converse request.
fn bedrock_config(sdk_config: &aws_config::SdkConfig) -> aws_sdk_bedrockruntime::Config {
    aws_sdk_bedrockruntime::config::Builder::from(sdk_config)
        .retry_config(RetryConfig::disabled())
        .build()
}

#[async_trait]
impl Completion for BedrockCompletion {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, GenerationError> {
        let message = Message::builder()
            .role(ConversationRole::User)
            .content(ContentBlock::Text(request.prompt.to_owned()))
            .build()
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        let inference_config = InferenceConfiguration::builder()
            .temperature(request.temperature)
            .max_tokens(i32::try_from(request.max_tokens).unwrap_or(i32::MAX))
            .build();

        let response = self
            .client
            .converse()
            .model_id(&self.model_id)
            .messages(message)
            .inference_config(inference_config)
            .send()
            .await
            .map_err(|e| {
                let is_validation = e
                    .as_service_error()
                    .is_some_and(|se| se.is_validation_exception());
                let description = DisplayErrorContext(&e).to_string();
                if is_validation {
                    GenerationError::InputTooLarge(description)
                } else {
                    GenerationError::Request(description)
                }
            })?;

        let text = response
            .output()
            .and_then(|output| output.as_message().ok())
            .map(|message| {
                message
                    .content()
                    .iter()
                    .filter_map(|block| block.as_text().ok())
                    .map(String::as_str)
                    .collect::<String>()
            })
            .unwrap_or_default();

        let text = text.trim();
        if text.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }

        Ok(text.to_owned())
    }
}
