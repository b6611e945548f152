//! services/api/src/adapters/poem_llm.rs
//!
//! This module contains the adapter for the poem-generating LLM.
//! It implements the `PoemGenerationService` port from the `core` crate,
//! relaying the provider's token stream as domain chunks.

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestUserMessageArgs, ChatCompletionStreamOptions,
        CreateChatCompletionRequestArgs, ReasoningEffort,
    },
    Client,
};
use async_trait::async_trait;
use futures::StreamExt;
use sintgpt_core::{
    domain::TokenUsage,
    ports::{PoemChunk, PoemGenerationService, PoemStream, PortError, PortResult},
};

use super::map_provider_error;

/// Creative variance for poem output.
const POEM_TEMPERATURE: f32 = 1.2;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `PoemGenerationService` using an
/// OpenAI-compatible LLM with streaming chat completions.
#[derive(Clone)]
pub struct OpenAiPoemAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiPoemAdapter {
    /// Creates a new `OpenAiPoemAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `PoemGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl PoemGenerationService for OpenAiPoemAdapter {
    /// Opens a streaming completion for the assembled prompt and maps the
    /// provider's chunks into domain `PoemChunk`s. The final chunk carries
    /// the usage totals when the provider reports them.
    async fn stream_poem(&self, prompt: &str) -> PortResult<PoemStream> {
        let messages = vec![ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .into()];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(POEM_TEMPERATURE)
            .reasoning_effort(ReasoningEffort::Medium)
            .stream(true)
            .stream_options(ChatCompletionStreamOptions {
                include_usage: Some(true),
                include_obfuscation: None,
            })
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let mut upstream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(map_provider_error)?;

        let mapped = async_stream::stream! {
            let mut usage: Option<TokenUsage> = None;
            while let Some(item) = upstream.next().await {
                match item {
                    Ok(chunk) => {
                        // The usage-only chunk arrives last, with no choices.
                        if let Some(reported) = chunk.usage {
                            usage = Some(TokenUsage {
                                prompt_tokens: reported.prompt_tokens,
                                completion_tokens: reported.completion_tokens,
                                reasoning_tokens: reported
                                    .completion_tokens_details
                                    .and_then(|d| d.reasoning_tokens),
                            });
                        }
                        for choice in chunk.choices {
                            if let Some(text) = choice.delta.content {
                                if !text.is_empty() {
                                    yield Ok(PoemChunk::Delta(text));
                                }
                            }
                        }
                    }
                    Err(err) => {
                        yield Err(map_provider_error(err));
                        return;
                    }
                }
            }
            yield Ok(PoemChunk::Done { usage });
        };

        Ok(Box::pin(mapped))
    }
}
