//! services/api/src/adapters/vision_llm.rs
//!
//! This module contains the adapter for the document-analysis vision LLM.
//! It implements the `DocumentExtractionService` port from the `core` crate:
//! one call per page image, JSON output validated against the domain schema.

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessageContentPartImageArgs,
        ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, ImageUrlArgs,
        ResponseFormat,
    },
    Client,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use sintgpt_core::{
    domain::{DocumentAnalysis, TokenUsage},
    ports::{DocumentExtractionService, PortError, PortResult},
};

use super::map_provider_error;

const SYSTEM_PROMPT: &str = r#"You are a specialized AI assistant for analyzing historical WWII documents. Your task is to analyze the provided image and generate a structured analysis in JSON format. The JSON object must have exactly these fields:

- "transcription": string - the full transcribed text from the handwritten document.
- "namedEntities": array of { "text": string, "type": "PERSON" | "LOCATION" | "DATE" | "ORG" | "EVENT" | "MILITARY_UNIT", "startIndex": number, "endIndex": number } - named entities with character-offset spans in the transcription.
- "timeline": array of { "date": string (ISO 8601, e.g. "1944-06-06"), "description": string, "linkedEntities": optional array of strings } - chronological sequence of events derived from the text.
- "topicTags": array of strings - high-level thematic tags.
- "sentimentAnalysis": { "sentiment": "positive" | "neutral" | "negative", "emotions": optional array of strings, "confidence": number between 0 and 1 }.
- "vocabulary": array of { "term": string, "definition": string, "contextSentence": optional string } - glossary of historical or obscure terms.
- "locations": array of { "name": string, "coordinates": { "lat": number, "lon": number }, "relatedTextIndices": array of [start, end] index pairs } - geographic locations mentioned in the document.

Focus on:
1. Accurately transcribing handwritten text from the WWII era
2. Identifying key historical figures, locations, and organizations
3. Extracting dates and creating a timeline of events
4. Identifying important topics and themes
5. Analyzing the sentiment and emotional tone
6. Explaining historical terms and vocabulary
7. Mapping mentioned locations

Ensure that all text is transcribed as accurately as possible, maintaining the original language and terminology.
Ensure the output is ONLY the JSON object."#;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `DocumentExtractionService` using an
/// OpenAI-compatible vision model.
#[derive(Clone)]
pub struct OpenAiVisionAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiVisionAdapter {
    /// Creates a new `OpenAiVisionAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

/// Models occasionally wrap JSON output in a markdown fence; strip it
/// before deserializing.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

//=========================================================================================
// `DocumentExtractionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DocumentExtractionService for OpenAiVisionAdapter {
    /// Analyzes one page image. The reply must deserialize into
    /// `DocumentAnalysis`; anything else is reported as a malformed
    /// provider response, never accepted silently.
    async fn analyze_page(
        &self,
        image: &[u8],
        mime: &str,
        page_number: u32,
        total_pages: u32,
    ) -> PortResult<(DocumentAnalysis, TokenUsage)> {
        let instruction = if total_pages > 1 {
            format!(
                "Analyze this WWII document (Page {} of {}) and extract all relevant \
                 information following the schema.",
                page_number, total_pages
            )
        } else {
            "Analyze this WWII document and extract all relevant information following \
             the schema."
                .to_string()
        };

        let image_url = format!("data:{};base64,{}", mime, BASE64.encode(image));

        let user_content = vec![
            ChatCompletionRequestMessageContentPartTextArgs::default()
                .text(instruction)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestMessageContentPartImageArgs::default()
                .image_url(
                    ImageUrlArgs::default()
                        .url(image_url)
                        .build()
                        .map_err(|e| PortError::Unexpected(e.to_string()))?,
                )
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_PROMPT)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_content)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .response_format(ResponseFormat::JsonObject)
            .temperature(0.0)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(map_provider_error)?;

        let usage = response
            .usage
            .as_ref()
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                reasoning_tokens: None,
            })
            .unwrap_or_default();

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::MalformedResponse(
                    "vision model returned no text content".to_string(),
                )
            })?;

        let analysis: DocumentAnalysis = serde_json::from_str(strip_code_fence(&content))
            .map_err(|e| {
                PortError::MalformedResponse(format!(
                    "analysis did not match the document schema: {}",
                    e
                ))
            })?;

        Ok((analysis, usage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markdown_fences() {
        assert_eq!(strip_code_fence("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn schema_mismatch_is_detected_by_deserialization() {
        let bad = r#"{"transcription": "text", "namedEntities": "not-an-array"}"#;
        assert!(serde_json::from_str::<DocumentAnalysis>(bad).is_err());
    }

    #[test]
    fn valid_payload_deserializes() {
        let good = r#"{
            "transcription": "6 juni 1944. De invasie is begonnen.",
            "namedEntities": [
                {"text": "6 juni 1944", "type": "DATE", "startIndex": 0, "endIndex": 11}
            ],
            "timeline": [
                {"date": "1944-06-06", "description": "Invasion begins", "linkedEntities": ["Normandy"]}
            ],
            "topicTags": ["invasion"],
            "sentimentAnalysis": {"sentiment": "neutral", "confidence": 0.9},
            "vocabulary": [
                {"term": "invasie", "definition": "invasion"}
            ],
            "locations": [
                {"name": "Normandy", "coordinates": {"lat": 49.41, "lon": -0.83}, "relatedTextIndices": [[13, 20]]}
            ]
        }"#;
        let analysis: DocumentAnalysis = serde_json::from_str(good).unwrap();
        assert_eq!(analysis.named_entities.len(), 1);
        assert_eq!(analysis.locations[0].related_text_indices, vec![(13, 20)]);
    }
}
