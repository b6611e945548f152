//! crates/sintgpt_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any web framework or provider SDK.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bounds for the requested poem length, inclusive.
pub const MIN_LINES: u32 = 8;
pub const MAX_LINES: u32 = 40;

/// Tone selector for the generated poem. Each variant maps to a fixed
/// description in the prompt tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PoemStyle {
    Funny,
    Classic,
    Ironic,
    OldFashioned,
    Spicy,
}

/// Requested rhyme scheme. Variant names match the wire values exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RhymeScheme {
    AABB,
    ABAB,
    ABBA,
    Limerick,
}

/// Output language of the poem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoemLanguage {
    Dutch,
    English,
}

/// A request for one poem generation. Exists only for the duration of a
/// single request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoemRequest {
    pub name: String,
    #[serde(default)]
    pub present: Option<String>,
    #[serde(default = "default_reveal_present")]
    pub reveal_present: bool,
    #[serde(default)]
    pub fun_facts: Option<String>,
    #[serde(default)]
    pub written_by: Option<String>,
    #[serde(default)]
    pub written_for_audience: Option<String>,
    pub style: PoemStyle,
    pub rhyme_scheme: RhymeScheme,
    pub lines: u32,
    pub language: PoemLanguage,
}

fn default_reveal_present() -> bool {
    true
}

/// A single field-level validation failure, reported back to the caller.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl PoemRequest {
    /// Checks the constraints that the wire format cannot express.
    /// Returns every failing field so the caller can report them all at once.
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(FieldError {
                field: "name",
                message: "Recipient name is required".to_string(),
            });
        }
        if self.lines < MIN_LINES || self.lines > MAX_LINES {
            errors.push(FieldError {
                field: "lines",
                message: format!(
                    "Number of lines must be between {} and {}",
                    MIN_LINES, MAX_LINES
                ),
            });
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Per-client fixed-window rate-limit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRecord {
    pub count: u32,
    pub reset_at: DateTime<Utc>,
}

/// Token counts reported by the provider for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_tokens: Option<u32>,
}

impl TokenUsage {
    /// Folds another call's usage into this one. Reasoning tokens stay
    /// `None` unless at least one side reported them.
    pub fn accumulate(&mut self, other: &TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        if let Some(reasoning) = other.reasoning_tokens {
            *self.reasoning_tokens.get_or_insert(0) += reasoning;
        }
    }
}

//=========================================================================================
// Document Analysis (structured-extraction output schema)
//=========================================================================================

/// Category of a named entity found in a transcription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Person,
    Location,
    Date,
    Org,
    Event,
    MilitaryUnit,
}

/// A named entity with its character-offset span in the transcription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedEntity {
    pub text: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub start_index: u32,
    pub end_index: u32,
}

/// A dated event extracted from the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    /// ISO 8601 date, e.g. "1944-06-06".
    pub date: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_entities: Option<Vec<String>>,
}

/// Overall sentiment judgment for a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentAnalysis {
    pub sentiment: Sentiment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotions: Option<Vec<String>>,
    /// Confidence score in [0, 1].
    pub confidence: f64,
}

/// Glossary item explaining an obscure or historic term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyEntry {
    pub term: String,
    pub definition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_sentence: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// A geographical location mentioned in the document, with the character
/// spans where it is referenced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationMention {
    pub name: String,
    pub coordinates: Coordinates,
    pub related_text_indices: Vec<(u32, u32)>,
}

/// Complete structured analysis of one document page. A provider reply
/// that does not deserialize into this shape is treated as a provider
/// failure, never silently accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentAnalysis {
    pub transcription: String,
    pub named_entities: Vec<NamedEntity>,
    pub timeline: Vec<TimelineEvent>,
    pub topic_tags: Vec<String>,
    pub sentiment_analysis: SentimentAnalysis,
    pub vocabulary: Vec<VocabularyEntry>,
    pub locations: Vec<LocationMention>,
}

/// One page's analysis together with what it cost.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageAnalysisResult {
    pub page_number: u32,
    pub analysis: DocumentAnalysis,
    pub usage: TokenUsage,
}

//=========================================================================================
// Upload classification
//=========================================================================================

/// The kind of file a client uploaded for analysis, resolved once at the
/// handler entry from the declared content type.
#[derive(Debug, Clone)]
pub enum UploadKind {
    Image { data: Bytes, mime: String },
    Pdf { data: Bytes },
    Unsupported { mime: String },
}

impl UploadKind {
    /// Classifies an upload by its declared MIME type. An absent type is
    /// unsupported; sniffing the content is deliberately not attempted.
    pub fn resolve(mime: Option<&str>, data: Bytes) -> Self {
        match mime {
            Some("application/pdf") => UploadKind::Pdf { data },
            Some(m) if m.starts_with("image/") => UploadKind::Image {
                data,
                mime: m.to_string(),
            },
            other => UploadKind::Unsupported {
                mime: other.unwrap_or("unknown").to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(lines: u32) -> PoemRequest {
        PoemRequest {
            name: "Sanne".to_string(),
            present: None,
            reveal_present: true,
            fun_facts: None,
            written_by: None,
            written_for_audience: None,
            style: PoemStyle::Funny,
            rhyme_scheme: RhymeScheme::AABB,
            lines,
            language: PoemLanguage::Dutch,
        }
    }

    #[test]
    fn accepts_lines_within_bounds() {
        assert!(request(MIN_LINES).validate().is_ok());
        assert!(request(MAX_LINES).validate().is_ok());
    }

    #[test]
    fn rejects_lines_outside_bounds() {
        for lines in [0, MIN_LINES - 1, MAX_LINES + 1] {
            let errors = request(lines).validate().unwrap_err();
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].field, "lines");
        }
    }

    #[test]
    fn rejects_blank_name() {
        let mut req = request(12);
        req.name = "   ".to_string();
        let errors = req.validate().unwrap_err();
        assert_eq!(errors[0].field, "name");
    }

    #[test]
    fn deserializes_wire_format() {
        let req: PoemRequest = serde_json::from_str(
            r#"{
                "name": "Daan",
                "present": "een boek",
                "funFacts": "houdt van schaken",
                "style": "old-fashioned",
                "rhymeScheme": "Limerick",
                "lines": 10,
                "language": "english"
            }"#,
        )
        .unwrap();
        assert_eq!(req.style, PoemStyle::OldFashioned);
        assert_eq!(req.rhyme_scheme, RhymeScheme::Limerick);
        assert_eq!(req.language, PoemLanguage::English);
        // revealPresent defaults to true when omitted.
        assert!(req.reveal_present);
    }

    #[test]
    fn classifies_uploads_by_declared_type() {
        let data = Bytes::from_static(b"%PDF-1.4");
        assert!(matches!(
            UploadKind::resolve(Some("application/pdf"), data.clone()),
            UploadKind::Pdf { .. }
        ));
        assert!(matches!(
            UploadKind::resolve(Some("image/jpeg"), data.clone()),
            UploadKind::Image { .. }
        ));
        assert!(matches!(
            UploadKind::resolve(Some("text/plain"), data.clone()),
            UploadKind::Unsupported { .. }
        ));
        assert!(matches!(
            UploadKind::resolve(None, data),
            UploadKind::Unsupported { .. }
        ));
    }

    #[test]
    fn usage_accumulates_reasoning_only_when_reported() {
        let mut total = TokenUsage::default();
        total.accumulate(&TokenUsage {
            prompt_tokens: 100,
            completion_tokens: 20,
            reasoning_tokens: None,
        });
        assert_eq!(total.reasoning_tokens, None);
        total.accumulate(&TokenUsage {
            prompt_tokens: 50,
            completion_tokens: 10,
            reasoning_tokens: Some(7),
        });
        assert_eq!(total.prompt_tokens, 150);
        assert_eq!(total.completion_tokens, 30);
        assert_eq!(total.reasoning_tokens, Some(7));
    }
}
