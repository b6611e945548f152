//! services/api/src/web/protocol.rs
//!
//! Defines the event protocol of the streamed poem response: an
//! append-only sequence of typed JSON events over SSE, terminated by a
//! sentinel record.

use serde::Serialize;

/// Sentinel `data:` record closing every generation stream.
pub const STREAM_DONE_SENTINEL: &str = "[DONE]";

/// Represents the structured events the server sends over the poem stream.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamEvent {
    /// An incremental fragment of generated poem text.
    TextDelta { delta: String },

    /// Signals that generation completed; no further text follows.
    Finish,

    /// Reports a failure after streaming already began, so a status code
    /// can no longer be sent.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_their_type_discriminator() {
        let delta = serde_json::to_string(&StreamEvent::TextDelta {
            delta: "Sint".to_string(),
        })
        .unwrap();
        assert_eq!(delta, r#"{"type":"text-delta","delta":"Sint"}"#);

        let finish = serde_json::to_string(&StreamEvent::Finish).unwrap();
        assert_eq!(finish, r#"{"type":"finish"}"#);
    }
}
