pub mod payments;
pub mod pdf;
pub mod poem_llm;
pub mod retry;
pub mod throttle_store;
pub mod vision_llm;

pub use payments::DodoCheckoutAdapter;
pub use pdf::PdfiumRasterizer;
pub use poem_llm::OpenAiPoemAdapter;
pub use retry::{is_overloaded, RetryPolicy};
pub use throttle_store::InMemoryThrottleStore;
pub use vision_llm::OpenAiVisionAdapter;

use async_openai::error::OpenAIError;
use sintgpt_core::ports::PortError;

/// Maps provider SDK errors onto the shared port error, preserving the
/// provider's message for pass-through reporting.
pub(crate) fn map_provider_error(err: OpenAIError) -> PortError {
    match err {
        OpenAIError::ApiError(api) => PortError::Provider {
            status: 502,
            message: api.message,
        },
        other => PortError::Unexpected(other.to_string()),
    }
}
