pub mod cost;
pub mod domain;
pub mod ports;
pub mod prompt;
pub mod throttle;

pub use domain::{
    DocumentAnalysis, FieldError, PageAnalysisResult, PoemLanguage, PoemRequest, PoemStyle,
    RateLimitRecord, RhymeScheme, TokenUsage, UploadKind,
};
pub use ports::{
    CheckoutService, DocumentExtractionService, PageRasterizer, PoemChunk, PoemGenerationService,
    PoemStream, PortError, PortResult, ThrottleStore,
};
pub use throttle::{AdmitDecision, RateLimitPolicy};
