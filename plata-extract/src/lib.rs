//! plata-extract: hybrid extraction pipeline — shared model-call budget,
//! remote-model client, and the rules-first orchestrator

pub mod model;
pub mod orchestrator;
pub mod rate_limit;

pub use model::{ChatTransport, HttpTransport, ModelClient, ModelConfig, Provider};
pub use orchestrator::{
    ExtractOptions, ExtractionOutcome, ExtractorConfig, TransactionExtractor,
};
pub use rate_limit::{
    RateLimiter, RateLimiterStats, MAX_AI_REQUESTS_PER_DAY, MAX_AI_REQUESTS_PER_MINUTE,
};
