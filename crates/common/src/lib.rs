//! rSearch Common Library
//!
//! The search pipeline shared by the gateway and its tests:
//! - Query refinement through a JSON-mode language model
//! - Result normalization for the Serper search API
//! - Streamed answer synthesis and chunk accumulation
//! - Session tracking with stale-write protection
//! - Error types, configuration and metrics

pub mod config;
pub mod context;
pub mod errors;
pub mod metrics;
pub mod search;
pub mod session;
pub mod stream;

// Re-export commonly used types
pub use config::{AppConfig, Preferences};
pub use context::{AnswerSynthesizer, QueryRefiner, RefinementResult};
pub use errors::{AppError, Result};
pub use search::{SearchMode, SearchProvider, SearchResponse};
pub use session::SearchPipeline;
pub use stream::StreamChunk;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
