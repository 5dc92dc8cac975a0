//! Language model stages of the pipeline
//!
//! - Query refinement: raw query in, `{refined_query, explanation}` out
//! - Context stitching: normalized results rendered into prompt text
//! - Answer synthesis: a streamed, citation-annotated answer

mod context_stitcher;
mod llm;
mod prompts;
mod refiner;
mod synthesizer;

pub use context_stitcher::{build_context, search_context};
pub use prompts::{refine_prompt, synthesis_prompt};
pub use refiner::{parse_refinement, QueryRefiner, RefinementResult, Refiner};
pub use synthesizer::{AnswerSynthesizer, SynthesisRequest, Synthesizer};
