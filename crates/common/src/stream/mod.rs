//! Streaming Synthesis wire handling
//!
//! Turns a chunked byte body into ordered reasoning/answer deltas:
//! - `framing`: byte buffering until a full line is available
//! - `decoder`: NDJSON and SSE record decoding, malformed records skipped
//! - `accumulator`: the two append-only text buffers

mod accumulator;
mod decoder;
mod framing;

pub use accumulator::{accumulate, StreamAccumulator};
pub use decoder::{
    decode_ndjson_line, decode_sse_line, decode_stream, ndjson_chunks, ChunkStream, LineOutcome,
    StreamChunk, WireFormat,
};
pub use framing::LineFramer;
