use futures::StreamExt;

use super::decoder::{ChunkStream, StreamChunk};
use crate::errors::AppError;

/// Reasoning trace and answer rebuilt from chunk deltas.
///
/// Append-only: each chunk is concatenated onto its channel in the order it
/// is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamAccumulator {
    reasoning: String,
    answer: String,
    chunks: usize,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, chunk: &StreamChunk) {
        match chunk {
            StreamChunk::Reasoning(text) => self.reasoning.push_str(text),
            StreamChunk::Answer(text) => self.answer.push_str(text),
        }
        self.chunks += 1;
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks
    }

    pub fn is_empty(&self) -> bool {
        self.chunks == 0
    }

    pub fn into_parts(self) -> (String, String) {
        (self.reasoning, self.answer)
    }
}

/// Drain `stream` into an accumulator.
///
/// On a mid-stream error the text gathered so far is returned together with
/// the error.
pub async fn accumulate(mut stream: ChunkStream) -> (StreamAccumulator, Option<AppError>) {
    let mut acc = StreamAccumulator::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(chunk) => acc.apply(&chunk),
            Err(e) => return (acc, Some(e)),
        }
    }
    (acc, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::ndjson_chunks;
    use futures::stream;

    const RECORDS: [&str; 3] = [
        "{\"content\":\"A\"}\n",
        "{\"reasoning_content\":\"X\"}\n",
        "{\"content\":\"B\"}\n",
    ];

    fn body(parts: Vec<String>) -> ChunkStream {
        let reads: Vec<Result<Vec<u8>, String>> =
            parts.into_iter().map(|p| Ok(p.into_bytes())).collect();
        ndjson_chunks(stream::iter(reads))
    }

    #[tokio::test]
    async fn test_order_independent_of_batching() {
        let single = body(vec![RECORDS.concat()]);
        let separate = body(RECORDS.iter().map(|r| r.to_string()).collect());

        let (one, err) = accumulate(single).await;
        assert!(err.is_none());
        let (three, err) = accumulate(separate).await;
        assert!(err.is_none());

        assert_eq!(one.answer(), "AB");
        assert_eq!(one.reasoning(), "X");
        assert_eq!(one, three);
        assert_eq!(one.chunk_count(), 3);
    }

    #[tokio::test]
    async fn test_partial_text_kept_on_error() {
        let reads: Vec<Result<Vec<u8>, String>> = vec![
            Ok(b"{\"content\":\"Electric cars \"}\n{\"content\":\"are\"}\n".to_vec()),
            Err("connection dropped".into()),
        ];
        let (acc, err) = accumulate(ndjson_chunks(stream::iter(reads))).await;

        assert_eq!(acc.answer(), "Electric cars are");
        assert!(matches!(err, Some(AppError::StreamInterrupted { .. })));
    }

    #[test]
    fn test_empty_body_accumulates_nothing() {
        let (acc, err) = tokio_test::block_on(accumulate(body(Vec::new())));
        assert!(err.is_none());
        assert!(acc.is_empty());
        assert_eq!(acc.into_parts(), (String::new(), String::new()));
    }
}
