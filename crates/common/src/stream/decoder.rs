use futures::stream::{self, BoxStream, StreamExt};
use futures::Stream;
use serde::Deserialize;
use serde_json::json;
use std::collections::VecDeque;
use std::fmt::Display;
use std::time::Duration;
use tracing::{debug, warn};

use super::framing::LineFramer;
use crate::errors::{AppError, Result};
use crate::metrics::{record_skipped_record, record_stream_chunk};

/// Lazily decoded, single-pass sequence of chunks in arrival order
pub type ChunkStream = BoxStream<'static, Result<StreamChunk>>;

/// One delta of a streamed completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChunk {
    /// Delta of the model's reasoning trace
    Reasoning(String),
    /// Delta of the final answer
    Answer(String),
}

impl StreamChunk {
    pub fn channel(&self) -> &'static str {
        match self {
            StreamChunk::Reasoning(_) => "reasoning",
            StreamChunk::Answer(_) => "answer",
        }
    }

    pub fn text(&self) -> &str {
        match self {
            StreamChunk::Reasoning(text) | StreamChunk::Answer(text) => text,
        }
    }

    /// Wire form: one JSON object terminated by `\n`
    pub fn to_ndjson_line(&self) -> String {
        let record = match self {
            StreamChunk::Reasoning(text) => json!({ "reasoning_content": text }),
            StreamChunk::Answer(text) => json!({ "content": text }),
        };
        format!("{}\n", record)
    }
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    reasoning_content: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

impl Delta {
    /// Reasoning wins when a record carries both.
    fn into_chunk(self) -> Option<StreamChunk> {
        match (self.reasoning_content, self.content) {
            (Some(reasoning), _) if !reasoning.is_empty() => Some(StreamChunk::Reasoning(reasoning)),
            (_, Some(content)) if !content.is_empty() => Some(StreamChunk::Answer(content)),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SseEvent {
    #[serde(default)]
    choices: Vec<SseChoice>,
}

#[derive(Debug, Deserialize)]
struct SseChoice {
    #[serde(default)]
    delta: Delta,
}

/// Outcome of decoding one framed line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    Chunk(StreamChunk),
    Skip,
    End,
}

/// Line protocol of a chunked body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    /// `{"reasoning_content": ..}` / `{"content": ..}` objects, one per line
    Ndjson,
    /// OpenAI-style server-sent events: `data: {"choices":[{"delta":..}]}`
    /// terminated by `data: [DONE]`
    Sse,
}

impl WireFormat {
    pub fn decode_line(&self, line: &str) -> LineOutcome {
        match self {
            WireFormat::Ndjson => decode_ndjson_line(line),
            WireFormat::Sse => decode_sse_line(line),
        }
    }
}

/// Decode one NDJSON record. Malformed records are logged and skipped.
pub fn decode_ndjson_line(line: &str) -> LineOutcome {
    let line = line.trim();
    if line.is_empty() {
        return LineOutcome::Skip;
    }

    match serde_json::from_str::<Delta>(line) {
        Ok(delta) => delta.into_chunk().map_or(LineOutcome::Skip, LineOutcome::Chunk),
        Err(e) => {
            skipped(line, &e);
            LineOutcome::Skip
        }
    }
}

pub fn decode_sse_line(line: &str) -> LineOutcome {
    let Some(data) = line.strip_prefix("data:") else {
        // Comments, event names and blank separators
        return LineOutcome::Skip;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return LineOutcome::End;
    }
    if data.is_empty() {
        return LineOutcome::Skip;
    }

    match serde_json::from_str::<SseEvent>(data) {
        Ok(event) => event
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.into_chunk())
            .map_or(LineOutcome::Skip, LineOutcome::Chunk),
        Err(e) => {
            skipped(data, &e);
            LineOutcome::Skip
        }
    }
}

fn skipped(record: &str, error: &serde_json::Error) {
    record_skipped_record();
    warn!(
        error = %error,
        record_len = record.len(),
        "Skipping malformed stream record"
    );
}

struct Decoder<B, E> {
    body: BoxStream<'static, std::result::Result<B, E>>,
    framer: LineFramer,
    ready: VecDeque<StreamChunk>,
    format: WireFormat,
    idle: Option<Duration>,
    finished: bool,
}

impl<B, E> Decoder<B, E> {
    fn accept(&mut self, lines: Vec<String>) {
        for line in lines {
            match self.format.decode_line(&line) {
                LineOutcome::Chunk(chunk) => {
                    record_stream_chunk(chunk.channel());
                    self.ready.push_back(chunk);
                }
                LineOutcome::Skip => {}
                LineOutcome::End => {
                    debug!("Stream end marker received");
                    self.finished = true;
                    return;
                }
            }
        }
    }
}

/// Decode a chunked body into [`StreamChunk`]s.
///
/// A body error, or silence longer than `idle`, ends the sequence with
/// [`AppError::StreamInterrupted`] after every chunk decoded so far.
pub fn decode_stream<S, B, E>(body: S, format: WireFormat, idle: Option<Duration>) -> ChunkStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let decoder = Decoder {
        body: body.boxed(),
        framer: LineFramer::new(),
        ready: VecDeque::new(),
        format,
        idle,
        finished: false,
    };

    stream::unfold(decoder, |mut decoder| async move {
        loop {
            if let Some(chunk) = decoder.ready.pop_front() {
                return Some((Ok(chunk), decoder));
            }
            if decoder.finished {
                return None;
            }

            let next = match decoder.idle {
                Some(limit) => match tokio::time::timeout(limit, decoder.body.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        decoder.finished = true;
                        let error = AppError::StreamInterrupted {
                            message: format!("no data received for {}ms", limit.as_millis()),
                        };
                        return Some((Err(error), decoder));
                    }
                },
                None => decoder.body.next().await,
            };

            match next {
                Some(Ok(bytes)) => {
                    let lines = decoder.framer.push(bytes.as_ref());
                    decoder.accept(lines);
                }
                Some(Err(e)) => {
                    decoder.finished = true;
                    let error = AppError::StreamInterrupted {
                        message: e.to_string(),
                    };
                    return Some((Err(error), decoder));
                }
                None => {
                    let tail = decoder.framer.finish();
                    decoder.accept(tail.into_iter().collect());
                    decoder.finished = true;
                }
            }
        }
    })
    .boxed()
}

/// Decode an NDJSON body such as the one served by `/api/rsearch`.
pub fn ndjson_chunks<S, B, E>(body: S) -> ChunkStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    decode_stream(body, WireFormat::Ndjson, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    type Read = std::result::Result<Vec<u8>, String>;

    fn reads(parts: Vec<Vec<u8>>) -> impl Stream<Item = Read> + Send + 'static {
        stream::iter(parts.into_iter().map(Ok).collect::<Vec<Read>>())
    }

    #[test]
    fn test_ndjson_records() {
        assert_eq!(
            decode_ndjson_line(r#"{"content":"A"}"#),
            LineOutcome::Chunk(StreamChunk::Answer("A".into()))
        );
        assert_eq!(
            decode_ndjson_line(r#"{"role":"assistant","reasoning_content":"X","content":null}"#),
            LineOutcome::Chunk(StreamChunk::Reasoning("X".into()))
        );
        assert_eq!(
            decode_ndjson_line(r#"{"reasoning_content":"","content":"B"}"#),
            LineOutcome::Chunk(StreamChunk::Answer("B".into()))
        );
        assert_eq!(decode_ndjson_line(r#"{"role":"assistant"}"#), LineOutcome::Skip);
        assert_eq!(decode_ndjson_line("{not json"), LineOutcome::Skip);
        assert_eq!(decode_ndjson_line(""), LineOutcome::Skip);
    }

    #[test]
    fn test_sse_lines() {
        assert_eq!(
            decode_sse_line(r#"data: {"choices":[{"delta":{"content":"Hi"}}]}"#),
            LineOutcome::Chunk(StreamChunk::Answer("Hi".into()))
        );
        assert_eq!(decode_sse_line("data: [DONE]"), LineOutcome::End);
        assert_eq!(decode_sse_line(": keep-alive"), LineOutcome::Skip);
        assert_eq!(decode_sse_line(r#"data: {"choices":[]}"#), LineOutcome::Skip);
    }

    #[test]
    fn test_ndjson_line_round_trips_through_decoder() {
        let chunk = StreamChunk::Reasoning("line one\nline \"two\"".into());
        let line = chunk.to_ndjson_line();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
        assert_eq!(decode_ndjson_line(line.trim_end()), LineOutcome::Chunk(chunk));
    }

    #[tokio::test]
    async fn test_record_split_at_every_offset() {
        let record = "{\"content\":\"caf\u{e9} d\u{e9}j\u{e0} vu\"}\n".as_bytes();
        for split in 0..=record.len() {
            let body = reads(vec![record[..split].to_vec(), record[split..].to_vec()]);
            let chunks: Vec<StreamChunk> = ndjson_chunks(body).try_collect().await.unwrap();
            assert_eq!(
                chunks,
                vec![StreamChunk::Answer("caf\u{e9} d\u{e9}j\u{e0} vu".into())],
                "split at {}",
                split
            );
        }
    }

    #[tokio::test]
    async fn test_malformed_record_does_not_abort() {
        let body = reads(vec![b"{\"content\":\"A\"}\n{broken\n{\"content\":\"B\"}".to_vec()]);
        let chunks: Vec<StreamChunk> = ndjson_chunks(body).try_collect().await.unwrap();
        assert_eq!(
            chunks,
            vec![StreamChunk::Answer("A".into()), StreamChunk::Answer("B".into())]
        );
    }

    #[tokio::test]
    async fn test_body_error_after_data() {
        let parts: Vec<Read> = vec![
            Ok(b"{\"content\":\"partial\"}\n".to_vec()),
            Err("connection reset".to_string()),
            Ok(b"{\"content\":\"never\"}\n".to_vec()),
        ];
        let mut chunks = ndjson_chunks(stream::iter(parts));

        assert_eq!(
            chunks.next().await.unwrap().unwrap(),
            StreamChunk::Answer("partial".into())
        );
        let err = chunks.next().await.unwrap().unwrap_err();
        assert!(matches!(err, AppError::StreamInterrupted { .. }));
        assert!(chunks.next().await.is_none());
    }

    #[tokio::test]
    async fn test_sse_stops_at_done() {
        let body = reads(vec![
            b"data: {\"choices\":[{\"delta\":{\"reasoning_content\":\"think\"}}]}\n\n".to_vec(),
            b"data: {\"choices\":[{\"delta\":{\"content\":\"answer\"}}]}\n\ndata: [DONE]\n\n".to_vec(),
            b"data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n".to_vec(),
        ]);
        let chunks: Vec<StreamChunk> = decode_stream(body, WireFormat::Sse, None)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(
            chunks,
            vec![
                StreamChunk::Reasoning("think".into()),
                StreamChunk::Answer("answer".into())
            ]
        );
    }

    #[tokio::test]
    async fn test_idle_timeout_interrupts() {
        let body = stream::iter(vec![Ok::<_, String>(b"{\"content\":\"A\"}\n".to_vec())])
            .chain(stream::pending());
        let mut chunks = decode_stream(body, WireFormat::Ndjson, Some(Duration::from_millis(50)));

        assert_eq!(chunks.next().await.unwrap().unwrap(), StreamChunk::Answer("A".into()));
        let err = chunks.next().await.unwrap().unwrap_err();
        assert!(matches!(err, AppError::StreamInterrupted { .. }));
    }
}
