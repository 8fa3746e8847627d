//! Incremental reader for newline-delimited JSON responses.
//!
//! Reads a byte stream (normally `reqwest::Response::bytes_stream()`), splits
//! it on `\n`, parses each line as JSON, and yields the text field of every
//! line that carries one. A single transport read may hold zero, one, or many
//! lines and may end in the middle of a line (or of a UTF-8 sequence); the
//! unterminated tail is kept until the next read.
//!
//! Lines that fail to parse are skipped. Backends interleave keep-alive and
//! other noise lines, and one bad line must not end a long generation.

use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;
use std::time::Duration;

use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde::de::DeserializeOwned;

use super::errors::InferenceError;

/// Chunks of generated text, in arrival order.
///
/// Ends after the transport signals end-of-input, or right after the first
/// `Err`. Dropping the stream drops the underlying connection.
pub type ChunkStream = BoxStream<'static, Result<String, InferenceError>>;

/// A JSON line shape that may carry a fragment of generated text.
pub trait StreamLine: DeserializeOwned {
    /// The text fragment, if this line carries one.
    fn into_text(self) -> Option<String>;
}

// ─── Line buffer ─────────────────────────────────────────────────────────────

/// Accumulates raw bytes and hands out complete lines.
///
/// Bytes are buffered undecoded and split on `b'\n'`, which never occurs
/// inside a multi-byte UTF-8 sequence, so a read boundary anywhere in the
/// input is safe.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `bytes` and return every non-blank line completed by them.
    ///
    /// Everything up to and including the last `\n` is consumed; the rest is
    /// retained for the next call.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);

        let Some(last_newline) = self.buf.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };

        let tail = self.buf.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buf, tail);

        complete
            .split(|&b| b == b'\n')
            .filter_map(decode_raw_line)
            .collect()
    }

    /// Take the unterminated trailing line, if it is not blank.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buf);
        decode_raw_line(&rest)
    }

    /// Number of buffered bytes not yet terminated by a newline.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }
}

fn decode_raw_line(raw: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(raw);
    let trimmed = line.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parse one line and return its non-empty text fragment.
///
/// Parse failures are logged and yield `None`, as do control lines that carry
/// no text.
pub fn decode_line<L: StreamLine>(line: &str) -> Option<String> {
    match serde_json::from_str::<L>(line) {
        Ok(parsed) => parsed.into_text().filter(|text| !text.is_empty()),
        Err(e) => {
            tracing::debug!(
                error = %e,
                line = %preview(line),
                "skipping unparseable stream line"
            );
            None
        }
    }
}

fn preview(line: &str) -> &str {
    match line.char_indices().nth(120) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}

// ─── Chunk stream ────────────────────────────────────────────────────────────

struct ReaderState<S> {
    bytes: Pin<Box<S>>,
    lines: LineBuffer,
    pending: VecDeque<String>,
    idle_timeout: Option<Duration>,
    finished: bool,
}

/// Turn a byte stream of NDJSON into a stream of text chunks.
///
/// - A transport error yields `Err(StreamError)` and ends the stream.
/// - If `idle_timeout` is set and no bytes arrive within it, yields
///   `Err(Timeout)` and ends the stream.
/// - At end-of-input a non-blank unterminated line is parsed once.
///
/// Chunks already yielded before an error stand.
pub fn ndjson_chunks<L, S, B, E>(bytes: S, idle_timeout: Option<Duration>) -> ChunkStream
where
    L: StreamLine + 'static,
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = ReaderState {
        bytes: Box::pin(bytes),
        lines: LineBuffer::new(),
        pending: VecDeque::new(),
        idle_timeout,
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(chunk) = state.pending.pop_front() {
                return Some((Ok(chunk), state));
            }
            if state.finished {
                return None;
            }

            let next = match state.idle_timeout {
                Some(limit) => match tokio::time::timeout(limit, state.bytes.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        state.finished = true;
                        tracing::warn!(
                            idle_secs = limit.as_secs(),
                            buffered = state.lines.pending_len(),
                            "stream idle timeout"
                        );
                        return Some((
                            Err(InferenceError::Timeout {
                                duration_secs: limit.as_secs(),
                            }),
                            state,
                        ));
                    }
                },
                None => state.bytes.next().await,
            };

            match next {
                Some(Ok(bytes)) => {
                    for line in state.lines.push(bytes.as_ref()) {
                        if let Some(text) = decode_line::<L>(&line) {
                            state.pending.push_back(text);
                        }
                    }
                }
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((
                        Err(InferenceError::StreamError {
                            reason: format!("stream read error: {e}"),
                        }),
                        state,
                    ));
                }
                None => {
                    state.finished = true;
                    if let Some(line) = state.lines.finish() {
                        if let Some(text) = decode_line::<L>(&line) {
                            state.pending.push_back(text);
                        }
                    }
                }
            }
        }
    })
    .boxed()
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::types::OllamaStreamLine;

    const BODY: &str = concat!(
        "{\"response\":\"Hel\",\"done\":false}\n",
        "{\"response\":\"lo, \",\"done\":false}\n",
        "{\"response\":\"wörld ✓\",\"done\":false}\n",
        "{\"response\":\"\",\"done\":true}\n"
    );

    fn reader(parts: Vec<Vec<u8>>) -> ChunkStream {
        let source = stream::iter(parts.into_iter().map(Ok::<_, std::io::Error>));
        ndjson_chunks::<OllamaStreamLine, _, _, _>(source, None)
    }

    async fn collect_ok(chunks: ChunkStream) -> Vec<String> {
        chunks.map(|r| r.expect("chunk")).collect().await
    }

    #[test]
    fn test_line_buffer_keeps_partial_tail() {
        let mut buf = LineBuffer::new();
        assert!(buf.push(b"{\"a\":").is_empty());
        assert_eq!(buf.pending_len(), 5);
        let lines = buf.push(b"1}\n{\"b\"");
        assert_eq!(lines, vec!["{\"a\":1}".to_string()]);
        assert_eq!(buf.finish().as_deref(), Some("{\"b\""));
        assert!(buf.finish().is_none());
    }

    #[test]
    fn test_line_buffer_skips_blank_lines_and_crlf() {
        let mut buf = LineBuffer::new();
        let lines = buf.push(b"\n\r\n  \n{\"x\":1}\r\n");
        assert_eq!(lines, vec!["{\"x\":1}".to_string()]);
    }

    #[test]
    fn test_decode_line_ignores_noise_and_control_lines() {
        assert!(decode_line::<OllamaStreamLine>(": keep-alive").is_none());
        assert!(decode_line::<OllamaStreamLine>(r#"{"done":true}"#).is_none());
        assert!(decode_line::<OllamaStreamLine>(r#"{"response":""}"#).is_none());
        assert_eq!(
            decode_line::<OllamaStreamLine>(r#"{"response":"x"}"#).as_deref(),
            Some("x")
        );
    }

    #[tokio::test]
    async fn test_split_mid_object() {
        let chunks = reader(vec![
            b"{\"respon".to_vec(),
            b"se\":\"Hel\"}\n{\"response\":\"lo\"}\n".to_vec(),
        ]);
        assert_eq!(collect_ok(chunks).await, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn test_every_two_way_split_yields_same_chunks() {
        let bytes = BODY.as_bytes();
        let expected = vec!["Hel", "lo, ", "wörld ✓"];
        for cut in 0..=bytes.len() {
            let parts = vec![bytes[..cut].to_vec(), bytes[cut..].to_vec()];
            assert_eq!(collect_ok(reader(parts)).await, expected, "cut at {cut}");
        }
    }

    #[tokio::test]
    async fn test_one_byte_at_a_time() {
        let parts: Vec<Vec<u8>> = BODY.as_bytes().iter().map(|b| vec![*b]).collect();
        assert_eq!(
            collect_ok(reader(parts)).await,
            vec!["Hel", "lo, ", "wörld ✓"]
        );
    }

    #[tokio::test]
    async fn test_unterminated_final_line_emitted_once() {
        let chunks = reader(vec![
            b"{\"response\":\"a\"}\n{\"response\":".to_vec(),
            b"\"b\"}".to_vec(),
        ]);
        assert_eq!(collect_ok(chunks).await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_malformed_line_skipped_without_aborting() {
        let chunks = reader(vec![
            b"{\"response\":\"a\"}\nnot json at all\n{\"response\":\"b\"}\n".to_vec(),
        ]);
        assert_eq!(collect_ok(chunks).await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_empty_body_yields_nothing() {
        assert!(collect_ok(reader(vec![])).await.is_empty());
        assert!(collect_ok(reader(vec![b"\n\n".to_vec()])).await.is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_keeps_earlier_chunks_then_ends() {
        let source = stream::iter(vec![
            Ok(b"{\"response\":\"a\"}\n{\"resp".to_vec()),
            Err(std::io::Error::other("connection reset")),
            Ok(b"{\"response\":\"never\"}\n".to_vec()),
        ]);
        let items: Vec<_> = ndjson_chunks::<OllamaStreamLine, _, _, _>(source, None)
            .collect()
            .await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "a");
        let err = items[1].as_ref().unwrap_err();
        assert!(err.is_transport());
        assert!(err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_idle_timeout_ends_stream() {
        let source = stream::iter(vec![Ok::<_, std::io::Error>(
            b"{\"response\":\"a\"}\n".to_vec(),
        )])
        .chain(stream::pending());
        let items: Vec<_> =
            ndjson_chunks::<OllamaStreamLine, _, _, _>(source, Some(Duration::from_millis(50)))
                .collect()
                .await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "a");
        assert!(matches!(items[1], Err(InferenceError::Timeout { .. })));
    }
}
