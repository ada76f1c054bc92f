//! Server-Sent Events decoding for the chat stream.
//!
//! The backend emits three event kinds on `GET /api/chat`:
//!
//! - default `message` events carrying `{ "chunk": "..." }`
//! - a `sources` event carrying `{ "sources": [...] }`
//! - a `complete` event carrying `{ "success": bool }`
//!
//! A server-sent `error` event is surfaced as [`Error::Stream`]. Keep-alive
//! comments and unknown event names are skipped.
//!
//! # Example
//!
//! ```rust
//! use newschat::api::sse::{StreamEvent, parse_frame, decode_event, sse_frame};
//!
//! let text = sse_frame(&StreamEvent::Complete { success: true });
//! let frame = parse_frame(&text).unwrap();
//! assert_eq!(frame.event.as_deref(), Some("complete"));
//! assert_eq!(decode_event(&frame).unwrap(), Some(StreamEvent::Complete { success: true }));
//! ```

use std::pin::Pin;

use futures::{Stream, StreamExt};
use tracing::debug;

use super::types::{ChunkPayload, CompletePayload, Source, SourcesPayload};
use crate::error::{Error, Result};

/// Decoded chat stream event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// One fragment of assistant output.
    Chunk(String),
    /// The complete citation set for the reply.
    Sources(Vec<Source>),
    /// Terminal event.
    Complete {
        /// Whether the backend finished the reply.
        success: bool,
    },
}

impl StreamEvent {
    /// Whether no further events follow this one.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }
}

/// Boxed stream of decoded chat events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

/// One raw SSE frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseFrame {
    /// Value of the `event:` field, if any.
    pub event: Option<String>,
    /// All `data:` lines joined with `\n`.
    pub data: String,
}

/// Parse a single frame (the text between blank-line separators).
///
/// Returns `None` for frames without data, such as keep-alive comments.
#[must_use]
pub fn parse_frame(text: &str) -> Option<SseFrame> {
    let mut event = None;
    let mut data = Vec::new();

    for line in text.lines() {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => event = Some(value.to_string()),
            "data" => data.push(value),
            _ => {}
        }
    }

    if data.is_empty() {
        return None;
    }
    Some(SseFrame {
        event,
        data: data.join("\n"),
    })
}

/// Map a frame onto a [`StreamEvent`].
///
/// Unknown event names yield `Ok(None)`.
pub fn decode_event(frame: &SseFrame) -> Result<Option<StreamEvent>> {
    match frame.event.as_deref() {
        None | Some("message") => {
            let payload: ChunkPayload = serde_json::from_str(&frame.data)?;
            Ok(Some(StreamEvent::Chunk(payload.chunk)))
        }
        Some("sources") => {
            let payload: SourcesPayload = serde_json::from_str(&frame.data)?;
            Ok(Some(StreamEvent::Sources(payload.sources)))
        }
        Some("complete") => {
            let payload: CompletePayload = serde_json::from_str(&frame.data)?;
            Ok(Some(StreamEvent::Complete {
                success: payload.success,
            }))
        }
        Some("error") => Err(Error::Stream(frame.data.clone())),
        Some(other) => {
            debug!(name: "sse.event.ignored", event = %other, "Ignoring unknown SSE event");
            Ok(None)
        }
    }
}

/// Decode a byte stream into chat events.
///
/// Frames may be split across chunks arbitrarily; `\r` bytes are dropped so
/// CRLF-delimited streams frame the same way as LF-delimited ones.
pub fn decode_stream<S, B, E>(bytes: S) -> EventStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<Error> + Send + 'static,
{
    let out = async_stream::try_stream! {
        let mut buf = Vec::<u8>::new();

        futures::pin_mut!(bytes);
        while let Some(chunk) = bytes.next().await {
            let chunk = chunk.map_err(Into::<Error>::into)?;
            buf.extend(chunk.as_ref().iter().copied().filter(|b| *b != b'\r'));

            while let Some(pos) = find_double_newline(&buf) {
                let raw = buf.drain(..pos + 2).collect::<Vec<_>>();
                let text = String::from_utf8_lossy(&raw).into_owned();

                if let Some(frame) = parse_frame(&text) {
                    if let Some(event) = decode_event(&frame)? {
                        yield event;
                    }
                }
            }
        }
    };

    Box::pin(out)
}

/// Render an event as an SSE frame, the way the backend sends it.
#[must_use]
pub fn sse_frame(event: &StreamEvent) -> String {
    let (name, json) = match event {
        StreamEvent::Chunk(chunk) => (None, serde_json::json!({ "chunk": chunk })),
        StreamEvent::Sources(sources) => (Some("sources"), serde_json::json!({ "sources": sources })),
        StreamEvent::Complete { success } => {
            (Some("complete"), serde_json::json!({ "success": success }))
        }
    };

    match name {
        Some(name) => format!("event: {name}\ndata: {json}\n\n"),
        None => format!("data: {json}\n\n"),
    }
}

/// Find the position of a double newline in the buffer.
fn find_double_newline(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(title: &str) -> Source {
        Source {
            title: title.to_string(),
            link: format!("https://news.example/{title}"),
            source: "Wire".to_string(),
        }
    }

    async fn collect(parts: Vec<&'static str>) -> Vec<Result<StreamEvent>> {
        let bytes = futures::stream::iter(
            parts
                .into_iter()
                .map(|p| Ok::<_, Error>(p.as_bytes().to_vec())),
        );
        decode_stream(bytes).collect().await
    }

    #[test]
    fn test_parse_frame_fields() {
        let frame = parse_frame("event: sources\ndata: {\"a\":1}\n").unwrap();
        assert_eq!(frame.event.as_deref(), Some("sources"));
        assert_eq!(frame.data, "{\"a\":1}");

        assert!(parse_frame(": keep-alive\n").is_none());

        let multi = parse_frame("data: line one\ndata: line two\n").unwrap();
        assert_eq!(multi.data, "line one\nline two");
        assert!(multi.event.is_none());
    }

    #[test]
    fn test_decode_error_event() {
        let frame = SseFrame {
            event: Some("error".into()),
            data: "backend exploded".into(),
        };
        assert!(matches!(decode_event(&frame), Err(Error::Stream(msg)) if msg == "backend exploded"));
    }

    #[test]
    fn test_unknown_event_is_skipped() {
        let frame = SseFrame {
            event: Some("ping".into()),
            data: "{}".into(),
        };
        assert_eq!(decode_event(&frame).unwrap(), None);
    }

    #[tokio::test]
    async fn test_decode_stream_across_chunk_boundaries() {
        let events = collect(vec![
            "data: {\"chunk\":\"Hel",
            "lo\"}\n",
            "\n: ping\n\ndata: {\"chunk\":\"world\"}\n\nevent: comp",
            "lete\ndata: {\"success\":true}\n\n",
        ])
        .await;

        let events: Vec<_> = events.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            events,
            vec![
                StreamEvent::Chunk("Hello".into()),
                StreamEvent::Chunk("world".into()),
                StreamEvent::Complete { success: true },
            ]
        );
    }

    #[tokio::test]
    async fn test_decode_stream_crlf() {
        let events = collect(vec![
            "event: sources\r\ndata: {\"sources\":[]}\r\n\r\n",
            "event: complete\r\ndata: {\"success\":false}\r\n\r\n",
        ])
        .await;
        let events: Vec<_> = events.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            events,
            vec![
                StreamEvent::Sources(vec![]),
                StreamEvent::Complete { success: false }
            ]
        );
    }

    #[tokio::test]
    async fn test_frames_round_trip_through_decoder() {
        let sent = vec![
            StreamEvent::Chunk("Markets".into()),
            StreamEvent::Sources(vec![source("a"), source("b")]),
            StreamEvent::Complete { success: true },
        ];
        let wire: String = sent.iter().map(sse_frame).collect();
        let bytes = futures::stream::iter(vec![Ok::<_, Error>(wire.into_bytes())]);
        let got: Vec<_> = decode_stream(bytes)
            .map(Result::unwrap)
            .collect()
            .await;
        assert_eq!(got, sent);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_an_error() {
        let events = collect(vec!["data: not json\n\n"]).await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Err(Error::Json(_))));
    }
}
