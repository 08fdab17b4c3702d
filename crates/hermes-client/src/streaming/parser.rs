//! SSE (Server-Sent Events) parser
//!
//! Parses the SSE wire format into frames. Interpretation of the frame data
//! (heartbeat filtering, JSON decoding) happens in the stream task.

use bytes::Bytes;
use tracing::trace;

/// One dispatched SSE message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// Value of the `event:` field, if the server named the event
    pub event: Option<String>,
    /// Accumulated `data:` lines, joined with newlines
    pub data: String,
    /// Value of the `id:` field, if set
    pub id: Option<String>,
}

/// SSE parser state
#[derive(Debug, Default)]
pub struct SseParser {
    /// Buffer for incomplete lines
    buffer: Vec<u8>,
    /// Current event data being accumulated
    data_buffer: String,
    /// Whether any `data:` field was seen for the current frame
    has_data: bool,
    /// Current event type (if any)
    event_type: Option<String>,
    /// Last event ID (if any)
    last_id: Option<String>,
}

impl SseParser {
    /// Create a new SSE parser
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes into the parser and extract any complete frames
    pub fn feed(&mut self, bytes: Bytes) -> Vec<SseFrame> {
        let mut frames = Vec::new();

        self.buffer.extend_from_slice(&bytes);

        // Process complete lines
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line = self.buffer.drain(..=pos).collect::<Vec<_>>();
            let line = &line[..line.len() - 1];

            // Handle \r\n line endings
            let line = if line.last() == Some(&b'\r') {
                &line[..line.len() - 1]
            } else {
                line
            };

            if let Some(frame) = self.process_line(line) {
                frames.push(frame);
            }
        }

        frames
    }

    /// Process a single line of SSE data
    fn process_line(&mut self, line: &[u8]) -> Option<SseFrame> {
        // Empty line signals end of frame
        if line.is_empty() {
            return self.dispatch_frame();
        }

        // Comment line (keepalive)
        if line.starts_with(b":") {
            trace!("SSE keepalive/comment");
            return None;
        }

        let line_str = match std::str::from_utf8(line) {
            Ok(s) => s,
            Err(_) => {
                trace!("Dropping non-UTF-8 SSE line");
                return None;
            }
        };

        // Split on first colon; optional leading space in the value
        let (field, value) = if let Some(colon_pos) = line_str.find(':') {
            let (f, v) = line_str.split_at(colon_pos);
            let v = &v[1..];
            let v = v.strip_prefix(' ').unwrap_or(v);
            (f, v)
        } else {
            (line_str, "")
        };

        match field {
            "data" => {
                // Multiple data lines are joined with newlines
                if self.has_data {
                    self.data_buffer.push('\n');
                }
                self.data_buffer.push_str(value);
                self.has_data = true;
            }
            "event" => {
                self.event_type = Some(value.to_string());
            }
            "id" => {
                self.last_id = Some(value.to_string());
            }
            "retry" => {
                // Reconnection policy is ours, not the server's
                trace!("SSE retry: {}", value);
            }
            _ => {
                // Unknown field - ignore per SSE spec
                trace!("SSE unknown field: {}", field);
            }
        }

        None
    }

    /// Dispatch the accumulated frame
    fn dispatch_frame(&mut self) -> Option<SseFrame> {
        // A blank line with no fields accumulated is not a frame
        if !self.has_data && self.event_type.is_none() {
            return None;
        }

        let data = std::mem::take(&mut self.data_buffer);
        self.has_data = false;
        let event = self.event_type.take();

        Some(SseFrame {
            event,
            data,
            id: self.last_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_frame() {
        let mut parser = SseParser::new();

        let input = b"data: {\"download_id\":\"d1\",\"status\":\"queued\"}\n\n";
        let frames = parser.feed(Bytes::from_static(input));

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, None);
        assert_eq!(frames[0].data, "{\"download_id\":\"d1\",\"status\":\"queued\"}");
    }

    #[test]
    fn test_parse_named_event() {
        let mut parser = SseParser::new();

        let input = b"event: queue_update\ndata: {\"action\":\"added\"}\n\n";
        let frames = parser.feed(Bytes::from_static(input));

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event.as_deref(), Some("queue_update"));
    }

    #[test]
    fn test_parse_multiple_frames() {
        let mut parser = SseParser::new();

        let input = b"data: {\"a\":1}\n\ndata: {\"b\":2}\n\n";
        let frames = parser.feed(Bytes::from_static(input));

        assert_eq!(frames.len(), 2);
    }

    #[test]
    fn test_parse_chunked_data() {
        let mut parser = SseParser::new();

        // First chunk - incomplete
        let frames1 = parser.feed(Bytes::from_static(b"data: {\"downloaded_by"));
        assert_eq!(frames1.len(), 0);

        // Second chunk - completes the frame
        let frames2 = parser.feed(Bytes::from_static(b"tes\":42}\n\n"));
        assert_eq!(frames2.len(), 1);
        assert_eq!(frames2[0].data, "{\"downloaded_bytes\":42}");
    }

    #[test]
    fn test_multiline_data_joined_with_newline() {
        let mut parser = SseParser::new();

        let input = b"data: line one\ndata: line two\n\n";
        let frames = parser.feed(Bytes::from_static(input));

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "line one\nline two");
    }

    #[test]
    fn test_ignore_comments() {
        let mut parser = SseParser::new();

        let input = b": keepalive\ndata: {\"x\":1}\n\n";
        let frames = parser.feed(Bytes::from_static(input));

        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn test_empty_data_frame_still_dispatches() {
        // Heartbeats arrive as empty data; the frame is dispatched and the
        // stream task drops it
        let mut parser = SseParser::new();

        let input = b"data: \n\n";
        let frames = parser.feed(Bytes::from_static(input));

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "");
    }

    #[test]
    fn test_blank_lines_between_frames_are_ignored() {
        let mut parser = SseParser::new();

        let input = b"\n\ndata: {\"x\":1}\n\n\n";
        let frames = parser.feed(Bytes::from_static(input));

        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn test_id_field_tracked() {
        let mut parser = SseParser::new();

        let input = b"id: 7\ndata: {\"x\":1}\n\n";
        let frames = parser.feed(Bytes::from_static(input));

        assert_eq!(frames[0].id.as_deref(), Some("7"));
    }

    #[test]
    fn test_crlf_line_endings() {
        let mut parser = SseParser::new();

        let input = b"data: {\"x\":1}\r\n\r\n";
        let frames = parser.feed(Bytes::from_static(input));

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "{\"x\":1}");
    }
}
