//! Incremental Server-Sent Events decoding.
//!
//! Network chunks do not respect line boundaries: one read can end in the
//! middle of a `data:` line, or in the middle of a multi-byte UTF-8
//! character. The decoder buffers raw bytes and only decodes complete lines,
//! so a split code point is never replaced with U+FFFD.
//!
//! Only `data:` fields matter for the Gemini stream. Consecutive `data:`
//! lines of one event are joined with `\n`; a blank line ends the event.
//! Comments (`:` prefix) and other fields are ignored.

/// Stateful SSE decoder. Feed bytes with [`push`](Self::push), then call
/// [`finish`](Self::finish) at end of stream.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network chunk; returns the payloads of every event it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(event) = self.take_line(line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush whatever is left once the connection closes.
    pub fn finish(&mut self) -> Option<String> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let rest = String::from_utf8_lossy(&rest);
            let rest = rest.trim_end_matches(['\n', '\r']).to_string();
            if let Some(event) = self.take_line(&rest) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn take_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }
        if let Some(value) = line.strip_prefix("data:") {
            self.data
                .push(value.strip_prefix(' ').unwrap_or(value).to_string());
        }
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        let event = self.data.join("\n");
        self.data.clear();
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_event() {
        let mut d = SseDecoder::new();
        assert_eq!(d.push(b"data: {\"a\":1}\n\n"), vec!["{\"a\":1}"]);
        assert_eq!(d.finish(), None);
    }

    #[test]
    fn event_split_across_chunks() {
        let mut d = SseDecoder::new();
        assert!(d.push(b"data: {\"te").is_empty());
        assert!(d.push(b"xt\":\"hi\"}\r\n").is_empty());
        assert_eq!(d.push(b"\r\n"), vec!["{\"text\":\"hi\"}"]);
    }

    #[test]
    fn multibyte_char_split_across_chunks() {
        let bytes = "data: é\n\n".as_bytes();
        let mut d = SseDecoder::new();
        // Split inside the two-byte 'é'.
        assert!(d.push(&bytes[..7]).is_empty());
        assert_eq!(d.push(&bytes[7..]), vec!["é"]);
    }

    #[test]
    fn comments_and_other_fields_ignored() {
        let mut d = SseDecoder::new();
        let events = d.push(b": keep-alive\nevent: message\ndata: x\n\n");
        assert_eq!(events, vec!["x"]);
    }

    #[test]
    fn multi_line_data_joined() {
        let mut d = SseDecoder::new();
        assert_eq!(d.push(b"data: a\ndata: b\n\n"), vec!["a\nb"]);
    }

    #[test]
    fn finish_flushes_unterminated_event() {
        let mut d = SseDecoder::new();
        assert!(d.push(b"data: tail").is_empty());
        assert_eq!(d.finish(), Some("tail".to_string()));
    }

    #[test]
    fn several_events_in_one_chunk_keep_order() {
        let mut d = SseDecoder::new();
        let events = d.push(b"data: 1\n\ndata: 2\n\ndata: 3\n\n");
        assert_eq!(events, vec!["1", "2", "3"]);
    }
}
