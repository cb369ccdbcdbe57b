//! Incremental `text/event-stream` framing.

use crate::event::RawEvent;

/// Event name used when a frame has no `event:` line.
pub const DEFAULT_EVENT: &str = "message";

/// Splits a chunked byte stream into frames.
///
/// Bytes are buffered until a blank line (`\n\n` or `\r\n\r\n`) closes a
/// frame, so chunk boundaries may fall anywhere, including inside a UTF-8
/// sequence.
#[derive(Default)]
pub(crate) struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<RawEvent> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some((idx, delim_len)) = find_frame_delimiter(&self.buf) {
            let frame_bytes: Vec<u8> = self.buf.drain(..idx + delim_len).take(idx).collect();
            if let Some(frame) = parse_frame(&frame_bytes) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Parses whatever is left once the body has ended.
    pub fn finish(&mut self) -> Option<RawEvent> {
        let rest = std::mem::take(&mut self.buf);
        parse_frame(&rest)
    }
}

fn find_frame_delimiter(buf: &[u8]) -> Option<(usize, usize)> {
    let mut i = 0;
    while i + 1 < buf.len() {
        if buf[i] == b'\n' && buf[i + 1] == b'\n' {
            return Some((i, 2));
        }
        if i + 3 < buf.len()
            && buf[i] == b'\r'
            && buf[i + 1] == b'\n'
            && buf[i + 2] == b'\r'
            && buf[i + 3] == b'\n'
        {
            return Some((i, 4));
        }
        i += 1;
    }
    None
}

fn parse_frame(bytes: &[u8]) -> Option<RawEvent> {
    if bytes.is_empty() {
        return None;
    }
    let text = String::from_utf8_lossy(bytes);
    let mut event: Option<String> = None;
    let mut data_lines: Vec<&str> = Vec::new();
    for raw_line in text.split('\n') {
        let line = raw_line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => event = Some(value.to_string()),
            "data" => data_lines.push(value),
            _ => {}
        }
    }
    if event.is_none() && data_lines.is_empty() {
        return None;
    }
    Some(RawEvent::new(
        event
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| DEFAULT_EVENT.to_string()),
        data_lines.join("\n"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_partial_chunk_boundaries() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push_chunk(b"event: tok").is_empty());
        assert!(decoder.push_chunk(b"en\ndata: \"hel").is_empty());
        let frames = decoder.push_chunk(b"lo\"\n\nevent: done\ndata: {}\n\n");
        assert_eq!(
            frames,
            vec![
                RawEvent::new("token", "\"hello\""),
                RawEvent::new("done", "{}"),
            ]
        );
    }

    #[test]
    fn joins_multiline_data_and_skips_comments() {
        let mut decoder = SseDecoder::default();
        let frames = decoder.push_chunk(b": keepalive\n\nevent: rt\ndata: one\ndata:  two\nid: 7\n\n");
        assert_eq!(frames, vec![RawEvent::new("rt", "one\n two")]);
    }

    #[test]
    fn crlf_delimiters() {
        let mut decoder = SseDecoder::default();
        let frames = decoder.push_chunk(b"event: error\r\ndata: boom\r\n\r\n");
        assert_eq!(frames, vec![RawEvent::new("error", "boom")]);
    }

    #[test]
    fn event_without_data_has_empty_payload() {
        let mut decoder = SseDecoder::default();
        let frames = decoder.push_chunk(b"event: error\n\n");
        assert_eq!(frames, vec![RawEvent::new("error", "")]);
    }

    #[test]
    fn data_without_event_is_a_message() {
        let mut decoder = SseDecoder::default();
        let frames = decoder.push_chunk(b"data: hi\n\n");
        assert_eq!(frames, vec![RawEvent::new(DEFAULT_EVENT, "hi")]);
    }

    #[test]
    fn multibyte_split_across_chunks() {
        let mut decoder = SseDecoder::default();
        let bytes = "event: rt\ndata: é\n\n".as_bytes();
        let split = bytes.iter().position(|b| *b == 0xC3).expect("lead byte") + 1;
        assert!(decoder.push_chunk(&bytes[..split]).is_empty());
        assert_eq!(decoder.push_chunk(&bytes[split..]), vec![RawEvent::new("rt", "é")]);
    }

    #[test]
    fn finish_flushes_unterminated_frame() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push_chunk(b"event: done\ndata: {}").is_empty());
        assert_eq!(decoder.finish(), Some(RawEvent::new("done", "{}")));
        assert_eq!(decoder.finish(), None);
    }
}
