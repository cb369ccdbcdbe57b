//! Capped telemetry buffer.
//!
//! Appended chunks are joined by a blank line into one text buffer. Two caps
//! apply, both evicting the oldest content: an event counter that halves the
//! buffer once more than `max_events` appends have happened, and a length cap
//! that keeps only the trailing `max_chars` characters.
//!
//! Lengths and offsets are counted in `char`s so that eviction never splits a
//! code point.

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_EVENTS: usize = 50;
pub const DEFAULT_MAX_CHARS: usize = 50_000;

const SEPARATOR: &str = "\n\n";

/// Bounds applied by [`TelemetryRing`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TelemetryLimits {
    #[serde(default = "default_max_events")]
    pub max_events: usize,
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

fn default_max_events() -> usize {
    DEFAULT_MAX_EVENTS
}

fn default_max_chars() -> usize {
    DEFAULT_MAX_CHARS
}

impl Default for TelemetryLimits {
    fn default() -> Self {
        Self {
            max_events: DEFAULT_MAX_EVENTS,
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TelemetryRing {
    limits: TelemetryLimits,
    buffer: String,
    chars: usize,
    event_count: usize,
}

impl TelemetryRing {
    pub fn new(limits: TelemetryLimits) -> Self {
        Self {
            limits,
            buffer: String::new(),
            chars: 0,
            event_count: 0,
        }
    }

    pub fn limits(&self) -> TelemetryLimits {
        self.limits
    }

    /// Clears content and the event counter.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.chars = 0;
        self.event_count = 0;
    }

    /// Appends one chunk. Empty chunks are ignored and return `false`.
    pub fn append(&mut self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }

        self.event_count += 1;
        if self.event_count > self.limits.max_events {
            // Halve whatever is buffered right now, not a fraction of the cap.
            self.drop_leading(self.chars / 2);
            self.event_count = self.limits.max_events / 2;
        }

        if !self.buffer.is_empty() {
            self.buffer.push_str(SEPARATOR);
            self.chars += SEPARATOR.len();
        }
        self.buffer.push_str(text);
        self.chars += text.chars().count();

        if self.chars > self.limits.max_chars {
            self.drop_leading(self.chars - self.limits.max_chars);
        }
        true
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    /// Buffered length in characters.
    pub fn len(&self) -> usize {
        self.chars
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Appends counted since the last reset or eviction.
    pub fn event_count(&self) -> usize {
        self.event_count
    }

    fn drop_leading(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        let offset = self
            .buffer
            .char_indices()
            .nth(count)
            .map(|(idx, _)| idx)
            .unwrap_or(self.buffer.len());
        self.buffer.drain(..offset);
        self.chars -= count.min(self.chars);
    }
}

impl Default for TelemetryRing {
    fn default() -> Self {
        Self::new(TelemetryLimits::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(max_events: usize, max_chars: usize) -> TelemetryRing {
        TelemetryRing::new(TelemetryLimits {
            max_events,
            max_chars,
        })
    }

    #[test]
    fn empty_append_is_a_noop() {
        let mut r = ring(3, 100);
        assert!(!r.append(""));
        assert_eq!(r.event_count(), 0);
        assert!(r.is_empty());
    }

    #[test]
    fn chunks_are_joined_with_blank_line() {
        let mut r = ring(10, 100);
        r.append("a");
        r.append("b");
        assert_eq!(r.as_str(), "a\n\nb");
        assert_eq!(r.len(), 4);
        assert_eq!(r.event_count(), 2);
    }

    #[test]
    fn event_cap_drops_first_half_of_current_content() {
        let mut r = ring(2, 1_000);
        r.append("abcd");
        r.append("efgh");
        let before = r.as_str().to_string();
        assert_eq!(before, "abcd\n\nefgh");

        r.append("XY");
        let half = before.len() / 2;
        assert_eq!(r.as_str(), format!("{}\n\nXY", &before[half..]));
        assert_eq!(r.event_count(), 1);
    }

    #[test]
    fn eviction_resets_counter_to_half_the_cap() {
        let mut r = ring(5, 10_000);
        for i in 0..6 {
            r.append(&format!("e{i}"));
        }
        assert_eq!(r.event_count(), 2);
        // Next eviction happens after three more appends.
        r.append("x");
        r.append("y");
        r.append("z");
        assert_eq!(r.event_count(), 5);
        r.append("w");
        assert_eq!(r.event_count(), 2);
    }

    #[test]
    fn char_cap_keeps_the_trailing_characters() {
        let mut r = ring(100, 8);
        r.append("0123456789");
        assert_eq!(r.as_str(), "23456789");
        r.append("ab");
        assert_eq!(r.as_str(), "6789\n\nab");
        assert_eq!(r.len(), 8);
    }

    #[test]
    fn bounds_hold_after_every_append() {
        let mut r = ring(7, 300);
        for i in 0..500 {
            let chunk = "x".repeat(i % 97 + 1);
            r.append(&chunk);
            assert!(r.len() <= 300);
            assert_eq!(r.len(), r.as_str().chars().count());
            assert!(r.event_count() <= 7);
        }
    }

    #[test]
    fn eviction_counts_characters_not_bytes() {
        let mut r = ring(1, 1_000);
        r.append("ééé");
        r.append("z");
        // "ééé" has 3 chars, first 1 dropped.
        assert_eq!(r.as_str(), "éé\n\nz");
        assert_eq!(r.len(), 5);
    }

    #[test]
    fn reset_clears_content_and_counter() {
        let mut r = ring(3, 100);
        r.append("a");
        r.append("b");
        r.reset();
        assert!(r.is_empty());
        assert_eq!(r.len(), 0);
        assert_eq!(r.event_count(), 0);
        r.append("c");
        assert_eq!(r.as_str(), "c");
    }
}
