//! Streaming frame splitter
//!
//! Serial reads arrive in arbitrary chunks. The framer appends each chunk to
//! the unconsumed remainder and hands out every complete `\r`-terminated
//! message in order. Whatever follows the last separator stays buffered until
//! more bytes arrive.
//!
//! A message longer than [`MAX_FRAME_LEN`] is dropped whole, up to and
//! including its separator, no matter how the stream was split into reads.

use std::collections::VecDeque;

use crate::RECORD_SEPARATOR;

/// Longest message handed out; anything longer is line noise
pub const MAX_FRAME_LEN: usize = 256;

/// Streaming `\r` framer
#[derive(Debug, Default)]
pub struct Framer {
    /// Bytes after the last separator
    buffer: Vec<u8>,
    /// Complete messages not yet taken
    ready: VecDeque<Vec<u8>>,
    /// Dropping an over-long message until its separator
    discarding: bool,
}

impl Framer {
    /// Create a new framer with an empty remainder
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(64),
            ..Default::default()
        }
    }

    /// Push raw bytes read from the line
    pub fn push_bytes(&mut self, data: &[u8]) {
        let mut rest = data;

        while !rest.is_empty() {
            let sep_pos = rest.iter().position(|&b| b == RECORD_SEPARATOR);

            if self.discarding {
                match sep_pos {
                    Some(pos) => {
                        self.discarding = false;
                        rest = &rest[pos + 1..];
                        continue;
                    }
                    None => return,
                }
            }

            match sep_pos {
                Some(pos) => {
                    self.buffer.extend_from_slice(&rest[..pos]);
                    rest = &rest[pos + 1..];
                    let frame = std::mem::take(&mut self.buffer);
                    if frame.len() > MAX_FRAME_LEN {
                        tracing::warn!("Discarding {} byte message", frame.len());
                    } else {
                        self.ready.push_back(frame);
                    }
                }
                None => {
                    self.buffer.extend_from_slice(rest);
                    rest = &[];
                    if self.buffer.len() > MAX_FRAME_LEN {
                        tracing::warn!(
                            "Discarding {} bytes without a record separator",
                            self.buffer.len()
                        );
                        self.buffer.clear();
                        self.discarding = true;
                    }
                }
            }
        }
    }

    /// Take the next complete message, without its separator
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        self.ready.pop_front()
    }

    /// Drain all complete messages currently buffered
    pub fn frames(&mut self) -> impl Iterator<Item = Vec<u8>> + '_ {
        std::iter::from_fn(move || self.next_frame())
    }

    /// Bytes received after the last separator
    pub fn remainder(&self) -> &[u8] {
        &self.buffer
    }

    /// Drop any partial message and any message not yet taken
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.ready.clear();
        self.discarding = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_single_frame() {
        let mut framer = Framer::new();
        framer.push_bytes(b"AV_*P11\r");

        assert_eq!(framer.next_frame(), Some(b"AV_*P11".to_vec()));
        assert!(framer.next_frame().is_none());
        assert!(framer.remainder().is_empty());
    }

    #[test]
    fn test_partial_frame_is_held_back() {
        let mut framer = Framer::new();

        framer.push_bytes(b"AV_/P1");
        assert!(framer.next_frame().is_none());
        assert_eq!(framer.remainder(), b"AV_/P1");

        framer.push_bytes(b"5\rAV_.");
        assert_eq!(framer.next_frame(), Some(b"AV_/P15".to_vec()));
        assert!(framer.next_frame().is_none());
        assert_eq!(framer.remainder(), b"AV_.");
    }

    #[test]
    fn test_multiple_frames_in_one_read() {
        let mut framer = Framer::new();
        framer.push_bytes(b"AV_*P11\rAV_/P15\rAV_.P10\r");

        let frames: Vec<_> = framer.frames().collect();
        assert_eq!(
            frames,
            vec![b"AV_*P11".to_vec(), b"AV_/P15".to_vec(), b"AV_.P10".to_vec()]
        );
    }

    #[test]
    fn test_empty_frames_are_forwarded() {
        let mut framer = Framer::new();
        framer.push_bytes(b"\r\r");

        assert_eq!(framer.next_frame(), Some(Vec::new()));
        assert_eq!(framer.next_frame(), Some(Vec::new()));
        assert!(framer.next_frame().is_none());
    }

    #[test]
    fn test_overflow_discards_remainder() {
        let mut framer = Framer::new();
        framer.push_bytes(&[b'x'; MAX_FRAME_LEN + 1]);
        assert!(framer.remainder().is_empty());

        // The rest of the long message is dropped through its separator
        framer.push_bytes(b"xxxx\rAV_*P11\r");
        assert_eq!(framer.next_frame(), Some(b"AV_*P11".to_vec()));
        assert!(framer.next_frame().is_none());
    }

    #[test]
    fn test_long_message_in_one_read_is_dropped() {
        let mut framer = Framer::new();
        let mut stream = vec![b'x'; MAX_FRAME_LEN + 1];
        stream.extend_from_slice(b"\rAV_*P11\r");
        framer.push_bytes(&stream);

        assert_eq!(framer.next_frame(), Some(b"AV_*P11".to_vec()));
        assert!(framer.next_frame().is_none());
    }

    #[test]
    fn test_long_message_trickled_leaves_no_tail() {
        let mut stream = vec![b'x'; 300];
        stream.extend_from_slice(b"\rAV_*P11\r");

        let mut whole = Framer::new();
        whole.push_bytes(&stream);
        let expected: Vec<_> = whole.frames().collect();

        let mut trickle = Framer::new();
        let mut out = Vec::new();
        for b in &stream {
            trickle.push_bytes(std::slice::from_ref(b));
            out.extend(trickle.frames());
        }

        assert_eq!(expected, vec![b"AV_*P11".to_vec()]);
        assert_eq!(out, expected);
    }

    #[test]
    fn test_message_at_limit_is_kept() {
        let mut framer = Framer::new();
        let mut stream = vec![b'x'; MAX_FRAME_LEN];
        stream.push(b'\r');
        for b in &stream {
            framer.push_bytes(std::slice::from_ref(b));
        }

        assert_eq!(framer.next_frame(), Some(vec![b'x'; MAX_FRAME_LEN]));
    }

    #[test]
    fn test_clear() {
        let mut framer = Framer::new();
        framer.push_bytes(b"AV_*P");
        framer.clear();
        framer.push_bytes(b"AV_*P10\r");

        assert_eq!(framer.next_frame(), Some(b"AV_*P10".to_vec()));
    }

    fn message() -> impl Strategy<Value = Vec<u8>> {
        let byte = || any::<u8>().prop_filter("no separator", |b| *b != b'\r');
        prop_oneof![
            4 => prop::collection::vec(byte(), 0..12),
            1 => prop::collection::vec(byte(), MAX_FRAME_LEN - 4..MAX_FRAME_LEN + 40),
        ]
    }

    proptest! {
        #[test]
        fn any_chunking_yields_the_same_frames(
            messages in prop::collection::vec(message(), 0..16),
            cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..24),
        ) {
            let mut stream = Vec::new();
            for msg in &messages {
                stream.extend_from_slice(msg);
                stream.push(b'\r');
            }

            let mut points: Vec<usize> = cuts.iter().map(|i| i.index(stream.len() + 1)).collect();
            points.push(0);
            points.push(stream.len());
            points.sort_unstable();
            points.dedup();

            let mut framer = Framer::new();
            let mut out = Vec::new();
            for pair in points.windows(2) {
                framer.push_bytes(&stream[pair[0]..pair[1]]);
                out.extend(framer.frames());
            }

            let expected: Vec<_> = messages
                .into_iter()
                .filter(|m| m.len() <= MAX_FRAME_LEN)
                .collect();
            prop_assert_eq!(out, expected);
            prop_assert!(framer.remainder().is_empty());
        }

        #[test]
        fn byte_at_a_time_matches_single_read(messages in prop::collection::vec(message(), 1..8)) {
            let mut stream = Vec::new();
            for msg in &messages {
                stream.extend_from_slice(msg);
                stream.push(b'\r');
            }

            let mut whole = Framer::new();
            whole.push_bytes(&stream);
            let expected: Vec<_> = whole.frames().collect();

            let mut trickle = Framer::new();
            let mut out = Vec::new();
            for b in &stream {
                trickle.push_bytes(std::slice::from_ref(b));
                out.extend(trickle.frames());
            }

            prop_assert_eq!(out, expected);
        }
    }
}
