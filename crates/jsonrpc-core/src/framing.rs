/// Accumulates bytes from a stream transport and splits them into
/// delimiter-terminated frames (spec.md §4.1).
///
/// Invariant: after [`FramingBuffer::extract`], the buffer holds at most one
/// trailing partial frame (no delimiter found in it yet). For any sequence
/// of `push` calls, the concatenation of every frame ever extracted plus the
/// current residual equals the concatenation of everything ever pushed,
/// modulo the delimiter bytes themselves and leading whitespace trimmed per
/// chunk.
#[derive(Debug, Clone)]
pub struct FramingBuffer {
    delimiter: Vec<u8>,
    buffer: Vec<u8>,
}

impl FramingBuffer {
    pub fn new(delimiter: impl Into<Vec<u8>>) -> Self {
        Self {
            delimiter: delimiter.into(),
            buffer: Vec::new(),
        }
    }

    /// Append a chunk, trimming leading ASCII whitespace first so stray
    /// inter-message padding on stream transports doesn't accumulate
    /// (spec.md §4.1).
    pub fn push(&mut self, bytes: &[u8]) {
        let trimmed = trim_leading_whitespace(bytes);
        self.buffer.extend_from_slice(trimmed);
    }

    /// Split off every complete frame currently buffered. Empty frames
    /// (two delimiters back to back) are discarded. Any trailing fragment
    /// with no delimiter after it remains buffered for the next call.
    pub fn extract(&mut self) -> Vec<String> {
        let mut frames = Vec::new();
        let mut start = 0;

        while let Some(offset) = find(&self.buffer[start..], &self.delimiter) {
            let end = start + offset;
            let frame = &self.buffer[start..end];
            if !frame.is_empty() {
                frames.push(String::from_utf8_lossy(frame).into_owned());
            }
            start = end + self.delimiter.len();
        }

        self.buffer.drain(0..start);
        frames
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

fn trim_leading_whitespace(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    &bytes[start..]
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_complete_frames_and_keeps_partial() {
        let mut buf = FramingBuffer::new(b"\n".to_vec());
        buf.push(b"{\"a\":1}\n{\"b\":2}\n{\"c\":");
        let frames = buf.extract();
        assert_eq!(frames, vec!["{\"a\":1}", "{\"b\":2}"]);
        assert_eq!(buf.len(), b"{\"c\":".len());
    }

    #[test]
    fn discards_empty_frames() {
        let mut buf = FramingBuffer::new(b"\n".to_vec());
        buf.push(b"\n\n{\"a\":1}\n\n");
        assert_eq!(buf.extract(), vec!["{\"a\":1}"]);
    }

    #[test]
    fn byte_partitioning_is_order_independent() {
        let whole = b"{\"a\":1}\n{\"b\":2}\n{\"c\":3}\n".to_vec();
        let mut unpartitioned = FramingBuffer::new(b"\n".to_vec());
        unpartitioned.push(&whole);
        let expected = unpartitioned.extract();

        for split_at in 0..whole.len() {
            let (first, second) = whole.split_at(split_at);
            let mut partitioned = FramingBuffer::new(b"\n".to_vec());
            partitioned.push(first);
            let mut frames = partitioned.extract();
            partitioned.push(second);
            frames.extend(partitioned.extract());
            assert_eq!(frames, expected, "split at {split_at} diverged");
        }
    }

    #[test]
    fn trims_leading_whitespace_padding() {
        let mut buf = FramingBuffer::new(b"\n".to_vec());
        buf.push(b"   \t{\"a\":1}\n");
        assert_eq!(buf.extract(), vec!["{\"a\":1}"]);
    }
}
