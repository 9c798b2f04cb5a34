//! Output buffers of a managed session.
//!
//! - [`ScrollbackBuffer`]: bounded replay history, oldest bytes evicted first.
//! - [`PendingOutput`]: output not yet pushed to subscribers, drained in
//!   size-bounded batches.
//! - [`Utf8Chunker`]: turns raw pipe reads into text without splitting a
//!   multi-byte character across two chunks.

/// Drop bytes from the front of `text` until it fits in `limit` bytes.
///
/// The cut is moved forward to the next char boundary, so the result may be
/// slightly shorter than `limit`. Calling it again on the result is a no-op.
pub fn truncate_front(text: &mut String, limit: usize) {
    if text.len() <= limit {
        return;
    }
    let mut cut = text.len() - limit;
    while !text.is_char_boundary(cut) {
        cut += 1;
    }
    text.drain(..cut);
}

/// Bounded suffix of everything a process wrote.
#[derive(Debug, Clone)]
pub struct ScrollbackBuffer {
    content: String,
    limit: usize,
}

impl ScrollbackBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            content: String::new(),
            limit,
        }
    }

    pub fn push(&mut self, chunk: &str) {
        self.content.push_str(chunk);
        truncate_front(&mut self.content, self.limit);
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

/// Output waiting for the next flush.
#[derive(Debug, Clone, Default)]
pub struct PendingOutput {
    buf: String,
}

impl PendingOutput {
    pub fn push(&mut self, chunk: &str) {
        self.buf.push_str(chunk);
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Remove and return at most `max` bytes from the front.
    ///
    /// Splits on a char boundary; a single char wider than `max` is returned
    /// whole. Returns `None` when nothing is pending.
    pub fn take_batch(&mut self, max: usize) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        if self.buf.len() <= max {
            return Some(std::mem::take(&mut self.buf));
        }

        let mut end = max;
        while end > 0 && !self.buf.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            end = self
                .buf
                .char_indices()
                .nth(1)
                .map(|(i, _)| i)
                .unwrap_or(self.buf.len());
        }
        Some(self.buf.drain(..end).collect())
    }
}

/// Incremental UTF-8 decoder for pipe reads.
#[derive(Debug, Default)]
pub struct Utf8Chunker {
    pending: Vec<u8>,
}

impl Utf8Chunker {
    /// Decode `bytes`, keeping an incomplete trailing sequence for the next
    /// call. Invalid sequences become U+FFFD.
    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    return out;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(std::str::from_utf8(&self.pending[..valid]).unwrap_or_default());
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                        None => {
                            self.pending.drain(..valid);
                            return out;
                        }
                    }
                }
            }
        }
    }

    /// Flush whatever is left at end of stream.
    pub fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }
}
