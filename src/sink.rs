//! Output sinks
//!
//! Everything the compiler emits goes through a character sink, so the same
//! unparsing code can write to a file, a fixed buffer, or a growable vector
//! in tests.

use std::io::Write;

/// A character-at-a-time output destination.
pub trait Sink {
    /// Write one byte
    fn put(&mut self, byte: u8);

    /// Write a string
    fn put_str(&mut self, s: &str) {
        for &b in s.as_bytes() {
            self.put(b);
        }
    }
}

impl Sink for Vec<u8> {
    #[inline]
    fn put(&mut self, byte: u8) {
        self.push(byte);
    }
}

/// A sink backed by any [`std::io::Write`]. The first write error is
/// remembered and subsequent output is dropped.
pub struct FileSink<W: Write> {
    inner: W,
    error: Option<std::io::Error>,
}

impl<W: Write> FileSink<W> {
    /// Wrap a writer
    pub fn new(inner: W) -> Self {
        Self { inner, error: None }
    }

    /// The first write error, if any occurred
    pub fn error(&self) -> Option<&std::io::Error> {
        self.error.as_ref()
    }

    /// Flush and return the underlying writer
    pub fn into_inner(mut self) -> W {
        let _ = self.inner.flush();
        self.inner
    }
}

impl<W: Write> Sink for FileSink<W> {
    fn put(&mut self, byte: u8) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.inner.write_all(&[byte]) {
            self.error = Some(e);
        }
    }
}

/// A sink over a fixed-size buffer. Output past the capacity is dropped.
pub struct FixedSink {
    buf: Vec<u8>,
    capacity: usize,
}

impl FixedSink {
    /// Create a sink that holds at most `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity.min(4096)),
            capacity,
        }
    }

    /// The bytes written so far
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// The bytes written so far, as UTF-8
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.buf).unwrap_or("<non-utf8 output>")
    }

    /// Whether writes were dropped because the buffer filled up
    pub fn truncated(&self) -> bool {
        self.buf.len() >= self.capacity
    }
}

impl Sink for FixedSink {
    fn put(&mut self, byte: u8) {
        if self.buf.len() < self.capacity {
            self.buf.push(byte);
        }
    }
}
