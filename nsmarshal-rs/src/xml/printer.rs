//! Output state shared by every step of an encode.
//!
//! The printer owns the buffered sink and the indentation bookkeeping.
//! Write errors are not checked byte by byte: the first one is cached and
//! reported at the next [`Printer::cached_write_error`] check point.

use std::io::{self, BufWriter, Write};

use crate::error::Result;
use crate::escape::escape;
use crate::typeinfo::TypeCache;

/// Options for XML encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncoderOptions {
    /// Written at the start of every indented line.
    pub prefix: String,
    /// Written once per nesting level after the prefix.
    pub indent: String,
}

impl EncoderOptions {
    /// Options that put each element on its own line.
    pub fn indented(prefix: impl Into<String>, indent: impl Into<String>) -> Self {
        EncoderOptions {
            prefix: prefix.into(),
            indent: indent.into(),
        }
    }

    /// Whether any indentation is configured.
    pub fn is_pretty(&self) -> bool {
        !self.prefix.is_empty() || !self.indent.is_empty()
    }
}

/// A buffered writer that remembers its first error.
struct Sink<W: Write> {
    writer: BufWriter<W>,
    err: Option<io::Error>,
}

impl<W: Write> Sink<W> {
    fn write_with(&mut self, f: impl FnOnce(&mut BufWriter<W>) -> io::Result<()>) {
        if self.err.is_none() {
            if let Err(e) = f(&mut self.writer) {
                self.err = Some(e);
            }
        }
    }

    fn write(&mut self, bytes: &[u8]) {
        self.write_with(|w| w.write_all(bytes));
    }
}

/// Encoding state for one output stream.
pub struct Printer<W: Write> {
    sink: Sink<W>,
    options: EncoderOptions,
    /// Current nesting depth, used for indentation only.
    depth: usize,
    /// Whether the last indentation step opened a level.
    indented_in: bool,
    /// Whether the next indented line needs a newline first.
    put_newline: bool,
    /// Resolved field descriptors.
    pub(crate) types: TypeCache,
}

impl<W: Write> Printer<W> {
    /// Creates a printer writing to `writer`.
    pub fn new(writer: W, options: EncoderOptions) -> Self {
        Printer {
            sink: Sink {
                writer: BufWriter::new(writer),
                err: None,
            },
            options,
            depth: 0,
            indented_in: false,
            put_newline: false,
            types: TypeCache::new(),
        }
    }

    /// Replaces the indentation settings.
    pub fn set_options(&mut self, options: EncoderOptions) {
        self.options = options;
    }

    pub fn options(&self) -> &EncoderOptions {
        &self.options
    }

    pub fn write_str(&mut self, s: &str) {
        self.sink.write(s.as_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.sink.write(bytes);
    }

    /// Writes `raw` with XML special characters escaped.
    pub fn write_escaped(&mut self, raw: &[u8]) {
        self.sink.write_with(|w| escape(w, raw));
    }

    /// Writes `prefix:local`, or just `local` when `prefix` is empty.
    pub fn write_qname(&mut self, prefix: &str, local: &str) {
        if !prefix.is_empty() {
            self.write_str(prefix);
            self.write_str(":");
        }
        self.write_str(local);
    }

    /// Starts a new indented line and adjusts the depth.
    ///
    /// `depth_delta` is `1` before an open tag, `-1` before a close tag and
    /// `0` for content on its own line. A close tag directly after its open
    /// tag stays on the same line.
    pub fn write_indent(&mut self, depth_delta: i32) {
        if !self.options.is_pretty() {
            return;
        }
        if depth_delta < 0 {
            self.depth = self.depth.saturating_sub(1);
            if self.indented_in {
                self.indented_in = false;
                return;
            }
            self.indented_in = false;
        }
        if self.put_newline {
            self.sink.write(b"\n");
        } else {
            self.put_newline = true;
        }
        self.sink.write(self.options.prefix.as_bytes());
        for _ in 0..self.depth {
            self.sink.write(self.options.indent.as_bytes());
        }
        if depth_delta > 0 {
            self.depth += 1;
            self.indented_in = true;
        }
    }

    /// Returns the cached write error, if any.
    ///
    /// The error stays cached: once a write has failed, every later write
    /// is dropped and every later check fails.
    pub fn cached_write_error(&mut self) -> Result<()> {
        match &self.sink.err {
            Some(e) => Err(io::Error::new(e.kind(), e.to_string()).into()),
            None => Ok(()),
        }
    }

    /// Flushes buffered output to the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        self.sink.write_with(|w| w.flush());
        self.cached_write_error()
    }

    pub fn get_ref(&self) -> &W {
        self.sink.writer.get_ref()
    }

    /// Flushes and returns the underlying writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.cached_write_error()?;
        self.sink
            .writer
            .into_inner()
            .map_err(|e| e.into_error().into())
    }
}
