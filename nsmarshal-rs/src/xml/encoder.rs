//! Encoder entry points.

use std::io::Write;

use super::printer::{EncoderOptions, Printer};
use crate::error::Result;
use crate::namespace::NsContext;
use crate::value::ToXml;

/// Writes XML encodings of values to an output stream.
///
/// Each call to [`encode`](Encoder::encode) writes one self-contained
/// fragment. Namespace declarations never carry over between calls: every
/// top-level value starts from a fresh scope below the encoder's root.
pub struct Encoder<W: Write> {
    /// Root scope holding the reserved `xml` and `xmlns` bindings.
    root: NsContext<'static>,
    printer: Printer<W>,
}

impl<W: Write> Encoder<W> {
    /// Creates an encoder writing unindented XML to `writer`.
    pub fn new(writer: W) -> Self {
        Self::with_options(writer, EncoderOptions::default())
    }

    /// Creates an encoder with the given options.
    pub fn with_options(writer: W, options: EncoderOptions) -> Self {
        Encoder {
            root: NsContext::root(),
            printer: Printer::new(writer, options),
        }
    }

    /// Puts each element on a new line starting with `prefix` followed by
    /// one `indent` per level of nesting. Two empty strings turn
    /// indentation off.
    pub fn indent(&mut self, prefix: impl Into<String>, indent: impl Into<String>) {
        self.printer
            .set_options(EncoderOptions::indented(prefix, indent));
    }

    pub fn options(&self) -> &EncoderOptions {
        self.printer.options()
    }

    /// Writes the XML encoding of `value` and flushes the stream.
    ///
    /// On error the encode stops where it failed; anything written before
    /// that point stays in the stream.
    pub fn encode<T: ToXml + ?Sized>(&mut self, value: &T) -> Result<()> {
        log::debug!("encoding {}", value.type_name());
        let mut ctx = self.root.child();
        self.printer.marshal_value(&value, None, &mut ctx)?;
        self.printer.flush()
    }

    /// Returns a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        self.printer.get_ref()
    }

    /// Flushes and returns the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.printer.into_inner()
    }
}

/// Writes the XML encoding of `value` to `writer`.
pub fn to_writer<W: Write, T: ToXml + ?Sized>(writer: W, value: &T) -> Result<()> {
    Encoder::new(writer).encode(value)
}

/// Returns the XML encoding of `value` as bytes.
pub fn to_vec<T: ToXml + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    to_writer(&mut output, value)?;
    Ok(output)
}

/// Returns the XML encoding of `value` as a string.
///
/// Raw bytes written through inner-markup or comment fields that are not
/// valid UTF-8 are replaced with U+FFFD.
pub fn to_string<T: ToXml + ?Sized>(value: &T) -> Result<String> {
    let output = to_vec(value)?;
    Ok(String::from_utf8_lossy(&output).into_owned())
}

/// Like [`to_string`], but with each element on its own indented line.
pub fn to_string_indent<T: ToXml + ?Sized>(value: &T, prefix: &str, indent: &str) -> Result<String> {
    let mut output = Vec::new();
    let mut encoder = Encoder::with_options(&mut output, EncoderOptions::indented(prefix, indent));
    encoder.encode(value)?;
    drop(encoder);
    Ok(String::from_utf8_lossy(&output).into_owned())
}
