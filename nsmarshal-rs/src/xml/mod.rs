//! XML output.
//!
//! The encoder walks a value's [`Value`](crate::Value) description and
//! writes elements, attributes and namespace declarations through a
//! buffered printer. Namespace scoping is handled by giving every element its own
//! [`NsContext`](crate::NsContext) chained to its parent's.

mod encoder;
mod marshal;
mod parents;
mod printer;

pub use encoder::{to_string, to_string_indent, to_vec, to_writer, Encoder};
pub use printer::EncoderOptions;
