//! Namespace-aware XML encoding of typed values.
//!
//! This library turns Rust values into XML text. Aggregates describe their
//! fields once, with [`xml_struct!`], and the encoder takes care of:
//!
//! - Element and attribute naming, including an explicit element name field
//! - Namespace declarations, emitted only where a namespace is not already
//!   bound by an ancestor element
//! - Character data, raw inner markup and comments
//! - Synthetic parent elements for nested paths such as `a>b>c`, shared by
//!   consecutive fields with a common path prefix
//! - Optional indentation
//!
//! # Example
//!
//! ```
//! use xml_nsmarshal::{xml_struct, FieldDesc, Name};
//!
//! struct Error {
//!     name: Name,
//!     text: String,
//! }
//!
//! xml_struct!(Error {
//!     name => FieldDesc::xml_name("urn:example", "error"),
//!     text => FieldDesc::element("text").omit_empty(),
//! });
//!
//! let err = Error { name: Name::default(), text: String::new() };
//! assert_eq!(
//!     xml_nsmarshal::to_string(&err).unwrap(),
//!     r#"<error xmlns="urn:example"></error>"#,
//! );
//! ```
//!
//! No XML declaration is written; prepend [`HEADER`] if one is needed.

pub mod constants;
pub mod error;
pub mod escape;
pub mod namespace;
pub mod typeinfo;
pub mod value;
pub mod xml;

// Re-export commonly used types
pub use constants::*;
pub use error::{Error, Result};
pub use escape::{escape, escape_str};
pub use namespace::NsContext;
pub use typeinfo::{FieldDesc, FieldInfo, FieldMode, TypeCache, TypeInfo, XmlStruct};
pub use value::{Name, ToXml, Value, XmlSeq};
pub use xml::{to_string, to_string_indent, to_vec, to_writer, Encoder, EncoderOptions};
