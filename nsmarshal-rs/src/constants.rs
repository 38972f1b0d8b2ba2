//! Constants used throughout the encoder.
//!
//! The reserved namespaces are fixed by the Namespaces in XML recommendation
//! and are bound in every root [`NsContext`](crate::NsContext).

/// Namespace URI permanently bound to the `xml` prefix.
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Namespace URI permanently bound to the `xmlns` prefix.
pub const XMLNS_NS: &str = "http://www.w3.org/2000/xmlns/";

/// Prefix reserved for [`XML_NS`].
pub const XML_PREFIX: &str = "xml";

/// Prefix reserved for [`XMLNS_NS`].
pub const XMLNS_PREFIX: &str = "xmlns";

/// Bindings seeded into every root namespace context, as `(uri, prefix)`.
pub const RESERVED_BINDINGS: [(&str, &str); 2] = [(XML_NS, XML_PREFIX), (XMLNS_NS, XMLNS_PREFIX)];

/// A generic XML declaration suitable for use with the encoder's output.
///
/// The encoder never writes this itself; callers who want a declaration
/// write it to the sink before encoding.
pub const HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
