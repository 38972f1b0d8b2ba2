//! Error types for XML encoding.

use thiserror::Error;

/// Result type alias for encoding operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while encoding a value.
///
/// None of these are transient: each aborts the encode in progress, and
/// whatever was already written stays in the sink.
#[derive(Error, Debug)]
pub enum Error {
    /// The value cannot be named as an element, or cannot be rendered as text.
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// An attribute in an undeclared namespace has no explicit prefix.
    #[error("Attribute {attr} of {element} needs a prefix")]
    MissingAttrPrefix {
        /// Local name of the attribute.
        attr: String,
        /// Local name of the element carrying it.
        element: String,
    },

    /// Comment text contains `--`.
    #[error("Comments must not contain \"--\"")]
    InvalidComment,

    /// A comment field holds something other than text or bytes.
    #[error("Bad type for comment field of {0}")]
    BadCommentType(String),

    /// A registered field descriptor is inconsistent.
    #[error("Invalid field {field} of {type_name}: {reason}")]
    InvalidField {
        /// Type the descriptor belongs to.
        type_name: String,
        /// Name of the offending field.
        field: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// I/O error from the underlying sink.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
