//! The value model the encoder walks.
//!
//! Every encodable type maps itself onto one [`Value`] variant through
//! [`ToXml`]. The variants mirror the encoder's dispatch order: absent
//! values, nullable and polymorphic wrappers, sequences, scalars, and
//! aggregates.

use std::collections::{BTreeMap, HashMap, VecDeque};

use bytes::Bytes;
use chrono::{DateTime, FixedOffset, TimeZone};

use crate::typeinfo::XmlStruct;

/// An expanded XML name: namespace URI plus local name.
///
/// A field of this type registered with
/// [`FieldDesc::xml_name`](crate::FieldDesc::xml_name) names the element of
/// the enclosing aggregate at runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Name {
    /// The namespace URI (empty string for no namespace).
    pub space: String,
    /// The local part of the name (without prefix).
    pub local: String,
}

impl Name {
    /// Creates a new name with a namespace.
    pub fn new(space: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            space: space.into(),
            local: local.into(),
        }
    }

    /// Creates a name with no namespace.
    pub fn local(local: impl Into<String>) -> Self {
        Self::new("", local)
    }
}

/// Structural view of a value, as seen by the encoder.
#[derive(Clone, Copy)]
pub enum Value<'a> {
    /// Nothing to encode.
    Invalid,
    /// A value that may be absent, such as `Option<T>` or `Box<T>`.
    Nullable(Option<&'a dyn ToXml>),
    /// A polymorphic container such as `Box<dyn ToXml>`.
    Dynamic(Option<&'a dyn ToXml>),
    /// A repeated value. Each item becomes its own element.
    Seq(&'a dyn XmlSeq),
    /// Raw bytes, rendered as text.
    Bytes(&'a [u8]),
    Int(i64),
    Uint(u64),
    F32(f32),
    F64(f64),
    Bool(bool),
    Str(&'a str),
    /// A timestamp, rendered in RFC 3339 form.
    Time(DateTime<FixedOffset>),
    /// An expanded name, meaningful only as an XML name designator.
    Name(&'a Name),
    /// An aggregate with registered field descriptors.
    Struct(&'a dyn XmlStruct),
    /// A map. Only its emptiness can be observed; encoding one fails.
    Map { len: usize },
    /// Anything else the encoder cannot represent.
    Unsupported,
}

impl Value<'_> {
    /// Whether this value counts as empty for `omit_empty` fields.
    pub fn is_empty(&self) -> bool {
        match *self {
            Value::Invalid => false,
            Value::Nullable(inner) | Value::Dynamic(inner) => inner.is_none(),
            Value::Seq(seq) => seq.len() == 0,
            Value::Bytes(b) => b.is_empty(),
            Value::Int(v) => v == 0,
            Value::Uint(v) => v == 0,
            Value::F32(v) => v == 0.0,
            Value::F64(v) => v == 0.0,
            Value::Bool(v) => !v,
            Value::Str(s) => s.is_empty(),
            Value::Map { len } => len == 0,
            Value::Time(_) | Value::Name(_) | Value::Struct(_) | Value::Unsupported => false,
        }
    }

    /// Whether this is a nullable or polymorphic wrapper holding nothing.
    pub fn is_absent_ref(&self) -> bool {
        matches!(self, Value::Nullable(None) | Value::Dynamic(None))
    }
}

/// A type that can be encoded as XML.
pub trait ToXml {
    /// Describes this value to the encoder.
    fn xml_value(&self) -> Value<'_>;

    /// Element name used when neither an XML name field nor the enclosing
    /// field descriptor supplies one.
    fn element_name(&self) -> Option<&'static str> {
        None
    }

    /// Type name used in error messages.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Views a slice of this type as raw bytes, if it is one.
    ///
    /// Lets `Vec<u8>` and `[u8; N]` encode as text rather than as one
    /// element per item.
    #[doc(hidden)]
    fn slice_bytes(items: &[Self]) -> Option<&[u8]>
    where
        Self: Sized,
    {
        let _ = items;
        None
    }
}

/// A sequence whose items are encoded one element each.
pub trait XmlSeq {
    /// Number of items.
    fn len(&self) -> usize;

    /// The item at `index`, which is always below [`len`](XmlSeq::len).
    fn item(&self, index: usize) -> &dyn ToXml;
}

impl<T: ToXml> XmlSeq for Vec<T> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn item(&self, index: usize) -> &dyn ToXml {
        &self[index]
    }
}

impl<T: ToXml, const N: usize> XmlSeq for [T; N] {
    fn len(&self) -> usize {
        N
    }

    fn item(&self, index: usize) -> &dyn ToXml {
        &self[index]
    }
}

impl<T: ToXml> XmlSeq for VecDeque<T> {
    fn len(&self) -> usize {
        VecDeque::len(self)
    }

    fn item(&self, index: usize) -> &dyn ToXml {
        &self[index]
    }
}

macro_rules! impl_scalar {
    ($variant:ident as $repr:ty: $($ty:ty),*) => {
        $(
            impl ToXml for $ty {
                fn xml_value(&self) -> Value<'_> {
                    Value::$variant(*self as $repr)
                }

                fn element_name(&self) -> Option<&'static str> {
                    Some(stringify!($ty))
                }
            }
        )*
    };
}

impl_scalar!(Int as i64: i8, i16, i32, i64, isize);
impl_scalar!(Uint as u64: u16, u32, u64, usize);

impl ToXml for u8 {
    fn xml_value(&self) -> Value<'_> {
        Value::Uint(u64::from(*self))
    }

    fn element_name(&self) -> Option<&'static str> {
        Some("u8")
    }

    fn slice_bytes(items: &[Self]) -> Option<&[u8]> {
        Some(items)
    }
}
impl_scalar!(F32 as f32: f32);
impl_scalar!(F64 as f64: f64);

impl ToXml for bool {
    fn xml_value(&self) -> Value<'_> {
        Value::Bool(*self)
    }

    fn element_name(&self) -> Option<&'static str> {
        Some("bool")
    }
}

impl ToXml for str {
    fn xml_value(&self) -> Value<'_> {
        Value::Str(self)
    }

    fn element_name(&self) -> Option<&'static str> {
        Some("str")
    }
}

impl ToXml for String {
    fn xml_value(&self) -> Value<'_> {
        Value::Str(self)
    }

    fn element_name(&self) -> Option<&'static str> {
        Some("String")
    }
}

impl ToXml for [u8] {
    fn xml_value(&self) -> Value<'_> {
        Value::Bytes(self)
    }
}

impl ToXml for Bytes {
    fn xml_value(&self) -> Value<'_> {
        Value::Bytes(self)
    }

    fn element_name(&self) -> Option<&'static str> {
        Some("Bytes")
    }
}

impl<Tz: TimeZone> ToXml for DateTime<Tz> {
    fn xml_value(&self) -> Value<'_> {
        Value::Time(self.fixed_offset())
    }

    fn element_name(&self) -> Option<&'static str> {
        Some("DateTime")
    }
}

impl ToXml for Name {
    fn xml_value(&self) -> Value<'_> {
        Value::Name(self)
    }
}

impl ToXml for () {
    fn xml_value(&self) -> Value<'_> {
        Value::Invalid
    }
}

impl<T: ToXml + ?Sized> ToXml for &T {
    fn xml_value(&self) -> Value<'_> {
        (**self).xml_value()
    }

    fn element_name(&self) -> Option<&'static str> {
        (**self).element_name()
    }

    fn type_name(&self) -> &'static str {
        (**self).type_name()
    }
}

impl<T: ToXml> ToXml for Option<T> {
    fn xml_value(&self) -> Value<'_> {
        Value::Nullable(self.as_ref().map(|v| v as &dyn ToXml))
    }
}

impl<T: ToXml> ToXml for Box<T> {
    fn xml_value(&self) -> Value<'_> {
        Value::Nullable(Some(&**self))
    }
}

impl ToXml for Box<dyn ToXml> {
    fn xml_value(&self) -> Value<'_> {
        Value::Dynamic(Some(&**self))
    }
}

impl<T: ToXml> ToXml for Vec<T> {
    fn xml_value(&self) -> Value<'_> {
        match T::slice_bytes(self) {
            Some(bytes) => Value::Bytes(bytes),
            None => Value::Seq(self),
        }
    }
}

impl<T: ToXml, const N: usize> ToXml for [T; N] {
    fn xml_value(&self) -> Value<'_> {
        match T::slice_bytes(self) {
            Some(bytes) => Value::Bytes(bytes),
            None => Value::Seq(self),
        }
    }
}

impl<T: ToXml> ToXml for VecDeque<T> {
    fn xml_value(&self) -> Value<'_> {
        Value::Seq(self)
    }
}

impl<K, V, S> ToXml for HashMap<K, V, S> {
    fn xml_value(&self) -> Value<'_> {
        Value::Map { len: self.len() }
    }
}

impl<K, V> ToXml for BTreeMap<K, V> {
    fn xml_value(&self) -> Value<'_> {
        Value::Map { len: self.len() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_scalar_values() {
        assert!(matches!(42i32.xml_value(), Value::Int(42)));
        assert!(matches!(7u8.xml_value(), Value::Uint(7)));
        assert!(matches!(true.xml_value(), Value::Bool(true)));
        assert!(matches!("x".xml_value(), Value::Str("x")));
        assert_eq!(42i32.element_name(), Some("i32"));
    }

    #[test]
    fn test_bytes_are_not_sequences() {
        let raw = Bytes::from_static(b"abc");
        assert!(matches!(raw.xml_value(), Value::Bytes(b"abc")));
        assert!(matches!(vec![1u8, 2].xml_value(), Value::Bytes(&[1, 2])));
        assert!(matches!(b"ok".xml_value(), Value::Bytes(b"ok")));
        assert!(matches!(vec![1u16, 2].xml_value(), Value::Seq(_)));
        assert!(matches!([1i8, 2].xml_value(), Value::Seq(_)));
        assert!(Vec::<u8>::new().xml_value().is_empty());
    }

    #[test]
    fn test_emptiness() {
        assert!(0i64.xml_value().is_empty());
        assert!(!1i64.xml_value().is_empty());
        assert!(0.0f64.xml_value().is_empty());
        assert!(false.xml_value().is_empty());
        assert!(String::new().xml_value().is_empty());
        assert!(Vec::<i32>::new().xml_value().is_empty());
        assert!(None::<i32>.xml_value().is_empty());
        assert!(HashMap::<String, String>::new().xml_value().is_empty());
        assert!(!Some(0).xml_value().is_empty());
        assert!(!Utc::now().xml_value().is_empty());
        assert!(!Value::Invalid.is_empty());
    }

    #[test]
    fn test_wrappers() {
        let boxed: Box<dyn ToXml> = Box::new(5u32);
        assert!(matches!(boxed.xml_value(), Value::Dynamic(Some(_))));
        assert!(matches!(Box::new(5u32).xml_value(), Value::Nullable(Some(_))));
        assert!(None::<u32>.xml_value().is_absent_ref());
        assert!(!Some(5u32).xml_value().is_absent_ref());
        // References are transparent.
        assert!(matches!((&&3i8).xml_value(), Value::Int(3)));
    }

    #[test]
    fn test_sequences() {
        let items = [1u16, 2, 3];
        match items.xml_value() {
            Value::Seq(seq) => {
                assert_eq!(seq.len(), 3);
                assert!(matches!(seq.item(2).xml_value(), Value::Uint(3)));
            }
            _ => panic!("expected a sequence"),
        }
    }
}
