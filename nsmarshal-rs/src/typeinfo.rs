//! Field descriptors for aggregate types.
//!
//! An aggregate registers an ordered list of [`FieldDesc`]s, usually through
//! the [`xml_struct!`](crate::xml_struct) macro. Before encoding, the list is
//! resolved against the namespace in effect into a [`TypeInfo`], which the
//! encoder caches per type and namespace.

use std::any::TypeId;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::value::ToXml;

/// How a field is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldMode {
    /// A child element.
    Element,
    /// A child element matched by anything on decode.
    Any,
    /// An attribute of the enclosing element.
    Attr,
    /// Character data directly inside the enclosing element.
    CharData,
    /// Markup written verbatim inside the enclosing element.
    InnerXml,
    /// An XML comment.
    Comment,
    /// Names the enclosing element instead of producing content.
    XmlName,
    /// An aggregate whose attributes and fields are encoded as if they
    /// belonged to the enclosing aggregate.
    Embed,
}

/// Static description of one field of an aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDesc {
    /// Local name of the element or attribute.
    pub name: &'static str,
    /// Namespace URI. Empty means inherit the enclosing namespace.
    pub xmlns: &'static str,
    /// Prefix to declare for `xmlns` when it is not yet bound.
    pub prefix: &'static str,
    pub mode: FieldMode,
    /// Skip the field when its value is empty.
    pub omit_empty: bool,
    /// Synthetic parent elements, outermost first (`a>b>c` is `["a", "b"]`).
    pub parents: &'static [&'static str],
}

impl FieldDesc {
    const fn new(mode: FieldMode, name: &'static str) -> Self {
        FieldDesc {
            name,
            xmlns: "",
            prefix: "",
            mode,
            omit_empty: false,
            parents: &[],
        }
    }

    /// A child element named `name`.
    pub const fn element(name: &'static str) -> Self {
        Self::new(FieldMode::Element, name)
    }

    /// A wildcard child element named `name`.
    pub const fn any(name: &'static str) -> Self {
        Self::new(FieldMode::Any, name)
    }

    /// An attribute named `name`.
    pub const fn attr(name: &'static str) -> Self {
        Self::new(FieldMode::Attr, name)
    }

    /// Character data.
    pub const fn chardata() -> Self {
        Self::new(FieldMode::CharData, "")
    }

    /// Raw inner markup.
    pub const fn innerxml() -> Self {
        Self::new(FieldMode::InnerXml, "")
    }

    /// A comment.
    pub const fn comment() -> Self {
        Self::new(FieldMode::Comment, "")
    }

    /// An embedded aggregate, flattened into the enclosing element.
    ///
    /// Its fields are resolved against the same ambient namespace as the
    /// enclosing aggregate's. An embedded XML name field is ignored.
    pub const fn embed() -> Self {
        Self::new(FieldMode::Embed, "")
    }

    /// The element name designator.
    ///
    /// With a non-empty `local` the element is always named `xmlns local`.
    /// With an empty `local` the field's [`Name`](crate::Name) value is used
    /// when it has a non-empty local part.
    pub const fn xml_name(xmlns: &'static str, local: &'static str) -> Self {
        FieldDesc {
            xmlns,
            ..Self::new(FieldMode::XmlName, local)
        }
    }

    /// Places the field in namespace `uri`.
    pub const fn ns(self, uri: &'static str) -> Self {
        FieldDesc { xmlns: uri, ..self }
    }

    /// Prefix to declare the field's namespace under.
    pub const fn prefix(self, prefix: &'static str) -> Self {
        FieldDesc { prefix, ..self }
    }

    /// Skips the field when its value is empty.
    pub const fn omit_empty(self) -> Self {
        FieldDesc {
            omit_empty: true,
            ..self
        }
    }

    /// Nests the field inside synthetic parent elements.
    pub const fn within(self, parents: &'static [&'static str]) -> Self {
        FieldDesc { parents, ..self }
    }
}

/// An aggregate whose fields are described by [`FieldDesc`]s.
pub trait XmlStruct: ToXml + 'static {
    /// Field descriptors in declaration order.
    fn fields(&self) -> &'static [FieldDesc];

    /// Value of the field described by `fields()[index]`.
    fn field(&self, index: usize) -> Option<&dyn ToXml>;

    /// Identity of the implementing type, used to cache resolved descriptors.
    fn type_key(&self) -> TypeId {
        TypeId::of::<Self>()
    }
}

/// A field descriptor resolved against an ambient namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// Position of the field, as passed to [`XmlStruct::field`].
    pub index: usize,
    pub name: &'static str,
    /// Effective namespace URI.
    pub xmlns: String,
    pub prefix: &'static str,
    pub mode: FieldMode,
    pub omit_empty: bool,
    pub parents: &'static [&'static str],
}

/// Resolved descriptors of one aggregate type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeInfo {
    /// The element name designator, if the type has one.
    pub xml_name: Option<FieldInfo>,
    /// All other fields, in declaration order.
    pub fields: Vec<FieldInfo>,
}

impl TypeInfo {
    /// Resolves `descs` for an element whose namespace is `ambient`.
    ///
    /// Element fields and the name designator inherit `ambient` when they
    /// do not name a namespace. Attributes never inherit.
    pub fn resolve(type_name: &str, descs: &[FieldDesc], ambient: &str) -> Result<Self> {
        let mut info = TypeInfo::default();
        for (index, desc) in descs.iter().enumerate() {
            let invalid = |reason| Error::InvalidField {
                type_name: type_name.to_string(),
                field: field_label(desc, index),
                reason,
            };

            let nested = matches!(desc.mode, FieldMode::Element | FieldMode::Any);
            if !desc.parents.is_empty() && !nested {
                return Err(invalid("only element fields can have parent paths"));
            }
            if desc.parents.iter().any(|p| p.is_empty()) {
                return Err(invalid("empty parent path segment"));
            }
            if desc.name.is_empty() && (nested || desc.mode == FieldMode::Attr) {
                return Err(invalid("missing name"));
            }

            let inherits = nested || desc.mode == FieldMode::XmlName;
            let xmlns = if desc.xmlns.is_empty() && inherits {
                ambient
            } else {
                desc.xmlns
            };
            let field = FieldInfo {
                index,
                name: desc.name,
                xmlns: xmlns.to_string(),
                prefix: desc.prefix,
                mode: desc.mode,
                omit_empty: desc.omit_empty,
                parents: desc.parents,
            };

            if desc.mode == FieldMode::XmlName {
                if info.xml_name.is_some() {
                    return Err(invalid("more than one XML name field"));
                }
                info.xml_name = Some(field);
            } else {
                info.fields.push(field);
            }
        }
        Ok(info)
    }
}

fn field_label(desc: &FieldDesc, index: usize) -> String {
    if desc.name.is_empty() {
        format!("#{index}")
    } else {
        desc.name.to_string()
    }
}

/// Cache of resolved descriptors keyed by type and ambient namespace.
#[derive(Debug, Default)]
pub struct TypeCache {
    types: FxHashMap<TypeId, FxHashMap<String, Rc<TypeInfo>>>,
}

impl TypeCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the descriptors of `value`'s type resolved against `ambient`.
    pub fn resolve(&mut self, value: &dyn XmlStruct, ambient: &str) -> Result<Rc<TypeInfo>> {
        let by_ns = self.types.entry(value.type_key()).or_default();
        if let Some(info) = by_ns.get(ambient) {
            return Ok(Rc::clone(info));
        }

        log::trace!("resolving fields of {} in namespace {:?}", value.type_name(), ambient);
        let info = Rc::new(TypeInfo::resolve(value.type_name(), value.fields(), ambient)?);
        by_ns.insert(ambient.to_string(), Rc::clone(&info));
        Ok(info)
    }

    /// Number of resolved (type, namespace) pairs.
    pub fn len(&self) -> usize {
        self.types.values().map(FxHashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Registers a struct's fields for XML encoding.
///
/// Implements [`ToXml`] and [`XmlStruct`] for the named type. Fields are
/// listed in encoding order, each with its [`FieldDesc`]; fields left out
/// are never encoded.
///
/// ```
/// use xml_nsmarshal::{xml_struct, FieldDesc, Name};
///
/// struct Item {
///     name: Name,
///     id: u32,
///     title: String,
/// }
///
/// xml_struct!(Item {
///     name => FieldDesc::xml_name("urn:shop", "item"),
///     id => FieldDesc::attr("id"),
///     title => FieldDesc::element("title").within(&["meta"]),
/// });
///
/// let item = Item { name: Name::default(), id: 7, title: "Lamp".into() };
/// assert_eq!(
///     xml_nsmarshal::to_string(&item).unwrap(),
///     r#"<item xmlns="urn:shop" id="7"><meta><title>Lamp</title></meta></item>"#,
/// );
/// ```
#[macro_export]
macro_rules! xml_struct {
    ($ty:ident { $($field:ident => $desc:expr),* $(,)? }) => {
        impl $crate::ToXml for $ty {
            fn xml_value(&self) -> $crate::Value<'_> {
                $crate::Value::Struct(self)
            }

            fn element_name(&self) -> ::std::option::Option<&'static str> {
                ::std::option::Option::Some(stringify!($ty))
            }
        }

        impl $crate::XmlStruct for $ty {
            fn fields(&self) -> &'static [$crate::FieldDesc] {
                const FIELDS: &[$crate::FieldDesc] = &[$($desc),*];
                FIELDS
            }

            #[allow(unused_mut, unused_variables, unused_assignments)]
            fn field(&self, index: usize) -> ::std::option::Option<&dyn $crate::ToXml> {
                let mut position = 0usize;
                $(
                    if index == position {
                        return ::std::option::Option::Some(&self.$field);
                    }
                    position += 1;
                )*
                ::std::option::Option::None
            }
        }
    };
}
