//! Recursive value-to-markup encoding.

use std::borrow::Cow;
use std::fmt;
use std::io::Write;
use std::rc::Rc;

use chrono::{DateTime, FixedOffset, Timelike};

use super::parents::ParentStack;
use super::printer::Printer;
use crate::error::{Error, Result};
use crate::namespace::NsContext;
use crate::typeinfo::{FieldInfo, FieldMode, TypeInfo, XmlStruct};
use crate::value::{ToXml, Value};

/// Looks through nullable and polymorphic wrappers.
///
/// Returns the innermost value with its description, or `None` when a
/// wrapper is empty or the value is invalid.
fn deref_value(val: &dyn ToXml) -> Option<(&dyn ToXml, Value<'_>)> {
    let mut val = val;
    loop {
        match val.xml_value() {
            Value::Nullable(Some(inner)) | Value::Dynamic(Some(inner)) => val = inner,
            Value::Nullable(None) | Value::Dynamic(None) | Value::Invalid => return None,
            value => return Some((val, value)),
        }
    }
}

/// Text form of a scalar, or `None` if the value has none.
///
/// Bytes are handled by callers since they are not necessarily UTF-8.
fn scalar_text(value: &Value<'_>) -> Option<Cow<'static, str>> {
    let text = match *value {
        Value::Int(v) => v.to_string(),
        Value::Uint(v) => v.to_string(),
        Value::F32(v) => format_float(v, v.is_nan(), v.is_infinite(), v.is_sign_negative()),
        Value::F64(v) => format_float(v, v.is_nan(), v.is_infinite(), v.is_sign_negative()),
        Value::Bool(v) => return Some(Cow::Borrowed(if v { "true" } else { "false" })),
        Value::Str(s) => s.to_string(),
        Value::Time(t) => format_time(&t),
        _ => return None,
    };
    Some(Cow::Owned(text))
}

/// Shortest text that reads back as `v`, in exponent form when the decimal
/// exponent is below -4 or at least 6 (`1e+06`, `1.5e-07`).
fn format_float<F: fmt::Display + fmt::LowerExp>(v: F, nan: bool, infinite: bool, negative: bool) -> String {
    match (nan, infinite, negative) {
        (true, _, _) => return "NaN".to_string(),
        (_, true, true) => return "-Inf".to_string(),
        (_, true, false) => return "+Inf".to_string(),
        _ => {}
    }
    let sci = format!("{v:e}");
    let (mantissa, exp) = match sci.split_once('e') {
        Some((mantissa, exp)) => (mantissa, exp.parse::<i32>().unwrap_or(0)),
        None => return sci,
    };
    if (-4..6).contains(&exp) {
        return v.to_string();
    }
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exp.unsigned_abs())
}

/// RFC 3339 with only as many fractional digits as needed, `Z` for UTC.
fn format_time(t: &DateTime<FixedOffset>) -> String {
    let mut text = t.format("%Y-%m-%dT%H:%M:%S").to_string();
    // Leap seconds are carried in the nanosecond field.
    let nanos = t.nanosecond() % 1_000_000_000;
    if nanos != 0 {
        let fraction = format!("{nanos:09}");
        text.push('.');
        text.push_str(fraction.trim_end_matches('0'));
    }
    if t.offset().local_minus_utc() == 0 {
        text.push('Z');
    } else {
        text.push_str(&t.format("%:z").to_string());
    }
    text
}

/// An attribute about to be written, with the value it was read from.
type AttrField<'v> = (FieldInfo, &'v dyn ToXml, Value<'v>);

impl<W: Write> Printer<W> {
    /// Writes one or more elements representing `val`.
    ///
    /// `finfo` describes the struct field `val` was read from, if any.
    /// `ctx` is the namespace context of the element about to be written;
    /// declarations made for it land in `ctx` and are seen only by its
    /// descendants.
    pub(crate) fn marshal_value(
        &mut self,
        val: &dyn ToXml,
        finfo: Option<&FieldInfo>,
        ctx: &mut NsContext<'_>,
    ) -> Result<()> {
        let value = val.xml_value();
        if let Value::Invalid = value {
            return Ok(());
        }
        if finfo.is_some_and(|f| f.omit_empty) && value.is_empty() {
            return Ok(());
        }

        match value {
            Value::Nullable(inner) | Value::Dynamic(inner) => {
                return match inner {
                    Some(inner) => self.marshal_value(inner, finfo, ctx),
                    None => Ok(()),
                };
            }
            // Sequences have no enclosing tag, and each item gets its own scope.
            Value::Seq(seq) => {
                for index in 0..seq.len() {
                    let mut child = ctx.child();
                    self.marshal_value(seq.item(index), finfo, &mut child)?;
                }
                return Ok(());
            }
            _ => {}
        }

        if let Some(finfo) = finfo {
            ctx.set_xmlns(&finfo.xmlns);
        }

        let tinfo = match value {
            Value::Struct(s) => {
                let ambient = ctx.xmlns().to_string();
                let info = self.types.resolve(s, &ambient)?;
                Some((s, info, ambient))
            }
            _ => None,
        };

        // Name precedence: XML name field, then the field descriptor, then the type.
        let mut prefix = "";
        let mut name = "";
        if let Some((s, tinfo, _)) = &tinfo {
            if let Some(xml_name) = &tinfo.xml_name {
                if !xml_name.name.is_empty() {
                    ctx.set_xmlns(&xml_name.xmlns);
                    name = xml_name.name;
                } else if let Some(Value::Name(n)) = s.field(xml_name.index).map(|f| f.xml_value()) {
                    if !n.local.is_empty() {
                        ctx.set_xmlns(&n.space);
                        name = &n.local;
                    }
                }
            }
        }
        if name.is_empty() {
            if let Some(finfo) = finfo {
                prefix = finfo.prefix;
                name = finfo.name;
            }
        }
        if name.is_empty() {
            name = val
                .element_name()
                .ok_or_else(|| Error::UnsupportedType(val.type_name().to_string()))?;
        }

        // A prefix already bound in scope wins over the requested one, so the
        // tag never carries a prefix that was not declared.
        let xmlns = ctx.xmlns().to_string();
        let mapped = if xmlns.is_empty() {
            None
        } else {
            ctx.lookup(&xmlns).map(str::to_string)
        };
        let tag_prefix = mapped.as_deref().unwrap_or(prefix);

        self.write_indent(1);
        self.write_str("<");
        self.write_qname(tag_prefix, name);

        if !xmlns.is_empty() && mapped.is_none() {
            log::trace!("declaring {xmlns:?} with prefix {prefix:?} on <{name}>");
            ctx.bind(&xmlns, prefix);
            self.write_str(" xmlns");
            if !prefix.is_empty() {
                self.write_str(":");
                self.write_str(prefix);
            }
            self.write_str("=\"");
            self.write_escaped(xmlns.as_bytes());
            self.write_str("\"");
        }

        if let Some((s, tinfo, ambient)) = &tinfo {
            self.marshal_attrs(*s, tinfo, ambient, name, ctx)?;
        }

        self.write_str(">");

        match &tinfo {
            Some((s, tinfo, ambient)) => self.marshal_struct(tinfo, *s, ambient, ctx)?,
            None => self.marshal_simple(val, &value)?,
        }

        self.write_indent(-1);
        self.write_str("</");
        self.write_qname(tag_prefix, name);
        self.write_str(">");

        self.cached_write_error()
    }

    /// Resolves the aggregate held by an embedded field.
    ///
    /// Returns `None` when the field is absent.
    fn embedded<'v>(
        &mut self,
        owner: &dyn XmlStruct,
        finfo: &FieldInfo,
        field: &'v dyn ToXml,
        ambient: &str,
    ) -> Result<Option<(&'v dyn XmlStruct, Rc<TypeInfo>)>> {
        match deref_value(field) {
            None => Ok(None),
            Some((_, Value::Struct(inner))) => Ok(Some((inner, self.types.resolve(inner, ambient)?))),
            Some(_) => Err(Error::InvalidField {
                type_name: owner.type_name().to_string(),
                field: format!("#{}", finfo.index),
                reason: "embedded field is not an aggregate",
            }),
        }
    }

    /// Gathers the attributes of `s` and of the aggregates it embeds, in
    /// declaration order.
    fn collect_attrs<'v>(
        &mut self,
        s: &'v dyn XmlStruct,
        tinfo: &TypeInfo,
        ambient: &str,
        attrs: &mut Vec<AttrField<'v>>,
    ) -> Result<()> {
        for finfo in &tinfo.fields {
            if !matches!(finfo.mode, FieldMode::Attr | FieldMode::Embed) {
                continue;
            }
            let Some(field) = s.field(finfo.index) else {
                continue;
            };
            if finfo.mode == FieldMode::Embed {
                if let Some((inner, inner_info)) = self.embedded(s, finfo, field, ambient)? {
                    self.collect_attrs(inner, &inner_info, ambient, attrs)?;
                }
                continue;
            }
            if finfo.omit_empty && field.xml_value().is_empty() {
                continue;
            }
            if let Some((field, value)) = deref_value(field) {
                attrs.push((finfo.clone(), field, value));
            }
        }
        Ok(())
    }

    /// Declares attribute namespaces, then writes the attributes themselves.
    fn marshal_attrs(
        &mut self,
        s: &dyn XmlStruct,
        tinfo: &TypeInfo,
        ambient: &str,
        element: &str,
        ctx: &mut NsContext<'_>,
    ) -> Result<()> {
        let mut attrs = Vec::new();
        self.collect_attrs(s, tinfo, ambient, &mut attrs)?;

        for (finfo, _, _) in &attrs {
            if finfo.xmlns.is_empty() || ctx.lookup(&finfo.xmlns).is_some() {
                continue;
            }
            if finfo.prefix.is_empty() {
                return Err(Error::MissingAttrPrefix {
                    attr: finfo.name.to_string(),
                    element: element.to_string(),
                });
            }
            log::trace!("declaring {:?} with prefix {:?} for @{}", finfo.xmlns, finfo.prefix, finfo.name);
            ctx.bind(&finfo.xmlns, finfo.prefix);
            self.write_str(" xmlns:");
            self.write_str(finfo.prefix);
            self.write_str("=\"");
            self.write_escaped(finfo.xmlns.as_bytes());
            self.write_str("\"");
        }

        // The prefix bound in scope is used even when it differs from the
        // field's own, and may be empty for the default namespace.
        for (finfo, field, value) in &attrs {
            self.write_str(" ");
            if !finfo.xmlns.is_empty() {
                if let Some(prefix) = ctx.lookup(&finfo.xmlns) {
                    self.write_qname(prefix, "");
                }
            }
            self.write_str(finfo.name);
            self.write_str("=\"");
            self.marshal_simple(*field, value)?;
            self.write_str("\"");
        }
        Ok(())
    }

    /// Writes a scalar as escaped text.
    pub(crate) fn marshal_simple(&mut self, val: &dyn ToXml, value: &Value<'_>) -> Result<()> {
        match value {
            Value::Bytes(raw) => self.write_escaped(raw),
            _ => match scalar_text(value) {
                Some(text) => self.write_escaped(text.as_bytes()),
                None => return Err(Error::UnsupportedType(val.type_name().to_string())),
            },
        }
        self.cached_write_error()
    }

    /// Writes the body of an aggregate: everything except its attributes.
    fn marshal_struct(
        &mut self,
        tinfo: &TypeInfo,
        s: &dyn XmlStruct,
        ambient: &str,
        ctx: &NsContext<'_>,
    ) -> Result<()> {
        let mut parents = ParentStack::default();
        self.marshal_fields(tinfo, s, ambient, ctx, &mut parents)?;
        parents.trim(self, &[]);
        self.cached_write_error()
    }

    /// Writes the content fields of `s`. Embedded aggregates share the
    /// enclosing element's parent stack.
    fn marshal_fields(
        &mut self,
        tinfo: &TypeInfo,
        s: &dyn XmlStruct,
        ambient: &str,
        ctx: &NsContext<'_>,
        parents: &mut ParentStack,
    ) -> Result<()> {
        for finfo in &tinfo.fields {
            if finfo.mode == FieldMode::Attr {
                continue;
            }
            let Some(field) = s.field(finfo.index) else {
                continue;
            };

            match finfo.mode {
                FieldMode::CharData => {
                    match deref_value(field) {
                        Some((_, Value::Bytes(raw))) => self.write_escaped(raw),
                        Some((_, value)) => {
                            if let Some(text) = scalar_text(&value) {
                                self.write_escaped(text.as_bytes());
                            }
                        }
                        None => {}
                    }
                    continue;
                }
                FieldMode::Comment => {
                    self.marshal_comment(s, field)?;
                    continue;
                }
                FieldMode::Embed => {
                    if let Some((inner, inner_info)) = self.embedded(s, finfo, field, ambient)? {
                        self.marshal_fields(&inner_info, inner, ambient, ctx, parents)?;
                    }
                    continue;
                }
                FieldMode::InnerXml => match deref_value(field) {
                    Some((_, Value::Str(raw))) => {
                        self.write_str(raw);
                        continue;
                    }
                    Some((_, Value::Bytes(raw))) => {
                        self.write_bytes(raw);
                        continue;
                    }
                    // Anything else is encoded as an ordinary element.
                    _ => {}
                },
                FieldMode::Element | FieldMode::Any => {
                    parents.trim(self, finfo.parents);
                    if finfo.parents.len() > parents.len() && !field.xml_value().is_absent_ref() {
                        parents.push(self, &finfo.parents[parents.len()..]);
                    }
                }
                FieldMode::Attr | FieldMode::XmlName => continue,
            }

            let mut child = ctx.child();
            self.marshal_value(field, Some(finfo), &mut child)?;
        }
        Ok(())
    }

    /// Writes a comment field. Nothing is written if the text is invalid.
    fn marshal_comment(&mut self, owner: &dyn XmlStruct, field: &dyn ToXml) -> Result<()> {
        let raw: &[u8] = match deref_value(field) {
            Some((_, Value::Str(s))) => s.as_bytes(),
            Some((_, Value::Bytes(b))) => b,
            None => return Ok(()),
            Some(_) => return Err(Error::BadCommentType(owner.type_name().to_string())),
        };
        if raw.is_empty() {
            return Ok(());
        }
        if raw.windows(2).any(|pair| pair == b"--") {
            return Err(Error::InvalidComment);
        }

        self.write_indent(0);
        self.write_str("<!--");
        self.write_bytes(raw);
        if raw.ends_with(b"-") {
            // "--->" is not allowed, so write "- -->" instead.
            self.write_str(" ");
        }
        self.write_str("-->");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Name;
    use crate::xml::printer::EncoderOptions;
    use crate::FieldDesc;
    use chrono::{FixedOffset, TimeZone};

    fn encode(val: &dyn ToXml) -> Result<String> {
        let mut p = Printer::new(Vec::new(), EncoderOptions::default());
        let root = NsContext::root();
        let mut ctx = root.child();
        p.marshal_value(val, None, &mut ctx)?;
        Ok(String::from_utf8(p.into_inner()?).unwrap())
    }

    struct Point {
        x: i32,
        y: i32,
    }

    crate::xml_struct!(Point {
        x => FieldDesc::attr("x"),
        y => FieldDesc::attr("y"),
    });

    struct Labelled {
        name: Name,
        label: String,
        comment: String,
    }

    crate::xml_struct!(Labelled {
        name => FieldDesc::xml_name("", ""),
        label => FieldDesc::chardata(),
        comment => FieldDesc::comment(),
    });

    #[test]
    fn test_scalar_text() {
        assert_eq!(scalar_text(&Value::Int(-3)).unwrap(), "-3");
        assert_eq!(scalar_text(&Value::Uint(u64::MAX)).unwrap(), "18446744073709551615");
        assert_eq!(scalar_text(&Value::F64(0.1)).unwrap(), "0.1");
        assert_eq!(scalar_text(&Value::F32(1.5)).unwrap(), "1.5");
        assert_eq!(scalar_text(&Value::F64(f64::NEG_INFINITY)).unwrap(), "-Inf");
        assert_eq!(scalar_text(&Value::F32(f32::INFINITY)).unwrap(), "+Inf");
        assert_eq!(scalar_text(&Value::F32(f32::NAN)).unwrap(), "NaN");
        assert_eq!(scalar_text(&Value::Bool(false)).unwrap(), "false");
        assert!(scalar_text(&Value::Map { len: 0 }).is_none());
    }

    #[test]
    fn test_float_exponent_form() {
        assert_eq!(format_float(1e21f64, false, false, false), "1e+21");
        assert_eq!(format_float(1e6f64, false, false, false), "1e+06");
        assert_eq!(format_float(123456.0f64, false, false, false), "123456");
        assert_eq!(format_float(1234567.0f64, false, false, false), "1.234567e+06");
        assert_eq!(format_float(0.0001f64, false, false, false), "0.0001");
        assert_eq!(format_float(0.00001f64, false, false, false), "1e-05");
        assert_eq!(format_float(-2.5e-10f64, false, false, true), "-2.5e-10");
        assert_eq!(format_float(1e100f64, false, false, false), "1e+100");
        assert_eq!(format_float(0.0f64, false, false, false), "0");
        assert_eq!(format_float(3.4e38f32, false, false, false), "3.4e+38");
    }

    #[test]
    fn test_time_text() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let t = offset.with_ymd_and_hms(2011, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(scalar_text(&Value::Time(t)).unwrap(), "2011-03-04T05:06:07+02:00");

        let utc = t.with_timezone(&chrono::Utc);
        assert_eq!(encode(&utc).unwrap(), "<DateTime>2011-03-04T03:06:07Z</DateTime>");

        let frac = t + chrono::Duration::milliseconds(120);
        assert_eq!(scalar_text(&Value::Time(frac)).unwrap(), "2011-03-04T05:06:07.12+02:00");
        let nanos = t + chrono::Duration::nanoseconds(5);
        assert_eq!(scalar_text(&Value::Time(nanos)).unwrap(), "2011-03-04T05:06:07.000000005+02:00");

        let west = FixedOffset::west_opt(5 * 3600 + 30 * 60).unwrap();
        let t = west.with_ymd_and_hms(1999, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(scalar_text(&Value::Time(t)).unwrap(), "1999-12-31T23:59:59-05:30");
    }

    #[test]
    fn test_scalar_named_by_type() {
        assert_eq!(encode(&42i32).unwrap(), "<i32>42</i32>");
        assert_eq!(encode(&"a<b".to_string()).unwrap(), "<String>a&lt;b</String>");
    }

    #[test]
    fn test_unnamed_value_is_unsupported() {
        let raw: &[u8] = b"abc";
        let err = encode(&raw).unwrap_err();
        assert!(matches!(err, Error::UnsupportedType(_)));
    }

    #[test]
    fn test_map_is_unsupported() {
        let map = std::collections::BTreeMap::from([(1, 2)]);
        struct Holder {
            map: std::collections::BTreeMap<i32, i32>,
        }
        crate::xml_struct!(Holder {
            map => FieldDesc::element("map"),
        });
        let err = encode(&Holder { map }).unwrap_err();
        assert!(matches!(err, Error::UnsupportedType(ref t) if t.contains("BTreeMap")));
    }

    #[test]
    fn test_attributes() {
        assert_eq!(encode(&Point { x: 1, y: -2 }).unwrap(), r#"<Point x="1" y="-2"></Point>"#);
    }

    #[test]
    fn test_dynamic_name_and_chardata() {
        let value = Labelled {
            name: Name::new("urn:l", "label"),
            label: "a & b".into(),
            comment: "note-".into(),
        };
        assert_eq!(
            encode(&value).unwrap(),
            r#"<label xmlns="urn:l">a &amp; b<!--note- --></label>"#
        );
    }

    #[test]
    fn test_empty_dynamic_name_falls_back_to_type() {
        let value = Labelled {
            name: Name::default(),
            label: String::new(),
            comment: String::new(),
        };
        assert_eq!(encode(&value).unwrap(), "<Labelled></Labelled>");
    }

    #[test]
    fn test_bad_comment() {
        let value = Labelled {
            name: Name::default(),
            label: String::new(),
            comment: "a--b".into(),
        };
        assert!(matches!(encode(&value).unwrap_err(), Error::InvalidComment));
    }
}
