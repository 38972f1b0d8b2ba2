//! XML escaping utilities.

use std::borrow::Cow;
use std::io::{self, Write};

/// Returns the replacement for `c`, or `None` if it passes through unchanged.
fn entity(c: char) -> Option<&'static str> {
    match c {
        '&' => Some("&amp;"),
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '"' => Some("&quot;"),
        '\'' => Some("&apos;"),
        '\t' => Some("&#x9;"),
        '\n' => Some("&#xA;"),
        '\r' => Some("&#xD;"),
        c if !is_xml_char(c) => Some("\u{FFFD}"),
        _ => None,
    }
}

/// Whether `c` is in the XML 1.0 `Char` production.
fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n'
            | '\r'
            | '\u{20}'..='\u{D7FF}'
            | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}'
    )
}

/// Writes `raw` to `w` with XML special characters escaped.
///
/// Quotes are escaped too, so the output is safe both as character data and
/// inside a double-quoted attribute value. Invalid UTF-8 and characters not
/// allowed in XML are replaced with U+FFFD.
pub fn escape<W: Write + ?Sized>(w: &mut W, raw: &[u8]) -> io::Result<()> {
    let text = String::from_utf8_lossy(raw);
    let mut last = 0;
    for (i, c) in text.char_indices() {
        if let Some(replacement) = entity(c) {
            w.write_all(text[last..i].as_bytes())?;
            w.write_all(replacement.as_bytes())?;
            last = i + c.len_utf8();
        }
    }
    w.write_all(text[last..].as_bytes())
}

/// Escapes a string, borrowing it when nothing needs replacing.
pub fn escape_str(s: &str) -> Cow<'_, str> {
    if !s.chars().any(|c| entity(c).is_some()) {
        return Cow::Borrowed(s);
    }
    let mut result = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match entity(c) {
            Some(replacement) => result.push_str(replacement),
            None => result.push(c),
        }
    }
    Cow::Owned(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn escaped(raw: &[u8]) -> String {
        let mut buf = Vec::new();
        escape(&mut buf, raw).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_escapes_markup() {
        assert_eq!(escaped(b"a < b && c > d"), "a &lt; b &amp;&amp; c &gt; d");
    }

    #[test]
    fn test_escapes_quotes() {
        assert_eq!(escaped(br#"say "hi" 'there'"#), "say &quot;hi&quot; &apos;there&apos;");
    }

    #[test]
    fn test_escapes_whitespace_controls() {
        assert_eq!(escaped(b"a\tb\nc\rd"), "a&#x9;b&#xA;c&#xD;d");
    }

    #[test]
    fn test_replaces_restricted_chars() {
        assert_eq!(escaped(b"a\x00b\x1fc"), "a\u{FFFD}b\u{FFFD}c");
        assert_eq!(escaped("\u{FFFE}".as_bytes()), "\u{FFFD}");
    }

    #[test]
    fn test_replaces_invalid_utf8() {
        assert_eq!(escaped(b"ok\xffok"), "ok\u{FFFD}ok");
    }

    #[test]
    fn test_passthrough() {
        assert_eq!(escaped("héllo wörld 123 \u{1F600}".as_bytes()), "héllo wörld 123 \u{1F600}");
        assert!(matches!(escape_str("plain"), Cow::Borrowed("plain")));
    }

    #[test]
    fn test_escape_str() {
        assert_eq!(escape_str("<a href=\"x\">"), "&lt;a href=&quot;x&quot;&gt;");
    }
}
