//! Namespace scoping for elements being encoded.

use rustc_hash::FxHashMap;

use crate::constants::RESERVED_BINDINGS;

/// Tracks namespace bindings while encoding.
///
/// Each element gets its own context whose parent is the context of the
/// enclosing element. Bindings are namespace URI -> prefix, the direction
/// an encoder needs. A binding written into a context is visible to that
/// context and its descendants only; ancestors and siblings never see it.
#[derive(Debug)]
pub struct NsContext<'p> {
    /// Namespace URI of the element this context belongs to.
    xmlns: String,
    /// Bindings introduced by this element.
    prefixes: FxHashMap<String, String>,
    /// Context of the enclosing element, `None` for a root.
    parent: Option<&'p NsContext<'p>>,
}

impl Default for NsContext<'static> {
    fn default() -> Self {
        Self::root()
    }
}

impl NsContext<'static> {
    /// Creates a root context with the reserved `xml` and `xmlns` prefixes bound.
    pub fn root() -> Self {
        let mut ctx = NsContext {
            xmlns: String::new(),
            prefixes: FxHashMap::default(),
            parent: None,
        };
        for (uri, prefix) in RESERVED_BINDINGS {
            ctx.bind(uri, prefix);
        }
        ctx
    }
}

impl<'p> NsContext<'p> {
    /// Creates an empty context inheriting from this one.
    pub fn child(&self) -> NsContext<'_> {
        NsContext {
            xmlns: String::new(),
            prefixes: FxHashMap::default(),
            parent: Some(self),
        }
    }

    /// Binds a namespace URI to a prefix in this context.
    ///
    /// Only called on the context of the element being opened.
    pub fn bind(&mut self, uri: &str, prefix: &str) {
        self.prefixes.insert(uri.to_string(), prefix.to_string());
    }

    /// Resolves a namespace URI to its prefix, searching from this context outward.
    pub fn lookup(&self, uri: &str) -> Option<&str> {
        let mut ctx = self;
        loop {
            if let Some(prefix) = ctx.prefixes.get(uri) {
                return Some(prefix.as_str());
            }
            ctx = ctx.parent?;
        }
    }

    /// Namespace of the element this context belongs to.
    pub fn xmlns(&self) -> &str {
        &self.xmlns
    }

    /// Sets the namespace of the element this context belongs to.
    pub fn set_xmlns(&mut self, uri: &str) {
        if self.xmlns != uri {
            self.xmlns.clear();
            self.xmlns.push_str(uri);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{XMLNS_NS, XML_NS};

    #[test]
    fn test_reserved_prefixes_bound() {
        let root = NsContext::root();
        assert_eq!(root.lookup(XML_NS), Some("xml"));
        assert_eq!(root.lookup(XMLNS_NS), Some("xmlns"));
    }

    #[test]
    fn test_unknown_namespace() {
        let root = NsContext::root();
        let child = root.child();
        assert_eq!(child.lookup("urn:nowhere"), None);
    }

    #[test]
    fn test_scope_inheritance() {
        let root = NsContext::root();
        let mut a = root.child();
        a.bind("http://example.com/a", "a");

        let mut b = a.child();
        b.bind("http://example.com/b", "b");

        // Both should be visible from the inner scope
        assert_eq!(b.lookup("http://example.com/a"), Some("a"));
        assert_eq!(b.lookup("http://example.com/b"), Some("b"));
        assert_eq!(b.lookup(XML_NS), Some("xml"));
        assert!(b.prefixes.get("http://example.com/a").is_none());

        // The outer scope never sees the inner binding
        assert_eq!(a.lookup("http://example.com/b"), None);
        assert_eq!(root.lookup("http://example.com/a"), None);
    }

    #[test]
    fn test_siblings_isolated() {
        let root = NsContext::root();
        let parent = root.child();

        let mut first = parent.child();
        first.bind("urn:x", "");
        let second = parent.child();

        assert_eq!(first.lookup("urn:x"), Some(""));
        assert_eq!(second.lookup("urn:x"), None);
    }

    #[test]
    fn test_child_shadows_parent() {
        let root = NsContext::root();
        let mut parent = root.child();
        parent.bind("urn:x", "p");
        let mut child = parent.child();
        child.bind("urn:x", "c");

        assert_eq!(child.lookup("urn:x"), Some("c"));
        assert_eq!(parent.lookup("urn:x"), Some("p"));
    }

    #[test]
    fn test_xmlns_is_per_context() {
        let root = NsContext::root();
        let mut child = root.child();
        child.set_xmlns("urn:x");
        let grandchild = child.child();

        assert_eq!(child.xmlns(), "urn:x");
        assert_eq!(grandchild.xmlns(), "");
    }
}
