//! Synthetic parent elements for nested field paths.

use std::io::Write;

use super::printer::Printer;

/// The chain of synthetic elements currently open inside one struct body.
///
/// Consecutive fields whose paths share a prefix share the elements for
/// that prefix: moving to the next field only closes what diverges and
/// opens what is new.
#[derive(Debug, Default)]
pub(crate) struct ParentStack {
    stack: Vec<&'static str>,
}

impl ParentStack {
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Keeps the longest common prefix of the open elements and `parents`,
    /// writing a close tag for every element dropped. An empty `parents`
    /// closes everything.
    pub fn trim<W: Write>(&mut self, p: &mut Printer<W>, parents: &[&'static str]) {
        let split = self
            .stack
            .iter()
            .zip(parents)
            .take_while(|(open, wanted)| open == wanted)
            .count();
        for name in self.stack[split..].iter().rev() {
            log::trace!("closing synthetic parent <{name}>");
            p.write_indent(-1);
            p.write_str("</");
            p.write_str(name);
            p.write_str(">");
        }
        self.stack.truncate(split);
    }

    /// Opens `parents` below the currently open elements.
    pub fn push<W: Write>(&mut self, p: &mut Printer<W>, parents: &[&'static str]) {
        for name in parents {
            log::trace!("opening synthetic parent <{name}>");
            p.write_indent(1);
            p.write_str("<");
            p.write_str(name);
            p.write_str(">");
        }
        self.stack.extend_from_slice(parents);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::printer::EncoderOptions;

    fn run(paths: &[&[&'static str]]) -> String {
        let mut p = Printer::new(Vec::new(), EncoderOptions::default());
        let mut s = ParentStack::default();
        for path in paths {
            s.trim(&mut p, path);
            if path.len() > s.len() {
                s.push(&mut p, &path[s.len()..]);
            }
            p.write_str("x");
        }
        s.trim(&mut p, &[]);
        assert_eq!(s.len(), 0);
        String::from_utf8(p.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_shared_prefix_is_reused() {
        assert_eq!(
            run(&[&["a", "b"], &["a", "b"], &["a", "c"]]),
            "<a><b>xx</b><c>x</c></a>"
        );
    }

    #[test]
    fn test_diverging_paths() {
        assert_eq!(run(&[&["a"], &["b"], &[]]), "<a>x</a><b>x</b>x");
    }

    #[test]
    fn test_deeper_then_shallower() {
        assert_eq!(
            run(&[&["a", "b", "c"], &["a"]]),
            "<a><b><c>x</c></b>x</a>"
        );
    }
}
