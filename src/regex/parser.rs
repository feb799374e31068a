use log::debug;

use crate::error::ParseError;
use crate::regex::ast::{Bounds, GroupKind, LinkKind, Node, NodeId, QuantifierKind, Span, Tree};
use crate::regex::classify::{QuantifierScan, scan_group, scan_link, scan_quantifier};

/// Builds the pattern tree. Invalid syntax never aborts the parse: it is
/// recorded on the node being built, see [`Tree::validate`].
pub fn parse(pattern: &str) -> Tree<'_> {
    let mut builder = Builder {
        tree: Tree::new(pattern),
    };
    let mut captures = 0;
    let root = builder.parse_span(Span::new(0, pattern.len()), &mut captures);
    builder.tree.set_root(root, captures);
    debug!(
        "parsed {pattern:?} into {} nodes, {captures} capture groups",
        builder.tree.len()
    );
    builder.tree
}

/// [`parse`], rejecting trees that contain an invalid node.
pub fn compile(pattern: &str) -> Result<Tree<'_>, ParseError> {
    let tree = parse(pattern);
    tree.validate()?;
    Ok(tree)
}

struct Builder<'p> {
    tree: Tree<'p>,
}

impl<'p> Builder<'p> {
    fn text(&self, span: Span) -> &'p str {
        span.slice(self.tree.pattern())
    }

    fn parse_span(&mut self, span: Span, captures: &mut usize) -> NodeId {
        let text = self.text(span);
        let head = scan_group(text, span.start, *captures);

        if head.kind == GroupKind::Empty {
            return self.tree.push(Node::new(GroupKind::Empty, span));
        }
        if !head.kind.is_wrapped() && head.len == text.len() {
            let mut node = Node::new(head.kind, span);
            node.capture_id = head.capture_id;
            return self.tree.push(node);
        }
        if head.kind.is_wrapped() {
            let quantifier = scan_quantifier(&text[head.len..]);
            if head.len + quantifier.len == text.len() {
                let group_span = Span::new(span.start, span.start + head.len);
                return self.parse_wrapped(head.kind, group_span, quantifier, captures);
            }
        }

        let root = self.tree.push(Node::new(GroupKind::Implicit, span));
        let mut at = span.start;
        let mut link = LinkKind::None;
        let mut link_span = Span::empty(at);
        while at < span.end {
            let rest = self.text(Span::new(at, span.end));
            let scan = scan_group(rest, at, *captures);
            if scan.len == 0 {
                break;
            }
            let group_span = Span::new(at, at + scan.len);
            let after = &rest[scan.len..];
            let quantifier = scan_quantifier(after);
            let next = scan_link(&after[quantifier.len..]);

            let child = if scan.kind.is_wrapped() {
                self.parse_wrapped(scan.kind, group_span, quantifier, captures)
            } else {
                let mut node = Node::new(scan.kind, group_span);
                node.capture_id = scan.capture_id;
                let id = self.tree.push(node);
                self.quantify(id, quantifier, group_span.end);
                id
            };
            let node = self.tree.node_mut(child);
            node.link = link;
            node.link_span = link_span;
            self.tree.attach(root, child);

            let link_at = group_span.end + quantifier.len;
            link_span = Span::new(link_at, link_at + next.len);
            at = link_span.end;
            link = next.kind;

            if let LinkKind::Invalid(_) = next.kind {
                // Trailing `|`: the missing right-hand side becomes an empty
                // leaf carrying the marker.
                let mut empty = Node::new(GroupKind::Empty, Span::empty(span.end));
                empty.link = next.kind;
                empty.link_span = link_span;
                let id = self.tree.push(empty);
                self.tree.attach(root, id);
                break;
            }
        }
        root
    }

    fn parse_wrapped(
        &mut self,
        kind: GroupKind,
        group_span: Span,
        quantifier: QuantifierScan,
        captures: &mut usize,
    ) -> NodeId {
        let capture_id = (kind == GroupKind::Capture).then(|| {
            *captures += 1;
            *captures
        });
        let open = if kind == GroupKind::NonCapture { 3 } else { 1 };
        let inner = Span::new(group_span.start + open, group_span.end - 1);
        let child = self.parse_span(inner, captures);

        // Stamp the group onto the parsed content unless that would erase a
        // classification the content already has.
        let id = if self.is_plain(child) {
            child
        } else {
            let wrapper = self.tree.push(Node::new(GroupKind::Implicit, inner));
            self.tree.attach(wrapper, child);
            wrapper
        };
        let node = self.tree.node_mut(id);
        node.group = kind;
        node.capture_id = capture_id;
        node.span = inner;
        node.group_span = group_span;
        self.quantify(id, quantifier, group_span.end);
        id
    }

    fn is_plain(&self, id: NodeId) -> bool {
        let node = self.tree.node(id);
        matches!(node.group, GroupKind::Implicit | GroupKind::Empty)
            && node.quantifier == QuantifierKind::ExactlyOne
            && node.capture_id.is_none()
    }

    fn quantify(&mut self, id: NodeId, quantifier: QuantifierScan, at: usize) {
        let node = self.tree.node_mut(id);
        node.quantifier = quantifier.kind;
        node.quantifier_span = Span::new(at, at + quantifier.len);
        node.bounds = quantifier.kind.bounds().unwrap_or(Bounds::ONE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regex::ast::{GroupError, Invalid, LinkError, QuantifierError};

    fn texts<'p>(tree: &Tree<'p>, id: NodeId) -> Vec<&'p str> {
        tree.node(id)
            .children
            .iter()
            .map(|&child| tree.text(child))
            .collect()
    }

    #[test]
    fn single_literal_run_is_a_leaf() {
        let tree = parse("abc");
        let root = tree.node(tree.root());
        assert!(root.is_leaf());
        assert_eq!(root.group, GroupKind::Implicit);
        assert_eq!(tree.text(tree.root()), "abc");
    }

    #[test]
    fn quantifier_binds_to_last_atom() {
        let tree = parse("ab*");
        let root = tree.root();
        assert_eq!(texts(&tree, root), vec!["a", "b"]);
        let b = tree.node(tree.node(root).children[1]);
        assert_eq!(b.quantifier, QuantifierKind::ZeroOrMore);
        assert_eq!(b.bounds, Bounds { min: 0, max: None });
        assert_eq!(b.link, LinkKind::Concatenation);
    }

    #[test]
    fn alternation_is_an_edge_tag() {
        let tree = parse("ab|cd");
        let root = tree.root();
        assert_eq!(texts(&tree, root), vec!["ab", "cd"]);
        let children = &tree.node(root).children;
        assert_eq!(tree.node(children[0]).link, LinkKind::None);
        assert_eq!(tree.node(children[1]).link, LinkKind::Alternation);
        assert_eq!(tree.link_text(children[1]), "|");
    }

    #[test]
    fn whole_wrapped_group_becomes_the_root() {
        let tree = parse("(ab){2,3}");
        let root = tree.node(tree.root());
        assert!(root.is_leaf());
        assert_eq!(root.group, GroupKind::Capture);
        assert_eq!(root.capture_id, Some(1));
        assert_eq!(root.quantifier, QuantifierKind::Between(2, 3));
        assert_eq!(tree.text(tree.root()), "ab");
        assert_eq!(tree.group_text(tree.root()), "(ab)");
        assert_eq!(tree.quantifier_text(tree.root()), "{2,3}");
    }

    #[test]
    fn groups_inside_a_sequence() {
        let tree = parse("x(ab){2,3}y");
        let root = tree.root();
        assert_eq!(texts(&tree, root), vec!["x", "ab", "y"]);
        let group = tree.node(tree.node(root).children[1]);
        assert_eq!(group.group, GroupKind::Capture);
        assert_eq!(group.bounds, Bounds { min: 2, max: Some(3) });
    }

    #[test]
    fn capture_ids_follow_opening_order() {
        let tree = parse("(a)(b(c))(?:d)");
        let root = tree.root();
        let children = tree.node(root).children.clone();
        assert_eq!(tree.node(children[0]).capture_id, Some(1));
        assert_eq!(tree.node(children[1]).capture_id, Some(2));
        let inner = tree.node(children[1]).children[1];
        assert_eq!(tree.node(inner).capture_id, Some(3));
        assert_eq!(tree.node(children[2]).group, GroupKind::NonCapture);
        assert_eq!(tree.node(children[2]).capture_id, None);
        assert_eq!(tree.capture_count(), 3);
    }

    #[test]
    fn nested_quantified_group_gets_a_wrapper() {
        let tree = parse("((a)*)");
        let root = tree.node(tree.root());
        assert_eq!(root.capture_id, Some(1));
        assert_eq!(root.children.len(), 1);
        let inner = tree.node(root.children[0]);
        assert_eq!(inner.capture_id, Some(2));
        assert_eq!(inner.quantifier, QuantifierKind::ZeroOrMore);
    }

    #[test]
    fn backreferences_see_earlier_captures_only() {
        let tree = parse(r"(a)\1");
        assert!(tree.validate().is_ok());
        let backref = tree.node(tree.node(tree.root()).children[1]);
        assert_eq!(backref.group, GroupKind::Backreference);
        assert_eq!(backref.capture_id, Some(1));

        let err = compile(r"\1(a)").unwrap_err();
        assert_eq!(
            err.kind,
            Invalid::Group(GroupError::InvalidBackreference { id: 1, assigned: 0 })
        );
    }

    #[test]
    fn inverted_bounds_stay_in_the_tree() {
        let tree = parse("a{3,1}");
        let child = tree.node(tree.root()).children[0];
        assert_eq!(
            tree.node(child).quantifier,
            QuantifierKind::Invalid(QuantifierError::UpperNotAboveLower { min: 3, max: 1 })
        );
        let err = tree.validate().unwrap_err();
        assert_eq!(err.node, child);
        assert_eq!(err.span, Span::new(1, 6));
    }

    #[test]
    fn trailing_alternation_marks_an_empty_leaf() {
        let tree = parse("a|");
        let children = &tree.node(tree.root()).children;
        assert_eq!(children.len(), 2);
        let empty = tree.node(children[1]);
        assert_eq!(empty.group, GroupKind::Empty);
        assert_eq!(empty.link, LinkKind::Invalid(LinkError::EmptyAlternative));
        assert_eq!(
            tree.validate().unwrap_err().kind,
            Invalid::Link(LinkError::EmptyAlternative)
        );
    }

    #[test]
    fn unmatched_group_is_recorded() {
        let err = compile("a(bc").unwrap_err();
        assert_eq!(err.kind, Invalid::Group(GroupError::UnmatchedGroup));
        assert_eq!(err.span, Span::new(1, 4));
    }

    #[test]
    fn leading_quantifier_is_an_invalid_start() {
        let err = compile("*a").unwrap_err();
        assert_eq!(err.kind, Invalid::Group(GroupError::InvalidStart('*')));
    }

    #[test]
    fn empty_pattern_and_empty_group() {
        assert_eq!(parse("").node(NodeId(0)).group, GroupKind::Empty);
        let tree = parse("a()");
        let group = tree.node(tree.node(tree.root()).children[1]);
        assert_eq!(group.group, GroupKind::Capture);
        assert!(group.is_leaf());
    }
}
