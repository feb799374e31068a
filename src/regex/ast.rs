use std::fmt;

use crate::error::ParseError;

/// Handle of a node inside a [`Tree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Byte range into the pattern text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn empty(at: usize) -> Self {
        Self { start: at, end: at }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GroupError {
    #[error("unmatched parenthesis")]
    UnmatchedGroup,
    #[error("group cannot start with '{0}'")]
    InvalidStart(char),
    #[error("unmatched bracket")]
    UnmatchedBracket,
    #[error("unterminated bracket class at {0}")]
    UnmatchedBracketInner(Span),
    #[error("unknown character class at {0}")]
    InvalidClass(Span),
    #[error("invalid range at {0}")]
    InvalidRange(Span),
    #[error("invalid collating element at {0}")]
    InvalidCollation(Span),
    #[error("invalid equivalence class at {0}")]
    InvalidEquivalence(Span),
    #[error("invalid hex escape at {0}")]
    InvalidHex(Span),
    #[error("invalid escape at {0}")]
    InvalidEscape(Span),
    #[error("backreference \\{id} refers to an unassigned group ({assigned} assigned)")]
    InvalidBackreference { id: usize, assigned: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    Empty,
    Implicit,
    Capture,
    NonCapture,
    Bracket,
    NegatedBracket,
    Backreference,
    Invalid(GroupError),
}

impl GroupKind {
    pub fn is_valid(self) -> bool {
        !matches!(self, GroupKind::Invalid(_))
    }

    /// Parenthesized forms whose content gets parsed recursively.
    pub fn is_wrapped(self) -> bool {
        matches!(self, GroupKind::Capture | GroupKind::NonCapture)
    }

    pub fn is_bracketed(self) -> bool {
        matches!(self, GroupKind::Bracket | GroupKind::NegatedBracket)
    }

    pub fn label(self) -> &'static str {
        match self {
            GroupKind::Empty => "empty",
            GroupKind::Implicit => "implicit",
            GroupKind::Capture => "capture",
            GroupKind::NonCapture => "noncapture",
            GroupKind::Bracket => "bracket",
            GroupKind::NegatedBracket => "bracket-negated",
            GroupKind::Backreference => "backreference",
            GroupKind::Invalid(_) => "invalid",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QuantifierError {
    #[error("unmatched '{{'")]
    Unmatched,
    #[error("repetition must contain only digits and ','")]
    NonNumeric,
    #[error("repetition has more than one ','")]
    MultipleSeparators,
    #[error("repetition has no bounds")]
    MissingBounds,
    #[error("repetition bound is too large")]
    OutOfRange,
    #[error("upper bound {max} is not greater than lower bound {min}")]
    UpperNotAboveLower { min: usize, max: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantifierKind {
    ExactlyOne,
    ZeroOrOne,
    ZeroOrMore,
    OneOrMore,
    Exactly(usize),
    AtLeast(usize),
    AtMost(usize),
    Between(usize, usize),
    Invalid(QuantifierError),
}

impl QuantifierKind {
    pub fn is_valid(self) -> bool {
        !matches!(self, QuantifierKind::Invalid(_))
    }

    /// Resolved `(n, m)` repetition bounds; `None` for invalid quantifiers.
    pub fn bounds(self) -> Option<Bounds> {
        let (min, max) = match self {
            QuantifierKind::ExactlyOne => (1, Some(1)),
            QuantifierKind::ZeroOrOne => (0, Some(1)),
            QuantifierKind::ZeroOrMore => (0, None),
            QuantifierKind::OneOrMore => (1, None),
            QuantifierKind::Exactly(n) => (n, Some(n)),
            QuantifierKind::AtLeast(n) => (n, None),
            QuantifierKind::AtMost(m) => (0, Some(m)),
            QuantifierKind::Between(n, m) => (n, Some(m)),
            QuantifierKind::Invalid(_) => return None,
        };
        Some(Bounds { min, max })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("alternation has an empty right-hand side")]
    EmptyAlternative,
}

/// Relation of a node to its preceding sibling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    None,
    Concatenation,
    Alternation,
    Invalid(LinkError),
}

impl LinkKind {
    pub fn is_valid(self) -> bool {
        !matches!(self, LinkKind::Invalid(_))
    }
}

/// Repetition bounds; `max == None` means no upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min: usize,
    pub max: Option<usize>,
}

impl Bounds {
    pub const ONE: Bounds = Bounds { min: 1, max: Some(1) };
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "[{}, {}]", self.min, max),
            None => write!(f, "[{}, inf)", self.min),
        }
    }
}

/// Any of the in-band failure markers a node can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Invalid {
    #[error(transparent)]
    Group(GroupError),
    #[error(transparent)]
    Quantifier(QuantifierError),
    #[error(transparent)]
    Link(LinkError),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub group: GroupKind,
    pub quantifier: QuantifierKind,
    pub link: LinkKind,
    pub bounds: Bounds,
    /// Own id for capturing groups, referenced id for backreferences.
    pub capture_id: Option<usize>,
    /// Leaf token, or the unwrapped content of an internal node.
    pub span: Span,
    /// The group as written, parentheses included.
    pub group_span: Span,
    pub quantifier_span: Span,
    /// The `|` in front of this node, if any.
    pub link_span: Span,
    pub depth: usize,
    pub sibling_index: usize,
    pub active: bool,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl Node {
    pub(crate) fn new(group: GroupKind, span: Span) -> Self {
        Self {
            group,
            quantifier: QuantifierKind::ExactlyOne,
            link: LinkKind::None,
            bounds: Bounds::ONE,
            capture_id: None,
            span,
            group_span: span,
            quantifier_span: Span::empty(span.end),
            link_span: Span::empty(span.start),
            depth: 0,
            sibling_index: 0,
            active: true,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// First invalid marker on this node, group before quantifier before link.
    pub fn invalid(&self) -> Option<(Invalid, Span)> {
        if let GroupKind::Invalid(e) = self.group {
            return Some((Invalid::Group(e), self.group_span));
        }
        if let QuantifierKind::Invalid(e) = self.quantifier {
            return Some((Invalid::Quantifier(e), self.quantifier_span));
        }
        if let LinkKind::Invalid(e) = self.link {
            return Some((Invalid::Link(e), self.link_span));
        }
        None
    }
}

/// Parsed pattern: an arena of nodes borrowing the pattern text.
#[derive(Debug, Clone)]
pub struct Tree<'p> {
    pattern: &'p str,
    nodes: Vec<Node>,
    root: NodeId,
    captures: usize,
    annotated: bool,
}

impl<'p> Tree<'p> {
    pub(crate) fn new(pattern: &'p str) -> Self {
        Self {
            pattern,
            nodes: Vec::new(),
            root: NodeId(0),
            captures: 0,
            annotated: false,
        }
    }

    pub(crate) fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId) {
        let index = self.nodes[parent.0].children.len();
        let node = &mut self.nodes[child.0];
        node.parent = Some(parent);
        node.sibling_index = index;
        self.nodes[parent.0].children.push(child);
    }

    pub(crate) fn set_root(&mut self, root: NodeId, captures: usize) {
        self.root = root;
        self.captures = captures;
    }

    pub(crate) fn set_annotated(&mut self) {
        self.annotated = true;
    }

    pub fn pattern(&self) -> &'p str {
        self.pattern
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of capture ids handed out while parsing.
    pub fn capture_count(&self) -> usize {
        self.captures
    }

    /// Whether depths and activity have been computed.
    pub fn is_annotated(&self) -> bool {
        self.annotated
    }

    pub fn text(&self, id: NodeId) -> &'p str {
        self.node(id).span.slice(self.pattern)
    }

    pub fn group_text(&self, id: NodeId) -> &'p str {
        self.node(id).group_span.slice(self.pattern)
    }

    pub fn quantifier_text(&self, id: NodeId) -> &'p str {
        self.node(id).quantifier_span.slice(self.pattern)
    }

    pub fn link_text(&self, id: NodeId) -> &'p str {
        self.node(id).link_span.slice(self.pattern)
    }

    /// All nodes reachable from the root, parents before children.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.node(id).children.iter().rev().copied());
        }
        order
    }

    pub fn leaves(&self) -> Vec<NodeId> {
        self.preorder()
            .into_iter()
            .filter(|&id| self.node(id).is_leaf())
            .collect()
    }

    /// Children of `id` partitioned by the grouping rule.
    pub fn slots(&self, id: NodeId) -> Vec<Vec<NodeId>> {
        group_siblings(self, &self.node(id).children)
    }

    /// Product of the lower bounds of `id` and all of its ancestors.
    pub fn floor(&self, id: NodeId) -> usize {
        let mut floor = 1usize;
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = self.node(current);
            floor = floor.saturating_mul(node.bounds.min);
            cursor = node.parent;
        }
        floor
    }

    pub fn invalid_nodes(&self) -> Vec<ParseError> {
        self.preorder()
            .into_iter()
            .filter_map(|id| {
                self.node(id)
                    .invalid()
                    .map(|(kind, span)| ParseError { node: id, span, kind })
            })
            .collect()
    }

    /// Fails with the first invalid node in pre-order.
    pub fn validate(&self) -> Result<(), ParseError> {
        match self.invalid_nodes().into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Splits an ordered sibling list into slots: alternation-linked runs share a
/// slot, everything else starts a new one.
pub fn group_siblings(tree: &Tree<'_>, siblings: &[NodeId]) -> Vec<Vec<NodeId>> {
    let mut slots: Vec<Vec<NodeId>> = Vec::new();
    for &id in siblings {
        match (tree.node(id).link, slots.last_mut()) {
            (LinkKind::Alternation, Some(slot)) => slot.push(id),
            _ => slots.push(vec![id]),
        }
    }
    slots
}
