pub mod annotate;
pub mod ast;
pub mod bracket;
pub mod classify;
pub mod leaf;
pub mod matcher;
pub mod parser;

pub use annotate::prepare_for_matching;
pub use ast::{Bounds, GroupKind, LinkKind, Node, NodeId, QuantifierKind, Span, Tree};
pub use leaf::match_leaf;
pub use matcher::{Assignment, MatchOptions, Matcher, Repetition, match_all};
pub use parser::{compile, parse};
