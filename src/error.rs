use std::process::ExitStatus;

use thiserror::Error;

use crate::regex::ast::{Invalid, NodeId, Span};

/// An invalid node found by [`Tree::validate`](crate::regex::Tree::validate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{kind} at {span}")]
pub struct ParseError {
    pub node: NodeId,
    pub span: Span,
    pub kind: Invalid,
}

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("pattern is invalid: {0}")]
    InvalidPattern(#[from] ParseError),
    #[error("tree has not been prepared for matching")]
    Unprepared,
    #[error("gave up after {limit} search steps")]
    StepLimit { limit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EquationError {
    #[error("equation has no '='")]
    MissingEquals,
    #[error("malformed term '{0}'")]
    Term(String),
    #[error("malformed right-hand side '{0}'")]
    Rhs(String),
    #[error("coefficient arithmetic overflowed")]
    Overflow,
}

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("failed to run solver: {0}")]
    Io(#[from] std::io::Error),
    #[error("solver exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },
}
