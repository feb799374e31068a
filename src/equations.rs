//! Length equations for a pattern tree: one count variable per quantified
//! node, one indicator per alternative, and a fragment summing the characters
//! each leaf contributes.

use std::collections::HashMap;
use std::fmt;

use log::debug;

use crate::diophantine::LinearEquation;
use crate::error::EquationError;
use crate::regex::ast::{Bounds, GroupKind, NodeId, QuantifierKind, Tree};
use crate::regex::leaf::LeafToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variable {
    /// Repetition count of a quantified node, with its bounds.
    Count { index: usize, bounds: Bounds },
    /// 1 when the alternative is taken, 0 otherwise.
    Choice { index: usize },
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Variable::Choice { index } => write!(f, "{{b{index}}}"),
            Variable::Count { index, bounds } => {
                let min = if bounds.min > 0 {
                    bounds.min.to_string()
                } else {
                    String::new()
                };
                let max = bounds.max.map(|m| m.to_string()).unwrap_or_default();
                if min.is_empty() && max.is_empty() {
                    write!(f, "{{x{index}}}")
                } else if min == max {
                    write!(f, "{{x{index}:{min}}}")
                } else {
                    write!(f, "{{x{index}:{min},{max}}}")
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub coefficient: usize,
    pub variables: Vec<Variable>,
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.coefficient)?;
        for var in &self.variables {
            write!(f, "*{var}")?;
        }
        Ok(())
    }
}

/// Sum of terms; the empty fragment is 0.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fragment {
    pub terms: Vec<Term>,
}

impl Fragment {
    pub fn constant(n: usize) -> Self {
        let terms = if n == 0 {
            Vec::new()
        } else {
            vec![Term {
                coefficient: n,
                variables: Vec::new(),
            }]
        };
        Self { terms }
    }

    pub fn multiply(&mut self, var: Variable) {
        for term in &mut self.terms {
            term.variables.push(var);
        }
    }

    pub fn extend(&mut self, other: Fragment) {
        self.terms.extend(other.terms);
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return write!(f, "0");
        }
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                write!(f, "+")?;
            }
            write!(f, "{term}")?;
        }
        Ok(())
    }
}

/// The indicators of one alternation slot sum to 1, or to at most 1 when the
/// slot sits inside another alternative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub choices: Vec<Variable>,
    pub exact: bool,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, var) in self.choices.iter().enumerate() {
            if i > 0 {
                write!(f, "+")?;
            }
            write!(f, "{var}")?;
        }
        write!(f, "{}", if self.exact { "==1" } else { "<=1" })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquationSystem {
    pub fragment: Fragment,
    pub input_len: usize,
    pub constraints: Vec<Constraint>,
    variables: Vec<(Variable, NodeId)>,
}

impl EquationSystem {
    /// Variables in the order they were introduced, with the node each one
    /// belongs to.
    pub fn variables(&self) -> &[(Variable, NodeId)] {
        &self.variables
    }

    pub fn node_of(&self, var: Variable) -> Option<NodeId> {
        self.variables
            .iter()
            .find(|(v, _)| *v == var)
            .map(|&(_, id)| id)
    }

    /// The length equation with every distinct variable product taken as one
    /// unknown and constants moved to the right-hand side.
    pub fn to_linear(&self) -> Result<LinearEquation, EquationError> {
        let mut eq = LinearEquation::new(to_i64(self.input_len)?);
        for term in &self.fragment.terms {
            let coefficient = to_i64(term.coefficient)?;
            if term.variables.is_empty() {
                eq.rhs = eq.rhs.checked_sub(coefficient).ok_or(EquationError::Overflow)?;
                continue;
            }
            let name = term
                .variables
                .iter()
                .map(Variable::to_string)
                .collect::<Vec<_>>()
                .join("*");
            eq.add_term(coefficient, &name)?;
        }
        Ok(eq)
    }
}

fn to_i64(n: usize) -> Result<i64, EquationError> {
    i64::try_from(n).map_err(|_| EquationError::Overflow)
}

impl fmt::Display for EquationSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.fragment, self.input_len)?;
        for constraint in &self.constraints {
            write!(f, ";{constraint}")?;
        }
        Ok(())
    }
}

/// Builds the length equation of `tree` against an input of `input_len`
/// characters. Variables are numbered in post-order.
pub fn generate(tree: &Tree<'_>, input_len: usize) -> EquationSystem {
    let mut generator = Generator {
        tree,
        counts: 0,
        choices: 0,
        captured: HashMap::new(),
        variables: Vec::new(),
        constraints: Vec::new(),
    };
    let fragment = generator.fragment(tree.root());
    debug!(
        "{} count and {} choice variables for {:?}",
        generator.counts,
        generator.choices,
        tree.pattern()
    );
    EquationSystem {
        fragment,
        input_len,
        constraints: generator.constraints,
        variables: generator.variables,
    }
}

struct Generator<'t, 'p> {
    tree: &'t Tree<'p>,
    counts: usize,
    choices: usize,
    captured: HashMap<usize, Fragment>,
    variables: Vec<(Variable, NodeId)>,
    constraints: Vec<Constraint>,
}

impl Generator<'_, '_> {
    fn fragment(&mut self, id: NodeId) -> Fragment {
        let tree = self.tree;
        let node = tree.node(id);
        let mut fragment = if node.is_leaf() {
            self.leaf_fragment(id)
        } else {
            let mut sum = Fragment::default();
            for slot in tree.slots(id) {
                if let [only] = slot[..] {
                    sum.extend(self.fragment(only));
                    continue;
                }
                let mut choices = Vec::with_capacity(slot.len());
                for member in slot {
                    let mut part = self.fragment(member);
                    let choice = Variable::Choice {
                        index: self.choices,
                    };
                    self.choices += 1;
                    self.variables.push((choice, member));
                    part.multiply(choice);
                    sum.extend(part);
                    choices.push(choice);
                }
                self.constraints.push(Constraint {
                    choices,
                    exact: !self.inside_alternative(id),
                });
            }
            sum
        };

        if node.group == GroupKind::Capture {
            if let Some(k) = node.capture_id {
                self.captured.insert(k, fragment.clone());
            }
        }
        if node.quantifier != QuantifierKind::ExactlyOne {
            let var = Variable::Count {
                index: self.counts,
                bounds: node.bounds,
            };
            self.counts += 1;
            self.variables.push((var, id));
            fragment.multiply(var);
        }
        fragment
    }

    fn leaf_fragment(&self, id: NodeId) -> Fragment {
        let node = self.tree.node(id);
        match node.group {
            GroupKind::Empty | GroupKind::Invalid(_) => Fragment::default(),
            // Only groups closed before the reference have a known length.
            GroupKind::Backreference => node
                .capture_id
                .and_then(|k| self.captured.get(&k).cloned())
                .unwrap_or_default(),
            _ => LeafToken::compile(self.tree.text(id))
                .map(|token| Fragment::constant(token.width()))
                .unwrap_or_default(),
        }
    }

    /// Is `id`, or any node above it, one member of a multi-member slot?
    fn inside_alternative(&self, id: NodeId) -> bool {
        let mut cursor = id;
        while let Some(parent) = self.tree.node(cursor).parent {
            let shared = self
                .tree
                .slots(parent)
                .iter()
                .any(|slot| slot.len() > 1 && slot.contains(&cursor));
            if shared {
                return true;
            }
            cursor = parent;
        }
        false
    }
}
