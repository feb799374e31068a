//! Matching by enumeration: alternation is resolved by expanding the tree top
//! down ([`Search::match_down`]), repetition counts are chosen bottom up
//! ([`Search::match_up`]) and every complete choice is checked by rebuilding
//! the input from the chosen counts.

use std::ops::ControlFlow;

use itertools::Itertools;
use log::{debug, trace};

use crate::error::MatchError;
use crate::regex::ast::{GroupKind, NodeId, QuantifierKind, Tree};
use crate::regex::leaf::{Atom, LeafToken};

pub const DEFAULT_STEP_LIMIT: usize = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOptions {
    /// Maximum number of `match_down`/`match_up` calls plus the product
    /// tuples they try; `None` is unlimited.
    pub step_limit: Option<usize>,
    /// Stop after the first accepted assignment.
    pub first_only: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            step_limit: Some(DEFAULT_STEP_LIMIT),
            first_only: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Repetition {
    pub node: NodeId,
    pub count: usize,
}

/// One accepted choice of repetition counts, in the order they were chosen.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Assignment {
    pub repetitions: Vec<Repetition>,
}

impl Assignment {
    pub fn counts(&self) -> Vec<usize> {
        self.repetitions.iter().map(|r| r.count).collect()
    }
}

/// Every assignment of repetition counts that rebuilds `input` exactly. The
/// tree must have gone through
/// [`prepare_for_matching`](crate::regex::prepare_for_matching) for `input`.
pub fn match_all(tree: &Tree<'_>, input: &str) -> Result<Vec<Assignment>, MatchError> {
    Matcher::default().run(tree, input)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Matcher {
    options: MatchOptions,
}

impl Matcher {
    pub fn new(options: MatchOptions) -> Self {
        Self { options }
    }

    pub fn run(&self, tree: &Tree<'_>, input: &str) -> Result<Vec<Assignment>, MatchError> {
        tree.validate()?;
        if !tree.is_annotated() {
            return Err(MatchError::Unprepared);
        }

        let input: Vec<char> = input.chars().collect();
        let tokens: Vec<Option<LeafToken>> = (0..tree.len())
            .map(|i| compile_leaf(tree, NodeId(i)))
            .collect();
        let floors: Vec<usize> = (0..tree.len()).map(|i| tree.floor(NodeId(i))).collect();

        let mut search = Search {
            tree,
            input: &input,
            tokens: &tokens,
            floors: &floors,
            options: self.options,
            steps: 0,
            matches: Vec::new(),
        };
        if let ControlFlow::Break(Halt::OutOfSteps(limit)) = search.match_down(vec![tree.root()]) {
            return Err(MatchError::StepLimit { limit });
        }
        debug!(
            "{} assignment(s) for {:?} after {} steps",
            search.matches.len(),
            tree.pattern(),
            search.steps
        );
        Ok(search.matches)
    }
}

fn compile_leaf(tree: &Tree<'_>, id: NodeId) -> Option<LeafToken> {
    let node = tree.node(id);
    if !node.is_leaf() {
        return None;
    }
    match node.group {
        GroupKind::Backreference | GroupKind::Invalid(_) => None,
        GroupKind::Empty => Some(LeafToken::default()),
        _ => LeafToken::compile(tree.text(id)).ok(),
    }
}

enum Halt {
    Done,
    OutOfSteps(usize),
}

type Flow = ControlFlow<Halt>;

#[derive(Debug, Clone, Copy)]
enum Piece<'a> {
    Atom(&'a Atom),
    Open(usize),
    Close(usize),
    Backref(usize),
}

/// One repetition of a node, flattened once every choice beneath it has been
/// fixed.
#[derive(Debug, Clone)]
struct Unit<'a> {
    node: NodeId,
    pieces: Vec<Piece<'a>>,
    /// Characters consumed, backreferences excluded.
    width: usize,
    /// Contains a backreference, so the real width is only known at the end.
    variable: bool,
    /// Something beneath could not be placed; only zero repetitions remain.
    impossible: bool,
}

impl<'a> Unit<'a> {
    fn new(node: NodeId) -> Self {
        Self {
            node,
            pieces: Vec::new(),
            width: 0,
            variable: false,
            impossible: false,
        }
    }
}

struct Search<'a> {
    tree: &'a Tree<'a>,
    input: &'a [char],
    tokens: &'a [Option<LeafToken>],
    floors: &'a [usize],
    options: MatchOptions,
    steps: usize,
    matches: Vec<Assignment>,
}

impl<'a> Search<'a> {
    fn tick(&mut self) -> Flow {
        self.steps += 1;
        match self.options.step_limit {
            Some(limit) if self.steps > limit => ControlFlow::Break(Halt::OutOfSteps(limit)),
            _ => ControlFlow::Continue(()),
        }
    }

    /// Replaces every internal node of the frontier by one child per slot,
    /// trying each alternative; all-leaf frontiers go on to counting.
    fn match_down(&mut self, frontier: Vec<NodeId>) -> Flow {
        self.tick()?;
        if frontier.iter().all(|&id| self.tree.node(id).is_leaf()) {
            let units = frontier.iter().map(|&id| self.leaf_unit(id)).collect();
            return self.match_up(units, Vec::new());
        }

        let mut slots = Vec::new();
        for &id in &frontier {
            if self.tree.node(id).is_leaf() {
                slots.push(vec![id]);
                continue;
            }
            for slot in self.tree.slots(id) {
                let live: Vec<NodeId> = slot
                    .into_iter()
                    .filter(|&member| !self.is_dead(member))
                    .collect();
                if live.is_empty() {
                    trace!("no viable member under {:?}", self.tree.text(id));
                    return ControlFlow::Continue(());
                }
                slots.push(live);
            }
        }
        for next in slots.iter().map(|slot| slot.iter().copied()).multi_cartesian_product() {
            self.tick()?;
            self.match_down(next)?;
        }
        ControlFlow::Continue(())
    }

    /// Chooses counts for the deepest units, folds them into their parents
    /// and recurses one level up; at the root, checks the rebuilt input.
    fn match_up(&mut self, units: Vec<Unit<'a>>, counts: Vec<Repetition>) -> Flow {
        self.tick()?;
        if !self.feasible(&units) {
            return ControlFlow::Continue(());
        }
        let Some(depth) = units.iter().map(|u| self.tree.node(u.node).depth).max() else {
            return ControlFlow::Continue(());
        };

        let targets: Vec<usize> = (0..units.len())
            .filter(|&i| self.tree.node(units[i].node).depth == depth)
            .collect();
        let mut choices = Vec::with_capacity(targets.len());
        for &i in &targets {
            let options = self.count_choices(&units[i]);
            if options.is_empty() {
                trace!("no achievable count for {:?}", self.tree.text(units[i].node));
                return ControlFlow::Continue(());
            }
            choices.push(options);
        }

        for chosen in choices.iter().map(|c| c.iter().copied()).multi_cartesian_product() {
            self.tick()?;
            let mut next_counts = counts.clone();
            for (&i, &count) in targets.iter().zip(&chosen) {
                let node = units[i].node;
                if let Some(count) = count {
                    if self.tree.node(node).quantifier != QuantifierKind::ExactlyOne {
                        next_counts.push(Repetition { node, count });
                    }
                }
            }

            if depth == 0 {
                if let Some(count) = chosen[0] {
                    let assignment = Assignment {
                        repetitions: next_counts,
                    };
                    if self.reconstructs(&units[0], count) && !self.matches.contains(&assignment) {
                        self.matches.push(assignment);
                        if self.options.first_only {
                            return ControlFlow::Break(Halt::Done);
                        }
                    }
                }
                continue;
            }

            let mut per_unit = vec![None; units.len()];
            for (&i, &count) in targets.iter().zip(&chosen) {
                per_unit[i] = Some(count);
            }
            let collapsed = self.collapse(&units, &per_unit);
            self.match_up(collapsed, next_counts)?;
        }
        ControlFlow::Continue(())
    }

    /// Required (no enclosing node may be skipped) and provably unable to
    /// appear in the input.
    fn is_dead(&self, id: NodeId) -> bool {
        if self.floors[id.index()] == 0 {
            return false;
        }
        let node = self.tree.node(id);
        if node.is_leaf() {
            return !node.active;
        }
        self.tree
            .slots(id)
            .iter()
            .any(|slot| slot.iter().all(|&member| self.is_dead(member)))
    }

    fn leaf_unit(&self, id: NodeId) -> Unit<'a> {
        let tokens: &'a [Option<LeafToken>] = self.tokens;
        let node = self.tree.node(id);
        let mut unit = Unit::new(id);
        let capture = node.capture_id.filter(|_| node.group == GroupKind::Capture);

        if let Some(k) = capture {
            unit.pieces.push(Piece::Open(k));
        }
        if node.group == GroupKind::Backreference {
            if let Some(k) = node.capture_id {
                unit.pieces.push(Piece::Backref(k));
                unit.variable = true;
            }
        } else if let Some(token) = &tokens[id.index()] {
            unit.pieces.extend(token.atoms().iter().map(Piece::Atom));
            unit.width = token.width();
        }
        if let Some(k) = capture {
            unit.pieces.push(Piece::Close(k));
        }
        unit
    }

    /// gcd and minimum-consumption checks over the whole frontier.
    fn feasible(&self, units: &[Unit<'a>]) -> bool {
        let n = self.input.len();
        let mut divisor = 0;
        let mut floor = 0usize;
        let mut variable = false;
        for unit in units.iter().filter(|u| !u.impossible) {
            variable |= unit.variable;
            divisor = gcd(divisor, unit.width);
            let least = unit.width.saturating_mul(self.floors[unit.node.index()]);
            floor = floor.saturating_add(least);
        }
        if floor > n {
            trace!("needs at least {floor} chars, input has {n}");
            return false;
        }
        if !variable && divisor > 0 && n % divisor != 0 {
            trace!("input length {n} is not a multiple of {divisor}");
            return false;
        }
        true
    }

    /// Counts to try for `unit`; `None` stands for "cannot be placed", allowed
    /// only when an enclosing node may repeat zero times.
    fn count_choices(&self, unit: &Unit<'a>) -> Vec<Option<usize>> {
        let node = self.tree.node(unit.node);
        if unit.impossible {
            if node.bounds.min == 0 {
                return vec![Some(0)];
            }
        } else {
            let counts = self.achievable_counts(unit);
            if !counts.is_empty() {
                return counts.into_iter().map(Some).collect();
            }
        }
        if self.floors[unit.node.index()] == 0 {
            vec![None]
        } else {
            Vec::new()
        }
    }

    /// Counts within the quantifier's bounds that some contiguous run of the
    /// unit somewhere in the input actually reaches.
    fn achievable_counts(&self, unit: &Unit<'a>) -> Vec<usize> {
        let n = self.input.len();
        let bounds = self.tree.node(unit.node).bounds;
        let min = bounds.min;

        if unit.variable {
            let cap = bounds.max.unwrap_or(n).min(n.max(min));
            return (min..=cap).collect();
        }
        if unit.width == 0 {
            return vec![min];
        }

        let fit = n / unit.width;
        let limit = bounds.max.map_or(fit, |max| max.min(fit));
        let mut counts = Vec::new();
        if min == 0 {
            counts.push(0);
        }
        let lower = min.max(1);
        if lower <= limit {
            let longest = self.longest_run(unit, limit);
            counts.extend(lower..=longest);
        }
        counts
    }

    fn longest_run(&self, unit: &Unit<'a>, limit: usize) -> usize {
        let mut best = 0;
        for start in 0..self.input.len() {
            let mut pos = start;
            let mut run = 0;
            while run < limit && self.pieces_match(&unit.pieces, pos) {
                pos += unit.width;
                run += 1;
            }
            best = best.max(run);
            if best >= limit {
                break;
            }
        }
        best
    }

    fn pieces_match(&self, pieces: &[Piece<'a>], pos: usize) -> bool {
        let mut offset = pos;
        for piece in pieces {
            if let Piece::Atom(atom) = piece {
                match self.input.get(offset) {
                    Some(&c) if atom.matches(c) => offset += 1,
                    _ => return false,
                }
            }
        }
        true
    }

    /// Folds each run of same-parent units that got a count into one unit
    /// for that parent. Units without a count pass through untouched.
    fn collapse(&self, units: &[Unit<'a>], counts: &[Option<Option<usize>>]) -> Vec<Unit<'a>> {
        let mut out = Vec::with_capacity(units.len());
        let mut pending: Option<Unit<'a>> = None;

        for (unit, count) in units.iter().zip(counts) {
            let Some(count) = *count else {
                if let Some(parent) = pending.take() {
                    out.push(self.close_parent(parent));
                }
                out.push(unit.clone());
                continue;
            };

            let node = self.tree.node(unit.node);
            let parent_id = node.parent.unwrap_or(self.tree.root());
            if pending.as_ref().is_some_and(|p| p.node != parent_id) {
                if let Some(parent) = pending.take() {
                    out.push(self.close_parent(parent));
                }
            }
            let parent = pending.get_or_insert_with(|| self.open_parent(parent_id));
            match count {
                Some(count) => {
                    for _ in 0..self.repeats(unit, count) {
                        parent.pieces.extend_from_slice(&unit.pieces);
                    }
                    parent.width += unit.width * count;
                    parent.variable |= unit.variable && count > 0;
                }
                None => parent.impossible = true,
            }
        }
        if let Some(parent) = pending {
            out.push(self.close_parent(parent));
        }
        out
    }

    /// Repetitions of `unit` worth spelling out. A fixed zero-width unit
    /// rebuilds the same text after one repetition; a variable zero-width
    /// unit stops changing after its first repetition that consumes nothing,
    /// which happens within `n + 1` repetitions.
    fn repeats(&self, unit: &Unit<'a>, count: usize) -> usize {
        match (unit.width, unit.variable) {
            (0, false) => count.min(1),
            (0, true) => count.min(self.input.len() + 1),
            _ => count,
        }
    }

    fn open_parent(&self, id: NodeId) -> Unit<'a> {
        let mut unit = Unit::new(id);
        if let Some(k) = self.capture_of(id) {
            unit.pieces.push(Piece::Open(k));
        }
        unit
    }

    fn close_parent(&self, mut unit: Unit<'a>) -> Unit<'a> {
        if let Some(k) = self.capture_of(unit.node) {
            unit.pieces.push(Piece::Close(k));
        }
        unit
    }

    fn capture_of(&self, id: NodeId) -> Option<usize> {
        let node = self.tree.node(id);
        node.capture_id.filter(|_| node.group == GroupKind::Capture)
    }

    /// Does `count` repetitions of the root unit spell out the whole input?
    fn reconstructs(&self, root: &Unit<'a>, count: usize) -> bool {
        let n = self.input.len();
        let slots = self.tree.capture_count() + 1;
        let mut starts = vec![0; slots];
        let mut captured: Vec<Option<(usize, usize)>> = vec![None; slots];
        let mut pos = 0;

        for _ in 0..self.repeats(root, count) {
            for piece in &root.pieces {
                match *piece {
                    Piece::Atom(atom) => match self.input.get(pos) {
                        Some(&c) if atom.matches(c) => pos += 1,
                        _ => return false,
                    },
                    Piece::Open(k) => starts[k] = pos,
                    Piece::Close(k) => captured[k] = Some((starts[k], pos)),
                    Piece::Backref(k) => {
                        let Some((start, end)) = captured[k] else {
                            return false;
                        };
                        let len = end - start;
                        if pos + len > n || self.input[start..end] != self.input[pos..pos + len] {
                            return false;
                        }
                        pos += len;
                    }
                }
            }
        }
        pos == n
    }
}

fn gcd(a: usize, b: usize) -> usize {
    if b == 0 { a } else { gcd(b, a % b) }
}
