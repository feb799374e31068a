//! Recognizes and measures the three token categories at the head of a span:
//! a group, the quantifier after it, and the link to the next group.

use crate::regex::ast::{
    GroupError, GroupKind, LinkError, LinkKind, QuantifierError, QuantifierKind, Span,
};
use crate::regex::bracket::{self, BracketSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupScan {
    pub kind: GroupKind,
    pub len: usize,
    /// Referenced id when `kind` is a backreference.
    pub capture_id: Option<usize>,
}

impl GroupScan {
    fn new(kind: GroupKind, len: usize) -> Self {
        Self {
            kind,
            len,
            capture_id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantifierScan {
    pub kind: QuantifierKind,
    pub len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkScan {
    pub kind: LinkKind,
    pub len: usize,
}

pub fn check_group(text: &str) -> GroupKind {
    let mut chars = text.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (None, _, _) => GroupKind::Empty,
        (Some(c @ ('{' | '|' | '?' | '*' | '+')), _, _) => {
            GroupKind::Invalid(GroupError::InvalidStart(c))
        }
        (Some(')'), _, _) => GroupKind::Invalid(GroupError::UnmatchedGroup),
        (Some('('), Some('?'), Some(':')) => GroupKind::NonCapture,
        (Some('('), _, _) => GroupKind::Capture,
        (Some('['), Some('^'), _) => GroupKind::NegatedBracket,
        (Some('['), _, _) => GroupKind::Bracket,
        (Some('\\'), Some(d), _) if d.is_ascii_digit() => GroupKind::Backreference,
        _ => GroupKind::Implicit,
    }
}

/// Classifies and measures the group at the head of `text`. `base` is the
/// offset of `text` in the pattern; `assigned` is how many capture ids have
/// been handed out so far.
pub fn scan_group(text: &str, base: usize, assigned: usize) -> GroupScan {
    let kind = check_group(text);
    match kind {
        GroupKind::Backreference => scan_backreference(text, assigned),
        GroupKind::Bracket | GroupKind::NegatedBracket => scan_bracket(text, base, kind),
        GroupKind::Capture | GroupKind::NonCapture => scan_wrapped(text, kind),
        GroupKind::Implicit => scan_implicit(text, base),
        GroupKind::Empty => GroupScan::new(kind, 0),
        GroupKind::Invalid(_) => GroupScan::new(kind, text.len()),
    }
}

fn scan_backreference(text: &str, assigned: usize) -> GroupScan {
    let digits = text[1..].bytes().take_while(|b| b.is_ascii_digit()).count();
    let len = 1 + digits;
    let id = text[1..len].parse::<usize>().unwrap_or(usize::MAX);
    if id == 0 || id > assigned {
        let error = GroupError::InvalidBackreference { id, assigned };
        return GroupScan::new(GroupKind::Invalid(error), len);
    }
    GroupScan {
        kind: GroupKind::Backreference,
        len,
        capture_id: Some(id),
    }
}

fn scan_bracket(text: &str, base: usize, kind: GroupKind) -> GroupScan {
    let len = match bracket::scan(text, base) {
        Ok(len) => len,
        Err(e) => return GroupScan::new(GroupKind::Invalid(e), text.len()),
    };
    match BracketSet::parse(&text[..len], base) {
        Ok(_) => GroupScan::new(kind, len),
        Err(e) => GroupScan::new(GroupKind::Invalid(e), len),
    }
}

fn scan_wrapped(text: &str, kind: GroupKind) -> GroupScan {
    let mut balance = 0usize;
    let mut i = 0;
    while let Some(c) = text[i..].chars().next() {
        match c {
            '\\' => {
                i += 1 + text[i + 1..].chars().next().map_or(0, char::len_utf8);
                continue;
            }
            '[' => {
                if let Ok(len) = bracket::scan(&text[i..], 0) {
                    i += len;
                    continue;
                }
            }
            '(' => balance += 1,
            ')' => {
                balance -= 1;
                if balance == 0 {
                    return GroupScan::new(kind, i + 1);
                }
            }
            _ => {}
        }
        i += c.len_utf8();
    }
    GroupScan::new(GroupKind::Invalid(GroupError::UnmatchedGroup), text.len())
}

/// A literal run. When a quantifier follows a run of several atoms, the last
/// atom is left for the next scan so the quantifier binds to it alone.
fn scan_implicit(text: &str, base: usize) -> GroupScan {
    let mut i = 0;
    let mut atoms = 0;
    let mut last = 0;
    let mut quantified = false;
    while let Some(c) = text[i..].chars().next() {
        let width = match c {
            '(' | ')' | '[' | '|' => break,
            '?' | '*' | '+' | '{' => {
                quantified = true;
                break;
            }
            '\\' => match text[i + 1..].chars().next() {
                Some(d) if d.is_ascii_digit() => break,
                Some(e) => 1 + e.len_utf8(),
                None if atoms == 0 => {
                    let error = GroupError::InvalidEscape(Span::new(base + i, base + i + 1));
                    return GroupScan::new(GroupKind::Invalid(error), 1);
                }
                None => break,
            },
            _ => c.len_utf8(),
        };
        last = i;
        i += width;
        atoms += 1;
    }
    let len = if quantified && atoms > 1 { last } else { i };
    GroupScan::new(GroupKind::Implicit, len)
}

pub fn check_quantifier(text: &str) -> QuantifierKind {
    match text.chars().next() {
        Some('?') => QuantifierKind::ZeroOrOne,
        Some('*') => QuantifierKind::ZeroOrMore,
        Some('+') => QuantifierKind::OneOrMore,
        Some('{') => match text.find('}') {
            Some(end) => braces(&text[1..end]).unwrap_or_else(QuantifierKind::Invalid),
            None => QuantifierKind::Invalid(QuantifierError::Unmatched),
        },
        _ => QuantifierKind::ExactlyOne,
    }
}

fn braces(content: &str) -> Result<QuantifierKind, QuantifierError> {
    if !content.chars().all(|c| c.is_ascii_digit() || c == ',') {
        return Err(QuantifierError::NonNumeric);
    }
    let kind = match content.split_once(',') {
        None if content.is_empty() => return Err(QuantifierError::MissingBounds),
        None => QuantifierKind::Exactly(number(content)?),
        Some((_, m)) if m.contains(',') => return Err(QuantifierError::MultipleSeparators),
        Some(("", "")) => return Err(QuantifierError::MissingBounds),
        Some(("", m)) => QuantifierKind::AtMost(number(m)?),
        Some((n, "")) => QuantifierKind::AtLeast(number(n)?),
        Some((n, m)) => {
            let (min, max) = (number(n)?, number(m)?);
            if min >= max {
                return Err(QuantifierError::UpperNotAboveLower { min, max });
            }
            QuantifierKind::Between(min, max)
        }
    };
    Ok(kind)
}

fn number(digits: &str) -> Result<usize, QuantifierError> {
    digits.parse().map_err(|_| QuantifierError::OutOfRange)
}

pub fn scan_quantifier(text: &str) -> QuantifierScan {
    let kind = check_quantifier(text);
    let len = match kind {
        QuantifierKind::ExactlyOne => 0,
        QuantifierKind::ZeroOrOne | QuantifierKind::ZeroOrMore | QuantifierKind::OneOrMore => 1,
        QuantifierKind::Invalid(QuantifierError::Unmatched) => text.len(),
        _ => text.find('}').map_or(text.len(), |end| end + 1),
    };
    QuantifierScan { kind, len }
}

/// Link between the group just scanned and the next one.
pub fn check_link(text: &str) -> LinkKind {
    match text.chars().next() {
        None => LinkKind::None,
        Some('|') if text.len() == 1 => LinkKind::Invalid(LinkError::EmptyAlternative),
        Some('|') => LinkKind::Alternation,
        Some(_) => LinkKind::Concatenation,
    }
}

pub fn scan_link(text: &str) -> LinkScan {
    let kind = check_link(text);
    let len = match kind {
        LinkKind::Alternation | LinkKind::Invalid(_) => 1,
        LinkKind::None | LinkKind::Concatenation => 0,
    };
    LinkScan { kind, len }
}
