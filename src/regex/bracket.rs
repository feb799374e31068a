//! Bracket expressions: `[abc]`, `[^a-z]`, `[[:digit:]_]`, `[[.x.][=y=]]`.

use crate::regex::ast::{GroupError, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PosixClass {
    Upper,
    Lower,
    Alpha,
    Digit,
    Xdigit,
    Alnum,
    Punct,
    Blank,
    Space,
    Cntrl,
    Graph,
    Print,
}

impl PosixClass {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "upper" => PosixClass::Upper,
            "lower" => PosixClass::Lower,
            "alpha" => PosixClass::Alpha,
            "digit" => PosixClass::Digit,
            "xdigit" => PosixClass::Xdigit,
            "alnum" => PosixClass::Alnum,
            "punct" => PosixClass::Punct,
            "blank" => PosixClass::Blank,
            "space" => PosixClass::Space,
            "cntrl" => PosixClass::Cntrl,
            "graph" => PosixClass::Graph,
            "print" => PosixClass::Print,
            _ => return None,
        })
    }

    pub fn contains(self, c: char) -> bool {
        match self {
            PosixClass::Upper => c.is_ascii_uppercase(),
            PosixClass::Lower => c.is_ascii_lowercase(),
            PosixClass::Alpha => c.is_ascii_alphabetic(),
            PosixClass::Digit => c.is_ascii_digit(),
            PosixClass::Xdigit => c.is_ascii_hexdigit(),
            PosixClass::Alnum => c.is_ascii_alphanumeric(),
            PosixClass::Punct => c.is_ascii_punctuation(),
            PosixClass::Blank => c == ' ' || c == '\t',
            PosixClass::Space => c.is_ascii_whitespace() || c == '\x0B',
            PosixClass::Cntrl => c.is_ascii_control(),
            PosixClass::Graph => c.is_ascii_graphic(),
            PosixClass::Print => c.is_ascii_graphic() || c == ' ',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BracketItem {
    Char(char),
    Range(char, char),
    Class(PosixClass),
    /// `[.c.]`, a single-character collating element.
    Collating(char),
    /// `[=c=]`, the equivalence class of a single character.
    Equivalent(char),
}

impl BracketItem {
    fn contains(&self, c: char) -> bool {
        match *self {
            BracketItem::Char(ch) | BracketItem::Collating(ch) | BracketItem::Equivalent(ch) => {
                ch == c
            }
            BracketItem::Range(lo, hi) => lo <= c && c <= hi,
            BracketItem::Class(class) => class.contains(c),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketSet {
    pub negated: bool,
    pub items: Vec<BracketItem>,
}

impl BracketSet {
    /// Compiles a complete bracket token (as measured by [`scan`]).
    /// `base` is the token's offset in the pattern, used for error spans.
    pub fn parse(token: &str, base: usize) -> Result<Self, GroupError> {
        let negated = token.starts_with("[^");
        let start = if negated { 2 } else { 1 };
        if token.len() <= start || !token.ends_with(']') {
            return Err(GroupError::UnmatchedBracket);
        }
        let body = &token[start..token.len() - 1];
        let offset = base + start;

        let mut items = Vec::new();
        let mut i = 0;
        if body.starts_with(']') {
            items.push(BracketItem::Char(']'));
            i = 1;
        }
        while i < body.len() {
            let rest = &body[i..];
            if let Some(delim) = inner_delimiter(rest) {
                let close = inner_close(&rest[2..], delim).ok_or(
                    GroupError::UnmatchedBracketInner(Span::new(offset + i, offset + body.len())),
                )?;
                let name = &rest[2..2 + close];
                let span = Span::new(offset + i, offset + i + close + 4);
                let item = match delim {
                    ':' => BracketItem::Class(
                        PosixClass::from_name(name).ok_or(GroupError::InvalidClass(span))?,
                    ),
                    '.' => BracketItem::Collating(
                        single_char(name).ok_or(GroupError::InvalidCollation(span))?,
                    ),
                    _ => BracketItem::Equivalent(
                        single_char(name).ok_or(GroupError::InvalidEquivalence(span))?,
                    ),
                };
                items.push(item);
                i += close + 4;
                continue;
            }

            let (lo, width) = bracket_char(rest, offset + i)?;
            let after = &rest[width..];
            if after.len() > 1 && after.starts_with('-') {
                let hi_at = offset + i + width + 1;
                let (hi, hi_width) = bracket_char(&after[1..], hi_at)?;
                if lo > hi {
                    return Err(GroupError::InvalidRange(Span::new(offset + i, hi_at + hi_width)));
                }
                items.push(BracketItem::Range(lo, hi));
                i += width + 1 + hi_width;
            } else {
                items.push(BracketItem::Char(lo));
                i += width;
            }
        }
        Ok(Self { negated, items })
    }

    pub fn matches(&self, c: char) -> bool {
        self.items.iter().any(|item| item.contains(c)) != self.negated
    }
}

/// Measures a bracket token starting at `text[0] == '['`, closing `]` included.
pub fn scan(text: &str, base: usize) -> Result<usize, GroupError> {
    let mut i = if text.starts_with("[^") { 2 } else { 1 };
    if text[i..].starts_with(']') {
        i += 1;
    }
    while let Some(c) = text[i..].chars().next() {
        match c {
            ']' => return Ok(i + 1),
            '[' => match inner_delimiter(&text[i..]) {
                Some(delim) => {
                    let close = inner_close(&text[i + 2..], delim).ok_or(
                        GroupError::UnmatchedBracketInner(Span::new(base + i, base + text.len())),
                    )?;
                    i += close + 4;
                }
                None => i += 1,
            },
            '\\' => i += 1 + text[i + 1..].chars().next().map_or(0, char::len_utf8),
            _ => i += c.len_utf8(),
        }
    }
    Err(GroupError::UnmatchedBracket)
}

fn inner_delimiter(text: &str) -> Option<char> {
    let bytes = text.as_bytes();
    match (bytes.first(), bytes.get(1)) {
        (Some(b'['), Some(&d)) if matches!(d, b':' | b'.' | b'=') => Some(d as char),
        _ => None,
    }
}

fn inner_close(text: &str, delim: char) -> Option<usize> {
    let closing = [delim as u8, b']'];
    text.as_bytes().windows(2).position(|w| w == closing)
}

fn single_char(text: &str) -> Option<char> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// One character inside a bracket, escapes resolved. Returns the char and
/// how many bytes it took.
fn bracket_char(text: &str, at: usize) -> Result<(char, usize), GroupError> {
    let mut chars = text.chars();
    match chars.next() {
        Some('\\') => match chars.next() {
            None => Err(GroupError::InvalidEscape(Span::new(at, at + 1))),
            Some('x') => {
                let hex = text
                    .get(2..4)
                    .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
                    .ok_or(GroupError::InvalidHex(Span::new(at, at + 2)))?;
                let value = u8::from_str_radix(hex, 16)
                    .map_err(|_| GroupError::InvalidHex(Span::new(at, at + 4)))?;
                Ok((char::from(value), 4))
            }
            Some(c) => Ok((unescape(c), 1 + c.len_utf8())),
        },
        Some(c) => Ok((c, c.len_utf8())),
        None => Err(GroupError::InvalidEscape(Span::empty(at))),
    }
}

fn unescape(c: char) -> char {
    match c {
        't' => '\t',
        'n' => '\n',
        'r' => '\r',
        'f' => '\x0C',
        'v' => '\x0B',
        'a' => '\x07',
        'b' => '\x08',
        other => other,
    }
}
