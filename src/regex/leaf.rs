use crate::regex::ast::{GroupError, Span};
use crate::regex::bracket::{self, BracketSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeClass {
    Digit,
    NotDigit,
    Word,
    NotWord,
    Space,
    NotSpace,
}

impl EscapeClass {
    fn from_letter(c: char) -> Option<Self> {
        Some(match c {
            'd' => EscapeClass::Digit,
            'D' => EscapeClass::NotDigit,
            'w' => EscapeClass::Word,
            'W' => EscapeClass::NotWord,
            's' => EscapeClass::Space,
            'S' => EscapeClass::NotSpace,
            _ => return None,
        })
    }

    fn matches(self, c: char) -> bool {
        let word = c.is_ascii_alphanumeric() || c == '_';
        let space = c.is_ascii_whitespace() || c == '\x0B';
        match self {
            EscapeClass::Digit => c.is_ascii_digit(),
            EscapeClass::NotDigit => !c.is_ascii_digit(),
            EscapeClass::Word => word,
            EscapeClass::NotWord => !word,
            EscapeClass::Space => space,
            EscapeClass::NotSpace => !space,
        }
    }
}

/// Matches exactly one input character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Atom {
    Literal(char),
    Class(EscapeClass),
    Set(BracketSet),
}

impl Atom {
    pub fn matches(&self, c: char) -> bool {
        match self {
            Atom::Literal(l) => *l == c,
            Atom::Class(class) => class.matches(c),
            Atom::Set(set) => set.matches(c),
        }
    }
}

/// A compiled leaf: a fixed-width run of atoms.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LeafToken {
    atoms: Vec<Atom>,
}

impl LeafToken {
    pub fn compile(text: &str) -> Result<Self, GroupError> {
        Self::compile_at(text, 0)
    }

    /// Like [`LeafToken::compile`], with error spans offset by `base`.
    pub fn compile_at(text: &str, base: usize) -> Result<Self, GroupError> {
        let mut atoms = Vec::new();
        let mut i = 0;
        while let Some(c) = text[i..].chars().next() {
            match c {
                '\\' => {
                    let escaped = text[i + 1..]
                        .chars()
                        .next()
                        .ok_or(GroupError::InvalidEscape(Span::new(base + i, base + i + 1)))?;
                    atoms.push(match EscapeClass::from_letter(escaped) {
                        Some(class) => Atom::Class(class),
                        None => Atom::Literal(escaped),
                    });
                    i += 1 + escaped.len_utf8();
                }
                '[' => {
                    let len = bracket::scan(&text[i..], base + i)?;
                    atoms.push(Atom::Set(BracketSet::parse(&text[i..i + len], base + i)?));
                    i += len;
                }
                _ => {
                    atoms.push(Atom::Literal(c));
                    i += c.len_utf8();
                }
            }
        }
        Ok(Self { atoms })
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// Input characters consumed by one match.
    pub fn width(&self) -> usize {
        self.atoms.len()
    }

    pub fn matches_at(&self, input: &[char], pos: usize) -> bool {
        match input.get(pos..pos + self.width()) {
            Some(window) => self.atoms.iter().zip(window).all(|(atom, &c)| atom.matches(c)),
            None => false,
        }
    }

    /// Tries every offset up to and including the end of the input, where
    /// only a zero-width token can match.
    pub fn matches_anywhere(&self, input: &[char]) -> bool {
        (0..=input.len()).any(|pos| self.matches_at(input, pos))
    }
}

/// Does `token` match `input` starting at `pos`? Invalid tokens never match.
pub fn match_leaf(token: &str, input: &[char], pos: usize) -> bool {
    LeafToken::compile(token).is_ok_and(|leaf| leaf.matches_at(input, pos))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(token: &str, input: &str, pos: usize) -> bool {
        let chars: Vec<char> = input.chars().collect();
        match_leaf(token, &chars, pos)
    }

    #[test]
    fn literal_is_exact() {
        assert!(m("a", "xa", 1));
        assert!(!m("a", "xa", 0));
        assert!(!m("a", "xa", 2));
    }

    #[test]
    fn literal_run_matches_consecutive_chars() {
        assert!(m("ab", "cab", 1));
        assert!(!m("ab", "cab", 2));
    }

    #[test]
    fn escape_classes() {
        assert!(m(r"\d", "7", 0));
        assert!(!m(r"\d", "x", 0));
        assert!(m(r"\D", "x", 0));
        assert!(m(r"\w", "_", 0));
        assert!(!m(r"\w", "-", 0));
        assert!(m(r"\W", "-", 0));
        assert!(m(r"\s", " ", 0));
        assert!(m(r"\S", "a", 0));
    }

    #[test]
    fn other_escapes_are_literal() {
        assert!(m(r"\.", ".", 0));
        assert!(!m(r"\.", "a", 0));
        assert!(m(r"\*", "*", 0));
    }

    #[test]
    fn brackets_are_one_character_wide() {
        let leaf = LeafToken::compile("[a-c]x").unwrap();
        assert_eq!(leaf.width(), 2);
        assert!(m("[a-c]x", "bx", 0));
        assert!(!m("[^a-c]", "b", 0));
    }

    #[test]
    fn invalid_tokens_never_match() {
        assert!(!m("\\", "\\", 0));
        assert_eq!(
            LeafToken::compile_at("a\\", 4),
            Err(GroupError::InvalidEscape(Span::new(5, 6)))
        );
    }

    #[test]
    fn empty_token_matches_without_consuming() {
        let leaf = LeafToken::compile("").unwrap();
        assert_eq!(leaf.width(), 0);
        assert!(leaf.matches_at(&[], 0));
        assert!(leaf.matches_anywhere(&[]));
        assert!(!LeafToken::compile("a").unwrap().matches_anywhere(&[]));
    }
}
