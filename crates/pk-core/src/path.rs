//! Field paths into data-source JSON.
//!
//! Paths are dotted, optionally with literal bracket indices
//! (`items[0].name`). Bracket indices are kept for display only; which
//! array element gets read is always decided by the binding's item index.

use winnow::ascii::digit1;
use winnow::combinator::{alt, delimited, repeat};
use winnow::prelude::*;
use winnow::token::take_while;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Index(Option<usize>),
    Dot,
    Text(&'a str),
}

fn index(input: &mut &str) -> ModalResult<Option<usize>> {
    delimited('[', digit1, ']')
        .map(|digits: &str| digits.parse::<usize>().ok())
        .parse_next(input)
}

fn token<'a>(input: &mut &'a str) -> ModalResult<Token<'a>> {
    alt((
        index.map(Token::Index),
        '.'.value(Token::Dot),
        take_while(1.., |c: char| c != '.' && c != '[').map(Token::Text),
        "[".map(Token::Text),
    ))
    .parse_next(input)
}

/// A parsed field path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<String>,
    literal_indices: Vec<usize>,
}

impl FieldPath {
    /// Parse a path. Never fails: anything that is not a `[digits]` index
    /// or a `.` separator is field text, and empty segments are dropped.
    pub fn parse(path: &str) -> Self {
        let mut input = path;
        let tokens: Vec<Token<'_>> = repeat(0.., token)
            .parse_next(&mut input)
            .unwrap_or_default();

        let mut out = FieldPath::default();
        let mut current = String::new();
        for tok in tokens {
            match tok {
                Token::Index(Some(i)) => out.literal_indices.push(i),
                Token::Index(None) => {}
                Token::Text(text) => current.push_str(text),
                Token::Dot => {
                    if !current.is_empty() {
                        out.segments.push(std::mem::take(&mut current));
                    }
                }
            }
        }
        if !current.is_empty() {
            out.segments.push(current);
        }
        // Unparsed tail, if any, is treated as a final field name.
        if !input.is_empty() {
            out.segments.push(input.to_string());
        }
        out
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Bracket indices that appeared in the source text, in order.
    pub fn literal_indices(&self) -> &[usize] {
        &self.literal_indices
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Dotted form without bracket indices (`items.name`).
    pub fn canonical(&self) -> String {
        self.segments.join(".")
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical())
    }
}
