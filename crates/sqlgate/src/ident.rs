//! Table and column names.
//!
//! An [`Ident`] is a possibly dotted name (`schema.table.column`). Bare parts must
//! match `[A-Za-z_][A-Za-z0-9_$]*` and are written as given; quoted parts keep their
//! exact spelling and are re-quoted for the target dialect, so `"Users"`,
//! `` `Users` `` and `[Users]` all compile to the same identifier.

use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentPart {
    Bare(String),
    Quoted(String),
}

/// A validated table, column or schema name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub parts: Vec<IdentPart>,
}

fn invalid(input: &str, reason: impl std::fmt::Display) -> OrmError {
    OrmError::validation(format!("invalid identifier '{input}': {reason}"))
}

fn closing_quote(open: char) -> Option<char> {
    match open {
        '"' => Some('"'),
        '`' => Some('`'),
        '[' => Some(']'),
        _ => None,
    }
}

fn is_bare_char(c: char, first: bool) -> bool {
    c == '_' || c.is_ascii_alphabetic() || (!first && (c == '$' || c.is_ascii_digit()))
}

impl Ident {
    /// A single part that is always quoted.
    pub fn quoted(name: &str) -> OrmResult<Self> {
        if name.is_empty() || name.contains('\0') {
            return Err(invalid(name, "quoted name must be non-empty and free of NUL"));
        }
        Ok(Self {
            parts: vec![IdentPart::Quoted(name.to_string())],
        })
    }

    /// Parse a dotted name whose parts are bare or quoted in any dialect's style.
    pub fn parse(input: &str) -> OrmResult<Self> {
        if input.is_empty() {
            return Err(invalid(input, "empty"));
        }
        if input.contains('\0') {
            return Err(invalid(input, "contains NUL"));
        }

        let mut parts = Vec::new();
        let mut rest = input;
        loop {
            let (part, tail) = Self::next_part(input, rest)?;
            parts.push(part);
            match tail.chars().next() {
                None => break,
                Some('.') if tail.len() > 1 => rest = &tail[1..],
                Some('.') => return Err(invalid(input, "trailing '.'")),
                Some(c) => return Err(invalid(input, format!("unexpected '{c}'"))),
            }
        }
        Ok(Self { parts })
    }

    /// Read one part from the front of `rest`, returning it with the unread tail.
    fn next_part<'a>(input: &str, rest: &'a str) -> OrmResult<(IdentPart, &'a str)> {
        let mut chars = rest.char_indices().peekable();
        let Some(&(_, open)) = chars.peek() else {
            return Err(invalid(input, "empty part"));
        };

        if let Some(close) = closing_quote(open) {
            chars.next();
            let mut name = String::new();
            while let Some((i, c)) = chars.next() {
                if c != close {
                    name.push(c);
                    continue;
                }
                // a doubled closing quote stands for itself
                if matches!(chars.peek(), Some(&(_, next)) if next == close) {
                    chars.next();
                    name.push(close);
                    continue;
                }
                if name.is_empty() {
                    return Err(invalid(input, "empty quoted part"));
                }
                return Ok((IdentPart::Quoted(name), &rest[i + c.len_utf8()..]));
            }
            return Err(invalid(input, "unclosed quote"));
        }

        let end = rest.find('.').unwrap_or(rest.len());
        let name = &rest[..end];
        if name.is_empty() {
            return Err(invalid(input, "empty part"));
        }
        if let Some(c) = name
            .chars()
            .enumerate()
            .find_map(|(i, c)| (!is_bare_char(c, i == 0)).then_some(c))
        {
            return Err(invalid(input, format!("unexpected '{c}'")));
        }
        Ok((IdentPart::Bare(name.to_string()), &rest[end..]))
    }

    /// The last part without quotes (`public."Users"` -> `Users`).
    pub fn name(&self) -> &str {
        match self.parts.last() {
            Some(IdentPart::Bare(s) | IdentPart::Quoted(s)) => s,
            None => "",
        }
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        let mut out = String::new();
        self.write_sql(dialect, &mut out);
        out
    }

    pub(crate) fn write_sql(&self, dialect: Dialect, out: &mut String) {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            match part {
                IdentPart::Bare(s) => out.push_str(s),
                IdentPart::Quoted(s) => dialect.write_quoted(out, s),
            }
        }
    }
}

impl std::str::FromStr for Ident {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Strip identifier quote characters from every dotted part.
///
/// Used when matching driver-reported column names against record fields.
pub fn unquote(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '"' | '`' | '[' | ']'))
        .collect()
}
