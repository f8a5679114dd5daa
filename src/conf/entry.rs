//! One configuration directive: a keyword plus its ordered values.

use std::fmt;

use super::error::ParseError;
use super::value::Value;

/// A single directive line, e.g. `Driver "intel"` or `BlankTime 0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The directive keyword. Never empty.
    pub key: String,
    /// The ordered values following the keyword. May be empty.
    pub values: Vec<Value>,
}

impl Entry {
    pub fn new(key: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            key: key.into(),
            values,
        }
    }

    /// Parse one line of configuration text.
    ///
    /// Returns `Ok(None)` for blank and comment-only lines. A `#` in value
    /// position ends the scan; the rest of the line is a comment. Quoted
    /// values run to the next `"`; an unclosed quote fails the parse.
    pub fn parse(line: &str, line_no: usize) -> Result<Option<Self>, ParseError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let (key, mut rest) = match line.split_once(char::is_whitespace) {
            Some((key, rest)) => (key, rest.trim_start()),
            None => (line, ""),
        };

        let mut values = Vec::new();
        while !rest.is_empty() {
            if let Some(inner) = rest.strip_prefix('"') {
                let end = inner
                    .find('"')
                    .ok_or(ParseError::UnterminatedQuote { line: line_no })?;
                values.push(Value::QuotedString(inner[..end].to_string()));
                rest = inner[end + 1..].trim_start();
            } else if rest.starts_with('#') {
                break;
            } else {
                let (token, tail) = match rest.split_once(char::is_whitespace) {
                    Some((token, tail)) => (token, tail.trim_start()),
                    None => (rest, ""),
                };
                values.push(Value::classify(token));
                rest = tail;
            }
        }

        Ok(Some(Self {
            key: key.to_string(),
            values,
        }))
    }
}

impl fmt::Display for Entry {
    /// Writes the directive in its serialized form: key, a tab, then the
    /// values separated by single spaces.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.values.is_empty() {
            return write!(f, "{}", self.key);
        }
        write!(f, "{}\t", self.key)?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{value}")?;
        }
        Ok(())
    }
}
