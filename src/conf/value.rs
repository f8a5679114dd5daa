//! Typed values carried by configuration entries.

use std::fmt;

/// One value on a configuration line.
///
/// The tag only matters when writing the value back out: quoted strings are
/// wrapped in `"…"`, integers and bare tokens are written as-is. Keeping
/// integers separate from bare tokens lets numeric values survive a
/// parse/serialize round trip without picking up quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A bare decimal integer, e.g. the `0` in `BlankTime 0`.
    Integer(i64),
    /// A `"quoted string"`, e.g. the identifier in `Identifier "Screen0"`.
    QuotedString(String),
    /// A bare token that is not an integer, e.g. the mode in `Mode 0666`.
    UnquotedToken(String),
}

impl Value {
    /// Classify a bare (unquoted) token.
    ///
    /// A token is an [`Value::Integer`] if it parses as base-10 `i64` and
    /// does not start with a leading `0` followed by more characters.
    /// The leading-zero rule keeps octal-looking literals such as the
    /// `0666` permission mode textually intact.
    pub fn classify(token: &str) -> Self {
        let octal_looking = token.len() > 1 && token.starts_with('0');
        if !octal_looking {
            if let Ok(n) = token.parse::<i64>() {
                return Self::Integer(n);
            }
        }
        Self::UnquotedToken(token.to_string())
    }

    /// Shorthand for a quoted string value.
    pub fn quoted(s: impl Into<String>) -> Self {
        Self::QuotedString(s.into())
    }

    /// Shorthand for a bare token value.
    pub fn token(s: impl Into<String>) -> Self {
        Self::UnquotedToken(s.into())
    }

    /// The textual content for string-like values, `None` for integers.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::QuotedString(s) | Self::UnquotedToken(s) => Some(s),
            Self::Integer(_) => None,
        }
    }

    /// The numeric content, `None` for string-like values.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// The value as plain text, without any quoting.
    pub fn to_plain_string(&self) -> String {
        match self {
            Self::Integer(n) => n.to_string(),
            Self::QuotedString(s) | Self::UnquotedToken(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    /// Writes the value in its serialized form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::QuotedString(s) => write!(f, "\"{s}\""),
            Self::UnquotedToken(s) => write!(f, "{s}"),
        }
    }
}
