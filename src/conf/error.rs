//! Error types for the configuration grammar.

use thiserror::Error;

/// Errors produced while parsing configuration text.
///
/// These are structural errors in the input, distinct from I/O failures:
/// callers must not attempt partial recovery, the whole parse is rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A quoted value was opened but the closing quote never appeared
    /// before the end of the line.
    #[error("unterminated quote on line {line}")]
    UnterminatedQuote {
        /// 1-based line number of the offending line.
        line: usize,
    },

    /// A `Section`/`SubSection` opener had no matching closer by
    /// end-of-input.
    #[error("section \"{name}\" is never closed")]
    UnterminatedSection {
        /// Name of the innermost section still open at end-of-input.
        name: String,
    },
}
