//! Error taxonomy.
//!
//! Structural pattern problems surface at compile time as [`CompileError`]
//! with a kind and the byte offset in the pattern where the problem was
//! detected. Problems hit while searching surface as [`ExecError`] on the
//! specific call that encountered them; the compiled pattern stays usable
//! afterwards. "No match" is never an error: the match entry points return
//! `Ok(None)` for it.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The pattern could not be compiled.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// A match call failed. The pattern is not poisoned and remains usable.
    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// A structural problem in the pattern, detected at compile time.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{} at offset {offset}", kind.message())]
pub struct CompileError {
    /// What class of construct was malformed.
    pub kind: CompileErrorKind,
    /// Byte offset in the pattern where the problem was detected.
    pub offset: usize,
}

/// The closed set of compile-time error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompileErrorKind {
    /// `(` without `)`, or a stray `)`.
    UnbalancedParen,
    /// `[` without `]`.
    UnbalancedBracket,
    /// Malformed `{n,m}`: not a number, inverted bounds, or a bound above
    /// the repetition ceiling.
    BadBraceRepetition,
    /// A quantifier with nothing to repeat.
    BadRepetition,
    /// An escape at the end of the pattern, or an unknown escape.
    BadEscape,
    /// A malformed character class: bad range or unknown `[:name:]`.
    BadCharClass,
    /// A back-reference to a group that does not exist at that point.
    BadBackref,
    /// The compiled program would exceed the instruction ceiling.
    TooComplex,
}

impl CompileErrorKind {
    /// Fixed diagnostic text for this kind. Rendering a message never
    /// requires re-parsing the pattern.
    pub fn message(&self) -> &'static str {
        match self {
            CompileErrorKind::UnbalancedParen => "unbalanced parenthesis",
            CompileErrorKind::UnbalancedBracket => "unbalanced bracket",
            CompileErrorKind::BadBraceRepetition => "invalid brace repetition",
            CompileErrorKind::BadRepetition => "repetition without a preceding atom",
            CompileErrorKind::BadEscape => "invalid or trailing escape",
            CompileErrorKind::BadCharClass => "invalid character class",
            CompileErrorKind::BadBackref => "invalid back-reference",
            CompileErrorKind::TooComplex => "pattern too complex to compile",
        }
    }
}

/// A problem encountered while executing a search.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecError {
    /// Approximate search was requested on a pattern that does not support
    /// it (it contains back-references).
    #[error("pattern does not support approximate matching")]
    ApproxUnsupported,

    /// The backtracking matcher exceeded its step budget.
    #[error("backtracking step limit exceeded")]
    StepLimitExceeded,

    /// The approximate search explored more states than the per-call budget
    /// allows.
    #[error("approximate search space limit exceeded")]
    SearchSpaceExceeded,

    /// The start offset does not lie on a character boundary.
    #[error("start offset is not a character boundary")]
    OffsetNotCharBoundary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_error_renders_kind_and_offset() {
        let err = CompileError {
            kind: CompileErrorKind::UnbalancedParen,
            offset: 3,
        };
        assert_eq!(err.to_string(), "unbalanced parenthesis at offset 3");
    }

    #[test]
    fn every_kind_has_a_message() {
        let kinds = [
            CompileErrorKind::UnbalancedParen,
            CompileErrorKind::UnbalancedBracket,
            CompileErrorKind::BadBraceRepetition,
            CompileErrorKind::BadRepetition,
            CompileErrorKind::BadEscape,
            CompileErrorKind::BadCharClass,
            CompileErrorKind::BadBackref,
            CompileErrorKind::TooComplex,
        ];
        for kind in kinds {
            assert!(!kind.message().is_empty());
        }
    }

    #[test]
    fn exec_errors_display() {
        assert_eq!(
            ExecError::ApproxUnsupported.to_string(),
            "pattern does not support approximate matching"
        );
    }
}
