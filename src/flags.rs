//! Compile-time and execution-time flags.
//!
//! Both sets are closed enumerations of named constants; callers select flags
//! by name, never by raw bit value. The compile-time default is the extended
//! (ERE) dialect.

use bitflags::bitflags;

bitflags! {
    /// Dialect and option flags fixed at pattern compile time.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CompileFlags: u32 {
        /// POSIX extended syntax. Without this (and without `LITERAL`),
        /// the pattern is parsed as POSIX basic syntax.
        const EXTENDED    = 1 << 0;
        /// Case-insensitive matching.
        const ICASE       = 1 << 1;
        /// Do not report capture-group spans; `group_count()` is 0.
        const NOSUB       = 1 << 2;
        /// Newline-sensitive matching: `.` and negated classes do not match
        /// `\n`, `^` also matches after a newline, `$` also matches before one.
        const NEWLINE     = 1 << 3;
        /// The pattern is a literal string; no characters are special.
        const LITERAL     = 1 << 4;
        /// Associate alternation and concatenation to the right. Accepted
        /// for compatibility; ordered-choice execution is unaffected.
        const RIGHT_ASSOC = 1 << 5;
        /// Swap default greedy/lazy quantifier semantics; a quantifier
        /// followed by `?` swaps back.
        const UNGREEDY    = 1 << 6;
    }
}

bitflags! {
    /// Per-call execution flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ExecFlags: u32 {
        /// The search start is not the beginning of a line: `^` does not
        /// match there. Iterative callers set this when resuming a scan at a
        /// non-zero offset.
        const NOTBOL = 1 << 0;
        /// The end of the subject is not the end of a line: `$` does not
        /// match there.
        const NOTEOL = 1 << 1;
    }
}

impl Default for CompileFlags {
    fn default() -> Self {
        CompileFlags::EXTENDED
    }
}

impl Default for ExecFlags {
    fn default() -> Self {
        ExecFlags::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_dialect_is_extended() {
        assert_eq!(CompileFlags::default(), CompileFlags::EXTENDED);
        assert_eq!(ExecFlags::default(), ExecFlags::empty());
    }

    #[test]
    fn flags_compose() {
        let f = CompileFlags::EXTENDED | CompileFlags::ICASE | CompileFlags::NEWLINE;
        assert!(f.contains(CompileFlags::ICASE));
        assert!(!f.contains(CompileFlags::NOSUB));
    }
}
