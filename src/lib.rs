//! rexa: approximate (error-tolerant) regular expression matching.
//!
//! Patterns compile once into an immutable program and can then be matched
//! exactly or approximately, with per-edit costs and budget ceilings, against
//! any number of subjects. Results carry the overall span, every capture
//! group's span (or its non-participation), and, for approximate matches,
//! the edit-operation breakdown.
//!
//! ```
//! use rexa::{CostModel, Regex};
//!
//! let re = Regex::new("a(b)c").unwrap();
//! let m = re.find("xabcx").unwrap().unwrap();
//! assert_eq!((m.start(), m.end()), (1, 4));
//! assert_eq!(m.group(1).map(|g| g.start), Some(2));
//!
//! // one substitution within budget
//! let params = CostModel { cost_subst: 1, max_cost: 1, max_err: 1, ..CostModel::default() };
//! let am = re.approx_find("abX", &params).unwrap().unwrap();
//! assert_eq!((am.start(), am.end()), (0, 3));
//! assert_eq!(am.edits().num_subst, 1);
//! ```
//!
//! A compiled [`Regex`] is immutable and safe to share across threads; each
//! match call uses private scratch space.

mod cost;
mod error;
mod exec;
mod flags;
mod iter;
mod program;
mod result;
mod syntax;

pub use cost::CostModel;
pub use error::{CompileError, CompileErrorKind, Error, ExecError, Result};
pub use flags::{CompileFlags, ExecFlags};
pub use iter::{Matches, Split};
pub use result::{ApproxMatch, EditCounts, Match, Span};

use parking_lot::Mutex;

use exec::scratch::Scratch;
use program::Program;

/// A compiled pattern.
///
/// Compile once with [`Regex::compile`] (or [`Regex::new`] for the default
/// extended dialect), then run any number of searches. The compiled form is
/// never mutated; concurrent match calls on a shared `Regex` are safe and
/// need no synchronization.
pub struct Regex {
    program: Program,
    pattern: Box<str>,
    /// Reusable search buffers; contended callers allocate their own.
    scratch: Mutex<Scratch>,
}

impl Regex {
    /// Compile `pattern` under the default flags (extended dialect).
    pub fn new(pattern: &str) -> Result<Regex> {
        Regex::compile(pattern, CompileFlags::default())
    }

    /// Compile `pattern` under the given dialect flags.
    pub fn compile(pattern: &str, flags: CompileFlags) -> Result<Regex> {
        let parsed = syntax::parse(pattern, flags)?;
        let program = program::compile(&parsed, flags)?;
        let scratch = Mutex::new(Scratch::new(program.len()));
        Ok(Regex { program, pattern: pattern.into(), scratch })
    }

    /// The pattern string this `Regex` was compiled from.
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Number of capture groups (0 under `NOSUB`), fixed at compile time.
    pub fn group_count(&self) -> usize {
        self.program.ngroups
    }

    /// Whether the pattern contains back-references. Such patterns run on
    /// the backtracking strategy.
    pub fn has_backrefs(&self) -> bool {
        self.program.has_backrefs
    }

    /// Whether the pattern supports approximate matching. False exactly
    /// when the pattern contains back-references.
    pub fn has_approx(&self) -> bool {
        !self.program.has_backrefs
    }

    /// Search `text` from the beginning.
    pub fn find(&self, text: &str) -> Result<Option<Match>> {
        self.find_at(text, 0, ExecFlags::empty())
    }

    /// Whether `text` contains a match anywhere.
    pub fn is_match(&self, text: &str) -> Result<bool> {
        Ok(self.find(text)?.is_some())
    }

    /// Search `text` from byte offset `start`.
    ///
    /// `start == text.len()` is legal and can only match an empty-capable
    /// pattern; `start > text.len()` reports no match without searching.
    /// All offsets in the result are relative to `text`, not to `start`.
    pub fn find_at(&self, text: &str, start: usize, eflags: ExecFlags) -> Result<Option<Match>> {
        if start > text.len() {
            return Ok(None);
        }
        if !text.is_char_boundary(start) {
            return Err(ExecError::OffsetNotCharBoundary.into());
        }
        if self.program.has_backrefs {
            let m = exec::backtrack::find(
                &self.program,
                text,
                start,
                eflags,
                exec::backtrack::STEP_LIMIT,
            )?;
            return Ok(m);
        }
        Ok(self.run_pike(text, start, eflags))
    }

    /// Approximate search from byte offset `start` under `params`.
    ///
    /// Reports the admissible match with the lowest total cost, preferring
    /// the leftmost start and then the longest span among ties, together
    /// with its edit-operation counters. An all-zero cost model is exactly
    /// equivalent to [`Regex::find_at`].
    pub fn approx_find_at(
        &self,
        text: &str,
        start: usize,
        eflags: ExecFlags,
        params: &CostModel,
    ) -> Result<Option<ApproxMatch>> {
        if !self.has_approx() {
            return Err(ExecError::ApproxUnsupported.into());
        }
        if start > text.len() {
            return Ok(None);
        }
        if !text.is_char_boundary(start) {
            return Err(ExecError::OffsetNotCharBoundary.into());
        }
        if params.is_exact() {
            let m = self.run_pike(text, start, eflags);
            return Ok(m.map(|m| ApproxMatch::new(m, EditCounts::default())));
        }
        let costs = params.resolve();
        let found = exec::approx::find(&self.program, text, start, eflags, &costs)?;
        Ok(found.map(|(m, edits)| ApproxMatch::new(m, edits)))
    }

    /// Approximate search from the beginning.
    pub fn approx_find(&self, text: &str, params: &CostModel) -> Result<Option<ApproxMatch>> {
        self.approx_find_at(text, 0, ExecFlags::empty(), params)
    }

    fn run_pike(&self, text: &str, start: usize, eflags: ExecFlags) -> Option<Match> {
        match self.scratch.try_lock() {
            Some(mut scratch) => exec::pike::find(&self.program, text, start, eflags, &mut scratch),
            None => {
                let mut scratch = Scratch::new(self.program.len());
                exec::pike::find(&self.program, text, start, eflags, &mut scratch)
            }
        }
    }
}

impl Clone for Regex {
    fn clone(&self) -> Self {
        Regex {
            program: self.program.clone(),
            pattern: self.pattern.clone(),
            scratch: Mutex::new(Scratch::new(self.program.len())),
        }
    }
}

impl std::fmt::Debug for Regex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Regex")
            .field("pattern", &self.pattern)
            .field("groups", &self.program.ngroups)
            .finish()
    }
}

impl std::fmt::Display for Regex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.pattern)
    }
}

impl std::str::FromStr for Regex {
    type Err = Error;

    fn from_str(s: &str) -> Result<Regex> {
        Regex::new(s)
    }
}

/// Build-time capabilities of the engine; a pure data query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Approximate matching is available.
    pub approx: bool,
    /// Subjects are interpreted as Unicode scalar sequences rather than
    /// bytes.
    pub wide_char: bool,
    /// Crate version string.
    pub version: &'static str,
}

/// Describe the compiled engine.
pub fn config() -> EngineConfig {
    EngineConfig { approx: true, wide_char: true, version: version() }
}

/// The engine version string.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_and_find() {
        let re = Regex::new("ab+c").unwrap();
        let m = re.find("zabbbc").unwrap().unwrap();
        assert_eq!((m.start(), m.end()), (1, 6));
    }

    #[test]
    fn offset_past_end_is_no_match_not_error() {
        let re = Regex::new("a").unwrap();
        assert_eq!(re.find_at("abc", 9, ExecFlags::empty()).unwrap(), None);
    }

    #[test]
    fn offset_at_end_can_match_empty() {
        let re = Regex::new("x*").unwrap();
        let m = re.find_at("abc", 3, ExecFlags::empty()).unwrap().unwrap();
        assert_eq!((m.start(), m.end()), (3, 3));
    }

    #[test]
    fn offset_inside_char_is_an_error() {
        let re = Regex::new("a").unwrap();
        let err = re.find_at("é", 1, ExecFlags::empty()).unwrap_err();
        assert_eq!(err, Error::Exec(ExecError::OffsetNotCharBoundary));
    }

    #[test]
    fn strategy_queries() {
        let plain = Regex::new("a(b)c").unwrap();
        assert!(!plain.has_backrefs());
        assert!(plain.has_approx());
        assert_eq!(plain.group_count(), 1);

        let backref = Regex::new(r"(a)\1").unwrap();
        assert!(backref.has_backrefs());
        assert!(!backref.has_approx());
    }

    #[test]
    fn approx_on_backref_pattern_is_an_error() {
        let re = Regex::new(r"(a)\1").unwrap();
        let params = CostModel { max_err: 1, ..CostModel::default() };
        let err = re.approx_find("aa", &params).unwrap_err();
        assert_eq!(err, Error::Exec(ExecError::ApproxUnsupported));
    }

    #[test]
    fn zero_model_delegates_to_exact() {
        let re = Regex::new("ab").unwrap();
        let am = re.approx_find("zab", &CostModel::default()).unwrap().unwrap();
        assert_eq!((am.start(), am.end()), (1, 3));
        assert_eq!(am.edits(), EditCounts::default());
    }

    #[test]
    fn failed_call_does_not_poison_the_pattern() {
        let re = Regex::new(r"(a)\1").unwrap();
        let params = CostModel { max_err: 1, ..CostModel::default() };
        assert!(re.approx_find("aa", &params).is_err());
        // the same pattern still matches exactly
        let m = re.find("aa").unwrap().unwrap();
        assert_eq!((m.start(), m.end()), (0, 2));
    }

    #[test]
    fn shared_across_threads() {
        use std::sync::Arc;

        let re = Arc::new(Regex::new("a+b").unwrap());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let re = Arc::clone(&re);
                std::thread::spawn(move || {
                    let text = format!("{}aab", "x".repeat(i));
                    let m = re.find(&text).unwrap().unwrap();
                    assert_eq!(m.end(), text.len());
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn config_reports_capabilities() {
        let cfg = config();
        assert!(cfg.approx);
        assert!(cfg.wide_char);
        assert_eq!(cfg.version, version());
        assert!(!version().is_empty());
    }

    #[test]
    fn literal_dialect_find() {
        let re = Regex::compile("a.c", CompileFlags::LITERAL).unwrap();
        assert!(re.find("abc").unwrap().is_none());
        let m = re.find("xa.cy").unwrap().unwrap();
        assert_eq!((m.start(), m.end()), (1, 4));
    }
}
