//! Matcher execution strategies.
//!
//! Three matchers run the same compiled program: `pike` (exact,
//! backreference-free, POSIX leftmost-longest), `backtrack` (exact, required
//! for backreferences, leftmost-first), and `approx` (cost-bounded search).
//! Callers never branch on strategy; the dispatch happens once, from the
//! pattern's compile-time features.

pub(crate) mod approx;
pub(crate) mod backtrack;
pub(crate) mod pike;
pub(crate) mod scratch;
mod sparse_set;

use crate::flags::ExecFlags;
use crate::program::{Program, SLOT_NONE};
use crate::result::{Match, Span};
use scratch::Slots;

/// Whether `^` holds at `pos`. The engine never looks behind `search_start`:
/// at the resume position the anchor is controlled solely by `NOTBOL`.
#[inline]
pub(crate) fn bol_at(
    prog: &Program,
    text: &str,
    search_start: usize,
    pos: usize,
    eflags: ExecFlags,
) -> bool {
    if pos == search_start {
        return !eflags.contains(ExecFlags::NOTBOL);
    }
    prog.newline_sensitive() && text.as_bytes()[pos - 1] == b'\n'
}

/// Whether `$` holds at `pos`.
#[inline]
pub(crate) fn eol_at(prog: &Program, text: &str, pos: usize, eflags: ExecFlags) -> bool {
    if pos == text.len() {
        return !eflags.contains(ExecFlags::NOTEOL);
    }
    prog.newline_sensitive() && text.as_bytes()[pos] == b'\n'
}

/// Assemble the public result from a completed search's slot array.
pub(crate) fn build_match(prog: &Program, slots: &Slots) -> Match {
    let span = Span { start: slots[0], end: slots[1] };
    let groups = (1..=prog.ngroups)
        .map(|i| {
            let (s, e) = (slots[2 * i], slots[2 * i + 1]);
            if s == SLOT_NONE || e == SLOT_NONE {
                None
            } else {
                Some(Span { start: s, end: e })
            }
        })
        .collect::<Vec<_>>()
        .into_boxed_slice();
    Match::new(span, groups)
}
