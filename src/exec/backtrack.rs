//! Backtracking matcher for patterns with backreferences.
//!
//! Runs the same instruction program as the Pike matcher, but depth-first
//! with an explicit alternative stack and a slot-undo journal, which is what
//! a `Backref` needs (the captured text must be known when the reference is
//! reached). Semantics are leftmost-first: starts are tried left to right
//! and the first alternative that completes wins.
//!
//! The search carries a step budget; blowing it is reported as resource
//! exhaustion, and the pattern stays usable for later calls.

use crate::error::ExecError;
use crate::flags::ExecFlags;
use crate::program::{Inst, InstIdx, Program, SLOT_NONE};
use crate::result::Match;

use super::scratch::fresh_slots;
use super::{bol_at, build_match, eol_at};

/// Default step budget per call.
pub(crate) const STEP_LIMIT: usize = 1 << 20;

/// A pending alternative: resume at `pc`/`pos` after rolling the journal
/// back to `journal_len`.
struct Frame {
    pc: InstIdx,
    pos: usize,
    journal_len: usize,
}

pub(crate) fn find(
    prog: &Program,
    text: &str,
    start: usize,
    eflags: ExecFlags,
    step_limit: usize,
) -> Result<Option<Match>, ExecError> {
    let mut steps = 0usize;
    let mut s = start;
    loop {
        if let Some(m) = run_from(prog, text, start, s, eflags, &mut steps, step_limit)? {
            return Ok(Some(m));
        }
        match text[s..].chars().next() {
            Some(c) => s += c.len_utf8(),
            None => return Ok(None),
        }
    }
}

/// Try to match with the overall match pinned to start at `s`.
fn run_from(
    prog: &Program,
    text: &str,
    search_start: usize,
    s: usize,
    eflags: ExecFlags,
    steps: &mut usize,
    step_limit: usize,
) -> Result<Option<Match>, ExecError> {
    let mut slots = fresh_slots(prog.nslots);
    let mut journal: Vec<(u16, usize)> = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut pc: InstIdx = 0;
    let mut pos = s;

    loop {
        *steps += 1;
        if *steps > step_limit {
            return Err(ExecError::StepLimitExceeded);
        }

        let mut failed = false;
        match prog.insts[pc as usize] {
            Inst::Class(idx) => match text[pos..].chars().next() {
                Some(c) if prog.class(idx).matches(c, prog.icase()) => {
                    pos += c.len_utf8();
                    pc += 1;
                }
                _ => failed = true,
            },
            Inst::AnyChar => match text[pos..].chars().next() {
                Some(c) => {
                    pos += c.len_utf8();
                    pc += 1;
                }
                None => failed = true,
            },
            Inst::Bol => {
                if bol_at(prog, text, search_start, pos, eflags) {
                    pc += 1;
                } else {
                    failed = true;
                }
            }
            Inst::Eol => {
                if eol_at(prog, text, pos, eflags) {
                    pc += 1;
                } else {
                    failed = true;
                }
            }
            Inst::Save(slot) => {
                journal.push((slot, slots[slot as usize]));
                slots[slot as usize] = pos;
                pc += 1;
            }
            Inst::Jmp(t) => pc = t,
            Inst::Split { prefer, alt } => {
                stack.push(Frame { pc: alt, pos, journal_len: journal.len() });
                pc = prefer;
            }
            Inst::Backref(n) => {
                let g = n as usize;
                let (gs, ge) = (slots[2 * g], slots[2 * g + 1]);
                if gs == SLOT_NONE || ge == SLOT_NONE {
                    // a reference to a group that never matched matches the
                    // empty string
                    pc += 1;
                } else {
                    match backref_len(&text[gs..ge], &text[pos..], prog.icase()) {
                        Some(len) => {
                            pos += len;
                            pc += 1;
                        }
                        None => failed = true,
                    }
                }
            }
            Inst::Match => return Ok(Some(build_match(prog, &slots))),
        }

        if failed {
            match stack.pop() {
                Some(frame) => {
                    for (slot, old) in journal.drain(frame.journal_len..).rev() {
                        slots[slot as usize] = old;
                    }
                    pc = frame.pc;
                    pos = frame.pos;
                }
                None => return Ok(None),
            }
        }
    }
}

/// How many bytes of `haystack` the captured `needle` consumes, or `None`
/// if it does not match here.
fn backref_len(needle: &str, haystack: &str, icase: bool) -> Option<usize> {
    if !icase {
        return haystack.starts_with(needle).then_some(needle.len());
    }
    let mut consumed = 0;
    let mut hay = haystack.chars();
    for nc in needle.chars() {
        let hc = hay.next()?;
        if !fold_eq(nc, hc) {
            return None;
        }
        consumed += hc.len_utf8();
    }
    Some(consumed)
}

fn fold_eq(a: char, b: char) -> bool {
    if a == b {
        return true;
    }
    let fold = |c: char| {
        let mut lower = c.to_lowercase();
        if lower.len() == 1 {
            lower.next().unwrap()
        } else {
            c
        }
    };
    fold(a) == fold(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::CompileFlags;
    use crate::program::compile;
    use crate::result::Span;
    use crate::syntax::parse;

    fn run(pattern: &str, cflags: CompileFlags, text: &str, start: usize) -> Option<Match> {
        let parsed = parse(pattern, cflags).unwrap();
        let prog = compile(&parsed, cflags).unwrap();
        find(&prog, text, start, ExecFlags::empty(), STEP_LIMIT).unwrap()
    }

    const ERE: CompileFlags = CompileFlags::EXTENDED;

    #[test]
    fn simple_backref() {
        let m = run(r"(a+)\1", ERE, "xaaaa", 0).unwrap();
        // greedy (a+) first tries aaa, backs off to aa|aa
        assert_eq!(m.span(), Span { start: 1, end: 5 });
        assert_eq!(m.group(1), Some(Span { start: 1, end: 3 }));
    }

    #[test]
    fn backref_requires_equal_text() {
        assert!(run(r"(ab)\1", ERE, "abac", 0).is_none());
        let m = run(r"(ab)\1", ERE, "abab", 0).unwrap();
        assert_eq!(m.span(), Span { start: 0, end: 4 });
    }

    #[test]
    fn backref_to_unmatched_group_is_empty() {
        let m = run(r"(x)?ab\1", ERE, "ab", 0).unwrap();
        assert_eq!(m.span(), Span { start: 0, end: 2 });
        assert_eq!(m.group(1), None);
    }

    #[test]
    fn icase_backref_folds_case() {
        let m = run(r"(ab)\1", ERE | CompileFlags::ICASE, "aBAb", 0).unwrap();
        assert_eq!(m.span(), Span { start: 0, end: 4 });
    }

    #[test]
    fn leftmost_first_semantics() {
        // backtracking takes the first alternative that completes, not the
        // longest
        let m = run(r"(a|ab)\1?", ERE, "abab", 0).unwrap();
        assert_eq!(m.group(1), Some(Span { start: 0, end: 1 }));
    }

    #[test]
    fn step_limit_is_reported() {
        let parsed = parse(r"(a*)(a*)(a*)\3b", ERE).unwrap();
        let prog = compile(&parsed, ERE).unwrap();
        let text = "a".repeat(60);
        let err = find(&prog, &text, 0, ExecFlags::empty(), 500).unwrap_err();
        assert_eq!(err, ExecError::StepLimitExceeded);
    }

    #[test]
    fn bre_backref() {
        let m = run(r"\(a.\)x\1", CompileFlags::empty(), "abxab", 0).unwrap();
        assert_eq!(m.span(), Span { start: 0, end: 5 });
    }
}
