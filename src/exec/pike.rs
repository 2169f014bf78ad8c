//! Thread-simulation matcher for backreference-free patterns.
//!
//! Classic Pike construction: two thread generations advance in lockstep
//! over the input, each thread carrying its own capture slots. Epsilon
//! closure resolves `Split`/`Jmp`/`Save` and the position assertions at add
//! time, marking every reached instruction so quantifier cycles terminate.
//!
//! Unanchored search seeds one new thread per input position (after the
//! surviving threads, so earlier starts keep priority) until a candidate
//! exists. Fully greedy programs get POSIX leftmost-longest semantics: the
//! scan keeps running after a candidate is found and replaces it only with
//! an earlier-starting or longer match. Programs with lazy quantifiers run
//! leftmost-first instead: the first match in priority order wins and kills
//! the lower-priority threads.

use crate::flags::ExecFlags;
use crate::program::{Inst, InstIdx, Program};
use crate::result::Match;

use super::scratch::{fresh_slots, Scratch, Slots, ThreadList};
use super::{bol_at, build_match, eol_at};

struct Ctx<'a> {
    prog: &'a Program,
    text: &'a str,
    search_start: usize,
    eflags: ExecFlags,
}

/// Epsilon closure from `pc` at input position `pos`.
fn add_thread(ctx: &Ctx<'_>, list: &mut ThreadList, pc: InstIdx, pos: usize, slots: Slots) {
    let mut stack: Vec<(InstIdx, Slots)> = vec![(pc, slots)];
    while let Some((pc, mut slots)) = stack.pop() {
        if !list.mark(pc) {
            continue;
        }
        match ctx.prog.insts[pc as usize] {
            Inst::Jmp(t) => stack.push((t, slots)),
            Inst::Split { prefer, alt } => {
                // `prefer` is pushed last so it is explored first.
                stack.push((alt, slots.clone()));
                stack.push((prefer, slots));
            }
            Inst::Save(s) => {
                slots[s as usize] = pos;
                stack.push((pc + 1, slots));
            }
            Inst::Bol => {
                if bol_at(ctx.prog, ctx.text, ctx.search_start, pos, ctx.eflags) {
                    stack.push((pc + 1, slots));
                }
            }
            Inst::Eol => {
                if eol_at(ctx.prog, ctx.text, pos, ctx.eflags) {
                    stack.push((pc + 1, slots));
                }
            }
            Inst::Class(_) | Inst::AnyChar | Inst::Match => list.push_thread(pc, slots),
            Inst::Backref(_) => {
                unreachable!("backreferenced patterns use the backtracking matcher")
            }
        }
    }
}

/// Run the program over `text` from `start`. Returns the best match under
/// the program's semantics, or `None`.
pub(crate) fn find(
    prog: &Program,
    text: &str,
    start: usize,
    eflags: ExecFlags,
    scratch: &mut Scratch,
) -> Option<Match> {
    scratch.reset();
    let ctx = Ctx { prog, text, search_start: start, eflags };
    let leftmost_first = prog.has_lazy;
    let clist = &mut scratch.clist;
    let nlist = &mut scratch.nlist;

    // (start, end, slots) of the best candidate so far
    let mut best: Option<(usize, usize, Slots)> = None;
    let mut pos = start;
    loop {
        let ch = text[pos..].chars().next();

        if best.is_none() {
            add_thread(&ctx, clist, 0, pos, fresh_slots(prog.nslots));
        }

        let mut i = 0;
        while i < clist.len() {
            let (pc, slots) = clist.thread(i);
            match prog.insts[pc as usize] {
                Inst::Class(idx) => {
                    if let Some(c) = ch {
                        if prog.class(idx).matches(c, prog.icase()) {
                            let slots = slots.clone();
                            add_thread(&ctx, nlist, pc + 1, pos + c.len_utf8(), slots);
                        }
                    }
                }
                Inst::AnyChar => {
                    if let Some(c) = ch {
                        let slots = slots.clone();
                        add_thread(&ctx, nlist, pc + 1, pos + c.len_utf8(), slots);
                    }
                }
                Inst::Match => {
                    let (s, e) = (slots[0], pos);
                    if leftmost_first {
                        // kill the lower-priority threads at this position
                        best = Some((s, e, slots.clone()));
                        break;
                    }
                    let better = match &best {
                        None => true,
                        Some((bs, be, _)) => s < *bs || (s == *bs && e > *be),
                    };
                    if better {
                        best = Some((s, e, slots.clone()));
                    }
                }
                _ => unreachable!("closure leaves only runnable instructions"),
            }
            i += 1;
        }

        match ch {
            None => break,
            Some(c) => pos += c.len_utf8(),
        }
        std::mem::swap(clist, nlist);
        nlist.clear();
        if clist.is_empty() && best.is_some() {
            break;
        }
    }

    best.map(|(_, _, slots)| build_match(prog, &slots))
}
