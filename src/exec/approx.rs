//! Cost-bounded approximate matcher.
//!
//! For each candidate start position, runs a best-first search over
//! (instruction, input position) states, accumulating edit counters. At a
//! consuming instruction the search may, besides stepping exactly for free:
//! substitute (consume an input character the instruction does not match),
//! insert (skip an input character), or delete (advance the pattern without
//! consuming input). Each move is admissible only while every resolved
//! ceiling still holds.
//!
//! Per (instruction, position) pair the search keeps the frontier of
//! non-dominated (cost, ins, del, subst) tuples and drops any state some
//! earlier state dominates. A cycle through the program returns with
//! counters >= in every component, so it is always dropped; the frontier is
//! an antichain and stays finite, which bounds the search for any finite
//! text and budgets.
//!
//! Tie-break: lowest cost, then leftmost start (starts are scanned left to
//! right and replace the best only on strictly lower cost), then longest
//! match (among equal-cost completions of one start the farthest end wins).

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::cost::ResolvedCosts;
use crate::error::ExecError;
use crate::flags::ExecFlags;
use crate::program::{Inst, InstIdx, Program};
use crate::result::{EditCounts, Match};

use super::scratch::{fresh_slots, Slots};
use super::{bol_at, build_match, eol_at};

/// Node budget per call, shared across all candidate starts.
pub(crate) const NODE_LIMIT: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Counts {
    cost: u32,
    ins: u32,
    del: u32,
    subst: u32,
}

impl Counts {
    const ZERO: Counts = Counts { cost: 0, ins: 0, del: 0, subst: 0 };

    fn dominates(&self, other: &Counts) -> bool {
        self.cost <= other.cost
            && self.ins <= other.ins
            && self.del <= other.del
            && self.subst <= other.subst
    }
}

struct Node {
    counts: Counts,
    /// FIFO order for equal costs keeps the pop order deterministic.
    seq: u64,
    pc: InstIdx,
    pos: usize,
    slots: Slots,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.counts.cost == other.counts.cost && self.seq == other.seq
    }
}

impl Eq for Node {}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed: BinaryHeap is a max-heap and the search wants the
        // cheapest (then oldest) node first
        other
            .counts
            .cost
            .cmp(&self.counts.cost)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// One completed match for a single start.
struct Completion {
    counts: Counts,
    end: usize,
    slots: Slots,
}

struct Search<'a> {
    prog: &'a Program,
    text: &'a str,
    search_start: usize,
    eflags: ExecFlags,
    costs: &'a ResolvedCosts,
    heap: BinaryHeap<Node>,
    frontier: FxHashMap<(InstIdx, usize), SmallVec<[Counts; 2]>>,
    seq: u64,
    nodes_left: usize,
}

impl<'a> Search<'a> {
    /// Queue a state unless a ceiling rejects it, the global bound makes it
    /// pointless, or an existing state dominates it.
    fn push(
        &mut self,
        pc: InstIdx,
        pos: usize,
        counts: Counts,
        slots: Slots,
        bound: Option<u32>,
    ) -> Result<(), ExecError> {
        if !self.costs.admits(counts.cost, counts.ins, counts.del, counts.subst) {
            return Ok(());
        }
        if let Some(bound) = bound {
            if counts.cost >= bound {
                return Ok(());
            }
        }
        let entry = self.frontier.entry((pc, pos)).or_default();
        if entry.iter().any(|have| have.dominates(&counts)) {
            return Ok(());
        }
        entry.retain(|have| !counts.dominates(have));
        entry.push(counts);

        if self.nodes_left == 0 {
            return Err(ExecError::SearchSpaceExceeded);
        }
        self.nodes_left -= 1;
        self.seq += 1;
        self.heap.push(Node { counts, seq: self.seq, pc, pos, slots });
        Ok(())
    }

    fn add(&self, counts: Counts, cost_delta: u32) -> Option<Counts> {
        let cost = counts.cost.checked_add(cost_delta)?;
        Some(Counts { cost, ..counts })
    }

    /// Best-first search for the cheapest (then longest) admissible match
    /// whose overall span starts at `s`. `bound` is the cost to beat from
    /// earlier starts; only strictly cheaper completions are reported.
    fn run(&mut self, s: usize, bound: Option<u32>) -> Result<Option<Completion>, ExecError> {
        self.heap.clear();
        self.frontier.clear();
        self.push(0, s, Counts::ZERO, fresh_slots(self.prog.nslots), bound)?;

        let mut best: Option<Completion> = None;
        while let Some(node) = self.heap.pop() {
            if let Some(ref b) = best {
                if node.counts.cost > b.counts.cost {
                    break;
                }
            }
            let Node { counts, pc, pos, slots, .. } = node;
            let local_bound = best.as_ref().map(|b| b.counts.cost.saturating_add(1)).or(bound);

            match self.prog.insts[pc as usize] {
                Inst::Jmp(t) => self.push(t, pos, counts, slots, local_bound)?,
                Inst::Split { prefer, alt } => {
                    self.push(prefer, pos, counts, slots.clone(), local_bound)?;
                    self.push(alt, pos, counts, slots, local_bound)?;
                }
                Inst::Save(slot) => {
                    let mut slots = slots;
                    slots[slot as usize] = pos;
                    self.push(pc + 1, pos, counts, slots, local_bound)?;
                }
                Inst::Bol => {
                    if bol_at(self.prog, self.text, self.search_start, pos, self.eflags) {
                        self.push(pc + 1, pos, counts, slots, local_bound)?;
                    }
                }
                Inst::Eol => {
                    if eol_at(self.prog, self.text, pos, self.eflags) {
                        self.push(pc + 1, pos, counts, slots, local_bound)?;
                    }
                }
                Inst::Class(_) | Inst::AnyChar => {
                    self.consuming_moves(pc, pos, counts, slots, local_bound)?;
                }
                Inst::Backref(_) => {
                    unreachable!("approximate search rejects backreferenced patterns")
                }
                Inst::Match => {
                    let longer = match best {
                        None => true,
                        Some(ref b) => counts.cost == b.counts.cost && pos > b.end,
                    };
                    if longer {
                        best = Some(Completion { counts, end: pos, slots });
                    }
                }
            }
        }
        Ok(best)
    }

    /// Exact step plus the three edit moves at a consuming instruction.
    fn consuming_moves(
        &mut self,
        pc: InstIdx,
        pos: usize,
        counts: Counts,
        slots: Slots,
        bound: Option<u32>,
    ) -> Result<(), ExecError> {
        let ch = self.text[pos..].chars().next();

        if let Some(c) = ch {
            let next = pos + c.len_utf8();
            let matched = match self.prog.insts[pc as usize] {
                Inst::Class(idx) => self.prog.class(idx).matches(c, self.prog.icase()),
                Inst::AnyChar => true,
                _ => unreachable!(),
            };
            if matched {
                self.push(pc + 1, next, counts, slots.clone(), bound)?;
            } else if let Some(c) = self.add(counts, self.costs.cost_subst) {
                // substitute: consume the character anyway
                let c = Counts { subst: c.subst + 1, ..c };
                self.push(pc + 1, next, c, slots.clone(), bound)?;
            }
            if let Some(c) = self.add(counts, self.costs.cost_ins) {
                // insert: the text has an extra character here
                let c = Counts { ins: c.ins + 1, ..c };
                self.push(pc, next, c, slots.clone(), bound)?;
            }
        }

        if let Some(c) = self.add(counts, self.costs.cost_del) {
            // delete: the text is missing the character this instruction
            // wants
            let c = Counts { del: c.del + 1, ..c };
            self.push(pc + 1, pos, c, slots, bound)?;
        }
        Ok(())
    }
}

/// Search from `start` for the best admissible match under the resolved
/// cost model.
pub(crate) fn find(
    prog: &Program,
    text: &str,
    start: usize,
    eflags: ExecFlags,
    costs: &ResolvedCosts,
) -> Result<Option<(Match, EditCounts)>, ExecError> {
    let mut search = Search {
        prog,
        text,
        search_start: start,
        eflags,
        costs,
        heap: BinaryHeap::new(),
        frontier: FxHashMap::default(),
        seq: 0,
        nodes_left: NODE_LIMIT,
    };

    let mut best: Option<Completion> = None;
    let mut s = start;
    loop {
        let bound = best.as_ref().map(|b| b.counts.cost);
        if bound == Some(0) {
            // a zero-cost match cannot be beaten, and it is leftmost
            break;
        }
        if let Some(found) = search.run(s, bound)? {
            best = Some(found);
        }
        match text[s..].chars().next() {
            Some(c) => s += c.len_utf8(),
            None => break,
        }
    }

    Ok(best.map(|b| {
        let m = build_match(prog, &b.slots);
        let edits = EditCounts {
            cost: b.counts.cost,
            num_ins: b.counts.ins,
            num_del: b.counts.del,
            num_subst: b.counts.subst,
        };
        (m, edits)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::CostModel;
    use crate::flags::CompileFlags;
    use crate::program::compile;
    use crate::result::Span;
    use crate::syntax::parse;

    const ERE: CompileFlags = CompileFlags::EXTENDED;

    fn run(
        pattern: &str,
        text: &str,
        start: usize,
        model: CostModel,
    ) -> Option<(Match, EditCounts)> {
        let parsed = parse(pattern, ERE).unwrap();
        let prog = compile(&parsed, ERE).unwrap();
        let costs = model.resolve();
        find(&prog, text, start, ExecFlags::empty(), &costs).unwrap()
    }

    fn subst_one() -> CostModel {
        CostModel { cost_subst: 1, max_cost: 1, max_err: 1, ..CostModel::default() }
    }

    #[test]
    fn single_substitution() {
        let (m, e) = run("abc", "abX", 0, subst_one()).unwrap();
        assert_eq!(m.span(), Span { start: 0, end: 3 });
        assert_eq!(e.cost, 1);
        assert_eq!(e.num_subst, 1);
        assert_eq!(e.num_ins, 0);
        assert_eq!(e.num_del, 0);
    }

    #[test]
    fn exact_match_costs_nothing() {
        let (m, e) = run("abc", "xabcx", 0, subst_one()).unwrap();
        assert_eq!(m.span(), Span { start: 1, end: 4 });
        assert_eq!(e, EditCounts::default());
    }

    #[test]
    fn single_insertion() {
        let model = CostModel { cost_ins: 1, max_cost: 1, max_err: 1, ..CostModel::default() };
        let (m, e) = run("abc", "abXc", 0, model).unwrap();
        assert_eq!(m.span(), Span { start: 0, end: 4 });
        assert_eq!(e.cost, 1);
        assert_eq!(e.num_ins, 1);
    }

    #[test]
    fn single_deletion() {
        let model = CostModel { cost_del: 1, max_cost: 1, max_err: 1, ..CostModel::default() };
        let (m, e) = run("abc", "ac", 0, model).unwrap();
        assert_eq!(m.span(), Span { start: 0, end: 2 });
        assert_eq!(e.cost, 1);
        assert_eq!(e.num_del, 1);
    }

    #[test]
    fn budget_exhaustion_is_no_match() {
        assert!(run("abc", "aXY", 0, subst_one()).is_none());
        assert!(run("abcd", "xyzw", 0, subst_one()).is_none());
    }

    #[test]
    fn per_operation_ceilings_bind_independently() {
        // substitutions and deletions priced out; the only route is two
        // insertions, so max_ins alone decides the outcome
        let base = CostModel {
            cost_ins: 1,
            cost_subst: 9,
            cost_del: 9,
            max_cost: 2,
            max_err: 2,
            ..CostModel::default()
        };
        let capped = CostModel { max_ins: 1, ..base };
        assert!(run("abc", "aXYbc", 0, capped).is_none());

        let roomy = CostModel { max_ins: 2, ..base };
        let (m, e) = run("abc", "aXYbc", 0, roomy).unwrap();
        assert_eq!(m.span(), Span { start: 0, end: 5 });
        assert_eq!((e.cost, e.num_ins), (2, 2));
    }

    #[test]
    fn cheapest_edit_combination_wins() {
        // substitution costs 2, delete+insert costs 1+1 but counts 2 edits
        let model = CostModel {
            cost_subst: 3,
            cost_del: 1,
            cost_ins: 1,
            max_cost: 2,
            max_err: 2,
            ..CostModel::default()
        };
        let (_, e) = run("abc", "aXc", 0, model).unwrap();
        assert_eq!(e.cost, 2);
        assert_eq!(e.num_subst, 0);
        assert_eq!((e.num_ins, e.num_del), (1, 1));
    }

    #[test]
    fn leftmost_among_equal_cost() {
        // both "aXc" spans admit cost-1 matches; the leftmost start wins
        let (m, e) = run("abc", "aXc aYc", 0, subst_one()).unwrap();
        assert_eq!(m.span(), Span { start: 0, end: 3 });
        assert_eq!(e.cost, 1);
    }

    #[test]
    fn cheaper_later_match_beats_closer_costlier_one() {
        let (m, e) = run("abc", "aXc abc", 0, subst_one()).unwrap();
        assert_eq!(m.span(), Span { start: 4, end: 7 });
        assert_eq!(e.cost, 0);
    }

    #[test]
    fn longest_among_equal_cost_at_one_start() {
        // both alternatives complete at cost 0 from offset 0; the longer
        // span wins the tie
        let (m, e) = run("ab.|ab", "abX", 0, subst_one()).unwrap();
        assert_eq!(m.span(), Span { start: 0, end: 3 });
        assert_eq!(e.cost, 0);
    }

    #[test]
    fn deletion_tie_loses_to_longer_substitution() {
        // deleting the final 'c' and substituting 'X' both cost 1; the
        // substitution match is longer and must be reported
        let (m, e) = run("abc", "abX", 0, subst_one()).unwrap();
        assert_eq!(m.span(), Span { start: 0, end: 3 });
        assert_eq!((e.num_subst, e.num_del), (1, 0));
    }

    #[test]
    fn groups_survive_edits() {
        let (m, e) = run("a(b+)c", "abbXc", 0, subst_one()).unwrap();
        assert_eq!(m.span(), Span { start: 0, end: 5 });
        assert_eq!(e.num_subst, 1);
        let g = m.group(1).unwrap();
        assert_eq!(g.start, 1);
    }

    #[test]
    fn unlimited_budget_terminates() {
        // every ceiling unconstrained; dominance pruning must still cut the
        // deletion cycle through the quantifier loop
        let model = CostModel { cost_del: 1, ..CostModel::default() };
        let (m, e) = run("a*b", "zzz", 0, model).unwrap();
        // cheapest completions cost 1; substituting 'z' for 'b' outlasts
        // deleting 'b'
        assert_eq!(m.span(), Span { start: 0, end: 1 });
        assert_eq!(e.cost, 1);
        assert_eq!(e.num_subst, 1);
    }

    #[test]
    fn anchors_cannot_be_edited_away() {
        let model = CostModel { cost_subst: 1, max_cost: 9, max_err: 9, ..CostModel::default() };
        let parsed = parse("^abc", ERE).unwrap();
        let prog = compile(&parsed, ERE).unwrap();
        let costs = model.resolve();
        let got = find(&prog, "xabc", 1, ExecFlags::NOTBOL, &costs).unwrap();
        assert!(got.is_none());
    }

    #[test]
    fn monotonic_in_budget() {
        let tight = CostModel { cost_subst: 1, max_cost: 1, max_err: 1, ..CostModel::default() };
        let wide = CostModel { cost_subst: 1, max_cost: 2, max_err: 2, ..CostModel::default() };
        let (_, e1) = run("abcd", "abXd", 0, tight).unwrap();
        let (_, e2) = run("abcd", "abXd", 0, wide).unwrap();
        assert_eq!(e1.cost, 1);
        // widening the ceilings must not raise the best cost
        assert!(e2.cost <= e1.cost);
    }
}
