//! Edit-cost model for approximate matching.
//!
//! A [`CostModel`] carries per-operation edit costs and ceilings. It is a
//! plain value object constructed fresh per call and never retained by the
//! engine.
//!
//! Zero-default resolution is explicit: a model whose fields are all zero
//! means "no edits allowed" and is exactly equivalent to exact matching.
//! In any other model, a zero ceiling means "unconstrained for that
//! dimension" and a zero cost resolves to the conventional per-edit weight
//! of 1, so callers set only the fields they care about.

/// Per-edit-operation costs and budget ceilings for an approximate search.
///
/// Field names mirror the conventional approximate-regex parameter block:
/// `cost_*` are the weights added to the total cost per edit of that kind,
/// and `max_*` are independent admissibility ceilings that must all hold
/// simultaneously.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CostModel {
    /// Cost of one inserted character (present in the text, absent from the
    /// pattern).
    pub cost_ins: u32,
    /// Cost of one deleted character (required by the pattern, absent from
    /// the text).
    pub cost_del: u32,
    /// Cost of one substituted character.
    pub cost_subst: u32,
    /// Ceiling on the total weighted cost.
    pub max_cost: u32,
    /// Ceiling on the number of insertions.
    pub max_ins: u32,
    /// Ceiling on the number of deletions.
    pub max_del: u32,
    /// Ceiling on the number of substitutions.
    pub max_subst: u32,
    /// Ceiling on the total number of edits of any kind.
    pub max_err: u32,
}

/// A cost model with every zero ceiling resolved to its effective value.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ResolvedCosts {
    pub cost_ins: u32,
    pub cost_del: u32,
    pub cost_subst: u32,
    pub max_cost: u32,
    pub max_ins: u32,
    pub max_del: u32,
    pub max_subst: u32,
    pub max_err: u32,
}

impl CostModel {
    /// True if this model permits no edits at all, making an approximate
    /// search boundary-identical to an exact one.
    pub fn is_exact(&self) -> bool {
        *self == CostModel::default()
    }

    /// Resolve zero ceilings to "unlimited" and zero costs to weight 1.
    /// Only meaningful when `!self.is_exact()`; the all-zero model
    /// short-circuits to the exact matcher before resolution.
    pub(crate) fn resolve(&self) -> ResolvedCosts {
        fn ceiling(v: u32) -> u32 {
            if v == 0 {
                u32::MAX
            } else {
                v
            }
        }
        fn weight(v: u32) -> u32 {
            if v == 0 {
                1
            } else {
                v
            }
        }
        ResolvedCosts {
            cost_ins: weight(self.cost_ins),
            cost_del: weight(self.cost_del),
            cost_subst: weight(self.cost_subst),
            max_cost: ceiling(self.max_cost),
            max_ins: ceiling(self.max_ins),
            max_del: ceiling(self.max_del),
            max_subst: ceiling(self.max_subst),
            max_err: ceiling(self.max_err),
        }
    }
}

impl ResolvedCosts {
    /// Whether a state with the given counters is still within every ceiling.
    #[inline]
    pub(crate) fn admits(&self, cost: u32, ins: u32, del: u32, subst: u32) -> bool {
        cost <= self.max_cost
            && ins <= self.max_ins
            && del <= self.max_del
            && subst <= self.max_subst
            && ins.saturating_add(del).saturating_add(subst) <= self.max_err
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_model_is_exact() {
        assert!(CostModel::default().is_exact());
        let m = CostModel {
            max_err: 1,
            ..CostModel::default()
        };
        assert!(!m.is_exact());
    }

    #[test]
    fn zero_ceilings_resolve_to_unlimited() {
        let m = CostModel {
            cost_subst: 1,
            max_err: 2,
            ..CostModel::default()
        };
        let r = m.resolve();
        assert_eq!(r.max_cost, u32::MAX);
        assert_eq!(r.max_ins, u32::MAX);
        assert_eq!(r.max_del, u32::MAX);
        assert_eq!(r.max_subst, u32::MAX);
        assert_eq!(r.max_err, 2);
        assert_eq!(r.cost_subst, 1);
        // unset costs take the conventional weight of 1
        assert_eq!(r.cost_ins, 1);
        assert_eq!(r.cost_del, 1);
    }

    #[test]
    fn admissibility_requires_every_ceiling() {
        let r = CostModel {
            cost_subst: 1,
            max_cost: 2,
            max_subst: 1,
            max_err: 2,
            ..CostModel::default()
        }
        .resolve();
        assert!(r.admits(1, 0, 0, 1));
        // over max_subst even though cost and max_err hold
        assert!(!r.admits(2, 0, 0, 2));
        // over max_err via mixed edits
        assert!(!r.admits(2, 2, 0, 1));
    }
}
