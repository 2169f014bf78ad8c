//! The compiled pattern representation.
//!
//! A parsed tree is lowered into a flat instruction sequence executed by the
//! matchers in `exec`. Control flow is explicit (`Split`/`Jmp` with
//! instruction indices), capture boundaries are recorded by `Save`
//! instructions writing into slot arrays, and character sets are interned
//! once per program so matcher threads carry only small indices.

mod compile;

pub(crate) use compile::compile;

use crate::flags::CompileFlags;
use crate::syntax::ClassSet;

/// Index of an instruction within a program.
pub(crate) type InstIdx = u32;

/// Index of an interned character class.
pub(crate) type ClassIdx = u32;

/// Sentinel for "no slot value recorded".
pub(crate) const SLOT_NONE: usize = usize::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Inst {
    /// Match one character from the interned class, consume it.
    Class(ClassIdx),
    /// Match any character, consume it. Only emitted when the pattern is not
    /// newline-sensitive; otherwise dots lower to a `Class` excluding `\n`.
    AnyChar,
    /// Assert start of line/subject; consumes nothing.
    Bol,
    /// Assert end of line/subject; consumes nothing.
    Eol,
    /// Record the current input position into the slot.
    Save(u16),
    /// Try `prefer` first, fall back to `alt`.
    Split { prefer: InstIdx, alt: InstIdx },
    Jmp(InstIdx),
    /// Match the text captured by the group (backtracking strategy only).
    Backref(u8),
    /// The whole pattern has matched.
    Match,
}

/// An immutable compiled pattern: instructions plus everything the matchers
/// need to run them. Never mutated after compilation; safe to share across
/// concurrent match calls.
#[derive(Debug, Clone)]
pub(crate) struct Program {
    pub insts: Vec<Inst>,
    pub classes: Vec<ClassSet>,
    /// Number of capture slots (two per reported group, including group 0).
    pub nslots: usize,
    /// Reported capture-group count (0 under `NOSUB`).
    pub ngroups: usize,
    pub has_backrefs: bool,
    /// Whether any quantifier in the program is lazy; switches the Pike
    /// matcher from leftmost-longest to leftmost-first semantics.
    pub has_lazy: bool,
    pub flags: CompileFlags,
}

impl Program {
    #[inline]
    pub(crate) fn icase(&self) -> bool {
        self.flags.contains(CompileFlags::ICASE)
    }

    #[inline]
    pub(crate) fn newline_sensitive(&self) -> bool {
        self.flags.contains(CompileFlags::NEWLINE)
    }

    #[inline]
    pub(crate) fn class(&self, idx: ClassIdx) -> &ClassSet {
        &self.classes[idx as usize]
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.insts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileErrorKind;
    use crate::syntax::parse;

    fn prog(pattern: &str, flags: CompileFlags) -> Program {
        let parsed = parse(pattern, flags).unwrap();
        compile(&parsed, flags).unwrap()
    }

    #[test]
    fn wraps_pattern_in_slot_zero() {
        let p = prog("a", CompileFlags::EXTENDED);
        assert_eq!(p.insts.first(), Some(&Inst::Save(0)));
        assert!(matches!(p.insts[p.insts.len() - 2], Inst::Save(1)));
        assert_eq!(p.insts.last(), Some(&Inst::Match));
        assert_eq!(p.nslots, 2);
        assert_eq!(p.ngroups, 0);
    }

    #[test]
    fn groups_allocate_slots() {
        let p = prog("a(b)(c)", CompileFlags::EXTENDED);
        assert_eq!(p.ngroups, 2);
        assert_eq!(p.nslots, 6);
        assert!(p.insts.contains(&Inst::Save(2)));
        assert!(p.insts.contains(&Inst::Save(5)));
    }

    #[test]
    fn nosub_drops_group_slots() {
        let p = prog("a(b)(c)", CompileFlags::EXTENDED | CompileFlags::NOSUB);
        assert_eq!(p.ngroups, 0);
        assert_eq!(p.nslots, 2);
        assert!(!p.insts.contains(&Inst::Save(2)));
    }

    #[test]
    fn identical_classes_are_interned_once() {
        let p = prog("[ab]x[ab]", CompileFlags::EXTENDED);
        let class_insts: Vec<_> = p
            .insts
            .iter()
            .filter_map(|i| match i {
                Inst::Class(c) => Some(*c),
                _ => None,
            })
            .collect();
        assert_eq!(class_insts.len(), 3);
        assert_eq!(class_insts[0], class_insts[2]);
        assert_ne!(class_insts[0], class_insts[1]);
    }

    #[test]
    fn dot_is_anychar_unless_newline_sensitive() {
        let p = prog(".", CompileFlags::EXTENDED);
        assert!(p.insts.contains(&Inst::AnyChar));

        let p = prog(".", CompileFlags::EXTENDED | CompileFlags::NEWLINE);
        assert!(!p.insts.contains(&Inst::AnyChar));
        let Some(Inst::Class(idx)) = p.insts.iter().find(|i| matches!(i, Inst::Class(_))) else {
            panic!("expected a class instruction");
        };
        assert!(!p.class(*idx).contains('\n'));
        assert!(p.class(*idx).contains('x'));
    }

    #[test]
    fn backrefs_are_flagged() {
        let p = prog(r"(a)\1", CompileFlags::EXTENDED);
        assert!(p.has_backrefs);
        assert!(p.insts.contains(&Inst::Backref(1)));
    }

    #[test]
    fn lazy_quantifiers_are_flagged() {
        assert!(!prog("a*", CompileFlags::EXTENDED).has_lazy);
        assert!(prog("a*?", CompileFlags::EXTENDED).has_lazy);
        assert!(prog("a*", CompileFlags::EXTENDED | CompileFlags::UNGREEDY).has_lazy);
    }

    #[test]
    fn oversized_expansion_is_rejected() {
        let parsed = parse(
            "((((a{250}){250}){250}){250})",
            CompileFlags::EXTENDED,
        )
        .unwrap();
        let err = compile(&parsed, CompileFlags::EXTENDED).unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::TooComplex);
    }
}
