//! Lowering the parsed tree into an instruction program.
//!
//! Thompson construction with forward emission: quantifiers emit `Split`
//! instructions whose targets are patched once the body length is known.
//! Greedy quantifiers prefer the body arm, lazy ones the exit arm. Bounded
//! repetitions expand into required copies followed by optional copies.

use rustc_hash::FxHashMap;

use crate::error::{CompileError, CompileErrorKind};
use crate::flags::CompileFlags;
use crate::syntax::{Alternation, Branch, ClassSet, ParsedPattern, QuantifiedTerm, Term};

use super::{ClassIdx, Inst, InstIdx, Program};

/// Instruction ceiling; expansion past this is a compile error rather than a
/// runaway allocation.
const MAX_PROGRAM: usize = 1 << 16;

struct Compiler {
    insts: Vec<Inst>,
    classes: Vec<ClassSet>,
    class_index: FxHashMap<ClassSet, ClassIdx>,
    flags: CompileFlags,
    /// Strip group `Save` instructions entirely (NOSUB without backrefs).
    strip_saves: bool,
    has_lazy: bool,
}

impl Compiler {
    fn new(flags: CompileFlags, strip_saves: bool) -> Self {
        Compiler {
            insts: Vec::new(),
            classes: Vec::new(),
            class_index: FxHashMap::default(),
            flags,
            strip_saves,
            has_lazy: false,
        }
    }

    fn emit(&mut self, inst: Inst) -> Result<InstIdx, CompileError> {
        if self.insts.len() >= MAX_PROGRAM {
            return Err(CompileError { kind: CompileErrorKind::TooComplex, offset: 0 });
        }
        self.insts.push(inst);
        Ok((self.insts.len() - 1) as InstIdx)
    }

    fn loc(&self) -> InstIdx {
        self.insts.len() as InstIdx
    }

    fn patch_split_alt(&mut self, idx: InstIdx, target: InstIdx) {
        if let Inst::Split { alt, .. } = &mut self.insts[idx as usize] {
            *alt = target;
        }
    }

    fn patch_split_prefer(&mut self, idx: InstIdx, target: InstIdx) {
        if let Inst::Split { prefer, .. } = &mut self.insts[idx as usize] {
            *prefer = target;
        }
    }

    fn patch_jmp(&mut self, idx: InstIdx, target: InstIdx) {
        if let Inst::Jmp(t) = &mut self.insts[idx as usize] {
            *t = target;
        }
    }

    fn intern(&mut self, set: ClassSet) -> ClassIdx {
        if let Some(&idx) = self.class_index.get(&set) {
            return idx;
        }
        let idx = self.classes.len() as ClassIdx;
        self.classes.push(set.clone());
        self.class_index.insert(set, idx);
        idx
    }

    fn emit_alternation(&mut self, alt: &Alternation) -> Result<(), CompileError> {
        if alt.len() == 1 {
            return self.emit_branch(&alt[0]);
        }
        let mut jmp_holes = Vec::with_capacity(alt.len() - 1);
        for (i, branch) in alt.iter().enumerate() {
            if i + 1 < alt.len() {
                let split = self.emit(Inst::Split { prefer: 0, alt: 0 })?;
                let body = self.loc();
                self.patch_split_prefer(split, body);
                self.emit_branch(branch)?;
                jmp_holes.push(self.emit(Inst::Jmp(0))?);
                let next = self.loc();
                self.patch_split_alt(split, next);
            } else {
                self.emit_branch(branch)?;
            }
        }
        let end = self.loc();
        for hole in jmp_holes {
            self.patch_jmp(hole, end);
        }
        Ok(())
    }

    fn emit_branch(&mut self, branch: &Branch) -> Result<(), CompileError> {
        for qt in branch {
            self.emit_repeat(qt)?;
        }
        Ok(())
    }

    fn emit_repeat(&mut self, qt: &QuantifiedTerm) -> Result<(), CompileError> {
        match (qt.min, qt.max) {
            (1, Some(1)) => self.emit_term(&qt.term),
            (0, Some(0)) => Ok(()),
            (0, Some(1)) => self.emit_optional(&qt.term, qt.greedy),
            (0, None) => self.emit_star(&qt.term, qt.greedy),
            (1, None) => self.emit_plus(&qt.term, qt.greedy),
            (n, None) => {
                for _ in 0..n - 1 {
                    self.emit_term(&qt.term)?;
                }
                self.emit_plus(&qt.term, qt.greedy)
            }
            (n, Some(m)) => {
                for _ in 0..n {
                    self.emit_term(&qt.term)?;
                }
                for _ in n..m {
                    self.emit_optional(&qt.term, qt.greedy)?;
                }
                Ok(())
            }
        }
    }

    fn note_laziness(&mut self, greedy: bool) {
        if !greedy {
            self.has_lazy = true;
        }
    }

    fn emit_optional(&mut self, term: &Term, greedy: bool) -> Result<(), CompileError> {
        self.note_laziness(greedy);
        let split = self.emit(Inst::Split { prefer: 0, alt: 0 })?;
        let body = self.loc();
        self.emit_term(term)?;
        let after = self.loc();
        if greedy {
            self.patch_split_prefer(split, body);
            self.patch_split_alt(split, after);
        } else {
            self.patch_split_prefer(split, after);
            self.patch_split_alt(split, body);
        }
        Ok(())
    }

    fn emit_star(&mut self, term: &Term, greedy: bool) -> Result<(), CompileError> {
        self.note_laziness(greedy);
        let split = self.emit(Inst::Split { prefer: 0, alt: 0 })?;
        let body = self.loc();
        self.emit_term(term)?;
        self.emit(Inst::Jmp(split))?;
        let after = self.loc();
        if greedy {
            self.patch_split_prefer(split, body);
            self.patch_split_alt(split, after);
        } else {
            self.patch_split_prefer(split, after);
            self.patch_split_alt(split, body);
        }
        Ok(())
    }

    fn emit_plus(&mut self, term: &Term, greedy: bool) -> Result<(), CompileError> {
        self.note_laziness(greedy);
        let body = self.loc();
        self.emit_term(term)?;
        let split = self.emit(Inst::Split { prefer: 0, alt: 0 })?;
        let after = self.loc();
        if greedy {
            self.patch_split_prefer(split, body);
            self.patch_split_alt(split, after);
        } else {
            self.patch_split_prefer(split, after);
            self.patch_split_alt(split, body);
        }
        Ok(())
    }

    fn emit_term(&mut self, term: &Term) -> Result<(), CompileError> {
        match term {
            Term::Class(set) => {
                let idx = self.intern(set.clone());
                self.emit(Inst::Class(idx))?;
            }
            Term::Dot => {
                if self.flags.contains(CompileFlags::NEWLINE) {
                    let set = ClassSet::negated_from_ranges(Vec::new(), true);
                    let idx = self.intern(set);
                    self.emit(Inst::Class(idx))?;
                } else {
                    self.emit(Inst::AnyChar)?;
                }
            }
            Term::Bol => {
                self.emit(Inst::Bol)?;
            }
            Term::Eol => {
                self.emit(Inst::Eol)?;
            }
            Term::Group { index, inner } => {
                if self.strip_saves {
                    self.emit_alternation(inner)?;
                } else {
                    self.emit(Inst::Save((index * 2) as u16))?;
                    self.emit_alternation(inner)?;
                    self.emit(Inst::Save((index * 2 + 1) as u16))?;
                }
            }
            Term::Backref(n) => {
                self.emit(Inst::Backref(*n as u8))?;
            }
        }
        Ok(())
    }
}

/// Compile a parsed pattern into a program.
pub(crate) fn compile(parsed: &ParsedPattern, flags: CompileFlags) -> Result<Program, CompileError> {
    let nosub = flags.contains(CompileFlags::NOSUB);
    // Back-references still need their group boundaries recorded even when
    // spans are not reported.
    let strip_saves = nosub && !parsed.has_backrefs;

    let mut c = Compiler::new(flags, strip_saves);
    c.emit(Inst::Save(0))?;
    c.emit_alternation(&parsed.root)?;
    c.emit(Inst::Save(1))?;
    c.emit(Inst::Match)?;

    let nslots = if strip_saves {
        2
    } else {
        2 * (parsed.group_count as usize + 1)
    };
    Ok(Program {
        insts: c.insts,
        classes: c.classes,
        nslots,
        ngroups: if nosub { 0 } else { parsed.group_count as usize },
        has_backrefs: parsed.has_backrefs,
        has_lazy: c.has_lazy,
        flags,
    })
}
