//! Pattern parsing for the POSIX extended, basic, and literal dialects.
//!
//! This module parses pattern strings into a tree structure for program
//! construction. Extended syntax supports:
//! - `.` matches any character
//! - `[...]` character classes with ranges and `[:name:]` POSIX classes
//! - `[^...]` negated character classes
//! - `|` alternation
//! - `(...)` capturing groups
//! - `?` `+` `*` and `{n,m}` quantifiers, with lazy `?`-suffixed forms
//! - `^` and `$` anchors
//! - `\1`..`\9` back-references
//!
//! Basic syntax uses `\(...\)` groups and `\{n,m\}` bounds, treats
//! `+ ? | ( ) {` as literals, and interprets `^`/`$` contextually. The
//! literal dialect has no special characters at all.

use crate::error::{CompileError, CompileErrorKind};
use crate::flags::CompileFlags;

/// Highest value allowed in a `{n,m}` bound (POSIX RE_DUP_MAX).
pub(crate) const DUP_MAX: u32 = 255;

/// Deepest group nesting accepted before the pattern is rejected as too
/// complex.
const MAX_NESTING: usize = 128;

const SURROGATE_START: u32 = 0xD800;
const SURROGATE_END: u32 = 0xDFFF;
const RUNE_MAX: u32 = 0x10FFFF;

/// A set of character ranges, negation already resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub(crate) struct ClassSet {
    /// Sorted, non-overlapping inclusive ranges.
    ranges: Vec<(char, char)>,
}

impl ClassSet {
    pub(crate) fn single(c: char) -> Self {
        ClassSet { ranges: vec![(c, c)] }
    }

    pub(crate) fn from_ranges(ranges: Vec<(char, char)>) -> Self {
        ClassSet { ranges: simplify_ranges(ranges) }
    }

    /// Everything NOT in `ranges`; with `keep_newline_out` the inversion
    /// also excludes `\n` (newline-sensitive negated classes).
    pub(crate) fn negated_from_ranges(mut ranges: Vec<(char, char)>, keep_newline_out: bool) -> Self {
        if keep_newline_out {
            ranges.push(('\n', '\n'));
        }
        ClassSet { ranges: invert_ranges(simplify_ranges(ranges)) }
    }

    /// Membership without case folding.
    #[inline]
    pub(crate) fn contains(&self, c: char) -> bool {
        self.ranges
            .binary_search_by(|&(lo, hi)| {
                if c < lo {
                    std::cmp::Ordering::Greater
                } else if c > hi {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    /// Membership, folding `c` through its simple case variants when
    /// `icase` is set.
    pub(crate) fn matches(&self, c: char, icase: bool) -> bool {
        if self.contains(c) {
            return true;
        }
        if !icase {
            return false;
        }
        let mut lower = c.to_lowercase();
        if lower.len() == 1 {
            let l = lower.next().unwrap();
            if l != c && self.contains(l) {
                return true;
            }
        }
        let mut upper = c.to_uppercase();
        if upper.len() == 1 {
            let u = upper.next().unwrap();
            if u != c && self.contains(u) {
                return true;
            }
        }
        false
    }

    #[cfg(test)]
    pub(crate) fn ranges(&self) -> &[(char, char)] {
        &self.ranges
    }
}

/// Sort and merge overlapping or adjacent ranges.
fn simplify_ranges(mut ranges: Vec<(char, char)>) -> Vec<(char, char)> {
    if ranges.is_empty() {
        return ranges;
    }
    ranges.sort_by_key(|r| r.0);
    let mut out: Vec<(char, char)> = Vec::with_capacity(ranges.len());
    let mut current = ranges[0];
    for next in ranges.into_iter().skip(1) {
        if next.0 as u32 > current.1 as u32 + 1 {
            out.push(current);
            current = next;
            continue;
        }
        if next.1 > current.1 {
            current.1 = next.1;
        }
    }
    out.push(current);
    out
}

/// Push `[start, end]` as char ranges, splitting around the surrogate gap.
fn push_gap(out: &mut Vec<(char, char)>, start: u32, end: u32) {
    if start > end {
        return;
    }
    if start < SURROGATE_START && end >= SURROGATE_START {
        push_gap(out, start, SURROGATE_START - 1);
        push_gap(out, SURROGATE_END + 1, end);
        return;
    }
    if (SURROGATE_START..=SURROGATE_END).contains(&start) {
        push_gap(out, SURROGATE_END + 1, end);
        return;
    }
    if let (Some(lo), Some(hi)) = (char::from_u32(start), char::from_u32(end.min(RUNE_MAX))) {
        out.push((lo, hi));
    }
}

/// Invert a simplified range list over the full scalar-value space.
fn invert_ranges(ranges: Vec<(char, char)>) -> Vec<(char, char)> {
    let mut out = Vec::with_capacity(ranges.len() + 1);
    let mut point: u32 = 0;
    for (lo, hi) in &ranges {
        let lo = *lo as u32;
        if lo > point {
            push_gap(&mut out, point, lo - 1);
        }
        point = *hi as u32 + 1;
    }
    if point <= RUNE_MAX {
        push_gap(&mut out, point, RUNE_MAX);
    }
    out
}

/// One atom of a branch together with its repetition.
#[derive(Debug, Clone)]
pub(crate) struct QuantifiedTerm {
    pub term: Term,
    pub min: u32,
    /// `None` means unbounded.
    pub max: Option<u32>,
    pub greedy: bool,
}

impl QuantifiedTerm {
    fn once(term: Term) -> Self {
        QuantifiedTerm { term, min: 1, max: Some(1), greedy: true }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Term {
    /// Match one character from the set.
    Class(ClassSet),
    /// Match any character (newline handling resolved at program build).
    Dot,
    /// Assert line/subject start.
    Bol,
    /// Assert line/subject end.
    Eol,
    /// A numbered capturing group.
    Group { index: u32, inner: Alternation },
    /// Match the text most recently captured by the group.
    Backref(u32),
}

/// A sequence of quantified terms.
pub(crate) type Branch = Vec<QuantifiedTerm>;

/// Alternatives separated by `|`.
pub(crate) type Alternation = Vec<Branch>;

/// The output of a successful parse.
#[derive(Debug, Clone)]
pub(crate) struct ParsedPattern {
    pub root: Alternation,
    pub group_count: u32,
    pub has_backrefs: bool,
}

/// Parser state.
struct Parser<'p> {
    pattern: &'p str,
    index: usize,
    last_index: usize,
    flags: CompileFlags,
    group_count: u32,
    /// Groups fully parsed so far; a back-reference is valid only once its
    /// target has closed.
    closed_groups: Vec<u32>,
    has_backrefs: bool,
}

impl<'p> Parser<'p> {
    fn new(pattern: &'p str, flags: CompileFlags) -> Self {
        Parser {
            pattern,
            index: 0,
            last_index: 0,
            flags,
            group_count: 0,
            closed_groups: Vec::new(),
            has_backrefs: false,
        }
    }

    fn err(&self, kind: CompileErrorKind) -> CompileError {
        CompileError { kind, offset: self.last_index }
    }

    fn err_at(&self, kind: CompileErrorKind, offset: usize) -> CompileError {
        CompileError { kind, offset }
    }

    fn is_empty(&self) -> bool {
        self.index >= self.pattern.len()
    }

    fn peek(&self) -> Option<char> {
        self.pattern[self.index..].chars().next()
    }

    fn next_rune(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.last_index = self.index;
        self.index += c.len_utf8();
        Some(c)
    }

    fn bypass_optional(&mut self, wanted: char) -> bool {
        if self.peek() == Some(wanted) {
            self.next_rune();
            true
        } else {
            false
        }
    }

    fn rest_starts_with(&self, s: &str) -> bool {
        self.pattern[self.index..].starts_with(s)
    }

    fn newline_sensitive(&self) -> bool {
        self.flags.contains(CompileFlags::NEWLINE)
    }

    fn default_greedy(&self) -> bool {
        !self.flags.contains(CompileFlags::UNGREEDY)
    }

    // ------------------------------------------------------------------
    // Extended dialect
    // ------------------------------------------------------------------

    fn parse_ere_alternation(&mut self, depth: usize) -> Result<Alternation, CompileError> {
        if depth > MAX_NESTING {
            return Err(self.err(CompileErrorKind::TooComplex));
        }
        let mut alternation = Vec::new();
        loop {
            alternation.push(self.parse_ere_branch(depth)?);
            match self.peek() {
                Some('|') => {
                    self.next_rune();
                }
                Some(')') if depth > 0 => return Ok(alternation),
                Some(')') => {
                    self.next_rune();
                    return Err(self.err(CompileErrorKind::UnbalancedParen));
                }
                None => return Ok(alternation),
                Some(_) => unreachable!("branch stops only at '|', ')' or end"),
            }
        }
    }

    fn parse_ere_branch(&mut self, depth: usize) -> Result<Branch, CompileError> {
        let mut branch = Vec::new();
        loop {
            match self.peek() {
                None | Some('|') | Some(')') => return Ok(branch),
                Some(_) => {
                    let term = self.parse_ere_term(depth)?;
                    let qt = self.parse_ere_quantifier(term)?;
                    branch.push(qt);
                }
            }
        }
    }

    fn parse_ere_term(&mut self, depth: usize) -> Result<Term, CompileError> {
        let c = self.next_rune().expect("caller checked for end");
        match c {
            '(' => {
                self.group_count += 1;
                let index = self.group_count;
                let inner = self.parse_ere_alternation(depth + 1)?;
                if !self.bypass_optional(')') {
                    return Err(self.err_at(CompileErrorKind::UnbalancedParen, self.index));
                }
                self.closed_groups.push(index);
                Ok(Term::Group { index, inner })
            }
            '[' => self.parse_class(),
            '.' => Ok(Term::Dot),
            '^' => Ok(Term::Bol),
            '$' => Ok(Term::Eol),
            '\\' => self.parse_ere_escape(),
            '*' | '+' | '?' => Err(self.err(CompileErrorKind::BadRepetition)),
            '{' => {
                // A bound with no atom; a literal `{` otherwise.
                if self.peek().is_some_and(|d| d.is_ascii_digit()) {
                    Err(self.err(CompileErrorKind::BadRepetition))
                } else {
                    Ok(Term::Class(ClassSet::single('{')))
                }
            }
            _ => Ok(Term::Class(ClassSet::single(c))),
        }
    }

    fn parse_ere_escape(&mut self) -> Result<Term, CompileError> {
        let c = match self.next_rune() {
            Some(c) => c,
            None => return Err(self.err(CompileErrorKind::BadEscape)),
        };
        match c {
            '1'..='9' => self.backref(c),
            'n' => Ok(Term::Class(ClassSet::single('\n'))),
            'r' => Ok(Term::Class(ClassSet::single('\r'))),
            't' => Ok(Term::Class(ClassSet::single('\t'))),
            'd' | 'D' | 'w' | 'W' | 's' | 'S' => Ok(Term::Class(self.perl_class(c))),
            c if c.is_alphanumeric() => Err(self.err(CompileErrorKind::BadEscape)),
            _ => Ok(Term::Class(ClassSet::single(c))),
        }
    }

    fn backref(&mut self, digit: char) -> Result<Term, CompileError> {
        let index = digit as u32 - '0' as u32;
        if !self.closed_groups.contains(&index) {
            return Err(self.err(CompileErrorKind::BadBackref));
        }
        self.has_backrefs = true;
        Ok(Term::Backref(index))
    }

    /// Shorthand classes in the `\d` family.
    fn perl_class(&self, c: char) -> ClassSet {
        let base = |negated: bool, ranges: Vec<(char, char)>| {
            if negated {
                ClassSet::negated_from_ranges(ranges, self.newline_sensitive())
            } else {
                ClassSet::from_ranges(ranges)
            }
        };
        match c {
            'd' => base(false, vec![('0', '9')]),
            'D' => base(true, vec![('0', '9')]),
            'w' => base(false, vec![('a', 'z'), ('A', 'Z'), ('0', '9'), ('_', '_')]),
            'W' => base(true, vec![('a', 'z'), ('A', 'Z'), ('0', '9'), ('_', '_')]),
            's' => base(false, vec![(' ', ' '), ('\t', '\t'), ('\n', '\n'), ('\r', '\r')]),
            'S' => base(true, vec![(' ', ' '), ('\t', '\t'), ('\n', '\n'), ('\r', '\r')]),
            _ => unreachable!(),
        }
    }

    fn parse_ere_quantifier(&mut self, term: Term) -> Result<QuantifiedTerm, CompileError> {
        let (min, max) = match self.peek() {
            Some('*') => {
                self.next_rune();
                (0, None)
            }
            Some('+') => {
                self.next_rune();
                (1, None)
            }
            Some('?') => {
                self.next_rune();
                (0, Some(1))
            }
            Some('{') if self.second_is_digit() => {
                self.next_rune();
                let (n, m) = self.parse_bound(false)?;
                (n, m)
            }
            _ => return Ok(QuantifiedTerm { greedy: self.default_greedy(), ..QuantifiedTerm::once(term) }),
        };
        if matches!(term, Term::Bol | Term::Eol) {
            return Err(self.err(CompileErrorKind::BadRepetition));
        }
        let mut greedy = self.default_greedy();
        if self.bypass_optional('?') {
            greedy = !greedy;
        }
        Ok(QuantifiedTerm { term, min, max, greedy })
    }

    fn second_is_digit(&self) -> bool {
        self.pattern[self.index..]
            .chars()
            .nth(1)
            .is_some_and(|c| c.is_ascii_digit())
    }

    /// Parse `n`, `n,` or `n,m` up to the closing brace (`}` in extended
    /// syntax, `\}` in basic). The opening brace is already consumed.
    fn parse_bound(&mut self, basic: bool) -> Result<(u32, Option<u32>), CompileError> {
        let open = self.last_index;
        let n = self.parse_bound_number(open)?;
        let (n, m) = if self.bypass_optional(',') {
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                (n, Some(self.parse_bound_number(open)?))
            } else {
                (n, None)
            }
        } else {
            (n, Some(n))
        };
        let closed = if basic {
            self.bypass_optional('\\') && self.bypass_optional('}')
        } else {
            self.bypass_optional('}')
        };
        if !closed {
            return Err(self.err_at(CompileErrorKind::BadBraceRepetition, open));
        }
        if let Some(m) = m {
            if n > m {
                return Err(self.err_at(CompileErrorKind::BadBraceRepetition, open));
            }
        }
        Ok((n, m))
    }

    fn parse_bound_number(&mut self, open: usize) -> Result<u32, CompileError> {
        let mut digits = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.next_rune();
            } else {
                break;
            }
        }
        if digits.is_empty() {
            return Err(self.err_at(CompileErrorKind::BadBraceRepetition, open));
        }
        let value: u32 = digits
            .parse()
            .map_err(|_| self.err_at(CompileErrorKind::BadBraceRepetition, open))?;
        if value > DUP_MAX {
            return Err(self.err_at(CompileErrorKind::BadBraceRepetition, open));
        }
        Ok(value)
    }

    // ------------------------------------------------------------------
    // Character classes (shared by both dialects)
    // ------------------------------------------------------------------

    fn parse_class(&mut self) -> Result<Term, CompileError> {
        let open = self.last_index;
        let negated = self.bypass_optional('^');
        let mut ranges: Vec<(char, char)> = Vec::new();
        let mut first = true;
        loop {
            let c = match self.next_rune() {
                Some(c) => c,
                None => return Err(self.err_at(CompileErrorKind::UnbalancedBracket, open)),
            };
            if c == ']' && !first {
                break;
            }
            first = false;
            if c == '[' && self.peek() == Some(':') {
                self.parse_named_class(&mut ranges)?;
                continue;
            }
            if c == '[' && matches!(self.peek(), Some('.') | Some('=')) {
                // Collating elements and equivalence classes need locale
                // tables; reject rather than mis-match.
                return Err(self.err(CompileErrorKind::BadCharClass));
            }
            let lo = c;
            // A trailing `-` and `-]` are literals; anything else after `-`
            // is a range endpoint.
            if self.peek() == Some('-') {
                let after = self.pattern[self.index..].chars().nth(1);
                match after {
                    Some(']') | None => {
                        ranges.push((lo, lo));
                        continue;
                    }
                    Some(_) => {
                        self.next_rune(); // the '-'
                        let hi = self.next_rune().expect("lookahead saw an endpoint");
                        if hi == '[' && self.peek() == Some(':') {
                            return Err(self.err(CompileErrorKind::BadCharClass));
                        }
                        if lo > hi {
                            return Err(self.err(CompileErrorKind::BadCharClass));
                        }
                        ranges.push((lo, hi));
                        continue;
                    }
                }
            }
            ranges.push((lo, lo));
        }
        let set = if negated {
            ClassSet::negated_from_ranges(ranges, self.newline_sensitive())
        } else {
            ClassSet::from_ranges(ranges)
        };
        Ok(Term::Class(set))
    }

    /// `[:name:]`, with the opening `[` consumed and `:` pending.
    fn parse_named_class(&mut self, ranges: &mut Vec<(char, char)>) -> Result<(), CompileError> {
        let open = self.last_index;
        self.next_rune(); // ':'
        let mut name = String::new();
        loop {
            match self.next_rune() {
                Some(':') if self.peek() == Some(']') => {
                    self.next_rune();
                    break;
                }
                Some(c) if c.is_ascii_alphabetic() => name.push(c),
                Some(_) | None => return Err(self.err_at(CompileErrorKind::BadCharClass, open)),
            }
        }
        let class: &[(char, char)] = match name.as_str() {
            "alpha" => &[('A', 'Z'), ('a', 'z')],
            "digit" => &[('0', '9')],
            "alnum" => &[('0', '9'), ('A', 'Z'), ('a', 'z')],
            "upper" => &[('A', 'Z')],
            "lower" => &[('a', 'z')],
            "space" => &[(' ', ' '), ('\t', '\r')],
            "blank" => &[(' ', ' '), ('\t', '\t')],
            "punct" => &[('!', '/'), (':', '@'), ('[', '`'), ('{', '~')],
            "cntrl" => &[('\0', '\x1f'), ('\x7f', '\x7f')],
            "graph" => &[('!', '~')],
            "print" => &[(' ', '~')],
            "xdigit" => &[('0', '9'), ('A', 'F'), ('a', 'f')],
            _ => return Err(self.err_at(CompileErrorKind::BadCharClass, open)),
        };
        ranges.extend_from_slice(class);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Basic dialect
    // ------------------------------------------------------------------

    fn parse_bre_alternation(&mut self, depth: usize) -> Result<Alternation, CompileError> {
        if depth > MAX_NESTING {
            return Err(self.err(CompileErrorKind::TooComplex));
        }
        let mut alternation = Vec::new();
        loop {
            alternation.push(self.parse_bre_branch(depth)?);
            if self.rest_starts_with("\\|") {
                self.next_rune();
                self.next_rune();
                continue;
            }
            return Ok(alternation);
        }
    }

    fn parse_bre_branch(&mut self, depth: usize) -> Result<Branch, CompileError> {
        let mut branch = Vec::new();
        loop {
            if self.is_empty() || self.rest_starts_with("\\)") || self.rest_starts_with("\\|") {
                return Ok(branch);
            }
            let at_start = branch.is_empty();
            let term = self.parse_bre_term(depth, at_start)?;
            let qt = self.parse_bre_quantifier(term)?;
            branch.push(qt);
        }
    }

    fn parse_bre_term(&mut self, depth: usize, at_start: bool) -> Result<Term, CompileError> {
        let c = self.next_rune().expect("caller checked for end");
        match c {
            '[' => self.parse_class(),
            '.' => Ok(Term::Dot),
            '^' if at_start => Ok(Term::Bol),
            '$' if self.bre_at_branch_end() => Ok(Term::Eol),
            '\\' => {
                let e = match self.next_rune() {
                    Some(e) => e,
                    None => return Err(self.err(CompileErrorKind::BadEscape)),
                };
                match e {
                    '(' => {
                        self.group_count += 1;
                        let index = self.group_count;
                        let inner = self.parse_bre_alternation(depth + 1)?;
                        if !(self.bypass_optional('\\') && self.bypass_optional(')')) {
                            return Err(self.err_at(CompileErrorKind::UnbalancedParen, self.index));
                        }
                        self.closed_groups.push(index);
                        Ok(Term::Group { index, inner })
                    }
                    ')' => Err(self.err(CompileErrorKind::UnbalancedParen)),
                    '1'..='9' => self.backref(e),
                    'n' => Ok(Term::Class(ClassSet::single('\n'))),
                    'r' => Ok(Term::Class(ClassSet::single('\r'))),
                    't' => Ok(Term::Class(ClassSet::single('\t'))),
                    'd' | 'D' | 'w' | 'W' | 's' | 'S' => Ok(Term::Class(self.perl_class(e))),
                    '{' => Err(self.err(CompileErrorKind::BadRepetition)),
                    e if e.is_alphanumeric() => Err(self.err(CompileErrorKind::BadEscape)),
                    e => Ok(Term::Class(ClassSet::single(e))),
                }
            }
            '*' if at_start => Ok(Term::Class(ClassSet::single('*'))),
            '*' => Err(self.err(CompileErrorKind::BadRepetition)),
            _ => Ok(Term::Class(ClassSet::single(c))),
        }
    }

    /// In basic syntax `$` is an anchor only at the very end of a branch.
    fn bre_at_branch_end(&self) -> bool {
        self.is_empty() || self.rest_starts_with("\\)") || self.rest_starts_with("\\|")
    }

    fn parse_bre_quantifier(&mut self, term: Term) -> Result<QuantifiedTerm, CompileError> {
        let (min, max) = if self.bypass_optional('*') {
            (0, None)
        } else if self.rest_starts_with("\\{") {
            self.next_rune();
            self.next_rune();
            self.parse_bound(true)?
        } else if self.rest_starts_with("\\+") {
            self.next_rune();
            self.next_rune();
            (1, None)
        } else if self.rest_starts_with("\\?") {
            self.next_rune();
            self.next_rune();
            (0, Some(1))
        } else {
            return Ok(QuantifiedTerm { greedy: self.default_greedy(), ..QuantifiedTerm::once(term) });
        };
        if matches!(term, Term::Bol | Term::Eol) {
            return Err(self.err(CompileErrorKind::BadRepetition));
        }
        Ok(QuantifiedTerm { term, min, max, greedy: self.default_greedy() })
    }

    // ------------------------------------------------------------------
    // Literal dialect
    // ------------------------------------------------------------------

    fn parse_literal(&mut self) -> Alternation {
        let mut branch = Vec::new();
        while let Some(c) = self.next_rune() {
            branch.push(QuantifiedTerm::once(Term::Class(ClassSet::single(c))));
        }
        vec![branch]
    }
}

/// Parse a pattern string under the given dialect flags.
pub(crate) fn parse(pattern: &str, flags: CompileFlags) -> Result<ParsedPattern, CompileError> {
    let mut parser = Parser::new(pattern, flags);
    let root = if flags.contains(CompileFlags::LITERAL) {
        parser.parse_literal()
    } else if flags.contains(CompileFlags::EXTENDED) {
        parser.parse_ere_alternation(0)?
    } else {
        let root = parser.parse_bre_alternation(0)?;
        // A stray `\)` stops the branch scan without being consumed.
        if !parser.is_empty() {
            return Err(parser.err_at(CompileErrorKind::UnbalancedParen, parser.index));
        }
        root
    };
    debug_assert!(parser.is_empty(), "parser must consume the whole pattern");
    Ok(ParsedPattern {
        root,
        group_count: parser.group_count,
        has_backrefs: parser.has_backrefs,
    })
}
