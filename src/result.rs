//! Match results.
//!
//! All offsets are byte offsets relative to the original subject, even when
//! the search began mid-string. Group 0 is always the overall match. A group
//! that did not participate in the match is reported as `None`; a group with
//! an empty span (`start == end`) is a real, participating empty match and
//! the two states are never conflated.

/// A half-open byte range `[start, end)` into the subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// The outcome of a successful exact match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    span: Span,
    groups: Box<[Option<Span>]>,
}

impl Match {
    pub(crate) fn new(span: Span, groups: Box<[Option<Span>]>) -> Self {
        Match { span, groups }
    }

    /// The overall match span.
    #[inline]
    pub fn span(&self) -> Span {
        self.span
    }

    /// Start of the overall match, as a byte offset into the subject.
    #[inline]
    pub fn start(&self) -> usize {
        self.span.start
    }

    /// End of the overall match, as a byte offset into the subject.
    #[inline]
    pub fn end(&self) -> usize {
        self.span.end
    }

    /// The span of capture group `i`, or `None` if the group did not
    /// participate. Group 0 is the overall match.
    #[inline]
    pub fn group(&self, i: usize) -> Option<Span> {
        if i == 0 {
            return Some(self.span);
        }
        self.groups.get(i - 1).copied().flatten()
    }

    /// Number of capture groups (not counting group 0).
    #[inline]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// The matched text of group `i` within `text`.
    ///
    /// `text` must be the subject the match was produced from.
    pub fn group_str<'t>(&self, text: &'t str, i: usize) -> Option<&'t str> {
        self.group(i).map(|s| &text[s.start..s.end])
    }
}

/// Edit-operation counters attached to an approximate match, verbatim from
/// the search that produced it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditCounts {
    /// Total weighted cost of all edits.
    pub cost: u32,
    /// Number of inserted characters.
    pub num_ins: u32,
    /// Number of deleted characters.
    pub num_del: u32,
    /// Number of substituted characters.
    pub num_subst: u32,
}

/// The outcome of a successful approximate match: the match itself plus the
/// cost breakdown of the edits used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApproxMatch {
    mat: Match,
    edits: EditCounts,
}

impl ApproxMatch {
    pub(crate) fn new(mat: Match, edits: EditCounts) -> Self {
        ApproxMatch { mat, edits }
    }

    /// The match boundaries and groups.
    #[inline]
    pub fn as_match(&self) -> &Match {
        &self.mat
    }

    #[inline]
    pub fn span(&self) -> Span {
        self.mat.span()
    }

    #[inline]
    pub fn start(&self) -> usize {
        self.mat.start()
    }

    #[inline]
    pub fn end(&self) -> usize {
        self.mat.end()
    }

    #[inline]
    pub fn group(&self, i: usize) -> Option<Span> {
        self.mat.group(i)
    }

    /// The edit-operation breakdown.
    #[inline]
    pub fn edits(&self) -> EditCounts {
        self.edits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_zero_is_overall() {
        let m = Match::new(
            Span { start: 1, end: 4 },
            vec![Some(Span { start: 2, end: 3 }), None].into_boxed_slice(),
        );
        assert_eq!(m.group(0), Some(Span { start: 1, end: 4 }));
        assert_eq!(m.group(1), Some(Span { start: 2, end: 3 }));
        assert_eq!(m.group(2), None);
        assert_eq!(m.group(3), None);
    }

    #[test]
    fn empty_span_is_not_nonparticipation() {
        let m = Match::new(
            Span { start: 5, end: 5 },
            vec![Some(Span { start: 5, end: 5 })].into_boxed_slice(),
        );
        let g = m.group(1).unwrap();
        assert!(g.is_empty());
        assert_eq!(g.start, 5);
    }

    #[test]
    fn group_str_slices_subject() {
        let text = "xabcx";
        let m = Match::new(
            Span { start: 1, end: 4 },
            vec![Some(Span { start: 2, end: 3 })].into_boxed_slice(),
        );
        assert_eq!(m.group_str(text, 0), Some("abc"));
        assert_eq!(m.group_str(text, 1), Some("b"));
    }
}
