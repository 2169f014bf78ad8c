//! Iterative collaborators built on the single-shot search contract.
//!
//! Each helper repeatedly calls `find_at` at advancing offsets, re-issuing
//! the "not beginning of line" flag whenever it resumes at a non-zero
//! offset, and advancing one character past an empty match so the scan
//! always makes progress. Errors from the underlying search terminate the
//! iteration.

use crate::flags::ExecFlags;
use crate::result::Match;
use crate::Regex;

impl Regex {
    /// Iterate over every non-overlapping match in `text`, left to right.
    pub fn find_iter<'r, 't>(&'r self, text: &'t str) -> Matches<'r, 't> {
        Matches { re: self, text, pos: 0, done: false }
    }

    /// Iterate over the pieces of `text` between successive matches.
    pub fn split<'r, 't>(&'r self, text: &'t str) -> Split<'r, 't> {
        Split { matches: self.find_iter(text), last: 0, done: false }
    }

    /// Replace every match in `text` with `replacement`.
    ///
    /// `$0`..`$9` in the replacement insert the corresponding group's text
    /// (empty for a non-participating group); `$$` is a literal `$`.
    pub fn replace_all(&self, text: &str, replacement: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for m in self.find_iter(text) {
            out.push_str(&text[last..m.start()]);
            expand_replacement(&mut out, &m, text, replacement);
            last = m.end();
        }
        out.push_str(&text[last..]);
        out
    }
}

fn expand_replacement(out: &mut String, m: &Match, text: &str, replacement: &str) {
    let mut chars = replacement.chars();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('$') => out.push('$'),
            Some(d @ '0'..='9') => {
                let group = d as usize - '0' as usize;
                if let Some(s) = m.group_str(text, group) {
                    out.push_str(s);
                }
            }
            Some(other) => {
                out.push('$');
                out.push(other);
            }
            None => out.push('$'),
        }
    }
}

/// Iterator over all matches in a subject. Created by [`Regex::find_iter`].
pub struct Matches<'r, 't> {
    re: &'r Regex,
    text: &'t str,
    pos: usize,
    done: bool,
}

impl Iterator for Matches<'_, '_> {
    type Item = Match;

    fn next(&mut self) -> Option<Match> {
        if self.done {
            return None;
        }
        let eflags = if self.pos > 0 {
            ExecFlags::NOTBOL
        } else {
            ExecFlags::empty()
        };
        match self.re.find_at(self.text, self.pos, eflags) {
            Ok(Some(m)) => {
                self.pos = m.end();
                // an empty match advances one character so the scan always
                // makes progress
                if m.start() == m.end() {
                    match self.text[self.pos..].chars().next() {
                        Some(c) => self.pos += c.len_utf8(),
                        None => self.done = true,
                    }
                }
                Some(m)
            }
            Ok(None) | Err(_) => {
                self.done = true;
                None
            }
        }
    }
}

/// Iterator over the text between matches. Created by [`Regex::split`].
pub struct Split<'r, 't> {
    matches: Matches<'r, 't>,
    last: usize,
    done: bool,
}

impl<'t> Iterator for Split<'_, 't> {
    type Item = &'t str;

    fn next(&mut self) -> Option<&'t str> {
        if self.done {
            return None;
        }
        match self.matches.next() {
            Some(m) => {
                let piece = &self.matches.text[self.last..m.start()];
                self.last = m.end();
                Some(piece)
            }
            None => {
                self.done = true;
                Some(&self.matches.text[self.last..])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::CompileFlags;

    #[test]
    fn find_iter_walks_all_matches() {
        let re = Regex::new("[0-9]+").unwrap();
        let spans: Vec<_> = re
            .find_iter("a12b345c6")
            .map(|m| (m.start(), m.end()))
            .collect();
        assert_eq!(spans, vec![(1, 3), (4, 7), (8, 9)]);
    }

    #[test]
    fn empty_matches_advance() {
        let re = Regex::new("x*").unwrap();
        let spans: Vec<_> = re.find_iter("ab").map(|m| (m.start(), m.end())).collect();
        // empty match at every position, including the end
        assert_eq!(spans, vec![(0, 0), (1, 1), (2, 2)]);
    }

    #[test]
    fn resumed_scans_suppress_bol() {
        // ^ must not match at resume offsets, so only the first line start
        // matches without NEWLINE
        let re = Regex::new("^a").unwrap();
        let count = re.find_iter("aaa").count();
        assert_eq!(count, 1);
    }

    #[test]
    fn newline_mode_matches_every_line() {
        let re = Regex::compile("^.", CompileFlags::EXTENDED | CompileFlags::NEWLINE).unwrap();
        let got: Vec<_> = re
            .find_iter("ab\ncd\nef")
            .map(|m| m.start())
            .collect();
        assert_eq!(got, vec![0, 3, 6]);
    }

    #[test]
    fn split_yields_between_pieces() {
        let re = Regex::new(",").unwrap();
        let pieces: Vec<_> = re.split("a,b,,c").collect();
        assert_eq!(pieces, vec!["a", "b", "", "c"]);
    }

    #[test]
    fn split_without_match_yields_whole() {
        let re = Regex::new("z").unwrap();
        let pieces: Vec<_> = re.split("abc").collect();
        assert_eq!(pieces, vec!["abc"]);
    }

    #[test]
    fn replace_all_with_group_refs() {
        let re = Regex::new("([0-9])([a-z])").unwrap();
        let got = re.replace_all("1a 2b", "$2$1");
        assert_eq!(got, "a1 b2");
    }

    #[test]
    fn replace_all_literal_dollar() {
        let re = Regex::new("x").unwrap();
        assert_eq!(re.replace_all("axb", "$$"), "a$b");
    }

    #[test]
    fn replace_all_unmatched_group_is_empty() {
        let re = Regex::new("(a)|(b)").unwrap();
        assert_eq!(re.replace_all("ab", "<$1$2>"), "<a><b>");
    }
}
