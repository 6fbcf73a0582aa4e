//! Replace mentions with canonical tags, one pass over one text.

use std::collections::HashSet;
use std::ops::Range;

use tracing::debug;

use canonic_shared::{Candidate, CanonicalTag};

/// A single substitution pass.
///
/// Each call to [`apply`](Self::apply) rewrites the first occurrence of the
/// mention that does not fall inside a tag written earlier in this pass. An
/// object identity is written at most once per pass.
#[derive(Debug, Clone)]
pub struct Substitution {
    text: String,
    tagged: Vec<Range<usize>>,
    consumed: HashSet<CanonicalTag>,
}

impl Substitution {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tagged: Vec::new(),
            consumed: HashSet::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    pub fn is_consumed(&self, tag: &CanonicalTag) -> bool {
        self.consumed.contains(tag)
    }

    /// Substitute `candidate`'s tag for `mention`. Returns whether the text
    /// changed.
    pub fn apply(&mut self, mention: &str, candidate: &Candidate) -> bool {
        let tag = candidate.tag();
        if self.consumed.contains(&tag) {
            debug!(mention, tag = %tag, "identity already substituted");
            return false;
        }
        let Some(start) = self.find_untagged(mention) else {
            debug!(mention, "mention not found in text");
            return false;
        };

        let end = start + mention.len();
        let marker = tag.braced();
        self.text.replace_range(start..end, &marker);

        let new_end = start + marker.len();
        for span in &mut self.tagged {
            if span.start >= end {
                span.start = span.start - end + new_end;
                span.end = span.end - end + new_end;
            }
        }
        self.tagged.push(start..new_end);
        self.consumed.insert(tag);
        true
    }

    fn find_untagged(&self, mention: &str) -> Option<usize> {
        let first_len = mention.chars().next()?.len_utf8();
        let mut from = 0;
        while let Some(pos) = self.text[from..].find(mention) {
            let start = from + pos;
            let end = start + mention.len();
            if !self.tagged.iter().any(|s| start < s.end && s.start < end) {
                return Some(start);
            }
            from = start + first_len;
        }
        None
    }
}
