//! Character-range primitives for annotation anchoring.
//!
//! All offsets in this crate are 0-based Unicode scalar value (char) offsets,
//! never byte offsets. Ranges are half-open: `[start, end)`.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// A half-open character range `[start, end)` into a text buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CharRange {
    pub start: usize,
    pub end: usize,
}

impl CharRange {
    pub fn new(start: usize, end: usize) -> Self {
        CharRange { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// True iff `0 <= start < end <= text_len`. Empty and out-of-bounds
    /// ranges are both invalid.
    pub fn validate(&self, text_len: usize) -> bool {
        self.start < self.end && self.end <= text_len
    }

    /// True iff `other` lies entirely within this range's bounds.
    pub fn contains(&self, other: &CharRange) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    /// True iff the two ranges share at least one character.
    pub fn overlaps(&self, other: &CharRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl Display for CharRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Locate the `occurrence`-th (0-based) occurrence of `needle` in `text`,
/// returning its char-offset span. Returns `None` when `needle` is empty or
/// fewer occurrences exist.
///
/// This is the fallback used for legacy annotations that carry no stored
/// range. Occurrence counting follows non-overlapping matches.
pub fn locate_by_text(text: &str, needle: &str, occurrence: usize) -> Option<CharRange> {
    if needle.is_empty() {
        return None;
    }
    let needle_len = needle.chars().count();
    let mut found = 0;
    for (byte_idx, _) in text.match_indices(needle) {
        if found == occurrence {
            let start = text[..byte_idx].chars().count();
            return Some(CharRange::new(start, start + needle_len));
        }
        found += 1;
    }
    None
}

/// Byte offset of each char offset in `text`, with a trailing sentinel equal
/// to `text.len()`. Lets callers slice by char offsets in O(1) per slice.
pub(crate) fn char_byte_offsets(text: &str) -> Vec<usize> {
    let mut offsets: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
    offsets.push(text.len());
    offsets
}
