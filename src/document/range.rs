use serde::Serialize;
use std::cmp::{max, min};
use std::fmt;

/// Half-open `[start, end)` interval over the document's linear address space.
///
/// Construction normalizes reversed input so `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Range {
    start: usize,
    end: usize,
}

impl Range {
    pub fn new(a: usize, b: usize) -> Self {
        Self {
            start: min(a, b),
            end: max(a, b),
        }
    }

    /// Zero-width range at `at`.
    pub fn collapsed(at: usize) -> Self {
        Self { start: at, end: at }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.is_collapsed()
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// True when `other` lies entirely inside this range (boundaries included).
    pub fn contains_range(&self, other: &Range) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn contains_offset(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// True when the two ranges share at least one position.
    pub fn overlaps(&self, other: &Range) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// The overlapping part of two ranges, if they overlap at all.
    pub fn intersection(&self, other: &Range) -> Option<Range> {
        if !self.overlaps(other) {
            return None;
        }
        Some(Range::new(
            max(self.start, other.start),
            min(self.end, other.end),
        ))
    }

    pub fn collapse_to_end(&self) -> Range {
        Range::collapsed(self.end)
    }

    /// Smallest range covering both.
    pub fn union(&self, other: &Range) -> Range {
        Range::new(min(self.start, other.start), max(self.end, other.end))
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reversed_input_is_normalized() {
        let range = Range::new(20, 10);
        assert_eq!(range.start(), 10);
        assert_eq!(range.end(), 20);
        assert_eq!(range.len(), 10);
    }

    #[test]
    fn test_containment_and_overlap() {
        let outer = Range::new(10, 20);
        assert!(outer.contains_range(&Range::new(12, 15)));
        assert!(outer.contains_range(&Range::new(10, 20)));
        assert!(!outer.contains_range(&Range::new(18, 25)));
        assert!(outer.overlaps(&Range::new(18, 25)));
        assert!(!outer.overlaps(&Range::new(20, 25)));
        assert_eq!(
            outer.intersection(&Range::new(18, 25)),
            Some(Range::new(18, 20))
        );
    }

    #[test]
    fn test_collapsed() {
        assert!(Range::collapsed(4).is_collapsed());
        assert_eq!(Range::new(3, 9).collapse_to_end(), Range::collapsed(9));
    }
}
