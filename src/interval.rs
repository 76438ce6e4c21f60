//! Character ranges already claimed by indexed tags.

use std::collections::BTreeMap;
use std::ops::Range;

#[derive(Debug, Clone, Default)]
pub struct Occupancy {
    /// start -> end, non-overlapping
    claimed: BTreeMap<usize, usize>,
}

impl Occupancy {
    pub fn new() -> Occupancy {
        Occupancy::default()
    }

    pub fn overlaps(&self, range: &Range<usize>) -> bool {
        if range.is_empty() {
            return false;
        }
        // Claims are disjoint, so only the last one starting before
        // `range.end` can intersect.
        self.claimed
            .range(..range.end)
            .next_back()
            .is_some_and(|(_, &end)| end > range.start)
    }

    /// Claims `range` unless it overlaps an existing claim.
    pub fn claim(&mut self, range: Range<usize>) -> bool {
        if self.overlaps(&range) {
            return false;
        }
        if !range.is_empty() {
            self.claimed.insert(range.start, range.end);
        }
        true
    }

    /// Records a range unconditionally, merging it with any claims it
    /// overlaps. Used for spans that were indexed before we saw them.
    pub fn insert(&mut self, range: Range<usize>) {
        if range.is_empty() {
            return;
        }
        let (mut start, mut end) = (range.start, range.end);
        let overlapping: Vec<usize> = self
            .claimed
            .range(..end)
            .filter(|(_, claimed_end)| **claimed_end > start)
            .map(|(claimed_start, _)| *claimed_start)
            .collect();
        for claimed_start in overlapping {
            let claimed_end = self.claimed.remove(&claimed_start).unwrap_or(claimed_start);
            start = start.min(claimed_start);
            end = end.max(claimed_end);
        }
        self.claimed.insert(start, end);
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}
