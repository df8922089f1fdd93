//! Ordered set of disjoint IPv4 exclusion ranges (§4.A).
//!
//! A balanced ordered container keyed by a comparator where two ranges
//! compare equal iff they overlap. `std::collections::BTreeSet` gives us
//! the ordered-container part; [`ExcludeRange`]'s `Ord` impl gives us the
//! overlap comparator.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

/// A closed `[start, end]` IPv4 interval, host byte order.
///
/// `Eq`/`Ord` realize the §4.A comparator: `a < b` iff `a.end < b.start`,
/// `a > b` iff `a.start > b.end`, otherwise `a == b` (they overlap or
/// touch). This is *not* a total order in the usual sense — it's exactly
/// what an ordered-tree membership/merge probe needs.
#[derive(Debug)]
struct ExcludeRange {
    start: u32,
    end: u32,
    hits: AtomicU64,
}

impl ExcludeRange {
    fn point(addr: u32) -> Self {
        Self {
            start: addr,
            end: addr,
            hits: AtomicU64::new(0),
        }
    }

    fn touches_or_overlaps(&self, other: &ExcludeRange) -> bool {
        // Touching means adjacent with no gap, e.g. [1,5] and [6,9].
        !(self.end.saturating_add(1) < other.start || other.end.saturating_add(1) < self.start)
    }
}

impl PartialEq for ExcludeRange {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for ExcludeRange {}

impl PartialOrd for ExcludeRange {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ExcludeRange {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.end < other.start {
            Ordering::Less
        } else if self.start > other.end {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }
}

/// Error returned when an exclusion range is rejected.
#[derive(Debug, thiserror::Error)]
pub enum ExcludeError {
    #[error("exclusion range start {start} is greater than end {end}")]
    InvalidRange { start: u32, end: u32 },
}

/// The exclusion set. Read-only after startup (§5), so no lock is needed
/// on the membership path — only `add` takes `&mut self`.
#[derive(Debug, Default)]
pub struct ExclusionSet {
    ranges: BTreeSet<ExcludeRange>,
}

impl ExclusionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `[start, end]`, merging with any range it overlaps or
    /// touches. Absorption is transitive — a widened range may now cover a
    /// third range, which itself gets absorbed — so this loops until a
    /// probe finds no further overlap, avoiding the stack risk of a
    /// recursive absorb on pathological input (see §9).
    pub fn add(&mut self, start: u32, end: u32) -> Result<(), ExcludeError> {
        if start > end {
            return Err(ExcludeError::InvalidRange { start, end });
        }

        let mut merged = ExcludeRange {
            start,
            end,
            hits: AtomicU64::new(0),
        };

        loop {
            let probe = ExcludeRange {
                start: merged.start,
                end: merged.end,
                hits: AtomicU64::new(0),
            };
            match self.ranges.take(&probe) {
                Some(existing) if existing.touches_or_overlaps(&probe) || existing == probe => {
                    merged.start = merged.start.min(existing.start);
                    merged.end = merged.end.max(existing.end);
                    // existing.hits intentionally dropped: the advisory hit
                    // counter does not survive a merge, since the absorbed
                    // range is discarded.
                }
                Some(existing) => {
                    // take() can only return a node that compares equal
                    // (overlap), so this branch is unreachable in practice;
                    // put it back defensively rather than lose it.
                    self.ranges.insert(existing);
                    break;
                }
                None => break,
            }
        }

        self.ranges.insert(merged);
        Ok(())
    }

    /// `true` iff some stored range covers `addr`. Cannot fail.
    pub fn contains(&self, addr: u32) -> bool {
        match self.ranges.get(&ExcludeRange::point(addr)) {
            Some(range) => {
                range.hits.fetch_add(1, AtomicOrdering::Relaxed);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_inverted_range() {
        let mut set = ExclusionSet::new();
        assert!(set.add(10, 5).is_err());
    }

    #[test]
    fn contains_within_range() {
        let mut set = ExclusionSet::new();
        set.add(100, 200).unwrap();
        assert!(set.contains(100));
        assert!(set.contains(150));
        assert!(set.contains(200));
        assert!(!set.contains(99));
        assert!(!set.contains(201));
    }

    #[test]
    fn overlapping_insert_merges() {
        let mut set = ExclusionSet::new();
        set.add(100, 200).unwrap();
        set.add(150, 250).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.contains(225));
        assert!(!set.contains(251));
    }

    #[test]
    fn touching_ranges_merge() {
        let mut set = ExclusionSet::new();
        set.add(100, 200).unwrap();
        set.add(201, 300).unwrap();
        assert_eq!(set.len(), 1, "adjacent ranges with no gap must merge");
        assert!(set.contains(200));
        assert!(set.contains(201));
    }

    #[test]
    fn disjoint_ranges_stay_separate() {
        let mut set = ExclusionSet::new();
        set.add(100, 200).unwrap();
        set.add(300, 400).unwrap();
        assert_eq!(set.len(), 2);
        assert!(!set.contains(250));
    }

    #[test]
    fn transitive_chain_merge() {
        // Insert two disjoint ranges, then a third that bridges them —
        // all three must collapse into one (§9: "a newly widened interval
        // may now overlap a third, which must itself be absorbed").
        let mut set = ExclusionSet::new();
        set.add(100, 110).unwrap();
        set.add(200, 210).unwrap();
        assert_eq!(set.len(), 2);

        set.add(105, 205).unwrap();
        assert_eq!(set.len(), 1, "bridging insert must absorb both neighbors");
        assert!(set.contains(100));
        assert!(set.contains(210));
        assert!(!set.contains(99));
        assert!(!set.contains(211));
    }

    #[test]
    fn repeated_merges_converge() {
        let mut set = ExclusionSet::new();
        for i in 0..20u32 {
            let base = i * 10;
            set.add(base, base + 4).unwrap();
        }
        assert_eq!(set.len(), 20);
        // Now bridge all of them with one giant range.
        set.add(0, 200).unwrap();
        assert_eq!(set.len(), 1);
    }
}
