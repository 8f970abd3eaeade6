//! Sorted interval index with binary-search point lookup.

use fraud_model::Interval;

use crate::error::ConstructionError;

/// Immutable, sorted set of closed address intervals.
///
/// Intervals are ordered by `lower`, narrower first on ties. Overlap is not
/// rejected: a key is resolved against the last interval whose lower bound
/// does not exceed it.
#[derive(Debug, Clone, Default)]
pub struct IntervalIndex {
    intervals: Vec<Interval>,
}

impl IntervalIndex {
    /// Build the index. Input order does not matter.
    pub fn build(intervals: impl IntoIterator<Item = Interval>) -> Result<Self, ConstructionError> {
        let mut intervals: Vec<Interval> = intervals.into_iter().collect();
        if let Some((position, bad)) = intervals
            .iter()
            .enumerate()
            .find(|(_, interval)| interval.lower > interval.upper)
        {
            return Err(ConstructionError {
                position,
                lower: bad.lower,
                upper: bad.upper,
                payload: bad.payload.clone(),
            });
        }
        intervals.sort_by_key(|interval| (interval.lower, interval.upper));
        Ok(Self { intervals })
    }

    /// The interval containing `key`, if any.
    pub fn find(&self, key: u32) -> Option<&Interval> {
        let after = self.intervals.partition_point(|interval| interval.lower <= key);
        let candidate = self.intervals.get(after.checked_sub(1)?)?;
        (key <= candidate.upper).then_some(candidate)
    }

    /// Payload of the interval containing `key`.
    pub fn lookup(&self, key: u32) -> Option<&str> {
        self.find(key).map(|interval| interval.payload.as_str())
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Number of overlapping neighbour pairs.
    pub fn overlap_count(&self) -> usize {
        self.intervals
            .windows(2)
            .filter(|pair| pair[1].lower <= pair[0].upper)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> IntervalIndex {
        IntervalIndex::build(vec![
            Interval::new(1000, 1999, "B"),
            Interval::new(0, 999, "A"),
            Interval::new(5000, 5000, "C"),
        ])
        .unwrap()
    }

    #[test]
    fn test_lookup_boundaries() {
        let index = index();
        assert_eq!(index.lookup(0), Some("A"));
        assert_eq!(index.lookup(999), Some("A"));
        assert_eq!(index.lookup(1000), Some("B"));
        assert_eq!(index.lookup(1999), Some("B"));
        assert_eq!(index.lookup(2000), None);
        assert_eq!(index.lookup(5000), Some("C"));
        assert_eq!(index.lookup(5001), None);
        assert_eq!(index.lookup(u32::MAX), None);
    }

    #[test]
    fn test_key_below_first_interval() {
        let index = IntervalIndex::build(vec![Interval::new(10, 20, "A")]).unwrap();
        assert_eq!(index.lookup(9), None);
        assert_eq!(index.lookup(10), Some("A"));
    }

    #[test]
    fn test_empty_index() {
        let index = IntervalIndex::build(Vec::new()).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.lookup(0), None);
    }

    #[test]
    fn test_inverted_interval_rejected_with_position() {
        let err = IntervalIndex::build(vec![
            Interval::new(0, 9, "A"),
            Interval::new(20, 10, "B"),
        ])
        .unwrap_err();
        assert_eq!(err.position, 1);
        assert_eq!(err.payload, "B");
    }

    #[test]
    fn test_overlap_resolves_to_greatest_lower() {
        let index = IntervalIndex::build(vec![
            Interval::new(0, 100, "wide"),
            Interval::new(50, 60, "narrow"),
        ])
        .unwrap();
        assert_eq!(index.overlap_count(), 1);
        assert_eq!(index.lookup(55), Some("narrow"));
        assert_eq!(index.lookup(40), Some("wide"));
        // Past the narrow interval the wide one is not consulted.
        assert_eq!(index.lookup(70), None);
    }
}
