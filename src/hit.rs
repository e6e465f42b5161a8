//! Query results and the bounded top-N result set.

use std::cmp::Ordering;
use std::collections::btree_set;
use std::collections::BTreeSet;

/// One query result: a stored sketch name and its distance to the query.
///
/// Ordered by ascending distance, then ascending name, so that equal
/// distances still give a deterministic top-N.
#[derive(Debug, Clone)]
pub struct Hit {
    pub distance: f64,
    pub target: String,
}

impl Hit {
    /// Hit at `distance` for the sketch named `target`.
    pub fn new(distance: f64, target: impl Into<String>) -> Self {
        Self {
            distance,
            target: target.into(),
        }
    }
}

impl PartialEq for Hit {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Hit {}

impl PartialOrd for Hit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Hit {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.target.cmp(&other.target))
    }
}

/// Sorted set of the best `capacity` hits seen so far.
#[derive(Debug, Clone)]
pub struct HitSet {
    capacity: usize,
    hits: BTreeSet<Hit>,
}

impl HitSet {
    /// Empty set keeping at most `capacity` hits.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            hits: BTreeSet::new(),
        }
    }

    /// Offer a candidate; returns whether it is now in the set.
    ///
    /// Below capacity every candidate is kept. At capacity the candidate
    /// replaces the worst hit only if it orders strictly before it.
    pub fn merge(&mut self, distance: f64, target: &str) -> bool {
        if self.capacity == 0 {
            return false;
        }
        if self.hits.len() < self.capacity {
            return self.hits.insert(Hit::new(distance, target));
        }
        let candidate = Hit::new(distance, target);
        match self.hits.last() {
            Some(worst) if candidate < *worst => {
                if !self.hits.insert(candidate) {
                    return false;
                }
                self.hits.pop_last();
                true
            }
            _ => false,
        }
    }

    /// Maximum number of hits kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of hits currently kept.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Whether no candidate has been kept.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Best hit, if any.
    pub fn first(&self) -> Option<&Hit> {
        self.hits.first()
    }

    /// Worst hit currently kept.
    pub fn last(&self) -> Option<&Hit> {
        self.hits.last()
    }

    /// Hits in ascending order.
    pub fn iter(&self) -> btree_set::Iter<'_, Hit> {
        self.hits.iter()
    }

    /// Hits in ascending order, best first.
    pub fn into_vec(self) -> Vec<Hit> {
        self.hits.into_iter().collect()
    }
}

impl IntoIterator for HitSet {
    type Item = Hit;
    type IntoIter = btree_set::IntoIter<Hit>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.into_iter()
    }
}

impl<'a> IntoIterator for &'a HitSet {
    type Item = &'a Hit;
    type IntoIter = btree_set::Iter<'a, Hit>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_distance_then_name() {
        assert!(Hit::new(0.1, "z") < Hit::new(0.2, "a"));
        assert!(Hit::new(0.2, "a") < Hit::new(0.2, "b"));
        assert_eq!(Hit::new(0.2, "a"), Hit::new(0.2, "a"));
    }

    #[test]
    fn test_merge_fills_then_replaces_worst() {
        let mut set = HitSet::new(2);
        assert!(set.merge(0.5, "a"));
        assert!(set.merge(0.3, "b"));
        // Worse than the current worst.
        assert!(!set.merge(0.6, "c"));
        // Better: evicts (0.5, a).
        assert!(set.merge(0.1, "d"));
        let names: Vec<_> = set.iter().map(|h| h.target.as_str()).collect();
        assert_eq!(names, ["d", "b"]);
    }

    #[test]
    fn test_merge_tie_broken_by_name() {
        let mut set = HitSet::new(1);
        assert!(set.merge(0.2, "m"));
        assert!(!set.merge(0.2, "z"));
        assert!(set.merge(0.2, "a"));
        assert_eq!(set.first().unwrap().target, "a");
    }

    #[test]
    fn test_merge_duplicate_at_capacity_keeps_set_intact() {
        let mut set = HitSet::new(2);
        set.merge(0.1, "a");
        set.merge(0.4, "b");
        assert!(!set.merge(0.1, "a"));
        assert_eq!(set.len(), 2);
        assert_eq!(set.last().unwrap().target, "b");
    }

    #[test]
    fn test_zero_capacity_rejects() {
        let mut set = HitSet::new(0);
        assert!(!set.merge(0.0, "a"));
        assert!(set.is_empty());
    }
}
