//! Ordered threshold tables.
//!
//! Celebration messages and bonus amounts are keyed by numeric thresholds
//! ("level ≥ 50", "streak ≥ 30 days"). [`TierTable`] stores those pairs in
//! descending threshold order and returns the first one the value reaches.

/// An ordered table of `(threshold, value)` pairs with a fallback.
///
/// Lookups scan top-down and return the value of the first entry whose
/// threshold is `<=` the probe. Construction sorts the entries, so callers
/// may list them in any order.
#[derive(Debug, Clone)]
pub struct TierTable<T> {
    tiers: Vec<(u64, T)>,
    fallback: T,
}

impl<T> TierTable<T> {
    /// Builds a table from `(threshold, value)` pairs and a fallback used
    /// when the probe is below every threshold.
    #[must_use]
    pub fn new(mut tiers: Vec<(u64, T)>, fallback: T) -> Self {
        tiers.sort_by(|a, b| b.0.cmp(&a.0));
        Self { tiers, fallback }
    }

    /// Returns the value of the highest tier reached by `value`.
    #[must_use]
    pub fn lookup(&self, value: u64) -> &T {
        self.tiers
            .iter()
            .find(|(threshold, _)| value >= *threshold)
            .map_or(&self.fallback, |(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TierTable<&'static str> {
        TierTable::new(vec![(10, "ten"), (100, "hundred"), (50, "fifty")], "base")
    }

    #[test]
    fn lookup_picks_highest_reached_tier() {
        let t = table();
        assert_eq!(*t.lookup(0), "base");
        assert_eq!(*t.lookup(9), "base");
        assert_eq!(*t.lookup(10), "ten");
        assert_eq!(*t.lookup(49), "ten");
        assert_eq!(*t.lookup(50), "fifty");
        assert_eq!(*t.lookup(1_000), "hundred");
    }

    #[test]
    fn unsorted_input_still_matches_highest_tier() {
        let t = TierTable::new(vec![(1, 1_u64), (3, 3), (2, 2)], 0);
        let hits: Vec<u64> = (0..5).map(|v| *t.lookup(v)).collect();
        assert_eq!(hits, vec![0, 1, 2, 3, 3]);
    }
}
