//! # Novelty Tracker
//!
//! Remembers every earthquake id the process has ever committed and splits
//! incoming collections into already-known and never-seen-before records.
//!
//! Novelty is relative to the whole history, not to the previous contents of
//! one window: an event first surfaced by an on-demand `30days` fetch is known
//! by the time the `1day` poll sees it.
//!
//! The id set only grows. There is no pruning; memory scales with the number
//! of distinct events seen since startup.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

use crate::seismic::Earthquake;

/// Result of [`NoveltyTracker::partition`]. Each side keeps the input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    pub known: Vec<Earthquake>,
    pub novel: Vec<Earthquake>,
}

#[derive(Debug, Default)]
pub struct NoveltyTracker {
    known_ids: RwLock<HashSet<String>>,
}

impl NoveltyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Splits `records` by id membership. Read-only: calling it twice without
    /// a [`commit`](Self::commit) in between yields the same result.
    pub fn partition(&self, records: &[Earthquake]) -> Partition {
        let known_ids = self.known_ids.read().unwrap_or_else(PoisonError::into_inner);
        let (known, novel) = records
            .iter()
            .cloned()
            .partition(|record| known_ids.contains(&record.id));
        Partition { known, novel }
    }

    /// Adds the ids of `novel` to the set. Returns how many were actually new.
    pub fn commit(&self, novel: &[Earthquake]) -> usize {
        let mut known_ids = self.known_ids.write().unwrap_or_else(PoisonError::into_inner);
        novel
            .iter()
            .filter(|record| known_ids.insert(record.id.clone()))
            .count()
    }

    /// Partition and commit under one write lock, returning the novel records.
    ///
    /// Two overlapping callers handed the same new id will see it as novel
    /// exactly once between them.
    pub fn observe(&self, records: &[Earthquake]) -> Vec<Earthquake> {
        let mut known_ids = self.known_ids.write().unwrap_or_else(PoisonError::into_inner);
        records
            .iter()
            .filter(|record| known_ids.insert(record.id.clone()))
            .cloned()
            .collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.known_ids
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }

    pub fn len(&self) -> usize {
        self.known_ids.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seismic::testing::{collection, ids};
    use proptest::prelude::*;

    fn id_list(records: &[Earthquake]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn partition_preserves_input_order() {
        let tracker = NoveltyTracker::new();
        tracker.commit(&collection(&["b", "d"]).features);

        let split = tracker.partition(&collection(&["a", "b", "c", "d", "e"]).features);
        assert_eq!(id_list(&split.known), vec!["b", "d"]);
        assert_eq!(id_list(&split.novel), vec!["a", "c", "e"]);
    }

    #[test]
    fn partition_does_not_commit() {
        let tracker = NoveltyTracker::new();
        let records = collection(&["x", "y"]).features;

        let first = tracker.partition(&records);
        let second = tracker.partition(&records);
        assert_eq!(first, second);
        assert!(tracker.is_empty());
    }

    #[test]
    fn commit_reports_only_new_ids() {
        let tracker = NoveltyTracker::new();
        assert_eq!(tracker.commit(&collection(&["a", "b"]).features), 2);
        assert_eq!(tracker.commit(&collection(&["b", "c"]).features), 1);
        assert_eq!(tracker.len(), 3);
        assert!(tracker.contains("c"));
    }

    #[test]
    fn bulk_load_is_a_union() {
        let tracker = NoveltyTracker::new();
        let day = ids("q", 10);
        let week = ids("q", 50);
        let month = ids("q", 200);

        for window in [&day, &week, &month] {
            let records = collection(window).features;
            let split = tracker.partition(&records);
            tracker.commit(&split.novel);
        }
        assert_eq!(tracker.len(), 200);
    }

    #[test]
    fn observe_hands_out_each_id_once() {
        let tracker = NoveltyTracker::new();
        let records = collection(&["a", "b"]).features;
        assert_eq!(id_list(&tracker.observe(&records)), vec!["a", "b"]);
        assert!(tracker.observe(&records).is_empty());
    }

    proptest! {
        #[test]
        fn committed_ids_are_never_novel_again(
            first in prop::collection::vec("[a-f]{1,3}", 0..40),
            second in prop::collection::vec("[a-f]{1,3}", 0..40),
        ) {
            let tracker = NoveltyTracker::new();
            let r1 = collection(&first).features;
            let r2 = collection(&second).features;

            tracker.commit(&tracker.partition(&r1).novel);
            let split = tracker.partition(&r2);

            for record in &split.novel {
                prop_assert!(!first.contains(&record.id));
            }
            prop_assert_eq!(split.known.len() + split.novel.len(), r2.len());
        }

        #[test]
        fn partition_is_idempotent(
            seen in prop::collection::vec("[a-f]{1,2}", 0..20),
            batch in prop::collection::vec("[a-f]{1,2}", 0..20),
        ) {
            let tracker = NoveltyTracker::new();
            tracker.commit(&collection(&seen).features);
            let records = collection(&batch).features;
            prop_assert_eq!(tracker.partition(&records), tracker.partition(&records));
        }
    }
}
