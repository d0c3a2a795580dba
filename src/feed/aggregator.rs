//! Latest-value store keyed by sensor group.
//!
//! Every merged reading fully replaces the previous snapshot for its group.
//! Groups are never evicted; a silent group keeps its last-known values and
//! its `received_at` shows how old they are.

use super::codec::Reading;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

/// Most recent reading for a group, stamped with local receipt time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSnapshot {
    pub group_id: String,
    pub temperature: f64,
    pub humidity: f64,
    pub received_at: DateTime<Utc>,
}

impl GroupSnapshot {
    /// Time elapsed since this snapshot was received. Zero if `now` is earlier.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.received_at).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Thread-safe group store.
///
/// The lock is only held for the map operation itself, so `merge` and
/// `snapshot` may be called from different tasks.
#[derive(Default)]
pub struct GroupAggregator {
    groups: RwLock<HashMap<String, GroupSnapshot>>,
}

impl GroupAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot for `reading.group_id`.
    pub fn merge(&self, reading: Reading, now: DateTime<Utc>) {
        let snapshot = GroupSnapshot {
            group_id: reading.group_id.clone(),
            temperature: reading.temperature,
            humidity: reading.humidity,
            received_at: now,
        };
        self.groups.write().insert(reading.group_id, snapshot);
    }

    /// All groups sorted by id.
    pub fn snapshot(&self) -> Vec<GroupSnapshot> {
        let mut groups: Vec<GroupSnapshot> = self.groups.read().values().cloned().collect();
        groups.sort_by(|a, b| a.group_id.cmp(&b.group_id));
        groups
    }

    pub fn get(&self, group_id: &str) -> Option<GroupSnapshot> {
        self.groups.read().get(group_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn values(snapshot: &[GroupSnapshot]) -> Vec<(String, f64, f64)> {
        snapshot
            .iter()
            .map(|s| (s.group_id.clone(), s.temperature, s.humidity))
            .collect()
    }

    #[test]
    fn test_empty_store() {
        let store = GroupAggregator::new();
        assert!(store.is_empty());
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_snapshot_sorted_by_group() {
        let store = GroupAggregator::new();
        store.merge(Reading::new("B", 21.5, 40.0), at(0));
        store.merge(Reading::new("A", 19.0, 55.2), at(1));

        let snapshot = store.snapshot();
        assert_eq!(
            values(&snapshot),
            vec![("A".to_string(), 19.0, 55.2), ("B".to_string(), 21.5, 40.0)]
        );
        assert_eq!(snapshot[0].received_at, at(1));
        assert_eq!(snapshot[1].received_at, at(0));
    }

    #[test]
    fn test_lexicographic_order() {
        let store = GroupAggregator::new();
        for id in ["kitchen", "Attic", "b", "10", "9", "a"] {
            store.merge(Reading::new(id, 20.0, 50.0), at(0));
        }
        let ids: Vec<String> = store.snapshot().into_iter().map(|s| s.group_id).collect();
        assert_eq!(ids, vec!["10", "9", "Attic", "a", "b", "kitchen"]);
    }

    #[test]
    fn test_latest_reading_replaces_previous() {
        let store = GroupAggregator::new();
        store.merge(Reading::new("A", 19.0, 55.2), at(0));
        store.merge(Reading::new("B", 21.5, 40.0), at(1));
        store.merge(Reading::new("A", 22.0, 48.0), at(2));

        assert_eq!(store.len(), 2);
        let a = store.get("A").unwrap();
        assert_eq!((a.temperature, a.humidity), (22.0, 48.0));
        assert_eq!(a.received_at, at(2));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let once = GroupAggregator::new();
        once.merge(Reading::new("A", 19.0, 55.2), at(0));

        let twice = GroupAggregator::new();
        twice.merge(Reading::new("A", 19.0, 55.2), at(0));
        twice.merge(Reading::new("A", 19.0, 55.2), at(5));

        assert_eq!(values(&once.snapshot()), values(&twice.snapshot()));
    }

    #[test]
    fn test_snapshot_does_not_mutate() {
        let store = GroupAggregator::new();
        store.merge(Reading::new("A", 19.0, 55.2), at(0));
        let first = store.snapshot();
        let second = store.snapshot();
        assert_eq!(first, second);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_age() {
        let store = GroupAggregator::new();
        store.merge(Reading::new("A", 19.0, 55.2), at(0));
        let a = store.get("A").unwrap();
        assert_eq!(a.age(at(90)), Duration::from_secs(90));
        assert_eq!(a.age(at(-5)), Duration::ZERO);
    }

    #[test]
    fn test_concurrent_merge_and_snapshot() {
        let store = Arc::new(GroupAggregator::new());
        let writers: Vec<_> = (0..4)
            .map(|w| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..200 {
                        store.merge(Reading::new(format!("g{}", i % 10), w as f64, i as f64), at(i));
                    }
                })
            })
            .collect();

        for _ in 0..50 {
            let snapshot = store.snapshot();
            assert!(snapshot.windows(2).all(|w| w[0].group_id < w[1].group_id));
        }

        for writer in writers {
            writer.join().unwrap();
        }
        assert_eq!(store.len(), 10);
    }
}
