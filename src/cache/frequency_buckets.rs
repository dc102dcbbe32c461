use crate::cache::RandomState;
use crate::cache::entry::Counted;
use crate::cache::recency_list::RecencyList;
use crate::cache::slot_arena::{SlotArena, SlotId};
use crate::error::InvariantError;
use std::collections::HashMap;

/// Maps each frequency to the recency list of entries currently at that frequency.
///
/// Within a bucket entries are kept in the order they reached the frequency, so the
/// head of the minimum bucket is the least frequently and, among ties, the longest
/// resident entry. Empty buckets are dropped eagerly.
#[derive(Debug, Default)]
pub(crate) struct FrequencyBuckets {
    buckets: HashMap<u64, RecencyList, RandomState>,
    min_frequency: u64,
}

impl FrequencyBuckets {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Smallest frequency with a non-empty bucket.
    pub(crate) fn min_frequency(&self) -> Option<u64> {
        (!self.buckets.is_empty()).then_some(self.min_frequency)
    }

    /// Files a new entry under frequency one.
    pub(crate) fn insert<T: Counted>(&mut self, arena: &mut SlotArena<T>, id: SlotId) {
        let Some(entry) = arena.get_mut(id) else {
            return;
        };
        entry.set_frequency(1);
        self.push(arena, id, 1);
        self.min_frequency = 1;
    }

    /// Moves an entry up to the next frequency and returns it.
    pub(crate) fn touch<T: Counted>(&mut self, arena: &mut SlotArena<T>, id: SlotId) -> u64 {
        let Some(frequency) = arena.get(id).map(Counted::frequency) else {
            return 0;
        };

        let emptied = self.unlink(arena, id, frequency);
        if emptied && frequency == self.min_frequency {
            self.min_frequency += 1;
        }

        let next = frequency + 1;
        if let Some(entry) = arena.get_mut(id) {
            entry.set_frequency(next);
        }
        self.push(arena, id, next);
        next
    }

    /// Unlinks and returns the head of the minimum-frequency bucket.
    pub(crate) fn pop_min<T: Counted>(&mut self, arena: &mut SlotArena<T>) -> Option<SlotId> {
        if !self.buckets.contains_key(&self.min_frequency) {
            self.recompute_min_frequency();
        }

        let frequency = self.min_frequency;
        let bucket = self.buckets.get_mut(&frequency)?;
        let id = bucket.pop_front(arena)?;
        if bucket.is_empty() {
            self.buckets.remove(&frequency);
        }
        Some(id)
    }

    /// Lowers every entry's frequency by `amount`, never below one, and refiles it.
    ///
    /// Buckets are drained in ascending frequency order, so entries merged into the same
    /// bucket keep their relative eviction order.
    pub(crate) fn decay<T: Counted>(&mut self, arena: &mut SlotArena<T>, amount: u64) {
        let mut drained: Vec<(u64, Vec<SlotId>)> = self
            .buckets
            .drain()
            .map(|(frequency, bucket)| (frequency, bucket.iter(arena).collect()))
            .collect();
        drained.sort_unstable_by_key(|(frequency, _)| *frequency);

        for (frequency, ids) in drained {
            let decayed = frequency.saturating_sub(amount).max(1);
            for id in ids {
                if let Some(entry) = arena.get_mut(id) {
                    entry.set_frequency(decayed);
                }
                self.push(arena, id, decayed);
            }
        }

        self.recompute_min_frequency();
    }

    pub(crate) fn clear(&mut self) {
        self.buckets.clear();
        self.min_frequency = 0;
    }

    /// Checks that every bucket is well linked and holds only entries of its frequency.
    /// Returns the number of entries across all buckets.
    pub(crate) fn check_invariants<T: Counted>(
        &self,
        arena: &SlotArena<T>,
    ) -> Result<usize, InvariantError> {
        let mut filed = 0;

        for (&bucket, list) in &self.buckets {
            if list.is_empty() {
                return Err(InvariantError::EmptyBucket { frequency: bucket });
            }
            for id in list.check_links(arena)? {
                let frequency = arena.get(id).map_or(0, Counted::frequency);
                if frequency != bucket {
                    return Err(InvariantError::Misfiled { frequency, bucket });
                }
                filed += 1;
            }
        }

        if let Some(actual) = self.buckets.keys().min().copied() {
            if actual != self.min_frequency {
                return Err(InvariantError::StaleMinimum {
                    tracked: self.min_frequency,
                    actual,
                });
            }
        }

        Ok(filed)
    }

    fn push<T: Counted>(&mut self, arena: &mut SlotArena<T>, id: SlotId, frequency: u64) {
        self.buckets
            .entry(frequency)
            .or_default()
            .push_back(arena, id);
    }

    /// Returns whether the bucket became empty and was dropped.
    fn unlink<T: Counted>(&mut self, arena: &mut SlotArena<T>, id: SlotId, frequency: u64) -> bool {
        let Some(bucket) = self.buckets.get_mut(&frequency) else {
            return false;
        };
        bucket.unlink(arena, id);
        if bucket.is_empty() {
            self.buckets.remove(&frequency);
            return true;
        }
        false
    }

    fn recompute_min_frequency(&mut self) {
        self.min_frequency = self.buckets.keys().min().copied().unwrap_or(1);
    }
}
