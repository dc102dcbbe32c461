use crate::cache::recency_list::{Linked, Links};

/// An LRU entry. Its only metadata is its position in the recency list.
#[derive(Debug)]
pub(crate) struct Entry<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    links: Links,
}

impl<K, V> Entry<K, V> {
    pub(crate) fn new(key: K, value: V) -> Self {
        Self {
            key,
            value,
            links: Links::default(),
        }
    }
}

impl<K, V> Linked for Entry<K, V> {
    fn links(&self) -> &Links {
        &self.links
    }

    fn links_mut(&mut self) -> &mut Links {
        &mut self.links
    }
}

/// An LFU entry, filed in the frequency bucket matching `frequency`.
#[derive(Debug)]
pub(crate) struct LfuEntry<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    frequency: u64,
    links: Links,
}

impl<K, V> LfuEntry<K, V> {
    pub(crate) fn new(key: K, value: V) -> Self {
        Self {
            key,
            value,
            frequency: 1,
            links: Links::default(),
        }
    }
}

impl<K, V> Linked for LfuEntry<K, V> {
    fn links(&self) -> &Links {
        &self.links
    }

    fn links_mut(&mut self) -> &mut Links {
        &mut self.links
    }
}

/// Implemented by entries that can be filed in a frequency bucket.
pub(crate) trait Counted: Linked {
    fn frequency(&self) -> u64;

    fn set_frequency(&mut self, frequency: u64);
}

impl<K, V> Counted for LfuEntry<K, V> {
    fn frequency(&self) -> u64 {
        self.frequency
    }

    fn set_frequency(&mut self, frequency: u64) {
        self.frequency = frequency;
    }
}
