/// Stable handle to an occupied slot of a [`SlotArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SlotId(usize);

impl SlotId {
    pub(crate) fn index(self) -> usize {
        self.0
    }
}

/// Owns every entry of a cache. Ordering structures refer to entries by [`SlotId`] only,
/// so removing an entry can never leave a dangling link behind.
///
/// Vacated slots are recycled through `vacant` before the vector grows.
#[derive(Debug)]
pub(crate) struct SlotArena<T> {
    slots: Vec<Option<T>>,
    vacant: Vec<SlotId>,
}

impl<T> SlotArena<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            vacant: Vec::new(),
        }
    }

    pub(crate) fn insert(&mut self, value: T) -> SlotId {
        match self.vacant.pop() {
            Some(id) => {
                self.slots[id.0] = Some(value);
                id
            }
            None => {
                self.slots.push(Some(value));
                SlotId(self.slots.len() - 1)
            }
        }
    }

    /// Vacates the slot. Removing an already vacant slot returns [`None`] and changes
    /// nothing.
    pub(crate) fn remove(&mut self, id: SlotId) -> Option<T> {
        let value = self.slots.get_mut(id.0).and_then(Option::take)?;
        self.vacant.push(id);
        Some(value)
    }

    pub(crate) fn get(&self, id: SlotId) -> Option<&T> {
        self.slots.get(id.0)?.as_ref()
    }

    pub(crate) fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.slots.get_mut(id.0)?.as_mut()
    }

    /// Number of occupied slots.
    pub(crate) fn len(&self) -> usize {
        self.slots.len() - self.vacant.len()
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.vacant.clear();
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (SlotId, &T)> {
        (0..)
            .map(SlotId)
            .zip(&self.slots)
            .filter_map(|(id, slot)| Some((id, slot.as_ref()?)))
    }
}
