use crate::cache::slot_arena::{SlotArena, SlotId};
use crate::error::InvariantError;
use std::mem;

/// Neighbour slots of an entry. `None` means the entry sits at a boundary of its list.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Links {
    pub(crate) prev: Option<SlotId>,
    pub(crate) next: Option<SlotId>,
}

/// Implemented by arena entries that can be threaded into a [`RecencyList`].
pub(crate) trait Linked {
    fn links(&self) -> &Links;

    fn links_mut(&mut self) -> &mut Links;
}

/// Doubly-linked list of arena slots, ordered from least recently used (head) to most
/// recently used (tail).
///
/// The list does not own its entries. `head` and `tail` are the boundary markers; every
/// operation takes the arena that owns the linked entries, and a slot must only ever be
/// unlinked from the list it was pushed onto.
#[derive(Debug, Default)]
pub(crate) struct RecencyList {
    head: Option<SlotId>,
    tail: Option<SlotId>,
    len: usize,
}

impl RecencyList {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The least recently used slot.
    pub(crate) fn front(&self) -> Option<SlotId> {
        self.head
    }

    pub(crate) fn back(&self) -> Option<SlotId> {
        self.tail
    }

    /// Links `id` as the most recently used slot.
    pub(crate) fn push_back<T: Linked>(&mut self, arena: &mut SlotArena<T>, id: SlotId) {
        let Some(entry) = arena.get_mut(id) else {
            return;
        };
        *entry.links_mut() = Links {
            prev: self.tail,
            next: None,
        };

        match self.tail.and_then(|tail| arena.get_mut(tail)) {
            Some(tail) => tail.links_mut().next = Some(id),
            None => self.head = Some(id),
        }

        self.tail = Some(id);
        self.len += 1;
    }

    pub(crate) fn unlink<T: Linked>(&mut self, arena: &mut SlotArena<T>, id: SlotId) {
        let Some(entry) = arena.get_mut(id) else {
            return;
        };
        let Links { prev, next } = mem::take(entry.links_mut());

        debug_assert!(prev.is_some() || self.head == Some(id));
        debug_assert!(next.is_some() || self.tail == Some(id));

        match prev.and_then(|prev| arena.get_mut(prev)) {
            Some(prev) => prev.links_mut().next = next,
            None => self.head = next,
        }
        match next.and_then(|next| arena.get_mut(next)) {
            Some(next) => next.links_mut().prev = prev,
            None => self.tail = prev,
        }

        self.len -= 1;
    }

    pub(crate) fn pop_front<T: Linked>(&mut self, arena: &mut SlotArena<T>) -> Option<SlotId> {
        let id = self.front()?;
        self.unlink(arena, id);
        Some(id)
    }

    pub(crate) fn move_to_back<T: Linked>(&mut self, arena: &mut SlotArena<T>, id: SlotId) {
        if self.back() == Some(id) {
            return;
        }
        self.unlink(arena, id);
        self.push_back(arena, id);
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::new();
    }

    /// Walks the list checking that every link is symmetric and returns the slots in order.
    pub(crate) fn check_links<T: Linked>(
        &self,
        arena: &SlotArena<T>,
    ) -> Result<Vec<SlotId>, InvariantError> {
        let mut walked = Vec::with_capacity(self.len);
        let mut prev = None;
        let mut next = self.head;

        while let Some(id) = next {
            let broken = InvariantError::BrokenLink { slot: id.index() };
            let entry = arena.get(id).ok_or(broken.clone())?;
            if entry.links().prev != prev || walked.len() == self.len {
                return Err(broken);
            }
            walked.push(id);
            prev = Some(id);
            next = entry.links().next;
        }

        if self.tail != prev {
            return Err(InvariantError::BrokenLink {
                slot: prev.map_or(0, SlotId::index),
            });
        }
        if walked.len() != self.len {
            return Err(InvariantError::LengthMismatch {
                indexed: self.len,
                ordered: walked.len(),
            });
        }

        Ok(walked)
    }

    /// Walks the list from the least to the most recently used slot.
    pub(crate) fn iter<'a, T: Linked>(&self, arena: &'a SlotArena<T>) -> Iter<'a, T> {
        Iter {
            arena,
            next: self.head,
        }
    }
}

pub(crate) struct Iter<'a, T> {
    arena: &'a SlotArena<T>,
    next: Option<SlotId>,
}

impl<T: Linked> Iterator for Iter<'_, T> {
    type Item = SlotId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        self.next = self.arena.get(id).and_then(|entry| entry.links().next);
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Node {
        value: &'static str,
        links: Links,
    }

    impl Linked for Node {
        fn links(&self) -> &Links {
            &self.links
        }

        fn links_mut(&mut self) -> &mut Links {
            &mut self.links
        }
    }

    fn node(value: &'static str) -> Node {
        Node {
            value,
            links: Links::default(),
        }
    }

    fn values(list: &RecencyList, arena: &SlotArena<Node>) -> Vec<&'static str> {
        list.iter(arena)
            .map(|id| arena.get(id).map(|node| node.value).unwrap())
            .collect()
    }

    #[test]
    fn it_pushes_to_the_back() {
        // given
        let mut arena = SlotArena::with_capacity(3);
        let mut list = RecencyList::new();

        // when
        for value in ["first", "second", "third"] {
            let id = arena.insert(node(value));
            list.push_back(&mut arena, id);
        }

        // then
        assert_eq!(values(&list, &arena), vec!["first", "second", "third"]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn it_pops_the_oldest_slot() {
        // given
        let mut arena = SlotArena::with_capacity(2);
        let mut list = RecencyList::new();
        let first = arena.insert(node("first"));
        list.push_back(&mut arena, first);
        let second = arena.insert(node("second"));
        list.push_back(&mut arena, second);

        // when
        let popped = list.pop_front(&mut arena);

        // then
        assert_eq!(popped, Some(first));
        assert_eq!(list.front(), Some(second));
        assert_eq!(list.back(), Some(second));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn it_moves_a_middle_slot_to_the_back() {
        // given
        let mut arena = SlotArena::with_capacity(3);
        let mut list = RecencyList::new();
        let ids: Vec<_> = ["first", "second", "third"]
            .into_iter()
            .map(|value| {
                let id = arena.insert(node(value));
                list.push_back(&mut arena, id);
                id
            })
            .collect();

        // when
        list.move_to_back(&mut arena, ids[1]);

        // then
        assert_eq!(values(&list, &arena), vec!["first", "third", "second"]);
        assert_eq!(list.back(), Some(ids[1]));
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn it_unlinks_the_only_slot() {
        // given
        let mut arena = SlotArena::with_capacity(1);
        let mut list = RecencyList::new();
        let id = arena.insert(node("only"));
        list.push_back(&mut arena, id);

        // when
        list.unlink(&mut arena, id);

        // then
        assert!(list.is_empty());
        assert_eq!(list.front(), None);
        assert_eq!(list.back(), None);
        assert_eq!(list.pop_front(&mut arena), None);
    }

    #[test]
    fn it_detects_asymmetric_links() {
        // given
        let mut arena = SlotArena::with_capacity(2);
        let mut list = RecencyList::new();
        let first = arena.insert(node("first"));
        list.push_back(&mut arena, first);
        let second = arena.insert(node("second"));
        list.push_back(&mut arena, second);
        assert_eq!(list.check_links(&arena), Ok(vec![first, second]));

        // when
        if let Some(node) = arena.get_mut(second) {
            node.links.prev = None;
        }

        // then
        assert_eq!(
            list.check_links(&arena),
            Err(InvariantError::BrokenLink {
                slot: second.index()
            })
        );
    }
}
