//! Ordered slot arena backing the registry.
//!
//! Entries live in a slot vector and are chained in insertion order through
//! `prev`/`next` slot indices with explicit head and tail links. Removal is an
//! O(1) unlink that treats head, tail, middle and sole elements uniformly.
//! Freed slots are recycled with a bumped generation so a key to a removed
//! value never resolves to a later occupant of the same slot.

/// Stable key of an arena slot occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SlotKey {
    index: usize,
    generation: u32,
}

impl SlotKey {
    pub(crate) fn index(self) -> usize {
        self.index
    }

    pub(crate) fn generation(self) -> u32 {
        self.generation
    }
}

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    node: Option<Node<T>>,
}

/// Insertion-ordered arena with generation-checked keys.
#[derive(Debug)]
pub(crate) struct OrderedArena<T> {
    slots: Vec<Slot<T>>,
    // Capacity is kept >= slots.len() so removal never allocates.
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<T> OrderedArena<T> {
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append `value` after the current tail.
    ///
    /// Returns `None` if slot storage could not grow; the arena is unchanged.
    pub(crate) fn push_back(&mut self, value: T) -> Option<SlotKey> {
        let index = match self.free.pop() {
            Some(index) => index,
            None => self.grow()?,
        };

        let prev = self.tail;
        let slot = self.slots.get_mut(index)?;
        slot.node = Some(Node {
            value,
            prev,
            next: None,
        });
        let key = SlotKey {
            index,
            generation: slot.generation,
        };

        match prev {
            Some(tail) => {
                if let Some(node) = self.node_mut(tail) {
                    node.next = Some(index);
                }
            }
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.len = self.len.saturating_add(1);
        Some(key)
    }

    fn grow(&mut self) -> Option<usize> {
        self.slots.try_reserve(1).ok()?;
        let needed = self
            .slots
            .len()
            .saturating_add(1)
            .saturating_sub(self.free.len());
        self.free.try_reserve(needed).ok()?;

        let index = self.slots.len();
        self.slots.push(Slot {
            generation: 0,
            node: None,
        });
        Some(index)
    }

    /// Unlink and return the value behind `key`.
    pub(crate) fn remove(&mut self, key: SlotKey) -> Option<T> {
        let slot = self.slots.get_mut(key.index)?;
        if slot.generation != key.generation {
            return None;
        }
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);

        self.unlink(node.prev, node.next);
        self.free.push(key.index);
        self.len = self.len.saturating_sub(1);
        Some(node.value)
    }

    fn unlink(&mut self, prev: Option<usize>, next: Option<usize>) {
        match prev {
            Some(index) => {
                if let Some(node) = self.node_mut(index) {
                    node.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(index) => {
                if let Some(node) = self.node_mut(index) {
                    node.prev = prev;
                }
            }
            None => self.tail = prev,
        }
    }

    fn node_mut(&mut self, index: usize) -> Option<&mut Node<T>> {
        self.slots.get_mut(index)?.node.as_mut()
    }

    pub(crate) fn get(&self, key: SlotKey) -> Option<&T> {
        let slot = self.slots.get(key.index)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.node.as_ref().map(|node| &node.value)
    }

    pub(crate) fn get_mut(&mut self, key: SlotKey) -> Option<&mut T> {
        let slot = self.slots.get_mut(key.index)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.node.as_mut().map(|node| &mut node.value)
    }

    /// Key of the first value in insertion order matching `predicate`.
    pub(crate) fn find<P>(&self, mut predicate: P) -> Option<SlotKey>
    where
        P: FnMut(&T) -> bool,
    {
        self.iter()
            .find(|(_, value)| predicate(value))
            .map(|(key, _)| key)
    }

    /// Visit every value in insertion order.
    pub(crate) fn for_each_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(SlotKey, &mut T),
    {
        let mut cursor = self.head;
        while let Some(index) = cursor {
            let Some(slot) = self.slots.get_mut(index) else {
                break;
            };
            let generation = slot.generation;
            let Some(node) = slot.node.as_mut() else {
                break;
            };
            cursor = node.next;
            f(SlotKey { index, generation }, &mut node.value);
        }
    }

    pub(crate) fn iter(&self) -> Iter<'_, T> {
        Iter {
            arena: self,
            cursor: self.head,
        }
    }
}

impl<T> Default for OrderedArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Insertion-order iterator over `(key, value)` pairs.
#[derive(Debug)]
pub(crate) struct Iter<'a, T> {
    arena: &'a OrderedArena<T>,
    cursor: Option<usize>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (SlotKey, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;
        let slot = self.arena.slots.get(index)?;
        let node = slot.node.as_ref()?;
        self.cursor = node.next;
        Some((
            SlotKey {
                index,
                generation: slot.generation,
            },
            &node.value,
        ))
    }
}
