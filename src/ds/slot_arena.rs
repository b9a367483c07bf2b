//! Slot storage for cache entries.
//!
//! Both index views of the cache (bucket → slot, recency → slot) store only
//! a [`SlotId`], so each entry lives exactly once, here. Vacant slots are
//! chained into an intrusive free list and reused before the vector grows.
//! A `SlotId` is only meaningful while the slot it names is occupied.
//!
//! ```text
//!   slots:  [ Occupied(a) | Vacant(→3) | Occupied(b) | Vacant(end) ]
//!                              ▲
//!   free_head ─────────────────┘
//! ```
//!
//! Not synchronized; the cache keeps it behind its state lock.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SlotId(usize);

#[derive(Debug)]
enum Slot<T> {
    Occupied(T),
    Vacant { next_free: Option<usize> },
}

#[derive(Debug)]
pub(crate) struct SlotArena<T> {
    slots: Vec<Slot<T>>,
    free_head: Option<usize>,
    occupied: usize,
}

impl<T> SlotArena<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_head: None,
            occupied: 0,
        }
    }

    pub(crate) fn insert(&mut self, value: T) -> SlotId {
        self.occupied += 1;
        let Some(idx) = self.free_head else {
            self.slots.push(Slot::Occupied(value));
            return SlotId(self.slots.len() - 1);
        };
        let previous = std::mem::replace(&mut self.slots[idx], Slot::Occupied(value));
        self.free_head = match previous {
            Slot::Vacant { next_free } => next_free,
            Slot::Occupied(_) => unreachable!("free list points at occupied slot {}", idx),
        };
        SlotId(idx)
    }

    /// Vacates `id`. Returns `None` if it was already vacant.
    pub(crate) fn remove(&mut self, id: SlotId) -> Option<T> {
        let slot = self.slots.get_mut(id.0)?;
        if matches!(slot, Slot::Vacant { .. }) {
            return None;
        }
        let vacated = Slot::Vacant {
            next_free: self.free_head,
        };
        let Slot::Occupied(value) = std::mem::replace(slot, vacated) else {
            return None;
        };
        self.free_head = Some(id.0);
        self.occupied -= 1;
        Some(value)
    }

    pub(crate) fn get(&self, id: SlotId) -> Option<&T> {
        match self.slots.get(id.0)? {
            Slot::Occupied(value) => Some(value),
            Slot::Vacant { .. } => None,
        }
    }

    pub(crate) fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        match self.slots.get_mut(id.0)? {
            Slot::Occupied(value) => Some(value),
            Slot::Vacant { .. } => None,
        }
    }

    /// Number of occupied slots.
    pub(crate) fn len(&self) -> usize {
        self.occupied
    }
}
