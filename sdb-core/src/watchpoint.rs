//! Fixed-capacity watchpoint pool
//!
//! All watchpoint records live in one arena allocated at construction. Two
//! singly linked lists thread through the arena by index: the free list and the
//! active list. A slot is on exactly one of them at any time, and a slot's id
//! is its arena index, so a reused slot reports the id it always had.

use crate::types::{Result, SdbError, WatchpointId, Word};

/// A watched expression and its last observed value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watchpoint {
    /// Stable id (pool slot index)
    pub id: WatchpointId,
    /// Expression text, re-evaluated on every check
    pub expr: String,
    /// Value seen at the last check (or at creation)
    pub last_value: Word,
    /// Only enabled watchpoints are checked
    pub enabled: bool,
}

#[derive(Debug)]
struct Slot {
    wp: Watchpoint,
    next: Option<usize>,
}

/// Arena of watchpoint slots with free and active lists
#[derive(Debug)]
pub struct WatchpointPool {
    slots: Vec<Slot>,
    active_head: Option<usize>,
    free_head: Option<usize>,
    active_count: usize,
}

impl WatchpointPool {
    /// Create a pool of `capacity` free slots, ids `0..capacity`
    pub fn new(capacity: usize) -> Self {
        let slots = (0..capacity)
            .map(|id| Slot {
                wp: Watchpoint {
                    id,
                    expr: String::new(),
                    last_value: 0,
                    enabled: false,
                },
                next: (id + 1 < capacity).then_some(id + 1),
            })
            .collect();

        Self {
            slots,
            active_head: None,
            free_head: (capacity > 0).then_some(0),
            active_count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.active_count
    }

    pub fn free_count(&self) -> usize {
        self.slots.len() - self.active_count
    }

    /// Move the head of the free list onto the active list
    pub fn allocate(&mut self) -> Result<WatchpointId> {
        let id = self.free_head.ok_or(SdbError::ResourceExhausted {
            capacity: self.capacity(),
        })?;

        let slot = &mut self.slots[id];
        self.free_head = slot.next;
        slot.next = self.active_head;
        slot.wp.enabled = true;
        self.active_head = Some(id);
        self.active_count += 1;

        log::trace!("allocated watchpoint slot {}", id);
        Ok(id)
    }

    /// Unlink `id` from the active list, clear it and push it onto the free list
    pub fn release(&mut self, id: WatchpointId) -> Result<()> {
        let mut prev: Option<usize> = None;
        let mut cursor = self.active_head;
        while let Some(idx) = cursor {
            if idx == id {
                break;
            }
            prev = cursor;
            cursor = self.slots[idx].next;
        }

        if cursor.is_none() {
            log::error!("Watchpoint {} not found in active list", id);
            return Err(SdbError::NotActive(id));
        }

        let next = self.slots[id].next;
        match prev {
            Some(p) => self.slots[p].next = next,
            None => self.active_head = next,
        }

        let slot = &mut self.slots[id];
        slot.wp.expr.clear();
        slot.wp.enabled = false;
        slot.wp.last_value = 0;
        slot.next = self.free_head;
        self.free_head = Some(id);
        self.active_count -= 1;

        log::trace!("released watchpoint slot {}", id);
        Ok(())
    }

    /// Linear search of the active list
    pub fn find_active(&self, id: WatchpointId) -> bool {
        self.iter().any(|wp| wp.id == id)
    }

    /// Find an active watchpoint by id
    pub fn get(&self, id: WatchpointId) -> Option<&Watchpoint> {
        self.iter().find(|wp| wp.id == id)
    }

    /// Find an active watchpoint by id, mutably
    pub fn get_mut(&mut self, id: WatchpointId) -> Option<&mut Watchpoint> {
        if self.find_active(id) {
            Some(&mut self.slots[id].wp)
        } else {
            None
        }
    }

    /// Ids of the active watchpoints in list order
    pub fn active_ids(&self) -> Vec<WatchpointId> {
        self.iter().map(|wp| wp.id).collect()
    }

    /// Iterate over active watchpoints, most recently allocated first
    pub fn iter(&self) -> Active<'_> {
        Active {
            pool: self,
            cursor: self.active_head,
        }
    }
}

/// Iterator over the active list
pub struct Active<'a> {
    pool: &'a WatchpointPool,
    cursor: Option<usize>,
}

impl<'a> Iterator for Active<'a> {
    type Item = &'a Watchpoint;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.cursor?;
        let slot = &self.pool.slots[idx];
        self.cursor = slot.next;
        Some(&slot.wp)
    }
}

impl<'a> IntoIterator for &'a WatchpointPool {
    type Item = &'a Watchpoint;
    type IntoIter = Active<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
