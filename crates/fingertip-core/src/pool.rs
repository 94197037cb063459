#![forbid(unsafe_code)]

//! Slab storage for pointers.
//!
//! [`PointerPool`] keeps pointers in a growable slab with a free list of
//! recycled slot indices, so steady-state input does not allocate.
//!
//! # Invariants
//!
//! 1. Pointer ids are issued from a strictly increasing counter and are never
//!    reissued, even after their slot is recycled. Running the counter past
//!    `i32::MAX` is a contract violation; release builds wrap to 0.
//! 2. A slot is recycled only when its pointer has been discarded by the
//!    input layer *and* its retain count is zero.
//! 3. `live_ids` lists issued, not-yet-discarded pointers in issue order.

use ahash::AHashMap;

use crate::geometry::Vec2;
use crate::input::InputSourceId;
use crate::pointer::{Pointer, PointerFlags, PointerId, PointerKind};

/// Counters exposed for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub issued: u64,
    pub recycled: u64,
    pub live: usize,
    pub capacity: usize,
}

#[derive(Debug)]
pub struct PointerPool {
    slots: Vec<Pointer>,
    free: Vec<usize>,
    index: AHashMap<PointerId, usize>,
    live: Vec<PointerId>,
    next_id: i32,
    issued: u64,
    recycled: u64,
}

impl Default for PointerPool {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl PointerPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-allocate `capacity` pooled slots.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let slots: Vec<Pointer> = (0..capacity).map(|_| Pointer::pooled()).collect();
        let free = (0..capacity).rev().collect();
        Self {
            slots,
            free,
            index: AHashMap::with_capacity(capacity),
            live: Vec::with_capacity(capacity),
            next_id: 0,
            issued: 0,
            recycled: 0,
        }
    }

    /// Take a slot and give it a fresh identity.
    pub fn issue(
        &mut self,
        kind: PointerKind,
        source: InputSourceId,
        position: Vec2,
        flags: PointerFlags,
    ) -> PointerId {
        let id = PointerId(self.next_id);
        debug_assert!(self.next_id < i32::MAX, "pointer id space exhausted");
        self.next_id = self.next_id.checked_add(1).unwrap_or_else(|| {
            tracing::error!(target: "fingertip.touch", "pointer id space exhausted; wrapping to 0");
            0
        });
        self.issued += 1;

        let slot = match self.free.pop() {
            Some(slot) => slot,
            None => {
                self.slots.push(Pointer::pooled());
                self.slots.len() - 1
            }
        };
        self.slots[slot].init(id, kind, source, position, flags);
        self.index.insert(id, slot);
        self.live.push(id);
        id
    }

    #[must_use]
    pub fn get(&self, id: PointerId) -> Option<&Pointer> {
        self.index.get(&id).map(|&slot| &self.slots[slot])
    }

    #[must_use]
    pub fn get_mut(&mut self, id: PointerId) -> Option<&mut Pointer> {
        self.index.get(&id).map(|&slot| &mut self.slots[slot])
    }

    #[must_use]
    pub fn contains(&self, id: PointerId) -> bool {
        self.index.contains_key(&id)
    }

    /// Issued and not yet discarded, in issue order.
    #[must_use]
    pub fn live_ids(&self) -> &[PointerId] {
        &self.live
    }

    /// Live pointers in issue order.
    pub fn iter(&self) -> impl Iterator<Item = &Pointer> + '_ {
        self.live.iter().filter_map(|id| self.get(*id))
    }

    /// Apply `f` to every live pointer.
    pub fn for_each_live_mut(&mut self, mut f: impl FnMut(&mut Pointer)) {
        for id in &self.live {
            if let Some(&slot) = self.index.get(id) {
                f(&mut self.slots[slot]);
            }
        }
    }

    /// Number of live pointers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            issued: self.issued,
            recycled: self.recycled,
            live: self.live.len(),
            capacity: self.slots.len(),
        }
    }

    /// Increment the retain count. `None` for an unknown pointer.
    pub fn retain(&mut self, id: PointerId) -> Option<u32> {
        self.get_mut(id).map(Pointer::retain)
    }

    /// Decrement the retain count, recycling a discarded pointer at zero.
    pub fn release(&mut self, id: PointerId) -> Option<u32> {
        let pointer = self.get_mut(id)?;
        let count = pointer.release();
        if count == 0 && pointer.is_discarded() {
            self.recycle(id);
        }
        Some(count)
    }

    /// The input layer is done with this pointer.
    ///
    /// The slot is recycled now if nothing retains it, or on the final
    /// [`release`](Self::release) otherwise. Returns `false` for an unknown
    /// or already-discarded pointer.
    pub fn discard(&mut self, id: PointerId) -> bool {
        let Some(pointer) = self.get_mut(id) else {
            return false;
        };
        if pointer.discarded {
            return false;
        }
        pointer.discarded = true;
        let retained = pointer.ref_count() > 0;
        self.live.retain(|live| *live != id);
        if retained {
            tracing::trace!(target: "fingertip.touch", pointer = %id, "discard deferred while retained");
        } else {
            self.recycle(id);
        }
        true
    }

    fn recycle(&mut self, id: PointerId) {
        if let Some(slot) = self.index.remove(&id) {
            self.slots[slot].reset();
            self.free.push(slot);
            self.recycled += 1;
        }
    }
}
