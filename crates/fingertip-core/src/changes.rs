#![forbid(unsafe_code)]

//! Per-frame pointer change accumulation.
//!
//! Input sources describe what happened to each pointer during a frame by
//! OR-ing [`PointerChange`] flags into a shared [`PointerChanges`] set. The
//! pipeline flushes the set once per frame, in the order pointers were first
//! mentioned.
//!
//! # Invariants
//!
//! 1. Apart from `UPDATED` (a pointer may move many times per frame), a flag
//!    must not be set twice for the same pointer in one frame. This is a
//!    contract violation checked with `debug_assert!`.
//! 2. `CANCELLED` is authoritative: dispatch ignores every other flag of a
//!    cancelled pointer (see [`PointerChange::effective`]).
//! 3. Flushing drains the set; flushing an empty set yields nothing.

use ahash::AHashMap;
use bitflags::bitflags;

use crate::pointer::PointerId;

bitflags! {
    /// What happened to one pointer during one frame.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PointerChange: u8 {
        const ADDED     = 1 << 0;
        const UPDATED   = 1 << 1;
        const PRESSED   = 1 << 2;
        const RELEASED  = 1 << 3;
        const REMOVED   = 1 << 4;
        const CANCELLED = 1 << 5;
    }
}

impl PointerChange {
    /// Flags that will actually be dispatched.
    #[must_use]
    pub fn effective(self) -> Self {
        if self.contains(Self::CANCELLED) {
            Self::CANCELLED
        } else {
            self
        }
    }
}

/// Insertion-ordered `PointerId -> PointerChange` accumulator.
#[derive(Debug, Default, Clone)]
pub struct PointerChanges {
    order: Vec<PointerId>,
    changes: AHashMap<PointerId, PointerChange>,
}

impl PointerChanges {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: PointerId) -> Option<PointerChange> {
        self.changes.get(&id).copied()
    }

    /// Pointers in the order they were first mentioned this frame.
    #[must_use]
    pub fn ids(&self) -> &[PointerId] {
        &self.order
    }

    fn put(&mut self, id: PointerId, change: PointerChange) {
        debug_assert!(id.is_valid(), "change recorded for invalid pointer id");
        match self.changes.get_mut(&id) {
            Some(existing) => {
                let repeated = (*existing & change) - PointerChange::UPDATED;
                debug_assert!(
                    repeated.is_empty(),
                    "{id} already has {repeated:?} this frame"
                );
                *existing |= change;
            }
            None => {
                self.order.push(id);
                self.changes.insert(id, change);
            }
        }
    }

    pub fn put_added(&mut self, id: PointerId) {
        self.put(id, PointerChange::ADDED);
    }

    pub fn put_updated(&mut self, id: PointerId) {
        self.put(id, PointerChange::UPDATED);
    }

    pub fn put_pressed(&mut self, id: PointerId) {
        self.put(id, PointerChange::PRESSED);
    }

    pub fn put_released(&mut self, id: PointerId) {
        self.put(id, PointerChange::RELEASED);
    }

    pub fn put_removed(&mut self, id: PointerId) {
        self.put(id, PointerChange::REMOVED);
    }

    pub fn put_cancelled(&mut self, id: PointerId) {
        self.put(id, PointerChange::CANCELLED);
    }

    pub fn put_add_and_press(&mut self, id: PointerId) {
        self.put(id, PointerChange::ADDED | PointerChange::PRESSED);
    }

    pub fn put_release_and_remove(&mut self, id: PointerId) {
        self.put(id, PointerChange::RELEASED | PointerChange::REMOVED);
    }

    /// A contact that began and ended between two polls.
    pub fn put_single_frame_tap(&mut self, id: PointerId) {
        self.put(
            id,
            PointerChange::ADDED
                | PointerChange::PRESSED
                | PointerChange::RELEASED
                | PointerChange::REMOVED,
        );
    }

    /// Drain into `out` in insertion order.
    pub fn flush_into(&mut self, out: &mut Vec<(PointerId, PointerChange)>) {
        out.reserve(self.order.len());
        for id in self.order.drain(..) {
            if let Some(change) = self.changes.remove(&id) {
                out.push((id, change));
            }
        }
        debug_assert!(self.changes.is_empty());
    }

    /// Drain into a new vector.
    #[must_use]
    pub fn flush(&mut self) -> Vec<(PointerId, PointerChange)> {
        let mut out = Vec::with_capacity(self.order.len());
        self.flush_into(&mut out);
        out
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.changes.clear();
    }
}
