#![forbid(unsafe_code)]

//! Gesture registry, pointer routing, and recognition arbitration.
//!
//! [`GestureManager`] is a [`PointerListener`]. Each frame it:
//!
//! 1. resets gestures that reached a terminal state and ticks the rest
//!    (`frame_started`);
//! 2. routes pressed pointers to the gestures on the hit target's ancestor
//!    chain, skipping gestures a started gesture prevents;
//! 3. routes updated, released and cancelled pointers through the durable
//!    pointer → gesture map recorded at press time;
//! 4. runs the deferred resets again and drops the hierarchy cache
//!    (`frame_finished`).
//!
//! A gesture asking for `Began` or `Ended` must win arbitration: if a started
//! gesture on the same ancestor chain can prevent it, it fails; otherwise
//! every possible gesture it can prevent is failed first.
//!
//! # Invariants
//!
//! 1. A pointer is retained once per started gesture holding it, and every
//!    retain is matched by a release when the gesture ends, is cancelled, is
//!    reset, or is removed.
//! 2. Every entry into a terminal state (`Ended`, `Failed`, `Cancelled`)
//!    schedules one deferred reset to `Idle`. Until it runs, a terminal
//!    gesture may still enter `Idle`, `Possible`, `Failed` or `Cancelled`;
//!    `Began`, `Changed` and `Ended` are warned and ignored.
//! 3. A `StateChanged` event is appended for every state-change request.
//! 4. Entry hooks for one gesture run in the order its states were entered.
//! 5. A panicking recognizer callback is logged and contained; the gesture
//!    keeps its recognizer and routing continues for the others.

use std::mem;
use std::panic::{AssertUnwindSafe, catch_unwind};

use ahash::AHashMap;
use fingertip_core::logging::panic_message;
use fingertip_core::{NodeId, Pointer, PointerFrame, PointerId, PointerListener, Vec2};

use crate::context::GestureContext;
use crate::error::GestureError;
use crate::events::{GestureEvent, GestureEventKind};
use crate::gesture::{Gesture, GestureCore, GestureHandle};
use crate::kind::{GestureKind, Recognizer};
use crate::scene::SceneTree;
use crate::state::{GestureState, PointersNumState};

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    gesture: Option<Gesture>,
}

fn take_scratch<T>(pool: &mut Vec<Vec<T>>) -> Vec<T> {
    pool.pop().unwrap_or_default()
}

fn give_scratch<T>(pool: &mut Vec<Vec<T>>, mut scratch: Vec<T>) {
    scratch.clear();
    pool.push(scratch);
}

#[derive(Debug, Default)]
pub struct GestureManager {
    slots: Vec<Slot>,
    free: Vec<u32>,
    scene: SceneTree,
    /// Gestures that accepted each pointer at press time.
    pointer_gestures: AHashMap<PointerId, Vec<GestureHandle>>,
    to_reset: Vec<GestureHandle>,
    /// Gestures on each target's ancestor chain; cleared every frame.
    hierarchy_cache: AHashMap<NodeId, Vec<GestureHandle>>,
    /// Entry hooks waiting for their recognizer's callback to return.
    pending_entries: Vec<(GestureHandle, GestureState)>,
    events: Vec<GestureEvent>,
    handle_scratch: Vec<Vec<GestureHandle>>,
    pointer_scratch: Vec<Vec<PointerId>>,
    press_groups: Vec<(NodeId, Vec<PointerId>)>,
    gesture_groups: Vec<(GestureHandle, Vec<PointerId>)>,
    shut_down: bool,
}

impl GestureManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Registry
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn scene(&self) -> &SceneTree {
        &self.scene
    }

    /// Mutable scene access; invalidates the hierarchy cache.
    pub fn scene_mut(&mut self) -> &mut SceneTree {
        self.hierarchy_cache.clear();
        &mut self.scene
    }

    /// Attach a recognizer to a scene node.
    pub fn add_gesture(
        &mut self,
        node: NodeId,
        kind: impl Into<GestureKind>,
    ) -> Result<GestureHandle, GestureError> {
        if self.shut_down {
            return Err(GestureError::ManagerShutDown);
        }
        if !self.scene.contains(node) {
            return Err(GestureError::UnknownNode(node));
        }
        let gesture = Gesture::new(node, kind.into());
        let name = gesture.core.name;
        let handle = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.gesture = Some(gesture);
                GestureHandle {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    gesture: Some(gesture),
                });
                GestureHandle {
                    index,
                    generation: 0,
                }
            }
        };
        self.scene.attach(node, handle)?;
        self.hierarchy_cache.clear();
        tracing::debug!(
            target: "fingertip.gesture",
            gesture = %handle,
            node = %node,
            kind = name,
            "gesture added"
        );
        Ok(handle)
    }

    /// Detach and return a gesture's recognizer. A started gesture is
    /// cancelled first; all of its pointer retains are released.
    pub fn remove_gesture(
        &mut self,
        frame: &mut PointerFrame<'_>,
        handle: GestureHandle,
    ) -> Result<GestureKind, GestureError> {
        let state = self
            .state(handle)
            .ok_or(GestureError::UnknownGesture(handle))?;
        if state.is_started() {
            self.change_state(frame, handle, GestureState::Cancelled);
        }
        let slot = &mut self.slots[handle.index as usize];
        let gesture = slot
            .gesture
            .take()
            .ok_or(GestureError::UnknownGesture(handle))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);

        for &pointer in &gesture.core.retained {
            frame.release(pointer);
        }
        for &pointer in &gesture.core.active_pointers {
            self.unlink(pointer, handle);
        }
        self.scene.detach(gesture.core.node, handle);
        self.to_reset.retain(|g| *g != handle);
        self.pending_entries.retain(|(g, _)| *g != handle);
        self.hierarchy_cache.clear();

        let mut unblocked = take_scratch(&mut self.handle_scratch);
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let Some(other) = slot.gesture.as_mut() else {
                continue;
            };
            other.core.friendly.retain(|g| *g != handle);
            if other.core.require_to_fail == Some(handle) {
                other.core.require_to_fail = None;
                if other.core.delayed_state.is_some() {
                    unblocked.push(GestureHandle {
                        index: index as u32,
                        generation: slot.generation,
                    });
                }
            }
        }
        for &other in &unblocked {
            let delayed = self.core_mut(other).and_then(|c| c.delayed_state.take());
            if let Some(delayed) = delayed {
                self.change_state(frame, other, delayed);
            }
        }
        give_scratch(&mut self.handle_scratch, unblocked);

        tracing::debug!(target: "fingertip.gesture", gesture = %handle, "gesture removed");
        gesture.kind.ok_or(GestureError::UnknownGesture(handle))
    }

    /// Remove a scene node and every gesture attached to it.
    pub fn remove_node(
        &mut self,
        frame: &mut PointerFrame<'_>,
        node: NodeId,
    ) -> Result<(), GestureError> {
        if !self.scene.contains(node) {
            return Err(GestureError::UnknownNode(node));
        }
        let attached = self.scene.gestures(node).to_vec();
        for handle in attached {
            self.remove_gesture(frame, handle)?;
        }
        self.scene.remove_node(node);
        self.hierarchy_cache.clear();
        Ok(())
    }

    fn gesture(&self, handle: GestureHandle) -> Option<&Gesture> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.gesture.as_ref()
    }

    fn gesture_mut(&mut self, handle: GestureHandle) -> Option<&mut Gesture> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.gesture.as_mut()
    }

    #[must_use]
    pub fn contains(&self, handle: GestureHandle) -> bool {
        self.gesture(handle).is_some()
    }

    #[must_use]
    pub fn core(&self, handle: GestureHandle) -> Option<&GestureCore> {
        self.gesture(handle).map(Gesture::core)
    }

    fn core_mut(&mut self, handle: GestureHandle) -> Option<&mut GestureCore> {
        self.gesture_mut(handle).map(|g| &mut g.core)
    }

    #[must_use]
    pub fn state(&self, handle: GestureHandle) -> Option<GestureState> {
        self.core(handle).map(GestureCore::state)
    }

    #[must_use]
    pub fn kind(&self, handle: GestureHandle) -> Option<&GestureKind> {
        self.gesture(handle).and_then(Gesture::kind)
    }

    pub fn kind_mut(&mut self, handle: GestureHandle) -> Option<&mut GestureKind> {
        self.gesture_mut(handle).and_then(|g| g.kind.as_mut())
    }

    /// Live gesture handles in slot order.
    pub fn handles(&self) -> impl Iterator<Item = GestureHandle> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.gesture.as_ref().map(|_| GestureHandle {
                index: index as u32,
                generation: slot.generation,
            })
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Gestures that accepted `pointer` and still track it.
    #[must_use]
    pub fn gestures_for_pointer(&self, pointer: PointerId) -> &[GestureHandle] {
        self.pointer_gestures
            .get(&pointer)
            .map_or(&[][..], Vec::as_slice)
    }

    /// Number of pointers with at least one interested gesture.
    #[must_use]
    pub fn tracked_pointers(&self) -> usize {
        self.pointer_gestures.len()
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    // -----------------------------------------------------------------------
    // Relationships and control
    // -----------------------------------------------------------------------

    fn ensure(&self, handle: GestureHandle) -> Result<(), GestureError> {
        if self.contains(handle) {
            Ok(())
        } else {
            Err(GestureError::UnknownGesture(handle))
        }
    }

    /// Let two gestures recognize simultaneously.
    pub fn add_friendly(&mut self, a: GestureHandle, b: GestureHandle) -> Result<(), GestureError> {
        self.ensure(a)?;
        self.ensure(b)?;
        if a == b {
            return Ok(());
        }
        for (this, other) in [(a, b), (b, a)] {
            if let Some(core) = self.core_mut(this)
                && !core.friendly.contains(&other)
            {
                core.friendly.push(other);
            }
        }
        Ok(())
    }

    pub fn remove_friendly(&mut self, a: GestureHandle, b: GestureHandle) -> Result<(), GestureError> {
        self.ensure(a)?;
        self.ensure(b)?;
        for (this, other) in [(a, b), (b, a)] {
            if let Some(core) = self.core_mut(this) {
                core.friendly.retain(|g| *g != other);
            }
        }
        Ok(())
    }

    /// Hold `gesture`'s recognition until `required` fails.
    pub fn require_to_fail(
        &mut self,
        gesture: GestureHandle,
        required: Option<GestureHandle>,
    ) -> Result<(), GestureError> {
        self.ensure(gesture)?;
        if let Some(required) = required {
            self.ensure(required)?;
        }
        if let Some(core) = self.core_mut(gesture) {
            core.require_to_fail = required.filter(|r| *r != gesture);
        }
        Ok(())
    }

    /// Whether the gesture accepts pointers re-issued by cancel-with-return.
    pub fn set_accept_returned(
        &mut self,
        handle: GestureHandle,
        accept: bool,
    ) -> Result<(), GestureError> {
        let core = self
            .core_mut(handle)
            .ok_or(GestureError::UnknownGesture(handle))?;
        core.accept_returned = accept;
        Ok(())
    }

    /// Disabling cancels a started gesture and fails a possible one.
    pub fn set_enabled(
        &mut self,
        frame: &mut PointerFrame<'_>,
        handle: GestureHandle,
        enabled: bool,
    ) -> Result<(), GestureError> {
        let core = self
            .core_mut(handle)
            .ok_or(GestureError::UnknownGesture(handle))?;
        if core.enabled == enabled {
            return Ok(());
        }
        core.enabled = enabled;
        let state = core.state;
        if !enabled {
            if state.is_started() {
                self.change_state(frame, handle, GestureState::Cancelled);
            } else if state == GestureState::Possible {
                self.change_state(frame, handle, GestureState::Failed);
            }
        }
        Ok(())
    }

    /// Cancel a gesture in progress, optionally cancelling its pointers on
    /// the next frame (and re-issuing them as returned pointers).
    pub fn cancel_gesture(
        &mut self,
        frame: &mut PointerFrame<'_>,
        handle: GestureHandle,
        cancel_pointers: bool,
        return_pointers: bool,
    ) -> Result<(), GestureError> {
        let state = self
            .state(handle)
            .ok_or(GestureError::UnknownGesture(handle))?;
        let mut pointers = take_scratch(&mut self.pointer_scratch);
        pointers.extend_from_slice(self.core(handle).map_or(&[][..], GestureCore::active_pointers));
        if state == GestureState::Possible || state.is_started() {
            self.change_state(frame, handle, GestureState::Cancelled);
        }
        if cancel_pointers {
            for &pointer in &pointers {
                frame.cancel_pointer(pointer, return_pointers);
            }
        }
        give_scratch(&mut self.pointer_scratch, pointers);
        Ok(())
    }

    /// Host-driven state change request; same rules as a recognizer's.
    pub fn request_state(
        &mut self,
        frame: &mut PointerFrame<'_>,
        handle: GestureHandle,
        state: GestureState,
    ) -> Result<GestureState, GestureError> {
        self.change_state(frame, handle, state)
            .ok_or(GestureError::UnknownGesture(handle))
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn events(&self) -> &[GestureEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> std::vec::Drain<'_, GestureEvent> {
        self.events.drain(..)
    }

    pub(crate) fn emit(&mut self, handle: GestureHandle, kind: GestureEventKind) {
        let Some(node) = self.core(handle).map(GestureCore::node) else {
            return;
        };
        self.events.push(GestureEvent {
            gesture: handle,
            node,
            kind,
        });
    }

    fn emit_state(
        &mut self,
        handle: GestureHandle,
        previous: GestureState,
        requested: GestureState,
        current: GestureState,
    ) {
        self.emit(
            handle,
            GestureEventKind::StateChanged {
                previous,
                requested,
                current,
            },
        );
    }

    // -----------------------------------------------------------------------
    // State machine
    // -----------------------------------------------------------------------

    /// Apply the state-change rules. Returns the gesture's state afterwards,
    /// or `None` for an unknown handle.
    pub(crate) fn change_state(
        &mut self,
        frame: &mut PointerFrame<'_>,
        handle: GestureHandle,
        requested: GestureState,
    ) -> Option<GestureState> {
        let core = self.core(handle)?;
        let previous = core.state;
        let delayed = core.delayed_state.is_some();

        if self.shut_down {
            tracing::warn!(
                target: "fingertip.gesture",
                gesture = %handle,
                requested = %requested,
                "state change after shutdown ignored"
            );
            return Some(previous);
        }

        if previous.is_terminal()
            && matches!(
                requested,
                GestureState::Began | GestureState::Changed | GestureState::Ended
            )
        {
            tracing::warn!(
                target: "fingertip.gesture",
                gesture = %handle,
                from = %previous,
                requested = %requested,
                "terminal gesture waits for reset"
            );
            self.emit_state(handle, previous, requested, previous);
            return Some(previous);
        }

        if requested.is_recognition() && self.recognition_blocked(handle) {
            if let Some(core) = self.core_mut(handle) {
                core.delayed_state = Some(requested);
            }
            tracing::trace!(
                target: "fingertip.gesture",
                gesture = %handle,
                requested = %requested,
                "recognition delayed until required gesture fails"
            );
            self.emit_state(handle, previous, requested, previous);
            return Some(previous);
        }
        if requested == GestureState::Changed && delayed {
            self.emit_state(handle, previous, requested, previous);
            return Some(previous);
        }

        let next = match requested {
            GestureState::Idle
            | GestureState::Possible
            | GestureState::Failed
            | GestureState::Cancelled => requested,
            GestureState::Changed => {
                if !previous.is_started() {
                    tracing::warn!(
                        target: "fingertip.gesture",
                        gesture = %handle,
                        from = %previous,
                        "changed requested before began"
                    );
                }
                GestureState::Changed
            }
            GestureState::Began => {
                if previous.is_waiting() {
                    self.recognize_or_fail(frame, handle, GestureState::Began)
                } else {
                    tracing::warn!(
                        target: "fingertip.gesture",
                        gesture = %handle,
                        from = %previous,
                        "began requested from a non-waiting state"
                    );
                    previous
                }
            }
            GestureState::Ended => {
                if previous.is_waiting() {
                    self.recognize_or_fail(frame, handle, GestureState::Ended)
                } else {
                    // Started gestures already won arbitration.
                    GestureState::Ended
                }
            }
        };

        self.emit_state(handle, previous, requested, next);
        if next != previous || next == GestureState::Changed {
            self.apply_state(frame, handle, previous, next);
        }
        self.state(handle)
    }

    fn recognize_or_fail(
        &mut self,
        frame: &mut PointerFrame<'_>,
        handle: GestureHandle,
        target: GestureState,
    ) -> GestureState {
        if self.recognize(frame, handle) {
            target
        } else {
            GestureState::Failed
        }
    }

    fn apply_state(
        &mut self,
        frame: &mut PointerFrame<'_>,
        handle: GestureHandle,
        previous: GestureState,
        next: GestureState,
    ) {
        let mut schedule_reset = false;
        {
            let Some(core) = self.core_mut(handle) else {
                return;
            };
            core.previous_state = previous;
            core.state = next;
            if next == GestureState::Began {
                for &pointer in &core.active_pointers {
                    if !core.retained.contains(&pointer) {
                        core.retained.push(pointer);
                        frame.retain(pointer);
                    }
                }
            } else if next.is_terminal() {
                for pointer in core.retained.drain(..) {
                    frame.release(pointer);
                }
                if !core.reset_scheduled {
                    core.reset_scheduled = true;
                    schedule_reset = true;
                }
            }
        }
        if schedule_reset {
            self.to_reset.push(handle);
        }
        tracing::trace!(
            target: "fingertip.gesture",
            gesture = %handle,
            from = %previous,
            to = %next,
            "gesture state"
        );

        self.run_entry_hook(frame, handle, next);
        if next == GestureState::Failed || next.is_recognition() {
            self.notify_dependents(frame, handle, next);
        }
    }

    fn recognition_blocked(&self, handle: GestureHandle) -> bool {
        let Some(required) = self.core(handle).and_then(|c| c.require_to_fail) else {
            return false;
        };
        self.core(required)
            .is_some_and(|r| r.enabled && r.state != GestureState::Failed)
    }

    /// Release or fail the gestures waiting on `handle`.
    fn notify_dependents(
        &mut self,
        frame: &mut PointerFrame<'_>,
        handle: GestureHandle,
        state: GestureState,
    ) {
        let mut dependents = take_scratch(&mut self.handle_scratch);
        dependents.extend(self.slots.iter().enumerate().filter_map(|(index, slot)| {
            let gesture = slot.gesture.as_ref()?;
            (gesture.core.require_to_fail == Some(handle)).then_some(GestureHandle {
                index: index as u32,
                generation: slot.generation,
            })
        }));
        for &dependent in &dependents {
            let Some(core) = self.core_mut(dependent) else {
                continue;
            };
            let delayed = core.delayed_state.take();
            if state == GestureState::Failed {
                if let Some(delayed) = delayed {
                    self.change_state(frame, dependent, delayed);
                }
            } else if delayed.is_some() || core.state == GestureState::Possible {
                self.change_state(frame, dependent, GestureState::Failed);
            }
        }
        give_scratch(&mut self.handle_scratch, dependents);
    }

    // -----------------------------------------------------------------------
    // Arbitration
    // -----------------------------------------------------------------------

    fn is_gesture_active(&self, handle: GestureHandle) -> bool {
        self.core(handle).is_some_and(|c| {
            c.enabled && !c.state.is_terminal() && self.scene.is_active_in_hierarchy(c.node)
        })
    }

    /// Whether `first` recognizing may force `second` to fail.
    fn can_prevent(&self, first: GestureHandle, second: GestureHandle) -> bool {
        let (Some(a), Some(b)) = (self.core(first), self.core(second)) else {
            return false;
        };
        if a.friendly.contains(&second) || b.friendly.contains(&first) {
            return false;
        }
        a.prevents && b.preventable
    }

    fn collect_hierarchy(&mut self, node: NodeId, out: &mut Vec<GestureHandle>) {
        if let Some(cached) = self.hierarchy_cache.get(&node) {
            out.extend_from_slice(cached);
            return;
        }
        let mut gestures = Vec::new();
        for ancestor in self.scene.ancestors(node) {
            gestures.extend_from_slice(self.scene.gestures(ancestor));
        }
        out.extend_from_slice(&gestures);
        self.hierarchy_cache.insert(node, gestures);
    }

    /// Recognize-if-not-prevented. On success every possible gesture this
    /// one can prevent has been failed.
    fn recognize(&mut self, frame: &mut PointerFrame<'_>, handle: GestureHandle) -> bool {
        let Some(target) = self.core(handle).map(|c| c.press_target.unwrap_or(c.node)) else {
            return false;
        };
        let mut candidates = take_scratch(&mut self.handle_scratch);
        self.collect_hierarchy(target, &mut candidates);
        let mut to_fail = take_scratch(&mut self.handle_scratch);
        let mut blocker = None;
        for &other in &candidates {
            if other == handle || !self.is_gesture_active(other) {
                continue;
            }
            let Some(state) = self.state(other) else {
                continue;
            };
            if state.is_started() {
                if blocker.is_none() && self.can_prevent(other, handle) {
                    blocker = Some(other);
                }
            } else if state == GestureState::Possible && self.can_prevent(handle, other) {
                to_fail.push(other);
            }
        }

        let recognized = match blocker {
            None => {
                for &other in &to_fail {
                    self.change_state(frame, other, GestureState::Failed);
                }
                true
            }
            Some(blocker) => {
                tracing::debug!(
                    target: "fingertip.gesture",
                    gesture = %handle,
                    blocked_by = %blocker,
                    "recognition prevented"
                );
                false
            }
        };
        give_scratch(&mut self.handle_scratch, candidates);
        give_scratch(&mut self.handle_scratch, to_fail);
        recognized
    }

    // -----------------------------------------------------------------------
    // Recognizer callbacks
    // -----------------------------------------------------------------------

    fn with_recognizer(
        &mut self,
        frame: &mut PointerFrame<'_>,
        handle: GestureHandle,
        call: impl FnOnce(&mut dyn Recognizer, &mut GestureContext<'_, '_>),
    ) {
        let Some(mut kind) = self.gesture_mut(handle).and_then(|g| g.kind.take()) else {
            return;
        };
        let name = kind.name();
        let result = {
            let mut ctx = GestureContext::new(self, frame, handle);
            catch_unwind(AssertUnwindSafe(|| call(kind.recognizer_mut(), &mut ctx)))
        };
        if let Err(payload) = result {
            tracing::error!(
                target: "fingertip.gesture",
                gesture = %handle,
                recognizer = name,
                panic = panic_message(payload.as_ref()),
                "recognizer panicked"
            );
        }
        if let Some(gesture) = self.gesture_mut(handle) {
            gesture.kind = Some(kind);
        }
        self.flush_pending_entries(frame, handle);
    }

    fn run_entry_hook(
        &mut self,
        frame: &mut PointerFrame<'_>,
        handle: GestureHandle,
        state: GestureState,
    ) {
        let running = self.gesture(handle).is_some_and(|g| g.kind.is_none());
        if running {
            self.pending_entries.push((handle, state));
            return;
        }
        self.with_recognizer(frame, handle, |recognizer, ctx| {
            recognizer.on_state_entered(ctx, state);
        });
    }

    fn flush_pending_entries(&mut self, frame: &mut PointerFrame<'_>, handle: GestureHandle) {
        while let Some(position) = self.pending_entries.iter().position(|(g, _)| *g == handle) {
            let (_, state) = self.pending_entries.remove(position);
            self.run_entry_hook(frame, handle, state);
        }
    }

    // -----------------------------------------------------------------------
    // Pointer routing
    // -----------------------------------------------------------------------

    fn unlink(&mut self, pointer: PointerId, handle: GestureHandle) {
        if let Some(gestures) = self.pointer_gestures.get_mut(&pointer) {
            gestures.retain(|g| *g != handle);
            if gestures.is_empty() {
                self.pointer_gestures.remove(&pointer);
            }
        }
    }

    fn should_receive(&self, frame: &PointerFrame<'_>, handle: GestureHandle, id: PointerId) -> bool {
        let (Some(gesture), Some(pointer)) = (self.gesture(handle), frame.pointer(id)) else {
            return false;
        };
        if pointer.is_returned() && !gesture.core.accept_returned {
            return false;
        }
        gesture
            .kind
            .as_ref()
            .is_some_and(|k| k.recognizer().should_receive_pointer(pointer))
    }

    fn route_pressed(&mut self, frame: &mut PointerFrame<'_>, pointers: &[PointerId]) {
        let mut groups = mem::take(&mut self.press_groups);
        for &id in pointers {
            let Some(target) = frame.pointer(id).and_then(Pointer::press_data).map(|hit| hit.target) else {
                tracing::trace!(target: "fingertip.gesture", pointer = %id, "pressed pointer hit nothing");
                continue;
            };
            match groups.iter_mut().find(|(node, _)| *node == target) {
                Some((_, ids)) => ids.push(id),
                None => {
                    let mut ids = take_scratch(&mut self.pointer_scratch);
                    ids.push(id);
                    groups.push((target, ids));
                }
            }
        }
        for (target, ids) in groups.drain(..) {
            self.route_pressed_target(frame, target, &ids);
            give_scratch(&mut self.pointer_scratch, ids);
        }
        self.press_groups = groups;
    }

    fn route_pressed_target(&mut self, frame: &mut PointerFrame<'_>, target: NodeId, ids: &[PointerId]) {
        if !self.scene.contains(target) {
            tracing::trace!(target: "fingertip.gesture", node = %target, "press on unregistered node");
            return;
        }
        let mut candidates = take_scratch(&mut self.handle_scratch);
        self.collect_hierarchy(target, &mut candidates);
        let mut started = take_scratch(&mut self.handle_scratch);
        started.extend(candidates.iter().copied().filter(|&g| {
            self.is_gesture_active(g) && self.state(g).is_some_and(GestureState::is_started)
        }));

        let mut accepted = take_scratch(&mut self.pointer_scratch);
        for &gesture in &candidates {
            if !self.is_gesture_active(gesture) {
                continue;
            }
            if let Some(&blocker) = started
                .iter()
                .find(|&&s| s != gesture && self.can_prevent(s, gesture))
            {
                tracing::trace!(
                    target: "fingertip.gesture",
                    gesture = %gesture,
                    blocked_by = %blocker,
                    "pressed pointers withheld"
                );
                continue;
            }
            accepted.clear();
            accepted.extend(
                ids.iter()
                    .copied()
                    .filter(|&p| self.should_receive(frame, gesture, p)),
            );
            if accepted.is_empty() {
                continue;
            }
            for &pointer in &accepted {
                let gestures = self.pointer_gestures.entry(pointer).or_default();
                if !gestures.contains(&gesture) {
                    gestures.push(gesture);
                }
            }
            self.deliver_pressed(frame, gesture, target, &accepted);
        }
        give_scratch(&mut self.pointer_scratch, accepted);
        give_scratch(&mut self.handle_scratch, candidates);
        give_scratch(&mut self.handle_scratch, started);
    }

    fn deliver_pressed(
        &mut self,
        frame: &mut PointerFrame<'_>,
        handle: GestureHandle,
        target: NodeId,
        pointers: &[PointerId],
    ) {
        let (was_empty, state) = {
            let Some(core) = self.core_mut(handle) else {
                return;
            };
            let was_empty = core.active_pointers.is_empty();
            for &pointer in pointers {
                if !core.active_pointers.contains(&pointer) {
                    core.active_pointers.push(pointer);
                }
            }
            core.pointers_num_state = PointersNumState::Exists;
            if core.press_target.is_none() {
                core.press_target = Some(target);
                core.press_layer = pointers
                    .first()
                    .and_then(|p| frame.pointer(*p))
                    .and_then(Pointer::press_data)
                    .map(|hit| hit.layer);
            }
            if core.state.is_started() {
                for &pointer in pointers {
                    if !core.retained.contains(&pointer) {
                        core.retained.push(pointer);
                        frame.retain(pointer);
                    }
                }
            }
            (was_empty, core.state)
        };
        if was_empty && state == GestureState::Idle {
            self.change_state(frame, handle, GestureState::Possible);
        }
        self.with_recognizer(frame, handle, |recognizer, ctx| {
            recognizer.pointers_pressed(ctx, pointers);
        });
    }

    /// Group `pointers` by the gestures tracking them, optionally dropping
    /// the tracking entries.
    fn group_by_gesture(
        &mut self,
        pointers: &[PointerId],
        untrack: bool,
    ) -> Vec<(GestureHandle, Vec<PointerId>)> {
        let mut groups = mem::take(&mut self.gesture_groups);
        for &id in pointers {
            let Some(gestures) = self.pointer_gestures.get(&id) else {
                continue;
            };
            for &gesture in gestures {
                match groups.iter_mut().find(|(g, _)| *g == gesture) {
                    Some((_, ids)) => ids.push(id),
                    None => {
                        let mut ids = take_scratch(&mut self.pointer_scratch);
                        ids.push(id);
                        groups.push((gesture, ids));
                    }
                }
            }
            if untrack {
                self.pointer_gestures.remove(&id);
            }
        }
        groups
    }

    fn route_updated(&mut self, frame: &mut PointerFrame<'_>, pointers: &[PointerId]) {
        let mut groups = self.group_by_gesture(pointers, false);
        for (gesture, ids) in groups.drain(..) {
            if self.state(gesture).is_some_and(|s| !s.is_terminal()) {
                self.with_recognizer(frame, gesture, |recognizer, ctx| {
                    recognizer.pointers_updated(ctx, &ids);
                });
            }
            give_scratch(&mut self.pointer_scratch, ids);
        }
        self.gesture_groups = groups;
    }

    /// Drop `pointers` from the gesture's active list, caching their
    /// position when it was the last of them.
    fn detach_pointers(&mut self, frame: &PointerFrame<'_>, handle: GestureHandle, pointers: &[PointerId]) {
        let Some(core) = self.core_mut(handle) else {
            return;
        };
        core.active_pointers.retain(|p| !pointers.contains(p));
        if core.active_pointers.is_empty() {
            let centroid = |position: fn(&Pointer) -> Vec2| {
                Vec2::centroid(pointers.iter().filter_map(|p| frame.pointer(*p)).map(position))
            };
            core.cached_screen_position = centroid(Pointer::position);
            core.cached_previous_screen_position = centroid(Pointer::previous_position);
        }
        core.pointers_num_state = PointersNumState::from_count(core.active_pointers.len());
    }

    fn route_released(&mut self, frame: &mut PointerFrame<'_>, pointers: &[PointerId]) {
        let mut groups = self.group_by_gesture(pointers, true);
        for (gesture, ids) in groups.drain(..) {
            self.detach_pointers(frame, gesture, &ids);
            if self.state(gesture).is_some_and(|s| !s.is_terminal()) {
                self.with_recognizer(frame, gesture, |recognizer, ctx| {
                    recognizer.pointers_released(ctx, &ids);
                });
            }
            give_scratch(&mut self.pointer_scratch, ids);
        }
        self.gesture_groups = groups;
    }

    fn route_cancelled(&mut self, frame: &mut PointerFrame<'_>, pointers: &[PointerId]) {
        let mut groups = self.group_by_gesture(pointers, true);
        for (gesture, ids) in groups.drain(..) {
            self.detach_pointers(frame, gesture, &ids);
            if self.state(gesture).is_some_and(|s| !s.is_terminal()) {
                self.with_recognizer(frame, gesture, |recognizer, ctx| {
                    recognizer.pointers_cancelled(ctx, &ids);
                });
            }
            let fallback = self
                .core(gesture)
                .filter(|c| c.active_pointers.is_empty())
                .and_then(|c| match c.state {
                    GestureState::Possible => Some(GestureState::Failed),
                    s if s.is_started() => Some(GestureState::Cancelled),
                    _ => None,
                });
            if let Some(state) = fallback {
                self.change_state(frame, gesture, state);
            }
            give_scratch(&mut self.pointer_scratch, ids);
        }
        self.gesture_groups = groups;
    }

    // -----------------------------------------------------------------------
    // Frame boundaries
    // -----------------------------------------------------------------------

    fn tick_all(&mut self, frame: &mut PointerFrame<'_>) {
        let ticking = |core: &GestureCore| {
            core.enabled && (core.state == GestureState::Possible || core.state.is_started())
        };
        let mut handles = take_scratch(&mut self.handle_scratch);
        handles.extend(
            self.handles()
                .filter(|h| self.core(*h).is_some_and(ticking)),
        );
        for &handle in &handles {
            if self.core(handle).is_some_and(ticking) {
                self.with_recognizer(frame, handle, |recognizer, ctx| recognizer.tick(ctx));
            }
        }
        give_scratch(&mut self.handle_scratch, handles);
    }

    fn process_resets(&mut self, frame: &mut PointerFrame<'_>) {
        if self.to_reset.is_empty() {
            return;
        }
        let mut pending = mem::take(&mut self.to_reset);
        for &handle in &pending {
            self.reset_gesture(frame, handle);
        }
        pending.clear();
        pending.append(&mut self.to_reset);
        self.to_reset = pending;
    }

    fn reset_gesture(&mut self, frame: &mut PointerFrame<'_>, handle: GestureHandle) {
        let (previous, mut active) = {
            let Some(gesture) = self.gesture_mut(handle) else {
                return;
            };
            let core = &mut gesture.core;
            if !core.reset_scheduled {
                return;
            }
            core.reset_scheduled = false;
            let previous = core.state;
            core.previous_state = previous;
            core.state = GestureState::Idle;
            core.pointers_num_state = PointersNumState::Reset;
            core.cached_screen_position = None;
            core.cached_previous_screen_position = None;
            core.press_layer = None;
            core.press_target = None;
            core.delayed_state = None;
            for pointer in core.retained.drain(..) {
                frame.release(pointer);
            }
            if let Some(kind) = gesture.kind.as_mut() {
                kind.recognizer_mut().reset();
            }
            (previous, mem::take(&mut gesture.core.active_pointers))
        };
        for &pointer in &active {
            self.unlink(pointer, handle);
        }
        active.clear();
        if let Some(core) = self.core_mut(handle) {
            core.active_pointers = active;
        }
        tracing::trace!(target: "fingertip.gesture", gesture = %handle, from = %previous, "gesture reset");
        self.emit_state(handle, previous, GestureState::Idle, GestureState::Idle);
    }

    /// Cancel started gestures, fail possible ones, release every retain,
    /// then refuse further state changes.
    pub fn shutdown(&mut self, frame: &mut PointerFrame<'_>) {
        if self.shut_down {
            return;
        }
        let mut handles = take_scratch(&mut self.handle_scratch);
        handles.extend(self.handles());
        for &handle in &handles {
            match self.state(handle) {
                Some(state) if state.is_started() => {
                    self.change_state(frame, handle, GestureState::Cancelled);
                }
                Some(GestureState::Possible) => {
                    self.change_state(frame, handle, GestureState::Failed);
                }
                _ => {}
            }
        }
        give_scratch(&mut self.handle_scratch, handles);
        self.process_resets(frame);
        self.pointer_gestures.clear();
        self.hierarchy_cache.clear();
        self.shut_down = true;
        tracing::debug!(target: "fingertip.gesture", gestures = self.len(), "gesture manager shut down");
    }
}

impl PointerListener for GestureManager {
    fn frame_started(&mut self, frame: &mut PointerFrame<'_>) {
        if self.shut_down {
            return;
        }
        self.process_resets(frame);
        self.tick_all(frame);
    }

    fn pointers_pressed(&mut self, frame: &mut PointerFrame<'_>, pointers: &[PointerId]) {
        if self.shut_down {
            return;
        }
        let _span = tracing::trace_span!(target: "fingertip.gesture", "gesture.pressed", count = pointers.len())
            .entered();
        self.route_pressed(frame, pointers);
    }

    fn pointers_updated(&mut self, frame: &mut PointerFrame<'_>, pointers: &[PointerId]) {
        if self.shut_down {
            return;
        }
        self.route_updated(frame, pointers);
    }

    fn pointers_released(&mut self, frame: &mut PointerFrame<'_>, pointers: &[PointerId]) {
        if self.shut_down {
            return;
        }
        self.route_released(frame, pointers);
    }

    /// Pointers removed while still tracked are treated as released.
    fn pointers_removed(&mut self, frame: &mut PointerFrame<'_>, pointers: &[PointerId]) {
        if self.shut_down || self.pointer_gestures.is_empty() {
            return;
        }
        self.route_released(frame, pointers);
    }

    fn pointers_cancelled(&mut self, frame: &mut PointerFrame<'_>, pointers: &[PointerId]) {
        if self.shut_down {
            return;
        }
        self.route_cancelled(frame, pointers);
    }

    fn frame_finished(&mut self, frame: &mut PointerFrame<'_>) {
        self.process_resets(frame);
        self.hierarchy_cache.clear();
    }
}
