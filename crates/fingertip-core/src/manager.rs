#![forbid(unsafe_code)]

//! The per-frame pointer pipeline.
//!
//! [`TouchManager::update`] runs one frame:
//!
//! 1. Clear transient button bits on every live pointer.
//! 2. Apply cancel requests queued last frame, then poll every input source
//!    in registration order into the shared change set.
//! 3. `frame_started` notification.
//! 4. Advance every live pointer's double-buffered position.
//! 5. Flush the change set and dispatch it in batches: added, updated,
//!    pressed, released, removed, cancelled. Press hit data is computed before
//!    the pressed batch and cleared after the released batch; removed and
//!    cancelled pointers are discarded after their batch.
//! 6. `frame_finished` notification.
//!
//! # Invariants
//!
//! 1. Within a batch, pointers appear in the order the input layer first
//!    mentioned them this frame.
//! 2. A cancelled pointer appears in the cancelled batch only.
//! 3. A listener that panics is logged and skipped; the remaining listeners
//!    and batches still run.

use std::mem;
use std::panic::{AssertUnwindSafe, catch_unwind};

use web_time::Instant;

use crate::changes::{PointerChange, PointerChanges};
use crate::config::TouchConfig;
use crate::error::TouchError;
use crate::input::{InputFrame, InputSource, InputSourceId};
use crate::layer::LayerManager;
use crate::logging::panic_message;
use crate::pointer::{Pointer, PointerId};
use crate::pool::PointerPool;

/// Timing of the frame being dispatched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    /// Monotonic frame counter, starting at 1.
    pub frame: u64,
    pub now: Instant,
    pub dots_per_cm: f32,
}

/// A request to cancel a pointer on the next frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelRequest {
    pub pointer: PointerId,
    /// Re-issue a [`RETURNED`](crate::pointer::PointerFlags::RETURNED)
    /// replacement that continues the contact.
    pub should_return: bool,
}

/// What a listener may touch while being notified.
pub struct PointerFrame<'a> {
    info: FrameInfo,
    pool: &'a mut PointerPool,
    layers: &'a LayerManager,
    cancels: &'a mut Vec<CancelRequest>,
}

impl std::fmt::Debug for PointerFrame<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointerFrame")
            .field("info", &self.info)
            .field("live", &self.pool.len())
            .finish()
    }
}

impl<'a> PointerFrame<'a> {
    /// Assemble a frame view outside the pipeline, e.g. for host-driven
    /// gesture operations between frames.
    pub fn new(
        info: FrameInfo,
        pool: &'a mut PointerPool,
        layers: &'a LayerManager,
        cancels: &'a mut Vec<CancelRequest>,
    ) -> Self {
        Self {
            info,
            pool,
            layers,
            cancels,
        }
    }

    #[inline]
    #[must_use]
    pub fn info(&self) -> FrameInfo {
        self.info
    }

    #[inline]
    #[must_use]
    pub fn now(&self) -> Instant {
        self.info.now
    }

    #[inline]
    #[must_use]
    pub fn dots_per_cm(&self) -> f32 {
        self.info.dots_per_cm
    }

    #[must_use]
    pub fn pointer(&self, id: PointerId) -> Option<&Pointer> {
        self.pool.get(id)
    }

    #[must_use]
    pub fn pool(&self) -> &PointerPool {
        self.pool
    }

    #[must_use]
    pub fn layers(&self) -> &LayerManager {
        self.layers
    }

    /// Increment a pointer's retain count.
    pub fn retain(&mut self, id: PointerId) -> Option<u32> {
        self.pool.retain(id)
    }

    /// Decrement a pointer's retain count.
    pub fn release(&mut self, id: PointerId) -> Option<u32> {
        self.pool.release(id)
    }

    /// Queue a cancel; it takes effect at the start of the next frame.
    pub fn cancel_pointer(&mut self, pointer: PointerId, should_return: bool) {
        self.cancels.push(CancelRequest {
            pointer,
            should_return,
        });
    }
}

/// Receives pipeline notifications. Every method defaults to a no-op.
pub trait PointerListener {
    fn frame_started(&mut self, _frame: &mut PointerFrame<'_>) {}
    fn pointers_added(&mut self, _frame: &mut PointerFrame<'_>, _pointers: &[PointerId]) {}
    fn pointers_updated(&mut self, _frame: &mut PointerFrame<'_>, _pointers: &[PointerId]) {}
    fn pointers_pressed(&mut self, _frame: &mut PointerFrame<'_>, _pointers: &[PointerId]) {}
    fn pointers_released(&mut self, _frame: &mut PointerFrame<'_>, _pointers: &[PointerId]) {}
    fn pointers_removed(&mut self, _frame: &mut PointerFrame<'_>, _pointers: &[PointerId]) {}
    fn pointers_cancelled(&mut self, _frame: &mut PointerFrame<'_>, _pointers: &[PointerId]) {}
    fn frame_finished(&mut self, _frame: &mut PointerFrame<'_>) {}
}

/// Reusable per-frame batch lists.
#[derive(Debug, Default)]
struct Batches {
    added: Vec<PointerId>,
    updated: Vec<PointerId>,
    pressed: Vec<PointerId>,
    released: Vec<PointerId>,
    removed: Vec<PointerId>,
    cancelled: Vec<PointerId>,
}

impl Batches {
    fn fill(&mut self, flushed: &[(PointerId, PointerChange)]) {
        for &(id, change) in flushed {
            let change = change.effective();
            if change.contains(PointerChange::CANCELLED) {
                self.cancelled.push(id);
                continue;
            }
            if change.contains(PointerChange::ADDED) {
                self.added.push(id);
            }
            if change.contains(PointerChange::UPDATED) {
                self.updated.push(id);
            }
            if change.contains(PointerChange::PRESSED) {
                self.pressed.push(id);
            }
            if change.contains(PointerChange::RELEASED) {
                self.released.push(id);
            }
            if change.contains(PointerChange::REMOVED) {
                self.removed.push(id);
            }
        }
    }

    fn clear(&mut self) {
        self.added.clear();
        self.updated.clear();
        self.pressed.clear();
        self.released.clear();
        self.removed.clear();
        self.cancelled.clear();
    }
}

/// Owns the pool, the layers and the input sources, and runs frames.
pub struct TouchManager {
    config: TouchConfig,
    pool: PointerPool,
    layers: LayerManager,
    sources: Vec<Option<Box<dyn InputSource>>>,
    changes: PointerChanges,
    /// Applied at the start of the next frame.
    pending_cancels: Vec<CancelRequest>,
    /// Filled by listeners during the current frame.
    listener_cancels: Vec<CancelRequest>,
    flushed: Vec<(PointerId, PointerChange)>,
    batches: Batches,
    frame: u64,
    shut_down: bool,
}

impl std::fmt::Debug for TouchManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TouchManager")
            .field("frame", &self.frame)
            .field("live", &self.pool.len())
            .field("sources", &self.sources.iter().flatten().count())
            .field("layers", &self.layers)
            .field("shut_down", &self.shut_down)
            .finish()
    }
}

impl Default for TouchManager {
    fn default() -> Self {
        Self::new(TouchConfig::default())
    }
}

impl TouchManager {
    #[must_use]
    pub fn new(config: TouchConfig) -> Self {
        let mut layers = LayerManager::new();
        layers.set_enabled(config.hit_testing);
        Self {
            pool: PointerPool::with_capacity(config.pool_capacity),
            layers,
            sources: Vec::new(),
            changes: PointerChanges::new(),
            pending_cancels: Vec::new(),
            listener_cancels: Vec::new(),
            flushed: Vec::new(),
            batches: Batches::default(),
            frame: 0,
            shut_down: false,
            config,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn config(&self) -> &TouchConfig {
        &self.config
    }

    #[must_use]
    pub fn dots_per_cm(&self) -> f32 {
        self.config.dots_per_cm()
    }

    pub fn set_dpi(&mut self, dpi: f32) {
        self.config.dpi = dpi;
    }

    /// Frames run so far.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    #[must_use]
    pub fn pointer(&self, id: PointerId) -> Option<&Pointer> {
        self.pool.get(id)
    }

    #[must_use]
    pub fn pointers(&self) -> &PointerPool {
        &self.pool
    }

    pub fn pointers_mut(&mut self) -> &mut PointerPool {
        &mut self.pool
    }

    #[must_use]
    pub fn layers(&self) -> &LayerManager {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut LayerManager {
        &mut self.layers
    }

    /// Split borrow of the pool and layers.
    pub fn pool_and_layers(&mut self) -> (&mut PointerPool, &LayerManager) {
        (&mut self.pool, &self.layers)
    }

    // -----------------------------------------------------------------------
    // Input sources
    // -----------------------------------------------------------------------

    pub fn add_input(&mut self, source: Box<dyn InputSource>) -> InputSourceId {
        let id = InputSourceId(self.sources.len() as u16);
        tracing::debug!(target: "fingertip.input", source = %id, name = source.name(), "input source added");
        self.sources.push(Some(source));
        id
    }

    /// Unregister a source. Its live pointers are cancelled on the next frame.
    pub fn remove_input(&mut self, id: InputSourceId) -> Result<Box<dyn InputSource>, TouchError> {
        let mut source = self
            .sources
            .get_mut(usize::from(id.0))
            .and_then(Option::take)
            .ok_or(TouchError::UnknownInputSource(id))?;
        let mut frame = InputFrame::new(id, &mut self.pool, &mut self.changes);
        source.deactivate(&mut frame);
        tracing::debug!(target: "fingertip.input", source = %id, name = source.name(), "input source removed");
        Ok(source)
    }

    /// Typed access to a registered source.
    pub fn source_mut<T: InputSource>(&mut self, id: InputSourceId) -> Option<&mut T> {
        self.sources
            .get_mut(usize::from(id.0))?
            .as_mut()?
            .as_any_mut()
            .downcast_mut::<T>()
    }

    // -----------------------------------------------------------------------
    // Cancellation
    // -----------------------------------------------------------------------

    /// Cancel a pointer through its owning source.
    ///
    /// The cancellation (and, with `should_return`, the replacement's
    /// added/pressed changes) dispatch on the next frame; the replacement id
    /// is returned immediately.
    pub fn cancel_pointer(
        &mut self,
        pointer: PointerId,
        should_return: bool,
    ) -> Result<Option<PointerId>, TouchError> {
        if self.shut_down {
            return Err(TouchError::ShutDown);
        }
        let source_id = match self.pool.get(pointer) {
            Some(p) if !p.is_discarded() => p.source(),
            _ => return Err(TouchError::UnknownPointer(pointer)),
        };
        if self
            .changes
            .get(pointer)
            .is_some_and(|c| c.contains(PointerChange::CANCELLED))
        {
            return Ok(None);
        }
        let source = self
            .sources
            .get_mut(usize::from(source_id.0))
            .and_then(Option::as_mut)
            .ok_or(TouchError::UnknownInputSource(source_id))?;
        let mut frame = InputFrame::new(source_id, &mut self.pool, &mut self.changes);
        let returned = source.cancel_pointer(pointer, should_return, &mut frame);
        tracing::debug!(
            target: "fingertip.touch",
            pointer = %pointer,
            should_return,
            returned = ?returned,
            "pointer cancelled"
        );
        Ok(returned)
    }

    fn apply_pending_cancels(&mut self) {
        let requests = mem::take(&mut self.pending_cancels);
        for request in &requests {
            if let Err(err) = self.cancel_pointer(request.pointer, request.should_return) {
                tracing::debug!(
                    target: "fingertip.touch",
                    pointer = %request.pointer,
                    error = %err,
                    "queued cancel skipped"
                );
            }
        }
        self.pending_cancels = requests;
        self.pending_cancels.clear();
    }

    // -----------------------------------------------------------------------
    // Frame
    // -----------------------------------------------------------------------

    /// Run one frame and notify `listeners` in slice order.
    pub fn update(&mut self, now: Instant, listeners: &mut [&mut dyn PointerListener]) {
        if self.shut_down {
            tracing::warn!(target: "fingertip.touch", "update after shutdown ignored");
            return;
        }
        self.frame += 1;
        let _span = tracing::debug_span!(target: "fingertip.touch", "touch.frame", frame = self.frame)
            .entered();

        self.pool.for_each_live_mut(Pointer::frame_started);

        self.apply_pending_cancels();
        for (index, slot) in self.sources.iter_mut().enumerate() {
            let Some(source) = slot else {
                continue;
            };
            let mut frame = InputFrame::new(InputSourceId(index as u16), &mut self.pool, &mut self.changes);
            source.update_input(&mut frame);
        }

        let info = FrameInfo {
            frame: self.frame,
            now,
            dots_per_cm: self.dots_per_cm(),
        };

        self.notify(info, listeners, "frame_started", |l, f| l.frame_started(f));

        self.pool.for_each_live_mut(Pointer::advance);

        self.flushed.clear();
        self.changes.flush_into(&mut self.flushed);
        let mut batches = mem::take(&mut self.batches);
        batches.fill(&self.flushed);
        if !self.flushed.is_empty() {
            tracing::trace!(
                target: "fingertip.touch",
                added = batches.added.len(),
                updated = batches.updated.len(),
                pressed = batches.pressed.len(),
                released = batches.released.len(),
                removed = batches.removed.len(),
                cancelled = batches.cancelled.len(),
                "dispatching changes"
            );
        }

        if !batches.added.is_empty() {
            self.notify(info, listeners, "pointers_added", |l, f| {
                l.pointers_added(f, &batches.added);
            });
        }
        if !batches.updated.is_empty() {
            self.notify(info, listeners, "pointers_updated", |l, f| {
                l.pointers_updated(f, &batches.updated);
            });
        }
        if !batches.pressed.is_empty() {
            for &id in &batches.pressed {
                let Some(position) = self.pool.get(id).map(Pointer::position) else {
                    continue;
                };
                let hit = self.layers.get_hit_target(position);
                if let Some(p) = self.pool.get_mut(id) {
                    p.set_press_data(hit);
                }
            }
            self.notify(info, listeners, "pointers_pressed", |l, f| {
                l.pointers_pressed(f, &batches.pressed);
            });
        }
        if !batches.released.is_empty() {
            self.notify(info, listeners, "pointers_released", |l, f| {
                l.pointers_released(f, &batches.released);
            });
            for &id in &batches.released {
                if let Some(p) = self.pool.get_mut(id) {
                    p.set_press_data(None);
                }
            }
        }
        if !batches.removed.is_empty() {
            self.notify(info, listeners, "pointers_removed", |l, f| {
                l.pointers_removed(f, &batches.removed);
            });
            self.discard_all(&batches.removed);
        }
        if !batches.cancelled.is_empty() {
            self.notify(info, listeners, "pointers_cancelled", |l, f| {
                l.pointers_cancelled(f, &batches.cancelled);
            });
            self.discard_all(&batches.cancelled);
        }
        batches.clear();
        self.batches = batches;

        self.notify(info, listeners, "frame_finished", |l, f| l.frame_finished(f));
        self.pending_cancels.append(&mut self.listener_cancels);
    }

    fn discard_all(&mut self, ids: &[PointerId]) {
        for &id in ids {
            let Some(source_id) = self.pool.get(id).map(Pointer::source) else {
                continue;
            };
            if let Some(source) = self
                .sources
                .get_mut(usize::from(source_id.0))
                .and_then(Option::as_mut)
            {
                source.discard_pointer(id);
            }
            self.pool.discard(id);
        }
    }

    fn notify(
        &mut self,
        info: FrameInfo,
        listeners: &mut [&mut dyn PointerListener],
        phase: &'static str,
        mut call: impl FnMut(&mut dyn PointerListener, &mut PointerFrame<'_>),
    ) {
        for (index, listener) in listeners.iter_mut().enumerate() {
            let mut frame = PointerFrame {
                info,
                pool: &mut self.pool,
                layers: &self.layers,
                cancels: &mut self.listener_cancels,
            };
            let result = catch_unwind(AssertUnwindSafe(|| call(&mut **listener, &mut frame)));
            if let Err(payload) = result {
                tracing::error!(
                    target: "fingertip.touch",
                    phase,
                    listener = index,
                    panic = panic_message(payload.as_ref()),
                    "pointer listener panicked"
                );
            }
        }
    }

    /// Cancel every live pointer, dispatch one last frame so listeners see
    /// the cancellations, then drop all sources. Later updates are ignored.
    pub fn shutdown(&mut self, now: Instant, listeners: &mut [&mut dyn PointerListener]) {
        if self.shut_down {
            return;
        }
        for (index, slot) in self.sources.iter_mut().enumerate() {
            if let Some(source) = slot {
                let mut frame = InputFrame::new(InputSourceId(index as u16), &mut self.pool, &mut self.changes);
                source.deactivate(&mut frame);
            }
        }
        self.update(now, listeners);
        self.sources.clear();
        self.pending_cancels.clear();
        self.shut_down = true;
        tracing::debug!(target: "fingertip.touch", frame = self.frame, "touch manager shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vec2;
    use crate::layer::{FullscreenLayer, LayerId, NodeId};
    use crate::sources::{FakeSource, TouchEvent, TouchPhase, TouchSource};

    #[derive(Default)]
    struct Recorder {
        log: Vec<(&'static str, Vec<PointerId>)>,
        press_targets: Vec<Option<NodeId>>,
        press_data_at_release: Vec<bool>,
    }

    impl PointerListener for Recorder {
        fn frame_started(&mut self, _frame: &mut PointerFrame<'_>) {
            self.log.push(("frame_started", Vec::new()));
        }
        fn pointers_added(&mut self, _frame: &mut PointerFrame<'_>, pointers: &[PointerId]) {
            self.log.push(("added", pointers.to_vec()));
        }
        fn pointers_updated(&mut self, _frame: &mut PointerFrame<'_>, pointers: &[PointerId]) {
            self.log.push(("updated", pointers.to_vec()));
        }
        fn pointers_pressed(&mut self, frame: &mut PointerFrame<'_>, pointers: &[PointerId]) {
            self.log.push(("pressed", pointers.to_vec()));
            for id in pointers {
                let target = frame
                    .pointer(*id)
                    .and_then(Pointer::press_data)
                    .map(|hit| hit.target);
                self.press_targets.push(target);
            }
        }
        fn pointers_released(&mut self, frame: &mut PointerFrame<'_>, pointers: &[PointerId]) {
            self.log.push(("released", pointers.to_vec()));
            for id in pointers {
                self.press_data_at_release
                    .push(frame.pointer(*id).is_some_and(|p| p.press_data().is_some()));
            }
        }
        fn pointers_removed(&mut self, _frame: &mut PointerFrame<'_>, pointers: &[PointerId]) {
            self.log.push(("removed", pointers.to_vec()));
        }
        fn pointers_cancelled(&mut self, _frame: &mut PointerFrame<'_>, pointers: &[PointerId]) {
            self.log.push(("cancelled", pointers.to_vec()));
        }
        fn frame_finished(&mut self, _frame: &mut PointerFrame<'_>) {
            self.log.push(("frame_finished", Vec::new()));
        }
    }

    impl Recorder {
        fn phases(&self) -> Vec<&'static str> {
            self.log.iter().map(|(phase, _)| *phase).collect()
        }
    }

    fn manager_with_touch() -> (TouchManager, InputSourceId) {
        let mut touch = TouchManager::default();
        touch
            .layers_mut()
            .add_layer(LayerId(0), Box::new(FullscreenLayer::new("scene", NodeId(1))))
            .unwrap();
        let id = touch.add_input(Box::new(TouchSource::new()));
        (touch, id)
    }

    #[test]
    fn press_and_release_in_one_frame_dispatch_in_order() {
        let (mut touch, input) = manager_with_touch();
        let source = touch.source_mut::<TouchSource>(input).unwrap();
        source.push(TouchEvent::new(1, TouchPhase::Began, Vec2::new(10.0, 10.0)));
        source.push(TouchEvent::new(1, TouchPhase::Ended, Vec2::new(10.0, 10.0)));

        let mut rec = Recorder::default();
        touch.update(Instant::now(), &mut [&mut rec]);

        assert_eq!(
            rec.phases(),
            vec![
                "frame_started",
                "added",
                "pressed",
                "released",
                "removed",
                "frame_finished"
            ]
        );
        let ids: Vec<_> = rec.log[1..5].iter().map(|(_, ids)| ids.clone()).collect();
        assert!(ids.iter().all(|batch| batch.len() == 1 && batch[0] == ids[0][0]));
        assert_eq!(rec.press_targets, vec![Some(NodeId(1))]);
        assert_eq!(rec.press_data_at_release, vec![true]);
        assert!(touch.pointers().is_empty());
    }

    #[test]
    fn single_frame_tap_synthesizes_full_lifecycle() {
        let (mut touch, input) = manager_with_touch();
        touch
            .source_mut::<TouchSource>(input)
            .unwrap()
            .push(TouchEvent::new(4, TouchPhase::Ended, Vec2::new(1.0, 1.0)));

        let mut rec = Recorder::default();
        touch.update(Instant::now(), &mut [&mut rec]);
        let batches: Vec<_> = rec
            .log
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(phase, ids)| (*phase, ids.len()))
            .collect();
        assert_eq!(
            batches,
            vec![("added", 1), ("pressed", 1), ("released", 1), ("removed", 1)]
        );
        assert_eq!(touch.pointers().stats().recycled, 1);
    }

    #[test]
    fn multi_pointer_frames_keep_insertion_order() {
        let (mut touch, input) = manager_with_touch();
        let source = touch.source_mut::<TouchSource>(input).unwrap();
        for finger in [30, 10, 20] {
            source.push(TouchEvent::new(finger, TouchPhase::Began, Vec2::ZERO));
        }
        let mut rec = Recorder::default();
        touch.update(Instant::now(), &mut [&mut rec]);

        let source = touch.source_mut::<TouchSource>(input).unwrap();
        let expected: Vec<_> = [30, 10, 20]
            .iter()
            .map(|f| source.pointer_for(*f).unwrap())
            .collect();
        assert_eq!(rec.log[1], ("added", expected.clone()));
        assert_eq!(rec.log[2], ("pressed", expected));
    }

    #[test]
    fn empty_frames_only_notify_boundaries() {
        let (mut touch, _) = manager_with_touch();
        let mut rec = Recorder::default();
        touch.update(Instant::now(), &mut [&mut rec]);
        touch.update(Instant::now(), &mut [&mut rec]);
        assert_eq!(
            rec.phases(),
            vec![
                "frame_started",
                "frame_finished",
                "frame_started",
                "frame_finished"
            ]
        );
        assert_eq!(touch.frame(), 2);
    }

    #[test]
    fn cancel_with_return_issues_continuing_pointer() {
        let mut touch = TouchManager::default();
        let input = touch.add_input(Box::new(FakeSource::new()));
        touch
            .source_mut::<FakeSource>(input)
            .unwrap()
            .press(1, Vec2::new(7.0, 8.0));
        touch.update(Instant::now(), &mut []);
        let old = touch.source_mut::<FakeSource>(input).unwrap().pointer_for(1).unwrap();

        let new = touch.cancel_pointer(old, true).unwrap().unwrap();
        assert_ne!(new, old);
        let p = touch.pointer(new).unwrap();
        assert!(p.is_returned());
        assert!(p.is_pressing());
        assert_eq!(p.position(), Vec2::new(7.0, 8.0));

        let mut rec = Recorder::default();
        touch.update(Instant::now(), &mut [&mut rec]);
        assert!(rec.log.contains(&("cancelled", vec![old])));
        assert!(rec.log.contains(&("added", vec![new])));
        assert!(rec.log.contains(&("pressed", vec![new])));
        assert!(touch.pointer(old).is_none());
    }

    #[test]
    fn cancelling_twice_before_dispatch_is_a_no_op() {
        let mut touch = TouchManager::default();
        let input = touch.add_input(Box::new(FakeSource::new()));
        touch.source_mut::<FakeSource>(input).unwrap().press(1, Vec2::ZERO);
        touch.update(Instant::now(), &mut []);
        let id = touch.source_mut::<FakeSource>(input).unwrap().pointer_for(1).unwrap();

        assert_eq!(touch.cancel_pointer(id, false), Ok(None));
        assert_eq!(touch.cancel_pointer(id, false), Ok(None));
        assert_eq!(
            touch.cancel_pointer(PointerId(99), false),
            Err(TouchError::UnknownPointer(PointerId(99)))
        );
    }

    struct Canceller;

    impl PointerListener for Canceller {
        fn pointers_pressed(&mut self, frame: &mut PointerFrame<'_>, pointers: &[PointerId]) {
            for id in pointers {
                frame.cancel_pointer(*id, false);
            }
        }
    }

    #[test]
    fn listener_cancels_apply_next_frame() {
        let (mut touch, input) = manager_with_touch();
        touch
            .source_mut::<TouchSource>(input)
            .unwrap()
            .push(TouchEvent::new(1, TouchPhase::Began, Vec2::ZERO));
        let mut canceller = Canceller;
        let mut rec = Recorder::default();
        touch.update(Instant::now(), &mut [&mut canceller, &mut rec]);
        assert!(!rec.phases().contains(&"cancelled"));

        touch.update(Instant::now(), &mut [&mut canceller, &mut rec]);
        assert!(rec.phases().contains(&"cancelled"));
        assert!(touch.pointers().is_empty());
        let source = touch.source_mut::<TouchSource>(input).unwrap();
        assert_eq!(source.active_touches(), 0);
    }

    struct Panicker;

    impl PointerListener for Panicker {
        fn pointers_added(&mut self, _frame: &mut PointerFrame<'_>, _pointers: &[PointerId]) {
            panic!("listener bug");
        }
    }

    #[test]
    fn panicking_listener_does_not_stop_dispatch() {
        let (mut touch, input) = manager_with_touch();
        touch
            .source_mut::<TouchSource>(input)
            .unwrap()
            .push(TouchEvent::new(1, TouchPhase::Began, Vec2::ZERO));
        let mut bad = Panicker;
        let mut rec = Recorder::default();
        touch.update(Instant::now(), &mut [&mut bad, &mut rec]);
        assert_eq!(
            rec.phases(),
            vec!["frame_started", "added", "pressed", "frame_finished"]
        );
    }

    #[test]
    fn removing_input_cancels_its_pointers() {
        let (mut touch, input) = manager_with_touch();
        touch
            .source_mut::<TouchSource>(input)
            .unwrap()
            .push(TouchEvent::new(1, TouchPhase::Began, Vec2::ZERO));
        touch.update(Instant::now(), &mut []);
        assert_eq!(touch.pointers().len(), 1);

        assert!(touch.remove_input(input).is_ok());
        assert!(matches!(
            touch.remove_input(input),
            Err(TouchError::UnknownInputSource(_))
        ));
        let mut rec = Recorder::default();
        touch.update(Instant::now(), &mut [&mut rec]);
        assert_eq!(rec.log[1].0, "cancelled");
        assert!(touch.pointers().is_empty());
    }

    #[test]
    fn shutdown_cancels_and_stops() {
        let (mut touch, input) = manager_with_touch();
        touch
            .source_mut::<TouchSource>(input)
            .unwrap()
            .push(TouchEvent::new(1, TouchPhase::Began, Vec2::ZERO));
        touch.update(Instant::now(), &mut []);

        let mut rec = Recorder::default();
        touch.shutdown(Instant::now(), &mut [&mut rec]);
        assert!(rec.phases().contains(&"cancelled"));
        assert!(touch.is_shut_down());

        let frame = touch.frame();
        touch.update(Instant::now(), &mut [&mut rec]);
        assert_eq!(touch.frame(), frame);
        assert_eq!(touch.cancel_pointer(PointerId(0), false), Err(TouchError::ShutDown));
    }

    #[test]
    fn hit_testing_disabled_leaves_press_data_empty() {
        let mut touch = TouchManager::new(TouchConfig {
            hit_testing: false,
            ..TouchConfig::default()
        });
        touch
            .layers_mut()
            .add_layer(LayerId(0), Box::new(FullscreenLayer::new("scene", NodeId(1))))
            .unwrap();
        let input = touch.add_input(Box::new(TouchSource::new()));
        touch
            .source_mut::<TouchSource>(input)
            .unwrap()
            .push(TouchEvent::new(1, TouchPhase::Began, Vec2::ZERO));
        let mut rec = Recorder::default();
        touch.update(Instant::now(), &mut [&mut rec]);
        assert_eq!(rec.press_targets, vec![None]);
    }
}
