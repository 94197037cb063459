#![forbid(unsafe_code)]

//! Composition root: one pointer pipeline plus one gesture manager.
//!
//! [`TouchSystem`] owns both halves and is the only place the host drives
//! frames from. The gesture manager is always the first listener of each
//! frame, so host listeners passed to [`TouchSystem::update_with`] observe
//! pointers after gestures have claimed them.
//!
//! Gesture control outside a frame (cancel, enable, remove, host state
//! requests) runs against a short-lived [`PointerFrame`] built from the
//! pipeline's pool; pointer cancellations those calls queue are forwarded
//! to the pipeline and dispatch on the next update.

use std::time::Duration;

use fingertip_core::{
    FrameInfo, InputSource, InputSourceId, Instant, LayerId, LayerManager, NodeId, PointerFrame,
    PointerListener, PointerPool, TouchConfig, TouchLayer, TouchManager,
};
use fingertip_gestures::{
    GestureEvent, GestureHandle, GestureKind, GestureManager, GestureState, SceneTree,
    TransformSink, dispatch_transforms,
};

use crate::config::FingertipConfig;
use crate::error::Result;

#[derive(Debug)]
pub struct TouchSystem {
    touch: TouchManager,
    gestures: GestureManager,
    /// Timestamp of the last frame, used for out-of-frame control calls.
    now: Instant,
}

impl Default for TouchSystem {
    fn default() -> Self {
        Self::new(TouchConfig::default())
    }
}

impl TouchSystem {
    #[must_use]
    pub fn new(config: TouchConfig) -> Self {
        Self {
            touch: TouchManager::new(config),
            gestures: GestureManager::new(),
            now: Instant::now(),
        }
    }

    /// Validate `config` and build the pipeline from its `touch` section.
    pub fn from_config(config: &FingertipConfig) -> Result<Self> {
        let config = config.clone().validated()?;
        Ok(Self::new(config.touch))
    }

    // -----------------------------------------------------------------------
    // Parts
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn touch(&self) -> &TouchManager {
        &self.touch
    }

    pub fn touch_mut(&mut self) -> &mut TouchManager {
        &mut self.touch
    }

    #[must_use]
    pub fn gestures(&self) -> &GestureManager {
        &self.gestures
    }

    pub fn gestures_mut(&mut self) -> &mut GestureManager {
        &mut self.gestures
    }

    #[must_use]
    pub fn scene(&self) -> &SceneTree {
        self.gestures.scene()
    }

    pub fn scene_mut(&mut self) -> &mut SceneTree {
        self.gestures.scene_mut()
    }

    #[must_use]
    pub fn pointers(&self) -> &PointerPool {
        self.touch.pointers()
    }

    #[must_use]
    pub fn layers(&self) -> &LayerManager {
        self.touch.layers()
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    pub fn add_input(&mut self, source: Box<dyn InputSource>) -> InputSourceId {
        self.touch.add_input(source)
    }

    pub fn remove_input(&mut self, id: InputSourceId) -> Result<Box<dyn InputSource>> {
        Ok(self.touch.remove_input(id)?)
    }

    /// Typed access to a registered source, e.g. to feed it device events.
    pub fn source_mut<T: InputSource>(&mut self, id: InputSourceId) -> Option<&mut T> {
        self.touch.source_mut::<T>(id)
    }

    pub fn add_layer(&mut self, id: LayerId, layer: Box<dyn TouchLayer>) -> Result<()> {
        Ok(self.touch.layers_mut().add_layer(id, layer)?)
    }

    pub fn add_node(&mut self, node: NodeId, parent: Option<NodeId>) -> Result<()> {
        Ok(self.gestures.scene_mut().add_node(node, parent)?)
    }

    /// Remove a node and its gestures; its children move up to its parent.
    pub fn remove_node(&mut self, node: NodeId) -> Result<()> {
        Ok(self.with_frame(|gestures, frame| gestures.remove_node(frame, node))?)
    }

    pub fn add_gesture(&mut self, node: NodeId, kind: impl Into<GestureKind>) -> Result<GestureHandle> {
        Ok(self.gestures.add_gesture(node, kind)?)
    }

    pub fn remove_gesture(&mut self, gesture: GestureHandle) -> Result<GestureKind> {
        Ok(self.with_frame(|gestures, frame| gestures.remove_gesture(frame, gesture))?)
    }

    // -----------------------------------------------------------------------
    // Control
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn state(&self, gesture: GestureHandle) -> Option<GestureState> {
        self.gestures.state(gesture)
    }

    pub fn set_enabled(&mut self, gesture: GestureHandle, enabled: bool) -> Result<()> {
        Ok(self.with_frame(|gestures, frame| gestures.set_enabled(frame, gesture, enabled))?)
    }

    /// Cancel a gesture; with `cancel_pointers` its pointers are cancelled on
    /// the next update, re-issued to other gestures when `return_pointers`.
    pub fn cancel_gesture(
        &mut self,
        gesture: GestureHandle,
        cancel_pointers: bool,
        return_pointers: bool,
    ) -> Result<()> {
        Ok(self.with_frame(|gestures, frame| {
            gestures.cancel_gesture(frame, gesture, cancel_pointers, return_pointers)
        })?)
    }

    /// Ask for a state change as if the recognizer had; returns the state
    /// the gesture ended up in.
    pub fn request_state(&mut self, gesture: GestureHandle, state: GestureState) -> Result<GestureState> {
        Ok(self.with_frame(|gestures, frame| gestures.request_state(frame, gesture, state))?)
    }

    // -----------------------------------------------------------------------
    // Frames
    // -----------------------------------------------------------------------

    /// Run one frame at `now`.
    pub fn update(&mut self, now: Instant) {
        self.update_with(now, &mut []);
    }

    /// Run one frame at `now`, notifying `listeners` after the gestures.
    pub fn update_with(&mut self, now: Instant, listeners: &mut [&mut dyn PointerListener]) {
        self.now = now;
        let mut all: Vec<&mut dyn PointerListener> = Vec::with_capacity(listeners.len() + 1);
        all.push(&mut self.gestures);
        for listener in listeners.iter_mut() {
            all.push(&mut **listener);
        }
        self.touch.update(now, all.as_mut_slice());
    }

    /// Run a frame `dt` after the previous one.
    pub fn advance(&mut self, dt: Duration) {
        self.update(self.now + dt);
    }

    /// Instant of the last frame.
    #[must_use]
    pub fn now(&self) -> Instant {
        self.now
    }

    /// Events produced since the last drain, oldest first.
    pub fn drain_events(&mut self) -> std::vec::Drain<'_, GestureEvent> {
        self.gestures.drain_events()
    }

    /// Drain events, forwarding transform deltas to `sink`; returns the
    /// drained events.
    pub fn dispatch_transforms(&mut self, sink: &mut dyn TransformSink) -> Vec<GestureEvent> {
        let events: Vec<GestureEvent> = self.gestures.drain_events().collect();
        dispatch_transforms(&events, sink);
        events
    }

    /// Cancel every pointer, let gestures observe it, then stop both halves.
    pub fn shutdown(&mut self, now: Instant) {
        if self.is_shut_down() {
            return;
        }
        self.now = now;
        self.touch.shutdown(now, &mut [&mut self.gestures]);
        self.with_frame(|gestures, frame| gestures.shutdown(frame));
        tracing::debug!(target: "fingertip.touch", "touch system shut down");
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.touch.is_shut_down() && self.gestures.is_shut_down()
    }

    fn with_frame<R>(&mut self, f: impl FnOnce(&mut GestureManager, &mut PointerFrame<'_>) -> R) -> R {
        let info = FrameInfo {
            frame: self.touch.frame(),
            now: self.now,
            dots_per_cm: self.touch.dots_per_cm(),
        };
        let mut cancels = Vec::new();
        let result = {
            let (pool, layers) = self.touch.pool_and_layers();
            let mut frame = PointerFrame::new(info, pool, layers, &mut cancels);
            f(&mut self.gestures, &mut frame)
        };
        for request in cancels {
            if let Err(err) = self.touch.cancel_pointer(request.pointer, request.should_return) {
                tracing::debug!(
                    target: "fingertip.touch",
                    pointer = %request.pointer,
                    error = %err,
                    "queued pointer cancel dropped"
                );
            }
        }
        result
    }
}
