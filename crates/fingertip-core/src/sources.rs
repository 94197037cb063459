#![forbid(unsafe_code)]

//! Built-in input sources.
//!
//! The host feeds raw device events into these queues between frames; the
//! touch manager drains them during the next update. All sources speak the
//! change-set contract of [`InputSource`]:
//!
//! - [`TouchSource`]: per-finger contacts; a finger reported `Ended` before it
//!   was ever seen becomes a single-frame tap.
//! - [`MouseSource`]: one persistent hovering pointer, pressed while any
//!   button is held.
//! - [`FakeSource`]: scripted synthetic contacts for tests and automation.
//! - [`StandardInput`]: touch and mouse together; touch activity suppresses
//!   the mouse for that frame.

use std::any::Any;
use std::collections::VecDeque;

use ahash::AHashMap;

use crate::changes::PointerChange;
use crate::geometry::Vec2;
use crate::input::{InputFrame, InputSource};
use crate::pointer::{PointerButton, PointerFlags, PointerId, PointerKind};

/// Phase of a raw touch report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Began,
    Moved,
    Stationary,
    Ended,
    Canceled,
}

/// A raw touch report from the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchEvent {
    /// Host-side contact identifier, stable for the contact's lifetime.
    pub finger: u64,
    pub phase: TouchPhase,
    pub position: Vec2,
}

impl TouchEvent {
    #[must_use]
    pub const fn new(finger: u64, phase: TouchPhase, position: Vec2) -> Self {
        Self {
            finger,
            phase,
            position,
        }
    }
}

/// Maps host contact keys to pointers.
#[derive(Debug)]
struct Contacts {
    kind: PointerKind,
    flags: PointerFlags,
    map: AHashMap<u64, PointerId>,
}

impl Contacts {
    fn new(kind: PointerKind, flags: PointerFlags) -> Self {
        Self {
            kind,
            flags,
            map: AHashMap::new(),
        }
    }

    fn apply(&mut self, event: TouchEvent, frame: &mut InputFrame<'_>) {
        let TouchEvent {
            finger,
            phase,
            position,
        } = event;
        match phase {
            TouchPhase::Began => match self.map.get(&finger) {
                Some(&id) => frame.move_to(id, position),
                None => {
                    let id = frame.add_and_press(self.kind, position, self.flags);
                    self.map.insert(finger, id);
                }
            },
            TouchPhase::Moved | TouchPhase::Stationary => match self.map.get(&finger) {
                Some(&id) => frame.move_to(id, position),
                None => {
                    // The begin report was lost; start the contact here.
                    let id = frame.add_and_press(self.kind, position, self.flags);
                    self.map.insert(finger, id);
                }
            },
            TouchPhase::Ended => match self.map.remove(&finger) {
                Some(id) => frame.release_and_remove(id, position),
                None => {
                    let id = frame.single_frame_tap(self.kind, position, self.flags);
                    tracing::trace!(
                        target: "fingertip.input",
                        finger,
                        pointer = %id,
                        "single-frame tap"
                    );
                }
            },
            TouchPhase::Canceled => {
                if let Some(id) = self.map.remove(&finger) {
                    frame.cancel(id);
                }
            }
        }
    }

    fn cancel_pointer(
        &mut self,
        pointer: PointerId,
        should_return: bool,
        frame: &mut InputFrame<'_>,
    ) -> Option<PointerId> {
        let key = self
            .map
            .iter()
            .find_map(|(key, id)| (*id == pointer).then_some(*key));
        let returned = frame.cancel_with_return(pointer, should_return);
        if let Some(key) = key {
            match returned {
                Some(new_id) => {
                    self.map.insert(key, new_id);
                }
                None => {
                    self.map.remove(&key);
                }
            }
        }
        returned
    }

    fn discard(&mut self, pointer: PointerId) {
        self.map.retain(|_, id| *id != pointer);
    }

    fn cancel_all(&mut self, frame: &mut InputFrame<'_>) {
        for (_, id) in self.map.drain() {
            frame.cancel(id);
        }
    }

    fn owns(&self, pointer: PointerId) -> bool {
        self.map.values().any(|id| *id == pointer)
    }
}

// ---------------------------------------------------------------------------
// Touch
// ---------------------------------------------------------------------------

/// Multi-touch input fed with [`TouchEvent`]s.
#[derive(Debug)]
pub struct TouchSource {
    queue: VecDeque<TouchEvent>,
    contacts: Contacts,
}

impl Default for TouchSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TouchSource {
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            contacts: Contacts::new(PointerKind::Touch, PointerFlags::empty()),
        }
    }

    pub fn push(&mut self, event: TouchEvent) {
        self.queue.push_back(event);
    }

    /// Contacts currently down.
    #[must_use]
    pub fn active_touches(&self) -> usize {
        self.contacts.map.len()
    }

    /// Pointer currently tracking a host finger.
    #[must_use]
    pub fn pointer_for(&self, finger: u64) -> Option<PointerId> {
        self.contacts.map.get(&finger).copied()
    }
}

impl InputSource for TouchSource {
    fn name(&self) -> &str {
        "touch"
    }

    fn update_input(&mut self, frame: &mut InputFrame<'_>) -> bool {
        let handled = !self.queue.is_empty() || !self.contacts.map.is_empty();
        while let Some(event) = self.queue.pop_front() {
            self.contacts.apply(event, frame);
        }
        handled
    }

    fn cancel_pointer(
        &mut self,
        pointer: PointerId,
        should_return: bool,
        frame: &mut InputFrame<'_>,
    ) -> Option<PointerId> {
        self.contacts.cancel_pointer(pointer, should_return, frame)
    }

    fn discard_pointer(&mut self, pointer: PointerId) {
        self.contacts.discard(pointer);
    }

    fn deactivate(&mut self, frame: &mut InputFrame<'_>) {
        self.queue.clear();
        self.contacts.cancel_all(frame);
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Mouse
// ---------------------------------------------------------------------------

/// A raw mouse report from the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MouseInput {
    Moved(Vec2),
    ButtonDown(PointerButton),
    ButtonUp(PointerButton),
    /// The cursor left the window.
    Left,
}

/// Mouse input: one pointer that exists while the cursor is over the window.
#[derive(Debug, Default)]
pub struct MouseSource {
    queue: VecDeque<MouseInput>,
    pointer: Option<PointerId>,
    position: Vec2,
}

impl MouseSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, input: MouseInput) {
        self.queue.push_back(input);
    }

    #[must_use]
    pub fn pointer(&self) -> Option<PointerId> {
        self.pointer
    }

    fn ensure_pointer(&mut self, frame: &mut InputFrame<'_>) -> PointerId {
        match self.pointer {
            Some(id) => id,
            None => {
                let id = frame.add(PointerKind::Mouse, self.position, PointerFlags::empty());
                self.pointer = Some(id);
                id
            }
        }
    }

    /// Whether applying `input` now would set a flag twice this frame.
    fn collides(&self, input: MouseInput, frame: &InputFrame<'_>) -> bool {
        let Some(id) = self.pointer else {
            return false;
        };
        let Some(change) = frame.changes().get(id) else {
            return false;
        };
        let pressing = frame.pool().get(id).is_some_and(|p| p.is_pressing());
        match input {
            MouseInput::ButtonDown(_) => !pressing && change.contains(PointerChange::PRESSED),
            MouseInput::ButtonUp(_) | MouseInput::Left => {
                pressing && change.contains(PointerChange::RELEASED)
            }
            MouseInput::Moved(_) => false,
        }
    }
}

impl InputSource for MouseSource {
    fn name(&self) -> &str {
        "mouse"
    }

    fn update_input(&mut self, frame: &mut InputFrame<'_>) -> bool {
        let handled = !self.queue.is_empty();
        while let Some(input) = self.queue.pop_front() {
            if self.collides(input, frame) {
                // A second release inside one frame: finish the rest next frame.
                self.queue.push_front(input);
                break;
            }
            match input {
                MouseInput::Moved(position) => {
                    self.position = position;
                    match self.pointer {
                        Some(id) => frame.move_to(id, position),
                        None => {
                            self.ensure_pointer(frame);
                        }
                    }
                }
                MouseInput::ButtonDown(button) => {
                    let id = self.ensure_pointer(frame);
                    frame.press(id, button);
                }
                MouseInput::ButtonUp(button) => {
                    if let Some(id) = self.pointer {
                        frame.release(id, button);
                    }
                }
                MouseInput::Left => {
                    if let Some(id) = self.pointer.take() {
                        let pressing = frame.pool().get(id).is_some_and(|p| p.is_pressing());
                        if pressing {
                            frame.release_and_remove(id, self.position);
                        } else {
                            frame.remove(id);
                        }
                    }
                }
            }
        }
        handled
    }

    fn cancel_pointer(
        &mut self,
        pointer: PointerId,
        should_return: bool,
        frame: &mut InputFrame<'_>,
    ) -> Option<PointerId> {
        let returned = frame.cancel_with_return(pointer, should_return);
        if self.pointer == Some(pointer) {
            self.pointer = returned;
        }
        returned
    }

    fn discard_pointer(&mut self, pointer: PointerId) {
        if self.pointer == Some(pointer) {
            self.pointer = None;
        }
    }

    fn deactivate(&mut self, frame: &mut InputFrame<'_>) {
        self.queue.clear();
        if let Some(id) = self.pointer.take() {
            frame.cancel(id);
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Fake
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum FakeCommand {
    Event(TouchEvent),
    /// End at the current position.
    Lift(u64),
}

/// Scripted synthetic contacts keyed by host-chosen ids.
///
/// Pointers are [`PointerKind::Object`] and flagged
/// [`PointerFlags::ARTIFICIAL`].
#[derive(Debug)]
pub struct FakeSource {
    queue: VecDeque<FakeCommand>,
    contacts: Contacts,
}

impl Default for FakeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeSource {
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            contacts: Contacts::new(PointerKind::Object, PointerFlags::ARTIFICIAL),
        }
    }

    /// Queue a raw event.
    pub fn push(&mut self, event: TouchEvent) {
        self.queue.push_back(FakeCommand::Event(event));
    }

    pub fn press(&mut self, key: u64, position: Vec2) {
        self.push(TouchEvent::new(key, TouchPhase::Began, position));
    }

    pub fn move_to(&mut self, key: u64, position: Vec2) {
        self.push(TouchEvent::new(key, TouchPhase::Moved, position));
    }

    /// Lift the contact where it currently is.
    pub fn release(&mut self, key: u64) {
        self.queue.push_back(FakeCommand::Lift(key));
    }

    /// Press and release within one frame.
    pub fn tap(&mut self, key: u64, position: Vec2) {
        self.push(TouchEvent::new(key, TouchPhase::Ended, position));
    }

    pub fn cancel(&mut self, key: u64) {
        self.push(TouchEvent::new(key, TouchPhase::Canceled, Vec2::ZERO));
    }

    #[must_use]
    pub fn pointer_for(&self, key: u64) -> Option<PointerId> {
        self.contacts.map.get(&key).copied()
    }
}

impl InputSource for FakeSource {
    fn name(&self) -> &str {
        "fake"
    }

    fn update_input(&mut self, frame: &mut InputFrame<'_>) -> bool {
        let handled = !self.queue.is_empty();
        while let Some(command) = self.queue.pop_front() {
            let event = match command {
                FakeCommand::Event(event) => event,
                FakeCommand::Lift(key) => {
                    let Some(position) = self
                        .contacts
                        .map
                        .get(&key)
                        .and_then(|id| frame.pool().get(*id))
                        .map(|p| p.new_position())
                    else {
                        continue;
                    };
                    TouchEvent::new(key, TouchPhase::Ended, position)
                }
            };
            self.contacts.apply(event, frame);
        }
        handled
    }

    fn cancel_pointer(
        &mut self,
        pointer: PointerId,
        should_return: bool,
        frame: &mut InputFrame<'_>,
    ) -> Option<PointerId> {
        self.contacts.cancel_pointer(pointer, should_return, frame)
    }

    fn discard_pointer(&mut self, pointer: PointerId) {
        self.contacts.discard(pointer);
    }

    fn deactivate(&mut self, frame: &mut InputFrame<'_>) {
        self.queue.clear();
        self.contacts.cancel_all(frame);
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Standard
// ---------------------------------------------------------------------------

/// Touch plus mouse, with touch taking precedence.
#[derive(Debug, Default)]
pub struct StandardInput {
    pub touch: TouchSource,
    pub mouse: MouseSource,
}

impl StandardInput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl InputSource for StandardInput {
    fn name(&self) -> &str {
        "standard"
    }

    fn update_input(&mut self, frame: &mut InputFrame<'_>) -> bool {
        if self.touch.update_input(frame) {
            if self.mouse.pointer().is_some() || !self.mouse.queue.is_empty() {
                tracing::trace!(target: "fingertip.input", "touch active, suspending mouse");
                self.mouse.deactivate(frame);
            }
            return true;
        }
        self.mouse.update_input(frame)
    }

    fn cancel_pointer(
        &mut self,
        pointer: PointerId,
        should_return: bool,
        frame: &mut InputFrame<'_>,
    ) -> Option<PointerId> {
        if self.touch.contacts.owns(pointer) {
            self.touch.cancel_pointer(pointer, should_return, frame)
        } else {
            self.mouse.cancel_pointer(pointer, should_return, frame)
        }
    }

    fn discard_pointer(&mut self, pointer: PointerId) {
        self.touch.discard_pointer(pointer);
        self.mouse.discard_pointer(pointer);
    }

    fn deactivate(&mut self, frame: &mut InputFrame<'_>) {
        self.touch.deactivate(frame);
        self.mouse.deactivate(frame);
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::PointerChanges;
    use crate::input::InputSourceId;
    use crate::pool::PointerPool;

    fn run(source: &mut dyn InputSource, pool: &mut PointerPool) -> (bool, PointerChanges) {
        let mut changes = PointerChanges::new();
        let handled = {
            let mut frame = InputFrame::new(InputSourceId(0), pool, &mut changes);
            source.update_input(&mut frame)
        };
        (handled, changes)
    }

    #[test]
    fn touch_began_then_ended() {
        let mut pool = PointerPool::new();
        let mut touch = TouchSource::new();
        touch.push(TouchEvent::new(7, TouchPhase::Began, Vec2::new(10.0, 10.0)));
        let (handled, changes) = run(&mut touch, &mut pool);
        assert!(handled);
        let id = touch.pointer_for(7).unwrap();
        assert_eq!(
            changes.get(id),
            Some(PointerChange::ADDED | PointerChange::PRESSED)
        );
        assert!(pool.get(id).unwrap().is_pressing());

        touch.push(TouchEvent::new(7, TouchPhase::Ended, Vec2::new(12.0, 10.0)));
        let (_, changes) = run(&mut touch, &mut pool);
        assert_eq!(
            changes.get(id),
            Some(PointerChange::UPDATED | PointerChange::RELEASED | PointerChange::REMOVED)
        );
        assert_eq!(touch.active_touches(), 0);
    }

    #[test]
    fn ended_without_began_is_single_frame_tap() {
        let mut pool = PointerPool::new();
        let mut touch = TouchSource::new();
        touch.push(TouchEvent::new(1, TouchPhase::Ended, Vec2::new(5.0, 5.0)));
        let (_, changes) = run(&mut touch, &mut pool);
        assert_eq!(changes.len(), 1);
        let change = changes.get(changes.ids()[0]).unwrap();
        assert_eq!(
            change,
            PointerChange::ADDED
                | PointerChange::PRESSED
                | PointerChange::RELEASED
                | PointerChange::REMOVED
        );
    }

    #[test]
    fn idle_touch_source_is_not_handled() {
        let mut pool = PointerPool::new();
        let mut touch = TouchSource::new();
        let (handled, changes) = run(&mut touch, &mut pool);
        assert!(!handled);
        assert!(changes.is_empty());
    }

    #[test]
    fn mouse_hovers_then_presses() {
        let mut pool = PointerPool::new();
        let mut mouse = MouseSource::new();
        mouse.push(MouseInput::Moved(Vec2::new(3.0, 3.0)));
        let (_, changes) = run(&mut mouse, &mut pool);
        let id = mouse.pointer().unwrap();
        assert_eq!(changes.get(id), Some(PointerChange::ADDED));

        mouse.push(MouseInput::ButtonDown(PointerButton::First));
        mouse.push(MouseInput::ButtonDown(PointerButton::Second));
        mouse.push(MouseInput::ButtonUp(PointerButton::First));
        let (_, changes) = run(&mut mouse, &mut pool);
        // Still holding the second button.
        assert_eq!(changes.get(id), Some(PointerChange::PRESSED));
    }

    #[test]
    fn double_click_in_one_frame_spills_to_next() {
        let mut pool = PointerPool::new();
        let mut mouse = MouseSource::new();
        mouse.push(MouseInput::Moved(Vec2::ZERO));
        for _ in 0..2 {
            mouse.push(MouseInput::ButtonDown(PointerButton::First));
            mouse.push(MouseInput::ButtonUp(PointerButton::First));
        }
        let (_, first) = run(&mut mouse, &mut pool);
        let id = mouse.pointer().unwrap();
        assert_eq!(
            first.get(id),
            Some(PointerChange::ADDED | PointerChange::PRESSED | PointerChange::RELEASED)
        );
        let (_, second) = run(&mut mouse, &mut pool);
        assert_eq!(
            second.get(id),
            Some(PointerChange::PRESSED | PointerChange::RELEASED)
        );

        // Leaving while pressed after a click in the same frame.
        mouse.push(MouseInput::ButtonDown(PointerButton::First));
        run(&mut mouse, &mut pool);
        mouse.push(MouseInput::ButtonUp(PointerButton::First));
        mouse.push(MouseInput::ButtonDown(PointerButton::First));
        mouse.push(MouseInput::Left);
        let (_, third) = run(&mut mouse, &mut pool);
        assert_eq!(
            third.get(id),
            Some(PointerChange::PRESSED | PointerChange::RELEASED)
        );
        assert_eq!(mouse.pointer(), Some(id));
        let (_, fourth) = run(&mut mouse, &mut pool);
        let change = fourth.get(id).unwrap();
        assert!(change.contains(PointerChange::RELEASED | PointerChange::REMOVED));
        assert!(mouse.pointer().is_none());
    }

    #[test]
    fn touch_suppresses_mouse() {
        let mut pool = PointerPool::new();
        let mut input = StandardInput::new();
        input.mouse.push(MouseInput::Moved(Vec2::ZERO));
        run(&mut input, &mut pool);
        let mouse_id = input.mouse.pointer().unwrap();

        input.touch.push(TouchEvent::new(1, TouchPhase::Began, Vec2::ZERO));
        input.mouse.push(MouseInput::Moved(Vec2::new(1.0, 1.0)));
        let (handled, changes) = run(&mut input, &mut pool);
        assert!(handled);
        assert_eq!(changes.get(mouse_id), Some(PointerChange::CANCELLED));
        assert!(input.mouse.pointer().is_none());
    }

    #[test]
    fn cancel_with_return_remaps_contact() {
        let mut pool = PointerPool::new();
        let mut fake = FakeSource::new();
        fake.press(1, Vec2::new(4.0, 4.0));
        run(&mut fake, &mut pool);
        let old = fake.pointer_for(1).unwrap();

        let mut changes = PointerChanges::new();
        let new = {
            let mut frame = InputFrame::new(InputSourceId(0), &mut pool, &mut changes);
            fake.cancel_pointer(old, true, &mut frame).unwrap()
        };
        assert_ne!(new, old);
        assert_eq!(fake.pointer_for(1), Some(new));
        let p = pool.get(new).unwrap();
        assert!(p.is_returned());
        assert!(p.flags().contains(PointerFlags::ARTIFICIAL));
        assert_eq!(p.position(), Vec2::new(4.0, 4.0));
        assert_eq!(changes.get(old), Some(PointerChange::CANCELLED));
        assert_eq!(
            changes.get(new),
            Some(PointerChange::ADDED | PointerChange::PRESSED)
        );
    }

    #[test]
    fn fake_release_uses_last_position() {
        let mut pool = PointerPool::new();
        let mut fake = FakeSource::new();
        fake.press(2, Vec2::new(1.0, 1.0));
        fake.move_to(2, Vec2::new(9.0, 1.0));
        run(&mut fake, &mut pool);
        let id = fake.pointer_for(2).unwrap();

        fake.release(2);
        let (_, changes) = run(&mut fake, &mut pool);
        assert_eq!(
            changes.get(id),
            Some(PointerChange::RELEASED | PointerChange::REMOVED)
        );
        assert_eq!(pool.get(id).unwrap().new_position(), Vec2::new(9.0, 1.0));
    }
}
