//! End-to-end scenarios through the facade: input in, gesture events out.

use std::time::Duration;

use fingertip::prelude::*;

const ROOT: NodeId = NodeId(1);
const BUTTON: NodeId = NodeId(2);

struct App {
    system: TouchSystem,
    input: InputSourceId,
    events: Vec<GestureEvent>,
}

impl App {
    /// A full-screen background with a 100x100 button in its top-left corner.
    fn new() -> Self {
        let mut system = TouchSystem::default();
        system.add_node(ROOT, None).unwrap();
        system.add_node(BUTTON, Some(ROOT)).unwrap();
        system
            .add_layer(
                LayerId(0),
                Box::new(RegionLayer::new("ui").with_region(Rect::new(0.0, 0.0, 100.0, 100.0), BUTTON)),
            )
            .unwrap();
        system
            .add_layer(
                LayerId(1),
                Box::new(FullscreenLayer::new("background", ROOT).with_priority(10)),
            )
            .unwrap();
        let input = system.add_input(Box::new(FakeSource::new()));
        Self {
            system,
            input,
            events: Vec::new(),
        }
    }

    fn fake(&mut self) -> &mut FakeSource {
        self.system.source_mut::<FakeSource>(self.input).unwrap()
    }

    fn step(&mut self) {
        self.system.advance(Duration::from_millis(16));
        self.events.extend(self.system.drain_events());
    }

    fn count(&self, gesture: GestureHandle, pred: impl Fn(&GestureEventKind) -> bool) -> usize {
        self.events
            .iter()
            .filter(|e| e.gesture == gesture && pred(&e.kind))
            .count()
    }

    fn tapped(&self, gesture: GestureHandle) -> usize {
        self.count(gesture, |k| matches!(k, GestureEventKind::Tapped { .. }))
    }

    fn entered(&self, gesture: GestureHandle, state: GestureState) -> bool {
        self.events
            .iter()
            .filter(|e| e.gesture == gesture)
            .filter_map(GestureEvent::entered_state)
            .any(|s| s == state)
    }
}

#[derive(Default)]
struct PressCounter {
    pressed: usize,
    removed: usize,
}

impl PointerListener for PressCounter {
    fn pointers_pressed(&mut self, _frame: &mut PointerFrame<'_>, pointers: &[PointerId]) {
        self.pressed += pointers.len();
    }

    fn pointers_removed(&mut self, _frame: &mut PointerFrame<'_>, pointers: &[PointerId]) {
        self.removed += pointers.len();
    }
}

#[test]
fn e2e_button_tap_beats_background_pan() {
    let mut app = App::new();
    let tap = app.system.add_gesture(BUTTON, TapGesture::default()).unwrap();
    let pan = app.system.add_gesture(ROOT, TransformGesture::default()).unwrap();

    app.fake().tap(1, Vec2::new(50.0, 50.0));
    app.step();
    assert_eq!(app.tapped(tap), 1);
    assert!(app.entered(pan, GestureState::Failed));

    // Outside the button only the background sees the pointer.
    app.fake().press(2, Vec2::new(300.0, 300.0));
    app.step();
    for i in 1..=3 {
        app.fake().move_to(2, Vec2::new(300.0 + 10.0 * i as f32, 300.0));
        app.step();
    }
    app.fake().release(2);
    app.step();

    let mut store = TransformStore::new();
    fingertip::gestures::dispatch_transforms(&app.events, &mut store);
    assert_eq!(store.get(ROOT).unwrap().position, Vec3::new(30.0, 0.0, 0.0));
    assert_eq!(app.tapped(tap), 1);
    assert_eq!(app.system.pointers().stats().live, 0);
}

#[test]
fn e2e_host_listeners_run_after_gestures() {
    let mut app = App::new();
    let tap = app.system.add_gesture(BUTTON, TapGesture::default()).unwrap();
    let mut counter = PressCounter::default();

    app.fake().tap(1, Vec2::new(10.0, 10.0));
    let now = app.system.now() + Duration::from_millis(16);
    app.system.update_with(now, &mut [&mut counter]);
    app.events.extend(app.system.drain_events());

    assert_eq!(counter.pressed, 1);
    assert_eq!(counter.removed, 1);
    assert_eq!(app.tapped(tap), 1);
}

#[test]
fn e2e_cancel_with_return_hands_pointer_to_the_button() {
    let mut app = App::new();
    let tap = app.system.add_gesture(BUTTON, TapGesture::default()).unwrap();
    let pan = app.system.add_gesture(ROOT, TransformGesture::default()).unwrap();

    app.fake().press(1, Vec2::new(50.0, 50.0));
    app.step();
    app.fake().move_to(1, Vec2::new(60.0, 50.0));
    app.step();
    assert_eq!(app.system.state(pan), Some(GestureState::Began));
    assert!(app.entered(tap, GestureState::Failed));
    let original = app.fake().pointer_for(1).unwrap();

    app.system.cancel_gesture(pan, true, true).unwrap();
    assert_eq!(app.system.state(pan), Some(GestureState::Cancelled));
    app.step();

    let returned = app.fake().pointer_for(1).unwrap();
    assert_ne!(returned, original);
    assert!(app.system.touch().pointer(returned).unwrap().is_returned());
    assert_eq!(app.system.state(tap), Some(GestureState::Possible));

    app.fake().release(1);
    app.step();
    assert_eq!(app.tapped(tap), 1);
    assert_eq!(app.system.pointers().stats().live, 0);
}

#[test]
fn e2e_removing_a_node_drops_its_gestures() {
    let mut app = App::new();
    let tap = app.system.add_gesture(BUTTON, TapGesture::default()).unwrap();
    let pan = app.system.add_gesture(ROOT, TransformGesture::default()).unwrap();

    app.fake().press(1, Vec2::new(50.0, 50.0));
    app.step();
    app.system.remove_node(BUTTON).unwrap();
    assert_eq!(app.system.state(tap), None);
    assert_eq!(app.system.gestures().len(), 1);

    app.fake().release(1);
    app.step();
    assert_eq!(app.tapped(tap), 0);
    assert!(app.entered(pan, GestureState::Failed));

    let err = app.system.add_gesture(BUTTON, TapGesture::default()).unwrap_err();
    assert_eq!(err.error_type(), "gesture.unknown_node");
    assert!(err.is_recoverable());
}

#[test]
fn e2e_disabled_gesture_is_skipped_until_reenabled() {
    let mut app = App::new();
    let tap = app.system.add_gesture(BUTTON, TapGesture::default()).unwrap();
    app.system.set_enabled(tap, false).unwrap();
    app.fake().tap(1, Vec2::new(50.0, 50.0));
    app.step();
    assert_eq!(app.tapped(tap), 0);

    app.system.set_enabled(tap, true).unwrap();
    app.fake().tap(1, Vec2::new(50.0, 50.0));
    app.step();
    assert_eq!(app.tapped(tap), 1);
}

#[test]
fn e2e_shutdown_cancels_and_refuses_further_work() {
    let mut app = App::new();
    let pan = app.system.add_gesture(ROOT, TransformGesture::default()).unwrap();
    app.fake().press(1, Vec2::new(300.0, 300.0));
    app.step();
    app.fake().move_to(1, Vec2::new(320.0, 300.0));
    app.step();
    assert_eq!(app.system.state(pan), Some(GestureState::Began));

    let now = app.system.now() + Duration::from_millis(16);
    app.system.shutdown(now);
    app.events.extend(app.system.drain_events());

    assert!(app.system.is_shut_down());
    assert!(app.entered(pan, GestureState::Cancelled));
    assert_eq!(app.system.state(pan), Some(GestureState::Idle));
    assert_eq!(app.system.pointers().stats().live, 0);

    let err = app.system.add_gesture(ROOT, TapGesture::default()).unwrap_err();
    assert_eq!(err.error_type(), "gesture.manager_shut_down");
    assert!(!err.is_recoverable());
    // Idempotent.
    app.system.shutdown(now);
}

#[test]
fn e2e_config_builds_the_system_and_recognizers() {
    let mut config = FingertipConfig::default();
    config.touch.dpi = 254.0;
    config.tap.number_of_taps = 2;
    let mut system = TouchSystem::from_config(&config).unwrap();
    assert!((system.touch().dots_per_cm() - 100.0).abs() < 1e-3);

    system.add_node(ROOT, None).unwrap();
    let double = system.add_gesture(ROOT, config.tap_gesture()).unwrap();
    let kind = system.gestures().kind(double).unwrap();
    assert_eq!(kind.as_tap().unwrap().config().number_of_taps, 2);

    config.touch.dpi = -1.0;
    let err = TouchSystem::from_config(&config).unwrap_err();
    assert_eq!(err.error_type(), "config.validation");
    assert!(err.to_string().contains("touch.dpi"));
}
