//! Property-based invariant tests for gesture arbitration.
//!
//! 1. Arbitrary press/move/release/cancel scripts never panic.
//! 2. Once every contact ends and a few frames pass, every gesture is back in
//!    Idle, no pointer is still tracked, and the pool has recycled every
//!    pointer it issued (all retains were released).
//! 3. At most one of two competing non-friendly gestures reaches a
//!    recognition state per contact sequence on a shared node.

use std::collections::BTreeSet;
use std::time::Duration;

use fingertip_core::{
    FakeSource, FullscreenLayer, InputSourceId, Instant, LayerId, NodeId, Rect, RegionLayer,
    TouchConfig, TouchManager, Vec2,
};
use fingertip_gestures::{
    FlickGesture, GestureEvent, GestureHandle, GestureManager, GestureState, LongPressConfig,
    LongPressGesture, PressGesture, ReleaseGesture, TapGesture, TransformGesture,
};
use proptest::prelude::*;

const ROOT: NodeId = NodeId(1);
const PANEL: NodeId = NodeId(2);

#[derive(Debug, Clone, Copy)]
enum Op {
    Press(u64, Vec2),
    Move(u64, Vec2),
    Release(u64),
    Cancel(u64),
    Wait(u64),
}

fn position() -> impl Strategy<Value = Vec2> {
    (0.0f32..300.0, 0.0f32..300.0).prop_map(|(x, y)| Vec2::new(x, y))
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u64..4, position()).prop_map(|(k, p)| Op::Press(k, p)),
        5 => (0u64..4, position()).prop_map(|(k, p)| Op::Move(k, p)),
        3 => (0u64..4).prop_map(Op::Release),
        1 => (0u64..4).prop_map(Op::Cancel),
        2 => (1u64..400).prop_map(Op::Wait),
    ]
}

struct World {
    touch: TouchManager,
    gestures: GestureManager,
    input: InputSourceId,
    now: Instant,
    down: BTreeSet<u64>,
    handles: Vec<GestureHandle>,
    events: Vec<GestureEvent>,
}

impl World {
    fn new(friendly: bool) -> Self {
        let mut touch = TouchManager::new(TouchConfig::default());
        touch
            .layers_mut()
            .add_layer(
                LayerId(0),
                Box::new(RegionLayer::new("panel").with_region(Rect::new(0.0, 0.0, 150.0, 150.0), PANEL)),
            )
            .unwrap();
        touch
            .layers_mut()
            .add_layer(
                LayerId(1),
                Box::new(FullscreenLayer::new("root", ROOT).with_priority(10)),
            )
            .unwrap();
        let input = touch.add_input(Box::new(FakeSource::new()));

        let mut gestures = GestureManager::new();
        gestures.scene_mut().add_node(ROOT, None).unwrap();
        gestures.scene_mut().add_node(PANEL, Some(ROOT)).unwrap();
        let handles = vec![
            gestures.add_gesture(PANEL, TapGesture::default()).unwrap(),
            gestures.add_gesture(PANEL, TransformGesture::default()).unwrap(),
            gestures
                .add_gesture(
                    PANEL,
                    LongPressGesture::new(LongPressConfig {
                        time_to_press_secs: 0.3,
                        ..LongPressConfig::default()
                    }),
                )
                .unwrap(),
            gestures.add_gesture(ROOT, TransformGesture::default()).unwrap(),
            gestures.add_gesture(ROOT, FlickGesture::default()).unwrap(),
            gestures.add_gesture(ROOT, PressGesture::new()).unwrap(),
            gestures.add_gesture(ROOT, ReleaseGesture::new()).unwrap(),
        ];
        if friendly {
            gestures.add_friendly(handles[1], handles[3]).unwrap();
        }
        Self {
            touch,
            gestures,
            input,
            now: Instant::now(),
            down: BTreeSet::new(),
            handles,
            events: Vec::new(),
        }
    }

    fn fake(&mut self) -> &mut FakeSource {
        self.touch.source_mut::<FakeSource>(self.input).unwrap()
    }

    fn step(&mut self, dt: Duration) {
        self.now += dt;
        self.touch.update(self.now, &mut [&mut self.gestures]);
        self.events.extend(self.gestures.drain_events());
    }

    fn apply(&mut self, op: Op) {
        match op {
            Op::Press(key, at) => {
                if self.down.insert(key) {
                    self.fake().press(key, at);
                }
            }
            Op::Move(key, at) => {
                if self.down.contains(&key) {
                    self.fake().move_to(key, at);
                }
            }
            Op::Release(key) => {
                if self.down.remove(&key) {
                    self.fake().release(key);
                }
            }
            Op::Cancel(key) => {
                if self.down.remove(&key) {
                    self.fake().cancel(key);
                }
            }
            Op::Wait(ms) => self.step(Duration::from_millis(ms)),
        }
    }

    fn settle(&mut self) {
        let keys: Vec<u64> = self.down.iter().copied().collect();
        for key in keys {
            self.fake().release(key);
        }
        self.down.clear();
        for _ in 0..3 {
            self.step(Duration::from_millis(16));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn scripts_settle_back_to_idle(
        script in prop::collection::vec(op(), 0..60),
        friendly in any::<bool>(),
    ) {
        let mut world = World::new(friendly);
        for op in script {
            world.apply(op);
            world.step(Duration::from_millis(16));
        }
        world.settle();

        for &handle in &world.handles {
            prop_assert_eq!(world.gestures.state(handle), Some(GestureState::Idle));
        }
        prop_assert_eq!(world.gestures.tracked_pointers(), 0);
        let stats = world.touch.pointers().stats();
        prop_assert_eq!(stats.live, 0);
        prop_assert_eq!(stats.issued, stats.recycled);
    }

    #[test]
    fn competing_gestures_never_both_recognize(
        moves in prop::collection::vec(position(), 0..10),
        hold_ms in 0u64..600,
    ) {
        let mut world = World::new(false);
        let tap = world.handles[0];
        let long_press = world.handles[2];
        world.apply(Op::Press(0, Vec2::new(50.0, 50.0)));
        world.step(Duration::from_millis(16));
        for at in moves {
            world.apply(Op::Move(0, at));
            world.step(Duration::from_millis(16));
        }
        world.step(Duration::from_millis(hold_ms));
        world.settle();

        let recognized = |handle: GestureHandle| {
            world
                .events
                .iter()
                .filter(|e| e.gesture == handle)
                .filter_map(GestureEvent::entered_state)
                .any(GestureState::is_recognition)
        };
        prop_assert!(!(recognized(tap) && recognized(long_press)));
    }
}
