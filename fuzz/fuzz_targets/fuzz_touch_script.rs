#![no_main]

use std::time::Duration;

use arbitrary::Arbitrary;
use fingertip_core::{
    FakeSource, FullscreenLayer, Instant, LayerId, NodeId, Rect, RegionLayer, TouchConfig,
    TouchManager, Vec2,
};
use fingertip_gestures::{
    FlickGesture, GestureManager, GestureState, LongPressGesture, TapConfig, TapGesture,
    TransformGesture,
};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Op {
    Press { key: u8, x: u8, y: u8 },
    Move { key: u8, x: u8, y: u8 },
    Release { key: u8 },
    Tap { x: u8, y: u8 },
    Cancel { key: u8 },
    CancelReturn { key: u8 },
    Wait { ms: u8 },
}

fn at(x: u8, y: u8) -> Vec2 {
    Vec2::new(f32::from(x) * 2.0, f32::from(y) * 2.0)
}

fuzz_target!(|ops: Vec<Op>| {
    let root = NodeId(1);
    let panel = NodeId(2);
    let mut touch = TouchManager::new(TouchConfig::default());
    let _ = touch.layers_mut().add_layer(
        LayerId(0),
        Box::new(RegionLayer::new("panel").with_region(Rect::new(0.0, 0.0, 200.0, 200.0), panel)),
    );
    let _ = touch
        .layers_mut()
        .add_layer(LayerId(1), Box::new(FullscreenLayer::new("root", root).with_priority(5)));
    let input = touch.add_input(Box::new(FakeSource::new()));

    let mut gestures = GestureManager::new();
    let _ = gestures.scene_mut().add_node(root, None);
    let _ = gestures.scene_mut().add_node(panel, Some(root));
    let single = gestures.add_gesture(panel, TapGesture::default()).ok();
    let double = gestures
        .add_gesture(
            panel,
            TapGesture::new(TapConfig {
                number_of_taps: 2,
                time_limit_secs: Some(0.3),
                ..TapConfig::default()
            }),
        )
        .ok();
    if let (Some(single), Some(double)) = (single, double) {
        let _ = gestures.require_to_fail(single, Some(double));
    }
    let _ = gestures.add_gesture(panel, LongPressGesture::default());
    let _ = gestures.add_gesture(root, TransformGesture::default());
    let _ = gestures.add_gesture(root, FlickGesture::default());

    let mut now = Instant::now();
    let mut down = [false; 4];
    for op in ops.into_iter().take(256) {
        let Some(fake) = touch.source_mut::<FakeSource>(input) else {
            return;
        };
        match op {
            Op::Press { key, x, y } => {
                let key = usize::from(key % 4);
                if !down[key] {
                    down[key] = true;
                    fake.press(key as u64, at(x, y));
                }
            }
            Op::Move { key, x, y } => {
                let key = usize::from(key % 4);
                if down[key] {
                    fake.move_to(key as u64, at(x, y));
                }
            }
            Op::Release { key } => {
                let key = usize::from(key % 4);
                if down[key] {
                    down[key] = false;
                    fake.release(key as u64);
                }
            }
            Op::Tap { x, y } => fake.tap(100, at(x, y)),
            Op::Cancel { key } => {
                let key = usize::from(key % 4);
                if down[key] {
                    down[key] = false;
                    fake.cancel(key as u64);
                }
            }
            Op::CancelReturn { key } => {
                let key = usize::from(key % 4);
                if let Some(pointer) = fake.pointer_for(key as u64) {
                    let _ = touch.cancel_pointer(pointer, true);
                }
            }
            Op::Wait { ms } => now += Duration::from_millis(u64::from(ms) * 4),
        }
        now += Duration::from_millis(16);
        touch.update(now, &mut [&mut gestures]);
        gestures.drain_events().for_each(drop);
    }

    // Lift everything and let deferred resets run.
    if let Some(fake) = touch.source_mut::<FakeSource>(input) {
        for key in 0..4u64 {
            if down[key as usize] {
                fake.release(key);
            }
        }
    }
    for _ in 0..30 {
        now += Duration::from_millis(16);
        touch.update(now, &mut [&mut gestures]);
    }

    assert_eq!(gestures.tracked_pointers(), 0, "pointers still tracked");
    for handle in gestures.handles() {
        assert_eq!(gestures.state(handle), Some(GestureState::Idle), "{handle} not idle");
    }
    let stats = touch.pointers().stats();
    assert_eq!(stats.live, 0, "live pointers after settle");
    assert_eq!(stats.issued, stats.recycled, "retain leak");
});
