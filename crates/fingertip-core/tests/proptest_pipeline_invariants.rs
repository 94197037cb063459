//! Property-based invariant tests for the pointer pipeline.
//!
//! 1. Hit testing consults layers in ascending priority, then insertion order,
//!    and stops at the first Hit or Discard.
//! 2. Change sets merge by OR and flush in first-mention order.
//! 3. Pool retain counts: a pointer is recycled exactly when it is discarded
//!    and its count is zero.
//! 4. Arbitrary touch scripts never panic, and every issued pointer is
//!    eventually recycled once all contacts end.

use std::cell::RefCell;
use std::rc::Rc;

use fingertip_core::{
    HitTarget, InputSourceId, Instant, LayerHit, LayerId, LayerManager, NodeId, PointerChange,
    PointerChanges, PointerFlags, PointerId, PointerKind, PointerPool, TouchEvent, TouchLayer,
    TouchManager, TouchPhase, TouchSource, Vec2,
};
use proptest::prelude::*;

// ── Layers ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Verdict {
    Hit,
    Miss,
    Discard,
}

struct Scripted {
    id: u32,
    priority: i32,
    verdict: Verdict,
    calls: Rc<RefCell<Vec<u32>>>,
}

impl TouchLayer for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn hit(&self, _position: Vec2) -> LayerHit {
        self.calls.borrow_mut().push(self.id);
        match self.verdict {
            Verdict::Hit => LayerHit::Hit(HitTarget::node(NodeId(u64::from(self.id)))),
            Verdict::Miss => LayerHit::Miss,
            Verdict::Discard => LayerHit::Discard,
        }
    }
}

fn verdict_strategy() -> impl Strategy<Value = Verdict> {
    prop_oneof![
        3 => Just(Verdict::Miss),
        1 => Just(Verdict::Hit),
        1 => Just(Verdict::Discard),
    ]
}

proptest! {
    #[test]
    fn layers_are_consulted_in_priority_then_insertion_order(
        layers in prop::collection::vec((-5i32..5, verdict_strategy()), 1..12),
    ) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut manager = LayerManager::new();
        for (i, (priority, verdict)) in layers.iter().enumerate() {
            manager
                .add_layer(
                    LayerId(i as u32),
                    Box::new(Scripted {
                        id: i as u32,
                        priority: *priority,
                        verdict: *verdict,
                        calls: Rc::clone(&calls),
                    }),
                )
                .unwrap();
        }

        let result = manager.get_hit_target(Vec2::ZERO);

        let mut expected: Vec<usize> = (0..layers.len()).collect();
        expected.sort_by_key(|&i| (layers[i].0, i));
        let mut consulted = Vec::new();
        let mut expected_hit = None;
        for i in expected {
            consulted.push(i as u32);
            match layers[i].1 {
                Verdict::Miss => continue,
                Verdict::Hit => {
                    expected_hit = Some(NodeId(i as u64));
                    break;
                }
                Verdict::Discard => break,
            }
        }

        prop_assert_eq!(&*calls.borrow(), &consulted);
        prop_assert_eq!(result.map(|hit| hit.target), expected_hit);
    }
}

// ── Change sets ─────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn updates_merge_and_flush_in_first_mention_order(
        ids in prop::collection::vec(0i32..8, 0..40),
    ) {
        let mut changes = PointerChanges::new();
        let mut first_seen = Vec::new();
        for id in &ids {
            changes.put_updated(PointerId(*id));
            if !first_seen.contains(id) {
                first_seen.push(*id);
            }
        }
        let flushed = changes.flush();
        let order: Vec<i32> = flushed.iter().map(|(id, _)| id.0).collect();
        prop_assert_eq!(order, first_seen);
        prop_assert!(flushed.iter().all(|(_, c)| *c == PointerChange::UPDATED));
        prop_assert!(changes.flush().is_empty());
    }
}

// ── Pool retain counts ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn pointer_recycles_exactly_when_discarded_and_unretained(
        retains in 0u32..6,
        discard_after in 0u32..6,
    ) {
        let mut pool = PointerPool::new();
        let id = pool.issue(PointerKind::Touch, InputSourceId(0), Vec2::ZERO, PointerFlags::empty());
        for _ in 0..retains {
            pool.retain(id);
        }
        let discard_after = discard_after.min(retains);
        for _ in 0..discard_after {
            pool.release(id);
        }
        pool.discard(id);
        let remaining = retains - discard_after;
        prop_assert_eq!(pool.get(id).is_some(), remaining > 0);
        for left in (0..remaining).rev() {
            prop_assert_eq!(pool.release(id), Some(left));
        }
        prop_assert!(pool.get(id).is_none());
        prop_assert_eq!(pool.stats().recycled, 1);
    }
}

// ── Arbitrary scripts ───────────────────────────────────────────────────

fn phase_strategy() -> impl Strategy<Value = TouchPhase> {
    prop_oneof![
        Just(TouchPhase::Began),
        Just(TouchPhase::Moved),
        Just(TouchPhase::Stationary),
        Just(TouchPhase::Ended),
        Just(TouchPhase::Canceled),
    ]
}

fn event_strategy() -> impl Strategy<Value = TouchEvent> {
    (0u64..4, phase_strategy(), -50.0f32..50.0, -50.0f32..50.0)
        .prop_map(|(finger, phase, x, y)| TouchEvent::new(finger, phase, Vec2::new(x, y)))
}

proptest! {
    #[test]
    fn arbitrary_touch_scripts_settle(
        frames in prop::collection::vec(prop::collection::vec(event_strategy(), 0..6), 1..20),
    ) {
        let mut touch = TouchManager::default();
        let input = touch.add_input(Box::new(TouchSource::new()));
        for events in frames {
            let source = touch.source_mut::<TouchSource>(input).unwrap();
            for event in events {
                source.push(event);
            }
            touch.update(Instant::now(), &mut []);
        }
        // Lift everything still down.
        let source = touch.source_mut::<TouchSource>(input).unwrap();
        for finger in 0..4 {
            if source.pointer_for(finger).is_some() {
                source.push(TouchEvent::new(finger, TouchPhase::Ended, Vec2::ZERO));
            }
        }
        touch.update(Instant::now(), &mut []);

        let stats = touch.pointers().stats();
        prop_assert_eq!(stats.live, 0);
        prop_assert_eq!(stats.issued, stats.recycled);
    }
}
