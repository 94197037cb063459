//! A panicking listener is logged at error level and does not stop dispatch.

use std::sync::{Arc, Mutex};

use fingertip_core::{
    Instant, PointerFrame, PointerId, PointerListener, TouchEvent, TouchManager, TouchPhase,
    TouchSource, Vec2,
};
use tracing_subscriber::layer::SubscriberExt;

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: tracing::Level,
    target: String,
    fields: Vec<(String, String)>,
}

struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for EventCapture {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            fields: visitor.0,
        });
    }
}

fn with_captured_tracing(f: impl FnOnce()) -> Vec<CapturedEvent> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(EventCapture {
        events: Arc::clone(&events),
    });
    tracing::subscriber::with_default(subscriber, f);
    let captured = events.lock().unwrap().clone();
    captured
}

struct Faulty;

impl PointerListener for Faulty {
    fn pointers_pressed(&mut self, _frame: &mut PointerFrame<'_>, _pointers: &[PointerId]) {
        panic!("pressed handler exploded");
    }
}

#[derive(Default)]
struct Counter {
    pressed: usize,
    finished: usize,
}

impl PointerListener for Counter {
    fn pointers_pressed(&mut self, _frame: &mut PointerFrame<'_>, pointers: &[PointerId]) {
        self.pressed += pointers.len();
    }
    fn frame_finished(&mut self, _frame: &mut PointerFrame<'_>) {
        self.finished += 1;
    }
}

#[test]
fn panicking_listener_is_logged_and_isolated() {
    let mut counter = Counter::default();
    let events = with_captured_tracing(|| {
        let mut touch = TouchManager::default();
        let input = touch.add_input(Box::new(TouchSource::new()));
        let source = touch.source_mut::<TouchSource>(input).unwrap();
        source.push(TouchEvent::new(1, TouchPhase::Began, Vec2::ZERO));
        source.push(TouchEvent::new(2, TouchPhase::Began, Vec2::new(5.0, 5.0)));

        let mut faulty = Faulty;
        touch.update(Instant::now(), &mut [&mut faulty, &mut counter]);
    });

    assert_eq!(counter.pressed, 2);
    assert_eq!(counter.finished, 1);

    let errors: Vec<_> = events
        .iter()
        .filter(|e| e.level == tracing::Level::ERROR)
        .collect();
    assert_eq!(errors.len(), 1, "expected one error event, got {events:?}");
    assert_eq!(errors[0].target, "fingertip.touch");
    let field = |name: &str| {
        errors[0]
            .fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    };
    assert_eq!(field("phase").as_deref(), Some("pointers_pressed"));
    assert_eq!(field("panic").as_deref(), Some("pressed handler exploded"));
}
