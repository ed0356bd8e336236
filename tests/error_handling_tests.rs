use rs2_flow::operators::{DelegateSink, Operator};
use rs2_flow::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Emits signals with no regard for the protocol.
struct Misbehaving;

impl Source for Misbehaving {
    type Item = i32;

    fn subscribe(&self, mut sink: BoxSink<i32>) {
        sink.on_next(0);
        sink.on_subscribe(Arc::new(CancelledSubscription));
        sink.on_next(1);
        sink.on_complete();
        sink.on_next(2);
        sink.on_error(StreamError::production("late"));
    }
}

#[test]
fn test_recording_sink_flags_protocol_violations() {
    let sink = RecordingSink::unbounded();
    let recording = sink.recording();

    Misbehaving.subscribe_with(sink);

    assert_eq!(recording.items(), vec![1]);
    assert_eq!(recording.completions(), 1);
    assert!(recording.errors().is_empty());
    assert_eq!(
        recording.violations(),
        vec![
            Violation::SignalBeforeSubscribe,
            Violation::SignalAfterTerminal,
            Violation::SignalAfterTerminal,
        ]
    );
}

#[test]
fn test_operator_drops_signals_outside_the_protocol() {
    let sink = RecordingSink::unbounded();
    let recording = sink.recording();

    Misbehaving.map(|x| x + 100).subscribe_with(sink);

    assert_eq!(recording.items(), vec![101]);
    assert_eq!(recording.completions(), 1);
    assert!(recording.violations().is_empty());
}

struct FlagSubscription {
    cancelled: Arc<AtomicBool>,
}

impl Subscription for FlagSubscription {
    fn request(&self, _n: u64) {}

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

struct PassThrough;

impl<T> Operator<T, T> for PassThrough {
    fn on_next(&mut self, item: T, downstream: &mut dyn Sink<T>) -> StreamResult<()> {
        downstream.on_next(item);
        Ok(())
    }
}

#[test]
fn test_delegate_sink_cancels_duplicate_subscription() {
    let inner = RecordingSink::<i32>::manual();
    let recording = inner.recording();
    let downstream: BoxSink<i32> = Box::new(inner);
    let mut delegate = DelegateSink::new(downstream, PassThrough);

    let first = Arc::new(AtomicBool::new(false));
    let second = Arc::new(AtomicBool::new(false));

    Sink::<i32>::on_subscribe(
        &mut delegate,
        Arc::new(FlagSubscription {
            cancelled: Arc::clone(&first),
        }),
    );
    Sink::<i32>::on_subscribe(
        &mut delegate,
        Arc::new(FlagSubscription {
            cancelled: Arc::clone(&second),
        }),
    );

    assert!(!first.load(Ordering::SeqCst));
    assert!(second.load(Ordering::SeqCst));
    assert_eq!(recording.events(), vec![Event::Subscribed]);
}

#[test]
fn test_recording_sink_cancels_duplicate_subscription() {
    let mut sink = RecordingSink::<i32>::manual();
    let recording = sink.recording();
    let second = Arc::new(AtomicBool::new(false));

    sink.on_subscribe(Arc::new(CancelledSubscription));
    sink.on_subscribe(Arc::new(FlagSubscription {
        cancelled: Arc::clone(&second),
    }));

    assert!(second.load(Ordering::SeqCst));
    assert_eq!(recording.violations(), vec![Violation::DuplicateSubscription]);
}

#[test]
fn test_zero_request_terminates_with_violation() {
    let sink = RecordingSink::manual();
    let recording = sink.recording();

    from_iter(vec![1, 2, 3]).subscribe_with(sink);
    recording.request(0);

    assert_eq!(recording.item_count(), 0);
    let errors = recording.errors();
    assert_eq!(errors, vec![StreamError::ProtocolViolation(Violation::NonPositiveRequest)]);
    assert!(errors[0].is_protocol_violation());
}

#[test]
fn test_zero_request_after_items_stops_delivery() {
    let sink = RecordingSink::manual();
    let recording = sink.recording();

    from_iter(0..10).subscribe_with(sink);
    recording.request(2);
    recording.request(0);
    recording.request(5);

    assert_eq!(recording.items(), vec![0, 1]);
    assert_eq!(
        recording.errors(),
        vec![StreamError::ProtocolViolation(Violation::NonPositiveRequest)]
    );
}

#[test]
fn test_zero_request_through_map() {
    let sink = RecordingSink::manual();
    let recording = sink.recording();

    from_iter(vec![1, 2, 3]).map(|x| x * 2).subscribe_with(sink);
    recording.request(0);

    assert_eq!(
        recording.errors(),
        vec![StreamError::ProtocolViolation(Violation::NonPositiveRequest)]
    );
}

#[test]
fn test_zero_request_through_fold() {
    let sink = RecordingSink::manual();
    let recording = sink.recording();

    from_iter(vec![1, 2, 3]).sum().subscribe_with(sink);
    recording.request(0);

    assert_eq!(recording.item_count(), 0);
    assert_eq!(
        recording.errors(),
        vec![StreamError::ProtocolViolation(Violation::NonPositiveRequest)]
    );
}

#[test]
fn test_production_error_after_elements() {
    let sink = RecordingSink::unbounded();
    let recording = sink.recording();

    try_from_iter(vec![Ok(1), Ok(2), Err("disk unplugged"), Ok(4)]).subscribe_with(sink);

    assert_eq!(recording.items(), vec![1, 2]);
    assert_eq!(
        recording.errors(),
        vec![StreamError::Production("disk unplugged".to_string())]
    );
    assert_eq!(recording.completions(), 0);
}

#[test]
fn test_production_error_propagates_through_chain() {
    let sink = RecordingSink::unbounded();
    let recording = sink.recording();

    try_from_iter(vec![Ok(1), Err("bad read")])
        .map(|x: i32| x * 3)
        .sum()
        .subscribe_with(sink);

    assert_eq!(recording.item_count(), 0);
    assert_eq!(
        recording.errors(),
        vec![StreamError::Production("bad read".to_string())]
    );
}

#[test]
fn test_error_display() {
    assert_eq!(
        StreamError::from(Violation::NonPositiveRequest).to_string(),
        "Protocol violation: request count must be positive"
    );
    assert_eq!(StreamError::Overflow.to_string(), "Numeric overflow in sum");
    assert_eq!(
        StreamError::transform("boom").to_string(),
        "Transform failed: boom"
    );
    assert!(!StreamError::Overflow.is_protocol_violation());
}
