use rs2_flow::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

/// Records items and flags any two callbacks that run at the same time.
#[derive(Clone, Default)]
struct OverlapSink {
    in_call: Arc<AtomicBool>,
    overlapped: Arc<AtomicBool>,
    items: Arc<Mutex<Vec<u32>>>,
    subscription: Arc<Mutex<Option<SubscriptionRef>>>,
    completed: Arc<AtomicBool>,
}

impl OverlapSink {
    fn enter(&self) {
        if self.in_call.swap(true, Ordering::SeqCst) {
            self.overlapped.store(true, Ordering::SeqCst);
        }
    }

    fn exit(&self) {
        self.in_call.store(false, Ordering::SeqCst);
    }

    fn request(&self, n: u64) {
        let subscription = self.subscription.lock().unwrap().clone();
        if let Some(subscription) = subscription {
            subscription.request(n);
        }
    }
}

impl Sink<u32> for OverlapSink {
    fn on_subscribe(&mut self, subscription: SubscriptionRef) {
        self.enter();
        *self.subscription.lock().unwrap() = Some(subscription);
        self.exit();
    }

    fn on_next(&mut self, item: u32) {
        self.enter();
        self.items.lock().unwrap().push(item);
        for _ in 0..50 {
            std::hint::spin_loop();
        }
        self.exit();
    }

    fn on_error(&mut self, _error: StreamError) {
        self.enter();
        self.exit();
    }

    fn on_complete(&mut self) {
        self.enter();
        self.completed.store(true, Ordering::SeqCst);
        self.exit();
    }
}

#[test]
fn test_concurrent_requests_deliver_serially_and_in_order() {
    let sink = OverlapSink::default();
    let observer = sink.clone();

    from_iter(0..1000u32).subscribe_with(sink);

    thread::scope(|scope| {
        for _ in 0..8 {
            let observer = observer.clone();
            scope.spawn(move || {
                for _ in 0..125 {
                    observer.request(1);
                }
            });
        }
    });

    assert!(!observer.overlapped.load(Ordering::SeqCst));
    assert_eq!(*observer.items.lock().unwrap(), (0..1000).collect::<Vec<_>>());
    assert!(!observer.completed.load(Ordering::SeqCst));

    observer.request(1);
    assert!(observer.completed.load(Ordering::SeqCst));
}

#[test]
fn test_concurrent_requests_through_map() {
    let sink = OverlapSink::default();
    let observer = sink.clone();

    from_iter(0..400u32).map(|x| x + 1).subscribe_with(sink);

    thread::scope(|scope| {
        for _ in 0..4 {
            let observer = observer.clone();
            scope.spawn(move || {
                for _ in 0..50 {
                    observer.request(2);
                }
            });
        }
    });

    assert!(!observer.overlapped.load(Ordering::SeqCst));
    assert_eq!(*observer.items.lock().unwrap(), (1..=400).collect::<Vec<_>>());
}

#[test]
fn test_cancel_races_with_requests() {
    let sink = OverlapSink::default();
    let observer = sink.clone();

    from_iter(0..100_000u32).subscribe_with(sink);

    thread::scope(|scope| {
        for _ in 0..4 {
            let observer = observer.clone();
            scope.spawn(move || {
                for _ in 0..1000 {
                    observer.request(5);
                }
            });
        }
        let canceller = observer.clone();
        scope.spawn(move || {
            let subscription = canceller.subscription.lock().unwrap().clone();
            if let Some(subscription) = subscription {
                subscription.cancel();
            }
        });
    });

    let delivered = observer.items.lock().unwrap().len();
    observer.request(100);
    assert_eq!(observer.items.lock().unwrap().len(), delivered);
    assert!(!observer.overlapped.load(Ordering::SeqCst));
    assert!(!observer.completed.load(Ordering::SeqCst));
}

#[test]
fn test_serialized_sink_orders_signals_from_many_threads() {
    let sink = OverlapSink::default();
    let observer = sink.clone();
    let serialized = SerializedSink::new(Box::new(sink));

    serialized.subscribe(Arc::new(CancelledSubscription));

    thread::scope(|scope| {
        for worker in 0..8u32 {
            let serialized = serialized.clone();
            scope.spawn(move || {
                for i in 0..100 {
                    serialized.next(worker * 100 + i);
                }
            });
        }
    });

    serialized.complete();
    serialized.next(9999);
    serialized.error(StreamError::production("late"));

    assert!(serialized.is_terminated());
    assert!(!observer.overlapped.load(Ordering::SeqCst));
    assert!(observer.completed.load(Ordering::SeqCst));

    let mut items = observer.items.lock().unwrap().clone();
    assert_eq!(items.len(), 800);
    items.sort_unstable();
    assert_eq!(items, (0..800).collect::<Vec<_>>());
}

#[test]
fn test_source_shared_across_threads() {
    let source = from_iter(1..=100u64).sum().boxed();

    let totals: Vec<Vec<u64>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let source = Arc::clone(&source);
                scope.spawn(move || {
                    let sink = RecordingSink::new(DemandPolicy::Batched(1));
                    let recording = sink.recording();
                    source.subscribe_with(sink);
                    recording.items()
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    for total in totals {
        assert_eq!(total, vec![5050]);
    }
}
