//! Serialized access to a sink from several execution contexts.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::StreamError;
use crate::sink::{BoxSink, Sink};
use crate::subscription::SubscriptionRef;

enum Signal<T> {
    Subscribe(SubscriptionRef),
    Next(T),
    Error(StreamError),
    Complete,
}

struct Shared<T> {
    wip: AtomicUsize,
    terminated: AtomicBool,
    queue: Mutex<VecDeque<Signal<T>>>,
    sink: Mutex<Option<BoxSink<T>>>,
}

/// Cloneable handle that turns concurrent or re-entrant signalling into a
/// strictly ordered, non-overlapping call sequence on the wrapped sink.
///
/// Signals are queued and delivered by whichever caller wins the drain; a
/// signal raised from inside a sink callback is delivered after that callback
/// returns. Everything after the first terminal signal is dropped.
pub struct SerializedSink<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for SerializedSink<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> SerializedSink<T> {
    pub fn new(sink: BoxSink<T>) -> Self {
        Self {
            shared: Arc::new(Shared {
                wip: AtomicUsize::new(0),
                terminated: AtomicBool::new(false),
                queue: Mutex::new(VecDeque::new()),
                sink: Mutex::new(Some(sink)),
            }),
        }
    }

    pub fn subscribe(&self, subscription: SubscriptionRef) {
        self.push(Signal::Subscribe(subscription));
    }

    pub fn next(&self, item: T) {
        self.push(Signal::Next(item));
    }

    pub fn error(&self, error: StreamError) {
        self.push(Signal::Error(error));
    }

    pub fn complete(&self) {
        self.push(Signal::Complete);
    }

    /// True once a terminal signal has been delivered.
    pub fn is_terminated(&self) -> bool {
        self.shared.terminated.load(Ordering::Acquire)
    }

    fn push(&self, signal: Signal<T>) {
        self.shared
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(signal);
        self.drain();
    }

    fn pop(&self) -> Option<Signal<T>> {
        self.shared
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    fn drain(&self) {
        if self.shared.wip.fetch_add(1, Ordering::AcqRel) != 0 {
            return;
        }

        let mut missed = 1;
        loop {
            while let Some(signal) = self.pop() {
                self.deliver(signal);
            }

            let remaining = self.shared.wip.fetch_sub(missed, Ordering::AcqRel) - missed;
            if remaining == 0 {
                break;
            }
            missed = remaining;
        }
    }

    fn deliver(&self, signal: Signal<T>) {
        let mut slot = self.shared.sink.lock().unwrap_or_else(PoisonError::into_inner);

        if slot.is_none() {
            log::trace!("Dropping signal delivered after terminal state");
            return;
        }

        match signal {
            Signal::Subscribe(subscription) => {
                if let Some(sink) = slot.as_mut() {
                    sink.on_subscribe(subscription);
                }
            }
            Signal::Next(item) => {
                if let Some(sink) = slot.as_mut() {
                    sink.on_next(item);
                }
            }
            Signal::Error(error) => {
                self.shared.terminated.store(true, Ordering::Release);
                if let Some(mut sink) = slot.take() {
                    sink.on_error(error);
                }
            }
            Signal::Complete => {
                self.shared.terminated.store(true, Ordering::Release);
                if let Some(mut sink) = slot.take() {
                    sink.on_complete();
                }
            }
        }
    }
}

impl<T: Send + 'static> Sink<T> for SerializedSink<T> {
    fn on_subscribe(&mut self, subscription: SubscriptionRef) {
        self.subscribe(subscription);
    }

    fn on_next(&mut self, item: T) {
        self.next(item);
    }

    fn on_error(&mut self, error: StreamError) {
        self.error(error);
    }

    fn on_complete(&mut self) {
        self.complete();
    }
}
