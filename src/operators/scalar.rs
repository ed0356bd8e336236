//! Deferred single-value emission.
//!
//! An aggregating operator learns its only output when the upstream
//! completes, which may happen before or after the downstream asks for it.
//! [`ScalarSink`] sits between the two: it holds the value until downstream
//! demand exists and pulls the upstream only once the downstream has asked
//! for something.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{StreamError, Violation};
use crate::serialize::SerializedSink;
use crate::sink::{BoxSink, Sink};
use crate::subscription::{Subscription, SubscriptionRef};

const REQUESTED: u8 = 0b0001;
const HAS_VALUE: u8 = 0b0010;
const DONE: u8 = 0b0100;
const CANCELLED: u8 = 0b1000;

struct ScalarState<R> {
    state: AtomicU8,
    value: Mutex<Option<R>>,
    upstream: Mutex<Option<SubscriptionRef>>,
    downstream: SerializedSink<R>,
    prefetch: u64,
}

impl<R: Send + 'static> ScalarState<R> {
    fn is_closed(state: u8) -> bool {
        state & (DONE | CANCELLED) != 0
    }

    /// Claim the terminal transition. True for the single caller that wins.
    fn finish(&self) -> bool {
        !Self::is_closed(self.state.fetch_or(DONE, Ordering::AcqRel))
    }

    fn upstream(&self) -> Option<SubscriptionRef> {
        self.upstream.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn take_value(&self) -> Option<R> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    fn emit(&self) {
        if let Some(value) = self.take_value() {
            self.downstream.next(value);
        }
        self.downstream.complete();
    }

    fn cancel_upstream(&self) {
        let upstream = self
            .upstream
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(upstream) = upstream {
            upstream.cancel();
        }
    }
}

/// Sink side of the deferred scalar: receives at most one value from the
/// aggregating operator and releases it to the real sink on demand.
pub struct ScalarSink<R> {
    shared: Arc<ScalarState<R>>,
}

impl<R: Send + 'static> ScalarSink<R> {
    /// `prefetch` is the window requested from upstream once the downstream
    /// has signalled demand.
    pub fn new(downstream: BoxSink<R>, prefetch: u64) -> Self {
        Self {
            shared: Arc::new(ScalarState {
                state: AtomicU8::new(0),
                value: Mutex::new(None),
                upstream: Mutex::new(None),
                downstream: SerializedSink::new(downstream),
                prefetch,
            }),
        }
    }
}

impl<R: Send + 'static> Sink<R> for ScalarSink<R> {
    fn on_subscribe(&mut self, subscription: SubscriptionRef) {
        {
            let mut upstream = self
                .shared
                .upstream
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if upstream.is_some() {
                log::warn!("{}, cancelling the new subscription", Violation::DuplicateSubscription);
                subscription.cancel();
                return;
            }
            *upstream = Some(subscription);
        }

        let scalar = ScalarSubscription {
            shared: Arc::clone(&self.shared),
        };
        self.shared.downstream.subscribe(Arc::new(scalar));
    }

    fn on_next(&mut self, item: R) {
        if ScalarState::<R>::is_closed(self.shared.state.load(Ordering::Acquire)) {
            return;
        }
        let mut value = self.shared.value.lock().unwrap_or_else(PoisonError::into_inner);
        if value.is_some() {
            log::warn!("Scalar sink received more than one value, keeping the first");
            return;
        }
        *value = Some(item);
    }

    fn on_error(&mut self, error: StreamError) {
        if self.shared.finish() {
            self.shared.take_value();
            self.shared.downstream.error(error);
        }
    }

    fn on_complete(&mut self) {
        let has_value = self
            .shared
            .value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some();

        if !has_value {
            if self.shared.finish() {
                self.shared.downstream.complete();
            }
            return;
        }

        let state = &self.shared.state;
        let mut current = state.load(Ordering::Acquire);
        loop {
            if ScalarState::<R>::is_closed(current) {
                return;
            }
            let (next, deliver) = if current & REQUESTED != 0 {
                (current | HAS_VALUE | DONE, true)
            } else {
                (current | HAS_VALUE, false)
            };
            match state.compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => {
                    if deliver {
                        self.shared.emit();
                    }
                    return;
                }
                Err(actual) => current = actual,
            }
        }
    }
}

/// Subscription handed to the real sink.
struct ScalarSubscription<R> {
    shared: Arc<ScalarState<R>>,
}

impl<R: Send + 'static> Subscription for ScalarSubscription<R> {
    fn request(&self, n: u64) {
        let shared = &self.shared;

        if n == 0 {
            if shared.finish() {
                shared.take_value();
                shared.cancel_upstream();
                shared.downstream.error(Violation::NonPositiveRequest.into());
            }
            return;
        }

        let mut current = shared.state.load(Ordering::Acquire);
        loop {
            if ScalarState::<R>::is_closed(current) || current & REQUESTED != 0 {
                return;
            }
            let has_value = current & HAS_VALUE != 0;
            let next = if has_value {
                current | REQUESTED | DONE
            } else {
                current | REQUESTED
            };
            match shared
                .state
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    if has_value {
                        shared.emit();
                    } else if let Some(upstream) = shared.upstream() {
                        upstream.request(shared.prefetch);
                    }
                    return;
                }
                Err(actual) => current = actual,
            }
        }
    }

    fn cancel(&self) {
        let previous = self.shared.state.fetch_or(CANCELLED, Ordering::AcqRel);
        if previous & CANCELLED == 0 {
            log::debug!("Scalar subscription cancelled");
            self.shared.take_value();
            self.shared.cancel_upstream();
        }
    }
}
