//! The demand-mediating half of the protocol.
//!
//! A [`Subscription`] is created by a source for exactly one sink. The sink
//! authorises delivery with `request(n)` and ends the relationship with
//! `cancel()`. Both calls take `&self` so they are legal from inside a sink
//! callback and from other threads.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Demand value meaning "deliver without limit". Never decremented.
pub const UNBOUNDED: u64 = u64::MAX;

/// Demand handle a source gives to its sink.
pub trait Subscription: Send + Sync {
    /// Authorise `n` more elements. `n == 0` is a protocol violation and is
    /// answered with `on_error`. Has no effect once the subscription is
    /// terminal.
    fn request(&self, n: u64);

    /// Stop delivery and release resources. Idempotent; no new signal is
    /// initiated after this returns.
    fn cancel(&self);
}

/// Shared reference to a subscription, as handed to `Sink::on_subscribe`.
pub type SubscriptionRef = Arc<dyn Subscription>;

/// Outstanding demand counter.
///
/// Requests are additive and saturate at [`UNBOUNDED`]; once unbounded the
/// counter stays unbounded.
#[derive(Debug, Default)]
pub struct Demand {
    requested: AtomicU64,
}

impl Demand {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `n` to the outstanding demand and return the previous value.
    pub fn add(&self, n: u64) -> u64 {
        let mut current = self.requested.load(Ordering::Acquire);
        loop {
            if current == UNBOUNDED {
                return current;
            }
            let next = current.saturating_add(n);
            match self.requested.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(previous) => return previous,
                Err(actual) => current = actual,
            }
        }
    }

    /// Take one unit of demand. Returns false when none is outstanding.
    pub fn try_consume(&self) -> bool {
        let mut current = self.requested.load(Ordering::Acquire);
        loop {
            match current {
                0 => return false,
                UNBOUNDED => return true,
                _ => {}
            }
            match self.requested.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    pub fn current(&self) -> u64 {
        self.requested.load(Ordering::Acquire)
    }

    pub fn is_unbounded(&self) -> bool {
        self.current() == UNBOUNDED
    }

    /// Drop all outstanding demand, e.g. after cancellation.
    pub fn clear(&self) {
        self.requested.store(0, Ordering::Release);
    }
}

/// Subscription that is already terminal. Handed out when a source must
/// fail a sink before any real subscription exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct CancelledSubscription;

impl Subscription for CancelledSubscription {
    fn request(&self, _n: u64) {}

    fn cancel(&self) {}
}
