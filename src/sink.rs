//! The consuming half of the protocol.

use crate::error::StreamError;
use crate::subscription::SubscriptionRef;

/// Consumer of a sequence of `T`.
///
/// For one subscription a sink sees `on_subscribe` exactly once, then any
/// number of `on_next` calls bounded by the demand it requested, then at most
/// one of `on_error`/`on_complete`. Calls never overlap.
pub trait Sink<T>: Send {
    /// Receives the subscription. Demand may be requested before returning;
    /// no element is delivered until this returns.
    fn on_subscribe(&mut self, subscription: SubscriptionRef);

    fn on_next(&mut self, item: T);

    /// Terminal. The subscription must not be used afterwards.
    fn on_error(&mut self, error: StreamError);

    /// Terminal. The subscription must not be used afterwards.
    fn on_complete(&mut self);
}

/// A heap-allocated sink, the form sources accept.
pub type BoxSink<T> = Box<dyn Sink<T>>;

impl<T, S> Sink<T> for Box<S>
where
    S: Sink<T> + ?Sized,
{
    fn on_subscribe(&mut self, subscription: SubscriptionRef) {
        (**self).on_subscribe(subscription)
    }

    fn on_next(&mut self, item: T) {
        (**self).on_next(item)
    }

    fn on_error(&mut self, error: StreamError) {
        (**self).on_error(error)
    }

    fn on_complete(&mut self) {
        (**self).on_complete()
    }
}
