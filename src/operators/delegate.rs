//! The delegating sink every operator is built from.

use std::sync::Arc;

use crate::error::{StreamError, StreamResult, Violation};
use crate::sink::{BoxSink, Sink};
use crate::subscription::SubscriptionRef;

/// Per-subscription behaviour plugged into a [`DelegateSink`].
///
/// Lifecycle signals default to pass-through; `on_next` is the extension
/// point. Returning `Err` from `on_next` cancels the upstream and delivers
/// the error downstream.
pub trait Operator<T, R>: Send {
    fn on_subscribe(&mut self, upstream: &SubscriptionRef, downstream: &mut dyn Sink<R>) {
        downstream.on_subscribe(Arc::clone(upstream));
    }

    fn on_next(&mut self, item: T, downstream: &mut dyn Sink<R>) -> StreamResult<()>;

    fn on_error(&mut self, error: StreamError, downstream: &mut dyn Sink<R>) {
        downstream.on_error(error);
    }

    fn on_complete(&mut self, downstream: &mut dyn Sink<R>) {
        downstream.on_complete();
    }
}

/// A `Sink<T>` wrapping a downstream `Sink<R>`.
///
/// Owns the protocol bookkeeping so operators only describe what happens to
/// data: it rejects a second subscription, drops signals after the terminal
/// one and turns an operator failure into upstream cancellation plus one
/// downstream `on_error`.
pub struct DelegateSink<R, Op> {
    downstream: BoxSink<R>,
    op: Op,
    upstream: Option<SubscriptionRef>,
    done: bool,
}

impl<R, Op> DelegateSink<R, Op> {
    pub fn new(downstream: BoxSink<R>, op: Op) -> Self {
        Self {
            downstream,
            op,
            upstream: None,
            done: false,
        }
    }

    fn accepts_signal(&self, signal: &str) -> bool {
        if self.done {
            log::trace!("Dropping {} after terminal signal", signal);
            return false;
        }
        if self.upstream.is_none() {
            log::error!("{}: {}", Violation::SignalBeforeSubscribe, signal);
            return false;
        }
        true
    }
}

impl<T, R, Op> Sink<T> for DelegateSink<R, Op>
where
    Op: Operator<T, R>,
    R: 'static,
{
    fn on_subscribe(&mut self, subscription: SubscriptionRef) {
        if self.upstream.is_some() || self.done {
            log::warn!("{}, cancelling the new subscription", Violation::DuplicateSubscription);
            subscription.cancel();
            return;
        }
        self.upstream = Some(Arc::clone(&subscription));
        self.op.on_subscribe(&subscription, &mut *self.downstream);
    }

    fn on_next(&mut self, item: T) {
        if !self.accepts_signal("on_next") {
            return;
        }
        if let Err(error) = self.op.on_next(item, &mut *self.downstream) {
            log::debug!("Operator failed, cancelling upstream: {}", error);
            self.done = true;
            if let Some(upstream) = self.upstream.take() {
                upstream.cancel();
            }
            self.downstream.on_error(error);
        }
    }

    fn on_error(&mut self, error: StreamError) {
        if !self.accepts_signal("on_error") {
            return;
        }
        self.done = true;
        self.upstream = None;
        self.op.on_error(error, &mut *self.downstream);
    }

    fn on_complete(&mut self) {
        if !self.accepts_signal("on_complete") {
            return;
        }
        self.done = true;
        self.upstream = None;
        self.op.on_complete(&mut *self.downstream);
    }
}
