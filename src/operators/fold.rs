//! Left fold of a whole sequence into one element.

use std::sync::Arc;

use super::delegate::{DelegateSink, Operator};
use super::scalar::ScalarSink;
use super::{Fallible, Infallible};
use crate::error::{StreamError, StreamResult, Violation};
use crate::sink::{BoxSink, Sink};
use crate::source::Source;
use crate::stream_configuration::FlowConfig;
use crate::subscription::{SubscriptionRef, UNBOUNDED};

/// Combines an accumulator with the next element.
pub trait FoldFn<R, T>: Send + Sync {
    fn combine(&self, acc: R, item: T) -> StreamResult<R>;
}

impl<R, T, F> FoldFn<R, T> for Infallible<F>
where
    F: Fn(R, T) -> R + Send + Sync,
{
    fn combine(&self, acc: R, item: T) -> StreamResult<R> {
        Ok((self.0)(acc, item))
    }
}

impl<R, T, F> FoldFn<R, T> for Fallible<F>
where
    F: Fn(R, T) -> StreamResult<R> + Send + Sync,
{
    fn combine(&self, acc: R, item: T) -> StreamResult<R> {
        (self.0)(acc, item)
    }
}

/// Source emitting exactly one element, the left fold of the upstream
/// sequence from `seed`, followed by completion.
///
/// Every subscription starts from its own clone of the seed. Nothing is
/// requested upstream until the downstream requests; the upstream is then
/// pulled `prefetch` elements at a time.
pub struct Fold<S, R, C> {
    upstream: S,
    seed: R,
    combine: Arc<C>,
    prefetch: u64,
}

impl<S, R, C> Fold<S, R, C> {
    pub fn new(upstream: S, seed: R, combine: C) -> Self {
        Self {
            upstream,
            seed,
            combine: Arc::new(combine),
            prefetch: FlowConfig::default().fold_prefetch,
        }
    }

    /// Set the upstream window. Zero is treated as one.
    pub fn prefetch(mut self, prefetch: u64) -> Self {
        self.prefetch = prefetch.max(1);
        self
    }

    /// Take the upstream window from `config`.
    pub fn with_config(self, config: &FlowConfig) -> Self {
        self.prefetch(config.fold_prefetch)
    }
}

impl<S, R, C> Source for Fold<S, R, C>
where
    S: Source,
    R: Clone + Send + Sync + 'static,
    C: FoldFn<R, S::Item> + 'static,
{
    type Item = R;

    fn subscribe(&self, sink: BoxSink<R>) {
        let scalar: BoxSink<R> = Box::new(ScalarSink::new(sink, self.prefetch));
        let op = FoldOp {
            acc: Some(self.seed.clone()),
            combine: Arc::clone(&self.combine),
            upstream: None,
            prefetch: self.prefetch,
            consumed: 0,
        };
        self.upstream
            .subscribe(Box::new(DelegateSink::new(scalar, op)));
    }
}

struct FoldOp<R, C> {
    acc: Option<R>,
    combine: Arc<C>,
    upstream: Option<SubscriptionRef>,
    prefetch: u64,
    consumed: u64,
}

impl<T, R, C> Operator<T, R> for FoldOp<R, C>
where
    R: Send,
    C: FoldFn<R, T>,
{
    fn on_subscribe(&mut self, upstream: &SubscriptionRef, downstream: &mut dyn Sink<R>) {
        self.upstream = Some(Arc::clone(upstream));
        downstream.on_subscribe(Arc::clone(upstream));
    }

    fn on_next(&mut self, item: T, _downstream: &mut dyn Sink<R>) -> StreamResult<()> {
        let acc = self
            .acc
            .take()
            .ok_or(StreamError::ProtocolViolation(Violation::SignalAfterTerminal))?;
        self.acc = Some(self.combine.combine(acc, item)?);

        if self.prefetch != UNBOUNDED {
            self.consumed += 1;
            if self.consumed == self.prefetch {
                self.consumed = 0;
                if let Some(upstream) = &self.upstream {
                    upstream.request(self.prefetch);
                }
            }
        }
        Ok(())
    }

    fn on_error(&mut self, error: StreamError, downstream: &mut dyn Sink<R>) {
        self.acc = None;
        self.upstream = None;
        downstream.on_error(error);
    }

    fn on_complete(&mut self, downstream: &mut dyn Sink<R>) {
        self.upstream = None;
        if let Some(acc) = self.acc.take() {
            downstream.on_next(acc);
        }
        downstream.on_complete();
    }
}
