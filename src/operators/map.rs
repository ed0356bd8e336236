//! Element-wise transformation.

use std::sync::Arc;

use super::delegate::{DelegateSink, Operator};
use super::{Fallible, Infallible};
use crate::error::StreamResult;
use crate::sink::{BoxSink, Sink};
use crate::source::Source;

/// A transform from `T` to `Self::Output`.
pub trait MapFn<T>: Send + Sync {
    type Output;

    fn apply(&self, item: T) -> StreamResult<Self::Output>;
}

impl<T, R, F> MapFn<T> for Infallible<F>
where
    F: Fn(T) -> R + Send + Sync,
{
    type Output = R;

    fn apply(&self, item: T) -> StreamResult<R> {
        Ok((self.0)(item))
    }
}

impl<T, R, F> MapFn<T> for Fallible<F>
where
    F: Fn(T) -> StreamResult<R> + Send + Sync,
{
    type Output = R;

    fn apply(&self, item: T) -> StreamResult<R> {
        (self.0)(item)
    }
}

/// Source emitting `f(t)` for every upstream element `t`.
pub struct Map<S, M> {
    upstream: S,
    f: Arc<M>,
}

impl<S, M> Map<S, M> {
    pub fn new(upstream: S, f: M) -> Self {
        Self {
            upstream,
            f: Arc::new(f),
        }
    }
}

impl<S, M> Source for Map<S, M>
where
    S: Source,
    M: MapFn<S::Item> + 'static,
    M::Output: Send + 'static,
{
    type Item = M::Output;

    fn subscribe(&self, sink: BoxSink<Self::Item>) {
        let op = MapOp {
            f: Arc::clone(&self.f),
        };
        self.upstream.subscribe(Box::new(DelegateSink::new(sink, op)));
    }
}

struct MapOp<M> {
    f: Arc<M>,
}

impl<T, M> Operator<T, M::Output> for MapOp<M>
where
    M: MapFn<T>,
{
    fn on_next(&mut self, item: T, downstream: &mut dyn Sink<M::Output>) -> StreamResult<()> {
        let mapped = self.f.apply(item)?;
        downstream.on_next(mapped);
        Ok(())
    }
}
