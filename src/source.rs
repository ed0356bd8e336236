//! The producing half of the protocol and the operator-chaining extension trait.

use std::sync::Arc;

use crate::error::StreamResult;
use crate::operators::{Fallible, Fold, Infallible, Map, Sum, Summable};
use crate::sink::{BoxSink, Sink};
use crate::stream_configuration::{FlowConfig, OverflowPolicy};

/// Something a sink can subscribe to.
///
/// Every `subscribe` call creates a fresh, independent subscription and
/// calls `sink.on_subscribe` exactly once before any other signal.
pub trait Source: Send + Sync {
    type Item: Send + 'static;

    fn subscribe(&self, sink: BoxSink<Self::Item>);
}

/// A shared, type-erased source.
pub type BoxSource<T> = Arc<dyn Source<Item = T>>;

impl<S> Source for Arc<S>
where
    S: Source + ?Sized,
{
    type Item = S::Item;

    fn subscribe(&self, sink: BoxSink<Self::Item>) {
        (**self).subscribe(sink)
    }
}

/// Operator combinators available on every source.
pub trait SourceExt: Source + Sized {
    /// Transform every element with a total function.
    fn map<R, F>(self, f: F) -> Map<Self, Infallible<F>>
    where
        F: Fn(Self::Item) -> R + Send + Sync + 'static,
        R: Send + 'static,
    {
        Map::new(self, Infallible(f))
    }

    /// Transform every element; an `Err` terminates the chain with `on_error`.
    fn try_map<R, F>(self, f: F) -> Map<Self, Fallible<F>>
    where
        F: Fn(Self::Item) -> StreamResult<R> + Send + Sync + 'static,
        R: Send + 'static,
    {
        Map::new(self, Fallible(f))
    }

    /// Left-fold the sequence into a single element emitted on completion.
    fn fold<R, F>(self, seed: R, f: F) -> Fold<Self, R, Infallible<F>>
    where
        F: Fn(R, Self::Item) -> R + Send + Sync + 'static,
        R: Clone + Send + Sync + 'static,
    {
        Fold::new(self, seed, Infallible(f))
    }

    /// Fold with a combine function that may fail.
    fn try_fold<R, F>(self, seed: R, f: F) -> Fold<Self, R, Fallible<F>>
    where
        F: Fn(R, Self::Item) -> StreamResult<R> + Send + Sync + 'static,
        R: Clone + Send + Sync + 'static,
    {
        Fold::new(self, seed, Fallible(f))
    }

    /// Numeric sum, failing with `StreamError::Overflow` on overflow.
    fn sum(self) -> Sum<Self>
    where
        Self::Item: Summable,
    {
        self.sum_with(OverflowPolicy::default())
    }

    fn sum_with(self, policy: OverflowPolicy) -> Sum<Self>
    where
        Self::Item: Summable,
    {
        crate::operators::sum(self, policy)
    }

    /// Sum with the overflow policy and upstream window from `config`.
    fn sum_with_config(self, config: &FlowConfig) -> Sum<Self>
    where
        Self::Item: Summable,
    {
        self.sum_with(config.overflow).with_config(config)
    }

    fn boxed(self) -> BoxSource<Self::Item>
    where
        Self: 'static,
    {
        Arc::new(self)
    }

    /// Box `sink` and subscribe it.
    fn subscribe_with<K>(&self, sink: K)
    where
        K: Sink<Self::Item> + 'static,
    {
        self.subscribe(Box::new(sink))
    }
}

impl<S: Source> SourceExt for S {}
