//! Operators: sources that subscribe a delegating sink to an upstream source.
//!
//! Each operator is a small value holding its upstream and a shared function.
//! On `subscribe` it wraps the downstream sink in a [`DelegateSink`] driven by
//! an [`Operator`] implementation and subscribes that to the upstream, so
//! demand flows upstream unchanged while data is transformed on the way down.

pub mod delegate;
pub mod fold;
pub mod map;
pub mod scalar;
pub mod sum;

pub use delegate::{DelegateSink, Operator};
pub use fold::{Fold, FoldFn};
pub use map::{Map, MapFn};
pub use scalar::ScalarSink;
pub use sum::{Sum, Summable, Summation};

use crate::error::StreamResult;
use crate::source::Source;
use crate::stream_configuration::OverflowPolicy;

/// Wraps a plain function that cannot fail.
#[derive(Debug, Clone, Copy)]
pub struct Infallible<F>(pub F);

/// Wraps a function returning `StreamResult`; an `Err` becomes a transform
/// failure at the operator's boundary.
#[derive(Debug, Clone, Copy)]
pub struct Fallible<F>(pub F);

/// Map `source` with a total function
pub fn map<S, R, F>(source: S, f: F) -> Map<S, Infallible<F>>
where
    S: Source,
    F: Fn(S::Item) -> R + Send + Sync + 'static,
    R: Send + 'static,
{
    Map::new(source, Infallible(f))
}

/// Map `source` with a fallible function
pub fn try_map<S, R, F>(source: S, f: F) -> Map<S, Fallible<F>>
where
    S: Source,
    F: Fn(S::Item) -> StreamResult<R> + Send + Sync + 'static,
    R: Send + 'static,
{
    Map::new(source, Fallible(f))
}

/// Fold `source` into one element starting from `seed`
pub fn fold<S, R, F>(source: S, seed: R, f: F) -> Fold<S, R, Infallible<F>>
where
    S: Source,
    F: Fn(R, S::Item) -> R + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    Fold::new(source, seed, Infallible(f))
}

/// Fold `source` with a fallible combine function
pub fn try_fold<S, R, F>(source: S, seed: R, f: F) -> Fold<S, R, Fallible<F>>
where
    S: Source,
    F: Fn(R, S::Item) -> StreamResult<R> + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    Fold::new(source, seed, Fallible(f))
}

/// Sum a numeric `source` under `policy`
pub fn sum<S>(source: S, policy: OverflowPolicy) -> Sum<S>
where
    S: Source,
    S::Item: Summable,
{
    Fold::new(source, <S::Item as Summable>::ZERO, Summation::new(policy))
}
