use crate::error::StreamResult;
use crate::operators::Summable;
use crate::source::{BoxSource, SourceExt};
use crate::stream_configuration::OverflowPolicy;
use std::sync::Arc;

/// A Pipe represents a reusable operator chain from one element type to another.
/// It's a function from Source[I] to Source[O].
pub struct Pipe<I, O> {
    f: Arc<dyn Fn(BoxSource<I>) -> BoxSource<O> + Send + Sync + 'static>,
}

impl<I, O> Clone for Pipe<I, O> {
    fn clone(&self) -> Self {
        Pipe {
            f: Arc::clone(&self.f),
        }
    }
}

impl<I, O> Pipe<I, O> {
    /// Create a new pipe from a function
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(BoxSource<I>) -> BoxSource<O> + Send + Sync + 'static,
    {
        Pipe { f: Arc::new(f) }
    }

    /// Apply this pipe to a source
    pub fn apply(&self, input: BoxSource<I>) -> BoxSource<O> {
        (self.f)(input)
    }
}

/// Create a pipe that applies the given function to each element
pub fn map<I, O, F>(f: F) -> Pipe<I, O>
where
    F: Fn(I) -> O + Send + Sync + Clone + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    Pipe::new(move |input| input.map(f.clone()).boxed())
}

/// Create a pipe that applies a fallible function to each element
pub fn try_map<I, O, F>(f: F) -> Pipe<I, O>
where
    F: Fn(I) -> StreamResult<O> + Send + Sync + Clone + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    Pipe::new(move |input| input.try_map(f.clone()).boxed())
}

/// Create a pipe that folds the whole source into one element
pub fn fold<I, R, F>(seed: R, f: F) -> Pipe<I, R>
where
    F: Fn(R, I) -> R + Send + Sync + Clone + 'static,
    I: Send + 'static,
    R: Clone + Send + Sync + 'static,
{
    Pipe::new(move |input| input.fold(seed.clone(), f.clone()).boxed())
}

/// Create a pipe that sums the source under the given overflow policy
pub fn sum<I>(policy: OverflowPolicy) -> Pipe<I, I>
where
    I: Summable,
{
    Pipe::new(move |input| input.sum_with(policy).boxed())
}

/// Compose two pipes together
pub fn compose<I, M, O>(p1: Pipe<I, M>, p2: Pipe<M, O>) -> Pipe<I, O>
where
    I: Send + 'static,
    M: Send + 'static,
    O: Send + 'static,
{
    Pipe::new(move |input| p2.apply(p1.apply(input)))
}

/// Identity pipe that doesn't transform the source
pub fn identity<I>() -> Pipe<I, I>
where
    I: Send + 'static,
{
    Pipe::new(|input| input)
}

/// Extension trait for pipes
pub trait PipeExt<I, O> {
    /// Compose this pipe with another pipe
    fn compose<P>(self, other: Pipe<O, P>) -> Pipe<I, P>
    where
        P: Send + 'static;
}

impl<I, O> PipeExt<I, O> for Pipe<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn compose<P>(self, other: Pipe<O, P>) -> Pipe<I, P>
    where
        P: Send + 'static,
    {
        compose(self, other)
    }
}
