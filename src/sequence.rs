//! Finite-sequence sources.
//!
//! A [`Producer`] is the external data provider: it yields the next element,
//! reports exhaustion, or reports a production failure. The sources in this
//! module create one producer per subscription and deliver its elements
//! strictly within the demand the sink has requested.

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{StreamError, StreamResult, Violation};
use crate::sink::BoxSink;
use crate::source::Source;
use crate::subscription::{Demand, Subscription, SubscriptionRef};

/// Pull-based element provider.
pub trait Producer: Send {
    type Item: Send + 'static;

    /// `Ok(None)` signals exhaustion, `Err` a non-recoverable failure.
    fn produce(&mut self) -> StreamResult<Option<Self::Item>>;
}

/// Producer over an infallible iterator.
#[derive(Debug)]
pub struct IterProducer<I> {
    iter: I,
}

impl<I> IterProducer<I> {
    pub fn new(iter: I) -> Self {
        Self { iter }
    }
}

impl<I> Producer for IterProducer<I>
where
    I: Iterator + Send,
    I::Item: Send + 'static,
{
    type Item = I::Item;

    fn produce(&mut self) -> StreamResult<Option<Self::Item>> {
        Ok(self.iter.next())
    }
}

/// Producer over an iterator of results; the first `Err` fails production.
#[derive(Debug)]
pub struct TryIterProducer<I> {
    iter: I,
}

impl<I> TryIterProducer<I> {
    pub fn new(iter: I) -> Self {
        Self { iter }
    }
}

impl<I, T, E> Producer for TryIterProducer<I>
where
    I: Iterator<Item = Result<T, E>> + Send,
    T: Send + 'static,
    E: fmt::Display,
{
    type Item = T;

    fn produce(&mut self) -> StreamResult<Option<T>> {
        self.iter.next().transpose().map_err(StreamError::production)
    }
}

struct EmptyProducer<T>(PhantomData<fn() -> T>);

impl<T: Send + 'static> Producer for EmptyProducer<T> {
    type Item = T;

    fn produce(&mut self) -> StreamResult<Option<T>> {
        Ok(None)
    }
}

/// Source over a cloneable iterable; each subscription iterates a fresh clone.
#[derive(Debug, Clone)]
pub struct FromIter<I> {
    iterable: I,
}

impl<I> Source for FromIter<I>
where
    I: IntoIterator + Clone + Send + Sync + 'static,
    I::IntoIter: Send + 'static,
    I::Item: Send + 'static,
{
    type Item = I::Item;

    fn subscribe(&self, sink: BoxSink<Self::Item>) {
        SequenceSubscription::start(IterProducer::new(self.iterable.clone().into_iter()), sink);
    }
}

/// Source over a cloneable iterable of `Result`s.
#[derive(Debug, Clone)]
pub struct TryFromIter<I> {
    iterable: I,
}

impl<I, T, E> Source for TryFromIter<I>
where
    I: IntoIterator<Item = Result<T, E>> + Clone + Send + Sync + 'static,
    I::IntoIter: Send + 'static,
    T: Send + 'static,
    E: fmt::Display + 'static,
{
    type Item = T;

    fn subscribe(&self, sink: BoxSink<T>) {
        SequenceSubscription::start(TryIterProducer::new(self.iterable.clone().into_iter()), sink);
    }
}

/// Source calling a factory for a fresh producer on every subscription.
#[derive(Clone)]
pub struct FromProducer<F> {
    factory: F,
}

impl<F, P> Source for FromProducer<F>
where
    F: Fn() -> P + Send + Sync,
    P: Producer + 'static,
{
    type Item = P::Item;

    fn subscribe(&self, sink: BoxSink<Self::Item>) {
        SequenceSubscription::start((self.factory)(), sink);
    }
}

/// Source that completes on the first request.
pub struct Empty<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + 'static> Source for Empty<T> {
    type Item = T;

    fn subscribe(&self, sink: BoxSink<T>) {
        SequenceSubscription::start(EmptyProducer(PhantomData), sink);
    }
}

/// Create a source from an iterable
pub fn from_iter<I>(iterable: I) -> FromIter<I>
where
    I: IntoIterator + Clone + Send + Sync + 'static,
{
    FromIter { iterable }
}

/// Create a source from an iterable of results; an `Err` element becomes
/// `on_error(StreamError::Production)` after the elements before it.
pub fn try_from_iter<I>(iterable: I) -> TryFromIter<I>
where
    I: IntoIterator + Clone + Send + Sync + 'static,
{
    TryFromIter { iterable }
}

/// Create a source from a producer factory
pub fn from_producer<F, P>(factory: F) -> FromProducer<F>
where
    F: Fn() -> P + Send + Sync,
    P: Producer + 'static,
{
    FromProducer { factory }
}

pub fn empty<T: Send + 'static>() -> Empty<T> {
    Empty { _marker: PhantomData }
}

struct Emitter<P: Producer> {
    producer: Option<P>,
    sink: Option<BoxSink<P::Item>>,
}

impl<P: Producer> Emitter<P> {
    /// Drop the producer and hand back the sink for its final signal, if any.
    fn release(&mut self) -> Option<BoxSink<P::Item>> {
        self.producer = None;
        self.sink.take()
    }
}

/// Demand-driven delivery of one producer to one sink.
///
/// `request` and `cancel` only record intent and then try to enter the drain
/// loop. The `wip` counter admits a single drainer; callers arriving while a
/// drain is running (re-entrantly from a sink callback or from another
/// thread) bump the counter and leave, and the drainer loops until it has
/// accounted for every such call.
pub(crate) struct SequenceSubscription<P: Producer> {
    demand: Demand,
    wip: AtomicUsize,
    cancelled: AtomicBool,
    bad_request: AtomicBool,
    emitter: Mutex<Emitter<P>>,
}

impl<P> SequenceSubscription<P>
where
    P: Producer + 'static,
{
    pub(crate) fn start(producer: P, sink: BoxSink<P::Item>) {
        let subscription = Arc::new(Self {
            demand: Demand::new(),
            // Held by `start` so nothing is emitted while on_subscribe runs.
            wip: AtomicUsize::new(1),
            cancelled: AtomicBool::new(false),
            bad_request: AtomicBool::new(false),
            emitter: Mutex::new(Emitter {
                producer: Some(producer),
                sink: Some(sink),
            }),
        });

        {
            let mut emitter = subscription.lock();
            if let Some(sink) = emitter.sink.as_mut() {
                sink.on_subscribe(Arc::clone(&subscription) as SubscriptionRef);
            }
        }

        subscription.drain_loop(1);
    }

    fn lock(&self) -> MutexGuard<'_, Emitter<P>> {
        self.emitter.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn drain(&self) {
        if self.wip.fetch_add(1, Ordering::AcqRel) == 0 {
            self.drain_loop(1);
        }
    }

    fn drain_loop(&self, mut missed: usize) {
        loop {
            self.emit();
            let remaining = self.wip.fetch_sub(missed, Ordering::AcqRel) - missed;
            if remaining == 0 {
                break;
            }
            missed = remaining;
        }
    }

    fn emit(&self) {
        let mut guard = self.lock();
        let emitter = &mut *guard;

        loop {
            if emitter.sink.is_none() {
                return;
            }

            if self.cancelled.load(Ordering::Acquire) {
                log::debug!("Sequence subscription cancelled, releasing producer");
                emitter.release();
                return;
            }

            if self.bad_request.load(Ordering::Acquire) {
                log::warn!("Sequence subscription received request(0)");
                if let Some(mut sink) = emitter.release() {
                    sink.on_error(Violation::NonPositiveRequest.into());
                }
                return;
            }

            if !self.demand.try_consume() {
                return;
            }

            let next = match emitter.producer.as_mut() {
                Some(producer) => producer.produce(),
                None => return,
            };

            match next {
                Ok(Some(item)) => {
                    if let Some(sink) = emitter.sink.as_mut() {
                        sink.on_next(item);
                    }
                }
                Ok(None) => {
                    if let Some(mut sink) = emitter.release() {
                        sink.on_complete();
                    }
                    return;
                }
                Err(error) => {
                    log::debug!("Producer failed: {}", error);
                    if let Some(mut sink) = emitter.release() {
                        sink.on_error(error);
                    }
                    return;
                }
            }
        }
    }
}

impl<P> Subscription for SequenceSubscription<P>
where
    P: Producer + 'static,
{
    fn request(&self, n: u64) {
        if n == 0 {
            self.bad_request.store(true, Ordering::Release);
        } else {
            self.demand.add(n);
        }
        self.drain();
    }

    fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            self.demand.clear();
            self.drain();
        }
    }
}
