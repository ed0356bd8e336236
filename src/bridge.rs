//! Bridges between sources and async `futures` streams.
//!
//! [`into_stream`] consumes a source from async code with a bounded demand
//! window; [`from_stream`] exposes async streams as sources whose elements
//! are pulled by a tokio task only while demand is outstanding.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_stream::stream;
use futures_util::stream::{BoxStream, StreamExt};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, Notify};

use crate::error::{StreamError, StreamResult, Violation};
use crate::sink::{BoxSink, Sink};
use crate::source::Source;
use crate::stream_configuration::FlowConfig;
use crate::subscription::{CancelledSubscription, Demand, Subscription, SubscriptionRef};

/// A boxed, heap-allocated async stream
pub type RS2Stream<O> = BoxStream<'static, O>;

enum Bridged<T> {
    Subscribed(SubscriptionRef),
    Next(T),
    Error(StreamError),
    Complete,
}

struct ChannelSink<T> {
    tx: mpsc::UnboundedSender<Bridged<T>>,
}

impl<T: Send> ChannelSink<T> {
    fn send(&self, signal: Bridged<T>) {
        if self.tx.send(signal).is_err() {
            log::trace!("Bridged stream dropped, discarding signal");
        }
    }
}

impl<T: Send> Sink<T> for ChannelSink<T> {
    fn on_subscribe(&mut self, subscription: SubscriptionRef) {
        self.send(Bridged::Subscribed(subscription));
    }

    fn on_next(&mut self, item: T) {
        self.send(Bridged::Next(item));
    }

    fn on_error(&mut self, error: StreamError) {
        self.send(Bridged::Error(error));
    }

    fn on_complete(&mut self) {
        self.send(Bridged::Complete);
    }
}

/// Cancels the held subscription when the stream is dropped early.
struct CancelOnDrop(Option<SubscriptionRef>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(subscription) = self.0.take() {
            subscription.cancel();
        }
    }
}

/// Consume `source` as an async stream.
///
/// The source is subscribed on first poll. `batch` elements are requested up
/// front and another `batch` each time a full batch has been yielded, so
/// outstanding demand never exceeds `batch`. The channel itself is
/// unbounded; the bound on undelivered elements comes from that demand. An
/// upstream error is yielded as the last item. Dropping the stream cancels
/// the subscription.
pub fn into_stream<S>(source: S, batch: u64) -> RS2Stream<StreamResult<S::Item>>
where
    S: Source + 'static,
{
    let batch = batch.max(1);

    stream! {
        let (tx, mut rx) = mpsc::unbounded_channel();
        source.subscribe(Box::new(ChannelSink { tx }));

        let mut guard = CancelOnDrop(None);
        let mut received: u64 = 0;

        while let Some(signal) = rx.recv().await {
            match signal {
                Bridged::Subscribed(subscription) => {
                    guard.0 = Some(Arc::clone(&subscription));
                    subscription.request(batch);
                }
                Bridged::Next(item) => {
                    yield Ok(item);
                    received += 1;
                    if received == batch {
                        received = 0;
                        if let Some(subscription) = &guard.0 {
                            subscription.request(batch);
                        }
                    }
                }
                Bridged::Error(error) => {
                    guard.0 = None;
                    yield Err(error);
                    break;
                }
                Bridged::Complete => {
                    guard.0 = None;
                    break;
                }
            }
        }
    }
    .boxed()
}

/// [`into_stream`] with its demand window taken from `config.batch_size`.
pub fn into_stream_with_config<S>(source: S, config: &FlowConfig) -> RS2Stream<StreamResult<S::Item>>
where
    S: Source + 'static,
{
    into_stream(source, config.batch_size)
}

/// Demand shared between a [`StreamSource`] subscription and its task.
struct TaskSubscription {
    demand: Demand,
    cancelled: AtomicBool,
    bad_request: AtomicBool,
    wake: Notify,
}

impl Subscription for TaskSubscription {
    fn request(&self, n: u64) {
        if n == 0 {
            self.bad_request.store(true, Ordering::Release);
        } else {
            self.demand.add(n);
        }
        self.wake.notify_one();
    }

    fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            self.wake.notify_one();
        }
    }
}

type StreamFactory<T> = dyn Fn() -> RS2Stream<StreamResult<T>> + Send + Sync;

/// Source backed by async streams, one fresh stream per subscription.
///
/// `request` never blocks: it records demand and wakes the delivery task,
/// which polls the stream only while demand is outstanding.
pub struct StreamSource<T> {
    factory: Arc<StreamFactory<T>>,
    handle: Option<Handle>,
}

impl<T> Clone for StreamSource<T> {
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
            handle: self.handle.clone(),
        }
    }
}

impl<T: Send + 'static> StreamSource<T> {
    /// Run delivery tasks on `handle` instead of the caller's runtime.
    pub fn on_handle(mut self, handle: Handle) -> Self {
        self.handle = Some(handle);
        self
    }
}

impl<T: Send + 'static> Source for StreamSource<T> {
    type Item = T;

    fn subscribe(&self, mut sink: BoxSink<T>) {
        let handle = match &self.handle {
            Some(handle) => Ok(handle.clone()),
            None => Handle::try_current(),
        };
        let handle = match handle {
            Ok(handle) => handle,
            Err(error) => {
                log::warn!("No tokio runtime to drive stream source: {}", error);
                sink.on_subscribe(Arc::new(CancelledSubscription));
                sink.on_error(StreamError::Runtime(error.to_string()));
                return;
            }
        };

        let subscription = Arc::new(TaskSubscription {
            demand: Demand::new(),
            cancelled: AtomicBool::new(false),
            bad_request: AtomicBool::new(false),
            wake: Notify::new(),
        });
        sink.on_subscribe(Arc::clone(&subscription) as SubscriptionRef);

        let stream = (self.factory)();
        handle.spawn(deliver(stream, sink, subscription));
    }
}

async fn deliver<T>(
    mut stream: RS2Stream<StreamResult<T>>,
    mut sink: BoxSink<T>,
    subscription: Arc<TaskSubscription>,
) {
    loop {
        if subscription.cancelled.load(Ordering::Acquire) {
            log::debug!("Stream source cancelled, dropping stream");
            return;
        }

        if subscription.bad_request.load(Ordering::Acquire) {
            sink.on_error(Violation::NonPositiveRequest.into());
            return;
        }

        if !subscription.demand.try_consume() {
            subscription.wake.notified().await;
            continue;
        }

        // Demand wakes are absorbed here; a cancel drops the pending poll.
        let next = loop {
            tokio::select! {
                next = stream.next() => break next,
                _ = subscription.wake.notified() => {
                    if subscription.cancelled.load(Ordering::Acquire) {
                        log::debug!("Stream source cancelled while polling, dropping stream");
                        return;
                    }
                }
            }
        };

        if subscription.cancelled.load(Ordering::Acquire) {
            log::debug!("Stream source cancelled, discarding polled element");
            return;
        }

        match next {
            Some(Ok(item)) => sink.on_next(item),
            Some(Err(error)) => {
                sink.on_error(error);
                return;
            }
            None => {
                sink.on_complete();
                return;
            }
        }
    }
}

/// Create a source from a factory of infallible async streams
pub fn from_stream<T, F>(factory: F) -> StreamSource<T>
where
    T: Send + 'static,
    F: Fn() -> RS2Stream<T> + Send + Sync + 'static,
{
    try_from_stream(move || factory().map(Ok).boxed())
}

/// Create a source from a factory of fallible async streams; the first `Err`
/// item terminates the subscription with `on_error`.
pub fn try_from_stream<T, F>(factory: F) -> StreamSource<T>
where
    T: Send + 'static,
    F: Fn() -> RS2Stream<StreamResult<T>> + Send + Sync + 'static,
{
    StreamSource {
        factory: Arc::new(factory),
        handle: None,
    }
}
