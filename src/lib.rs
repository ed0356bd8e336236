//! rs2-flow: a pull-based, backpressure-aware publisher/subscriber protocol.
//!
//! A [`Source`] delivers elements to a [`Sink`] only within the demand the
//! sink has requested through its [`Subscription`]. Operators such as
//! [`SourceExt::map`], [`SourceExt::fold`] and [`SourceExt::sum`] are sources
//! themselves, so chains compose without breaking that contract.
//!
//! ```
//! use rs2_flow::*;
//!
//! let sink = RecordingSink::new(DemandPolicy::Batched(2));
//! let recording = sink.recording();
//!
//! from_iter(vec![1, 2, 3, 4, 5])
//!     .map(|x: i32| x * 10)
//!     .sum()
//!     .subscribe_with(sink);
//!
//! assert_eq!(recording.items(), vec![150]);
//! assert_eq!(recording.completions(), 1);
//! ```

pub mod error;
pub mod sink;
pub mod source;
pub mod subscription;

pub mod sequence;
pub mod serialize;

pub mod operators;
pub mod sinks;

pub mod bridge;
pub mod pipe;
pub mod stream_configuration;

pub use error::{StreamError, StreamResult, Violation};
pub use sink::{BoxSink, Sink};
pub use source::{BoxSource, Source, SourceExt};
pub use subscription::{CancelledSubscription, Demand, Subscription, SubscriptionRef, UNBOUNDED};

pub use sequence::{empty, from_iter, from_producer, try_from_iter, IterProducer, Producer, TryIterProducer};
pub use serialize::SerializedSink;

pub use operators::{Fallible, Fold, Infallible, Map, Sum, Summable};
pub use sinks::{Event, FacadeLogger, LogSink, MemoryLogger, Recording, RecordingSink, SignalLogger};

pub use bridge::{from_stream, into_stream, into_stream_with_config, try_from_stream, RS2Stream, StreamSource};
pub use stream_configuration::{DemandPolicy, FlowConfig, OverflowPolicy};
