//! A sink that logs every signal through an injected logger.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use super::Demander;
use crate::error::StreamError;
use crate::sink::Sink;
use crate::stream_configuration::{DemandPolicy, FlowConfig};
use crate::subscription::SubscriptionRef;

/// Observability collaborator handed to [`LogSink`].
pub trait SignalLogger: Send + Sync {
    fn log(&self, message: fmt::Arguments<'_>);
}

/// Forwards to the `log` facade under a fixed target and level.
#[derive(Debug, Clone)]
pub struct FacadeLogger {
    target: String,
    level: log::Level,
}

impl FacadeLogger {
    pub fn new(target: impl Into<String>, level: log::Level) -> Self {
        Self {
            target: target.into(),
            level,
        }
    }
}

impl Default for FacadeLogger {
    fn default() -> Self {
        Self::new("rs2_flow::sink", log::Level::Debug)
    }
}

impl SignalLogger for FacadeLogger {
    fn log(&self, message: fmt::Arguments<'_>) {
        log::log!(target: self.target.as_str(), self.level, "{}", message);
    }
}

/// Keeps every logged line in memory.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    lines: Mutex<Vec<String>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl SignalLogger for MemoryLogger {
    fn log(&self, message: fmt::Arguments<'_>) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}

/// Terminal sink writing `on_subscribe`, `on_next: <item>`,
/// `on_error: <error>` and `on_complete` lines.
pub struct LogSink<T> {
    logger: Arc<dyn SignalLogger>,
    demander: Demander,
    subscription: Option<SubscriptionRef>,
    _marker: std::marker::PhantomData<fn(T)>,
}

impl<T> LogSink<T> {
    /// Unbounded consumption.
    pub fn new(logger: Arc<dyn SignalLogger>) -> Self {
        Self::with_policy(logger, DemandPolicy::Unbounded)
    }

    /// Batched consumption in windows of `config.batch_size`.
    pub fn with_config(logger: Arc<dyn SignalLogger>, config: &FlowConfig) -> Self {
        Self::with_policy(logger, DemandPolicy::from(config))
    }

    pub fn with_policy(logger: Arc<dyn SignalLogger>, policy: DemandPolicy) -> Self {
        Self {
            logger,
            demander: Demander::new(policy),
            subscription: None,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T: fmt::Debug> Sink<T> for LogSink<T> {
    fn on_subscribe(&mut self, subscription: SubscriptionRef) {
        self.logger.log(format_args!("on_subscribe"));
        self.subscription = Some(Arc::clone(&subscription));
        if let Some(n) = self.demander.initial() {
            subscription.request(n);
        }
    }

    fn on_next(&mut self, item: T) {
        self.logger.log(format_args!("on_next: {:?}", item));
        if let (Some(n), Some(subscription)) = (self.demander.after_next(), &self.subscription) {
            subscription.request(n);
        }
    }

    fn on_error(&mut self, error: StreamError) {
        self.logger.log(format_args!("on_error: {}", error));
        self.subscription = None;
    }

    fn on_complete(&mut self) {
        self.logger.log(format_args!("on_complete"));
        self.subscription = None;
    }
}
