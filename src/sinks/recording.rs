//! A sink that records every signal it observes.
//!
//! The [`Recording`] handle stays with the caller after the sink has been
//! handed to a source, so the caller can inspect what arrived and, under
//! `DemandPolicy::Manual`, drive demand and cancellation itself.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::Demander;
use crate::error::{StreamError, Violation};
use crate::sink::Sink;
use crate::stream_configuration::{DemandPolicy, FlowConfig};
use crate::subscription::{SubscriptionRef, UNBOUNDED};

/// One observed signal or one demand action taken by the sink's owner.
#[derive(Debug, Clone, PartialEq)]
pub enum Event<T> {
    Subscribed,
    Requested(u64),
    Next(T),
    Error(StreamError),
    Complete,
    Cancelled,
}

struct State<T> {
    events: Vec<Event<T>>,
    subscription: Option<SubscriptionRef>,
    subscribed: bool,
    terminated: bool,
    violations: Vec<Violation>,
}

/// Shared view of what a [`RecordingSink`] observed.
pub struct Recording<T> {
    state: Arc<Mutex<State<T>>>,
}

impl<T> Clone for Recording<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> Recording<T> {
    fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                events: Vec::new(),
                subscription: None,
                subscribed: false,
                terminated: false,
                violations: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Request `n` more elements. Ignored once terminated or cancelled.
    pub fn request(&self, n: u64) {
        let subscription = {
            let mut state = self.lock();
            let Some(subscription) = state.subscription.clone() else {
                return;
            };
            state.events.push(Event::Requested(n));
            subscription
        };
        subscription.request(n);
    }

    /// Cancel the subscription. Ignored once terminated or cancelled.
    pub fn cancel(&self) {
        let subscription = {
            let mut state = self.lock();
            let Some(subscription) = state.subscription.take() else {
                return;
            };
            state.events.push(Event::Cancelled);
            subscription
        };
        subscription.cancel();
    }

    pub fn is_subscribed(&self) -> bool {
        self.lock().subscribed
    }

    /// True once `on_error` or `on_complete` arrived.
    pub fn is_terminated(&self) -> bool {
        self.lock().terminated
    }

    pub fn item_count(&self) -> usize {
        self.lock()
            .events
            .iter()
            .filter(|event| matches!(event, Event::Next(_)))
            .count()
    }

    pub fn completions(&self) -> usize {
        self.lock()
            .events
            .iter()
            .filter(|event| matches!(event, Event::Complete))
            .count()
    }

    pub fn errors(&self) -> Vec<StreamError> {
        self.lock()
            .events
            .iter()
            .filter_map(|event| match event {
                Event::Error(error) => Some(error.clone()),
                _ => None,
            })
            .collect()
    }

    /// Total demand requested so far, saturating at `UNBOUNDED`.
    pub fn requested(&self) -> u64 {
        self.lock()
            .events
            .iter()
            .fold(0u64, |total, event| match event {
                Event::Requested(n) => total.saturating_add(*n),
                _ => total,
            })
    }

    /// Signals that broke the protocol and were not recorded as events.
    pub fn violations(&self) -> Vec<Violation> {
        self.lock().violations.clone()
    }

    /// True if no `on_next` ever arrived without outstanding demand.
    pub fn within_demand(&self) -> bool {
        let state = self.lock();
        let mut outstanding: u64 = 0;
        for event in &state.events {
            match event {
                Event::Requested(n) => outstanding = outstanding.saturating_add(*n),
                Event::Next(_) if outstanding == UNBOUNDED => {}
                Event::Next(_) if outstanding == 0 => return false,
                Event::Next(_) => outstanding -= 1,
                _ => {}
            }
        }
        true
    }
}

impl<T: Clone> Recording<T> {
    pub fn events(&self) -> Vec<Event<T>> {
        self.lock().events.clone()
    }

    pub fn items(&self) -> Vec<T> {
        self.lock()
            .events
            .iter()
            .filter_map(|event| match event {
                Event::Next(item) => Some(item.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Terminal sink that records signals into a [`Recording`].
pub struct RecordingSink<T> {
    recording: Recording<T>,
    demander: Demander,
    cancel_after: Option<usize>,
    received: usize,
}

impl<T> RecordingSink<T> {
    pub fn new(policy: DemandPolicy) -> Self {
        Self {
            recording: Recording::new(),
            demander: Demander::new(policy),
            cancel_after: None,
            received: 0,
        }
    }

    /// Batched demand in windows of `config.batch_size`.
    pub fn with_config(config: &FlowConfig) -> Self {
        Self::new(DemandPolicy::from(config))
    }

    pub fn unbounded() -> Self {
        Self::new(DemandPolicy::Unbounded)
    }

    pub fn manual() -> Self {
        Self::new(DemandPolicy::Manual)
    }

    /// Cancel from inside `on_next` once `count` elements have arrived.
    pub fn cancel_after(mut self, count: usize) -> Self {
        self.cancel_after = Some(count);
        self
    }

    pub fn recording(&self) -> Recording<T> {
        self.recording.clone()
    }

    /// Record a signal unless it breaks the protocol. Returns false when the
    /// signal was rejected.
    fn accept(&self, event: Event<T>) -> bool {
        let mut state = self.recording.lock();
        let violation = if !state.subscribed {
            Some(Violation::SignalBeforeSubscribe)
        } else if state.terminated {
            Some(Violation::SignalAfterTerminal)
        } else {
            None
        };

        if let Some(violation) = violation {
            log::warn!("Recording sink rejected a signal: {}", violation);
            state.violations.push(violation);
            return false;
        }

        if matches!(event, Event::Error(_) | Event::Complete) {
            state.terminated = true;
            state.subscription = None;
        }
        state.events.push(event);
        true
    }
}

impl<T: Send> Sink<T> for RecordingSink<T> {
    fn on_subscribe(&mut self, subscription: SubscriptionRef) {
        {
            let mut state = self.recording.lock();
            if state.subscribed {
                state.violations.push(Violation::DuplicateSubscription);
                drop(state);
                subscription.cancel();
                return;
            }
            state.subscribed = true;
            state.subscription = Some(subscription);
            state.events.push(Event::Subscribed);
        }

        if let Some(n) = self.demander.initial() {
            self.recording.request(n);
        }
    }

    fn on_next(&mut self, item: T) {
        if !self.accept(Event::Next(item)) {
            return;
        }
        self.received += 1;

        if self.cancel_after == Some(self.received) {
            self.recording.cancel();
            return;
        }
        if let Some(n) = self.demander.after_next() {
            self.recording.request(n);
        }
    }

    fn on_error(&mut self, error: StreamError) {
        self.accept(Event::Error(error));
    }

    fn on_complete(&mut self) {
        self.accept(Event::Complete);
    }
}
