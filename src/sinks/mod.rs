//! Terminal sinks.

pub mod log_sink;
pub mod recording;

pub use log_sink::{FacadeLogger, LogSink, MemoryLogger, SignalLogger};
pub use recording::{Event, Recording, RecordingSink};

use crate::stream_configuration::DemandPolicy;
use crate::subscription::UNBOUNDED;

/// Turns a [`DemandPolicy`] into concrete request calls.
#[derive(Debug, Clone)]
pub(crate) struct Demander {
    policy: DemandPolicy,
    received: u64,
}

impl Demander {
    pub(crate) fn new(policy: DemandPolicy) -> Self {
        Self { policy, received: 0 }
    }

    /// Demand to request from `on_subscribe`.
    pub(crate) fn initial(&self) -> Option<u64> {
        match self.policy {
            DemandPolicy::Unbounded => Some(UNBOUNDED),
            DemandPolicy::Batched(n) => Some(n.max(1)),
            DemandPolicy::Manual => None,
        }
    }

    /// Demand to request after an element arrived.
    pub(crate) fn after_next(&mut self) -> Option<u64> {
        match self.policy {
            DemandPolicy::Batched(n) => {
                self.received += 1;
                let window = n.max(1);
                if self.received >= window {
                    self.received = 0;
                    Some(window)
                } else {
                    None
                }
            }
            DemandPolicy::Unbounded | DemandPolicy::Manual => None,
        }
    }
}
