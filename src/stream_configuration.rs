//! Configuration types for rs2-flow pipelines

use serde::{Deserialize, Serialize};

use crate::error::{StreamError, StreamResult};
use crate::subscription::UNBOUNDED;

/// What a numeric sum does when the running total leaves the type's range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Terminate the subscription with `StreamError::Overflow`
    #[default]
    Fail,
    /// Two's complement wrap-around
    Wrap,
    /// Clamp at the type's minimum or maximum
    Saturate,
}

/// How a terminal sink issues demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemandPolicy {
    /// Request `u64::MAX` once on subscribe
    Unbounded,
    /// Request `n` on subscribe and `n` more every time `n` elements arrived.
    /// A window of zero is treated as one.
    Batched(u64),
    /// Request nothing; the owner drives demand through the recording handle
    Manual,
}

impl Default for DemandPolicy {
    fn default() -> Self {
        DemandPolicy::Unbounded
    }
}

impl From<&FlowConfig> for DemandPolicy {
    /// Batched demand in windows of `config.batch_size`.
    fn from(config: &FlowConfig) -> Self {
        DemandPolicy::Batched(config.batch_size)
    }
}

/// Common configuration for sources, operators and sinks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Demand window for batched sinks and the stream bridge
    pub batch_size: u64,
    /// Upstream window used by fold and sum (`u64::MAX` = unbounded)
    pub fold_prefetch: u64,
    /// Overflow behaviour of `sum`
    pub overflow: OverflowPolicy,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            fold_prefetch: 128,
            overflow: OverflowPolicy::Fail,
        }
    }
}

impl FlowConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the demand window for batched consumers
    pub fn batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the upstream window used by fold and sum
    pub fn fold_prefetch(mut self, prefetch: u64) -> Self {
        self.fold_prefetch = prefetch;
        self
    }

    /// Let fold and sum pull upstream without a window
    pub fn unbounded_prefetch(mut self) -> Self {
        self.fold_prefetch = UNBOUNDED;
        self
    }

    /// Set the overflow behaviour of `sum`
    pub fn overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    /// Parse and validate a JSON configuration document.
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_json(json: &str) -> StreamResult<Self> {
        let config: FlowConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> StreamResult<()> {
        if self.batch_size == 0 {
            return Err(StreamError::Config("batch_size must be positive".to_string()));
        }

        if self.fold_prefetch == 0 {
            return Err(StreamError::Config("fold_prefetch must be positive".to_string()));
        }

        Ok(())
    }
}
