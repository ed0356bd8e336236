//! Error types and handling for rs2-flow
//!
//! Every failure that can travel down a subscription is a [`StreamError`].
//! Errors are delivered exactly once through `Sink::on_error` and end the
//! subscription; the core never retries.

use std::fmt;

/// Illegal signal ordering or argument detected at a protocol boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// `request(0)` was called
    NonPositiveRequest,
    /// A sink received a second `on_subscribe`
    DuplicateSubscription,
    /// A data or terminal signal arrived before `on_subscribe`
    SignalBeforeSubscribe,
    /// A signal arrived after `on_complete`/`on_error`
    SignalAfterTerminal,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::NonPositiveRequest => write!(f, "request count must be positive"),
            Violation::DuplicateSubscription => write!(f, "sink was subscribed twice"),
            Violation::SignalBeforeSubscribe => write!(f, "signal delivered before on_subscribe"),
            Violation::SignalAfterTerminal => write!(f, "signal delivered after terminal signal"),
        }
    }
}

/// Main error type for rs2-flow operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StreamError {
    /// A party broke the publisher/subscriber contract
    #[error("Protocol violation: {0}")]
    ProtocolViolation(Violation),
    /// The underlying provider could not produce the next element
    #[error("Production failed: {0}")]
    Production(String),
    /// A map or fold function failed
    #[error("Transform failed: {0}")]
    Transform(String),
    /// Numeric sum overflowed under `OverflowPolicy::Fail`
    #[error("Numeric overflow in sum")]
    Overflow,
    /// No async runtime was available to drive a bridged source
    #[error("Runtime unavailable: {0}")]
    Runtime(String),
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl StreamError {
    pub fn production(cause: impl fmt::Display) -> Self {
        StreamError::Production(cause.to_string())
    }

    pub fn transform(cause: impl fmt::Display) -> Self {
        StreamError::Transform(cause.to_string())
    }

    /// True for errors caused by illegal signalling rather than by data.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, StreamError::ProtocolViolation(_))
    }
}

impl From<Violation> for StreamError {
    fn from(violation: Violation) -> Self {
        StreamError::ProtocolViolation(violation)
    }
}

impl From<serde_json::Error> for StreamError {
    fn from(err: serde_json::Error) -> Self {
        StreamError::Config(err.to_string())
    }
}

/// Result type for rs2-flow operations
pub type StreamResult<T> = Result<T, StreamError>;
