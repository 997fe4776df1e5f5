//! Core error types — transport, store, session, and commissioning failures.

use std::time::Duration;

use stower_protocol::ProtocolError;

/// Failure raised by a transport-port implementation.
///
/// Adapters box their platform error (btleplug, test fakes) behind this
/// type; the core logs it but never matches on transport internals.
#[derive(Debug, thiserror::Error)]
#[error("{context}")]
pub struct TransportError {
    context: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TransportError {
    /// Wrap a platform error with a short context line.
    pub fn new(
        context: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            context: context.into(),
            source: Some(source.into()),
        }
    }

    /// A transport failure with no underlying platform error.
    pub fn message(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            source: None,
        }
    }
}

/// Failure raised by a file-index store implementation.
#[derive(Debug, thiserror::Error)]
#[error("{context}")]
pub struct StoreError {
    context: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StoreError {
    /// Wrap an underlying error with a short context line.
    pub fn new(
        context: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            context: context.into(),
            source: Some(source.into()),
        }
    }

    /// A store failure with no underlying error.
    pub fn message(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            source: None,
        }
    }
}

/// Errors raised by a device session and the transfer engine.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The transport rejected a command-characteristic write.
    #[error("command write rejected")]
    CommandWriteFailed(#[source] TransportError),

    /// No notification chunk arrived within the allowed wait.
    #[error("no response chunk within {0:?}")]
    TransferTimeout(Duration),

    /// The session and its notification queue have been closed.
    #[error("session closed")]
    SessionClosed,

    /// A transport operation other than a command write failed.
    #[error("transport failure")]
    Transport(#[from] TransportError),

    /// A wire payload failed to decode.
    #[error("malformed wire payload")]
    Protocol(#[from] ProtocolError),

    /// The file-index store failed.
    #[error("file index store failure")]
    Index(#[from] StoreError),
}

/// Commissioning failures, one variant per user-reportable stage.
#[derive(Debug, thiserror::Error)]
pub enum CommissionError {
    /// Connecting to the peripheral failed.
    #[error("could not connect to the device")]
    ConnectionFailed(#[source] TransportError),

    /// Authentication, enrollment, or the telemetry readout failed after
    /// the connection was up.
    #[error("device refused commissioning")]
    AuthenticationFailed(#[source] SessionError),
}
