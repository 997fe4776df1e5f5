//! Protocol error types.

/// Errors produced by the wire-level codecs.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A device address string is not six colon-separated hex octets.
    #[error("invalid device address: {0:?}")]
    InvalidAddress(String),

    /// A decode was attempted on a buffer shorter than the record layout.
    #[error("{record} requires at least {expected} bytes, got {actual}")]
    TruncatedBuffer {
        /// Name of the record being decoded.
        record: &'static str,
        /// Minimum length the layout requires.
        expected: usize,
        /// Length of the buffer that was provided.
        actual: usize,
    },

    /// More battery addresses than the enrollment payload has slots for.
    #[error("enrollment payload holds at most 16 batteries, got {count}")]
    TooManyBatteries {
        /// Number of addresses that were supplied.
        count: usize,
    },
}
