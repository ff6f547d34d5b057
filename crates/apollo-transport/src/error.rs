/// Errors that can occur in the transport layer.
///
/// Every variant is fatal to the one connection that produced it and to
/// nothing else.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding or accepting connections failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// A read or write did not complete within its deadline.
    #[error("{0} deadline exceeded")]
    DeadlineExceeded(&'static str),

    /// An inbound frame was larger than the configured limit.
    #[error("message of {size} bytes exceeds limit of {limit} bytes")]
    MessageTooLarge {
        /// Size of the offending frame.
        size: usize,
        /// The configured maximum.
        limit: usize,
    },

    /// A pump was started twice, or before a reader was attached.
    #[error("pump unavailable: {0}")]
    PumpUnavailable(&'static str),
}
