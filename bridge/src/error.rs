use thiserror::Error;

/// Errors that can occur while encoding or decoding wire records
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// The buffer ended before the value was complete (SECURITY:
    /// truncated or malicious datagram)
    #[error("buffer ended after {position} bytes while reading a value")]
    UnexpectedEnd { position: usize },

    /// Unknown value type tag (SECURITY: potentially malicious datagram)
    #[error("invalid value tag {tag} received (valid range: 0-7). This may indicate a malformed or malicious datagram")]
    InvalidTag { tag: u8 },

    /// A string field did not hold valid UTF-8
    #[error("string field is not valid UTF-8")]
    InvalidUtf8,

    /// A varint ran past its maximum width
    #[error("variable-length integer exceeded 10 bytes")]
    VarintOverflow,

    /// A peer address field did not parse as an IP address
    #[error("invalid peer address `{address}`")]
    InvalidAddress { address: String },
}

/// Errors that can occur during bridge operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// Failed to bind the bridge socket
    #[error("failed to bind bridge socket on `{addr}`: {message}")]
    Bind { addr: String, message: String },

    /// Failed to configure the bridge socket
    #[error("failed to configure bridge socket: {message}")]
    Configure { message: String },

    /// A single serialized event exceeded the whole datagram budget;
    /// that event is dropped, the flush continues
    #[error("serialized event of {size} bytes exceeds the {budget}-byte datagram budget")]
    OversizeEvent { size: usize, budget: usize },

    /// Wire codec error
    #[error("wire error: {0}")]
    Wire(#[from] WireError),
}
