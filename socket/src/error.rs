use thiserror::Error;

use manifold_core::CoreError;

/// Errors that can occur while constructing a socket reactor.
///
/// Everything after construction (connect timeouts, resets, short
/// writes) is reported as `error`/`disconnect` events on the reactor's
/// channels, never as a returned error: a socket fault must not stop the
/// driving loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SocketError {
    /// Failed to bind the listening or datagram socket
    #[error("failed to bind socket on `{addr}`: {message}")]
    Bind { addr: String, message: String },

    /// Failed to switch the socket into non-blocking mode
    #[error("failed to configure socket: {message}")]
    Configure { message: String },

    /// Handler registration failed
    #[error("registration error: {0}")]
    Core(#[from] CoreError),
}
