use thiserror::Error;

/// Errors raised while dispatching a single event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// No handler is registered on the channel and no global handlers
    /// exist. Recoverable: `flush` and bridge delivery swallow it, a
    /// direct `send` propagates it to the caller.
    #[error("no handler registered for channel `{channel}`")]
    UnhandledEvent { channel: String },

    /// The literal channel `global` is reserved for catch-all handler
    /// registration; events may not be sent to it.
    #[error("events may not be sent to the reserved `global` channel")]
    ReservedChannel,
}

/// Registration & lifecycle errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The handler's channel name is structurally invalid (empty, bare
    /// `*`, whitespace, or an empty prefix/name around `:`). Programmer
    /// error, fatal at registration time.
    #[error("invalid handler channel `{channel}`")]
    InvalidHandler { channel: String },

    /// The manager (queue consumer) has been dropped; nothing will ever
    /// drain this push.
    #[error("event queue is closed")]
    QueueClosed,

    /// The OS refused to spawn the worker thread.
    #[error("failed to spawn worker thread `{name}`: {message}")]
    WorkerSpawn { name: String, message: String },

    /// Dispatch error surfaced through a registration-layer call.
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}
