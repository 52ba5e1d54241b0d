use crate::{
    error::DispatchError,
    event::Event,
    handler::FilterOutcome,
    registry::{ChannelHandlers, HandlerRegistry, GLOBAL_CHANNEL},
    value::Value,
};

/// Walks the handlers matching a channel and applies filter/listener
/// semantics to one event.
///
/// The walk order is: global handlers, then the `<prefix>:*` wildcard
/// set (when the channel is namespaced), then the handlers registered
/// exactly on the channel. Each sub-list runs filters first, listeners
/// second, in stable registration order.
pub struct Dispatcher;

impl Dispatcher {
    /// Dispatches `event` on `channel`, returning the listener results
    /// in walk order.
    ///
    /// # Errors
    ///
    /// [`DispatchError::ReservedChannel`] when `channel` is the literal
    /// `global`; [`DispatchError::UnhandledEvent`] when no handler
    /// anywhere would observe the event.
    pub fn dispatch(
        registry: &mut HandlerRegistry,
        event: Event,
        channel: &str,
    ) -> Result<Vec<Value>, DispatchError> {
        if channel == GLOBAL_CHANNEL {
            return Err(DispatchError::ReservedChannel);
        }
        if !registry.has_any(channel) {
            return Err(DispatchError::UnhandledEvent {
                channel: channel.to_string(),
            });
        }

        let mut current = event;
        let mut results = Vec::new();

        if run_handlers(&mut registry.global, &mut current, &mut results) {
            return Ok(results);
        }
        if let Some(handlers) = registry.wildcard_handlers(channel) {
            if run_handlers(handlers, &mut current, &mut results) {
                return Ok(results);
            }
        }
        if let Some(handlers) = registry.exact_handlers(channel) {
            if run_handlers(handlers, &mut current, &mut results) {
                return Ok(results);
            }
        }

        Ok(results)
    }
}

/// Runs one sub-list; returns `true` when a filter halted the dispatch.
fn run_handlers(
    handlers: &mut ChannelHandlers,
    current: &mut Event,
    results: &mut Vec<Value>,
) -> bool {
    for (_, filter) in handlers.filters.iter_mut() {
        match filter(current) {
            FilterOutcome::Pass => {}
            FilterOutcome::Replace(replacement) => *current = replacement,
            FilterOutcome::Halt => return true,
        }
    }
    for (_, listener) in handlers.listeners.iter_mut() {
        if let Some(value) = listener(current) {
            results.push(value);
        }
    }
    false
}
