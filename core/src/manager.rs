use std::{
    net::SocketAddr,
    sync::mpsc::{channel, Receiver, Sender},
};

use log::warn;

use crate::{
    dispatch::Dispatcher,
    error::{CoreError, DispatchError},
    event::Event,
    handler::{Handler, HandlerId},
    registry::{HandlerRegistry, GLOBAL_CHANNEL},
    value::Value,
};

/// Root of the reactor: owns the handler registry and the FIFO event
/// queue, and drives queued (`push`/`flush`) and immediate (`send`)
/// delivery.
///
/// The queue is an mpsc pair: the `Manager` keeps the receiver and is
/// the single consumer (the control flow calling [`flush`](Self::flush));
/// every producer (worker threads, handlers, socket reactors) holds an
/// [`Emitter`] clone of the sender. The `Manager` itself stays on the
/// driving thread; handler closures need not be `Send`.
pub struct Manager {
    registry: HandlerRegistry,
    queue_tx: Sender<Event>,
    queue_rx: Receiver<Event>,
}

impl Manager {
    pub fn new() -> Self {
        let (queue_tx, queue_rx) = channel();
        Self {
            registry: HandlerRegistry::new(),
            queue_tx,
            queue_rx,
        }
    }

    /// Returns a clonable, `Send` handle for queueing events from
    /// handlers and worker threads.
    pub fn emitter(&self) -> Emitter {
        Emitter {
            tx: self.queue_tx.clone(),
        }
    }

    /// Registers a single handler. Components should go through
    /// [`Registration::attach`](crate::Registration::attach) instead.
    pub fn register(&mut self, handler: Handler) -> Result<HandlerId, CoreError> {
        self.registry.add(handler)
    }

    /// Deregisters a handler; a no-op for unknown ids.
    pub fn deregister(&mut self, id: HandlerId) {
        self.registry.remove(id);
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Queues an event on a channel. Delivery happens on the next
    /// [`flush`](Self::flush); nothing is dispatched here.
    pub fn push(&self, event: Event, channel: impl Into<String>) {
        self.push_routed(event, channel.into(), None);
    }

    /// Queues an event addressed to a specific component; it will
    /// dispatch on `<target>:<channel>`.
    pub fn push_to(
        &self,
        event: Event,
        channel: impl Into<String>,
        target: impl Into<String>,
    ) {
        self.push_routed(event, channel.into(), Some(target.into()));
    }

    fn push_routed(&self, mut event: Event, channel: String, target: Option<String>) {
        if channel == GLOBAL_CHANNEL {
            warn!(
                "dropping push of `{}`: the `global` channel is reserved",
                event.name()
            );
            return;
        }
        event.route(channel, target);
        // the receiver lives on self, so this send cannot fail
        let _ = self.queue_tx.send(event);
    }

    /// Dispatches immediately, bypassing the queue.
    ///
    /// # Errors
    ///
    /// Unlike `push`/`flush`, dispatch failures propagate: a caller using
    /// `send` wants synchronous feedback.
    pub fn send(
        &mut self,
        event: Event,
        channel: impl Into<String>,
    ) -> Result<Vec<Value>, DispatchError> {
        self.send_routed(event, channel.into(), None)
    }

    /// Immediate dispatch addressed to a specific component.
    pub fn send_to(
        &mut self,
        event: Event,
        channel: impl Into<String>,
        target: impl Into<String>,
    ) -> Result<Vec<Value>, DispatchError> {
        self.send_routed(event, channel.into(), Some(target.into()))
    }

    fn send_routed(
        &mut self,
        mut event: Event,
        channel: String,
        target: Option<String>,
    ) -> Result<Vec<Value>, DispatchError> {
        event.route(channel, target);
        let dispatch_channel = resolved_channel(&event);
        Dispatcher::dispatch(&mut self.registry, event, &dispatch_channel)
    }

    /// Immediate dispatch of an event delivered by a bridge, stamped with
    /// its remote origin. Bypasses the queue, so a bridged-in event is
    /// never offered back to [`flush_with`](Self::flush_with)'s sink.
    pub fn deliver_remote(
        &mut self,
        mut event: Event,
        channel: impl Into<String>,
        source: SocketAddr,
    ) -> Result<Vec<Value>, DispatchError> {
        event.mark_source(source);
        event.route(channel.into(), None);
        let dispatch_channel = resolved_channel(&event);
        Dispatcher::dispatch(&mut self.registry, event, &dispatch_channel)
    }

    /// Drains the queue once: takes a snapshot of everything queued so
    /// far, then dispatches each entry in FIFO order. Events pushed by
    /// handlers *during* the drain are only visible to the next flush,
    /// bounding the latency of any single call. `UnhandledEvent` from an
    /// entry is swallowed (logged) so one bad event cannot block the
    /// rest. Returns the number of entries dispatched.
    pub fn flush(&mut self) -> usize {
        self.flush_with(|_| {})
    }

    /// [`flush`](Self::flush), additionally offering each locally
    /// originated snapshot entry to `sink` before its dispatch. This is
    /// the bridge's fan-out hook; entries stamped with a remote `source`
    /// are never offered.
    pub fn flush_with<F>(&mut self, mut sink: F) -> usize
    where
        F: FnMut(&Event),
    {
        let mut snapshot = Vec::new();
        while let Ok(event) = self.queue_rx.try_recv() {
            snapshot.push(event);
        }

        let mut dispatched = 0;
        for event in snapshot {
            if event.source().is_none() {
                sink(&event);
            }
            let channel = resolved_channel(&event);
            match Dispatcher::dispatch(&mut self.registry, event, &channel) {
                Ok(_) => dispatched += 1,
                Err(error) => {
                    warn!("flush: dropping event on channel `{}`: {}", channel, error);
                }
            }
        }
        dispatched
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

/// The dispatch channel of a routed event: `<target>:<channel>` for
/// targeted events, the bare channel otherwise.
pub fn resolved_channel(event: &Event) -> String {
    let channel = event.channel().unwrap_or_default();
    match event.target() {
        Some(target) => format!("{}:{}", target, channel),
        None => channel.to_string(),
    }
}

/// Producer-side handle onto a manager's queue. Cheap to clone, `Send`,
/// and the only way worker threads and handlers reach the reactor.
#[derive(Clone)]
pub struct Emitter {
    tx: Sender<Event>,
}

impl Emitter {
    /// Queues an event on a channel.
    ///
    /// # Errors
    ///
    /// [`CoreError::QueueClosed`] once the owning manager is gone.
    pub fn push(&self, event: Event, channel: impl Into<String>) -> Result<(), CoreError> {
        self.push_routed(event, channel.into(), None)
    }

    /// Queues an event addressed to a specific component.
    pub fn push_to(
        &self,
        event: Event,
        channel: impl Into<String>,
        target: impl Into<String>,
    ) -> Result<(), CoreError> {
        self.push_routed(event, channel.into(), Some(target.into()))
    }

    fn push_routed(
        &self,
        mut event: Event,
        channel: String,
        target: Option<String>,
    ) -> Result<(), CoreError> {
        if channel == GLOBAL_CHANNEL {
            warn!(
                "dropping push of `{}`: the `global` channel is reserved",
                event.name()
            );
            return Ok(());
        }
        event.route(channel, target);
        self.tx.send(event).map_err(|_| CoreError::QueueClosed)
    }
}
