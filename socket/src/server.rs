use std::{
    cell::RefCell,
    collections::HashMap,
    io::{ErrorKind, Read, Write},
    net::{SocketAddr, TcpListener, TcpStream},
    rc::Rc,
};

use log::warn;

use manifold_core::{
    Component, Emitter, FilterOutcome, Handler, Manager, Registration, Value,
};

use crate::{
    error::SocketError,
    events::{
        self, error_event, server_connect_event, server_disconnect_event, server_error_event,
        server_read_event, ConnKey, WRITE,
    },
};

/// Contains Config properties which will be used by a TcpServer
#[derive(Clone)]
pub struct TcpServerConfig {
    /// Size of the buffer one `poll` read pass fills, per connection.
    pub read_buffer_size: usize,
    /// Disable Nagle's algorithm on accepted connections.
    pub nodelay: bool,
}

impl Default for TcpServerConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: 4096,
            nodelay: true,
        }
    }
}

struct ServerConn {
    stream: TcpStream,
    addr: SocketAddr,
}

struct ServerState {
    connections: HashMap<ConnKey, ServerConn>,
    next_key: u64,
}

/// Non-blocking TCP server reactor.
///
/// The listening socket becoming readable means "accept": `poll` drains
/// pending accepts first (each announced as `connect{conn, host, port}`
/// with a fresh [`ConnKey`]), then runs one read pass per live
/// connection. Writes address connections by key through the
/// `<prefix>:write` filter.
pub struct TcpServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    state: Rc<RefCell<ServerState>>,
    prefix: String,
    emitter: Emitter,
    registration: Option<Registration>,
    config: TcpServerConfig,
    read_buf: Vec<u8>,
}

impl TcpServer {
    /// Binds the listener (use port 0 for an ephemeral port) and
    /// registers the write filter.
    ///
    /// # Errors
    ///
    /// [`SocketError::Bind`]/[`SocketError::Configure`] when the
    /// listening socket cannot be created.
    pub fn bind(
        manager: &mut Manager,
        prefix: impl Into<String>,
        addr: SocketAddr,
        config: TcpServerConfig,
    ) -> Result<Self, SocketError> {
        let listener = TcpListener::bind(addr).map_err(|error| SocketError::Bind {
            addr: addr.to_string(),
            message: error.to_string(),
        })?;
        listener
            .set_nonblocking(true)
            .map_err(|error| SocketError::Configure {
                message: error.to_string(),
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|error| SocketError::Configure {
                message: error.to_string(),
            })?;

        let mut server = Self {
            listener,
            local_addr,
            state: Rc::new(RefCell::new(ServerState {
                connections: HashMap::new(),
                next_key: 1,
            })),
            prefix: prefix.into(),
            emitter: manager.emitter(),
            registration: None,
            read_buf: vec![0; config.read_buffer_size],
            config,
        };
        let registration = Registration::attach(manager, &mut server)?;
        server.registration = Some(registration);
        Ok(server)
    }

    /// The bound address; reports the real port after an ephemeral bind.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn connection_count(&self) -> usize {
        self.state.borrow().connections.len()
    }

    /// One non-blocking pass: accept-drain, then a read pass per live
    /// connection, then a reap of connections that died during the pass.
    /// Returns the number of events emitted.
    pub fn poll(&mut self) -> usize {
        let mut emitted = 0;

        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    if let Err(error) = stream.set_nonblocking(true) {
                        events::emit(
                            &self.emitter,
                            &self.prefix,
                            events::ERROR,
                            error_event(format!("cannot configure accepted socket: {}", error)),
                        );
                        emitted += 1;
                        continue;
                    }
                    if self.config.nodelay {
                        let _ = stream.set_nodelay(true);
                    }
                    let key = {
                        let mut state = self.state.borrow_mut();
                        let key = ConnKey::from_u64(state.next_key);
                        state.next_key += 1;
                        state.connections.insert(key, ServerConn { stream, addr });
                        key
                    };
                    events::emit(
                        &self.emitter,
                        &self.prefix,
                        events::CONNECT,
                        server_connect_event(key, &addr.ip().to_string(), addr.port()),
                    );
                    emitted += 1;
                }
                Err(error) if error.kind() == ErrorKind::WouldBlock => break,
                Err(error) => {
                    events::emit(
                        &self.emitter,
                        &self.prefix,
                        events::ERROR,
                        error_event(format!("accept failed: {}", error)),
                    );
                    emitted += 1;
                    break;
                }
            }
        }

        let mut state = self.state.borrow_mut();
        let mut dead: Vec<(ConnKey, Option<String>)> = Vec::new();
        for (key, conn) in state.connections.iter_mut() {
            match conn.stream.read(&mut self.read_buf) {
                Ok(0) => dead.push((*key, None)),
                Ok(count) => {
                    events::emit(
                        &self.emitter,
                        &self.prefix,
                        events::READ,
                        server_read_event(*key, self.read_buf[..count].to_vec()),
                    );
                    emitted += 1;
                }
                Err(error) if error.kind() == ErrorKind::WouldBlock => {}
                Err(error) => dead.push((*key, Some(format!("read failed: {}", error)))),
            }
        }
        for (key, message) in dead {
            state.connections.remove(&key);
            if let Some(message) = message {
                events::emit(
                    &self.emitter,
                    &self.prefix,
                    events::ERROR,
                    server_error_event(message, key),
                );
                emitted += 1;
            }
            events::emit(
                &self.emitter,
                &self.prefix,
                events::DISCONNECT,
                server_disconnect_event(key),
            );
            emitted += 1;
        }

        emitted
    }

    /// Drops one connection, announcing its `disconnect`. A no-op for
    /// unknown keys.
    pub fn close(&mut self, key: ConnKey) {
        let removed = self.state.borrow_mut().connections.remove(&key).is_some();
        if removed {
            events::emit(
                &self.emitter,
                &self.prefix,
                events::DISCONNECT,
                server_disconnect_event(key),
            );
        }
    }

    /// Drops every live connection. The listener stays bound.
    pub fn shutdown(&mut self) {
        let keys: Vec<ConnKey> = self.state.borrow().connections.keys().copied().collect();
        for key in keys {
            self.close(key);
        }
    }

    /// Removes the write filter from the manager.
    pub fn detach(&mut self, manager: &mut Manager) {
        if let Some(mut registration) = self.registration.take() {
            registration.detach(manager);
        }
    }
}

impl Component for TcpServer {
    fn name(&self) -> &str {
        &self.prefix
    }

    fn channel_prefix(&self) -> Option<&str> {
        Some(&self.prefix)
    }

    fn handlers(&mut self) -> Vec<Handler> {
        let state = Rc::clone(&self.state);
        let emitter = self.emitter.clone();
        let prefix = self.prefix.clone();

        vec![Handler::filter(WRITE, move |event| {
            let Some(key) = event.arg(0).and_then(Value::as_uint).map(ConnKey::from_u64)
            else {
                warn!("server write event without a connection key");
                return FilterOutcome::Halt;
            };
            let Some(data) = event.arg(1).and_then(Value::as_bytes) else {
                warn!("server write event without a data payload");
                return FilterOutcome::Halt;
            };

            let mut state = state.borrow_mut();
            let Some(conn) = state.connections.get_mut(&key) else {
                events::emit(
                    &emitter,
                    &prefix,
                    events::ERROR,
                    server_error_event("write to an unknown connection", key),
                );
                return FilterOutcome::Halt;
            };
            let failure = match conn.stream.write(data) {
                Ok(written) if written == data.len() => None,
                Ok(written) => Some(format!("short write: {} of {} bytes", written, data.len())),
                Err(error) => Some(format!("write failed: {}", error)),
            };
            if let Some(message) = failure {
                state.connections.remove(&key);
                events::emit(
                    &emitter,
                    &prefix,
                    events::ERROR,
                    server_error_event(message, key),
                );
                events::emit(
                    &emitter,
                    &prefix,
                    events::DISCONNECT,
                    server_disconnect_event(key),
                );
            }
            FilterOutcome::Halt
        })]
    }
}
