use std::{
    cell::RefCell,
    io::{ErrorKind, Read, Write},
    net::{TcpStream, ToSocketAddrs},
    rc::Rc,
    time::Duration,
};

use log::warn;

use manifold_core::{
    Component, Emitter, FilterOutcome, Handler, Manager, Registration, Value,
};

use crate::{
    error::SocketError,
    events::{
        self, connect_event, disconnect_event, error_event, read_event, WRITE,
    },
};

/// State of one connection attempt. A fresh [`TcpClient::open`] starts a
/// new instance of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

/// Contains Config properties which will be used by a TcpClient
#[derive(Clone)]
pub struct TcpClientConfig {
    /// Bound on the blocking connect wait in [`TcpClient::open`]. The
    /// one permitted blocking wait in the socket layer.
    pub connect_timeout: Duration,
    /// Size of the buffer one `poll` read pass fills.
    pub read_buffer_size: usize,
    /// Disable Nagle's algorithm on new connections.
    pub nodelay: bool,
}

impl Default for TcpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            read_buffer_size: 4096,
            nodelay: true,
        }
    }
}

struct ClientState {
    stream: Option<TcpStream>,
    status: ConnectionStatus,
}

impl ClientState {
    /// Tears the connection down and reports it: `error` (when there is
    /// a message) then `disconnect`, per the failure policy.
    fn fail(&mut self, emitter: &Emitter, prefix: &str, message: Option<String>) {
        if let Some(message) = message {
            events::emit(emitter, prefix, events::ERROR, error_event(message));
        }
        self.stream = None;
        self.status = ConnectionStatus::Disconnected;
        events::emit(emitter, prefix, events::DISCONNECT, disconnect_event());
    }
}

/// Non-blocking TCP client reactor.
///
/// Registers a filter on `<prefix>:write` that performs the actual send;
/// everything the socket does is reported as `connect` / `read` /
/// `error` / `disconnect` events on the prefix. Faults never surface as
/// errors to the driving loop.
pub struct TcpClient {
    state: Rc<RefCell<ClientState>>,
    prefix: String,
    emitter: Emitter,
    registration: Option<Registration>,
    config: TcpClientConfig,
    read_buf: Vec<u8>,
}

impl TcpClient {
    /// Creates the client and registers its write filter with the
    /// manager.
    pub fn new(
        manager: &mut Manager,
        prefix: impl Into<String>,
        config: TcpClientConfig,
    ) -> Result<Self, SocketError> {
        let mut client = Self {
            state: Rc::new(RefCell::new(ClientState {
                stream: None,
                status: ConnectionStatus::Disconnected,
            })),
            prefix: prefix.into(),
            emitter: manager.emitter(),
            registration: None,
            read_buf: vec![0; config.read_buffer_size],
            config,
        };
        let registration = Registration::attach(manager, &mut client)?;
        client.registration = Some(registration);
        Ok(client)
    }

    pub fn status(&self) -> ConnectionStatus {
        self.state.borrow().status
    }

    /// Opens a connection, waiting for readiness up to the configured
    /// timeout. Emits `connect{host, port}` on success; on timeout or
    /// refusal emits `error` then `disconnect` and returns to
    /// `Disconnected`.
    pub fn open(&mut self, host: &str, port: u16) {
        {
            let mut state = self.state.borrow_mut();
            state.stream = None;
            state.status = ConnectionStatus::Connecting;
        }

        let addr = match (host, port).to_socket_addrs() {
            Ok(mut addrs) => addrs.next(),
            Err(error) => {
                self.state.borrow_mut().fail(
                    &self.emitter,
                    &self.prefix,
                    Some(format!("cannot resolve {}:{}: {}", host, port, error)),
                );
                return;
            }
        };
        let Some(addr) = addr else {
            self.state.borrow_mut().fail(
                &self.emitter,
                &self.prefix,
                Some(format!("no addresses for {}:{}", host, port)),
            );
            return;
        };

        match TcpStream::connect_timeout(&addr, self.config.connect_timeout) {
            Ok(stream) => {
                if let Err(error) = stream.set_nonblocking(true) {
                    self.state.borrow_mut().fail(
                        &self.emitter,
                        &self.prefix,
                        Some(format!("cannot configure socket: {}", error)),
                    );
                    return;
                }
                if self.config.nodelay {
                    let _ = stream.set_nodelay(true);
                }
                let mut state = self.state.borrow_mut();
                state.stream = Some(stream);
                state.status = ConnectionStatus::Connected;
                events::emit(
                    &self.emitter,
                    &self.prefix,
                    events::CONNECT,
                    connect_event(host, port),
                );
            }
            Err(error) => {
                self.state.borrow_mut().fail(
                    &self.emitter,
                    &self.prefix,
                    Some(format!("connect to {}:{} failed: {}", host, port, error)),
                );
            }
        }
    }

    /// One non-blocking read pass. Data becomes a `read{data}` event, an
    /// empty read becomes `disconnect`, any other fault becomes `error`
    /// plus `disconnect`. Returns the number of events emitted.
    pub fn poll(&mut self) -> usize {
        let mut state = self.state.borrow_mut();
        let Some(stream) = state.stream.as_mut() else {
            return 0;
        };
        match stream.read(&mut self.read_buf) {
            Ok(0) => {
                state.fail(&self.emitter, &self.prefix, None);
                1
            }
            Ok(count) => {
                events::emit(
                    &self.emitter,
                    &self.prefix,
                    events::READ,
                    read_event(self.read_buf[..count].to_vec()),
                );
                1
            }
            Err(error) if error.kind() == ErrorKind::WouldBlock => 0,
            Err(error) => {
                state.fail(
                    &self.emitter,
                    &self.prefix,
                    Some(format!("read failed: {}", error)),
                );
                2
            }
        }
    }

    /// Drops the connection. Emits `disconnect` when one was open.
    /// Idempotent.
    pub fn close(&mut self) {
        let mut state = self.state.borrow_mut();
        if state.stream.take().is_some() {
            state.status = ConnectionStatus::Disconnected;
            events::emit(
                &self.emitter,
                &self.prefix,
                events::DISCONNECT,
                disconnect_event(),
            );
        } else {
            state.status = ConnectionStatus::Disconnected;
        }
    }

    /// Removes the write filter from the manager.
    pub fn detach(&mut self, manager: &mut Manager) {
        if let Some(mut registration) = self.registration.take() {
            registration.detach(manager);
        }
    }
}

impl Component for TcpClient {
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
            let Some(data) = event.arg(0).and_then(Value::as_bytes) else {
                warn!("write event without a data payload");
                return FilterOutcome::Halt;
            };
            let mut state = state.borrow_mut();
            let Some(stream) = state.stream.as_mut() else {
                events::emit(
                    &emitter,
                    &prefix,
                    events::ERROR,
                    error_event("write on a closed connection"),
                );
                return FilterOutcome::Halt;
            };
            match stream.write(data) {
                Ok(written) if written == data.len() => {}
                Ok(written) => {
                    // no partial-write buffering: a short write tears the
                    // connection down
                    state.fail(
                        &emitter,
                        &prefix,
                        Some(format!("short write: {} of {} bytes", written, data.len())),
                    );
                }
                Err(error) => {
                    state.fail(&emitter, &prefix, Some(format!("write failed: {}", error)));
                }
            }
            FilterOutcome::Halt
        })]
    }
}
