use std::{
    io::ErrorKind,
    net::{SocketAddr, UdpSocket},
    rc::Rc,
};

use log::warn;

use manifold_core::{
    Component, Emitter, FilterOutcome, Handler, Manager, Registration, Value,
};

use crate::{
    error::SocketError,
    events::{self, datagram_read_event, error_event, WRITE},
};

/// Contains Config properties which will be used by a UdpEndpoint
#[derive(Clone)]
pub struct UdpEndpointConfig {
    /// Size of the receive buffer; datagrams longer than this are
    /// truncated by the OS.
    pub read_buffer_size: usize,
}

impl Default for UdpEndpointConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: 8192,
        }
    }
}

/// Symmetric non-blocking datagram reactor; server and client are the
/// same machine.
///
/// Incoming datagrams become `read{host, port, data}` events; the
/// `<prefix>:write` filter resolves `[host, port, data]` to a `send_to`.
/// There are no `connect`/`disconnect` events, since a datagram socket
/// has no connection to lose.
pub struct UdpEndpoint {
    socket: Rc<UdpSocket>,
    local_addr: SocketAddr,
    prefix: String,
    emitter: Emitter,
    registration: Option<Registration>,
    read_buf: Vec<u8>,
}

impl UdpEndpoint {
    /// Binds the datagram socket (use port 0 for an ephemeral port) and
    /// registers the write filter.
    ///
    /// # Errors
    ///
    /// [`SocketError::Bind`]/[`SocketError::Configure`] when the socket
    /// cannot be created.
    pub fn bind(
        manager: &mut Manager,
        prefix: impl Into<String>,
        addr: SocketAddr,
        config: UdpEndpointConfig,
    ) -> Result<Self, SocketError> {
        let socket = UdpSocket::bind(addr).map_err(|error| SocketError::Bind {
            addr: addr.to_string(),
            message: error.to_string(),
        })?;
        socket
            .set_nonblocking(true)
            .map_err(|error| SocketError::Configure {
                message: error.to_string(),
            })?;
        let local_addr = socket.local_addr().map_err(|error| SocketError::Configure {
            message: error.to_string(),
        })?;

        let mut endpoint = Self {
            socket: Rc::new(socket),
            local_addr,
            prefix: prefix.into(),
            emitter: manager.emitter(),
            registration: None,
            read_buf: vec![0; config.read_buffer_size],
        };
        let registration = Registration::attach(manager, &mut endpoint)?;
        endpoint.registration = Some(registration);
        Ok(endpoint)
    }

    /// The bound address; reports the real port after an ephemeral bind.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// One non-blocking receive drain. Each datagram becomes one
    /// `read{host, port, data}` event. Returns the number of events
    /// emitted.
    pub fn poll(&mut self) -> usize {
        let mut emitted = 0;
        loop {
            match self.socket.recv_from(&mut self.read_buf) {
                Ok((count, origin)) => {
                    events::emit(
                        &self.emitter,
                        &self.prefix,
                        events::READ,
                        datagram_read_event(
                            &origin.ip().to_string(),
                            origin.port(),
                            self.read_buf[..count].to_vec(),
                        ),
                    );
                    emitted += 1;
                }
                Err(error) if error.kind() == ErrorKind::WouldBlock => break,
                Err(error) => {
                    events::emit(
                        &self.emitter,
                        &self.prefix,
                        events::ERROR,
                        error_event(format!("receive failed: {}", error)),
                    );
                    emitted += 1;
                    break;
                }
            }
        }
        emitted
    }

    /// Removes the write filter from the manager.
    pub fn detach(&mut self, manager: &mut Manager) {
        if let Some(mut registration) = self.registration.take() {
            registration.detach(manager);
        }
    }
}

impl Component for UdpEndpoint {
    fn name(&self) -> &str {
        &self.prefix
    }

    fn channel_prefix(&self) -> Option<&str> {
        Some(&self.prefix)
    }

    fn handlers(&mut self) -> Vec<Handler> {
        let socket = Rc::clone(&self.socket);
        let emitter = self.emitter.clone();
        let prefix = self.prefix.clone();

        vec![Handler::filter(WRITE, move |event| {
            let Some(host) = event.arg(0).and_then(Value::as_str) else {
                warn!("datagram write event without a host");
                return FilterOutcome::Halt;
            };
            let Some(port) = event.arg(1).and_then(Value::as_uint) else {
                warn!("datagram write event without a port");
                return FilterOutcome::Halt;
            };
            let Some(data) = event.arg(2).and_then(Value::as_bytes) else {
                warn!("datagram write event without a data payload");
                return FilterOutcome::Halt;
            };
            if let Err(error) = socket.send_to(data, (host, port as u16)) {
                events::emit(
                    &emitter,
                    &prefix,
                    events::ERROR,
                    error_event(format!("send to {}:{} failed: {}", host, port, error)),
                );
            }
            FilterOutcome::Halt
        })]
    }
}
