//! # Manifold Socket
//! Non-blocking socket reactors that turn readiness into reactor events.
//!
//! Each reactor registers a filter on its `<prefix>:write` channel that
//! performs the actual send, and reports everything the socket does as
//! `connect` / `disconnect` / `read` / `error` events under the same
//! prefix. The driving loop interleaves each reactor's `poll` with the
//! manager's `flush`; nothing here blocks except the bounded connect
//! wait in [`TcpClient::open`].

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod client;
mod error;
mod events;
mod server;
mod udp;

pub use client::{ConnectionStatus, TcpClient, TcpClientConfig};
pub use error::SocketError;
pub use events::{
    connect_event, datagram_read_event, datagram_write_event, disconnect_event, error_event,
    read_event, server_connect_event, server_disconnect_event, server_error_event,
    server_read_event, server_write_event, write_event, ConnKey, CONNECT, DISCONNECT, ERROR,
    READ, WRITE,
};
pub use server::{TcpServer, TcpServerConfig};
pub use udp::{UdpEndpoint, UdpEndpointConfig};
