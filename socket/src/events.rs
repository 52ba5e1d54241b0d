use log::warn;

use manifold_core::{Emitter, Event};

/// Channel suffixes a socket reactor emits on, under its channel prefix.
/// This is the complete contract a protocol component built on the
/// socket layer may rely on.
pub const CONNECT: &str = "connect";
pub const DISCONNECT: &str = "disconnect";
pub const READ: &str = "read";
/// Filter-only channel: the reactor's own filter performs the actual
/// send and halts the event.
pub const WRITE: &str = "write";
pub const ERROR: &str = "error";

/// Key identifying one accepted connection on a [`TcpServer`](crate::TcpServer).
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct ConnKey(u64);

impl ConnKey {
    pub fn to_u64(&self) -> u64 {
        self.0
    }

    pub fn from_u64(value: u64) -> Self {
        ConnKey(value)
    }
}

// Client-side event shapes

pub fn connect_event(host: &str, port: u16) -> Event {
    Event::new(CONNECT).with_arg(host).with_arg(port)
}

pub fn disconnect_event() -> Event {
    Event::new(DISCONNECT)
}

pub fn read_event(data: Vec<u8>) -> Event {
    Event::new(READ).with_arg(data)
}

pub fn write_event(data: impl Into<Vec<u8>>) -> Event {
    Event::new(WRITE).with_arg(data.into())
}

pub fn error_event(message: impl Into<String>) -> Event {
    Event::new(ERROR).with_arg(message.into())
}

// Server-side event shapes carry the connection key first

pub fn server_connect_event(conn: ConnKey, host: &str, port: u16) -> Event {
    Event::new(CONNECT)
        .with_arg(conn.to_u64())
        .with_arg(host)
        .with_arg(port)
}

pub fn server_disconnect_event(conn: ConnKey) -> Event {
    Event::new(DISCONNECT).with_arg(conn.to_u64())
}

pub fn server_read_event(conn: ConnKey, data: Vec<u8>) -> Event {
    Event::new(READ).with_arg(conn.to_u64()).with_arg(data)
}

pub fn server_write_event(conn: ConnKey, data: impl Into<Vec<u8>>) -> Event {
    Event::new(WRITE).with_arg(conn.to_u64()).with_arg(data.into())
}

pub fn server_error_event(message: impl Into<String>, conn: ConnKey) -> Event {
    Event::new(ERROR)
        .with_arg(message.into())
        .with_arg(conn.to_u64())
}

// Datagram event shapes address by host & port

pub fn datagram_read_event(host: &str, port: u16, data: Vec<u8>) -> Event {
    Event::new(READ)
        .with_arg(host)
        .with_arg(port)
        .with_arg(data)
}

pub fn datagram_write_event(host: &str, port: u16, data: impl Into<Vec<u8>>) -> Event {
    Event::new(WRITE)
        .with_arg(host)
        .with_arg(port)
        .with_arg(data.into())
}

/// Queues a reactor event on `<prefix>:<channel>`. A closed queue only
/// logs: reactors must keep polling even while the manager is torn down.
pub(crate) fn emit(emitter: &Emitter, prefix: &str, channel: &str, event: Event) {
    if let Err(error) = emitter.push(event, format!("{}:{}", prefix, channel)) {
        warn!("socket event on `{}:{}` dropped: {}", prefix, channel, error);
    }
}
