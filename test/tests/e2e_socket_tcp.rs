//! TCP reactor scenarios: an ephemeral-port server and a client on one
//! manager, exchanging connect/read/write/disconnect events.

use std::time::Duration;

use manifold_core::{Manager, Value};
use manifold_socket::{
    server_write_event, write_event, ConnKey, ConnectionStatus, TcpClient, TcpClientConfig,
    TcpServer, TcpServerConfig,
};
use manifold_test::{pump_until, Recorder};

struct TcpPair {
    manager: Manager,
    server: TcpServer,
    client: TcpClient,
}

fn connected_pair() -> (TcpPair, Recorder, Recorder) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut manager = Manager::new();
    let mut server = TcpServer::bind(
        &mut manager,
        "srv",
        "127.0.0.1:0".parse().unwrap(),
        TcpServerConfig::default(),
    )
    .expect("ephemeral bind");
    let mut client = TcpClient::new(&mut manager, "cli", TcpClientConfig::default())
        .expect("client registers");

    let srv_connect = Recorder::attach(&mut manager, "srv:connect");
    let cli_connect = Recorder::attach(&mut manager, "cli:connect");

    let port = server.local_addr().port();
    client.open("127.0.0.1", port);
    assert_eq!(client.status(), ConnectionStatus::Connected);

    let reached = pump_until(
        || {
            server.poll();
            manager.flush();
            srv_connect.count() >= 1 && cli_connect.count() >= 1
        },
        200,
        Duration::from_millis(5),
    );
    assert!(reached, "both sides must observe the connect");

    (
        TcpPair {
            manager,
            server,
            client,
        },
        srv_connect,
        cli_connect,
    )
}

#[test]
fn both_sides_emit_exactly_one_connect() {
    let (mut pair, srv_connect, cli_connect) = connected_pair();

    // a few extra cycles must not produce duplicates
    pump_until(
        || {
            pair.server.poll();
            pair.client.poll();
            pair.manager.flush();
            false
        },
        10,
        Duration::from_millis(2),
    );

    assert_eq!(srv_connect.count(), 1);
    assert_eq!(cli_connect.count(), 1);

    // server-side connect carries [conn, host, port]
    let event = &srv_connect.events()[0];
    assert!(event.arg(0).and_then(Value::as_uint).is_some());
    assert_eq!(
        event.arg(1).and_then(Value::as_str),
        Some("127.0.0.1")
    );
}

#[test]
fn client_write_reaches_the_server_within_one_poll_cycle() {
    let (mut pair, _srv_connect, _cli_connect) = connected_pair();
    let srv_read = Recorder::attach(&mut pair.manager, "srv:read");

    pair.manager.push(write_event(b"foo".to_vec()), "cli:write");
    // this flush runs the client's write filter, which performs the send
    pair.manager.flush();

    let reached = pump_until(
        || {
            pair.server.poll();
            pair.manager.flush();
            srv_read.count() >= 1
        },
        200,
        Duration::from_millis(5),
    );
    assert!(reached);

    let events = srv_read.events();
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].arg(1).and_then(Value::as_bytes),
        Some(&b"foo"[..])
    );
}

#[test]
fn server_write_reaches_the_client() {
    let (mut pair, srv_connect, _cli_connect) = connected_pair();
    let cli_read = Recorder::attach(&mut pair.manager, "cli:read");

    let conn = ConnKey::from_u64(
        srv_connect.events()[0]
            .arg(0)
            .and_then(Value::as_uint)
            .expect("connect carries the key"),
    );

    pair.manager
        .push(server_write_event(conn, b"bar".to_vec()), "srv:write");
    pair.manager.flush();

    let reached = pump_until(
        || {
            pair.client.poll();
            pair.manager.flush();
            cli_read.count() >= 1
        },
        200,
        Duration::from_millis(5),
    );
    assert!(reached);
    assert_eq!(
        cli_read.events()[0].arg(0).and_then(Value::as_bytes),
        Some(&b"bar"[..])
    );
}

#[test]
fn closing_the_client_disconnects_both_sides() {
    let (mut pair, _srv_connect, _cli_connect) = connected_pair();
    let srv_disconnect = Recorder::attach(&mut pair.manager, "srv:disconnect");
    let cli_disconnect = Recorder::attach(&mut pair.manager, "cli:disconnect");

    pair.client.close();
    assert_eq!(pair.client.status(), ConnectionStatus::Disconnected);

    let reached = pump_until(
        || {
            pair.server.poll();
            pair.manager.flush();
            srv_disconnect.count() >= 1 && cli_disconnect.count() >= 1
        },
        200,
        Duration::from_millis(5),
    );
    assert!(reached);
    assert_eq!(pair.server.connection_count(), 0);
}
