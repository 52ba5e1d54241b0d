//! Datagram reactor scenario: two UdpEndpoints on one manager
//! exchanging read/write events.

use std::time::Duration;

use manifold_core::{Manager, Value};
use manifold_socket::{datagram_write_event, UdpEndpoint, UdpEndpointConfig};
use manifold_test::{pump_until, Recorder};

#[test]
fn datagrams_flow_between_endpoints() {
    let mut manager = Manager::new();
    let mut alpha = UdpEndpoint::bind(
        &mut manager,
        "alpha",
        "127.0.0.1:0".parse().unwrap(),
        UdpEndpointConfig::default(),
    )
    .expect("ephemeral bind");
    let mut beta = UdpEndpoint::bind(
        &mut manager,
        "beta",
        "127.0.0.1:0".parse().unwrap(),
        UdpEndpointConfig::default(),
    )
    .expect("ephemeral bind");

    let beta_read = Recorder::attach(&mut manager, "beta:read");

    manager.push(
        datagram_write_event("127.0.0.1", beta.local_addr().port(), b"probe".to_vec()),
        "alpha:write",
    );
    // the flush runs alpha's write filter, which performs the send_to
    manager.flush();

    let reached = pump_until(
        || {
            beta.poll();
            manager.flush();
            beta_read.count() >= 1
        },
        200,
        Duration::from_millis(5),
    );
    assert!(reached);

    let events = beta_read.events();
    assert_eq!(events.len(), 1);
    // read events carry [host, port, data]
    assert_eq!(
        events[0].arg(0).and_then(Value::as_str),
        Some("127.0.0.1")
    );
    assert_eq!(
        events[0].arg(1).and_then(Value::as_uint),
        Some(alpha.local_addr().port() as u64)
    );
    assert_eq!(
        events[0].arg(2).and_then(Value::as_bytes),
        Some(&b"probe"[..])
    );

    alpha.detach(&mut manager);
    beta.detach(&mut manager);
}

#[test]
fn write_to_an_unreachable_port_becomes_an_error_event_at_worst() {
    let mut manager = Manager::new();
    let mut alpha = UdpEndpoint::bind(
        &mut manager,
        "alpha",
        "127.0.0.1:0".parse().unwrap(),
        UdpEndpointConfig::default(),
    )
    .expect("ephemeral bind");
    let _errors = Recorder::attach(&mut manager, "alpha:error");

    // UDP has no connection: the send either vanishes or reports an
    // error event, but the reactor keeps running either way
    manager.push(
        datagram_write_event("127.0.0.1", 9, b"void".to_vec()),
        "alpha:write",
    );
    manager.flush();
    alpha.poll();
    manager.flush();

    alpha.detach(&mut manager);
}
