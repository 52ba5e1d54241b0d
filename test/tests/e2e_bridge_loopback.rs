//! Two managers bridged over UDP on loopback: delivery, source
//! stamping, and exactly-once semantics.

use std::time::Duration;

use manifold_bridge::{Bridge, BridgeConfig};
use manifold_core::{Event, Handler, Manager, Value};
use manifold_test::{pump_until, Recorder};

fn loopback_bridge() -> Bridge {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = BridgeConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        ..BridgeConfig::default()
    };
    Bridge::bind(config).expect("loopback bind")
}

#[test]
fn event_crosses_the_bridge_exactly_once_with_its_source() {
    let mut sender_manager = Manager::new();
    let mut receiver_manager = Manager::new();

    // the sending side needs its own listener or the flush drops the event
    sender_manager
        .register(Handler::listener("metrics", |_| None))
        .unwrap();
    let recorder = Recorder::attach(&mut receiver_manager, "metrics");

    let mut sender = loopback_bridge();
    let mut receiver = loopback_bridge();
    sender.add_peer(receiver.local_addr());

    sender_manager.push(
        Event::new("sample").with_arg(42i64).with_kwarg("unit", "ms"),
        "metrics",
    );
    sender.flush(&mut sender_manager);

    let reached = pump_until(
        || {
            receiver.poll(&mut receiver_manager);
            recorder.count() >= 1
        },
        100,
        Duration::from_millis(5),
    );
    assert!(reached);

    // keep polling: the record must not arrive a second time
    pump_until(
        || {
            receiver.poll(&mut receiver_manager);
            false
        },
        10,
        Duration::from_millis(2),
    );

    let events = recorder.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name(), "sample");
    assert_eq!(events[0].arg(0), Some(&Value::Int(42)));
    assert_eq!(
        events[0].kwarg("unit"),
        Some(&Value::Str("ms".to_string()))
    );
    assert_eq!(events[0].source(), Some(sender.local_addr()));
}

#[test]
fn replies_flow_back_over_the_learned_peer() {
    let mut left_manager = Manager::new();
    let mut right_manager = Manager::new();

    let mut left = loopback_bridge();
    let mut right = loopback_bridge();
    left.add_peer(right.local_addr());

    // right answers each ping with a locally queued pong, which its own
    // bridge flush then fans back out over the peer it learned
    let right_emitter = right_manager.emitter();
    right_manager
        .register(Handler::listener("ping", move |_| {
            right_emitter
                .push(Event::new("pong"), "pong")
                .expect("queue open");
            None
        }))
        .unwrap();
    right_manager
        .register(Handler::listener("pong", |_| None))
        .unwrap();
    left_manager
        .register(Handler::listener("ping", |_| None))
        .unwrap();
    let pong_recorder = Recorder::attach(&mut left_manager, "pong");

    left_manager.push(Event::new("ping"), "ping");
    left.flush(&mut left_manager);

    let reached = pump_until(
        || {
            right.poll(&mut right_manager);
            right.flush(&mut right_manager);
            left.poll(&mut left_manager);
            pong_recorder.count() >= 1
        },
        100,
        Duration::from_millis(5),
    );
    assert!(reached);
    assert_eq!(pong_recorder.count(), 1);
    assert_eq!(
        pong_recorder.events()[0].source(),
        Some(right.local_addr())
    );
}

#[test]
fn many_small_events_survive_batching() {
    let mut sender_manager = Manager::new();
    let mut receiver_manager = Manager::new();

    sender_manager
        .register(Handler::listener("firehose", |_| None))
        .unwrap();
    let recorder = Recorder::attach(&mut receiver_manager, "firehose");

    let mut sender = loopback_bridge();
    let mut receiver = loopback_bridge();
    sender.add_peer(receiver.local_addr());

    // far more than one datagram's worth of records
    const COUNT: usize = 500;
    for index in 0..COUNT {
        sender_manager.push(
            Event::new("drop").with_arg(index as u64),
            "firehose",
        );
    }
    sender.flush(&mut sender_manager);

    let reached = pump_until(
        || {
            receiver.poll(&mut receiver_manager);
            recorder.count() >= COUNT
        },
        200,
        Duration::from_millis(5),
    );
    assert!(reached);
    assert_eq!(recorder.count(), COUNT);

    // order within the stream is preserved by FIFO drain + in-order packing
    let events = recorder.events();
    for (index, event) in events.iter().enumerate() {
        assert_eq!(event.arg(0), Some(&Value::Uint(index as u64)));
    }
}
