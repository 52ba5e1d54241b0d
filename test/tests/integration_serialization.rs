//! Round-trip fidelity of the bridge wire format: a serialized
//! (event, channel, source) record deserializes to an observationally
//! equal event.

use std::net::SocketAddr;

use manifold_bridge::{ByteReader, ByteWriter, Record, Wire};
use manifold_core::{Event, Value};

fn source() -> SocketAddr {
    "127.0.0.1:64000".parse().unwrap()
}

fn roundtrip(record: &Record) -> Record {
    let mut writer = ByteWriter::new();
    record.ser(&mut writer);
    let bytes = writer.to_bytes();
    let mut reader = ByteReader::new(&bytes);
    let decoded = Record::de(&mut reader).expect("record decodes");
    assert!(reader.is_empty(), "record must consume exactly its bytes");
    decoded
}

#[test]
fn every_value_shape_survives_the_wire() {
    let event = Event::new("kitchen-sink")
        .with_arg(Value::Null)
        .with_arg(false)
        .with_arg(i64::MIN)
        .with_arg(u64::MAX)
        .with_arg(2.25f64)
        .with_arg("text payload")
        .with_arg(vec![0u8, 127, 255])
        .with_arg(Value::List(vec![
            Value::Int(1),
            Value::List(vec![Value::Str("nested".to_string())]),
        ]))
        .with_kwarg("encoding", "utf-8")
        .with_kwarg("attempt", 3u64);

    let decoded = roundtrip(&Record {
        event: event.clone(),
        channel: "irc:privmsg".to_string(),
        source: source(),
    });

    assert!(decoded.event.same_payload(&event));
    assert_eq!(decoded.channel, "irc:privmsg");
    assert_eq!(decoded.source, source());
}

#[test]
fn empty_event_is_the_smallest_record() {
    let decoded = roundtrip(&Record {
        event: Event::new("tick"),
        channel: "clock".to_string(),
        source: source(),
    });
    assert_eq!(decoded.event.name(), "tick");
    assert!(decoded.event.args().is_empty());
    assert!(decoded.event.kwargs().is_empty());
}

#[test]
fn ipv6_sources_roundtrip() {
    let source: SocketAddr = "[::1]:8000".parse().unwrap();
    let decoded = roundtrip(&Record {
        event: Event::new("tick"),
        channel: "clock".to_string(),
        source,
    });
    assert_eq!(decoded.source, source);
}

#[test]
fn a_datagram_of_records_decodes_in_order() {
    let mut writer = ByteWriter::new();
    for index in 0..10i64 {
        Record {
            event: Event::new("seq").with_arg(index),
            channel: "stream".to_string(),
            source: source(),
        }
        .ser(&mut writer);
    }

    let bytes = writer.to_bytes();
    let mut reader = ByteReader::new(&bytes);
    let mut expected = 0i64;
    while !reader.is_empty() {
        let record = Record::de(&mut reader).expect("decodes");
        assert_eq!(record.event.arg(0), Some(&Value::Int(expected)));
        expected += 1;
    }
    assert_eq!(expected, 10);
}
