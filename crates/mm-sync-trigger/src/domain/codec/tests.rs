//! Tests for the protocol codec

use super::*;

fn codec() -> MessageCodec {
    MessageCodec::default()
}

fn decode(text: &str) -> Result<IncomingMessage, ProtocolError> {
    codec().decode(text.as_bytes())
}

fn expect_trigger(text: &str) -> Trigger {
    match decode(text) {
        Ok(IncomingMessage::Trigger(trigger)) => trigger,
        other => panic!("expected trigger, got {other:?}"),
    }
}

#[test]
fn test_decode_relative_trigger() {
    let trigger = expect_trigger(r#"{"v":1,"type":"trigger","delay":0.2,"rpc":{"method":"Player.Open"}}"#);
    assert_eq!(trigger.time, TriggerTime::Relative(0.2));
    assert_eq!(trigger.payload.as_bytes(), br#"{"method":"Player.Open"}"#);
}

#[test]
fn test_decode_absolute_trigger() {
    let trigger = expect_trigger(r#"{"v":1,"type":"trigger","t":1700000000.25,"rpc":[1,2]}"#);
    assert_eq!(
        trigger.time,
        TriggerTime::Absolute(WallTime::from_secs_f64(1_700_000_000.25))
    );
    assert_eq!(trigger.payload.as_bytes(), b"[1,2]");
}

#[test]
fn test_payload_is_forwarded_verbatim() {
    // Whitespace, key order and number formatting survive untouched.
    let rpc = r#"{ "jsonrpc" : "2.0", "id":1e0, "params":{"b":1,"a":2} }"#;
    let text = format!(r#"{{"v":1,"type":"trigger","delay":1,"rpc":{rpc}}}"#);
    let trigger = expect_trigger(&text);
    assert_eq!(trigger.payload.as_bytes(), rpc.as_bytes());
}

#[test]
fn test_decode_ping() {
    assert_eq!(decode(r#"{"v":1,"type":"ping"}"#), Ok(IncomingMessage::Ping));
}

#[test]
fn test_unknown_fields_are_ignored() {
    assert_eq!(
        decode(r#"{"v":1,"type":"ping","extra":{"x":[1,2,3]}}"#),
        Ok(IncomingMessage::Ping)
    );
}

#[test]
fn test_oversized_rejected_before_decoding() {
    let mut data = br#"{"v":1,"type":"ping"}"#.to_vec();
    data.resize(DEFAULT_MAX_MESSAGE_BYTES + 1, b' ');
    assert_eq!(
        codec().decode(&data),
        Err(ProtocolError::Oversized {
            size: DEFAULT_MAX_MESSAGE_BYTES + 1,
            max: DEFAULT_MAX_MESSAGE_BYTES,
        })
    );
}

#[test]
fn test_exactly_at_ceiling_is_decoded() {
    let mut data = br#"{"v":1,"type":"ping"}"#.to_vec();
    data.resize(DEFAULT_MAX_MESSAGE_BYTES, b' ');
    assert_eq!(codec().decode(&data), Ok(IncomingMessage::Ping));
}

#[test]
fn test_invalid_utf8_is_malformed() {
    let result = codec().decode(&[0x7b, 0xff, 0xfe, 0x7d]);
    assert!(matches!(result, Err(ProtocolError::MalformedMessage(_))));
}

#[test]
fn test_truncated_json_is_malformed() {
    let result = decode(r#"{"v":1,"type":"trig"#);
    assert!(matches!(result, Err(ProtocolError::MalformedMessage(_))));
}

#[test]
fn test_non_object_is_malformed() {
    for text in [r#"[1,"ping"]"#, "1", r#""ping""#, "null", ""] {
        assert!(
            matches!(decode(text), Err(ProtocolError::MalformedMessage(_))),
            "{text:?} should be malformed"
        );
    }
}

#[test]
fn test_missing_version_rejected() {
    assert_eq!(
        decode(r#"{"type":"ping"}"#),
        Err(ProtocolError::UnsupportedVersion { found: None })
    );
}

#[test]
fn test_wrong_version_rejected_even_when_otherwise_valid() {
    assert_eq!(
        decode(r#"{"v":2,"type":"trigger","delay":0.5,"rpc":{}}"#),
        Err(ProtocolError::UnsupportedVersion {
            found: Some("2".into())
        })
    );
    assert_eq!(
        decode(r#"{"v":"1","type":"ping"}"#),
        Err(ProtocolError::UnsupportedVersion {
            found: Some("\"1\"".into())
        })
    );
}

#[test]
fn test_version_checked_before_field_types() {
    // A badly typed delay must not mask the version error.
    assert_eq!(
        decode(r#"{"v":0,"type":"trigger","delay":"soon","rpc":{}}"#),
        Err(ProtocolError::UnsupportedVersion {
            found: Some("0".into())
        })
    );
}

#[test]
fn test_float_version_one_accepted() {
    assert_eq!(decode(r#"{"v":1.0,"type":"ping"}"#), Ok(IncomingMessage::Ping));
}

#[test]
fn test_unknown_kind_rejected() {
    assert_eq!(
        decode(r#"{"v":1,"type":"reboot"}"#),
        Err(ProtocolError::UnknownKind {
            found: Some("reboot".into())
        })
    );
    assert_eq!(
        decode(r#"{"v":1}"#),
        Err(ProtocolError::UnknownKind { found: None })
    );
    // Pongs are only ever sent, never accepted.
    assert!(matches!(
        decode(r#"{"v":1,"type":"pong","time":1.0}"#),
        Err(ProtocolError::UnknownKind { .. })
    ));
}

#[test]
fn test_trigger_without_payload_rejected() {
    assert_eq!(
        decode(r#"{"v":1,"type":"trigger","delay":0.5}"#),
        Err(ProtocolError::MissingPayload)
    );
}

#[test]
fn test_payload_checked_before_time() {
    assert_eq!(
        decode(r#"{"v":1,"type":"trigger"}"#),
        Err(ProtocolError::MissingPayload)
    );
}

#[test]
fn test_trigger_requires_exactly_one_time_field() {
    assert_eq!(
        decode(r#"{"v":1,"type":"trigger","rpc":{}}"#),
        Err(ProtocolError::MissingOrAmbiguousTime)
    );
    assert_eq!(
        decode(r#"{"v":1,"type":"trigger","delay":1,"t":1700000000,"rpc":{}}"#),
        Err(ProtocolError::MissingOrAmbiguousTime)
    );
}

#[test]
fn test_non_numeric_time_rejected() {
    assert_eq!(
        decode(r#"{"v":1,"type":"trigger","delay":"0.5","rpc":{}}"#),
        Err(ProtocolError::InvalidTime { field: "delay" })
    );
    assert_eq!(
        decode(r#"{"v":1,"type":"trigger","t":[1],"rpc":{}}"#),
        Err(ProtocolError::InvalidTime { field: "t" })
    );
}

#[test]
fn test_delay_range_is_validated() {
    assert!(matches!(
        decode(r#"{"v":1,"type":"trigger","delay":-0.001,"rpc":{}}"#),
        Err(ProtocolError::DelayOutOfRange { .. })
    ));
    assert!(matches!(
        decode(r#"{"v":1,"type":"trigger","delay":10.001,"rpc":{}}"#),
        Err(ProtocolError::DelayOutOfRange { .. })
    ));
    assert_eq!(
        expect_trigger(r#"{"v":1,"type":"trigger","delay":0,"rpc":{}}"#).time,
        TriggerTime::Relative(0.0)
    );
    assert_eq!(
        expect_trigger(r#"{"v":1,"type":"trigger","delay":10,"rpc":{}}"#).time,
        TriggerTime::Relative(10.0)
    );
}

#[test]
fn test_absolute_time_is_not_range_checked_by_codec() {
    // Absolute instants are judged by the scheduler against the live clock.
    let trigger = expect_trigger(r#"{"v":1,"type":"trigger","t":5,"rpc":{}}"#);
    assert_eq!(trigger.time, TriggerTime::Absolute(WallTime::from_secs_f64(5.0)));
}

#[test]
fn test_custom_limits() {
    let codec = MessageCodec::new(CodecLimits {
        max_message_bytes: 16,
        max_delay_secs: 2.0,
    });
    assert!(matches!(
        codec.decode(br#"{"v":1,"type":"ping"}"#),
        Err(ProtocolError::Oversized { size: 21, max: 16 })
    ));

    let codec = MessageCodec::new(CodecLimits {
        max_message_bytes: 2048,
        max_delay_secs: 2.0,
    });
    assert!(matches!(
        codec.decode(br#"{"v":1,"type":"trigger","delay":3,"rpc":{}}"#),
        Err(ProtocolError::DelayOutOfRange { .. })
    ));
}

#[test]
fn test_encode_pong_shape() {
    let bytes = codec().encode_pong(&Pong::new(WallTime::from_secs_f64(1_700_000_000.5)));
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["v"], 1);
    assert_eq!(value["type"], "pong");
    assert_eq!(value["time"].as_f64(), Some(1_700_000_000.5));
}

#[test]
fn test_decode_pong() {
    let pong = codec()
        .decode_pong(br#"{"v":1,"type":"pong","time":12.5}"#)
        .unwrap();
    assert_eq!(pong.time.as_secs_f64(), 12.5);

    assert_eq!(
        codec().decode_pong(br#"{"v":1,"type":"pong"}"#),
        Err(ProtocolError::InvalidTime { field: "time" })
    );
    assert!(matches!(
        codec().decode_pong(br#"{"v":1,"type":"ping"}"#),
        Err(ProtocolError::UnknownKind { .. })
    ));
}

#[test]
fn test_encoded_trigger_decodes_to_same_request() {
    let trigger = Trigger {
        time: TriggerTime::Relative(0.75),
        payload: RelayPayload::new(&br#"{"method":"Player.PlayPause","params":{"playerid":1}}"#[..]),
    };
    let bytes = codec().encode_trigger(&trigger).unwrap();
    assert_eq!(codec().decode(&bytes), Ok(IncomingMessage::Trigger(trigger)));
}

#[test]
fn test_encode_trigger_rejects_non_json_payload() {
    let trigger = Trigger {
        time: TriggerTime::Relative(1.0),
        payload: RelayPayload::new(&b"Player.Open"[..]),
    };
    assert!(matches!(
        codec().encode_trigger(&trigger),
        Err(EncodeError::InvalidPayload(_))
    ));
}

#[test]
fn test_encode_ping_is_decodable() {
    let bytes = codec().encode_ping();
    assert_eq!(codec().decode(&bytes), Ok(IncomingMessage::Ping));
}
