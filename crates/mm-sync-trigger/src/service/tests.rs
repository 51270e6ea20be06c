//! Tests for TriggerService

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use super::*;
use crate::domain::{
    AccessFilter, Disposition, MessageCodec, NetworkPrefix, ProtocolError, TriggerResult,
    WaitOutcome, WaitPolicy, WallTime,
};
use crate::ports::{Clock, DatagramHandler};
use crate::test_utils::{FakeClock, RecordingEndpoint};

const NOW: f64 = 1_700_000_000.0;

type TestService = TriggerService<FakeClock, RecordingEndpoint<FakeClock>>;

fn make_service() -> (Arc<FakeClock>, RecordingEndpoint<FakeClock>, TestService) {
    let clock = Arc::new(FakeClock::new(WallTime::from_secs_f64(NOW)));
    let endpoint = RecordingEndpoint::new(Arc::clone(&clock));
    let prefix: NetworkPrefix = "192.168.8.0/24".parse().unwrap();
    let service = TriggerService::new(
        AccessFilter::new(vec![prefix]),
        MessageCodec::default(),
        WaitPolicy::default(),
        Arc::clone(&clock),
        endpoint.clone(),
    );
    (clock, endpoint, service)
}

fn lan(last: u8) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 168, 8, last)), 40000)
}

fn loopback() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 40000)
}

#[tokio::test]
async fn test_ping_yields_pong_with_current_time() {
    let (clock, endpoint, service) = make_service();
    clock.advance(std::time::Duration::from_millis(1500));
    let received = clock.wall_now();

    let disposition = service
        .handle_datagram(br#"{"v":1,"type":"ping"}"#, lan(20))
        .await;

    let bytes = match disposition {
        Disposition::Reply(bytes) => bytes,
        other => panic!("expected reply, got {other:?}"),
    };
    let pong = service.codec().decode_pong(&bytes).unwrap();
    assert!(pong.time >= received);
    assert!(endpoint.events().is_empty());
}

#[tokio::test]
async fn test_unauthorized_origin_is_dropped_before_decoding() {
    let (_clock, endpoint, service) = make_service();
    let outsider = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)), 40000);

    // Even garbage is just "unauthorized": nothing is decoded.
    let disposition = service.handle_datagram(b"\xff\xfe", outsider).await;
    assert!(matches!(disposition, Disposition::Unauthorized));

    let disposition = service
        .handle_datagram(br#"{"v":1,"type":"trigger","delay":0,"rpc":{}}"#, outsider)
        .await;
    assert!(matches!(disposition, Disposition::Unauthorized));
    assert!(endpoint.events().is_empty());
}

#[tokio::test]
async fn test_loopback_is_always_permitted() {
    let (_clock, _endpoint, service) = make_service();
    let disposition = service
        .handle_datagram(br#"{"v":1,"type":"ping"}"#, loopback())
        .await;
    assert!(matches!(disposition, Disposition::Reply(_)));
}

#[tokio::test]
async fn test_relative_trigger_fires_after_delay_from_receipt() {
    let (clock, endpoint, service) = make_service();
    let received = clock.wall_now();

    let disposition = service
        .handle_datagram(
            br#"{"v":1,"type":"trigger","delay":0.2,"rpc":{"method":"Player.PlayPause"}}"#,
            lan(10),
        )
        .await;

    match disposition {
        Disposition::Trigger(TriggerResult::Fired { accuracy_ms, delivery }) => {
            assert!(delivery.is_ok());
            assert!((0.0..1.0).contains(&accuracy_ms), "accuracy {accuracy_ms}");
        }
        other => panic!("expected fired trigger, got {other:?}"),
    }
    assert!(clock.wall_now().seconds_since(received) >= 0.2);
    let sent = endpoint.sent_payloads();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].as_bytes(), br#"{"method":"Player.PlayPause"}"#);
}

#[tokio::test]
async fn test_protocol_errors_are_never_answered() {
    let (_clock, endpoint, service) = make_service();
    let cases: [(&[u8], fn(&ProtocolError) -> bool); 4] = [
        (b"not json", |e| matches!(e, ProtocolError::MalformedMessage(_))),
        (br#"{"v":2,"type":"ping"}"#, |e| {
            matches!(e, ProtocolError::UnsupportedVersion { .. })
        }),
        (br#"{"v":1,"type":"shutdown"}"#, |e| {
            matches!(e, ProtocolError::UnknownKind { .. })
        }),
        (br#"{"v":1,"type":"trigger","delay":1}"#, |e| {
            matches!(e, ProtocolError::MissingPayload)
        }),
    ];

    for (data, check) in cases {
        match service.handle_datagram(data, lan(10)).await {
            Disposition::Rejected(e) => assert!(check(&e), "unexpected error {e:?}"),
            other => panic!("expected rejection, got {other:?}"),
        }
    }
    assert!(endpoint.events().is_empty());
}

#[tokio::test]
async fn test_out_of_window_absolute_trigger_is_dropped() {
    let (_clock, endpoint, service) = make_service();
    let text = format!(
        r#"{{"v":1,"type":"trigger","t":{},"rpc":{{}}}}"#,
        NOW + 20.0
    );

    let disposition = service.handle_datagram(text.as_bytes(), lan(10)).await;

    assert!(matches!(
        disposition,
        Disposition::Trigger(TriggerResult::Dropped(WaitOutcome::RejectedFuture))
    ));
    assert!(endpoint.sent_payloads().is_empty());
}

#[tokio::test]
async fn test_bad_message_does_not_affect_next_one() {
    let (_clock, endpoint, service) = make_service();

    let _ = service.handle_datagram(b"{\"v\":1,", lan(10)).await;
    let _ = service.handle_datagram(b"\x00\x01\x02", lan(11)).await;
    let disposition = service
        .handle_datagram(br#"{"v":1,"type":"trigger","delay":0,"rpc":[1]}"#, lan(12))
        .await;

    match disposition {
        Disposition::Trigger(result) => assert!(result.is_success()),
        other => panic!("expected trigger, got {other:?}"),
    }
    assert_eq!(endpoint.sent_payloads().len(), 1);
}

#[tokio::test]
async fn test_endpoint_down_drops_trigger_without_waiting() {
    let (clock, endpoint, service) = make_service();
    endpoint.fail_prepare();

    let disposition = service
        .handle_datagram(br#"{"v":1,"type":"trigger","delay":3,"rpc":{}}"#, lan(10))
        .await;

    assert!(matches!(
        disposition,
        Disposition::Trigger(TriggerResult::PrepareFailed(_))
    ));
    assert!(clock.suspensions().is_empty());
}
