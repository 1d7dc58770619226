//! Integration tests for inbound command routing.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use chariot_endpoint::protocol::ResourceHandle;
use chariot_endpoint::{
    CommandRouter, Endpoint, EndpointConfig, EndpointError, ManualClock, MemoryTransport, Routed,
    SignalLine, SimulatedPins,
};

type TestEndpoint = Endpoint<MemoryTransport, ManualClock>;

/// Endpoint with `lamp1` registered and a router in front of it.
fn setup() -> (CommandRouter<SimulatedPins>, TestEndpoint, ResourceHandle) {
    let mut ep =
        Endpoint::with_clock(MemoryTransport::new(), ManualClock::new(), EndpointConfig::default())
            .unwrap();
    ep.transport_mut().queue_reply(b"2.01 CREATED<<");
    let lamp = ep.create_resource("lamp1", 32, "title=\"Lamp\"").unwrap();
    ep.transport_mut().clear_output();
    (CommandRouter::new(SimulatedPins::new()), ep, lamp)
}

#[test]
fn test_put_invokes_handler_and_publishes() {
    let (mut router, mut ep, lamp) = setup();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    ep.registry_mut()
        .set_put_handler(lamp, move |params: &str| {
            log.borrow_mut().push(params.to_string());
            Some("done".to_string())
        })
        .unwrap();

    ep.transport_mut().queue_reply(b"2.04 CHANGED<<");
    let routed = router.dispatch(&mut ep, "event/lamp1&value=on").unwrap();

    assert_eq!(
        routed,
        Routed::Put {
            handle: lamp,
            published: Some("done".to_string())
        }
    );
    assert_eq!(*seen.borrow(), vec!["value=on"]);
    assert_eq!(ep.transport().written(), b"rsrc=0%value=done\n");
    assert_eq!(ep.transport().signals(), &[SignalLine::ResourceEvent]);
    // settle delay before publishing
    assert_eq!(ep.clock().elapsed(), Duration::from_millis(250));
}

#[test]
fn test_put_handler_without_result_publishes_nothing() {
    let (mut router, mut ep, lamp) = setup();
    ep.registry_mut()
        .set_put_handler(lamp, |_: &str| -> Option<String> { None })
        .unwrap();

    let routed = router.dispatch(&mut ep, "event/lamp1&value=on").unwrap();
    assert_eq!(
        routed,
        Routed::Put {
            handle: lamp,
            published: None
        }
    );
    assert!(ep.transport().written().is_empty());
    assert_eq!(ep.clock().sleeps(), 0);
}

#[test]
fn test_put_without_params_is_dropped() {
    let (mut router, mut ep, lamp) = setup();
    let calls = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&calls);
    ep.registry_mut()
        .set_put_handler(lamp, move |_: &str| -> Option<String> {
            *counter.borrow_mut() += 1;
            None
        })
        .unwrap();

    assert!(matches!(
        router.dispatch(&mut ep, "event/lamp1"),
        Err(EndpointError::Protocol(_))
    ));
    assert_eq!(
        router.dispatch(&mut ep, "event/lamp1&  ").unwrap(),
        Routed::Unhandled {
            uri: "lamp1".to_string()
        }
    );
    assert_eq!(*calls.borrow(), 0);
    assert!(ep.transport().written().is_empty());
}

#[test]
fn test_put_unknown_or_handlerless_resource() {
    let (mut router, mut ep, _) = setup();
    assert_eq!(
        router.dispatch(&mut ep, "event/door&open").unwrap(),
        Routed::Unhandled {
            uri: "door".to_string()
        }
    );
    // lamp1 exists but has no handler
    assert_eq!(
        router.dispatch(&mut ep, "event/lamp1&on").unwrap(),
        Routed::Unhandled {
            uri: "lamp1".to_string()
        }
    );
}

#[test]
fn test_put_resolves_namespaced_uri() {
    let mut ep =
        Endpoint::with_clock(MemoryTransport::new(), ManualClock::new(), EndpointConfig::default())
            .unwrap();
    ep.transport_mut().queue_reply(b"2.01 CREATED<<");
    let relay = ep.create_resource("event/relay", 32, "rt=relay").unwrap();
    ep.registry_mut()
        .set_put_handler(relay, |p: &str| Some(p.to_uppercase()))
        .unwrap();
    ep.transport_mut().clear_output();

    let mut router = CommandRouter::new(SimulatedPins::new());
    ep.transport_mut().queue_reply(b"2.04 CHANGED<<");
    let routed = router.dispatch(&mut ep, "event/relay&on").unwrap();
    assert_eq!(
        routed,
        Routed::Put {
            handle: relay,
            published: Some("ON".to_string())
        }
    );
}

#[test]
fn test_put_publish_failure_is_returned() {
    let (mut router, mut ep, lamp) = setup();
    ep.registry_mut()
        .set_put_handler(lamp, |_: &str| Some("this value is far too long for the buffer".to_string()))
        .unwrap();

    let err = router.dispatch(&mut ep, "event/lamp1&x").unwrap_err();
    assert!(matches!(err, EndpointError::ValueTooLong { .. }));
    assert!(ep.transport().written().is_empty());
}

#[test]
fn test_poll_leaves_response_for_waiter() {
    let (mut router, mut ep, _) = setup();
    ep.transport_mut().feed(b"coap 2.05 CONTENT 42<<");

    assert_eq!(router.poll(&mut ep).unwrap(), Routed::Deferred);
    let response = ep.await_response().unwrap();
    assert_eq!(response.text(), "coap 2.05 CONTENT 42");
    assert_eq!(router.poll(&mut ep).unwrap(), Routed::Idle);
}

#[test]
fn test_poll_routes_pin_and_put_in_order() {
    let (mut router, mut ep, lamp) = setup();
    ep.registry_mut()
        .set_put_handler(lamp, |p: &str| Some(p.to_string()))
        .unwrap();
    ep.transport_mut()
        .feed(b"arduino/digital/3/1\nevent/lamp1&on\n");
    ep.transport_mut().queue_reply(b"");
    ep.transport_mut().queue_reply(b"2.04 CHANGED<<");

    assert!(matches!(router.poll(&mut ep).unwrap(), Routed::Pin { .. }));
    assert!(router.pins().level(3));
    assert!(matches!(router.poll(&mut ep).unwrap(), Routed::Put { .. }));
    assert_eq!(
        ep.transport().written_lines(),
        vec!["Pin D3 set to 1", "rsrc=0%value=on"]
    );
    assert_eq!(router.lines_routed(), 2);
}
