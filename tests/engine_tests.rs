//! Scan orchestration tests against stub resolver and transport

mod common;

use common::{StubResolver, StubTransport};
use cpscan::{PortStatus, Protocol, ScanEngine, ScanError, ScanRequest};
use proptest::prelude::*;
use std::net::Ipv4Addr;
use std::time::Duration;

const TARGET: &str = "example.test";

fn engine(transport: StubTransport) -> ScanEngine<StubResolver, StubTransport> {
    let resolver = StubResolver::new().with_answer(TARGET, Ipv4Addr::new(203, 0, 113, 5));
    ScanEngine::new(resolver, transport)
}

#[test]
fn test_end_to_end_example() {
    let engine = engine(StubTransport::new().accepting(&[80]));
    let request = ScanRequest::new(TARGET, 78, 80)
        .with_protocol(Protocol::Tcp)
        .with_timeout(200)
        .with_debug(true);

    let scan = engine.scan(request).unwrap();
    assert_eq!(scan.target().address_string(), "203.0.113.5");

    let outcomes: Vec<(u16, PortStatus)> = scan.map(|o| (o.port, o.status)).collect();
    assert_eq!(
        outcomes,
        vec![(78, PortStatus::Closed), (79, PortStatus::Closed), (80, PortStatus::Open)]
    );
}

#[test]
fn test_resolves_exactly_once() {
    let engine = engine(StubTransport::new());
    let count = engine.scan(ScanRequest::new(TARGET, 1, 25)).unwrap().count();
    assert_eq!(count, 25);
    assert_eq!(engine.resolver().calls(), 1);
}

#[test]
fn test_resolution_failure_probes_nothing() {
    let engine = engine(StubTransport::new());

    let err = engine.scan(ScanRequest::new("", 1, 1024)).unwrap_err();
    assert!(matches!(err, ScanError::EmptyQuery));

    let err = engine.scan(ScanRequest::new("unknown.test", 1, 1024)).unwrap_err();
    assert!(err.is_resolution_failure());

    let stats = engine.prober().transport().stats();
    assert_eq!(stats.opened, 0);
    assert!(stats.connects.is_empty());
}

#[test]
fn test_timeout_is_normalised_before_probing() {
    let engine = engine(StubTransport::new());
    engine.scan(ScanRequest::new(TARGET, 10, 10).with_timeout(1)).unwrap().for_each(drop);
    engine.scan(ScanRequest::new(TARGET, 11, 11).with_timeout(0)).unwrap().for_each(drop);
    engine.scan(ScanRequest::new(TARGET, 12, 12).with_timeout(50)).unwrap().for_each(drop);

    let stats = engine.prober().transport().stats();
    assert_eq!(
        stats.waits,
        vec![
            Duration::from_micros(200_000),
            Duration::from_micros(200_000),
            Duration::from_micros(50_000),
        ]
    );
}

#[test]
fn test_scan_is_lazy() {
    let engine = engine(StubTransport::new());
    let mut scan = engine.scan(ScanRequest::new(TARGET, 1000, 2000)).unwrap();
    assert_eq!(scan.size_hint(), (1001, Some(1001)));

    let first: Vec<u16> = scan.by_ref().take(2).map(|o| o.port).collect();
    assert_eq!(first, vec![1000, 1001]);
    assert_eq!(engine.prober().transport().stats().opened, 2);
    assert_eq!(scan.size_hint(), (999, Some(999)));
}

#[test]
fn test_per_port_failure_does_not_abort_scan() {
    // open() index 1 is port 101, mode switch on index 3 is port 103
    let transport = StubTransport::new().accepting(&[104]).failing_open(1).failing_mode(3);
    let engine = engine(transport);

    let outcomes: Vec<(u16, PortStatus)> = engine
        .scan(ScanRequest::new(TARGET, 100, 104))
        .unwrap()
        .map(|o| (o.port, o.status))
        .collect();

    assert_eq!(
        outcomes,
        vec![
            (100, PortStatus::Closed),
            (101, PortStatus::Error),
            (102, PortStatus::Closed),
            (103, PortStatus::Error),
            (104, PortStatus::Open),
        ]
    );

    let stats = engine.prober().transport().stats();
    assert!(stats.live.is_empty());
    assert_eq!(stats.opened, stats.closed);
    assert_eq!(stats.double_closes, 0);
}

#[test]
fn test_protocol_reaches_every_probe() {
    let engine = engine(StubTransport::new().immediate(&[53]));
    let outcomes: Vec<_> = engine
        .scan(ScanRequest::new(TARGET, 52, 54).with_protocol(Protocol::Udp))
        .unwrap()
        .collect();

    assert!(outcomes.iter().all(|o| o.protocol == Protocol::Udp));
    assert!(outcomes.iter().all(|o| o.status == PortStatus::Closed));
    let stats = engine.prober().transport().stats();
    assert_eq!(stats.protocols, vec![Protocol::Udp; 3]);
}

#[test]
fn test_full_port_range() {
    let engine = engine(StubTransport::new().immediate(&[0, 65535]));
    let mut expected = 0u32;
    for outcome in engine.scan(ScanRequest::new(TARGET, 0, 65535)).unwrap() {
        assert_eq!(outcome.port as u32, expected);
        expected += 1;
    }
    assert_eq!(expected, 65536);
    assert!(engine.prober().transport().stats().live.is_empty());
}

#[test]
fn test_single_port_at_top_of_range() {
    let engine = engine(StubTransport::new().accepting(&[65535]));
    let outcomes: Vec<_> = engine.scan(ScanRequest::new(TARGET, 65535, 65535)).unwrap().collect();
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].is_open());
}

proptest! {
    #[test]
    fn prop_outcome_count_and_order(start in 0u16..=65535, span in 0u16..256) {
        let end = start.saturating_add(span);
        let engine = engine(StubTransport::new());
        let ports: Vec<u16> = engine
            .scan(ScanRequest::new(TARGET, start, end))
            .unwrap()
            .map(|o| o.port)
            .collect();

        prop_assert_eq!(ports.len(), (end - start) as usize + 1);
        prop_assert!(ports.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(ports.first().copied(), Some(start));
        prop_assert_eq!(ports.last().copied(), Some(end));
    }
}
