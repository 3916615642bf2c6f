mod common;

use common::SimulatedPath;
use pathprobe::{Observation, PacketListener, PingConfig, Pinger};
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

const RUN_ID: u16 = 0x2468;

fn quick_config(count: u32) -> PingConfig {
    PingConfig { count, interval: Duration::ZERO, timeout: Duration::from_millis(100), ..PingConfig::default() }
}

fn run(path: &mut SimulatedPath, config: PingConfig) -> (pathprobe::PingSummary, String) {
    let target = path.target;
    let mut out = Vec::new();
    let summary = Pinger::new(&mut *path, target, RUN_ID, config).run(&mut out).unwrap();
    (summary, String::from_utf8(out).unwrap())
}

#[test]
fn loopback_echo_is_a_reply() {
    let mut path = SimulatedPath::direct(Ipv4Addr::LOCALHOST);
    let listener = PacketListener::new(RUN_ID);

    let packet = pathprobe::EchoRequest::build(RUN_ID, 56);
    pathprobe::IcmpTransport::send_to(&mut path, &packet, Ipv4Addr::LOCALHOST, None).unwrap();
    let observation = listener.receive(&mut path, Duration::from_secs(1)).unwrap();

    match observation {
        Observation::Reply { source, rtt, bytes, reached_destination } => {
            assert_eq!(source, Ipv4Addr::LOCALHOST);
            assert!(reached_destination);
            assert!(rtt >= Duration::ZERO);
            assert_eq!(bytes, 64);
        }
        other => panic!("unexpected observation {:?}", other),
    }
}

#[test]
fn reports_each_send_and_its_reply() {
    let mut path = SimulatedPath::direct(Ipv4Addr::LOCALHOST);
    let (summary, output) = run(&mut path, quick_config(2));

    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "Sent packet 1");
    assert!(lines[1].starts_with("Reply from 127.0.0.1: bytes=64 seq=1 time="), "{}", lines[1]);
    assert_eq!(lines[2], "Sent packet 2");
    assert!(lines[3].starts_with("Reply from 127.0.0.1: bytes=64 seq=2 time="), "{}", lines[3]);
    assert!(lines[1].ends_with("ms"));
    assert_eq!(summary.transmitted, 2);
    assert_eq!(summary.replies, 2);
    assert!(summary.rtt_min.is_some());
}

#[test]
fn packets_carry_run_identifier_and_size() {
    let mut path = SimulatedPath::direct(Ipv4Addr::new(10, 9, 8, 7));
    let config = PingConfig { payload_size: 100, ..quick_config(3) };
    run(&mut path, config);

    assert_eq!(path.sent.len(), 3);
    for sent in &path.sent {
        assert_eq!(sent.destination, Ipv4Addr::new(10, 9, 8, 7));
        assert_eq!(sent.ttl, None);
        assert_eq!(sent.bytes.len(), 108);
        assert_eq!(&sent.bytes[4..6], &RUN_ID.to_be_bytes());
    }
}

#[test]
fn silent_target_times_out_every_attempt() {
    let mut path = SimulatedPath::direct(Ipv4Addr::new(203, 0, 113, 5));
    path.target_answers = false;

    let started = Instant::now();
    let (summary, output) = run(&mut path, quick_config(3));

    assert_eq!(path.sent.len(), 3);
    assert_eq!(summary.timeouts, 3);
    assert_eq!(summary.replies, 0);
    assert_eq!(
        output.lines().collect::<Vec<_>>(),
        vec![
            "Sent packet 1",
            "Request timeout for packet 1",
            "Sent packet 2",
            "Request timeout for packet 2",
            "Sent packet 3",
            "Request timeout for packet 3",
        ]
    );
    assert!(started.elapsed() >= Duration::from_millis(300));
}

#[test]
fn count_is_honoured_whatever_the_outcome() {
    let mut path = SimulatedPath::direct(Ipv4Addr::LOCALHOST);
    path.dropped = vec![2, 4];

    let (summary, output) = run(&mut path, quick_config(5));

    assert_eq!(path.sent.len(), 5);
    assert_eq!(summary.transmitted, 5);
    assert_eq!(summary.replies, 3);
    assert_eq!(summary.timeouts, 2);
    assert!(output.contains("Request timeout for packet 2"));
    assert!(output.contains("Request timeout for packet 4"));
}

#[test]
fn foreign_traffic_is_ignored() {
    let mut path = SimulatedPath::direct(Ipv4Addr::LOCALHOST);
    path.noisy = true;

    let (summary, _) = run(&mut path, quick_config(3));

    assert_eq!(summary.replies, 3);
    assert_eq!(summary.exceeded, 0);
    assert_eq!(summary.timeouts, 0);
}

#[test]
fn sleeps_between_attempts_only() {
    let mut path = SimulatedPath::direct(Ipv4Addr::LOCALHOST);
    let interval = Duration::from_millis(150);
    let config = PingConfig { interval, ..quick_config(3) };

    let started = Instant::now();
    run(&mut path, config);
    let elapsed = started.elapsed();

    assert!(elapsed >= interval * 2, "finished after {:?}", elapsed);
    assert!(elapsed < interval * 3, "finished after {:?}", elapsed);
}
