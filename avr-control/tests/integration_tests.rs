//! Integration tests for the connection engine.
//!
//! These tests run a real TCP mock receiver in-process, connect the engine
//! to it, and verify end-to-end behavior: command ordering and spacing,
//! reconciliation after connect, recovery of dropped answers, and
//! reconnection after the peer drops the session.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use avr_control::{CommandQueue, ProtocolEngine, ReceiveFrames, TcpTransport, INTER_COMMAND_DELAY};
use avr_protocol::Frame;
use avr_state::features::{VolumeDisplay, VolumeState};
use avr_state::{FeatureTag, FeatureValue, ModelProfile, Zone};

/// What the mock does after receiving one command line.
enum Reply {
    Lines(Vec<&'static str>),
    Close,
}

struct MockReceiver {
    addr: String,
    received: Arc<Mutex<Vec<(Instant, String)>>>,
    /// Connections that carried at least one command (probes excluded).
    sessions: Arc<AtomicU32>,
}

/// Start a mock receiver serving sequential connections. Reachability
/// probes show up as connections that close without sending anything.
fn spawn_mock<F>(respond: F) -> MockReceiver
where
    F: Fn(&str) -> Reply + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock receiver");
    let addr = listener.local_addr().unwrap().to_string();
    let received = Arc::new(Mutex::new(Vec::new()));
    let sessions = Arc::new(AtomicU32::new(0));

    let log = received.clone();
    let session_count = sessions.clone();
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let mut pending = Vec::new();
            let mut buf = [0u8; 512];
            let mut counted = false;
            'session: loop {
                let n = match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => n,
                };
                pending.extend_from_slice(&buf[..n]);
                while let Some(pos) = pending.iter().position(|&b| b == 0x0d) {
                    let line = String::from_utf8_lossy(&pending[..pos]).into_owned();
                    pending.drain(..=pos);
                    if !counted {
                        counted = true;
                        session_count.fetch_add(1, Ordering::SeqCst);
                    }
                    log.lock().unwrap().push((Instant::now(), line.clone()));
                    match respond(&line) {
                        Reply::Lines(replies) => {
                            for reply in replies {
                                let mut bytes = reply.as_bytes().to_vec();
                                bytes.push(0x0d);
                                if stream.write_all(&bytes).is_err() {
                                    break 'session;
                                }
                            }
                        }
                        Reply::Close => break 'session,
                    }
                }
            }
        }
    });

    MockReceiver {
        addr,
        received,
        sessions,
    }
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

struct NullSink;

impl ReceiveFrames for NullSink {
    fn received(&self, _frame: Frame) {}
}

/// Commands reach the wire in submission order, each separated by at least
/// the inter-command delay.
#[test]
fn commands_are_fifo_with_enforced_spacing() {
    let mock = spawn_mock(|_| Reply::Lines(vec![]));
    let queue = Arc::new(CommandQueue::new());
    let transport = TcpTransport::connect(&mock.addr, queue.clone(), Arc::new(NullSink))
        .expect("connect to mock");

    queue.push("PWON");
    queue.push("MV50");
    queue.push("MU?");

    assert!(wait_until(Duration::from_secs(3), || {
        mock.received.lock().unwrap().len() == 3
    }));
    let received = mock.received.lock().unwrap();
    let lines: Vec<&str> = received.iter().map(|(_, l)| l.as_str()).collect();
    assert_eq!(lines, ["PWON", "MV50", "MU?"]);
    for pair in received.windows(2) {
        let gap = pair[1].0.duration_since(pair[0].0);
        // allow a little scheduler slop below the nominal delay
        assert!(
            gap >= INTER_COMMAND_DELAY - Duration::from_millis(20),
            "gap {:?} below inter-command delay",
            gap
        );
    }
    drop(received);
    transport.stop();
}

/// A receiver that never answers the first mute query but answers the
/// second is left fully defined by one reconciliation cycle.
#[test]
fn reconciliation_recovers_a_dropped_answer() {
    let mute_queries = Arc::new(AtomicU32::new(0));
    let mute_counter = mute_queries.clone();
    let mock = spawn_mock(move |line| match line {
        "PW?" => Reply::Lines(vec!["PWSTANDBY"]),
        "ZM?" => Reply::Lines(vec!["ZMON"]),
        "MU?" => {
            if mute_counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Reply::Lines(vec![])
            } else {
                Reply::Lines(vec!["MUON"])
            }
        }
        "MV?" => Reply::Lines(vec!["MV505"]),
        "SI?" => Reply::Lines(vec!["SITUNER"]),
        "MS?" => Reply::Lines(vec!["MSSTEREO"]),
        "CV ?" => Reply::Lines(vec!["CVFL 50"]),
        "PSBAS ?" => Reply::Lines(vec!["PSBAS 50"]),
        "PSTRE ?" => Reply::Lines(vec!["PSTRE 50"]),
        "SLP?" => Reply::Lines(vec!["SLPOFF"]),
        _ => Reply::Lines(vec![]),
    });

    let engine = ProtocolEngine::new(ModelProfile::new("test", 1));
    engine.connect(&mock.addr).unwrap();

    assert!(wait_until(Duration::from_secs(10), || {
        engine.status().connected
    }));
    // the first MU? was dropped; the verification pass re-queries it
    assert!(wait_until(Duration::from_secs(15), || {
        engine
            .coordinator()
            .value(Zone::Main, FeatureTag::Mute)
            .unwrap()
            == FeatureValue::Switch(true)
    }));
    assert!(mute_queries.load(Ordering::SeqCst) >= 2);
    assert_eq!(
        engine
            .coordinator()
            .value(Zone::Main, FeatureTag::Volume)
            .unwrap(),
        FeatureValue::Volume(505)
    );
    engine.disconnect();
}

/// An unsolicited zone-encoded push is routed to the secondary zone.
#[test]
fn zone_shorthand_push_reaches_zone_two() {
    let mock = spawn_mock(|line| match line {
        "PW?" => Reply::Lines(vec!["PWSTANDBY"]),
        "Z2?" => Reply::Lines(vec!["Z2ON", "Z250", "Z2TUNER"]),
        "Z2MU?" => Reply::Lines(vec!["Z2MUOFF"]),
        _ => Reply::Lines(vec![]),
    });

    let engine = ProtocolEngine::new(ModelProfile::generic());
    engine.connect(&mock.addr).unwrap();

    assert!(wait_until(Duration::from_secs(15), || {
        engine
            .coordinator()
            .value(Zone::Zone2, FeatureTag::Volume)
            .unwrap()
            == FeatureValue::Volume(50)
    }));
    // wire "Z250" means an absolute volume of 5.0
    assert_eq!(VolumeState::render(50, VolumeDisplay::Absolute), "5.0");
    assert_eq!(
        engine
            .coordinator()
            .value(Zone::Zone2, FeatureTag::MainZone)
            .unwrap(),
        FeatureValue::Switch(true)
    );
    assert_eq!(
        engine
            .coordinator()
            .value(Zone::Zone2, FeatureTag::Mute)
            .unwrap(),
        FeatureValue::Switch(false)
    );
    engine.disconnect();
}

/// When the peer drops the session, the supervisor reconnects and runs a
/// fresh reconciliation against the new session.
#[test]
fn supervisor_reconnects_after_peer_drop() {
    let sessions_seen = Arc::new(AtomicU32::new(0));
    let session_counter = sessions_seen.clone();
    let mock = spawn_mock(move |line| {
        // the first session dies on its first power query
        if line == "PW?" && session_counter.fetch_add(1, Ordering::SeqCst) == 0 {
            return Reply::Close;
        }
        match line {
            "PW?" => Reply::Lines(vec!["PWSTANDBY"]),
            "MV?" => Reply::Lines(vec!["MV400"]),
            _ => Reply::Lines(vec![]),
        }
    });

    let engine = ProtocolEngine::new(ModelProfile::new("test", 1));
    engine.connect(&mock.addr).unwrap();

    // second command-carrying session comes up and answers
    assert!(wait_until(Duration::from_secs(20), || {
        mock.sessions.load(Ordering::SeqCst) >= 2
    }));
    assert!(wait_until(Duration::from_secs(20), || {
        engine.status().connected
            && engine
                .coordinator()
                .value(Zone::Main, FeatureTag::Volume)
                .unwrap()
                == FeatureValue::Volume(400)
    }));
    // the dropped session must not be retried in a tight loop: the line
    // after the fatal PW? belongs to the next session, at least one
    // backoff step later
    {
        let received = mock.received.lock().unwrap();
        let dropped = received.iter().position(|(_, l)| l == "PW?").unwrap();
        let gap = received[dropped + 1].0.duration_since(received[dropped].0);
        assert!(
            gap >= Duration::from_secs(1),
            "reconnect gap {:?} below the minimum backoff",
            gap
        );
    }
    engine.disconnect();
    assert!(!engine.status().connected);
}

/// Commands issued while disconnected are dropped, never an error.
#[test]
fn send_while_disconnected_is_harmless() {
    let engine = ProtocolEngine::new(ModelProfile::new("test", 1));
    engine.coordinator().send_raw("PWON");
    engine
        .coordinator()
        .set_switch(Zone::Main, FeatureTag::Power, true)
        .unwrap();
    assert!(!engine.status().connected);
}
