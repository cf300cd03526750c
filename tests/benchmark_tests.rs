//! Performance benchmarks for the client's hot paths

use client::dispatcher::Dispatcher;
use client::game::GameState;
use client::network::{run_sender, ConnectionError, Outgoing, Transport};
use client::queue::BoundedQueue;
use client::rendering::{Renderer, TerminalRenderer};
use parking_lot::Mutex;
use serde_json::json;
use shared::{DecodeTable, Direction, Event, EventKind, Request};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Benchmarks queue hand-off between a producer and a consumer thread
#[test]
fn benchmark_queue_handoff() {
    let queue = Arc::new(BoundedQueue::new());
    let iterations = 100_000u32;
    let start = Instant::now();

    let producer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            for i in 0..iterations {
                queue.put(i);
            }
        })
    };

    let mut expected = 0;
    while expected < iterations {
        assert_eq!(queue.take(), expected);
        expected += 1;
    }
    producer.join().unwrap();

    let duration = start.elapsed();
    println!(
        "Queue hand-off: {} items in {:?} ({:.2} ns/item)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    // Should complete in under 2 seconds
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks decoding of typical server frames
#[test]
fn benchmark_frame_decoding() {
    let table = DecodeTable::standard();
    let frame = json!({
        "type": "SEND_STATS",
        "payload": {"hp": 90, "maxHp": 100, "rads": 3, "credits": 250, "debt": 40}
    })
    .to_string();

    let iterations = 50_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let event = table.decode(&frame).unwrap();
        assert_eq!(event.kind(), &EventKind::Stats);
    }

    let duration = start.elapsed();
    println!(
        "Frame decoding: {} frames in {:?} ({:.2} μs/frame)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 3000);
}

/// Benchmarks the dispatcher applying a burst of events in one tick
#[test]
fn benchmark_dispatch_burst() {
    let inbound = Arc::new(BoundedQueue::new());
    let outbound = Arc::new(BoundedQueue::new());
    let state = Arc::new(Mutex::new(GameState::new()));
    let mut dispatcher = Dispatcher::new(
        Arc::clone(&inbound),
        outbound,
        Arc::clone(&state),
        Arc::new(AtomicBool::new(true)),
    );

    let iterations = 20_000;
    for i in 0..iterations {
        inbound.put(Event::new(
            EventKind::PlayerPosition,
            json!({"x": i % 100, "y": i / 100}),
        ));
    }

    let start = Instant::now();
    assert!(dispatcher.tick());
    let duration = start.elapsed();

    println!(
        "Dispatch burst: {} events in {:?} ({:.2} μs/event)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(inbound.is_empty());
    let state = state.lock();
    assert_eq!(state.player.x, (iterations - 1) % 100);
    assert!(state.network_logs.len() <= shared::NETWORK_LOG_LIMIT);
    assert!(duration.as_millis() < 3000);
}

struct CountingTransport {
    sent: AtomicUsize,
}

impl Transport for CountingTransport {
    fn send(&self, _raw: &str) -> Result<(), ConnectionError> {
        self.sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Benchmarks the sender loop encoding and writing requests
#[test]
fn benchmark_sender_loop() {
    let outbound = BoundedQueue::new();
    let transport = CountingTransport {
        sent: AtomicUsize::new(0),
    };
    let running = AtomicBool::new(true);

    let iterations = 20_000;
    for _ in 0..iterations {
        outbound.put(Outgoing::Send(Request::movement(Direction::Left)));
    }
    outbound.put(Outgoing::Stop);

    let start = Instant::now();
    run_sender(&outbound, &transport, &running);
    let duration = start.elapsed();

    println!(
        "Sender loop: {} requests in {:?} ({:.2} μs/request)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert_eq!(transport.sent.load(Ordering::Relaxed), iterations);
    assert!(duration.as_millis() < 3000);
}

/// Benchmarks full frame composition with a populated world
#[test]
fn benchmark_frame_rendering() {
    let mut state = GameState::new();
    state.advance_to(client::game::ClientState::Playing);
    let rows: Vec<String> = (0..21).map(|_| ".".repeat(61)).collect();
    state.map = shared::MapData::from_value(&json!({
        "mapName": "Polis",
        "center": {"x": 30, "y": 10, "z": 0},
        "range": {"x": 30, "y": 10},
        "layers": {"0": rows}
    }));
    state.npcs = shared::Npc::list_from_value(&json!((0..50)
        .map(|i| json!({"id": i.to_string(), "name": "n", "x": i, "y": i % 20}))
        .collect::<Vec<_>>()));

    let mut renderer = TerminalRenderer::with_size(io::sink(), 120, 50);
    let iterations = 1_000;
    let start = Instant::now();

    for _ in 0..iterations {
        renderer.render(&state).unwrap();
    }

    let duration = start.elapsed();
    println!(
        "Frame rendering: {} frames in {:?} ({:.2} μs/frame)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 5000);
}
