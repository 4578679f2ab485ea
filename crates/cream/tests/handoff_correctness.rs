// crates/cream/tests/handoff_correctness.rs
//
// The acceptor-to-worker handoff under contention: exactly-once delivery
// across a consumer pool, FIFO observation by a single consumer, and
// invalidation while consumers are parked.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use cream::{Handoff, HandoffInvalidated};

/// Four consumers draining 200 items: every item is seen exactly once, none
/// invented, none lost.
#[test]
fn test_pool_drains_exactly_once() {
    const ITEMS: usize = 200;
    const CONSUMERS: usize = 4;

    let handoff: Arc<Handoff<usize>> = Arc::new(Handoff::new());
    let seen: Arc<Mutex<HashSet<usize>>> = Arc::new(Mutex::new(HashSet::new()));

    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|_| {
            let handoff = Arc::clone(&handoff);
            let seen = Arc::clone(&seen);
            thread::spawn(move || {
                while let Ok(item) = handoff.pop() {
                    let fresh = seen.lock().expect("seen set").insert(item);
                    assert!(fresh, "item {item} delivered twice");
                }
            })
        })
        .collect();

    for i in 0..ITEMS {
        handoff.push(i).expect("push");
    }
    while seen.lock().expect("seen set").len() < ITEMS {
        thread::sleep(Duration::from_millis(5));
    }
    handoff.invalidate(|_| {}).expect("invalidate");
    for c in consumers {
        c.join().expect("consumer panicked");
    }

    let seen = seen.lock().expect("seen set");
    assert_eq!(seen.len(), ITEMS);
    for i in 0..ITEMS {
        assert!(seen.contains(&i), "item {i} lost");
    }
}

/// With a single consumer, items come out in exactly the order they went in.
#[test]
fn test_single_consumer_observes_fifo() {
    const ITEMS: usize = 100;
    let handoff: Arc<Handoff<usize>> = Arc::new(Handoff::new());

    let consumer = {
        let handoff = Arc::clone(&handoff);
        thread::spawn(move || {
            let mut received = Vec::with_capacity(ITEMS);
            for _ in 0..ITEMS {
                received.push(handoff.pop().expect("pop"));
            }
            received
        })
    };

    for i in 0..ITEMS {
        handoff.push(i).expect("push");
        if i % 10 == 0 {
            // A little producer jitter so the consumer alternates between
            // draining and parking.
            thread::sleep(Duration::from_millis(1));
        }
    }

    let received = consumer.join().expect("consumer panicked");
    let expected: Vec<usize> = (0..ITEMS).collect();
    assert_eq!(received, expected);
}

/// Invalidation releases every parked consumer with an error and destroys
/// whatever was still queued.
#[test]
fn test_invalidate_releases_parked_consumers() {
    let handoff: Arc<Handoff<String>> = Arc::new(Handoff::new());

    let parked: Vec<_> = (0..3)
        .map(|_| {
            let handoff = Arc::clone(&handoff);
            thread::spawn(move || handoff.pop())
        })
        .collect();
    thread::sleep(Duration::from_millis(50));

    let mut destroyed = Vec::new();
    handoff
        .invalidate(|item| destroyed.push(item))
        .expect("invalidate");
    assert!(destroyed.is_empty(), "nothing was queued");

    for p in parked {
        assert_eq!(p.join().expect("consumer"), Err(HandoffInvalidated));
    }
    assert_eq!(handoff.push("late".to_string()), Err(HandoffInvalidated));
}
