//! Concurrent mutation of a single aggregate
//!
//! Writers share one `Arc<Node>`; readers must never observe a status
//! without its matching maintenance reason.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use node_core::node::{Node, NodeDraft, NodeStatus, UuidIdGenerator};
use node_core::protocol::TuicConfig;

fn tuic_node() -> Arc<Node> {
    Arc::new(
        Node::create(
            NodeDraft::new("quic-1", "q.example.com", 443, TuicConfig::default()),
            &UuidIdGenerator,
        )
        .unwrap(),
    )
}

#[test]
fn test_concurrent_setters_count_every_change() {
    const THREADS: usize = 8;
    const UPDATES: usize = 100;

    let node = tuic_node();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let node = Arc::clone(&node);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..UPDATES {
                    // values are distinct across threads, so every call changes
                    let value = i32::try_from(t * 10_000 + i + 1).unwrap();
                    assert!(node.update_sort_order(value));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(node.version(), 1 + (THREADS * UPDATES) as u64);
}

#[test]
fn test_concurrent_activate_changes_once() {
    const THREADS: usize = 16;

    let node = tuic_node();
    let barrier = Arc::new(Barrier::new(THREADS));
    let changed = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let node = Arc::clone(&node);
            let barrier = Arc::clone(&barrier);
            let changed = Arc::clone(&changed);
            thread::spawn(move || {
                barrier.wait();
                if node.activate().unwrap() {
                    changed.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(changed.load(Ordering::SeqCst), 1);
    assert_eq!(node.version(), 2);
}

#[test]
fn test_readers_see_status_and_reason_together() {
    let node = tuic_node();
    node.activate().unwrap();
    let done = Arc::new(AtomicBool::new(false));

    let writer = {
        let node = Arc::clone(&node);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            for i in 0..500 {
                node.enter_maintenance(&format!("window {i}")).unwrap();
                node.exit_maintenance().unwrap();
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let node = Arc::clone(&node);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                while !done.load(Ordering::SeqCst) {
                    let (status, reason) = node.status_with_reason();
                    assert_eq!(status == NodeStatus::Maintenance, reason.is_some());

                    let record = node.snapshot();
                    assert_eq!(
                        record.status == NodeStatus::Maintenance,
                        record.maintenance_reason.is_some()
                    );
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    // activate + 500 * (enter + exit)
    assert_eq!(node.version(), 2 + 1000);
    assert_eq!(node.status(), NodeStatus::Active);
}
