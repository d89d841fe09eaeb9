//! Integration tests for the shared device front end: the cursor protocol
//! end to end and serialization under concurrent callers.

use std::sync::Arc;
use std::thread;

use buddypool::{PoolDevice, PoolError, Reply, Request, Unit};

#[test]
fn test_protocol_walkthrough() {
    let device = PoolDevice::new(16).unwrap();

    let a = device.alloc(2).unwrap();
    let b = device.alloc(4).unwrap();
    assert_eq!((a, b), (0, 4));

    device.set_cursor(b);
    assert_eq!(device.write_at_cursor(b"max\0"), Ok(4));
    device.set_transfer_size(4);
    assert_eq!(device.read_at_cursor().unwrap(), b"max\0");

    device.free(a).unwrap();
    device.free(b).unwrap();
    assert_eq!(device.stats().allocated_regions, 0);
    assert_eq!(device.stats().largest_free, 16);
}

#[test]
fn test_snapshot_tags_every_byte() {
    let device = PoolDevice::new(8).unwrap();
    device.alloc(4).unwrap();
    device.alloc(2).unwrap();

    let snapshot = device.snapshot();
    assert_eq!(snapshot.len(), 8);
    assert_eq!(&snapshot[..4], &[Unit::Allocated(0); 4]);
    assert_eq!(&snapshot[4..6], &[Unit::Allocated(4); 2]);
    assert_eq!(&snapshot[6..], &[Unit::Free; 2]);
}

#[test]
fn test_control_read_size_defaults_to_zero() {
    let device = PoolDevice::new(16).unwrap();
    let Reply::Index(idx) = device.control(Request::Alloc(4)).unwrap() else {
        panic!("expected an index reply");
    };
    device.control(Request::SetCursor(idx)).unwrap();
    // No transfer size set yet: a zero-byte read succeeds.
    assert_eq!(device.control(Request::Read), Ok(Reply::Data(Vec::new())));
}

#[test]
fn test_zero_capacity_device() {
    let device = PoolDevice::new(0).unwrap();
    assert_eq!(device.alloc(1), Err(PoolError::NotEnoughSpace));
    assert_eq!(device.free(0), Err(PoolError::NotAllocated));
    assert!(device.snapshot().is_empty());
}

#[test]
fn test_concurrent_callers_stay_disjoint() {
    let device = Arc::new(PoolDevice::new(1024).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let device = Arc::clone(&device);
            thread::spawn(move || {
                let mut held = Vec::new();
                for round in 0..100_usize {
                    if let Ok(idx) = device.alloc(1 + round % 16) {
                        held.push(idx);
                    }
                    if round % 3 == 0 {
                        if let Some(idx) = held.pop() {
                            device.free(idx).unwrap();
                        }
                    }
                }
                held
            })
        })
        .collect();

    let mut all_held: Vec<usize> = Vec::new();
    for handle in handles {
        all_held.extend(handle.join().unwrap());
    }

    // Every index handed out and still held is unique, and the tree agrees
    // about what is live.
    let mut sorted = all_held.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(sorted.len(), all_held.len());
    assert_eq!(device.stats().allocated_regions, all_held.len());

    for idx in all_held {
        device.free(idx).unwrap();
    }
    assert_eq!(device.stats().allocated_regions, 0);
    assert_eq!(device.stats().largest_free, 1024);
}
