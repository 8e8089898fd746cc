//! Dedup marks and per-key counters through the coordinator

use std::sync::Barrier;
use std::thread;
use vigil::prelude::*;
use vigil::ManualClock;

fn coordinator_with_clock() -> (Coordinator, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::starting_now());
    let store = LmdbStore::open_with_clock(
        EngineConfig::in_memory().with_sweep_interval(0),
        clock.clone(),
    )
    .unwrap();
    (Coordinator::with_store(Arc::new(store)), clock)
}

#[test]
fn test_mark_seen_then_check_until_ttl() {
    let (coordinator, clock) = coordinator_with_clock();
    let dedup = DedupTracker::new(coordinator);
    let ttl = Some(Duration::from_secs(120 * 60 * 60));

    assert!(dedup.check_seen(None, "post:1"));
    assert!(!dedup.mark_seen(None, "post:1", ttl).unwrap());
    assert!(!dedup.check_seen(None, "post:1"));

    clock.advance(Duration::from_secs(120 * 60 * 60 - 1));
    assert!(!dedup.check_seen(None, "post:1"));
    clock.advance(Duration::from_secs(1));
    assert!(dedup.check_seen(None, "post:1"));
}

#[test]
fn test_mark_seen_inside_rolled_back_transaction_is_discarded() {
    let (coordinator, _clock) = coordinator_with_clock();
    let dedup = DedupTracker::new(coordinator.clone());

    let result: Result<()> = coordinator.with_read_write(None, |tx| {
        dedup.mark_seen(Some(&mut *tx), "post:2", None)?;
        assert!(!dedup.check_seen(Some(tx), "post:2"));
        Err(VigilError::Rollback)
    });

    assert!(result.unwrap_err().is_rollback());
    assert!(dedup.check_seen(None, "post:2"));
}

#[test]
fn test_claim_admits_exactly_one_concurrent_caller() {
    let (coordinator, _clock) = coordinator_with_clock();
    let dedup = DedupTracker::new(coordinator);
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let dedup = dedup.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                dedup.claim(None, "event:1", None).unwrap()
            })
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|won| *won)
        .count();
    assert_eq!(winners, 1);
}

#[test]
fn test_increment_counts_from_one() {
    let (coordinator, _clock) = coordinator_with_clock();
    let counter = SequenceCounter::new(coordinator);

    for expected in 1..=50 {
        assert_eq!(counter.increment(None, "streak").unwrap(), expected);
    }
    assert_eq!(counter.get(None, "streak").unwrap(), 50);

    counter.clear(None, "streak").unwrap();
    assert_eq!(counter.get(None, "streak").unwrap(), 0);
    assert_eq!(counter.increment(None, "streak").unwrap(), 1);

    // Clearing an absent counter succeeds
    counter.clear(None, "never").unwrap();
}

#[test]
fn test_increment_rejects_non_numeric_value() {
    let (coordinator, _clock) = coordinator_with_clock();
    coordinator
        .with_read_write(None, |tx| tx.set("streak", b"many", None))
        .unwrap();

    let counter = SequenceCounter::new(coordinator);
    assert!(matches!(
        counter.increment(None, "streak"),
        Err(VigilError::Serialization(_))
    ));
}

#[test]
fn test_concurrent_increments_lose_nothing() {
    let (coordinator, _clock) = coordinator_with_clock();
    let counter = SequenceCounter::new(coordinator);
    let threads = 8;
    let per_thread = 100;

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let counter = counter.clone();
            thread::spawn(move || {
                for _ in 0..per_thread {
                    counter.increment(None, "shared").unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(counter.get(None, "shared").unwrap(), threads * per_thread);
}

#[test]
fn test_set_if_absent_and_unset() {
    let (coordinator, _clock) = coordinator_with_clock();
    let counter = SequenceCounter::new(coordinator);

    assert!(counter.set_if_absent(None, "first", 1, None).unwrap());
    assert!(!counter.set_if_absent(None, "first", 2, None).unwrap());
    assert_eq!(counter.read(None, "first").unwrap(), 1);

    counter.unset(None, "first").unwrap();
    counter.unset(None, "first").unwrap();
    assert!(counter.set_if_absent(None, "first", 2, None).unwrap());
    assert_eq!(counter.read(None, "first").unwrap(), 2);
}

#[test]
fn test_set_if_absent_after_expiry() {
    let (coordinator, clock) = coordinator_with_clock();
    let counter = SequenceCounter::new(coordinator);
    let ttl = Some(Duration::from_secs(5));

    assert!(counter.set_if_absent(None, "marker", 1, ttl).unwrap());
    clock.advance(Duration::from_secs(5));
    assert!(counter.set_if_absent(None, "marker", 2, ttl).unwrap());
    assert_eq!(counter.read(None, "marker").unwrap(), 2);
}

#[test]
fn test_increment_at_maximum_fails_without_wrapping() {
    let (coordinator, _clock) = coordinator_with_clock();
    coordinator
        .with_read_write(None, |tx| tx.set("streak", i64::MAX.to_string().as_bytes(), None))
        .unwrap();

    let counter = SequenceCounter::new(coordinator);
    assert!(matches!(
        counter.increment(None, "streak"),
        Err(VigilError::InvalidState(_))
    ));
    assert_eq!(counter.get(None, "streak").unwrap(), i64::MAX);
}

#[test]
fn test_check_seen_with_more_threads_than_reader_slots() {
    let store = LmdbStore::open(
        EngineConfig::in_memory()
            .with_max_readers(4)
            .with_sweep_interval(0),
    )
    .unwrap();
    let dedup = DedupTracker::new(Coordinator::with_store(Arc::new(store)));
    let barrier = Arc::new(Barrier::new(32));

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let dedup = dedup.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                (0..20).all(|n| dedup.check_seen(None, &format!("post:{}:{}", i, n)))
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap(), "unseen event reported as seen");
    }
}
