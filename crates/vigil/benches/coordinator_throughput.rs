use std::time::Instant;
use vigil::prelude::*;

fn report(label: &str, count: usize, start: Instant) {
    let duration = start.elapsed();
    println!("   {} {} in {:?}", count, label, duration);
    println!("   {:.2} {}/sec\n", count as f64 / duration.as_secs_f64(), label);
}

fn main() {
    println!("=== Vigil Coordinator Benchmark ===\n");

    let temp_dir = tempfile::tempdir().unwrap();
    let store = LmdbStore::open(EngineConfig::new(temp_dir.path()).with_sweep_interval(0)).unwrap();
    let coordinator = Coordinator::with_store(Arc::new(store));
    let keys = KeySet::new("bench");
    PatternIndexRegistry::new(coordinator.clone(), keys.clone())
        .start()
        .unwrap();
    let repo = StateRepository::new(coordinator.clone(), keys, RetentionConfig::default());
    let dedup = DedupTracker::new(coordinator.clone());
    let counter = SequenceCounter::new(coordinator.clone());

    // Benchmark 1: one write transaction per key
    println!("1. Single-key Write Transactions");
    let start = Instant::now();
    let count = 10_000;
    for i in 0..count {
        coordinator
            .with_read_write(None, |tx| tx.set(&format!("key_{}", i), b"value", None))
            .unwrap();
    }
    report("txns", count, start);

    // Benchmark 2: nested calls folded into one transaction
    println!("2. Nested Writes In One Transaction");
    let start = Instant::now();
    let batches = 100;
    let batch_size = 100;
    for b in 0..batches {
        coordinator
            .with_read_write(None, |tx| {
                for j in 0..batch_size {
                    counter.increment(Some(&mut *tx), &format!("seq_{}_{}", b, j))?;
                }
                Ok(())
            })
            .unwrap();
    }
    report("increments", batches * batch_size, start);

    // Benchmark 3: point reads
    println!("3. Point Reads");
    let start = Instant::now();
    for i in 0..count {
        coordinator
            .with_read(None, |tx| tx.get(&format!("key_{}", i)))
            .unwrap();
    }
    report("reads", count, start);

    // Benchmark 4: check-and-mark dedup
    println!("4. Dedup Claims");
    let start = Instant::now();
    let ttl = Some(Duration::from_secs(3600));
    for i in 0..count {
        dedup.claim(None, &format!("post_{}", i), ttl).unwrap();
    }
    report("claims", count, start);

    // Benchmark 5: composite repository writes
    println!("5. Live Session Writes");
    let start = Instant::now();
    for i in 0..count as i64 {
        let session = LiveSession {
            producer: ProducerInfo::new(i, format!("producer_{}", i)),
            room_id: i,
            title: "bench".into(),
            status: vigil::LiveStatus::Live,
            cover_url: None,
            started_at: None,
        };
        repo.add_live_session(None, &session).unwrap();
    }
    report("sessions", count, start);

    // Benchmark 6: index iteration
    println!("6. Live Session Listing");
    let start = Instant::now();
    let listed = repo.list_live_sessions(None).unwrap().len();
    report("sessions listed", listed, start);

    println!("=== Benchmark Complete ===");
}
