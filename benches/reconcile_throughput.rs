/// Benchmark for partition reconciliation throughput
///
/// Compares events that hit the cached partition snapshot against events that
/// register a new partition, on file-backed and in-memory scratch storage.

use partloader::scratch::{FileScratch, MemoryScratch};
use partloader::{
    AccountIdentity, LoaderConfig, MemoryQueryEngine, PartitionHandler, PollPolicy, ScratchStore,
    StorageEvent,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::tempdir;

fn handler(scratch: Arc<dyn ScratchStore>) -> (Arc<MemoryQueryEngine>, PartitionHandler) {
    let engine = Arc::new(MemoryQueryEngine::new());
    engine.create_table("bench", "events");
    let mut config = LoaderConfig::new(
        "us-east-1",
        "bench",
        "events",
        vec!["year".to_string(), "month".to_string(), "day".to_string()],
    );
    config.poll = PollPolicy::unbounded(Duration::ZERO);
    let identity = AccountIdentity::new("123456789012", "us-east-1").expect("identity");
    let handler =
        PartitionHandler::new(config, engine.clone(), identity, scratch).expect("handler");
    (engine, handler)
}

fn run(label: &str, scratch: Arc<dyn ScratchStore>) {
    let (engine, handler) = handler(scratch);
    let iterations = 1000;

    println!("📊 Benchmark: {} - cached partition", label);
    let warm = StorageEvent::object_created("bucket", "data/year=2024/month=01/day=01/f.csv", 1);
    handler.handle_event(&warm).expect("warm up");
    let start = Instant::now();
    for _ in 0..iterations {
        handler.handle_event(&warm).ok();
    }
    let elapsed = start.elapsed();
    println!("  Iterations: {}", iterations);
    println!("  Time: {:?}", elapsed);
    println!(
        "  Throughput: {:.0} events/sec",
        iterations as f64 / elapsed.as_secs_f64()
    );
    println!();

    println!("📊 Benchmark: {} - new partition per event", label);
    let days = 200;
    let start = Instant::now();
    for day in 0..days {
        let key = format!("data/year=2025/month={:02}/day={:03}/f.csv", day % 12 + 1, day);
        handler
            .handle_event(&StorageEvent::object_created("bucket", &key, 1))
            .ok();
    }
    let elapsed = start.elapsed();
    println!("  Iterations: {}", days);
    println!("  Time: {:?}", elapsed);
    println!(
        "  Throughput: {:.0} events/sec",
        days as f64 / elapsed.as_secs_f64()
    );
    println!("  Catalog statements: {}", engine.submitted_queries().len());
    println!();
}

fn main() {
    println!("=== Partition Reconcile Throughput Benchmark ===\n");

    run("memory scratch", Arc::new(MemoryScratch::new()));

    let temp_dir = tempdir().expect("tempdir");
    let file = FileScratch::open(temp_dir.path()).expect("file scratch");
    run("file scratch", Arc::new(file));

    println!("✅ Benchmark complete");
}
