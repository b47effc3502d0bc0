//! Performance benchmarks for the layerkv store
//!
//! Measures latency and throughput of store operations in-process

use clap::Parser;
use layerkv::{Store, TransactionalStore};
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "benchmark")]
#[command(about = "Benchmark layerkv store operations", long_about = None)]
struct Cli {
    /// Operations per benchmark
    #[arg(short = 'n', long, default_value_t = 100_000)]
    operations: usize,
}

type BenchResult = Result<BenchmarkResults, Box<dyn std::error::Error>>;

#[derive(Debug)]
struct BenchmarkResults {
    operation: String,
    total_operations: usize,
    duration: Duration,
    ops_per_second: f64,
    avg_latency_us: f64,
    p95_latency_us: f64,
    p99_latency_us: f64,
}

impl BenchmarkResults {
    fn new(
        operation: &str,
        total_operations: usize,
        duration: Duration,
        latencies: &mut [Duration],
    ) -> Self {
        latencies.sort();

        let ops_per_second = total_operations as f64 / duration.as_secs_f64();
        let avg_latency_us = latencies.iter().map(|d| d.as_secs_f64() * 1e6).sum::<f64>()
            / latencies.len().max(1) as f64;

        let p95_index = (latencies.len() as f64 * 0.95) as usize;
        let p99_index = (latencies.len() as f64 * 0.99) as usize;

        let p95_latency_us = latencies
            .get(p95_index)
            .unwrap_or(&Duration::ZERO)
            .as_secs_f64()
            * 1e6;
        let p99_latency_us = latencies
            .get(p99_index)
            .unwrap_or(&Duration::ZERO)
            .as_secs_f64()
            * 1e6;

        Self {
            operation: operation.to_string(),
            total_operations,
            duration,
            ops_per_second,
            avg_latency_us,
            p95_latency_us,
            p99_latency_us,
        }
    }

    fn print(&self) {
        println!("=== {} Benchmark Results ===", self.operation);
        println!("Total operations: {}", self.total_operations);
        println!("Duration: {:.3}s", self.duration.as_secs_f64());
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
        println!("Average latency: {:.3}us", self.avg_latency_us);
        println!("P95 latency: {:.3}us", self.p95_latency_us);
        println!("P99 latency: {:.3}us", self.p99_latency_us);
        println!();
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let n = cli.operations;

    println!("layerkv Store Benchmarks");
    println!("========================");
    println!("Operations per benchmark: {}", n);
    println!();

    benchmark_set_operations(n)?.print();
    benchmark_get_operations(n)?.print();
    benchmark_mixed_workload(n)?.print();
    benchmark_nested_transactions(n)?.print();

    for depth in [0, 4, 16] {
        benchmark_count_equal_to(depth, n / 100)?.print();
    }

    Ok(())
}

/// Time `op` once per iteration
fn measure<F>(operation: &str, n: usize, mut op: F) -> BenchResult
where
    F: FnMut(usize) -> layerkv::Result<()>,
{
    let mut latencies = Vec::with_capacity(n);
    let start = Instant::now();

    for i in 0..n {
        let op_start = Instant::now();
        op(i)?;
        latencies.push(op_start.elapsed());
    }

    Ok(BenchmarkResults::new(operation, n, start.elapsed(), &mut latencies))
}

fn populated_store(keys: usize) -> layerkv::Result<TransactionalStore> {
    let mut store = TransactionalStore::new();
    for i in 0..keys {
        store.set(&format!("key_{}", i), &format!("value_{}", i % 100))?;
    }
    Ok(store)
}

fn benchmark_set_operations(n: usize) -> BenchResult {
    let mut store = TransactionalStore::new();
    measure("SET", n, |i| store.set(&format!("bench_key_{}", i), &format!("bench_value_{}", i)))
}

fn benchmark_get_operations(n: usize) -> BenchResult {
    let store = populated_store(n)?;
    measure("GET", n, |i| {
        let _value = store.get(&format!("key_{}", i));
        Ok(())
    })
}

fn benchmark_mixed_workload(n: usize) -> BenchResult {
    let mut store = populated_store(1000)?;
    store.begin();

    measure("Mixed Workload (in transaction)", n, |i| {
        let key = format!("key_{}", i % 1000);
        match i % 10 {
            // 70% GET operations
            0..=6 => {
                let _value = store.get(&key);
            }
            // 20% SET operations
            7..=8 => store.set(&key, &format!("mixed_value_{}", i))?,
            // 10% UNSET operations
            _ => store.delete(&key),
        }
        Ok(())
    })
}

fn benchmark_nested_transactions(n: usize) -> BenchResult {
    let mut store = populated_store(1000)?;

    measure("BEGIN/SET/ROLLBACK/COMMIT", n, |i| {
        store.begin();
        store.set(&format!("key_{}", i % 1000), "txn")?;
        store.begin();
        store.delete(&format!("key_{}", (i + 1) % 1000));
        store.rollback()?;
        if i % 2 == 0 {
            store.commit()
        } else {
            store.rollback()
        }
    })
}

fn benchmark_count_equal_to(depth: usize, n: usize) -> BenchResult {
    let mut store = populated_store(10_000)?;
    for level in 0..depth {
        store.begin();
        for i in 0..100 {
            store.set(&format!("key_{}", level * 100 + i), "value_0")?;
        }
    }

    measure(&format!("NUMEQUALTO (depth {})", depth), n, |_| {
        let _count = store.count_equal_to("value_0");
        Ok(())
    })
}
