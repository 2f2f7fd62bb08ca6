//! Two-thread throughput benchmark for the SPSC ring.
//!
//! Streams a fixed number of patterned bytes from a producer thread to a
//! consumer thread through one ring, several times over, and reports
//! throughput percentiles plus the diagnostics counters as JSON.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use serde::Serialize;

use peekring_core::{create_ring_with, DiagnosticsSnapshot, RingConfig, RingDiagnostics};

#[derive(Debug)]
struct Args {
    capacity: usize,
    chunk: usize,
    total_bytes: usize,
    iterations: usize,
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
struct IterationResult {
    iteration: usize,
    elapsed_ms: f64,
    throughput_mib_s: f64,
}

#[derive(Debug, Serialize)]
struct Summary {
    capacity: usize,
    chunk: usize,
    total_bytes: usize,
    iterations: usize,
    p50_throughput_mib_s: f64,
    p95_throughput_mib_s: f64,
    avg_throughput_mib_s: f64,
    diagnostics: DiagnosticsSnapshot,
    results: Vec<IterationResult>,
}

fn parse_args() -> Result<Args, String> {
    let mut capacity: usize = 1 << 16;
    let mut chunk: usize = 4096;
    let mut total_bytes: usize = 256 << 20;
    let mut iterations: usize = 3;
    let mut output: Option<PathBuf> = None;

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--capacity" => {
                let Some(v) = it.next() else {
                    return Err("missing value for --capacity".into());
                };
                capacity = v
                    .parse::<usize>()
                    .map_err(|_| "invalid value for --capacity".to_string())?;
            }
            "--chunk" => {
                let Some(v) = it.next() else {
                    return Err("missing value for --chunk".into());
                };
                chunk = v
                    .parse::<usize>()
                    .map_err(|_| "invalid value for --chunk".to_string())?
                    .max(1);
            }
            "--bytes" => {
                let Some(v) = it.next() else {
                    return Err("missing value for --bytes".into());
                };
                total_bytes = v
                    .parse::<usize>()
                    .map_err(|_| "invalid value for --bytes".to_string())?;
            }
            "--iterations" => {
                let Some(v) = it.next() else {
                    return Err("missing value for --iterations".into());
                };
                iterations = v
                    .parse::<usize>()
                    .map_err(|_| "invalid value for --iterations".to_string())?
                    .clamp(1, 20);
            }
            "--output" => {
                let Some(v) = it.next() else {
                    return Err("missing value for --output".into());
                };
                output = Some(PathBuf::from(v));
            }
            "--help" | "-h" => {
                println!(
                    "Usage: cargo run -p peekring-core --bin benchmark -- \\
  [--capacity <bytes>] [--chunk <bytes>] [--bytes <total>] \\
  [--iterations <n>] [--output <file.json>]"
                );
                std::process::exit(0);
            }
            other => {
                return Err(format!("unknown argument: {other}"));
            }
        }
    }

    Ok(Args {
        capacity,
        chunk,
        total_bytes,
        iterations,
        output,
    })
}

fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    if sorted.len() == 1 {
        return sorted[0];
    }
    let idx = ((sorted.len() - 1) as f64 * p.clamp(0.0, 1.0)).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn pattern_chunk(len: usize, seed: usize) -> Vec<u8> {
    (0..len).map(|i| ((seed + i) % 251) as u8).collect()
}

fn run_iteration(args: &Args, diagnostics: &Arc<RingDiagnostics>) -> Result<f64, String> {
    let config = RingConfig::new(args.capacity).with_diagnostics(Arc::clone(diagnostics));
    let (mut producer, mut consumer) =
        create_ring_with(config).map_err(|e| format!("ring construction failed: {e}"))?;

    let total = args.total_bytes;
    let chunk = pattern_chunk(args.chunk, 0);

    let started = Instant::now();
    let writer = thread::spawn(move || {
        let mut sent = 0usize;
        while sent < total {
            let want = chunk.len().min(total - sent);
            let n = producer.write(&chunk[..want]);
            if n == 0 {
                std::hint::spin_loop();
            }
            sent += n;
        }
    });

    let mut buf = vec![0u8; args.chunk];
    let mut received = 0usize;
    while received < total {
        let n = consumer.read(&mut buf);
        if n == 0 {
            std::hint::spin_loop();
        }
        received += n;
    }

    writer
        .join()
        .map_err(|_| "producer thread panicked".to_string())?;
    Ok(started.elapsed().as_secs_f64())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("benchmark failed: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args = parse_args()?;
    println!(
        "Streaming {} MiB through a {} B ring in {} B chunks ({} iterations)",
        args.total_bytes >> 20,
        args.capacity,
        args.chunk,
        args.iterations
    );

    let diagnostics = Arc::new(RingDiagnostics::default());
    let mut results = Vec::with_capacity(args.iterations);

    for iteration in 1..=args.iterations {
        let elapsed = run_iteration(&args, &diagnostics)?;
        let elapsed_ms = elapsed * 1000.0;
        let throughput_mib_s = args.total_bytes as f64 / (1024.0 * 1024.0) / elapsed;
        println!(
            "[{iteration}/{iters}] {elapsed_ms:.1} ms  {throughput_mib_s:.1} MiB/s",
            iters = args.iterations
        );
        results.push(IterationResult {
            iteration,
            elapsed_ms,
            throughput_mib_s,
        });
    }

    let throughputs = results
        .iter()
        .map(|r| r.throughput_mib_s)
        .collect::<Vec<_>>();
    let summary = Summary {
        capacity: args.capacity,
        chunk: args.chunk,
        total_bytes: args.total_bytes,
        iterations: args.iterations,
        p50_throughput_mib_s: percentile(&throughputs, 0.50),
        p95_throughput_mib_s: percentile(&throughputs, 0.95),
        avg_throughput_mib_s: throughputs.iter().sum::<f64>() / throughputs.len() as f64,
        diagnostics: diagnostics.snapshot(),
        results,
    };

    println!(
        "Done. p50={:.1} MiB/s p95={:.1} MiB/s",
        summary.p50_throughput_mib_s, summary.p95_throughput_mib_s
    );

    let json = serde_json::to_string_pretty(&summary).map_err(|e| e.to_string())?;
    if let Some(out) = args.output {
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        std::fs::write(&out, json).map_err(|e| e.to_string())?;
        println!("Wrote benchmark report: {}", out.display());
    } else {
        println!("{json}");
    }

    Ok(())
}
