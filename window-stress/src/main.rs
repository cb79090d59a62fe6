use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use window_limit::RateLimiter;

mod error;
mod worker;

use error::StressError;
use worker::Totals;
use worker::Workload;

/// Hammer a lock-free fixed window rate limiter from many threads.
#[derive(Debug, Parser)]
#[command(name = "window-stress", version, about)]
struct Args {
    /// Tokens granted per one second window.
    #[arg(long, default_value_t = 10_000)]
    capacity: u32,

    /// Number of worker threads.
    #[arg(long, default_value_t = 8)]
    threads: usize,

    /// Calls made by each worker.
    #[arg(long, default_value_t = 100_000)]
    requests_per_thread: u64,

    /// Tokens asked for on each call.
    #[arg(long, default_value_t = 1)]
    tokens: u32,

    /// Stop workers after this long, e.g. "3s" or "500ms".
    #[arg(long, value_parser = humantime::parse_duration)]
    duration: Option<Duration>,
}

fn report(args: &Args, totals: &Totals) {
    let secs = totals.elapsed.as_secs_f64();
    let ceiling = u64::from(args.capacity) * totals.windows();

    println!("--- Fixed Window (capacity {}) ---", args.capacity);
    println!("Total Duration:  {:.2?}", totals.elapsed);
    println!("Threads:         {}", args.threads);
    println!("Calls:           {}", totals.requests);
    println!("Granted/Asked:   {}/{}", totals.granted, totals.requested);
    println!("Call Rate:       {:.2} calls/sec", totals.requests as f64 / secs);
    println!("Grant Rate:      {:.2} tokens/sec", totals.granted as f64 / secs);
    println!("Windows:         <= {} (ceiling {} tokens)", totals.windows(), ceiling);
    println!("  └─ Full:       {}", totals.full);
    println!("  └─ Partial:    {}", totals.partial);
    println!("  └─ Denied:     {}", totals.denied);

    if totals.requests > 0 {
        println!("P50 (Call):      {}ns", totals.latency.value_at_quantile(0.5));
        println!("P99 (Call):      {}ns", totals.latency.value_at_quantile(0.99));
        println!("Max (Call):      {}ns", totals.latency.max());
    }
    println!();

    if totals.granted > ceiling {
        warn!(
            granted = totals.granted,
            ceiling, "limiter granted more than its windows allow"
        );
    }
}

fn main() -> Result<(), StressError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let limiter = Arc::new(RateLimiter::new(args.capacity)?);
    let workload = Workload {
        threads: args.threads,
        requests_per_thread: args.requests_per_thread,
        tokens: args.tokens,
        deadline: args.duration,
    };

    info!(
        capacity = args.capacity,
        threads = args.threads,
        requests_per_thread = args.requests_per_thread,
        tokens = args.tokens,
        "starting stress run"
    );
    let totals = worker::run(limiter, &workload)?;
    info!(elapsed = ?totals.elapsed, granted = totals.granted, "stress run complete");

    report(&args, &totals);
    Ok(())
}
