use std::sync::Arc;
use std::sync::Barrier;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use hdrhistogram::Histogram;
use tracing::debug;
use window_limit::RateLimiter;
use window_limit::WINDOW_MS;

use crate::error::StressError;

/// How hard each worker thread hits the limiter.
#[derive(Clone, Debug)]
pub struct Workload {
    pub threads: usize,
    pub requests_per_thread: u64,
    pub tokens: u32,
    /// Stop early once this much time has passed.
    pub deadline: Option<Duration>,
}

/// Aggregated outcome of a run.
#[derive(Debug)]
pub struct Totals {
    pub requests: u64,
    pub requested: u64,
    pub granted: u64,
    pub full: u64,
    pub partial: u64,
    pub denied: u64,
    /// Per call latency in nanoseconds.
    pub latency: Histogram<u64>,
    pub elapsed: Duration,
}

impl Totals {
    fn new() -> Result<Self, StressError> {
        Ok(Self {
            requests: 0,
            requested: 0,
            granted: 0,
            full: 0,
            partial: 0,
            denied: 0,
            latency: new_histogram()?,
            elapsed: Duration::ZERO,
        })
    }

    fn record(&mut self, asked: u32, granted: u32, latency: Duration) {
        self.requests += 1;
        self.requested += u64::from(asked);
        self.granted += u64::from(granted);
        match granted {
            0 => self.denied += 1,
            g if g < asked => self.partial += 1,
            _ => self.full += 1,
        }
        self.latency.saturating_record(latency.as_nanos() as u64);
    }

    fn merge(&mut self, other: &Totals) -> Result<(), StressError> {
        self.requests += other.requests;
        self.requested += other.requested;
        self.granted += other.granted;
        self.full += other.full;
        self.partial += other.partial;
        self.denied += other.denied;
        self.latency
            .add(&other.latency)
            .map_err(|e| StressError::Histogram(format!("{e:?}")))
    }

    /// The most windows a run of `elapsed` can have opened.
    pub fn windows(&self) -> u64 {
        self.elapsed.as_millis() as u64 / WINDOW_MS + 1
    }
}

fn new_histogram() -> Result<Histogram<u64>, StressError> {
    Histogram::<u64>::new_with_bounds(1, 60_000_000_000, 3)
        .map_err(|e| StressError::Histogram(format!("{e:?}")))
}

/// Runs `workload` against `limiter` and waits for every worker to finish.
pub fn run(limiter: Arc<RateLimiter>, workload: &Workload) -> Result<Totals, StressError> {
    let barrier = Arc::new(Barrier::new(workload.threads + 1));
    let mut handles = Vec::with_capacity(workload.threads);

    for id in 0..workload.threads {
        let rl = Arc::clone(&limiter);
        let bar = Arc::clone(&barrier);
        let load = workload.clone();
        let mut local = Totals::new()?;

        handles.push(thread::spawn(move || {
            bar.wait();
            let start = Instant::now();
            for _ in 0..load.requests_per_thread {
                if load.deadline.is_some_and(|d| start.elapsed() >= d) {
                    break;
                }
                let call_start = Instant::now();
                let granted = rl.try_acquire(load.tokens);
                local.record(load.tokens, granted, call_start.elapsed());
            }
            debug!(worker = id, requests = local.requests, "worker finished");
            local
        }));
    }

    barrier.wait();
    let start = Instant::now();

    let mut totals = Totals::new()?;
    for (id, handle) in handles.into_iter().enumerate() {
        let local = handle.join().map_err(|_| StressError::WorkerPanicked(id))?;
        totals.merge(&local)?;
    }
    totals.elapsed = start.elapsed();

    Ok(totals)
}
