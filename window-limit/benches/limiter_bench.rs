use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::Barrier;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use criterion::BatchSize;
use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;

use governor::Quota;
use quanta::Clock;

use window_limit::MAX_CAPACITY;
use window_limit::RateLimiter;
use window_limit::Strategy;
use window_limit::WINDOW_MS;

const THREADS: [usize; 4] = [1, 2, 4, 8];
const TOKENS: [u32; 3] = [1, 8, 64];

/// Runs `op` `iters` times split across `threads`, timing from a shared start signal.
fn contend<F>(threads: usize, iters: u64, op: Arc<F>) -> Duration
where
    F: Fn() + Send + Sync + 'static,
{
    let barrier = Arc::new(Barrier::new(threads + 1));
    let per_thread = iters / threads as u64;

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let op = Arc::clone(&op);
            let bar = Arc::clone(&barrier);
            thread::spawn(move || {
                bar.wait();
                for _ in 0..per_thread {
                    op();
                }
            })
        })
        .collect();

    barrier.wait();
    let start = Instant::now();
    for handle in handles {
        let _ = handle.join();
    }
    start.elapsed()
}

// Same-window CAS path: every call finds headroom in an already open window.
fn bench_headroom(c: &mut Criterion) {
    let mut group = c.benchmark_group("Headroom");

    for tokens in TOKENS {
        group.bench_with_input(BenchmarkId::from_parameter(tokens), &tokens, |b, &t| {
            b.iter_batched(
                || {
                    let (clock, _mock) = Clock::mock();
                    let rl = RateLimiter::with_clock(MAX_CAPACITY, clock).expect("capacity fits");
                    rl.try_acquire(1);
                    rl
                },
                |rl| black_box(rl.try_acquire(black_box(t))),
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

// Reset path: the mocked clock moves a full window before every call.
fn bench_rollover(c: &mut Criterion) {
    let (clock, mock) = Clock::mock();
    let rl = RateLimiter::with_clock(MAX_CAPACITY, clock).expect("capacity fits");
    let window = Duration::from_millis(WINDOW_MS);

    c.bench_function("Rollover", |b| {
        b.iter(|| {
            mock.increment(window);
            black_box(rl.try_acquire(black_box(8)))
        })
    });
}

// Many threads asking for `n` tokens on the system clock. Once a window drains,
// most calls take the exhausted path until the next rollover.
fn bench_contended_acquire(c: &mut Criterion) {
    let mut group = c.benchmark_group("Contended-try_acquire");

    for tokens in TOKENS {
        for threads in THREADS {
            let rl = Arc::new(RateLimiter::new(MAX_CAPACITY).expect("capacity fits"));
            group.bench_with_input(
                BenchmarkId::new(format!("{tokens}-tokens"), format!("{threads}-threads")),
                &threads,
                |b, &n| {
                    let rl = Arc::clone(&rl);
                    let op = Arc::new(move || {
                        black_box(rl.try_acquire(black_box(tokens)));
                    });
                    b.iter_custom(|iters| contend(n, iters, Arc::clone(&op)))
                },
            );
        }
    }

    group.finish();
}

// Single token requests through `Strategy::process`, against governor as a baseline.
fn bench_single_token(c: &mut Criterion) {
    let mut group = c.benchmark_group("Single-token");

    let rl = Arc::new(RateLimiter::new(MAX_CAPACITY).expect("capacity fits"));
    let quota = Quota::per_second(NonZeroU32::new(MAX_CAPACITY).expect("non-zero"));
    let gov = Arc::new(governor::RateLimiter::direct(quota));

    for threads in THREADS {
        let limiter = Arc::clone(&rl);
        let process = Arc::new(move || {
            let _ = black_box(limiter.process());
        });
        group.bench_with_input(
            BenchmarkId::new("RateLimiter", format!("{threads}-threads")),
            &threads,
            |b, &n| b.iter_custom(|iters| contend(n, iters, Arc::clone(&process))),
        );

        let governor = Arc::clone(&gov);
        let check = Arc::new(move || {
            let _ = black_box(governor.check());
        });
        group.bench_with_input(
            BenchmarkId::new("Governor", format!("{threads}-threads")),
            &threads,
            |b, &n| b.iter_custom(|iters| contend(n, iters, Arc::clone(&check))),
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_headroom,
    bench_rollover,
    bench_contended_acquire,
    bench_single_token
);
criterion_main!(benches);
