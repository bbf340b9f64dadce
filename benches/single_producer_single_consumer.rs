//! Single Producer Single Consumer (SPSC) Benchmarks
//!
//! Publishes bursts from the bench thread into a single-producer ring and
//! waits for one batch consumer to drain them, once per wait strategy.

use criterion::measurement::WallTime;
use criterion::{
    black_box, criterion_group, criterion_main, BenchmarkGroup, BenchmarkId, Criterion, Throughput,
};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use batchring::disruptor::{
    BatchEventProcessor, BlockingWaitStrategy, BusySpinWaitStrategy, DefaultEventFactory,
    EventHandler, EventProcessor, ProcessorThread, Result as DisruptorResult, RingBuffer,
    SleepingWaitStrategy, ThreadContext, WaitStrategy, YieldingWaitStrategy,
};

const BUFFER_SIZE: usize = 1024;
const BURST_SIZES: [u64; 4] = [1, 10, 100, 1000];

#[derive(Debug, Default, Clone, Copy)]
struct BenchmarkEvent {
    value: i64,
}

/// Counts processed events so the bench thread knows when a burst is done
struct CountingSink {
    counter: Arc<AtomicI64>,
}

impl EventHandler<BenchmarkEvent> for CountingSink {
    fn on_event(
        &mut self,
        event: &BenchmarkEvent,
        _sequence: i64,
        _end_of_batch: bool,
    ) -> DisruptorResult<()> {
        black_box(event.value);
        self.counter.fetch_add(1, Ordering::Release);
        Ok(())
    }
}

/// Baseline: the same hand-off through a single atomic
fn baseline_measurement(group: &mut BenchmarkGroup<WallTime>, burst_size: u64) {
    let sink = Arc::new(AtomicI64::new(0));
    group.throughput(Throughput::Elements(burst_size));
    group.bench_function(BenchmarkId::new("baseline", burst_size), |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();
            for _ in 0..iters {
                for i in 1..=burst_size {
                    sink.store(black_box(i as i64), Ordering::Release);
                }
                while sink.load(Ordering::Acquire) != burst_size as i64 {}
            }
            start.elapsed()
        })
    });
}

fn benchmark_strategy(
    group: &mut BenchmarkGroup<WallTime>,
    name: &str,
    wait_strategy: Arc<dyn WaitStrategy>,
    burst_size: u64,
) {
    let ring = Arc::new(
        RingBuffer::create_single_producer(
            DefaultEventFactory::<BenchmarkEvent>::new(),
            BUFFER_SIZE,
            wait_strategy,
        )
        .unwrap(),
    );
    let counter = Arc::new(AtomicI64::new(0));
    let processor = Arc::new(BatchEventProcessor::new(
        ring.clone(),
        ring.new_barrier(&[]),
        CountingSink {
            counter: counter.clone(),
        },
    ));
    ring.add_gating_sequences(&[processor.get_sequence()]);
    let thread = ProcessorThread::spawn(processor, ThreadContext::new()).unwrap();

    group.throughput(Throughput::Elements(burst_size));
    group.bench_function(BenchmarkId::new(name, burst_size), |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();
            for _ in 0..iters {
                counter.store(0, Ordering::Release);
                for i in 1..=burst_size {
                    ring.publish_event(|event: &mut BenchmarkEvent, _sequence: i64| {
                        event.value = black_box(i as i64);
                    })
                    .unwrap();
                }
                while counter.load(Ordering::Acquire) < burst_size as i64 {
                    std::hint::spin_loop();
                }
            }
            start.elapsed()
        })
    });

    thread.halt_and_join().unwrap();
}

fn spsc_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("spsc");
    group.measurement_time(Duration::from_secs(5));

    for burst_size in BURST_SIZES {
        baseline_measurement(&mut group, burst_size);
        benchmark_strategy(
            &mut group,
            "busy_spin",
            Arc::new(BusySpinWaitStrategy::new()),
            burst_size,
        );
        benchmark_strategy(
            &mut group,
            "yielding",
            Arc::new(YieldingWaitStrategy::new()),
            burst_size,
        );
        benchmark_strategy(
            &mut group,
            "sleeping",
            Arc::new(SleepingWaitStrategy::new()),
            burst_size,
        );
        benchmark_strategy(
            &mut group,
            "blocking",
            Arc::new(BlockingWaitStrategy::new()),
            burst_size,
        );
    }

    group.finish();
}

criterion_group!(benches, spsc_benchmark);
criterion_main!(benches);
