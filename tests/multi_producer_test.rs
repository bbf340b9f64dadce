//! Integration tests for concurrent publishing and producer back-pressure

mod common;

use batchring::disruptor::{
    BatchEventProcessor, Cursored, DefaultEventFactory, DisruptorError, EventHandler,
    EventProcessor, ProcessorThread, ProducerType, Result, RingBuffer, Sequence, Sequenced,
    ThreadContext, YieldingWaitStrategy,
};
use common::{init_tracing, wait_until};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Default, Clone, Copy)]
struct TaggedEvent {
    producer: usize,
    index: u64,
    sequence: i64,
}

#[derive(Default)]
struct OrderChecker {
    next_index: Vec<u64>,
    errors: Arc<Mutex<Vec<String>>>,
}

impl EventHandler<TaggedEvent> for OrderChecker {
    fn on_event(&mut self, event: &TaggedEvent, sequence: i64, _eob: bool) -> Result<()> {
        if event.sequence != sequence {
            self.errors.lock().push(format!(
                "slot {sequence} holds a record written for {}",
                event.sequence
            ));
        }
        let expected = &mut self.next_index[event.producer];
        if event.index != *expected {
            self.errors.lock().push(format!(
                "producer {} sent {} but {expected} was next",
                event.producer, event.index
            ));
        }
        *expected = event.index + 1;
        Ok(())
    }
}

#[test]
fn test_concurrent_producers_publish_every_record_in_per_producer_order() {
    init_tracing();
    const PRODUCERS: usize = 4;
    const PER_PRODUCER: u64 = 20_000;

    let ring = Arc::new(
        RingBuffer::create(
            ProducerType::Multi,
            DefaultEventFactory::<TaggedEvent>::new(),
            256,
            Arc::new(YieldingWaitStrategy::new()),
        )
        .unwrap(),
    );
    let errors = Arc::new(Mutex::new(Vec::new()));
    let processor = Arc::new(BatchEventProcessor::new(
        ring.clone(),
        ring.new_barrier(&[]),
        OrderChecker {
            next_index: vec![0; PRODUCERS],
            errors: errors.clone(),
        },
    ));
    ring.add_gating_sequences(&[processor.get_sequence()]);
    let consumer = ProcessorThread::spawn(processor.clone(), ThreadContext::new()).unwrap();

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let ring = ring.clone();
            thread::spawn(move || {
                for index in 0..PER_PRODUCER {
                    ring.publish_event_with(
                        |event: &mut TaggedEvent, sequence: i64, (producer, index): (usize, u64)| {
                            event.producer = producer;
                            event.index = index;
                            event.sequence = sequence;
                        },
                        (producer, index),
                    )
                    .unwrap();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    let last = (PRODUCERS as u64 * PER_PRODUCER) as i64 - 1;
    assert_eq!(ring.get_cursor(), last);
    wait_until("consumer to drain", || processor.get_sequence().get() == last);
    consumer.halt_and_join().unwrap();

    let first_error = errors.lock().first().cloned();
    assert_eq!(first_error, None);
    processor.with_handler(|checker| {
        assert!(checker.next_index.iter().all(|n| *n == PER_PRODUCER));
    });
}

#[test]
fn test_barrier_holds_back_until_earlier_claim_is_published() {
    init_tracing();
    let ring = RingBuffer::create_multi_producer(
        DefaultEventFactory::<TaggedEvent>::new(),
        8,
        Arc::new(YieldingWaitStrategy::new()),
    )
    .unwrap();
    let sequencer = ring.sequencer().clone();
    let barrier = ring.new_barrier(&[]);

    let early = sequencer.next().unwrap();
    let late = sequencer.next().unwrap();
    sequencer.publish(late);

    assert_eq!(sequencer.get_cursor(), late);
    assert!(!sequencer.is_available(early));
    assert_eq!(sequencer.get_highest_published_sequence(0, late), -1);

    // The claim counter is past 0 but slot 0 is not stamped yet, so the
    // barrier reports nothing new and the caller waits again.
    assert_eq!(barrier.wait_for(0), Ok(-1));

    sequencer.publish(early);
    assert_eq!(barrier.wait_for(0), Ok(late));
}

#[test]
fn test_producer_blocks_until_slowest_consumer_frees_a_slot() {
    init_tracing();
    for producer_type in [ProducerType::Single, ProducerType::Multi] {
        let ring = Arc::new(
            RingBuffer::create(
                producer_type,
                DefaultEventFactory::<TaggedEvent>::new(),
                4,
                Arc::new(YieldingWaitStrategy::new()),
            )
            .unwrap(),
        );
        let fast = Arc::new(Sequence::default());
        let slow = Arc::new(Sequence::default());
        ring.add_gating_sequences(&[fast.clone(), slow.clone()]);

        for _ in 0..4 {
            ring.try_publish_event(|event: &mut TaggedEvent, sequence: i64| {
                event.sequence = sequence
            })
            .unwrap();
        }
        assert_eq!(ring.remaining_capacity(), 0);
        assert_eq!(
            ring.try_next(),
            Err(DisruptorError::InsufficientCapacity),
            "{producer_type}"
        );

        fast.set(3);
        assert_eq!(ring.try_next(), Err(DisruptorError::InsufficientCapacity));

        let published = Arc::new(AtomicBool::new(false));
        let producer = {
            let ring = ring.clone();
            let published = published.clone();
            thread::spawn(move || {
                ring.publish_event(|event: &mut TaggedEvent, sequence: i64| {
                    event.sequence = sequence
                })
                .unwrap();
                published.store(true, Ordering::Release);
            })
        };

        thread::sleep(Duration::from_millis(20));
        assert!(!published.load(Ordering::Acquire), "{producer_type}");

        slow.set(0);
        wait_until("blocked producer", || published.load(Ordering::Acquire));
        producer.join().unwrap();
        assert_eq!(ring.get_cursor(), 4);
        // SAFETY: the producer has been joined and no consumer is running.
        assert_eq!(unsafe { ring.get(4) }.sequence, 4);
    }
}

#[test]
fn test_batch_publish_claims_a_contiguous_range() {
    init_tracing();
    let ring = RingBuffer::create_multi_producer(
        DefaultEventFactory::<TaggedEvent>::new(),
        16,
        Arc::new(YieldingWaitStrategy::new()),
    )
    .unwrap();
    let consumer = Arc::new(Sequence::default());
    ring.add_gating_sequences(&[consumer.clone()]);

    let args = [(0usize, 10u64), (1, 11), (2, 12), (3, 13), (4, 14)];
    ring.publish_events_with(
        |event: &mut TaggedEvent, sequence: i64, (producer, index): (usize, u64)| {
            event.producer = producer;
            event.index = index;
            event.sequence = sequence;
        },
        1,
        3,
        &args,
    )
    .unwrap();

    assert_eq!(ring.get_cursor(), 2);
    let published: Vec<(usize, u64)> = (0..3)
        .map(|s| {
            // SAFETY: publishing happened on this thread and nothing else runs.
            let event = unsafe { ring.get(s) };
            (event.producer, event.index)
        })
        .collect();
    assert_eq!(published, vec![(1, 11), (2, 12), (3, 13)]);

    assert!(matches!(
        ring.publish_events_with(
            |_event: &mut TaggedEvent, _sequence: i64, _arg: (usize, u64)| {},
            3,
            3,
            &args,
        ),
        Err(DisruptorError::InvalidBatch(_))
    ));
    assert_eq!(ring.get_cursor(), 2);
}
