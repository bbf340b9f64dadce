//! Sequencer Implementation
//!
//! This module provides sequencer implementations for coordinating access to the ring buffer.
//! Sequencers hand out positions to producers and make sure that producers never
//! overwrite events that the slowest gating consumer has not processed yet.
//!
//! Two variants are provided:
//! - [`SingleProducerSequencer`] for exactly one publishing thread
//! - [`MultiProducerSequencer`] for any number of concurrently publishing threads

use crate::disruptor::{
    check_claim_count, is_power_of_two, minimum_sequence, Cursored, DisruptorError,
    ProcessingSequenceBarrier, Result, Sequence, SequenceBarrier, Sequenced, WaitStrategy,
};
use crossbeam_utils::CachePadded;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicI32, AtomicI64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::trace;

/// Trait for sequencers that coordinate access to the ring buffer
///
/// On top of [`Sequenced`] (claim and publish) and [`Cursored`] this adds
/// gating management, availability queries and barrier construction.
pub trait Sequencer: Cursored + Sequenced + Send + Sync + std::fmt::Debug {
    /// Set the claim position directly
    ///
    /// Only for initialising a ring buffer to a specific value, never while
    /// producers are active.
    fn claim(&self, sequence: i64);

    /// Check if a sequence has been published and can be consumed
    fn is_available(&self, sequence: i64) -> bool;

    /// Add sequences that this sequencer must not overtake
    ///
    /// Each added sequence is first moved to the current cursor so a late
    /// joining consumer does not gate producers from the start of the ring.
    fn add_gating_sequences(&self, gating_sequences: &[Arc<Sequence>]);

    /// Remove every occurrence of a gating sequence
    ///
    /// # Returns
    /// True if the sequence was found and removed
    fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool;

    /// Create a new barrier over this sequencer
    ///
    /// # Arguments
    /// * `sequences_to_track` - Upstream consumer sequences the barrier must not
    ///   overtake; when empty the barrier tracks the cursor only
    fn new_barrier(self: Arc<Self>, sequences_to_track: &[Arc<Sequence>])
        -> Arc<dyn SequenceBarrier>;

    /// Get the minimum sequence across the gating sequences, or the cursor
    /// when there are none
    fn get_minimum_sequence(&self) -> i64;

    /// Get the highest contiguously published sequence in a range
    ///
    /// # Arguments
    /// * `next_sequence` - The first sequence to check
    /// * `available_sequence` - The highest sequence that may be available
    ///
    /// # Returns
    /// The highest sequence that can be safely read, which is
    /// `next_sequence - 1` when nothing in the range is published
    fn get_highest_published_sequence(&self, next_sequence: i64, available_sequence: i64) -> i64;
}

/// State shared by both sequencer variants
#[derive(Debug)]
struct SequencerCore {
    buffer_size: usize,
    wait_strategy: Arc<dyn WaitStrategy>,
    cursor: Arc<Sequence>,
    /// Copy-on-write snapshot; writers swap in a new slice, readers clone the pointer
    gating_sequences: RwLock<Arc<[Arc<Sequence>]>>,
}

impl SequencerCore {
    fn new(buffer_size: usize, wait_strategy: Arc<dyn WaitStrategy>) -> Result<Self> {
        if !is_power_of_two(buffer_size) {
            return Err(DisruptorError::InvalidBufferSize(buffer_size));
        }

        Ok(Self {
            buffer_size,
            wait_strategy,
            cursor: Arc::new(Sequence::new_with_initial_value()),
            gating_sequences: RwLock::new(Arc::from(Vec::new())),
        })
    }

    #[inline]
    fn buffer_size(&self) -> i64 {
        self.buffer_size as i64
    }

    fn gating_snapshot(&self) -> Arc<[Arc<Sequence>]> {
        self.gating_sequences.read().clone()
    }

    fn minimum_gating_sequence(&self, default: i64) -> i64 {
        minimum_sequence(&self.gating_snapshot(), default)
    }

    fn add_gating_sequences(&self, to_add: &[Arc<Sequence>]) {
        {
            let mut gating = self.gating_sequences.write();
            let cursor_sequence = self.cursor.get();
            for sequence in to_add {
                sequence.set(cursor_sequence);
            }
            let updated: Vec<Arc<Sequence>> =
                gating.iter().chain(to_add.iter()).cloned().collect();
            *gating = Arc::from(updated);
        }

        // The cursor may have moved while the snapshot was swapped.
        let cursor_sequence = self.cursor.get();
        for sequence in to_add {
            sequence.set(cursor_sequence);
        }
    }

    fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool {
        let mut gating = self.gating_sequences.write();
        let retained: Vec<Arc<Sequence>> = gating
            .iter()
            .filter(|s| !Arc::ptr_eq(s, sequence))
            .cloned()
            .collect();

        if retained.len() == gating.len() {
            return false;
        }
        *gating = Arc::from(retained);
        true
    }

    /// Park the producer briefly while consumers catch up
    fn producer_backoff(&self) {
        self.wait_strategy.signal_all_when_blocking();
        thread::park_timeout(Duration::from_nanos(1));
    }

    fn new_barrier(
        &self,
        sequencer: Arc<dyn Sequencer>,
        sequences_to_track: &[Arc<Sequence>],
    ) -> Arc<dyn SequenceBarrier> {
        Arc::new(ProcessingSequenceBarrier::new(
            sequencer,
            Arc::clone(&self.wait_strategy),
            Arc::clone(&self.cursor),
            sequences_to_track,
        ))
    }
}

/// Single producer sequencer
///
/// This sequencer is optimized for scenarios where only one thread will be
/// publishing events. Claim and publish must never be called from more than
/// one thread at a time; the claim state uses relaxed atomics only so the
/// type stays `Sync`.
#[derive(Debug)]
pub struct SingleProducerSequencer {
    core: SequencerCore,
    /// Last claimed position
    next_value: CachePadded<AtomicI64>,
    /// Last observed minimum gating sequence
    cached_value: CachePadded<AtomicI64>,
}

impl SingleProducerSequencer {
    /// Create a new single producer sequencer
    ///
    /// # Arguments
    /// * `buffer_size` - The size of the ring buffer (must be a power of 2)
    /// * `wait_strategy` - The wait strategy used by consumers
    ///
    /// # Errors
    /// Returns `DisruptorError::InvalidBufferSize` if `buffer_size` is not a power of 2
    pub fn new(buffer_size: usize, wait_strategy: Arc<dyn WaitStrategy>) -> Result<Self> {
        Ok(Self {
            core: SequencerCore::new(buffer_size, wait_strategy)?,
            next_value: CachePadded::new(AtomicI64::new(crate::disruptor::INITIAL_CURSOR_VALUE)),
            cached_value: CachePadded::new(AtomicI64::new(crate::disruptor::INITIAL_CURSOR_VALUE)),
        })
    }

    fn has_capacity_for(&self, required_capacity: i64) -> bool {
        let next_value = self.next_value.load(Ordering::Relaxed);
        let wrap_point = next_value + required_capacity - self.core.buffer_size();
        let cached_gating_sequence = self.cached_value.load(Ordering::Relaxed);

        // A cached value ahead of next_value is stale (after claim()), so re-read.
        if wrap_point > cached_gating_sequence || cached_gating_sequence > next_value {
            let min_sequence = self.core.minimum_gating_sequence(next_value);
            self.cached_value.store(min_sequence, Ordering::Relaxed);

            if wrap_point > min_sequence {
                return false;
            }
        }

        true
    }
}

impl Cursored for SingleProducerSequencer {
    fn get_cursor(&self) -> i64 {
        self.core.cursor.get()
    }
}

impl Sequenced for SingleProducerSequencer {
    fn get_buffer_size(&self) -> usize {
        self.core.buffer_size
    }

    fn has_available_capacity(&self, required_capacity: usize) -> bool {
        self.has_capacity_for(required_capacity as i64)
    }

    fn remaining_capacity(&self) -> i64 {
        let next_value = self.next_value.load(Ordering::Relaxed);
        let consumed = self.core.minimum_gating_sequence(next_value);
        self.core.buffer_size() - (next_value - consumed)
    }

    fn next_n(&self, n: i64) -> Result<i64> {
        check_claim_count(n, self.core.buffer_size)?;

        let next_value = self.next_value.load(Ordering::Relaxed);
        let next_sequence = next_value + n;
        let wrap_point = next_sequence - self.core.buffer_size();
        let cached_gating_sequence = self.cached_value.load(Ordering::Relaxed);

        if wrap_point > cached_gating_sequence || cached_gating_sequence > next_value {
            let mut min_sequence = self.core.minimum_gating_sequence(next_value);
            if wrap_point > min_sequence {
                trace!(wrap_point, min_sequence, "producer waiting for consumers");
                while wrap_point > min_sequence {
                    self.core.producer_backoff();
                    min_sequence = self.core.minimum_gating_sequence(next_value);
                }
            }
            self.cached_value.store(min_sequence, Ordering::Relaxed);
        }

        self.next_value.store(next_sequence, Ordering::Relaxed);
        Ok(next_sequence)
    }

    fn try_next_n(&self, n: i64) -> Result<i64> {
        check_claim_count(n, self.core.buffer_size)?;

        if !self.has_capacity_for(n) {
            return Err(DisruptorError::InsufficientCapacity);
        }

        let next_sequence = self.next_value.load(Ordering::Relaxed) + n;
        self.next_value.store(next_sequence, Ordering::Relaxed);
        Ok(next_sequence)
    }

    fn publish(&self, sequence: i64) {
        self.core.cursor.set(sequence);
        self.core.wait_strategy.signal_all_when_blocking();
    }

    fn publish_range(&self, _lo: i64, hi: i64) {
        self.publish(hi);
    }
}

impl Sequencer for SingleProducerSequencer {
    fn claim(&self, sequence: i64) {
        self.next_value.store(sequence, Ordering::Relaxed);
    }

    fn is_available(&self, sequence: i64) -> bool {
        sequence <= self.core.cursor.get()
    }

    fn add_gating_sequences(&self, gating_sequences: &[Arc<Sequence>]) {
        self.core.add_gating_sequences(gating_sequences);
    }

    fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool {
        self.core.remove_gating_sequence(sequence)
    }

    fn new_barrier(
        self: Arc<Self>,
        sequences_to_track: &[Arc<Sequence>],
    ) -> Arc<dyn SequenceBarrier> {
        let sequencer: Arc<dyn Sequencer> = self.clone();
        self.core.new_barrier(sequencer, sequences_to_track)
    }

    fn get_minimum_sequence(&self) -> i64 {
        self.core.minimum_gating_sequence(self.core.cursor.get())
    }

    fn get_highest_published_sequence(&self, _next_sequence: i64, available_sequence: i64) -> i64 {
        available_sequence
    }
}

/// Multi producer sequencer
///
/// Safe for any number of publishing threads. The cursor is the shared claim
/// counter, advanced with compare-and-swap, so it can run ahead of what has
/// actually been published. Publication is recorded per slot in an
/// availability buffer holding the lap number ("flag") of the last sequence
/// published there; barriers scan it to find the contiguous published frontier.
#[derive(Debug)]
pub struct MultiProducerSequencer {
    core: SequencerCore,
    gating_sequence_cache: Sequence,
    available_buffer: Box<[AtomicI32]>,
    index_mask: usize,
    index_shift: u32,
}

impl MultiProducerSequencer {
    /// Create a new multi producer sequencer
    ///
    /// # Arguments
    /// * `buffer_size` - The size of the ring buffer (must be a power of 2)
    /// * `wait_strategy` - The wait strategy used by consumers
    ///
    /// # Errors
    /// Returns `DisruptorError::InvalidBufferSize` if `buffer_size` is not a power of 2
    pub fn new(buffer_size: usize, wait_strategy: Arc<dyn WaitStrategy>) -> Result<Self> {
        let core = SequencerCore::new(buffer_size, wait_strategy)?;
        let available_buffer = (0..buffer_size).map(|_| AtomicI32::new(-1)).collect();

        Ok(Self {
            core,
            gating_sequence_cache: Sequence::new_with_initial_value(),
            available_buffer,
            index_mask: buffer_size - 1,
            index_shift: buffer_size.trailing_zeros(),
        })
    }

    #[inline]
    fn calculate_index(&self, sequence: i64) -> usize {
        (sequence as usize) & self.index_mask
    }

    #[inline]
    fn calculate_availability_flag(&self, sequence: i64) -> i32 {
        (sequence >> self.index_shift) as i32
    }

    #[inline]
    fn set_available(&self, sequence: i64) {
        let index = self.calculate_index(sequence);
        let flag = self.calculate_availability_flag(sequence);
        self.available_buffer[index].store(flag, Ordering::Release);
    }

    fn has_capacity_for(&self, required_capacity: i64, cursor_value: i64) -> bool {
        let wrap_point = cursor_value + required_capacity - self.core.buffer_size();
        let cached_gating_sequence = self.gating_sequence_cache.get();

        if wrap_point > cached_gating_sequence || cached_gating_sequence > cursor_value {
            let min_sequence = self.core.minimum_gating_sequence(cursor_value);
            self.gating_sequence_cache.set(min_sequence);

            if wrap_point > min_sequence {
                return false;
            }
        }

        true
    }
}

impl Cursored for MultiProducerSequencer {
    fn get_cursor(&self) -> i64 {
        self.core.cursor.get()
    }
}

impl Sequenced for MultiProducerSequencer {
    fn get_buffer_size(&self) -> usize {
        self.core.buffer_size
    }

    fn has_available_capacity(&self, required_capacity: usize) -> bool {
        self.has_capacity_for(required_capacity as i64, self.core.cursor.get())
    }

    fn remaining_capacity(&self) -> i64 {
        let produced = self.core.cursor.get();
        let consumed = self.core.minimum_gating_sequence(produced);
        self.core.buffer_size() - (produced - consumed)
    }

    fn next_n(&self, n: i64) -> Result<i64> {
        check_claim_count(n, self.core.buffer_size)?;

        let mut stalled = false;
        loop {
            let current = self.core.cursor.get();
            let next = current + n;
            let wrap_point = next - self.core.buffer_size();
            let cached_gating_sequence = self.gating_sequence_cache.get();

            if wrap_point > cached_gating_sequence || cached_gating_sequence > current {
                let gating_sequence = self.core.minimum_gating_sequence(current);

                if wrap_point > gating_sequence {
                    if !stalled {
                        trace!(wrap_point, gating_sequence, "producer waiting for consumers");
                        stalled = true;
                    }
                    self.core.producer_backoff();
                    continue;
                }

                self.gating_sequence_cache.set(gating_sequence);
            } else if self.core.cursor.compare_and_set(current, next) {
                return Ok(next);
            }
        }
    }

    fn try_next_n(&self, n: i64) -> Result<i64> {
        check_claim_count(n, self.core.buffer_size)?;

        loop {
            let current = self.core.cursor.get();
            let next = current + n;

            if !self.has_capacity_for(n, current) {
                return Err(DisruptorError::InsufficientCapacity);
            }

            if self.core.cursor.compare_and_set(current, next) {
                return Ok(next);
            }
        }
    }

    fn publish(&self, sequence: i64) {
        self.set_available(sequence);
        self.core.wait_strategy.signal_all_when_blocking();
    }

    fn publish_range(&self, lo: i64, hi: i64) {
        for sequence in lo..=hi {
            self.set_available(sequence);
        }
        self.core.wait_strategy.signal_all_when_blocking();
    }
}

impl Sequencer for MultiProducerSequencer {
    fn claim(&self, sequence: i64) {
        self.core.cursor.set(sequence);
    }

    fn is_available(&self, sequence: i64) -> bool {
        let index = self.calculate_index(sequence);
        let flag = self.calculate_availability_flag(sequence);
        self.available_buffer[index].load(Ordering::Acquire) == flag
    }

    fn add_gating_sequences(&self, gating_sequences: &[Arc<Sequence>]) {
        self.core.add_gating_sequences(gating_sequences);
    }

    fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool {
        self.core.remove_gating_sequence(sequence)
    }

    fn new_barrier(
        self: Arc<Self>,
        sequences_to_track: &[Arc<Sequence>],
    ) -> Arc<dyn SequenceBarrier> {
        let sequencer: Arc<dyn Sequencer> = self.clone();
        self.core.new_barrier(sequencer, sequences_to_track)
    }

    fn get_minimum_sequence(&self) -> i64 {
        self.core.minimum_gating_sequence(self.core.cursor.get())
    }

    fn get_highest_published_sequence(&self, next_sequence: i64, available_sequence: i64) -> i64 {
        for sequence in next_sequence..=available_sequence {
            if !self.is_available(sequence) {
                return sequence - 1;
            }
        }
        available_sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disruptor::{BlockingWaitStrategy, BusySpinWaitStrategy};
    use std::collections::HashSet;

    fn single(buffer_size: usize) -> SingleProducerSequencer {
        SingleProducerSequencer::new(buffer_size, Arc::new(BusySpinWaitStrategy::new())).unwrap()
    }

    fn multi(buffer_size: usize) -> MultiProducerSequencer {
        MultiProducerSequencer::new(buffer_size, Arc::new(BusySpinWaitStrategy::new())).unwrap()
    }

    #[test]
    fn test_rejects_invalid_buffer_size() {
        let ws: Arc<dyn WaitStrategy> = Arc::new(BlockingWaitStrategy::new());
        assert_eq!(
            SingleProducerSequencer::new(6, ws.clone()).unwrap_err(),
            DisruptorError::InvalidBufferSize(6)
        );
        assert_eq!(
            MultiProducerSequencer::new(0, ws).unwrap_err(),
            DisruptorError::InvalidBufferSize(0)
        );
    }

    #[test]
    fn test_single_producer_claim_and_publish() {
        let sequencer = single(8);
        assert_eq!(sequencer.get_cursor(), -1);

        assert_eq!(sequencer.next().unwrap(), 0);
        assert!(!sequencer.is_available(0));
        sequencer.publish(0);
        assert!(sequencer.is_available(0));
        assert_eq!(sequencer.get_cursor(), 0);

        assert_eq!(sequencer.next_n(3).unwrap(), 3);
        sequencer.publish_range(1, 3);
        assert_eq!(sequencer.get_cursor(), 3);
        assert_eq!(sequencer.get_highest_published_sequence(1, 3), 3);
    }

    #[test]
    fn test_rejects_invalid_claim_count() {
        let sp = single(4);
        let mp = multi(4);

        for n in [0, -1, 5] {
            assert!(matches!(
                sp.next_n(n),
                Err(DisruptorError::InvalidClaimCount { .. })
            ));
            assert!(matches!(
                mp.try_next_n(n),
                Err(DisruptorError::InvalidClaimCount { .. })
            ));
        }
    }

    #[test]
    fn test_without_gating_sequences_never_blocks() {
        let sequencer = single(4);
        for expected in 0..12 {
            assert_eq!(sequencer.next().unwrap(), expected);
            sequencer.publish(expected);
        }
        assert_eq!(sequencer.remaining_capacity(), 4);
    }

    #[test]
    fn test_single_producer_try_next_reports_capacity() {
        let sequencer = single(4);
        let consumer = Arc::new(Sequence::new_with_initial_value());
        sequencer.add_gating_sequences(&[consumer.clone()]);

        assert_eq!(sequencer.try_next_n(4).unwrap(), 3);
        sequencer.publish(3);
        assert_eq!(sequencer.remaining_capacity(), 0);
        assert!(!sequencer.has_available_capacity(1));
        assert_eq!(sequencer.try_next(), Err(DisruptorError::InsufficientCapacity));

        consumer.set(1);
        assert!(sequencer.has_available_capacity(2));
        assert!(!sequencer.has_available_capacity(3));
        assert_eq!(sequencer.remaining_capacity(), 2);
        assert_eq!(sequencer.try_next_n(2).unwrap(), 5);
    }

    #[test]
    fn test_single_producer_next_waits_for_gating_sequence() {
        let sequencer = Arc::new(single(4));
        let consumer = Arc::new(Sequence::new_with_initial_value());
        sequencer.add_gating_sequences(&[consumer.clone()]);

        let hi = sequencer.next_n(4).unwrap();
        sequencer.publish(hi);

        let producer = {
            let sequencer = sequencer.clone();
            thread::spawn(move || sequencer.next().unwrap())
        };

        thread::sleep(Duration::from_millis(20));
        assert!(!producer.is_finished());

        consumer.set(0);
        assert_eq!(producer.join().unwrap(), 4);
    }

    #[test]
    fn test_claim_resets_stale_cache() {
        let sequencer = single(4);
        let consumer = Arc::new(Sequence::new(10));
        sequencer.add_gating_sequences(&[consumer.clone()]);
        consumer.set(10);

        sequencer.claim(10);
        assert_eq!(sequencer.next().unwrap(), 11);

        // Cached gating value is now ahead of the claim position.
        sequencer.claim(2);
        assert!(sequencer.has_available_capacity(4));
        assert_eq!(sequencer.next().unwrap(), 3);
    }

    #[test]
    fn test_add_gating_sequence_starts_at_cursor() {
        let sequencer = single(8);
        for s in 0..5 {
            sequencer.next().unwrap();
            sequencer.publish(s);
        }

        let late = Arc::new(Sequence::new_with_initial_value());
        sequencer.add_gating_sequences(&[late.clone()]);
        assert_eq!(late.get(), 4);
        assert_eq!(sequencer.get_minimum_sequence(), 4);
    }

    #[test]
    fn test_remove_gating_sequence_removes_all_occurrences() {
        let sequencer = multi(8);
        let a = Arc::new(Sequence::new_with_initial_value());
        let b = Arc::new(Sequence::new_with_initial_value());
        sequencer.add_gating_sequences(&[a.clone(), b.clone(), a.clone()]);

        assert!(sequencer.remove_gating_sequence(&a));
        assert!(!sequencer.remove_gating_sequence(&a));
        assert_eq!(sequencer.core.gating_snapshot().len(), 1);
        assert!(sequencer.remove_gating_sequence(&b));
        assert!(sequencer.core.gating_snapshot().is_empty());
    }

    #[test]
    fn test_multi_producer_out_of_order_publish() {
        let sequencer = multi(8);

        let a = sequencer.next_n(2).unwrap();
        let b = sequencer.next_n(2).unwrap();
        assert_eq!((a, b), (1, 3));
        assert_eq!(sequencer.get_cursor(), 3);

        // Second claimer finishes first.
        sequencer.publish_range(2, 3);
        assert_eq!(sequencer.get_highest_published_sequence(0, 3), -1);
        assert!(sequencer.is_available(2));
        assert!(!sequencer.is_available(0));

        sequencer.publish_range(0, 1);
        assert_eq!(sequencer.get_highest_published_sequence(0, 3), 3);
    }

    #[test]
    fn test_multi_producer_availability_tracks_laps() {
        let sequencer = multi(4);
        let consumer = Arc::new(Sequence::new_with_initial_value());
        sequencer.add_gating_sequences(&[consumer.clone()]);

        for s in 0..4 {
            assert_eq!(sequencer.next().unwrap(), s);
            sequencer.publish(s);
        }
        consumer.set(3);

        // Same slot as sequence 0, but one lap later.
        assert_eq!(sequencer.next().unwrap(), 4);
        assert!(!sequencer.is_available(4));
        sequencer.publish(4);
        assert!(sequencer.is_available(4));
        assert!(!sequencer.is_available(0));
    }

    #[test]
    fn test_multi_producer_try_next_reports_capacity() {
        let sequencer = multi(4);
        let consumer = Arc::new(Sequence::new_with_initial_value());
        sequencer.add_gating_sequences(&[consumer.clone()]);

        assert_eq!(sequencer.try_next_n(3).unwrap(), 2);
        assert_eq!(sequencer.remaining_capacity(), 1);
        assert_eq!(
            sequencer.try_next_n(2),
            Err(DisruptorError::InsufficientCapacity)
        );
        assert_eq!(sequencer.try_next().unwrap(), 3);
        assert_eq!(sequencer.try_next(), Err(DisruptorError::InsufficientCapacity));
    }

    #[test]
    fn test_multi_producer_concurrent_claims_are_disjoint() {
        let sequencer = Arc::new(multi(1024));
        let mut handles = vec![];

        for _ in 0..4 {
            let sequencer = sequencer.clone();
            handles.push(thread::spawn(move || {
                let mut claimed = Vec::new();
                for _ in 0..100 {
                    let hi = sequencer.next_n(2).unwrap();
                    sequencer.publish_range(hi - 1, hi);
                    claimed.push(hi - 1);
                    claimed.push(hi);
                }
                claimed
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            for sequence in handle.join().unwrap() {
                assert!(seen.insert(sequence), "sequence {sequence} claimed twice");
            }
        }
        assert_eq!(seen.len(), 800);
        assert_eq!(sequencer.get_highest_published_sequence(0, 799), 799);
    }

    #[test]
    fn test_barrier_uses_sequencer_cursor() {
        let sequencer = Arc::new(single(8));
        let barrier = sequencer.clone().new_barrier(&[]);

        sequencer.next().unwrap();
        sequencer.publish(0);
        assert_eq!(barrier.get_cursor(), 0);
        assert_eq!(barrier.wait_for(0).unwrap(), 0);
    }
}
