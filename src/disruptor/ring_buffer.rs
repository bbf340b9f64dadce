//! Ring Buffer Implementation
//!
//! This module provides the core ring buffer for the Disruptor pattern.
//! The ring buffer is a pre-allocated circular array of events. It maps a
//! sequence onto a slot with a mask and delegates every piece of position
//! bookkeeping (claiming, publishing, gating) to its [`Sequencer`].

use crate::disruptor::{
    Cursored, DataProvider, DisruptorError, EventFactory, EventTranslator, EventTranslatorOneArg,
    MultiProducerSequencer, ProducerType, Result, Sequence, SequenceBarrier, Sequenced, Sequencer,
    SingleProducerSequencer, WaitStrategy,
};
use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::sync::Arc;

/// One event, aligned and padded to whole cache lines
type Slot<T> = CachePadded<UnsafeCell<T>>;

/// Read-mostly fields, kept together on their own cache line
struct RingBufferFields<T> {
    index_mask: i64,
    entries: Box<[Slot<T>]>,
    sequencer: Arc<dyn Sequencer>,
}

/// The core ring buffer for storing events
///
/// All events are created up front by an [`EventFactory`] and then reused:
/// producers claim a sequence, fill the slot in place and publish it;
/// consumers read it once a barrier reports it available.
///
/// Every slot sits on its own cache lines, so neither end of the array shares
/// a line with neighbouring allocations and adjacent slots never false-share.
///
/// # Type Parameters
/// * `T` - The event type stored in the buffer
pub struct RingBuffer<T> {
    fields: CachePadded<RingBufferFields<T>>,
}

// SAFETY: slots are only mutated by the holder of a claimed, unpublished
// sequence or by the work processor that claimed it; every other access is a
// shared read behind the unsafe `get`.
unsafe impl<T: Send> Send for RingBuffer<T> {}
unsafe impl<T: Send + Sync> Sync for RingBuffer<T> {}

/// Publishes `lo..=hi` when dropped, so claimed slots are never leaked
struct PublishGuard<'a> {
    sequencer: &'a dyn Sequencer,
    lo: i64,
    hi: i64,
}

impl Drop for PublishGuard<'_> {
    fn drop(&mut self) {
        self.sequencer.publish_range(self.lo, self.hi);
    }
}

impl<T> RingBuffer<T> {
    /// Create a ring buffer over an existing sequencer
    ///
    /// # Arguments
    /// * `event_factory` - Called once per slot to pre-populate the buffer
    /// * `sequencer` - The sequencer that owns all position bookkeeping
    ///
    /// # Errors
    /// Returns `DisruptorError::InvalidBufferSize` if the sequencer's buffer
    /// size is not a power of 2
    pub fn new<F>(event_factory: F, sequencer: Arc<dyn Sequencer>) -> Result<Self>
    where
        F: EventFactory<T>,
    {
        let buffer_size = sequencer.get_buffer_size();
        if !crate::disruptor::is_power_of_two(buffer_size) {
            return Err(DisruptorError::InvalidBufferSize(buffer_size));
        }

        let entries: Box<[Slot<T>]> = (0..buffer_size)
            .map(|_| CachePadded::new(UnsafeCell::new(event_factory.new_instance())))
            .collect();

        Ok(Self {
            fields: CachePadded::new(RingBufferFields {
                index_mask: (buffer_size - 1) as i64,
                entries,
                sequencer,
            }),
        })
    }

    /// Create a ring buffer for exactly one publishing thread
    ///
    /// # Errors
    /// Returns `DisruptorError::InvalidBufferSize` if `buffer_size` is not a power of 2
    pub fn create_single_producer<F>(
        event_factory: F,
        buffer_size: usize,
        wait_strategy: Arc<dyn WaitStrategy>,
    ) -> Result<Self>
    where
        F: EventFactory<T>,
    {
        let sequencer = SingleProducerSequencer::new(buffer_size, wait_strategy)?;
        Self::new(event_factory, Arc::new(sequencer))
    }

    /// Create a ring buffer for any number of publishing threads
    ///
    /// # Errors
    /// Returns `DisruptorError::InvalidBufferSize` if `buffer_size` is not a power of 2
    pub fn create_multi_producer<F>(
        event_factory: F,
        buffer_size: usize,
        wait_strategy: Arc<dyn WaitStrategy>,
    ) -> Result<Self>
    where
        F: EventFactory<T>,
    {
        let sequencer = MultiProducerSequencer::new(buffer_size, wait_strategy)?;
        Self::new(event_factory, Arc::new(sequencer))
    }

    /// Create a ring buffer with the sequencer matching `producer_type`
    ///
    /// # Errors
    /// Returns `DisruptorError::InvalidBufferSize` if `buffer_size` is not a power of 2
    pub fn create<F>(
        producer_type: ProducerType,
        event_factory: F,
        buffer_size: usize,
        wait_strategy: Arc<dyn WaitStrategy>,
    ) -> Result<Self>
    where
        F: EventFactory<T>,
    {
        match producer_type {
            ProducerType::Single => {
                Self::create_single_producer(event_factory, buffer_size, wait_strategy)
            }
            ProducerType::Multi => {
                Self::create_multi_producer(event_factory, buffer_size, wait_strategy)
            }
        }
    }

    #[inline]
    fn slot(&self, sequence: i64) -> &Slot<T> {
        let index = (sequence & self.fields.index_mask) as usize;
        // SAFETY: the mask keeps the index below entries.len().
        unsafe { self.fields.entries.get_unchecked(index) }
    }

    /// Get a reference to the event at the specified sequence
    ///
    /// # Safety
    /// Nothing may write the slot while the reference is alive. The sequence
    /// must be published and must not be reclaimable by producers, which holds
    /// when the caller's sequence gates the ring or no producer is running.
    /// A slot handed to a [`WorkProcessor`](crate::disruptor::WorkProcessor)
    /// may not be read until that worker has moved past it.
    #[inline]
    pub unsafe fn get(&self, sequence: i64) -> &T {
        &*self.slot(sequence).get()
    }

    /// Get a raw pointer to the event at the specified sequence
    ///
    /// # Safety
    /// The caller must ensure that no other reference to the slot is alive
    /// while the pointer is dereferenced mutably, which holds for a claimed
    /// but unpublished sequence.
    #[inline]
    pub unsafe fn get_mut_unchecked(&self, sequence: i64) -> *mut T {
        self.slot(sequence).get()
    }

    /// Set the claim position and get the slot at it
    ///
    /// Used to pre-fill a ring buffer during start-up, before any producer or
    /// consumer is running.
    ///
    /// # Safety
    /// No other thread may be accessing the ring buffer.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn claim_and_get_preallocated(&self, sequence: i64) -> &mut T {
        self.fields.sequencer.claim(sequence);
        &mut *self.get_mut_unchecked(sequence)
    }

    /// Get the number of slots in the buffer
    pub fn buffer_size(&self) -> usize {
        self.fields.entries.len()
    }

    /// Get the sequencer backing this ring buffer
    pub fn sequencer(&self) -> &Arc<dyn Sequencer> {
        &self.fields.sequencer
    }

    /// Check if a sequence has been published
    pub fn is_published(&self, sequence: i64) -> bool {
        self.fields.sequencer.is_available(sequence)
    }

    /// Add consumer sequences the producers must not overtake
    pub fn add_gating_sequences(&self, gating_sequences: &[Arc<Sequence>]) {
        self.fields.sequencer.add_gating_sequences(gating_sequences);
    }

    /// Remove a gating sequence
    ///
    /// # Returns
    /// True if the sequence was gating this ring buffer
    pub fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool {
        self.fields.sequencer.remove_gating_sequence(sequence)
    }

    /// Create a barrier for a consumer of this ring buffer
    ///
    /// # Arguments
    /// * `sequences_to_track` - Upstream consumer sequences; empty for a
    ///   consumer that reads straight behind the producers
    pub fn new_barrier(&self, sequences_to_track: &[Arc<Sequence>]) -> Arc<dyn SequenceBarrier> {
        Arc::clone(&self.fields.sequencer).new_barrier(sequences_to_track)
    }

    /// Get the minimum sequence across the gating sequences
    pub fn get_minimum_gating_sequence(&self) -> i64 {
        self.fields.sequencer.get_minimum_sequence()
    }

    /// Claim one slot, translate into it and publish it
    ///
    /// The slot is published even if the translator panics.
    pub fn publish_event<E>(&self, translator: E) -> Result<()>
    where
        E: EventTranslator<T>,
    {
        let sequence = self.fields.sequencer.next()?;
        self.translate_and_publish(&translator, sequence);
        Ok(())
    }

    /// Like [`publish_event`](Self::publish_event) but never blocks
    ///
    /// # Errors
    /// Returns `DisruptorError::InsufficientCapacity` if the ring is full
    pub fn try_publish_event<E>(&self, translator: E) -> Result<()>
    where
        E: EventTranslator<T>,
    {
        let sequence = self.fields.sequencer.try_next()?;
        self.translate_and_publish(&translator, sequence);
        Ok(())
    }

    /// Claim one slot, translate `arg0` into it and publish it
    pub fn publish_event_with<A, E>(&self, translator: E, arg0: A) -> Result<()>
    where
        E: EventTranslatorOneArg<T, A>,
    {
        let sequence = self.fields.sequencer.next()?;
        let _guard = self.publish_guard(sequence, sequence);
        // SAFETY: `sequence` is claimed and not yet published.
        translator.translate_to(unsafe { &mut *self.get_mut_unchecked(sequence) }, sequence, arg0);
        Ok(())
    }

    /// Like [`publish_event_with`](Self::publish_event_with) but never blocks
    ///
    /// # Errors
    /// Returns `DisruptorError::InsufficientCapacity` if the ring is full
    pub fn try_publish_event_with<A, E>(&self, translator: E, arg0: A) -> Result<()>
    where
        E: EventTranslatorOneArg<T, A>,
    {
        let sequence = self.fields.sequencer.try_next()?;
        let _guard = self.publish_guard(sequence, sequence);
        // SAFETY: `sequence` is claimed and not yet published.
        translator.translate_to(unsafe { &mut *self.get_mut_unchecked(sequence) }, sequence, arg0);
        Ok(())
    }

    /// Publish a batch of events, one translator per slot
    ///
    /// # Arguments
    /// * `translators` - Translators to apply
    /// * `batch_starts_at` - Index of the first translator to use
    /// * `batch_size` - Number of translators (and slots) to use
    ///
    /// # Errors
    /// Returns `DisruptorError::InvalidBatch` if the batch is empty, larger
    /// than the ring, or runs past the end of `translators`; nothing is
    /// claimed in that case
    pub fn publish_events<E>(
        &self,
        translators: &[E],
        batch_starts_at: usize,
        batch_size: usize,
    ) -> Result<()>
    where
        E: EventTranslator<T>,
    {
        self.check_batch(translators.len(), batch_starts_at, batch_size)?;
        let final_sequence = self.fields.sequencer.next_n(batch_size as i64)?;
        self.translate_and_publish_batch(
            &translators[batch_starts_at..batch_starts_at + batch_size],
            final_sequence,
        );
        Ok(())
    }

    /// Like [`publish_events`](Self::publish_events) but never blocks
    ///
    /// # Errors
    /// Returns `DisruptorError::InsufficientCapacity` if the ring cannot take
    /// the whole batch, or `DisruptorError::InvalidBatch` as for `publish_events`
    pub fn try_publish_events<E>(
        &self,
        translators: &[E],
        batch_starts_at: usize,
        batch_size: usize,
    ) -> Result<()>
    where
        E: EventTranslator<T>,
    {
        self.check_batch(translators.len(), batch_starts_at, batch_size)?;
        let final_sequence = self.fields.sequencer.try_next_n(batch_size as i64)?;
        self.translate_and_publish_batch(
            &translators[batch_starts_at..batch_starts_at + batch_size],
            final_sequence,
        );
        Ok(())
    }

    /// Publish a batch of events, translating one argument per slot
    ///
    /// # Errors
    /// Returns `DisruptorError::InvalidBatch` if the batch is empty, larger
    /// than the ring, or runs past the end of `args`
    pub fn publish_events_with<A, E>(
        &self,
        translator: E,
        batch_starts_at: usize,
        batch_size: usize,
        args: &[A],
    ) -> Result<()>
    where
        A: Clone,
        E: EventTranslatorOneArg<T, A>,
    {
        self.check_batch(args.len(), batch_starts_at, batch_size)?;
        let final_sequence = self.fields.sequencer.next_n(batch_size as i64)?;
        self.translate_and_publish_batch_with(
            &translator,
            &args[batch_starts_at..batch_starts_at + batch_size],
            final_sequence,
        );
        Ok(())
    }

    /// Like [`publish_events_with`](Self::publish_events_with) but never blocks
    ///
    /// # Errors
    /// Returns `DisruptorError::InsufficientCapacity` if the ring cannot take
    /// the whole batch, or `DisruptorError::InvalidBatch` for bad bounds
    pub fn try_publish_events_with<A, E>(
        &self,
        translator: E,
        batch_starts_at: usize,
        batch_size: usize,
        args: &[A],
    ) -> Result<()>
    where
        A: Clone,
        E: EventTranslatorOneArg<T, A>,
    {
        self.check_batch(args.len(), batch_starts_at, batch_size)?;
        let final_sequence = self.fields.sequencer.try_next_n(batch_size as i64)?;
        self.translate_and_publish_batch_with(
            &translator,
            &args[batch_starts_at..batch_starts_at + batch_size],
            final_sequence,
        );
        Ok(())
    }

    fn check_batch(&self, available: usize, batch_starts_at: usize, batch_size: usize) -> Result<()> {
        if batch_size == 0 {
            return Err(DisruptorError::InvalidBatch(
                "batch size must be at least 1".to_string(),
            ));
        }
        if batch_size > self.buffer_size() {
            return Err(DisruptorError::InvalidBatch(format!(
                "batch size {batch_size} is larger than the buffer size {}",
                self.buffer_size()
            )));
        }
        let overruns = match batch_starts_at.checked_add(batch_size) {
            Some(end) => end > available,
            None => true,
        };
        if overruns {
            return Err(DisruptorError::InvalidBatch(format!(
                "batch of {batch_size} starting at {batch_starts_at} overruns {available} available entries"
            )));
        }
        Ok(())
    }

    fn publish_guard(&self, lo: i64, hi: i64) -> PublishGuard<'_> {
        PublishGuard {
            sequencer: self.fields.sequencer.as_ref(),
            lo,
            hi,
        }
    }

    fn translate_and_publish<E>(&self, translator: &E, sequence: i64)
    where
        E: EventTranslator<T>,
    {
        let _guard = self.publish_guard(sequence, sequence);
        // SAFETY: `sequence` is claimed and not yet published.
        translator.translate_to(unsafe { &mut *self.get_mut_unchecked(sequence) }, sequence);
    }

    fn translate_and_publish_batch<E>(&self, translators: &[E], final_sequence: i64)
    where
        E: EventTranslator<T>,
    {
        let initial_sequence = final_sequence - (translators.len() as i64 - 1);
        let _guard = self.publish_guard(initial_sequence, final_sequence);
        for (sequence, translator) in (initial_sequence..=final_sequence).zip(translators) {
            // SAFETY: the whole range is claimed and not yet published.
            translator.translate_to(unsafe { &mut *self.get_mut_unchecked(sequence) }, sequence);
        }
    }

    fn translate_and_publish_batch_with<A, E>(&self, translator: &E, args: &[A], final_sequence: i64)
    where
        A: Clone,
        E: EventTranslatorOneArg<T, A>,
    {
        let initial_sequence = final_sequence - (args.len() as i64 - 1);
        let _guard = self.publish_guard(initial_sequence, final_sequence);
        for (sequence, arg) in (initial_sequence..=final_sequence).zip(args) {
            // SAFETY: the whole range is claimed and not yet published.
            translator.translate_to(
                unsafe { &mut *self.get_mut_unchecked(sequence) },
                sequence,
                arg.clone(),
            );
        }
    }
}

impl<T> Cursored for RingBuffer<T> {
    fn get_cursor(&self) -> i64 {
        self.fields.sequencer.get_cursor()
    }
}

impl<T> Sequenced for RingBuffer<T> {
    fn get_buffer_size(&self) -> usize {
        self.buffer_size()
    }

    fn has_available_capacity(&self, required_capacity: usize) -> bool {
        self.fields.sequencer.has_available_capacity(required_capacity)
    }

    fn remaining_capacity(&self) -> i64 {
        self.fields.sequencer.remaining_capacity()
    }

    fn next(&self) -> Result<i64> {
        self.fields.sequencer.next()
    }

    fn next_n(&self, n: i64) -> Result<i64> {
        self.fields.sequencer.next_n(n)
    }

    fn try_next(&self) -> Result<i64> {
        self.fields.sequencer.try_next()
    }

    fn try_next_n(&self, n: i64) -> Result<i64> {
        self.fields.sequencer.try_next_n(n)
    }

    fn publish(&self, sequence: i64) {
        self.fields.sequencer.publish(sequence);
    }

    fn publish_range(&self, lo: i64, hi: i64) {
        self.fields.sequencer.publish_range(lo, hi);
    }
}

impl<T: Send + Sync> DataProvider<T> for RingBuffer<T> {
    #[inline]
    unsafe fn get(&self, sequence: i64) -> &T {
        RingBuffer::get(self, sequence)
    }

    #[inline]
    unsafe fn get_mut(&self, sequence: i64) -> &mut T {
        &mut *self.get_mut_unchecked(sequence)
    }
}

impl<T> std::fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("buffer_size", &self.buffer_size())
            .field("sequencer", &self.fields.sequencer)
            .finish()
    }
}
