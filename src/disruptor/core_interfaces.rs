//! Core Interfaces for the Disruptor Pattern
//!
//! This module defines the small interfaces shared by sequencers, ring buffers
//! and event processors: cursor access, position claiming and publishing, and
//! slot access by sequence.

use crate::disruptor::Result;

/// Provides access to a cursor value
///
/// Implemented by anything that owns a position a consumer can be gated on.
pub trait Cursored {
    /// Get the current cursor value
    ///
    /// # Returns
    /// The current cursor value as a sequence number
    fn get_cursor(&self) -> i64;
}

/// Operations related to sequencing items in a ring buffer
///
/// It defines the core operations for claiming sequences and publishing events.
pub trait Sequenced {
    /// Get the capacity of the data structure
    ///
    /// # Returns
    /// The size of the ring buffer
    fn get_buffer_size(&self) -> usize;

    /// Check if the buffer has capacity for additional sequences
    ///
    /// This is a concurrent method, so the response should only be taken
    /// as an indication of available capacity.
    ///
    /// # Arguments
    /// * `required_capacity` - The number of sequences needed
    ///
    /// # Returns
    /// True if the buffer has capacity, false otherwise
    fn has_available_capacity(&self, required_capacity: usize) -> bool;

    /// Get the remaining capacity for this sequencer
    ///
    /// # Returns
    /// The number of slots remaining
    fn remaining_capacity(&self) -> i64;

    /// Claim the next event in sequence for publishing
    ///
    /// Blocks (spins) while the ring is full.
    ///
    /// # Returns
    /// The claimed sequence value
    fn next(&self) -> Result<i64> {
        self.next_n(1)
    }

    /// Claim the next n events in sequence for publishing
    ///
    /// This is for batch event producing. Using batch producing requires
    /// careful coordination:
    ///
    /// ```ignore
    /// let n = 10;
    /// let hi = sequencer.next_n(n)?;
    /// let lo = hi - (n - 1);
    /// for sequence in lo..=hi {
    ///     // Do work
    /// }
    /// sequencer.publish_range(lo, hi);
    /// ```
    ///
    /// # Arguments
    /// * `n` - The number of sequences to claim
    ///
    /// # Returns
    /// The highest claimed sequence value
    ///
    /// # Errors
    /// Returns `DisruptorError::InvalidClaimCount` if `n` is less than 1 or
    /// greater than the buffer size
    fn next_n(&self, n: i64) -> Result<i64>;

    /// Attempt to claim the next event in sequence for publishing
    ///
    /// # Errors
    /// Returns `DisruptorError::InsufficientCapacity` if the ring is full
    fn try_next(&self) -> Result<i64> {
        self.try_next_n(1)
    }

    /// Attempt to claim the next n events in sequence for publishing
    ///
    /// Will return the highest numbered slot if there are at least n slots available.
    ///
    /// # Arguments
    /// * `n` - The number of sequences to claim
    ///
    /// # Errors
    /// Returns `DisruptorError::InsufficientCapacity` if fewer than `n` slots
    /// are free, or `DisruptorError::InvalidClaimCount` for a bad `n`
    fn try_next_n(&self, n: i64) -> Result<i64>;

    /// Publish a sequence
    ///
    /// Call when the event has been filled.
    ///
    /// # Arguments
    /// * `sequence` - The sequence to be published
    fn publish(&self, sequence: i64);

    /// Batch publish sequences
    ///
    /// Called when all of the events have been filled.
    ///
    /// # Arguments
    /// * `lo` - First sequence number to publish
    /// * `hi` - Last sequence number to publish
    fn publish_range(&self, lo: i64, hi: i64);
}

/// Provides access to the slot stored at a sequence
///
/// Event processors depend on this rather than on the ring buffer itself.
pub trait DataProvider<T>: Send + Sync {
    /// Get the data item at the specified sequence
    ///
    /// # Arguments
    /// * `sequence` - The sequence at which to find the data
    ///
    /// # Returns
    /// The data item located at that sequence
    ///
    /// # Safety
    /// No `&mut` to the slot may be alive while the reference is used: the
    /// sequence must be published, and the caller must be gating producers
    /// (or hold them off some other way) so that the slot is not reclaimed.
    /// Work processors hand out `&mut T`, so a slot owned by a work pool may
    /// not be read in parallel with it.
    unsafe fn get(&self, sequence: i64) -> &T;

    /// Get mutable access to the data item at the specified sequence
    ///
    /// # Safety
    /// The caller must hold the exclusive right to the slot: either it claimed
    /// the sequence and has not yet published it, or it is the only consumer
    /// allowed to mutate the published slot and no other reference is alive.
    #[allow(clippy::mut_from_ref)]
    unsafe fn get_mut(&self, sequence: i64) -> &mut T;
}
