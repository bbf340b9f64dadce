//! Sequence Barrier Implementation
//!
//! This module provides sequence barriers for coordinating dependencies between
//! event processors. A barrier answers "up to which sequence is it safe to read"
//! by combining the sequencer's cursor, the upstream consumers this processor must
//! not overtake and, for multi producer rings, the contiguous published frontier.
//! It also carries the alert flag used to halt waiting processors.

use crate::disruptor::{
    DisruptorError, FixedSequenceGroup, Result, Sequence, Sequencer, WaitStrategy,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Coordination barrier for managing dependencies between event processors
pub trait SequenceBarrier: Send + Sync {
    /// Wait for the given sequence to become available
    ///
    /// # Arguments
    /// * `sequence` - The sequence to wait for
    ///
    /// # Returns
    /// The highest sequence that can be read, which may be greater than
    /// requested, or lower when the wait strategy returns early
    ///
    /// # Errors
    /// Returns `DisruptorError::Alert` if the barrier was alerted, or
    /// `DisruptorError::Timeout` if the wait strategy gave up
    fn wait_for(&self, sequence: i64) -> Result<i64>;

    /// Get the current value of the tracked sequences
    fn get_cursor(&self) -> i64;

    /// Check if this barrier has been alerted
    fn is_alerted(&self) -> bool;

    /// Alert this barrier and wake any waiting threads
    fn alert(&self);

    /// Clear the alert status
    fn clear_alert(&self);

    /// Check the alert flag
    ///
    /// # Errors
    /// Returns `DisruptorError::Alert` if the barrier has been alerted
    fn check_alert(&self) -> Result<()>;
}

/// Standard implementation of a sequence barrier
///
/// When created without upstream sequences the barrier tracks the sequencer's
/// cursor; otherwise it tracks the minimum of the upstream sequences.
pub struct ProcessingSequenceBarrier {
    wait_strategy: Arc<dyn WaitStrategy>,
    dependent_sequence: FixedSequenceGroup,
    alerted: AtomicBool,
    sequencer: Arc<dyn Sequencer>,
    cursor: Arc<Sequence>,
}

impl ProcessingSequenceBarrier {
    /// Create a new processing sequence barrier
    ///
    /// # Arguments
    /// * `sequencer` - The sequencer used to resolve the published frontier
    /// * `wait_strategy` - The wait strategy to use
    /// * `cursor` - The sequencer's cursor
    /// * `dependent_sequences` - Upstream sequences this barrier must not overtake
    pub fn new(
        sequencer: Arc<dyn Sequencer>,
        wait_strategy: Arc<dyn WaitStrategy>,
        cursor: Arc<Sequence>,
        dependent_sequences: &[Arc<Sequence>],
    ) -> Self {
        let dependent_sequence = if dependent_sequences.is_empty() {
            FixedSequenceGroup::new(&[Arc::clone(&cursor)])
        } else {
            FixedSequenceGroup::new(dependent_sequences)
        };

        Self {
            wait_strategy,
            dependent_sequence,
            alerted: AtomicBool::new(false),
            sequencer,
            cursor,
        }
    }
}

impl SequenceBarrier for ProcessingSequenceBarrier {
    fn wait_for(&self, sequence: i64) -> Result<i64> {
        self.check_alert()?;

        let available_sequence =
            self.wait_strategy
                .wait_for(sequence, &self.cursor, &self.dependent_sequence, self)?;

        if available_sequence < sequence {
            return Ok(available_sequence);
        }

        Ok(self
            .sequencer
            .get_highest_published_sequence(sequence, available_sequence))
    }

    fn get_cursor(&self) -> i64 {
        self.dependent_sequence.get()
    }

    fn is_alerted(&self) -> bool {
        self.alerted.load(Ordering::Acquire)
    }

    fn alert(&self) {
        self.alerted.store(true, Ordering::Release);
        self.wait_strategy.signal_all_when_blocking();
    }

    fn clear_alert(&self) {
        self.alerted.store(false, Ordering::Release);
    }

    fn check_alert(&self) -> Result<()> {
        if self.is_alerted() {
            Err(DisruptorError::Alert)
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for ProcessingSequenceBarrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessingSequenceBarrier")
            .field("cursor", &self.cursor.get())
            .field("dependent_sequence", &self.dependent_sequence.get())
            .field("alerted", &self.is_alerted())
            .finish()
    }
}
