//! Event Handler Implementation
//!
//! This module provides the consumer callbacks driven by event processors:
//! [`EventHandler`] for the batch (broadcast) model, where every handler sees
//! every event, and [`WorkHandler`] for the work-queue model, where each event
//! goes to exactly one handler of a pool.
//!
//! Optional capabilities (lifecycle notification, timeout notification, early
//! release) are default trait methods; handlers override the ones they need.
//!
//! Broadcast handlers see events through a shared reference, since several
//! processors may read the same slot at once. A pipeline stage that annotates
//! events for the stages behind it does so through interior mutability
//! (atomics or locks inside the event type). Work handlers get `&mut T`:
//! the claim on the work sequence makes them the only reader of that slot.

use crate::disruptor::{Result, Sequence};
use std::marker::PhantomData;
use std::sync::Arc;

/// Handler for processing events from a batch event processor
///
/// # Type Parameters
/// * `T` - The event type that will be processed
pub trait EventHandler<T>: Send {
    /// Process an event
    ///
    /// # Arguments
    /// * `event` - The event to process, shared with any parallel consumers
    /// * `sequence` - The sequence number of the event in the ring buffer
    /// * `end_of_batch` - True if this is the last event in the current batch
    ///
    /// # Errors
    /// A returned error is a fault for this event only: it is reported to the
    /// processor's exception handler and processing moves on to the next event
    ///
    /// # Examples
    /// ```
    /// use batchring::disruptor::{EventHandler, Result};
    ///
    /// #[derive(Default)]
    /// struct Price {
    ///     value: i64,
    /// }
    ///
    /// struct Journal {
    ///     pending: Vec<i64>,
    /// }
    ///
    /// impl EventHandler<Price> for Journal {
    ///     fn on_event(&mut self, event: &Price, _sequence: i64, end_of_batch: bool) -> Result<()> {
    ///         self.pending.push(event.value);
    ///         if end_of_batch {
    ///             self.pending.clear();
    ///         }
    ///         Ok(())
    ///     }
    /// }
    /// ```
    fn on_event(&mut self, event: &T, sequence: i64, end_of_batch: bool) -> Result<()>;

    /// Called once on the processor thread before the first event of a `run()`
    fn on_start(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called once on the processor thread when a `run()` ends
    fn on_shutdown(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called when the wait strategy times out instead of delivering events
    ///
    /// # Arguments
    /// * `sequence` - The processor's current sequence
    fn on_timeout(&mut self, _sequence: i64) -> Result<()> {
        Ok(())
    }

    /// Receive the processor's own sequence at construction time
    ///
    /// Handlers that finish work before the end of a batch can set it
    /// themselves so that downstream consumers see progress earlier.
    fn set_sequence_callback(&mut self, _sequence_callback: Arc<Sequence>) {}
}

/// Handler for processing events from a work processor
///
/// # Type Parameters
/// * `T` - The event type that will be processed
pub trait WorkHandler<T>: Send {
    /// Process an event claimed by this worker
    ///
    /// # Errors
    /// A returned error is reported to the processor's exception handler
    fn on_event(&mut self, event: &mut T) -> Result<()>;

    /// Called once on the processor thread before the first event of a `run()`
    fn on_start(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called once on the processor thread when a `run()` ends
    fn on_shutdown(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called when the wait strategy times out instead of delivering events
    fn on_timeout(&mut self, _sequence: i64) -> Result<()> {
        Ok(())
    }

    /// Receive a releaser for handlers that complete work asynchronously
    fn set_event_releaser(&mut self, _event_releaser: EventReleaser) {}
}

/// Releases a work processor's hold on the work pool
///
/// Calling [`release`](EventReleaser::release) moves the processor's sequence
/// to `i64::MAX`, so it no longer gates producers or the other workers. The
/// handler then owns publishing its real progress.
#[derive(Debug, Clone)]
pub struct EventReleaser {
    sequence: Arc<Sequence>,
}

impl EventReleaser {
    pub(crate) fn new(sequence: Arc<Sequence>) -> Self {
        Self { sequence }
    }

    /// Stop gating on the current event
    pub fn release(&self) {
        self.sequence.set(i64::MAX);
    }
}

/// Batch event handler created from a closure
///
/// # Type Parameters
/// * `T` - The event type
/// * `F` - The closure type
pub struct ClosureEventHandler<T, F>
where
    F: FnMut(&T, i64, bool) -> Result<()> + Send,
{
    handler: F,
    _phantom: PhantomData<fn(&T)>,
}

impl<T, F> ClosureEventHandler<T, F>
where
    F: FnMut(&T, i64, bool) -> Result<()> + Send,
{
    /// Create a new closure-based event handler
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<T, F> EventHandler<T> for ClosureEventHandler<T, F>
where
    F: FnMut(&T, i64, bool) -> Result<()> + Send,
{
    fn on_event(&mut self, event: &T, sequence: i64, end_of_batch: bool) -> Result<()> {
        (self.handler)(event, sequence, end_of_batch)
    }
}

/// Work handler created from a closure
pub struct ClosureWorkHandler<T, F>
where
    F: FnMut(&mut T) -> Result<()> + Send,
{
    handler: F,
    _phantom: PhantomData<fn(&mut T)>,
}

impl<T, F> ClosureWorkHandler<T, F>
where
    F: FnMut(&mut T) -> Result<()> + Send,
{
    /// Create a new closure-based work handler
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<T, F> WorkHandler<T> for ClosureWorkHandler<T, F>
where
    F: FnMut(&mut T) -> Result<()> + Send,
{
    fn on_event(&mut self, event: &mut T) -> Result<()> {
        (self.handler)(event)
    }
}
