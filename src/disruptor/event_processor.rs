//! Event Processor implementation for the Disruptor
//!
//! Event processors own a consumer thread's run loop. They wait on a sequence
//! barrier, drain every newly available event in one batch, and publish their
//! progress through their own sequence, which in turn gates producers and
//! downstream consumers.

use crate::disruptor::{
    DataProvider, DisruptorError, EventHandler, ExceptionHandler, FatalExceptionHandler, Result,
    Sequence, SequenceBarrier,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Trait for event processors
///
/// `run` borrows the processor immutably so the same instance can be halted
/// from another thread while it runs.
pub trait EventProcessor: Send + Sync {
    /// Get the sequence tracking this processor's progress
    fn get_sequence(&self) -> Arc<Sequence>;

    /// Signal the processor to stop once it has finished the current batch
    fn halt(&self);

    /// Check if the processor is running
    fn is_running(&self) -> bool;

    /// Run the processing loop on the calling thread until halted
    ///
    /// A halted processor can be run again; it resumes after the last
    /// sequence it recorded.
    ///
    /// # Errors
    /// Returns `DisruptorError::AlreadyRunning` if another thread is running
    /// this processor
    fn run(&self) -> Result<()>;
}

/// Clears the running flag on every exit path of `run`
pub(crate) struct RunningGuard<'a>(pub(crate) &'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Batch event processor
///
/// Delivers every event to one [`EventHandler`], telling it which event ends
/// each batch, and advances its own sequence once per batch rather than once
/// per event.
pub struct BatchEventProcessor<T, H> {
    running: AtomicBool,
    sequence: Arc<Sequence>,
    data_provider: Arc<dyn DataProvider<T>>,
    sequence_barrier: Arc<dyn SequenceBarrier>,
    event_handler: Mutex<H>,
    exception_handler: Box<dyn ExceptionHandler<T>>,
}

impl<T, H> BatchEventProcessor<T, H>
where
    T: 'static,
    H: EventHandler<T>,
{
    /// Create a new batch event processor
    ///
    /// # Arguments
    /// * `data_provider` - Source of the events, normally the ring buffer
    /// * `sequence_barrier` - Barrier gating this processor
    /// * `event_handler` - Handler receiving every event
    pub fn new(
        data_provider: Arc<dyn DataProvider<T>>,
        sequence_barrier: Arc<dyn SequenceBarrier>,
        mut event_handler: H,
    ) -> Self {
        let sequence = Arc::new(Sequence::new_with_initial_value());
        event_handler.set_sequence_callback(Arc::clone(&sequence));

        Self {
            running: AtomicBool::new(false),
            sequence,
            data_provider,
            sequence_barrier,
            event_handler: Mutex::new(event_handler),
            exception_handler: Box::new(FatalExceptionHandler::new()),
        }
    }

    /// Replace the exception handler (the default is [`FatalExceptionHandler`])
    pub fn with_exception_handler<E>(mut self, exception_handler: E) -> Self
    where
        E: ExceptionHandler<T> + 'static,
    {
        self.exception_handler = Box::new(exception_handler);
        self
    }

    /// Run `f` with exclusive access to the handler
    ///
    /// Blocks while the processor is running.
    pub fn with_handler<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        let mut handler = self.event_handler.lock();
        f(&mut handler)
    }

    fn process_events(&self, handler: &mut H) {
        let mut next_sequence = self.sequence.get() + 1;

        loop {
            match self.sequence_barrier.wait_for(next_sequence) {
                Ok(available_sequence) => {
                    while next_sequence <= available_sequence {
                        // SAFETY: the slot is published and producers are gated
                        // on our sequence, so no writer touches it while we read.
                        let event = unsafe { self.data_provider.get(next_sequence) };
                        let end_of_batch = next_sequence == available_sequence;

                        if let Err(error) = handler.on_event(event, next_sequence, end_of_batch) {
                            self.exception_handler.handle_event_exception(
                                error,
                                next_sequence,
                                Some(event),
                            );
                            self.sequence.set(next_sequence);
                        }
                        next_sequence += 1;
                    }

                    self.sequence.set(available_sequence);
                }
                Err(DisruptorError::Timeout) => self.notify_timeout(handler),
                Err(DisruptorError::Alert) => {
                    if !self.running.load(Ordering::Acquire) {
                        break;
                    }
                }
                Err(error) => {
                    self.exception_handler
                        .handle_event_exception(error, next_sequence, None);
                    break;
                }
            }
        }
    }

    fn notify_timeout(&self, handler: &mut H) {
        let sequence = self.sequence.get();
        if let Err(error) = handler.on_timeout(sequence) {
            self.exception_handler
                .handle_event_exception(error, sequence, None);
        }
    }

    fn notify_start(&self, handler: &mut H) {
        if let Err(error) = handler.on_start() {
            self.exception_handler.handle_on_start_exception(error);
        }
    }

    fn notify_shutdown(&self, handler: &mut H) {
        if let Err(error) = handler.on_shutdown() {
            self.exception_handler.handle_on_shutdown_exception(error);
        }
    }
}

impl<T, H> EventProcessor for BatchEventProcessor<T, H>
where
    T: 'static,
    H: EventHandler<T>,
{
    fn get_sequence(&self) -> Arc<Sequence> {
        Arc::clone(&self.sequence)
    }

    fn halt(&self) {
        debug!(sequence = self.sequence.get(), "halting batch event processor");
        self.running.store(false, Ordering::Release);
        self.sequence_barrier.alert();
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn run(&self) -> Result<()> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(DisruptorError::AlreadyRunning);
        }
        let _running = RunningGuard(&self.running);

        self.sequence_barrier.clear_alert();
        let mut handler = self.event_handler.lock();

        debug!(sequence = self.sequence.get(), "batch event processor started");
        self.notify_start(&mut handler);
        // A halt that landed before the alert was cleared is only visible here.
        if self.running.load(Ordering::Acquire) {
            self.process_events(&mut handler);
        }
        self.notify_shutdown(&mut handler);
        debug!(sequence = self.sequence.get(), "batch event processor stopped");

        Ok(())
    }
}

impl<T, H> std::fmt::Debug for BatchEventProcessor<T, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchEventProcessor")
            .field("sequence", &self.sequence.get())
            .field("running", &self.running.load(Ordering::Relaxed))
            .finish()
    }
}
