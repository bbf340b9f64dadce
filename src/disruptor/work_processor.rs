//! Work Processor implementation
//!
//! A pool of work processors shares one work sequence. Each worker claims the
//! next sequence with a compare-and-set on it, so every published event is
//! handled by exactly one worker of the pool.

use crate::disruptor::event_processor::RunningGuard;
use crate::disruptor::{
    DataProvider, DisruptorError, EventProcessor, EventReleaser, ExceptionHandler,
    FatalExceptionHandler, Result, Sequence, SequenceBarrier, WorkHandler,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Marks that no claimed sequence is waiting to be processed
const NO_PENDING_CLAIM: i64 = i64::MIN;

/// Work-queue event processor
///
/// The processor's own sequence trails its claims by one, so producers stay
/// gated on the oldest event any worker still holds. A sequence claimed but
/// not yet handled when the processor is halted is kept and handled first
/// by the next `run()`.
///
/// Handlers get `&mut T` for the event they claimed. Consumers that read the
/// same slots must sit behind the pool's sequences, never beside it.
pub struct WorkProcessor<T, H> {
    running: AtomicBool,
    sequence: Arc<Sequence>,
    work_sequence: Arc<Sequence>,
    pending_claim: AtomicI64,
    data_provider: Arc<dyn DataProvider<T>>,
    sequence_barrier: Arc<dyn SequenceBarrier>,
    work_handler: Mutex<H>,
    exception_handler: Box<dyn ExceptionHandler<T>>,
}

impl<T, H> WorkProcessor<T, H>
where
    T: 'static,
    H: WorkHandler<T>,
{
    /// Create a new work processor
    ///
    /// # Arguments
    /// * `data_provider` - Source of the events, normally the ring buffer
    /// * `sequence_barrier` - Barrier gating the pool
    /// * `work_handler` - Handler for the events this worker claims
    /// * `work_sequence` - Claim counter shared by every worker of the pool
    pub fn new(
        data_provider: Arc<dyn DataProvider<T>>,
        sequence_barrier: Arc<dyn SequenceBarrier>,
        mut work_handler: H,
        work_sequence: Arc<Sequence>,
    ) -> Self {
        let sequence = Arc::new(Sequence::new_with_initial_value());
        work_handler.set_event_releaser(EventReleaser::new(Arc::clone(&sequence)));

        Self {
            running: AtomicBool::new(false),
            sequence,
            work_sequence,
            pending_claim: AtomicI64::new(NO_PENDING_CLAIM),
            data_provider,
            sequence_barrier,
            work_handler: Mutex::new(work_handler),
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

    /// The claim counter shared by the pool
    pub fn work_sequence(&self) -> &Arc<Sequence> {
        &self.work_sequence
    }

    /// Run `f` with exclusive access to the handler
    ///
    /// Blocks while the processor is running.
    pub fn with_handler<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        let mut handler = self.work_handler.lock();
        f(&mut handler)
    }

    /// Claim the next sequence for this worker
    fn claim(&self) -> i64 {
        loop {
            let current = self.work_sequence.get();
            self.sequence.set(current);
            if self.work_sequence.compare_and_set(current, current + 1) {
                self.pending_claim.store(current + 1, Ordering::Relaxed);
                return current + 1;
            }
        }
    }

    fn process_events(&self, handler: &mut H) {
        let pending = self.pending_claim.load(Ordering::Relaxed);
        let mut processed = pending == NO_PENDING_CLAIM;
        let mut cached_available = i64::MIN;
        let mut next_sequence = pending;

        loop {
            if processed {
                processed = false;
                next_sequence = self.claim();
            }

            if cached_available >= next_sequence {
                // SAFETY: the compare-and-set on the work sequence handed this
                // slot to this worker alone, and it is published.
                let event = unsafe { self.data_provider.get_mut(next_sequence) };
                if let Err(error) = handler.on_event(event) {
                    self.exception_handler.handle_event_exception(
                        error,
                        next_sequence,
                        Some(&*event),
                    );
                }
                self.pending_claim.store(NO_PENDING_CLAIM, Ordering::Relaxed);
                processed = true;
                continue;
            }

            match self.sequence_barrier.wait_for(next_sequence) {
                Ok(available) => cached_available = available,
                Err(DisruptorError::Timeout) => {
                    let sequence = self.sequence.get();
                    if let Err(error) = handler.on_timeout(sequence) {
                        self.exception_handler
                            .handle_event_exception(error, sequence, None);
                    }
                }
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
}

impl<T, H> EventProcessor for WorkProcessor<T, H>
where
    T: 'static,
    H: WorkHandler<T>,
{
    fn get_sequence(&self) -> Arc<Sequence> {
        Arc::clone(&self.sequence)
    }

    fn halt(&self) {
        debug!(sequence = self.sequence.get(), "halting work processor");
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
        let mut handler = self.work_handler.lock();

        debug!(
            work_sequence = self.work_sequence.get(),
            "work processor started"
        );
        if let Err(error) = handler.on_start() {
            self.exception_handler.handle_on_start_exception(error);
        }
        // A halt that landed before the alert was cleared is only visible here.
        if self.running.load(Ordering::Acquire) {
            self.process_events(&mut handler);
        }
        if let Err(error) = handler.on_shutdown() {
            self.exception_handler.handle_on_shutdown_exception(error);
        }
        debug!(sequence = self.sequence.get(), "work processor stopped");

        Ok(())
    }
}

impl<T, H> std::fmt::Debug for WorkProcessor<T, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkProcessor")
            .field("sequence", &self.sequence.get())
            .field("work_sequence", &self.work_sequence.get())
            .field("running", &self.running.load(Ordering::Relaxed))
            .finish()
    }
}
