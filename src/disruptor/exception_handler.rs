//! Exception Handler Implementation
//!
//! Exception handlers receive the faults that event processors catch at their
//! boundary: errors returned by an event handler (with the failing sequence and,
//! where there is one, the event), and errors from the start and shutdown hooks.
//! The processor skips past a failed event after reporting it; what else happens
//! is up to the policy.

use crate::disruptor::DisruptorError;
use std::marker::PhantomData;
use tracing::error;

/// Handler for faults raised during event processing
///
/// # Type Parameters
/// * `T` - The event type being processed
pub trait ExceptionHandler<T>: Send + Sync {
    /// Handle a fault raised while processing an event
    ///
    /// # Arguments
    /// * `error` - The error that occurred
    /// * `sequence` - The sequence being processed when the error occurred
    /// * `event` - The event, or `None` when the fault did not come from an
    ///   event (a timeout hook, for example)
    fn handle_event_exception(&self, error: DisruptorError, sequence: i64, event: Option<&T>);

    /// Handle a fault raised by the handler's start hook
    fn handle_on_start_exception(&self, error: DisruptorError);

    /// Handle a fault raised by the handler's shutdown hook
    fn handle_on_shutdown_exception(&self, error: DisruptorError);
}

/// Exception handler that logs and then panics
///
/// The default for every processor. The panic unwinds the processor thread,
/// so an unhandled fault can never be dropped silently.
pub struct FatalExceptionHandler<T> {
    _phantom: PhantomData<fn(&T)>,
}

impl<T> FatalExceptionHandler<T> {
    /// Create a new fatal exception handler
    pub fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T> Default for FatalExceptionHandler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ExceptionHandler<T> for FatalExceptionHandler<T> {
    fn handle_event_exception(&self, error: DisruptorError, sequence: i64, event: Option<&T>) {
        error!(sequence, has_event = event.is_some(), %error, "exception processing event");
        panic!("exception processing event at sequence {sequence}: {error}");
    }

    fn handle_on_start_exception(&self, error: DisruptorError) {
        error!(%error, "exception during on_start");
        panic!("exception during on_start: {error}");
    }

    fn handle_on_shutdown_exception(&self, error: DisruptorError) {
        error!(%error, "exception during on_shutdown");
        panic!("exception during on_shutdown: {error}");
    }
}

/// Exception handler that logs every fault and carries on
pub struct LoggingExceptionHandler<T> {
    _phantom: PhantomData<fn(&T)>,
}

impl<T> LoggingExceptionHandler<T> {
    /// Create a new logging exception handler
    pub fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T> Default for LoggingExceptionHandler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ExceptionHandler<T> for LoggingExceptionHandler<T> {
    fn handle_event_exception(&self, error: DisruptorError, sequence: i64, event: Option<&T>) {
        error!(sequence, has_event = event.is_some(), %error, "exception processing event");
    }

    fn handle_on_start_exception(&self, error: DisruptorError) {
        error!(%error, "exception during on_start");
    }

    fn handle_on_shutdown_exception(&self, error: DisruptorError) {
        error!(%error, "exception during on_shutdown");
    }
}

/// Exception handler that silently ignores all faults
pub struct IgnoreExceptionHandler<T> {
    _phantom: PhantomData<fn(&T)>,
}

impl<T> IgnoreExceptionHandler<T> {
    /// Create a new ignore exception handler
    pub fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T> Default for IgnoreExceptionHandler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ExceptionHandler<T> for IgnoreExceptionHandler<T> {
    fn handle_event_exception(&self, _error: DisruptorError, _sequence: i64, _event: Option<&T>) {}

    fn handle_on_start_exception(&self, _error: DisruptorError) {}

    fn handle_on_shutdown_exception(&self, _error: DisruptorError) {}
}

/// Closure-based exception handler
///
/// # Type Parameters
/// * `T` - The event type
/// * `F` - The closure type for event faults
/// * `S` - The closure type for start faults
/// * `H` - The closure type for shutdown faults
pub struct ClosureExceptionHandler<T, F, S, H>
where
    F: Fn(DisruptorError, i64, Option<&T>) + Send + Sync,
    S: Fn(DisruptorError) + Send + Sync,
    H: Fn(DisruptorError) + Send + Sync,
{
    event_handler: F,
    start_handler: S,
    shutdown_handler: H,
    _phantom: PhantomData<fn(&T)>,
}

impl<T, F, S, H> ClosureExceptionHandler<T, F, S, H>
where
    F: Fn(DisruptorError, i64, Option<&T>) + Send + Sync,
    S: Fn(DisruptorError) + Send + Sync,
    H: Fn(DisruptorError) + Send + Sync,
{
    /// Create a new closure-based exception handler
    ///
    /// # Arguments
    /// * `event_handler` - Closure for event faults
    /// * `start_handler` - Closure for start hook faults
    /// * `shutdown_handler` - Closure for shutdown hook faults
    pub fn new(event_handler: F, start_handler: S, shutdown_handler: H) -> Self {
        Self {
            event_handler,
            start_handler,
            shutdown_handler,
            _phantom: PhantomData,
        }
    }
}

impl<T, F, S, H> ExceptionHandler<T> for ClosureExceptionHandler<T, F, S, H>
where
    F: Fn(DisruptorError, i64, Option<&T>) + Send + Sync,
    S: Fn(DisruptorError) + Send + Sync,
    H: Fn(DisruptorError) + Send + Sync,
{
    fn handle_event_exception(&self, error: DisruptorError, sequence: i64, event: Option<&T>) {
        (self.event_handler)(error, sequence, event);
    }

    fn handle_on_start_exception(&self, error: DisruptorError) {
        (self.start_handler)(error);
    }

    fn handle_on_shutdown_exception(&self, error: DisruptorError) {
        (self.shutdown_handler)(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::Arc;

    fn fault() -> DisruptorError {
        DisruptorError::EventProcessing("boom".to_string())
    }

    #[test]
    fn test_ignore_and_logging_handlers_do_not_panic() {
        let ignore = IgnoreExceptionHandler::<u32>::new();
        ignore.handle_event_exception(fault(), 1, Some(&7));
        ignore.handle_on_start_exception(fault());
        ignore.handle_on_shutdown_exception(fault());

        let logging = LoggingExceptionHandler::<u32>::default();
        logging.handle_event_exception(fault(), 1, None);
        logging.handle_on_start_exception(fault());
        logging.handle_on_shutdown_exception(fault());
    }

    #[test]
    fn test_fatal_handler_panics() {
        let fatal = FatalExceptionHandler::<u32>::new();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            fatal.handle_event_exception(fault(), 3, Some(&1));
        }));
        assert!(result.is_err());

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            fatal.handle_on_start_exception(fault());
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_closure_handler_receives_context() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let lifecycle = Arc::new(Mutex::new(Vec::new()));

        let handler = {
            let events = events.clone();
            let starts = lifecycle.clone();
            let stops = lifecycle.clone();
            ClosureExceptionHandler::new(
                move |error, sequence, event: Option<&u32>| {
                    events.lock().push((error, sequence, event.copied()));
                },
                move |_| starts.lock().push("start"),
                move |_| stops.lock().push("shutdown"),
            )
        };

        handler.handle_event_exception(fault(), 5, Some(&42));
        handler.handle_event_exception(DisruptorError::Timeout, 6, None);
        handler.handle_on_start_exception(fault());
        handler.handle_on_shutdown_exception(fault());

        assert_eq!(
            *events.lock(),
            vec![(fault(), 5, Some(42)), (DisruptorError::Timeout, 6, None)]
        );
        assert_eq!(*lifecycle.lock(), vec!["start", "shutdown"]);
    }
}
