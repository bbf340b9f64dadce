//! Thread management and CPU affinity
//!
//! Every event processor runs on its own OS thread. This module names those
//! threads, optionally pins them to a CPU core, and hands back a joinable
//! handle that can also halt the processor it runs.

use crate::disruptor::{DisruptorError, EventProcessor, Result};
use core_affinity::CoreId;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// Suffix for generated thread names, shared by every context in the process
static NEXT_THREAD_ID: AtomicUsize = AtomicUsize::new(1);

/// Naming and affinity settings for a processor thread
#[derive(Debug, Clone)]
pub struct ThreadContext {
    affinity: Option<CoreId>,
    name: Option<String>,
    prefix: String,
}

impl Default for ThreadContext {
    fn default() -> Self {
        Self {
            affinity: None,
            name: None,
            prefix: "processor".to_string(),
        }
    }
}

impl ThreadContext {
    /// Create a new thread context
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the thread to a CPU core
    ///
    /// # Errors
    /// Returns `DisruptorError::ThreadSpawn` if the core is not available on
    /// this machine
    pub fn pin_at_core(mut self, core_id: usize) -> Result<Self> {
        validate_core_id(core_id)?;
        self.affinity = Some(CoreId { id: core_id });
        Ok(self)
    }

    /// Set an explicit thread name
    pub fn thread_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the prefix used for generated names (`<prefix>-<n>`)
    ///
    /// `n` is unique within the process, so contexts created separately
    /// never generate the same name.
    pub fn name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Take the explicit name, or generate the next one from the prefix
    pub(crate) fn next_name(&mut self) -> String {
        self.name.take().unwrap_or_else(|| {
            let id = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
            format!("{prefix}-{id}", prefix = self.prefix)
        })
    }

    pub(crate) fn take_affinity(&mut self) -> Option<CoreId> {
        self.affinity.take()
    }
}

/// Handle to a spawned thread
///
/// Dropping the handle joins the thread.
#[derive(Debug)]
pub struct ManagedThread {
    join_handle: Option<JoinHandle<()>>,
    thread_name: String,
}

impl ManagedThread {
    pub(crate) fn new(join_handle: JoinHandle<()>, thread_name: String) -> Self {
        Self {
            join_handle: Some(join_handle),
            thread_name,
        }
    }

    /// Get the thread name
    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    /// Wait for the thread to finish
    ///
    /// Returns the panic payload if the thread panicked.
    pub fn join(mut self) -> thread::Result<()> {
        match self.join_handle.take() {
            Some(handle) => handle.join(),
            None => Ok(()),
        }
    }

    /// Check if the thread has not finished yet
    pub fn is_running(&self) -> bool {
        self.join_handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for ManagedThread {
    fn drop(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.join();
        }
    }
}

/// Thread builder with CPU affinity and naming support
#[derive(Debug, Default)]
pub struct ThreadBuilder {
    context: ThreadContext,
}

impl ThreadBuilder {
    /// Create a new thread builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder from an existing context
    pub fn with_context(context: ThreadContext) -> Self {
        Self { context }
    }

    /// Pin the thread to a CPU core
    ///
    /// # Errors
    /// Returns `DisruptorError::ThreadSpawn` if the core is not available
    pub fn pin_at_core(mut self, core_id: usize) -> Result<Self> {
        self.context = self.context.pin_at_core(core_id)?;
        Ok(self)
    }

    /// Set thread name
    pub fn thread_name<S: Into<String>>(mut self, name: S) -> Self {
        self.context = self.context.thread_name(name);
        self
    }

    /// Spawn a thread with the configured settings
    ///
    /// # Errors
    /// Returns `DisruptorError::ThreadSpawn` if the OS refuses the thread
    pub fn spawn<F>(mut self, f: F) -> Result<ManagedThread>
    where
        F: FnOnce() + Send + 'static,
    {
        let thread_name = self.context.next_name();
        let affinity = self.context.take_affinity();

        let name = thread_name.clone();
        let join_handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                set_affinity_if_defined(affinity, &name);
                f();
            })
            .map_err(|e| DisruptorError::ThreadSpawn(format!("{thread_name}: {e}")))?;

        Ok(ManagedThread::new(join_handle, thread_name))
    }
}

/// An event processor running on its own thread
///
/// # Examples
/// ```
/// use batchring::disruptor::{
///     BatchEventProcessor, BlockingWaitStrategy, ClosureEventHandler, DefaultEventFactory,
///     EventProcessor, ProcessorThread, RingBuffer, ThreadContext,
/// };
/// use std::sync::Arc;
///
/// let ring = Arc::new(
///     RingBuffer::<i64>::create_single_producer(
///         DefaultEventFactory::new(),
///         64,
///         Arc::new(BlockingWaitStrategy::new()),
///     )
///     .unwrap(),
/// );
/// let handler = ClosureEventHandler::new(|_event: &i64, _sequence, _end_of_batch| Ok(()));
/// let processor = Arc::new(BatchEventProcessor::new(ring.clone(), ring.new_barrier(&[]), handler));
/// ring.add_gating_sequences(&[processor.get_sequence()]);
///
/// let thread = ProcessorThread::spawn(processor, ThreadContext::new()).unwrap();
/// ring.publish_event(|event: &mut i64, sequence: i64| *event = sequence).unwrap();
/// thread.halt_and_join().unwrap();
/// ```
pub struct ProcessorThread {
    processor: Arc<dyn EventProcessor>,
    thread: ManagedThread,
}

impl ProcessorThread {
    /// Run `processor` on a new thread configured by `context`
    ///
    /// # Errors
    /// Returns `DisruptorError::ThreadSpawn` if the thread cannot be created
    pub fn spawn(processor: Arc<dyn EventProcessor>, context: ThreadContext) -> Result<Self> {
        let runner = Arc::clone(&processor);
        let thread = ThreadBuilder::with_context(context).spawn(move || {
            if let Err(error) = runner.run() {
                warn!(%error, "event processor did not start");
            }
        })?;

        Ok(Self { processor, thread })
    }

    /// The processor running on this thread
    pub fn processor(&self) -> &Arc<dyn EventProcessor> {
        &self.processor
    }

    /// Get the thread name
    pub fn thread_name(&self) -> &str {
        self.thread.thread_name()
    }

    /// Halt the processor and wait for its thread to exit
    ///
    /// A processor that has not entered `run()` yet is given the chance to,
    /// so the halt cannot be overtaken by a late start.
    pub fn halt_and_join(self) -> thread::Result<()> {
        while !self.processor.is_running() && self.thread.is_running() {
            thread::yield_now();
        }
        self.processor.halt();
        self.join()
    }

    /// Wait for the thread to exit without halting the processor
    pub fn join(self) -> thread::Result<()> {
        self.thread.join()
    }
}

impl std::fmt::Debug for ProcessorThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorThread")
            .field("thread_name", &self.thread.thread_name())
            .field("running", &self.processor.is_running())
            .finish()
    }
}

fn validate_core_id(core_id: usize) -> Result<()> {
    let available_cores = get_available_cores();
    if available_cores.contains(&core_id) {
        Ok(())
    } else {
        Err(DisruptorError::ThreadSpawn(format!(
            "CPU core {core_id} is not available. Available cores: {available_cores:?}"
        )))
    }
}

fn set_affinity_if_defined(affinity: Option<CoreId>, thread_name: &str) {
    if let Some(core_id) = affinity {
        if core_affinity::set_for_current(core_id) {
            debug!(thread = thread_name, core = core_id.id, "pinned thread to core");
        } else {
            warn!(thread = thread_name, core = core_id.id, "could not pin thread to core");
        }
    }
}

/// Get the CPU core ids this process may be pinned to
pub fn get_available_cores() -> Vec<usize> {
    core_affinity::get_core_ids()
        .unwrap_or_default()
        .iter()
        .map(|core| core.id)
        .collect()
}
