//! BatchRing Disruptor Core
//!
//! This module provides the sequence-coordination engine: padded sequences,
//! single and multi producer sequencers, the pre-allocated ring buffer, sequence
//! barriers, pluggable wait strategies and the two consumer execution models.

pub mod config;
pub mod core_interfaces;
pub mod event_factory;
pub mod event_handler;
pub mod event_processor;
pub mod event_translator;
pub mod exception_handler;
pub mod producer_type;
pub mod ring_buffer;
pub mod sequence;
pub mod sequence_barrier;
pub mod sequencer;
pub mod thread_management;
pub mod wait_strategy;
pub mod work_processor;


pub use config::{DisruptorConfig, WaitStrategyConfig};
pub use core_interfaces::{Cursored, DataProvider, Sequenced};
pub use event_factory::{ClosureEventFactory, CloneEventFactory, DefaultEventFactory, EventFactory};
pub use event_handler::{
    ClosureEventHandler, ClosureWorkHandler, EventHandler, EventReleaser, WorkHandler,
};
pub use event_processor::{BatchEventProcessor, EventProcessor};
pub use event_translator::{EventTranslator, EventTranslatorOneArg};
pub use exception_handler::{
    ClosureExceptionHandler, ExceptionHandler, FatalExceptionHandler, IgnoreExceptionHandler,
    LoggingExceptionHandler,
};
pub use producer_type::ProducerType;
pub use ring_buffer::RingBuffer;
pub use sequence::{minimum_sequence, FixedSequenceGroup, Sequence};
pub use sequence_barrier::{ProcessingSequenceBarrier, SequenceBarrier};
pub use sequencer::{MultiProducerSequencer, Sequencer, SingleProducerSequencer};
pub use thread_management::{
    get_available_cores, ManagedThread, ProcessorThread, ThreadBuilder, ThreadContext,
};
pub use wait_strategy::{
    BlockingWaitStrategy, BusySpinWaitStrategy, SleepingWaitStrategy, TimeoutBlockingWaitStrategy,
    WaitStrategy, YieldingWaitStrategy,
};
pub use work_processor::WorkProcessor;

/// The initial cursor value for sequences
pub const INITIAL_CURSOR_VALUE: i64 = -1;

/// Errors that can occur in the Disruptor
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DisruptorError {
    /// The ring could not accommodate the requested claim without blocking
    #[error("Insufficient capacity in ring buffer")]
    InsufficientCapacity,

    #[error("Buffer size must be a power of 2 and at least 1, got: {0}")]
    InvalidBufferSize(usize),

    #[error("Claim count must be between 1 and the buffer size {buffer_size}, got: {requested}")]
    InvalidClaimCount { requested: i64, buffer_size: usize },

    #[error("Invalid batch: {0}")]
    InvalidBatch(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Raised by a barrier that has been alerted; this is how processors are halted
    #[error("Sequence barrier alerted")]
    Alert,

    #[error("Timeout waiting for sequence")]
    Timeout,

    #[error("Event processor is already running")]
    AlreadyRunning,

    /// A fault reported by user code (handlers, lifecycle hooks, translators)
    #[error("Event processing failed: {0}")]
    EventProcessing(String),

    #[error("Failed to start processor thread: {0}")]
    ThreadSpawn(String),
}

pub type Result<T> = std::result::Result<T, DisruptorError>;

/// Utility function to check if a number is a power of 2
pub fn is_power_of_two(n: usize) -> bool {
    n != 0 && (n & (n - 1)) == 0
}

/// Validate a claim of `n` slots against a ring of `buffer_size` slots
pub(crate) fn check_claim_count(n: i64, buffer_size: usize) -> Result<()> {
    if n < 1 || n > buffer_size as i64 {
        return Err(DisruptorError::InvalidClaimCount {
            requested: n,
            buffer_size,
        });
    }
    Ok(())
}
