//! `BatchRing` - Sequence-Coordinated Ring Buffer
//!
//! A lock-free inter-thread messaging core: producers claim slots in a
//! pre-allocated ring, fill them in place and publish them; consumer threads
//! wait on barriers and drain everything published since their last batch.
//!
//! ## Quick Start
//!
//! ```rust
//! use batchring::disruptor::{
//!     BatchEventProcessor, BlockingWaitStrategy, DefaultEventFactory, EventHandler,
//!     EventProcessor, ProcessorThread, Result, RingBuffer, ThreadContext,
//! };
//! use std::sync::Arc;
//!
//! #[derive(Debug, Default)]
//! struct Trade {
//!     price: i64,
//! }
//!
//! struct Totals {
//!     sum: i64,
//! }
//!
//! impl EventHandler<Trade> for Totals {
//!     fn on_event(&mut self, event: &Trade, _sequence: i64, _end_of_batch: bool) -> Result<()> {
//!         self.sum += event.price;
//!         Ok(())
//!     }
//! }
//!
//! let ring = Arc::new(RingBuffer::create_single_producer(
//!     DefaultEventFactory::<Trade>::new(),
//!     1024,
//!     Arc::new(BlockingWaitStrategy::new()),
//! )?);
//!
//! let processor = Arc::new(BatchEventProcessor::new(
//!     ring.clone(),
//!     ring.new_barrier(&[]),
//!     Totals { sum: 0 },
//! ));
//! ring.add_gating_sequences(&[processor.get_sequence()]);
//! let thread = ProcessorThread::spawn(processor.clone(), ThreadContext::new())?;
//!
//! for price in 1..=100 {
//!     ring.publish_event_with(|trade: &mut Trade, _sequence: i64, price: i64| trade.price = price, price)?;
//! }
//! while processor.get_sequence().get() < 99 {
//!     std::thread::yield_now();
//! }
//!
//! thread.halt_and_join().expect("processor thread panicked");
//! processor.with_handler(|totals| assert_eq!(totals.sum, 5050));
//! # Ok::<(), batchring::disruptor::DisruptorError>(())
//! ```
//!
//! ## Architecture
//!
//! - **`Sequence`**: cache-padded atomic position counter
//! - **`Sequencer`**: hands out slots to one or many producers and tracks publication
//! - **`RingBuffer`**: pre-allocated slots plus the translate-and-publish API
//! - **`SequenceBarrier`**: tells a consumer how far it may safely read
//! - **`WaitStrategy`**: how a consumer idles while it waits
//! - **`BatchEventProcessor`** / **`WorkProcessor`**: broadcast and work-queue consumers

pub mod disruptor;

// Re-export the main types for convenience
pub use disruptor::{
    // Utility functions
    is_power_of_two,
    // Event processing
    BatchEventProcessor,
    // Wait strategies
    BlockingWaitStrategy,
    BusySpinWaitStrategy,
    // Core types
    Cursored,
    DataProvider,
    DefaultEventFactory,
    // Configuration
    DisruptorConfig,
    // Error types
    DisruptorError,
    EventFactory,
    // Event handling
    EventHandler,
    EventProcessor,
    EventTranslator,
    EventTranslatorOneArg,
    // Exception handling
    ExceptionHandler,
    MultiProducerSequencer,
    ProcessorThread,
    ProducerType,
    Result,
    RingBuffer,
    Sequence,
    SequenceBarrier,
    Sequenced,
    // Sequencing
    Sequencer,
    SingleProducerSequencer,
    SleepingWaitStrategy,
    ThreadContext,
    TimeoutBlockingWaitStrategy,
    WaitStrategy,
    WaitStrategyConfig,
    WorkHandler,
    WorkProcessor,
    YieldingWaitStrategy,
    // Constants
    INITIAL_CURSOR_VALUE,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the version of the `BatchRing` library
#[must_use]
pub fn version() -> &'static str {
    VERSION
}
