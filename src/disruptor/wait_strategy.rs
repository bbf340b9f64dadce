//! Wait Strategy Implementation
//!
//! This module provides the wait strategies used by sequence barriers.
//! A wait strategy decides what a consumer thread does while the position it
//! wants is not yet available: spin, yield, sleep or block on a condition
//! variable. Every strategy re-checks the barrier's alert flag on each iteration,
//! so a halt is observed within one poll quantum.

use crate::disruptor::{DisruptorError, FixedSequenceGroup, Result, Sequence, SequenceBarrier};
use parking_lot::{Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Strategy for waiting for events to become available
///
/// This trait defines how consumers wait for new events in the ring buffer.
/// Different strategies provide different trade-offs between CPU usage,
/// latency, and throughput.
pub trait WaitStrategy: Send + Sync + std::fmt::Debug {
    /// Wait for the given sequence to become available
    ///
    /// # Arguments
    /// * `sequence` - The sequence to wait for
    /// * `cursor` - The sequencer's cursor, used by blocking strategies
    /// * `dependent` - The sequences the caller must not overtake
    /// * `barrier` - The barrier whose alert flag is polled while waiting
    ///
    /// # Returns
    /// The available sequence, which may be greater than requested
    ///
    /// # Errors
    /// Returns `DisruptorError::Alert` if the barrier is alerted, or
    /// `DisruptorError::Timeout` for strategies with a bounded wait
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependent: &FixedSequenceGroup,
        barrier: &dyn SequenceBarrier,
    ) -> Result<i64>;

    /// Wake any thread blocked in [`wait_for`](WaitStrategy::wait_for)
    ///
    /// Publishers call this after every publish. Strategies that never block
    /// treat it as a no-op.
    fn signal_all_when_blocking(&self);
}

/// Busy-spin wait strategy
///
/// This strategy continuously polls for events without yielding the CPU.
/// It provides the lowest latency but uses 100% CPU while waiting.
/// Use this only when you can dedicate CPU cores to the consumers.
#[derive(Debug, Default, Clone, Copy)]
pub struct BusySpinWaitStrategy;

impl BusySpinWaitStrategy {
    /// Create a new busy-spin wait strategy
    pub fn new() -> Self {
        Self
    }
}

impl WaitStrategy for BusySpinWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        _cursor: &Sequence,
        dependent: &FixedSequenceGroup,
        barrier: &dyn SequenceBarrier,
    ) -> Result<i64> {
        loop {
            let available_sequence = dependent.get();
            if available_sequence >= sequence {
                return Ok(available_sequence);
            }
            barrier.check_alert()?;
            std::hint::spin_loop();
        }
    }

    fn signal_all_when_blocking(&self) {}
}

/// Yielding wait strategy
///
/// Spins for a fixed number of iterations, then yields the thread on every
/// further iteration. A good compromise between latency and CPU usage when
/// there are fewer consumers than cores.
#[derive(Debug, Clone, Copy)]
pub struct YieldingWaitStrategy {
    spin_tries: u32,
}

impl YieldingWaitStrategy {
    pub const DEFAULT_SPIN_TRIES: u32 = 100;

    /// Create a new yielding wait strategy
    pub fn new() -> Self {
        Self::with_spin_tries(Self::DEFAULT_SPIN_TRIES)
    }

    /// Create a yielding wait strategy that spins `spin_tries` times before yielding
    pub fn with_spin_tries(spin_tries: u32) -> Self {
        Self { spin_tries }
    }
}

impl Default for YieldingWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for YieldingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        _cursor: &Sequence,
        dependent: &FixedSequenceGroup,
        barrier: &dyn SequenceBarrier,
    ) -> Result<i64> {
        let mut counter = self.spin_tries;
        loop {
            let available_sequence = dependent.get();
            if available_sequence >= sequence {
                return Ok(available_sequence);
            }
            barrier.check_alert()?;
            if counter == 0 {
                thread::yield_now();
            } else {
                counter -= 1;
                std::hint::spin_loop();
            }
        }
    }

    fn signal_all_when_blocking(&self) {}
}

/// Sleeping wait strategy
///
/// Backs off in three stages: spin, then yield, then sleep for a short,
/// fixed period on every further iteration. Trades latency for very low CPU
/// usage when the pipeline is idle.
#[derive(Debug, Clone, Copy)]
pub struct SleepingWaitStrategy {
    retries: u32,
    sleep: Duration,
}

impl SleepingWaitStrategy {
    pub const DEFAULT_RETRIES: u32 = 200;
    pub const DEFAULT_SLEEP_NANOS: u64 = 100;
    const SPIN_THRESHOLD: u32 = 100;

    /// Create a new sleeping wait strategy with the default ladder
    pub fn new() -> Self {
        Self::with_retries(Self::DEFAULT_RETRIES, Self::DEFAULT_SLEEP_NANOS)
    }

    /// Create a sleeping wait strategy
    ///
    /// # Arguments
    /// * `retries` - Iterations before sleeping; the first `retries - 100`
    ///   spin and the rest yield
    /// * `sleep_nanos` - Sleep period once the retries are exhausted
    pub fn with_retries(retries: u32, sleep_nanos: u64) -> Self {
        Self {
            retries,
            sleep: Duration::from_nanos(sleep_nanos),
        }
    }

    #[inline]
    fn apply_wait_method(&self, barrier: &dyn SequenceBarrier, counter: u32) -> Result<u32> {
        barrier.check_alert()?;

        if counter > Self::SPIN_THRESHOLD {
            std::hint::spin_loop();
            Ok(counter - 1)
        } else if counter > 0 {
            thread::yield_now();
            Ok(counter - 1)
        } else {
            thread::sleep(self.sleep);
            Ok(counter)
        }
    }
}

impl Default for SleepingWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for SleepingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        _cursor: &Sequence,
        dependent: &FixedSequenceGroup,
        barrier: &dyn SequenceBarrier,
    ) -> Result<i64> {
        let mut counter = self.retries;
        loop {
            let available_sequence = dependent.get();
            if available_sequence >= sequence {
                return Ok(available_sequence);
            }
            counter = self.apply_wait_method(barrier, counter)?;
        }
    }

    fn signal_all_when_blocking(&self) {}
}

/// Blocking wait strategy using a lock and condition variable
///
/// Consumers park on the condition variable until the cursor passes the
/// requested sequence. Publishers wake them through
/// [`signal_all_when_blocking`](WaitStrategy::signal_all_when_blocking).
/// Lowest CPU usage, highest wake-up latency.
#[derive(Debug, Default)]
pub struct BlockingWaitStrategy {
    mutex: Mutex<()>,
    condvar: Condvar,
}

impl BlockingWaitStrategy {
    /// Create a new blocking wait strategy
    pub fn new() -> Self {
        Self::default()
    }
}

impl WaitStrategy for BlockingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependent: &FixedSequenceGroup,
        barrier: &dyn SequenceBarrier,
    ) -> Result<i64> {
        if cursor.get() < sequence {
            let mut guard = self.mutex.lock();
            while cursor.get() < sequence {
                barrier.check_alert()?;
                self.condvar.wait(&mut guard);
            }
        }

        // Upstream consumers are not signalled, so they are spun on.
        spin_on_dependents(sequence, dependent, barrier)
    }

    fn signal_all_when_blocking(&self) {
        let _guard = self.mutex.lock();
        self.condvar.notify_all();
    }
}

/// Blocking wait strategy with a bounded wait
///
/// Behaves like [`BlockingWaitStrategy`] but gives up once the timeout has
/// elapsed, returning `DisruptorError::Timeout`. Event processors route the
/// timeout to their handler's `on_timeout` hook and keep running.
#[derive(Debug)]
pub struct TimeoutBlockingWaitStrategy {
    mutex: Mutex<()>,
    condvar: Condvar,
    timeout: Duration,
}

impl TimeoutBlockingWaitStrategy {
    /// Create a new timeout blocking wait strategy
    pub fn new(timeout: Duration) -> Self {
        Self {
            mutex: Mutex::new(()),
            condvar: Condvar::new(),
            timeout,
        }
    }

    /// Get the configured timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl WaitStrategy for TimeoutBlockingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependent: &FixedSequenceGroup,
        barrier: &dyn SequenceBarrier,
    ) -> Result<i64> {
        if cursor.get() < sequence {
            let deadline = Instant::now() + self.timeout;
            let mut guard = self.mutex.lock();
            while cursor.get() < sequence {
                barrier.check_alert()?;
                if self.condvar.wait_until(&mut guard, deadline).timed_out()
                    && cursor.get() < sequence
                {
                    return Err(DisruptorError::Timeout);
                }
            }
        }

        spin_on_dependents(sequence, dependent, barrier)
    }

    fn signal_all_when_blocking(&self) {
        let _guard = self.mutex.lock();
        self.condvar.notify_all();
    }
}

fn spin_on_dependents(
    sequence: i64,
    dependent: &FixedSequenceGroup,
    barrier: &dyn SequenceBarrier,
) -> Result<i64> {
    loop {
        let available_sequence = dependent.get();
        if available_sequence >= sequence {
            return Ok(available_sequence);
        }
        barrier.check_alert()?;
        std::hint::spin_loop();
    }
}
