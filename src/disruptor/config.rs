//! Pipeline configuration
//!
//! A serde-friendly description of a ring buffer and the threads that consume
//! it, so deployments can choose buffer size, producer mode and wait strategy
//! from JSON or plain strings instead of code.

use crate::disruptor::{
    is_power_of_two, BlockingWaitStrategy, BusySpinWaitStrategy, DisruptorError, EventFactory,
    ProducerType, Result, RingBuffer, SleepingWaitStrategy, ThreadContext,
    TimeoutBlockingWaitStrategy, WaitStrategy, YieldingWaitStrategy,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Wait strategy selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WaitStrategyConfig {
    /// Condition variable; lowest CPU use
    #[default]
    Blocking,
    /// Condition variable with a deadline, raising timeouts to handlers
    TimeoutBlocking {
        /// Deadline for one wait, in milliseconds
        timeout_ms: u64,
    },
    /// Pure spin
    BusySpin,
    /// Spin, then yield
    Yielding {
        /// Spins before each yield
        #[serde(default = "default_spin_tries")]
        spin_tries: u32,
    },
    /// Spin, yield, then sleep
    Sleeping {
        /// Polls before sleeping starts
        #[serde(default = "default_retries")]
        retries: u32,
        /// Length of each sleep
        #[serde(default = "default_sleep_nanos")]
        sleep_nanos: u64,
    },
}

fn default_spin_tries() -> u32 {
    YieldingWaitStrategy::DEFAULT_SPIN_TRIES
}

fn default_retries() -> u32 {
    SleepingWaitStrategy::DEFAULT_RETRIES
}

fn default_sleep_nanos() -> u64 {
    SleepingWaitStrategy::DEFAULT_SLEEP_NANOS
}

impl WaitStrategyConfig {
    /// Build the configured wait strategy
    pub fn build(&self) -> Arc<dyn WaitStrategy> {
        match *self {
            WaitStrategyConfig::Blocking => Arc::new(BlockingWaitStrategy::new()),
            WaitStrategyConfig::TimeoutBlocking { timeout_ms } => Arc::new(
                TimeoutBlockingWaitStrategy::new(Duration::from_millis(timeout_ms)),
            ),
            WaitStrategyConfig::BusySpin => Arc::new(BusySpinWaitStrategy::new()),
            WaitStrategyConfig::Yielding { spin_tries } => {
                Arc::new(YieldingWaitStrategy::with_spin_tries(spin_tries))
            }
            WaitStrategyConfig::Sleeping {
                retries,
                sleep_nanos,
            } => Arc::new(SleepingWaitStrategy::with_retries(retries, sleep_nanos)),
        }
    }
}

impl std::str::FromStr for WaitStrategyConfig {
    type Err = String;

    /// Parse a strategy name with default parameters
    ///
    /// `timeout_blocking` also accepts a millisecond suffix, as in
    /// `timeout_blocking:250`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        let (name, argument) = match normalized.split_once(':') {
            Some((name, argument)) => (name.to_string(), Some(argument.to_string())),
            None => (normalized, None),
        };

        match (name.as_str(), argument) {
            ("blocking", None) => Ok(WaitStrategyConfig::Blocking),
            ("busy_spin", None) => Ok(WaitStrategyConfig::BusySpin),
            ("yielding", None) => Ok(WaitStrategyConfig::Yielding {
                spin_tries: default_spin_tries(),
            }),
            ("sleeping", None) => Ok(WaitStrategyConfig::Sleeping {
                retries: default_retries(),
                sleep_nanos: default_sleep_nanos(),
            }),
            ("timeout_blocking", Some(millis)) => millis
                .parse()
                .map(|timeout_ms| WaitStrategyConfig::TimeoutBlocking { timeout_ms })
                .map_err(|e| format!("Invalid timeout in wait strategy '{s}': {e}")),
            ("timeout_blocking", None) => Err(format!(
                "Wait strategy '{s}' needs a timeout, e.g. 'timeout_blocking:100'"
            )),
            _ => Err(format!(
                "Invalid wait strategy: '{s}'. Valid values are 'blocking', \
                 'timeout_blocking:<ms>', 'busy_spin', 'yielding' or 'sleeping'"
            )),
        }
    }
}

/// Configuration for one ring buffer and its processor threads
///
/// # Examples
/// ```
/// use batchring::disruptor::{DisruptorConfig, ProducerType, WaitStrategyConfig};
///
/// let config = DisruptorConfig::from_json(
///     r#"{ "buffer_size": 256, "producer_type": "single", "wait_strategy": { "type": "busy_spin" } }"#,
/// )
/// .unwrap();
///
/// assert_eq!(config.buffer_size, 256);
/// assert_eq!(config.producer_type, ProducerType::Single);
/// assert_eq!(config.wait_strategy, WaitStrategyConfig::BusySpin);
/// assert_eq!(config.thread_name_prefix, "processor");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisruptorConfig {
    /// Number of slots, a power of 2
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    #[serde(default)]
    pub producer_type: ProducerType,
    /// How processors wait for new events
    #[serde(default)]
    pub wait_strategy: WaitStrategyConfig,
    /// Prefix for generated processor thread names
    #[serde(default = "default_thread_name_prefix")]
    pub thread_name_prefix: String,
    /// Cores to pin processor threads to, by processor index
    #[serde(default)]
    pub pin_cores: Vec<usize>,
}

fn default_buffer_size() -> usize {
    1024
}

fn default_thread_name_prefix() -> String {
    "processor".to_string()
}

impl Default for DisruptorConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            producer_type: ProducerType::default(),
            wait_strategy: WaitStrategyConfig::default(),
            thread_name_prefix: default_thread_name_prefix(),
            pin_cores: Vec::new(),
        }
    }
}

impl DisruptorConfig {
    /// Parse and validate a JSON configuration
    ///
    /// # Errors
    /// Returns `DisruptorError::InvalidConfig` for malformed JSON or a
    /// configuration that fails [`validate`](Self::validate)
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| DisruptorError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values no ring buffer could be built from
    ///
    /// # Errors
    /// Returns `DisruptorError::InvalidConfig` describing the first problem
    pub fn validate(&self) -> Result<()> {
        if !is_power_of_two(self.buffer_size) {
            return Err(DisruptorError::InvalidConfig(format!(
                "buffer_size must be a power of 2, got {}",
                self.buffer_size
            )));
        }
        if let WaitStrategyConfig::TimeoutBlocking { timeout_ms: 0 } = self.wait_strategy {
            return Err(DisruptorError::InvalidConfig(
                "timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.thread_name_prefix.trim().is_empty() {
            return Err(DisruptorError::InvalidConfig(
                "thread_name_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the configured wait strategy
    pub fn build_wait_strategy(&self) -> Arc<dyn WaitStrategy> {
        self.wait_strategy.build()
    }

    /// Build a ring buffer from this configuration
    ///
    /// # Errors
    /// Returns `DisruptorError::InvalidConfig` if validation fails
    pub fn build_ring_buffer<T, F>(&self, event_factory: F) -> Result<RingBuffer<T>>
    where
        F: EventFactory<T>,
    {
        self.validate()?;
        RingBuffer::create(
            self.producer_type,
            event_factory,
            self.buffer_size,
            self.build_wait_strategy(),
        )
    }

    /// Thread settings for the processor at `index`
    ///
    /// Threads are named `<prefix>-<index>`; if `pin_cores` has an entry for
    /// `index` the thread is pinned to that core.
    ///
    /// # Errors
    /// Returns `DisruptorError::ThreadSpawn` if the core is not available
    pub fn thread_context(&self, index: usize) -> Result<ThreadContext> {
        let context = ThreadContext::new().thread_name(format!(
            "{prefix}-{index}",
            prefix = self.thread_name_prefix
        ));
        match self.pin_cores.get(index) {
            Some(&core_id) => context.pin_at_core(core_id),
            None => Ok(context),
        }
    }
}
