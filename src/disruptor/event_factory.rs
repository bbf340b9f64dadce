//! Event Factory Implementation
//!
//! Event factories pre-populate every slot of a ring buffer when it is created.
//! The instances they return are the only values ever stored in the ring; after
//! creation slots are only mutated in place.

use std::marker::PhantomData;

/// Factory for the events pre-allocated into a ring buffer
///
/// Called exactly `buffer_size` times during ring buffer creation.
///
/// # Type Parameters
/// * `T` - The event type to create
///
/// # Examples
/// ```
/// use batchring::disruptor::EventFactory;
///
/// struct Trade {
///     price: u64,
/// }
///
/// struct TradeFactory;
///
/// impl EventFactory<Trade> for TradeFactory {
///     fn new_instance(&self) -> Trade {
///         Trade { price: 0 }
///     }
/// }
/// ```
pub trait EventFactory<T>: Send + Sync {
    /// Create a new event instance in its initial state
    fn new_instance(&self) -> T;
}

/// Event factory that uses the Default trait
pub struct DefaultEventFactory<T: Default> {
    _phantom: PhantomData<fn() -> T>,
}

impl<T: Default> DefaultEventFactory<T> {
    /// Create a new default event factory
    pub fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T: Default> Default for DefaultEventFactory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Default> EventFactory<T> for DefaultEventFactory<T> {
    fn new_instance(&self) -> T {
        T::default()
    }
}

/// Event factory backed by a closure
///
/// # Type Parameters
/// * `T` - The event type
/// * `F` - The closure type
pub struct ClosureEventFactory<T, F>
where
    F: Fn() -> T + Send + Sync,
{
    factory_fn: F,
    _phantom: PhantomData<fn() -> T>,
}

impl<T, F> ClosureEventFactory<T, F>
where
    F: Fn() -> T + Send + Sync,
{
    /// Create a new closure-based event factory
    ///
    /// # Arguments
    /// * `factory_fn` - The closure that creates new event instances
    pub fn new(factory_fn: F) -> Self {
        Self {
            factory_fn,
            _phantom: PhantomData,
        }
    }
}

impl<T, F> EventFactory<T> for ClosureEventFactory<T, F>
where
    F: Fn() -> T + Send + Sync,
{
    fn new_instance(&self) -> T {
        (self.factory_fn)()
    }
}

/// Event factory that clones a prototype event
pub struct CloneEventFactory<T: Clone> {
    prototype: T,
}

impl<T: Clone> CloneEventFactory<T> {
    /// Create a new clone-based event factory
    pub fn new(prototype: T) -> Self {
        Self { prototype }
    }
}

impl<T: Clone + Send + Sync> EventFactory<T> for CloneEventFactory<T> {
    fn new_instance(&self) -> T {
        self.prototype.clone()
    }
}
