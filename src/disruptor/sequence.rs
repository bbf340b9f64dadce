//! Sequence implementation for the Disruptor
//!
//! The Sequence is used to track progress through the ring buffer and coordinate
//! between producers and consumers. It provides atomic operations while preventing
//! false sharing by keeping the counter on its own cache line.

use crate::disruptor::INITIAL_CURSOR_VALUE;
use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// A sequence number that prevents false sharing
///
/// The value is wrapped in [`CachePadded`], which aligns it to (and pads it out
/// to) a full cache line, so neighbouring memory never shares its line.
///
/// Ordering contract:
/// - [`get`](Sequence::get) is an acquire load
/// - [`set`](Sequence::set) is a release store, sufficient for single-writer fields
/// - [`set_volatile`](Sequence::set_volatile) is a sequentially-consistent store
pub struct Sequence {
    value: CachePadded<AtomicI64>,
}

impl Sequence {
    /// Create a new sequence with the given initial value
    pub fn new(initial_value: i64) -> Self {
        Self {
            value: CachePadded::new(AtomicI64::new(initial_value)),
        }
    }

    /// Create a new sequence at [`INITIAL_CURSOR_VALUE`]
    pub fn new_with_initial_value() -> Self {
        Self::new(INITIAL_CURSOR_VALUE)
    }

    /// Get the current sequence value
    #[inline]
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }

    /// Ordered write of the sequence value
    ///
    /// All writes made by this thread before the call are visible to any thread
    /// that later observes the new value through [`get`](Sequence::get).
    #[inline]
    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::Release);
    }

    /// Fully fenced write of the sequence value
    #[inline]
    pub fn set_volatile(&self, value: i64) {
        self.value.store(value, Ordering::SeqCst);
    }

    /// Atomically set the value to `new` if it currently equals `expected`
    ///
    /// # Returns
    /// True if the swap happened
    #[inline]
    pub fn compare_and_set(&self, expected: i64, new: i64) -> bool {
        self.value
            .compare_exchange(expected, new, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Increment and get the new value
    #[inline]
    pub fn increment_and_get(&self) -> i64 {
        self.add_and_get(1)
    }

    /// Add a value and get the new result
    #[inline]
    pub fn add_and_get(&self, increment: i64) -> i64 {
        self.value.fetch_add(increment, Ordering::AcqRel) + increment
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new_with_initial_value()
    }
}

impl std::fmt::Debug for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequence")
            .field("value", &self.get())
            .finish()
    }
}

impl std::fmt::Display for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// Get the minimum value across `sequences`, or `default` if there are none
pub fn minimum_sequence(sequences: &[Arc<Sequence>], default: i64) -> i64 {
    sequences
        .iter()
        .map(|seq| seq.get())
        .fold(default, i64::min)
}

/// A read-only view over a fixed set of sequences
///
/// Its value is the minimum of the group. Barriers use it to track the
/// upstream consumers a processor must not overtake.
#[derive(Debug, Clone)]
pub struct FixedSequenceGroup {
    sequences: Arc<[Arc<Sequence>]>,
}

impl FixedSequenceGroup {
    /// Create a group over the given sequences
    pub fn new(sequences: &[Arc<Sequence>]) -> Self {
        Self {
            sequences: sequences.into(),
        }
    }

    /// Get the minimum value of the group (`i64::MAX` when empty)
    #[inline]
    pub fn get(&self) -> i64 {
        minimum_sequence(&self.sequences, i64::MAX)
    }

    /// Get the number of sequences in the group
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    /// Check if the group is empty
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_sequence_creation() {
        let seq = Sequence::new(42);
        assert_eq!(seq.get(), 42);
    }

    #[test]
    fn test_sequence_default() {
        let seq = Sequence::default();
        assert_eq!(seq.get(), INITIAL_CURSOR_VALUE);
    }

    #[test]
    fn test_sequence_set_get() {
        let seq = Sequence::new(0);
        seq.set(100);
        assert_eq!(seq.get(), 100);

        seq.set_volatile(200);
        assert_eq!(seq.get(), 200);
    }

    #[test]
    fn test_sequence_increment_and_add() {
        let seq = Sequence::new(0);
        assert_eq!(seq.increment_and_get(), 1);
        assert_eq!(seq.add_and_get(5), 6);
        assert_eq!(seq.get(), 6);
    }

    #[test]
    fn test_sequence_compare_and_set() {
        let seq = Sequence::new(10);

        assert!(seq.compare_and_set(10, 20));
        assert_eq!(seq.get(), 20);

        assert!(!seq.compare_and_set(10, 30));
        assert_eq!(seq.get(), 20);
    }

    #[test]
    fn test_sequence_occupies_own_cache_line() {
        assert!(std::mem::align_of::<Sequence>() >= 64);
        assert!(std::mem::size_of::<Sequence>() >= 64);
    }

    #[test]
    fn test_minimum_sequence() {
        let sequences = vec![
            Arc::new(Sequence::new(10)),
            Arc::new(Sequence::new(3)),
            Arc::new(Sequence::new(7)),
        ];
        assert_eq!(minimum_sequence(&sequences, i64::MAX), 3);
        assert_eq!(minimum_sequence(&sequences, 1), 1);
        assert_eq!(minimum_sequence(&[], 42), 42);
    }

    #[test]
    fn test_fixed_sequence_group_tracks_minimum() {
        let a = Arc::new(Sequence::new(5));
        let b = Arc::new(Sequence::new(9));
        let group = FixedSequenceGroup::new(&[a.clone(), b.clone()]);

        assert_eq!(group.len(), 2);
        assert_eq!(group.get(), 5);

        a.set(12);
        assert_eq!(group.get(), 9);

        let empty = FixedSequenceGroup::new(&[]);
        assert!(empty.is_empty());
        assert_eq!(empty.get(), i64::MAX);
    }

    #[test]
    fn test_sequence_thread_safety() {
        let seq = Arc::new(Sequence::new(0));
        let mut handles = vec![];

        for _ in 0..10 {
            let seq_clone = Arc::clone(&seq);
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    seq_clone.increment_and_get();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(seq.get(), 10000);
    }

    #[test]
    fn test_competing_compare_and_set_claims_are_disjoint() {
        let work = Arc::new(Sequence::new(-1));
        let mut handles = vec![];

        for _ in 0..4 {
            let work = Arc::clone(&work);
            handles.push(thread::spawn(move || {
                let mut claimed = Vec::new();
                for _ in 0..250 {
                    loop {
                        let current = work.get();
                        if work.compare_and_set(current, current + 1) {
                            claimed.push(current + 1);
                            break;
                        }
                    }
                }
                claimed
            }));
        }

        let mut all: Vec<i64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..1000).collect::<Vec<_>>());
    }
}
