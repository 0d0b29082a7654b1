//! Injected randomness for frame, word, and background selection.
//!
//! Production code uses [`RandomPicker`]; tests supply a [`SequencePicker`]
//! so selection is reproducible.

use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One-of-N selection.
pub trait Picker: Send + Sync {
    /// Return an index in `0..n`. `n` must be non-zero.
    fn pick(&self, n: usize) -> usize;
}

/// Thread-local RNG picker used in production.
#[derive(Debug, Default)]
pub struct RandomPicker;

impl Picker for RandomPicker {
    fn pick(&self, n: usize) -> usize {
        rand::thread_rng().gen_range(0..n)
    }
}

/// Scripted picker for tests. Cycles through the given values; each value
/// is reduced modulo `n` so it always yields a valid index.
#[derive(Debug)]
pub struct SequencePicker {
    values: Vec<usize>,
    cursor: AtomicUsize,
}

impl SequencePicker {
    pub fn new(values: Vec<usize>) -> Self {
        assert!(!values.is_empty(), "SequencePicker needs at least one value");
        Self {
            values,
            cursor: AtomicUsize::new(0),
        }
    }

    /// A picker that always selects index 0.
    pub fn zeros() -> Self {
        Self::new(vec![0])
    }
}

impl Picker for SequencePicker {
    fn pick(&self, n: usize) -> usize {
        let i = self.cursor.fetch_add(1, Ordering::Relaxed);
        self.values[i % self.values.len()] % n
    }
}
