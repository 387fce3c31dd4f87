//! Fixed-Size Circular Buffer
//!
//! ## Overview
//!
//! Two parts of the pipeline need a sliding history without a heap: the
//! window extractor (raw motion samples) and the volatility tracker (recent
//! uncertainty values). Both use this ring.
//!
//! Storage is sized at compile time through a const generic `N`; the
//! *logical* capacity can be set lower at runtime so that `window_size` and
//! `volatility_window` stay configuration rather than type parameters.
//!
//! ### Memory Layout
//!
//! ```text
//! CircularBuffer<f32, 8> with capacity 5:
//! ┌─────┬─────┬─────┬─────┬─────┬─────┬─────┬─────┐
//! │  0  │  1  │  2  │  3  │  4  │  -  │  -  │  -  │  ← only 0..5 used
//! └─────┴─────┴─────┴─────┴─────┴─────┴─────┴─────┘
//!    ↑
//!    └── write_pos wraps at capacity, not at N
//! ```
//!
//! All operations are O(1) except iteration, and none allocate.
//!
//! ## Usage Example
//!
//! ```rust
//! use adbeacon_core::buffer::CircularBuffer;
//!
//! let mut history: CircularBuffer<f32, 8> = CircularBuffer::with_capacity(3);
//! for u in [0.1, 0.2, 0.3, 0.4] {
//!     history.push(u);
//! }
//!
//! // Oldest value (0.1) was evicted
//! let values: Vec<f32> = history.iter().copied().collect();
//! assert_eq!(values, vec![0.2, 0.3, 0.4]);
//! ```

/// Fixed-size ring that overwrites its oldest entry when full
///
/// ## Internal Invariants
///
/// - `capacity <= N` and `capacity >= 1`
/// - `write_pos < capacity`
/// - `len <= capacity`
/// - Iteration yields entries oldest to newest
///
/// ## Thread Safety
///
/// Not shared across contexts. Interrupt handlers hand data to the loop
/// through [`crate::handoff`] instead.
#[derive(Clone, Debug)]
pub struct CircularBuffer<T: Copy, const N: usize> {
    /// Storage; `None` marks slots never written
    data: [Option<T>; N],

    /// Logical capacity chosen at runtime
    capacity: usize,

    /// Index where the next write will occur
    write_pos: usize,

    /// Current number of valid entries
    len: usize,
}

impl<T: Copy, const N: usize> CircularBuffer<T, N> {
    /// Creates an empty buffer using the full compile-time capacity
    pub const fn new() -> Self {
        Self {
            data: [None; N],
            capacity: N,
            write_pos: 0,
            len: 0,
        }
    }

    /// Creates an empty buffer holding at most `capacity` entries
    ///
    /// `capacity` is clamped into `1..=N`.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut buffer = Self::new();
        buffer.capacity = capacity.clamp(1, N.max(1));
        buffer
    }

    /// Adds an entry, overwriting the oldest when full
    pub fn push(&mut self, value: T) {
        self.data[self.write_pos] = Some(value);
        self.write_pos = (self.write_pos + 1) % self.capacity;

        if self.len < self.capacity {
            self.len += 1;
        }
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.len
    }

    /// Logical capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check if buffer is full
    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    /// Most recent entry
    pub fn last(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }

        let idx = if self.write_pos == 0 { self.capacity - 1 } else { self.write_pos - 1 };
        self.data[idx].as_ref()
    }

    /// Iterate from oldest to newest
    pub fn iter(&self) -> CircularBufferIter<'_, T, N> {
        CircularBufferIter {
            buffer: self,
            index: 0,
        }
    }

    /// Drop all entries, keeping the capacity
    pub fn clear(&mut self) {
        self.write_pos = 0;
        self.len = 0;
    }

    /// Entry by logical index (0 = oldest, len-1 = newest)
    ///
    /// When full, the oldest entry sits at `write_pos`:
    ///
    /// ```text
    /// Physical:  [D, E, A, B, C]  (write_pos = 2)
    /// Logical:   [A, B, C, D, E]
    /// ```
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }

        let actual_index = if self.len < self.capacity {
            index
        } else {
            (self.write_pos + index) % self.capacity
        };

        self.data[actual_index].as_ref()
    }
}

impl<const N: usize> CircularBuffer<f32, N> {
    /// Arithmetic mean of the stored values, `0.0` when empty
    pub fn mean(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        self.iter().sum::<f32>() / self.len as f32
    }

    /// Sample standard deviation (n − 1 denominator)
    ///
    /// Fewer than two values carry no spread and return `0.0`. Deviations are
    /// taken from the oldest value, so a ring of identical values yields
    /// exactly zero instead of rounding noise.
    pub fn sample_std_dev(&self) -> f32 {
        if self.len < 2 {
            return 0.0;
        }

        let Some(&pivot) = self.get(0) else {
            return 0.0;
        };

        let (sum, sum_sq) = self.iter().fold((0.0f32, 0.0f32), |(s, sq), v| {
            let d = v - pivot;
            (s + d, sq + d * d)
        });

        let n = self.len as f32;
        let variance = ((sum_sq - sum * sum / n) / (n - 1.0)).max(0.0);
        libm::sqrtf(variance)
    }
}

/// Iterator over circular buffer contents
pub struct CircularBufferIter<'a, T: Copy, const N: usize> {
    buffer: &'a CircularBuffer<T, N>,
    index: usize,
}

impl<'a, T: Copy, const N: usize> Iterator for CircularBufferIter<'a, T, N> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.buffer.get(self.index)?;
        self.index += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.buffer.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl<T: Copy, const N: usize> Default for CircularBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
