//! Windowed Feature Extraction
//!
//! ## Overview
//!
//! The IMU delivers one 6-axis sample per sampling tick. The extractor buffers
//! samples until a window is complete and reduces the window to a fixed-length
//! [`FeatureVector`] for the classifier.
//!
//! ## Windowing
//!
//! Windowing is count-based, not time-based, so jitter in sample arrival does
//! not change what a window contains:
//!
//! ```text
//! stride == size (default, no overlap)
//! |-- window 1 --|-- window 2 --|-- window 3 --|
//!
//! stride == size / 2 (overlapping)
//! |-- window 1 --|
//!        |-- window 2 --|
//!               |-- window 3 --|
//! ```
//!
//! With no overlap the buffer is cleared after each window. With a stride
//! smaller than the window the ring keeps the newest `size` samples and a
//! window is emitted every `stride` new samples.
//!
//! ## Stall Guard
//!
//! A stalled IMU (FIFO overrun, bus lockup) must not silently freeze the
//! pipeline. [`WindowExtractor::check_stall`] reports
//! [`CoreError::InputStarvation`] once per stall episode when no sample has
//! arrived for `stall_factor` sample periods, and discards the partial window
//! so stale samples never mix with fresh ones.
//!
//! ## Feature Layout
//!
//! | Index | Feature |
//! |-------|---------|
//! | 0..6  | mean of accel x/y/z, gyro x/y/z |
//! | 6..12 | population standard deviation of the same axes |
//! | 12    | accelerometer magnitude RMS |
//! | 13    | accelerometer magnitude min |
//! | 14    | accelerometer magnitude max |
//! | 15    | accelerometer magnitude range |

use crate::buffer::CircularBuffer;
use crate::constants::{FEATURE_COUNT, MAX_WINDOW_SIZE};
use crate::errors::{CoreError, CoreResult};
use crate::time::{elapsed_ms, Timestamp};

/// One 6-axis IMU reading
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotionSample {
    /// Acceleration in g (x, y, z)
    pub accel: [f32; 3],
    /// Angular rate in degrees per second (x, y, z)
    pub gyro: [f32; 3],
}

/// Sample axis, in feature-vector order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Axis {
    /// Accelerometer x
    AccelX = 0,
    /// Accelerometer y
    AccelY = 1,
    /// Accelerometer z
    AccelZ = 2,
    /// Gyroscope x
    GyroX = 3,
    /// Gyroscope y
    GyroY = 4,
    /// Gyroscope z
    GyroZ = 5,
}

impl Axis {
    /// All axes in feature order
    pub const ALL: [Axis; 6] = [
        Axis::AccelX, Axis::AccelY, Axis::AccelZ,
        Axis::GyroX, Axis::GyroY, Axis::GyroZ,
    ];
}

impl MotionSample {
    /// Build a sample from accelerometer (g) and gyroscope (°/s) triples
    pub const fn new(accel: [f32; 3], gyro: [f32; 3]) -> Self {
        Self { accel, gyro }
    }

    /// Reading on one axis
    pub fn axis(&self, axis: Axis) -> f32 {
        let i = axis as usize;
        if i < 3 { self.accel[i] } else { self.gyro[i - 3] }
    }

    /// True when every component is a finite number
    pub fn is_finite(&self) -> bool {
        self.accel.iter().chain(self.gyro.iter()).all(|v| v.is_finite())
    }

    /// Euclidean norm of the acceleration vector (g)
    pub fn accel_magnitude(&self) -> f32 {
        let [x, y, z] = self.accel;
        libm::sqrtf(x * x + y * y + z * z)
    }

    /// Acceleration in milli-g, saturated to the i16 range
    pub fn accel_milli_g(&self) -> [i16; 3] {
        let to_mg = |g: f32| {
            let mg = libm::roundf(g * 1000.0);
            mg.clamp(i16::MIN as f32, i16::MAX as f32) as i16
        };
        [to_mg(self.accel[0]), to_mg(self.accel[1]), to_mg(self.accel[2])]
    }
}

/// Per-window summary statistics handed to the classifier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    values: [f32; FEATURE_COUNT],
}

impl FeatureVector {
    /// Index of the first standard-deviation feature
    pub const STD_OFFSET: usize = 6;
    /// Index of accelerometer magnitude RMS
    pub const MAG_RMS: usize = 12;
    /// Index of accelerometer magnitude minimum
    pub const MAG_MIN: usize = 13;
    /// Index of accelerometer magnitude maximum
    pub const MAG_MAX: usize = 14;
    /// Index of accelerometer magnitude range
    pub const MAG_RANGE: usize = 15;

    /// Wrap raw feature values (e.g. replayed from a recorded dataset)
    pub const fn from_values(values: [f32; FEATURE_COUNT]) -> Self {
        Self { values }
    }

    /// Features in classifier input order
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// Mean of one axis over the window
    pub fn mean(&self, axis: Axis) -> f32 {
        self.values[axis as usize]
    }

    /// Population standard deviation of one axis over the window
    pub fn std_dev(&self, axis: Axis) -> f32 {
        self.values[Self::STD_OFFSET + axis as usize]
    }

    /// Accelerometer magnitude RMS (g)
    pub fn magnitude_rms(&self) -> f32 {
        self.values[Self::MAG_RMS]
    }

    /// Accelerometer magnitude peak-to-peak range (g)
    pub fn magnitude_range(&self) -> f32 {
        self.values[Self::MAG_RANGE]
    }

    /// Summarize a buffered window
    pub fn from_samples<const N: usize>(samples: &CircularBuffer<MotionSample, N>) -> Self {
        let mut values = [0.0f32; FEATURE_COUNT];
        let n = samples.len().max(1) as f32;

        for axis in Axis::ALL {
            let mean = samples.iter().map(|s| s.axis(axis)).sum::<f32>() / n;
            let var = samples
                .iter()
                .map(|s| {
                    let d = s.axis(axis) - mean;
                    d * d
                })
                .sum::<f32>()
                / n;
            values[axis as usize] = mean;
            values[Self::STD_OFFSET + axis as usize] = libm::sqrtf(var);
        }

        let mut sum_sq = 0.0f32;
        let mut min = f32::INFINITY;
        let mut max = 0.0f32;
        for sample in samples.iter() {
            let mag = sample.accel_magnitude();
            sum_sq += mag * mag;
            min = min.min(mag);
            max = max.max(mag);
        }
        if samples.is_empty() {
            min = 0.0;
        }

        values[Self::MAG_RMS] = libm::sqrtf(sum_sq / n);
        values[Self::MAG_MIN] = min;
        values[Self::MAG_MAX] = max;
        values[Self::MAG_RANGE] = max - min;

        Self { values }
    }
}

/// Count-based window accumulator with a stall guard
#[derive(Debug, Clone)]
pub struct WindowExtractor {
    samples: CircularBuffer<MotionSample, MAX_WINDOW_SIZE>,
    stride: usize,
    since_emit: usize,
    stall_limit_ms: u64,
    last_sample_at: Option<Timestamp>,
    stalled: bool,
    windows_emitted: u32,
    incomplete_windows: u32,
}

impl WindowExtractor {
    /// Create an extractor
    ///
    /// `window_size` is clamped to `1..=MAX_WINDOW_SIZE` and `stride` to
    /// `1..=window_size`; [`NodeConfig::validate`](crate::NodeConfig::validate)
    /// rejects out-of-range values before they get here.
    pub fn new(window_size: usize, stride: usize, sample_rate_hz: f32, stall_factor: f32) -> Self {
        let samples = CircularBuffer::with_capacity(window_size);
        let stride = stride.clamp(1, samples.capacity());
        let period_ms = if sample_rate_hz > 0.0 { 1000.0 / sample_rate_hz } else { 1000.0 };
        let stall_limit_ms = libm::ceilf(period_ms * stall_factor.max(1.0)) as u64;

        Self {
            samples,
            stride,
            since_emit: 0,
            stall_limit_ms,
            last_sample_at: None,
            stalled: false,
            windows_emitted: 0,
            incomplete_windows: 0,
        }
    }

    /// Accept one sample; returns the window's features when it completes
    pub fn push(&mut self, sample: MotionSample, now: Timestamp) -> CoreResult<Option<FeatureVector>> {
        // The sensor answered, so the stall episode is over either way
        self.last_sample_at = Some(now);
        self.stalled = false;

        if !sample.is_finite() {
            return Err(CoreError::InvalidSample);
        }

        self.samples.push(sample);
        self.since_emit += 1;

        if !self.samples.is_full() || self.since_emit < self.stride {
            return Ok(None);
        }

        let features = FeatureVector::from_samples(&self.samples);
        self.since_emit = 0;
        self.windows_emitted = self.windows_emitted.wrapping_add(1);

        if self.stride >= self.samples.capacity() {
            self.samples.clear();
        }

        Ok(Some(features))
    }

    /// Check for a stalled motion source
    ///
    /// Returns `InputStarvation` once when the silence first exceeds the
    /// limit; the partial window is discarded at that point. Later calls
    /// during the same episode return `Ok(())`; see [`Self::is_stalled`].
    pub fn check_stall(&mut self, now: Timestamp) -> CoreResult<()> {
        let Some(last) = self.last_sample_at else {
            return Ok(());
        };

        let silent_ms = elapsed_ms(last, now);
        if silent_ms <= self.stall_limit_ms || self.stalled {
            return Ok(());
        }

        self.stalled = true;
        if !self.samples.is_empty() {
            self.incomplete_windows = self.incomplete_windows.wrapping_add(1);
        }
        self.samples.clear();
        self.since_emit = 0;

        Err(CoreError::InputStarvation {
            silent_ms,
            limit_ms: self.stall_limit_ms,
        })
    }

    /// True while inside a stall episode
    pub fn is_stalled(&self) -> bool {
        self.stalled
    }

    /// Samples currently buffered
    pub fn fill(&self) -> usize {
        self.samples.len()
    }

    /// Configured window length
    pub fn window_size(&self) -> usize {
        self.samples.capacity()
    }

    /// Starvation limit in milliseconds
    pub fn stall_limit_ms(&self) -> u64 {
        self.stall_limit_ms
    }

    /// Most recent buffered sample
    pub fn last_sample(&self) -> Option<&MotionSample> {
        self.samples.last()
    }

    /// Completed windows since boot
    pub fn windows_emitted(&self) -> u32 {
        self.windows_emitted
    }

    /// Partial windows discarded by the stall guard
    pub fn incomplete_windows(&self) -> u32 {
        self.incomplete_windows
    }
}
