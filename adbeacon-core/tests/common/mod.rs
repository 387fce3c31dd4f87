//! Common test fixtures for integration tests
//!
//! This module provides:
//! - Scripted classifiers that return a fixed sequence of probability vectors
//! - A recording radio that can be told to fail
//! - Motion sources with controllable silence
//! - A deterministic IMU noise generator

#![allow(dead_code)]

use std::cell::Cell;

use adbeacon_core::{
    classifier::ClassProbabilities,
    time::MockTimeSource,
    AdvertisingConfig, BatteryGauge, Classifier, FeatureVector, MotionSample, MotionSource,
    RadioAdvertiser, RadioError, SensorError, PACKET_LEN,
};

/// Certain, low-motion output
pub const STILL: &[f32] = &[1.0, 0.0, 0.0];

/// Maximally ambiguous output for three classes
pub const UNSURE: &[f32] = &[1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0];

/// Broken output: sums to 0.6
pub const BROKEN: &[f32] = &[0.2, 0.2, 0.2];

/// Classifier replaying a script, one entry per window
///
/// The last entry repeats once the script runs out.
pub struct ScriptedClassifier {
    script: Vec<&'static [f32]>,
    next: Cell<usize>,
    classes: usize,
}

impl ScriptedClassifier {
    pub fn new(script: Vec<&'static [f32]>) -> Self {
        Self { script, next: Cell::new(0), classes: 3 }
    }

    pub fn constant(probs: &'static [f32]) -> Self {
        Self::new(vec![probs])
    }

    /// Windows classified so far
    pub fn calls(&self) -> usize {
        self.next.get()
    }
}

impl Classifier for ScriptedClassifier {
    fn num_classes(&self) -> usize {
        self.classes
    }

    fn classify(&self, _features: &FeatureVector) -> ClassProbabilities {
        let i = self.next.get();
        self.next.set(i + 1);
        let probs = self.script.get(i).or(self.script.last()).copied().unwrap_or(&[]);
        ClassProbabilities::from_slice(probs).unwrap()
    }
}

/// Classifier that burns loop time on a mock clock
pub struct SlowClassifier<'a> {
    pub clock: &'a MockTimeSource,
    pub cost_ms: u64,
}

impl Classifier for SlowClassifier<'_> {
    fn num_classes(&self) -> usize {
        3
    }

    fn classify(&self, _features: &FeatureVector) -> ClassProbabilities {
        self.clock.advance(self.cost_ms);
        ClassProbabilities::from_slice(STILL).unwrap()
    }
}

/// Radio that records every call
#[derive(Default)]
pub struct FakeRadio {
    pub configs: Vec<AdvertisingConfig>,
    pub payloads: Vec<[u8; PACKET_LEN]>,
    pub fail_apply: u32,
}

impl FakeRadio {
    pub fn intervals(&self) -> Vec<u32> {
        self.configs.iter().map(|c| c.interval_ms).collect()
    }
}

impl RadioAdvertiser for FakeRadio {
    fn apply_config(&mut self, config: &AdvertisingConfig) -> Result<(), RadioError> {
        if self.fail_apply > 0 {
            self.fail_apply -= 1;
            return Err(RadioError::Busy);
        }
        self.configs.push(*config);
        Ok(())
    }

    fn set_payload(&mut self, payload: &[u8]) -> Result<(), RadioError> {
        let bytes: [u8; PACKET_LEN] = payload
            .try_into()
            .map_err(|_| RadioError::PayloadTooLarge { len: payload.len() })?;
        self.payloads.push(bytes);
        Ok(())
    }
}

/// IMU returning a fixed sample unless silenced
pub struct FakeMotion {
    pub sample: MotionSample,
    pub silent: bool,
    pub fault: Option<SensorError>,
}

impl FakeMotion {
    pub fn steady(sample: MotionSample) -> Self {
        Self { sample, silent: false, fault: None }
    }

    pub fn resting() -> Self {
        Self::steady(MotionSample::new([0.0, 0.0, 1.0], [0.0; 3]))
    }
}

impl MotionSource for FakeMotion {
    fn read(&mut self) -> nb::Result<MotionSample, SensorError> {
        if let Some(fault) = self.fault {
            return Err(nb::Error::Other(fault));
        }
        if self.silent {
            return Err(nb::Error::WouldBlock);
        }
        Ok(self.sample)
    }
}

/// Battery with a settable level
pub struct FixedBattery(pub Cell<u8>);

impl FixedBattery {
    pub fn new(percent: u8) -> Self {
        Self(Cell::new(percent))
    }
}

impl BatteryGauge for FixedBattery {
    fn percent(&self) -> u8 {
        self.0.get()
    }
}

/// Deterministic IMU noise (LCG), for realistic-looking windows
pub struct NoisyMotion {
    seed: u32,
    amplitude: f32,
}

impl NoisyMotion {
    pub fn new(seed: u32, amplitude: f32) -> Self {
        Self { seed, amplitude }
    }

    fn noise(&mut self) -> f32 {
        self.seed = self.seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        let unit = ((self.seed >> 16) & 0x7fff) as f32 / 32_767.0;
        (unit - 0.5) * 2.0 * self.amplitude
    }
}

impl MotionSource for NoisyMotion {
    fn read(&mut self) -> nb::Result<MotionSample, SensorError> {
        Ok(MotionSample::new(
            [self.noise(), self.noise(), 1.0 + self.noise()],
            [self.noise() * 10.0, self.noise() * 10.0, self.noise() * 10.0],
        ))
    }
}
