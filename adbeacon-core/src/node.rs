//! Node Context and Loop Iteration
//!
//! ## Overview
//!
//! [`NodeContext`] owns every piece of mutable device state: the window
//! extractor, the estimator's volatility ring, the state machine, the
//! advertising controller, the sequence counter, and the counters the debug
//! console reports. There are no globals; a test builds a fresh context and
//! drives it with fake capabilities.
//!
//! ## One Tick
//!
//! [`NodeContext::tick`] runs once per sampling-timer wake-up:
//!
//! ```text
//! read sample ──┬─ WouldBlock ── stall check ─────────────────────┐
//!               ├─ error ─────── count ───────────────────────────┤
//!               └─ sample ────── push into window                 │
//!                                  │ (window complete)            │
//!                                  ▼                              │
//!                      classify (timed) → validate                │
//!                                  ▼                              │
//!                      uncertainty / volatility / score           │
//!                                  ▼                              │
//!                      evaluate state → notify controller         │
//!                                  ▼                              ▼
//!                      poll deferred change ◄───────────── poll deferred change
//!                                  ▼
//!                      encode packet → set payload
//! ```
//!
//! Within one tick these steps run in this order only, so a transition
//! computed on window *k* is always visible in the packet encoded for
//! window *k*.
//!
//! ## Failure Handling
//!
//! `tick` never returns an error. Failures are counted in [`NodeCounters`]
//! and surfaced as [`TickOutcome::Degraded`]; the state machine keeps its
//! last known good state.

use crate::classifier::{validate_probabilities, Classifier};
use crate::codec::{SequenceCounter, StatusPacket, PACKET_LEN};
use crate::config::NodeConfig;
use crate::controller::{AdvertisingConfig, AdvertisingController};
use crate::errors::{ConfigError, CoreError, RadioError};
use crate::estimator::{UncertaintyEstimator, UncertaintyMetrics};
use crate::features::{FeatureVector, MotionSample, WindowExtractor};
use crate::handoff::{RadioEvent, RadioEventReceiver};
use crate::state::{ActivityState, StateMachine, StateTransition, Thresholds};
use crate::time::{elapsed_ms, Timestamp};
use crate::traits::{BatteryGauge, MotionSource, RadioAdvertiser, TimeSource};

/// Result of one completed window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowReport {
    /// Estimator output for the window
    pub metrics: UncertaintyMetrics,
    /// State after evaluation
    pub state: ActivityState,
    /// Transition accepted on this window, if any
    pub transition: Option<StateTransition>,
    /// Packet encoded for this window
    pub packet: StatusPacket,
}

/// What one call to [`NodeContext::tick`] did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// No sample was ready
    Idle,
    /// Sample buffered; window not yet complete
    Sampled,
    /// Window completed and processed
    Window(WindowReport),
    /// Something failed; the last good state is held
    Degraded(CoreError),
}

/// Diagnostic counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeCounters {
    /// Samples accepted into the window
    pub samples: u32,
    /// Windows classified
    pub windows: u32,
    /// Non-finite samples rejected
    pub invalid_samples: u32,
    /// Motion source failures
    pub sensor_errors: u32,
    /// Stall episodes
    pub starvation_events: u32,
    /// Windows rejected for classifier contract violations
    pub classifier_errors: u32,
    /// Inference passes over the loop budget
    pub deadline_overruns: u32,
    /// Radio refusals, synchronous or reported by event
    pub radio_errors: u32,
    /// Packets encoded
    pub packets_encoded: u32,
    /// Advertising events reported by the radio
    pub adv_events: u32,
    /// Advertising-set stops reported by the radio
    pub adv_stops: u32,
    /// Time spent in each state (ms), indexed by state code
    pub residency_ms: [u64; 3],
    /// Time each state's radio parameters were on air (ms)
    pub on_air_ms: [u64; 3],
}

/// Complete mutable device state
#[derive(Debug, Clone)]
pub struct NodeContext {
    config: NodeConfig,
    extractor: WindowExtractor,
    estimator: UncertaintyEstimator,
    machine: StateMachine,
    controller: AdvertisingController,
    sequence: SequenceCounter,
    counters: NodeCounters,
    last_metrics: UncertaintyMetrics,
    last_sample: Option<MotionSample>,
    last_payload: Option<[u8; PACKET_LEN]>,
    last_tick_at: Option<Timestamp>,
    last_window_at: Option<Timestamp>,
    started: bool,
}

impl NodeContext {
    /// Validate `config` and build a context in `Quiet`
    pub fn new(config: NodeConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            extractor: WindowExtractor::new(
                config.window_size,
                config.stride(),
                config.sample_rate_hz,
                config.stall_factor,
            ),
            estimator: UncertaintyEstimator::new(config.ewma_alpha, config.volatility_beta, config.volatility_window),
            machine: StateMachine::new(config.thresholds(), config.active_confirm_windows),
            controller: AdvertisingController::from_config(&config),
            sequence: SequenceCounter::new(),
            counters: NodeCounters::default(),
            last_metrics: UncertaintyMetrics::default(),
            last_sample: None,
            last_payload: None,
            last_tick_at: None,
            last_window_at: None,
            started: false,
            config,
        })
    }

    /// Put the boot state's radio parameters on air
    ///
    /// Called by the first [`Self::tick`] if not called explicitly. A failure
    /// is counted and retried on later ticks.
    pub fn start<R: RadioAdvertiser>(&mut self, radio: &mut R, now: Timestamp) -> Result<(), RadioError> {
        self.started = true;
        self.last_tick_at.get_or_insert(now);
        let result = self.controller.start(self.machine.current(), now, radio);
        if result.is_err() {
            self.counters.radio_errors = self.counters.radio_errors.wrapping_add(1);
        }
        result.map(|_| ())
    }

    /// Run one loop iteration
    pub fn tick<M, C, R, B, T>(
        &mut self,
        motion: &mut M,
        classifier: &C,
        radio: &mut R,
        battery: &B,
        clock: &T,
    ) -> TickOutcome
    where
        M: MotionSource,
        C: Classifier,
        R: RadioAdvertiser,
        B: BatteryGauge,
        T: TimeSource,
    {
        let now = clock.now();
        if !self.started {
            // Failure already counted; the controller keeps the change pending
            let _ = self.start(radio, now);
        }
        self.account_time(now);

        let outcome = match motion.read() {
            Ok(sample) => match self.extractor.push(sample, now) {
                Ok(Some(features)) => {
                    self.counters.samples = self.counters.samples.wrapping_add(1);
                    self.last_sample = Some(sample);
                    return self.process_window(&features, classifier, radio, battery, clock, now);
                }
                Ok(None) => {
                    self.counters.samples = self.counters.samples.wrapping_add(1);
                    self.last_sample = Some(sample);
                    TickOutcome::Sampled
                }
                Err(err) => {
                    self.counters.invalid_samples = self.counters.invalid_samples.wrapping_add(1);
                    log_warn!("dropping motion sample: {}", err);
                    TickOutcome::Degraded(err)
                }
            },
            Err(nb::Error::WouldBlock) => match self.check_starvation(now) {
                Some(err) => TickOutcome::Degraded(err),
                None => TickOutcome::Idle,
            },
            Err(nb::Error::Other(err)) => {
                self.counters.sensor_errors = self.counters.sensor_errors.wrapping_add(1);
                log_debug!("motion source failed: {}", err);
                // A failing sensor starves the window just like a silent one
                let starved = self.check_starvation(now);
                TickOutcome::Degraded(starved.unwrap_or(CoreError::Sensor(err)))
            }
        };

        self.poll_radio(now, radio);
        outcome
    }

    /// Count and log the start of a stall episode
    fn check_starvation(&mut self, now: Timestamp) -> Option<CoreError> {
        let err = self.extractor.check_stall(now).err()?;
        self.counters.starvation_events = self.counters.starvation_events.wrapping_add(1);
        log_warn!("{}; holding {}", err, self.machine.current().name());
        Some(err)
    }

    fn process_window<C, R, B, T>(
        &mut self,
        features: &FeatureVector,
        classifier: &C,
        radio: &mut R,
        battery: &B,
        clock: &T,
        now: Timestamp,
    ) -> TickOutcome
    where
        C: Classifier,
        R: RadioAdvertiser,
        B: BatteryGauge,
        T: TimeSource,
    {
        let since_last = match self.last_window_at {
            Some(previous) => elapsed_ms(previous, now),
            None => self.config.window_period_ms(),
        };
        self.last_window_at = Some(now);
        self.counters.windows = self.counters.windows.wrapping_add(1);

        let started = clock.now();
        let probs = classifier.classify(features);
        let took_ms = elapsed_ms(started, clock.now());
        if took_ms > self.config.loop_budget_ms {
            self.counters.deadline_overruns = self.counters.deadline_overruns.wrapping_add(1);
            log_error!(
                "{}",
                CoreError::DeadlineExceeded { elapsed_ms: took_ms, budget_ms: self.config.loop_budget_ms }
            );
        }

        if let Err(err) = validate_probabilities(&probs, self.config.num_classes) {
            self.counters.classifier_errors = self.counters.classifier_errors.wrapping_add(1);
            log_warn!("window skipped: {}", err);
            self.machine.hold(since_last);
            self.poll_radio(now, radio);
            return TickOutcome::Degraded(err);
        }

        let metrics = self.estimator.update(&probs);
        self.last_metrics = metrics;

        let transition = self.machine.evaluate(metrics.context_score, since_last, now);
        if let Some(transition) = &transition {
            if self.controller.on_transition(transition, radio).is_err() {
                self.counters.radio_errors = self.counters.radio_errors.wrapping_add(1);
            }
        }
        self.poll_radio(now, radio);

        let packet = self.encode_packet(metrics, battery, now);
        let payload = packet.encode();
        if let Err(_err) = radio.set_payload(&payload) {
            self.counters.radio_errors = self.counters.radio_errors.wrapping_add(1);
            log_error!("payload update failed: {}", _err);
        }
        self.last_payload = Some(payload);

        TickOutcome::Window(WindowReport {
            metrics,
            state: self.machine.current(),
            transition,
            packet,
        })
    }

    fn encode_packet<B: BatteryGauge>(&mut self, metrics: UncertaintyMetrics, battery: &B, now: Timestamp) -> StatusPacket {
        let interval_ms = self.controller.on_air().map_or(0, |config| config.interval_ms);
        let accel = self.last_sample.map_or([0; 3], |sample| sample.accel_milli_g());

        self.counters.packets_encoded = self.counters.packets_encoded.wrapping_add(1);
        StatusPacket::new(
            self.sequence.next(),
            self.machine.current(),
            metrics.uncertainty,
            battery.percent(),
            now,
            interval_ms,
        )
        .with_accel(accel)
    }

    fn poll_radio<R: RadioAdvertiser>(&mut self, now: Timestamp, radio: &mut R) {
        if self.controller.poll(now, radio).is_err() {
            self.counters.radio_errors = self.counters.radio_errors.wrapping_add(1);
        }
    }

    fn account_time(&mut self, now: Timestamp) {
        let Some(previous) = self.last_tick_at.replace(now) else {
            return;
        };
        let dt = elapsed_ms(previous, now);

        let state = self.machine.current().index();
        self.counters.residency_ms[state] = self.counters.residency_ms[state].saturating_add(dt);

        if let Some(on_air) = self.controller.on_air_state() {
            let idx = on_air.index();
            self.counters.on_air_ms[idx] = self.counters.on_air_ms[idx].saturating_add(dt);
        }
    }

    /// Drain radio callback events; returns how many were handled
    pub fn service_radio_events<const N: usize>(&mut self, events: &mut RadioEventReceiver<'_, N>) -> usize {
        let mut handled = 0;
        while let Some(event) = events.recv() {
            handled += 1;
            match event {
                RadioEvent::AdvertisingSent => {
                    self.counters.adv_events = self.counters.adv_events.wrapping_add(1);
                }
                RadioEvent::AdvertisingStopped => {
                    self.counters.adv_stops = self.counters.adv_stops.wrapping_add(1);
                    log_debug!("advertising set stopped");
                }
                RadioEvent::Fault(_err) => {
                    self.counters.radio_errors = self.counters.radio_errors.wrapping_add(1);
                    log_error!("radio fault: {}", _err);
                }
            }
        }
        handled
    }

    /// Replace the state-machine thresholds at runtime
    pub fn set_thresholds(&mut self, thresholds: Thresholds) -> Result<(), ConfigError> {
        self.machine.set_thresholds(thresholds)?;
        self.config.theta_q_in = thresholds.quiet_in;
        self.config.theta_q_out = thresholds.quiet_out;
        self.config.theta_a_in = thresholds.active_in;
        self.config.theta_a_out = thresholds.active_out;
        Ok(())
    }

    /// Advertising events expected from on-air time and intervals
    pub fn estimated_adv_events(&self) -> u64 {
        ActivityState::ALL
            .iter()
            .map(|state| {
                let interval = self.controller.profile().for_state(*state).interval_ms.max(1) as u64;
                self.counters.on_air_ms[state.index()] / interval
            })
            .sum()
    }

    /// Current state
    pub fn state(&self) -> ActivityState {
        self.machine.current()
    }

    /// State machine
    pub fn machine(&self) -> &StateMachine {
        &self.machine
    }

    /// Advertising controller
    pub fn controller(&self) -> &AdvertisingController {
        &self.controller
    }

    /// Radio parameters on air
    pub fn advertising(&self) -> Option<AdvertisingConfig> {
        self.controller.on_air()
    }

    /// Metrics of the last accepted window
    pub fn last_metrics(&self) -> UncertaintyMetrics {
        self.last_metrics
    }

    /// Last encoded payload
    pub fn last_payload(&self) -> Option<[u8; PACKET_LEN]> {
        self.last_payload
    }

    /// Sequence number the next packet will carry
    pub fn next_sequence(&self) -> u8 {
        self.sequence.peek()
    }

    /// Counters
    pub fn counters(&self) -> &NodeCounters {
        &self.counters
    }

    /// Window extractor
    pub fn extractor(&self) -> &WindowExtractor {
        &self.extractor
    }

    /// Active configuration
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }
}
