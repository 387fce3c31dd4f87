//! Adaptive Advertising Controller
//!
//! ## Overview
//!
//! Maps each [`ActivityState`] to radio broadcast parameters and pushes them
//! to the radio when the state changes. Radio reconfiguration is not free:
//! on most BLE stacks it stops and restarts the advertising set, so a score
//! oscillating around a threshold must not translate into a reconfiguration
//! storm.
//!
//! ## Dwell Rate Limit
//!
//! A transition is applied immediately only if the node held its *previous*
//! state for at least `min_dwell_ms`. Otherwise [`DwellPolicy`] decides:
//!
//! | Policy | Behaviour |
//! |--------|-----------|
//! | `Defer` | Record the target as pending. [`AdvertisingController::poll`] applies it once the new state has itself been held for the dwell. A transition back to the state already on air cancels the pending change. |
//! | `Immediate` | Apply anyway, trading radio churn for responsiveness. |
//!
//! The state machine's view of the current state is never gated; only the
//! radio lags behind it.
//!
//! ```text
//! Defer, dwell 2 s:
//!
//! state:   Quiet ───────┐ Uncertain ┐ Active ─────────────────────
//! t (s):   0           10          10.5                12.5
//! radio:   2000 ms ────────────────────────────────────┐ 100 ms ───
//!                        └ applied (Quiet held 10 s)   └ pending Active
//!                          → 500 ms                      applied after 2 s
//! ```
//!
//! The controller is the only path that changes radio parameters, and it
//! only acts on state transitions (plus the initial `start`).

use crate::config::{DwellPolicy, NodeConfig};
use crate::constants::radio::ms_to_adv_units;
use crate::errors::RadioError;
use crate::state::{ActivityState, StateTransition};
use crate::time::Timestamp;
use crate::traits::RadioAdvertiser;

/// Discrete TX power levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TxPower {
    /// 0 dBm
    #[default]
    ZeroDbm,
    /// −4 dBm
    Minus4Dbm,
    /// −8 dBm
    Minus8Dbm,
}

impl TxPower {
    /// Power in dBm
    pub const fn dbm(self) -> i8 {
        match self {
            TxPower::ZeroDbm => 0,
            TxPower::Minus4Dbm => -4,
            TxPower::Minus8Dbm => -8,
        }
    }
}

/// Advertising mode; the node only ever broadcasts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdvertisingMode {
    /// Non-connectable, undirected (ADV_NONCONN_IND)
    #[default]
    NonConnectableUndirected,
}

/// Radio broadcast parameters for one state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvertisingConfig {
    /// Advertising interval (ms)
    pub interval_ms: u32,
    /// Transmit power
    pub tx_power: TxPower,
    /// Advertising PDU type
    pub mode: AdvertisingMode,
}

impl AdvertisingConfig {
    /// Non-connectable config with the given interval and power
    pub const fn new(interval_ms: u32, tx_power: TxPower) -> Self {
        Self {
            interval_ms,
            tx_power,
            mode: AdvertisingMode::NonConnectableUndirected,
        }
    }

    /// Interval in the radio's native 0.625 ms ticks
    pub const fn interval_units(&self) -> u32 {
        ms_to_adv_units(self.interval_ms)
    }
}

/// Per-state advertising parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvertisingProfile {
    configs: [AdvertisingConfig; 3],
}

impl AdvertisingProfile {
    /// Build a profile from one config per state
    pub const fn new(quiet: AdvertisingConfig, uncertain: AdvertisingConfig, active: AdvertisingConfig) -> Self {
        Self { configs: [quiet, uncertain, active] }
    }

    /// Profile described by a node configuration
    pub fn from_config(config: &NodeConfig) -> Self {
        Self::new(
            AdvertisingConfig::new(config.adv_interval_quiet_ms, config.tx_power_quiet),
            AdvertisingConfig::new(config.adv_interval_uncertain_ms, config.tx_power_uncertain),
            AdvertisingConfig::new(config.adv_interval_active_ms, config.tx_power_active),
        )
    }

    /// Config for a state
    pub fn for_state(&self, state: ActivityState) -> AdvertisingConfig {
        self.configs[state.index()]
    }
}

/// What the controller did with a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerAction {
    /// New parameters are on air
    Applied(AdvertisingConfig),
    /// Dwell not met; parameters pending
    Deferred(AdvertisingConfig),
    /// Target already on air; any pending change was dropped
    Unchanged,
}

/// Controller counters, reported by the debug console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControllerStats {
    /// Radio reconfigurations performed
    pub applied: u32,
    /// Transitions whose reconfiguration was deferred
    pub deferred: u32,
    /// Pending changes cancelled by a later transition
    pub superseded: u32,
    /// Immediate-policy changes that ignored an unmet dwell
    pub dwell_bypassed: u32,
    /// Radio refused an update
    pub radio_failures: u32,
}

#[derive(Debug, Clone, Copy)]
struct PendingChange {
    state: ActivityState,
    config: AdvertisingConfig,
    due_at: Timestamp,
}

/// Applies per-state advertising parameters, rate-limited by dwell time
#[derive(Debug, Clone)]
pub struct AdvertisingController {
    profile: AdvertisingProfile,
    min_dwell_ms: u64,
    policy: DwellPolicy,
    on_air: Option<(ActivityState, AdvertisingConfig)>,
    pending: Option<PendingChange>,
    stats: ControllerStats,
}

impl AdvertisingController {
    /// Create a controller; nothing is applied until [`Self::start`]
    pub fn new(profile: AdvertisingProfile, min_dwell_ms: u64, policy: DwellPolicy) -> Self {
        Self {
            profile,
            min_dwell_ms,
            policy,
            on_air: None,
            pending: None,
            stats: ControllerStats::default(),
        }
    }

    /// Controller described by a node configuration
    pub fn from_config(config: &NodeConfig) -> Self {
        Self::new(AdvertisingProfile::from_config(config), config.rate_limit_ms(), config.dwell_policy)
    }

    /// Put the boot state's parameters on air
    ///
    /// On failure the change stays pending and [`Self::poll`] retries it.
    pub fn start<R: RadioAdvertiser>(&mut self, state: ActivityState, now: Timestamp, radio: &mut R) -> Result<AdvertisingConfig, RadioError> {
        let config = self.profile.for_state(state);
        self.pending = Some(PendingChange { state, config, due_at: now });
        self.apply(state, config, radio)?;
        Ok(config)
    }

    /// React to an accepted state transition
    pub fn on_transition<R: RadioAdvertiser>(&mut self, transition: &StateTransition, radio: &mut R) -> Result<ControllerAction, RadioError> {
        let target = self.profile.for_state(transition.to);

        if self.on_air.map(|(state, _)| state) == Some(transition.to) {
            if self.pending.take().is_some() {
                self.stats.superseded = self.stats.superseded.wrapping_add(1);
                log_debug!("pending radio change cancelled, {} already on air", transition.to.name());
            }
            return Ok(ControllerAction::Unchanged);
        }

        let dwell_met = transition.time_in_previous_ms >= self.min_dwell_ms;

        if let Some(previous) = self.pending.take() {
            if previous.state != transition.to {
                self.stats.superseded = self.stats.superseded.wrapping_add(1);
            }
        }

        if dwell_met || self.policy == DwellPolicy::Immediate {
            if !dwell_met {
                self.stats.dwell_bypassed = self.stats.dwell_bypassed.wrapping_add(1);
            }
            self.pending = Some(PendingChange { state: transition.to, config: target, due_at: transition.at });
            self.apply(transition.to, target, radio)?;
            return Ok(ControllerAction::Applied(target));
        }

        self.pending = Some(PendingChange {
            state: transition.to,
            config: target,
            due_at: transition.at.saturating_add(self.min_dwell_ms),
        });
        self.stats.deferred = self.stats.deferred.wrapping_add(1);
        log_debug!(
            "radio change to {}ms deferred ({} held {}ms < {}ms)",
            target.interval_ms,
            transition.from.name(),
            transition.time_in_previous_ms,
            self.min_dwell_ms
        );
        Ok(ControllerAction::Deferred(target))
    }

    /// Apply a pending change once its dwell has elapsed
    ///
    /// Also retries changes whose earlier apply failed. Returns the config
    /// put on air, if any.
    pub fn poll<R: RadioAdvertiser>(&mut self, now: Timestamp, radio: &mut R) -> Result<Option<AdvertisingConfig>, RadioError> {
        let Some(pending) = self.pending else {
            return Ok(None);
        };

        if now < pending.due_at {
            return Ok(None);
        }

        self.apply(pending.state, pending.config, radio)?;
        Ok(Some(pending.config))
    }

    fn apply<R: RadioAdvertiser>(&mut self, state: ActivityState, config: AdvertisingConfig, radio: &mut R) -> Result<(), RadioError> {
        if let Err(err) = radio.apply_config(&config) {
            self.stats.radio_failures = self.stats.radio_failures.wrapping_add(1);
            log_error!("radio rejected {}ms interval: {:?}", config.interval_ms, err);
            return Err(err);
        }

        self.on_air = Some((state, config));
        self.pending = None;
        self.stats.applied = self.stats.applied.wrapping_add(1);
        log_info!(
            "advertising {} at {}ms ({} dBm)",
            state.name(),
            config.interval_ms,
            config.tx_power.dbm()
        );
        Ok(())
    }

    /// Parameters currently on air
    pub fn on_air(&self) -> Option<AdvertisingConfig> {
        self.on_air.map(|(_, config)| config)
    }

    /// State whose parameters are on air
    pub fn on_air_state(&self) -> Option<ActivityState> {
        self.on_air.map(|(state, _)| state)
    }

    /// Pending parameters, if a change is deferred
    pub fn pending(&self) -> Option<AdvertisingConfig> {
        self.pending.map(|p| p.config)
    }

    /// Target parameters for a state
    pub fn profile(&self) -> &AdvertisingProfile {
        &self.profile
    }

    /// Counters
    pub fn stats(&self) -> ControllerStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingRadio {
        applied: Vec<u32>,
        fail_next: bool,
    }

    impl RadioAdvertiser for RecordingRadio {
        fn apply_config(&mut self, config: &AdvertisingConfig) -> Result<(), RadioError> {
            if self.fail_next {
                self.fail_next = false;
                return Err(RadioError::Busy);
            }
            self.applied.push(config.interval_ms);
            Ok(())
        }

        fn set_payload(&mut self, _payload: &[u8]) -> Result<(), RadioError> {
            Ok(())
        }
    }

    fn profile() -> AdvertisingProfile {
        AdvertisingProfile::new(
            AdvertisingConfig::new(2000, TxPower::Minus8Dbm),
            AdvertisingConfig::new(500, TxPower::Minus4Dbm),
            AdvertisingConfig::new(100, TxPower::ZeroDbm),
        )
    }

    fn transition(from: ActivityState, to: ActivityState, held: u64, at: Timestamp) -> StateTransition {
        StateTransition { from, to, time_in_previous_ms: held, score: 0.5, at }
    }

    #[test]
    fn start_applies_boot_state() {
        let mut radio = RecordingRadio::default();
        let mut ctl = AdvertisingController::new(profile(), 2000, DwellPolicy::Defer);

        let config = ctl.start(ActivityState::Quiet, 0, &mut radio).unwrap();
        assert_eq!(config.interval_ms, 2000);
        assert_eq!(radio.applied, vec![2000]);
        assert_eq!(ctl.on_air_state(), Some(ActivityState::Quiet));
    }

    #[test]
    fn applies_when_dwell_met() {
        let mut radio = RecordingRadio::default();
        let mut ctl = AdvertisingController::new(profile(), 2000, DwellPolicy::Defer);
        ctl.start(ActivityState::Quiet, 0, &mut radio).unwrap();

        let action = ctl
            .on_transition(&transition(ActivityState::Quiet, ActivityState::Uncertain, 10_000, 10_000), &mut radio)
            .unwrap();
        assert_eq!(action, ControllerAction::Applied(profile().for_state(ActivityState::Uncertain)));
        assert_eq!(radio.applied, vec![2000, 500]);
    }

    #[test]
    fn defers_until_new_state_held() {
        let mut radio = RecordingRadio::default();
        let mut ctl = AdvertisingController::new(profile(), 2000, DwellPolicy::Defer);
        ctl.start(ActivityState::Quiet, 0, &mut radio).unwrap();
        ctl.on_transition(&transition(ActivityState::Quiet, ActivityState::Uncertain, 10_000, 10_000), &mut radio)
            .unwrap();

        let action = ctl
            .on_transition(&transition(ActivityState::Uncertain, ActivityState::Active, 500, 10_500), &mut radio)
            .unwrap();
        assert!(matches!(action, ControllerAction::Deferred(c) if c.interval_ms == 100));
        assert_eq!(ctl.pending().map(|c| c.interval_ms), Some(100));

        assert_eq!(ctl.poll(12_000, &mut radio).unwrap(), None);
        assert_eq!(ctl.poll(12_500, &mut radio).unwrap().map(|c| c.interval_ms), Some(100));
        assert_eq!(radio.applied, vec![2000, 500, 100]);
        assert_eq!(ctl.pending(), None);
        assert_eq!(ctl.stats().deferred, 1);
    }

    #[test]
    fn flip_back_cancels_pending() {
        let mut radio = RecordingRadio::default();
        let mut ctl = AdvertisingController::new(profile(), 2000, DwellPolicy::Defer);
        ctl.start(ActivityState::Quiet, 0, &mut radio).unwrap();

        ctl.on_transition(&transition(ActivityState::Quiet, ActivityState::Uncertain, 1_000, 1_000), &mut radio)
            .unwrap();
        let action = ctl
            .on_transition(&transition(ActivityState::Uncertain, ActivityState::Quiet, 200, 1_200), &mut radio)
            .unwrap();

        assert_eq!(action, ControllerAction::Unchanged);
        assert_eq!(ctl.pending(), None);
        assert_eq!(ctl.poll(60_000, &mut radio).unwrap(), None);
        assert_eq!(radio.applied, vec![2000]);
        assert_eq!(ctl.stats().superseded, 1);
    }

    #[test]
    fn immediate_policy_bypasses_dwell() {
        let mut radio = RecordingRadio::default();
        let mut ctl = AdvertisingController::new(profile(), 2000, DwellPolicy::Immediate);
        ctl.start(ActivityState::Quiet, 0, &mut radio).unwrap();

        let action = ctl
            .on_transition(&transition(ActivityState::Quiet, ActivityState::Uncertain, 100, 100), &mut radio)
            .unwrap();
        assert!(matches!(action, ControllerAction::Applied(_)));
        assert_eq!(radio.applied, vec![2000, 500]);
        assert_eq!(ctl.stats().dwell_bypassed, 1);
    }

    #[test]
    fn failed_apply_is_retried_by_poll() {
        let mut radio = RecordingRadio::default();
        let mut ctl = AdvertisingController::new(profile(), 2000, DwellPolicy::Defer);
        ctl.start(ActivityState::Quiet, 0, &mut radio).unwrap();

        radio.fail_next = true;
        let err = ctl
            .on_transition(&transition(ActivityState::Quiet, ActivityState::Uncertain, 5_000, 5_000), &mut radio)
            .unwrap_err();
        assert_eq!(err, RadioError::Busy);
        assert_eq!(ctl.on_air_state(), Some(ActivityState::Quiet));
        assert_eq!(ctl.stats().radio_failures, 1);

        assert_eq!(ctl.poll(7_000, &mut radio).unwrap().map(|c| c.interval_ms), Some(500));
        assert_eq!(ctl.on_air_state(), Some(ActivityState::Uncertain));
    }

    #[test]
    fn interval_units() {
        assert_eq!(AdvertisingConfig::new(100, TxPower::ZeroDbm).interval_units(), 160);
        assert_eq!(AdvertisingConfig::new(2000, TxPower::ZeroDbm).interval_units(), 3200);
        assert_eq!(TxPower::Minus8Dbm.dbm(), -8);
    }
}
