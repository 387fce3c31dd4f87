//! Hysteretic Activity State Machine
//!
//! ## States
//!
//! ```text
//!            score > θ_q_out               score > θ_a_in
//!          ┌────────────────┐     (for N consecutive windows)
//!          │                ▼         ┌──────────────────┐
//!     ┌─────────┐      ┌───────────┐  │                  ▼
//!     │  Quiet  │      │ Uncertain │──┘             ┌──────────┐
//!     └─────────┘      └───────────┘                │  Active  │
//!          ▲                │   ▲                   └──────────┘
//!          └────────────────┘   └──────────────────────┘
//!            score < θ_q_in          score < θ_a_out
//! ```
//!
//! The machine starts in `Quiet` and never terminates.
//!
//! ## Why Asymmetric Thresholds?
//!
//! A single boundary makes a score hovering at 0.30 toggle the state every
//! window, and every toggle costs a radio reconfiguration. Separate entry and
//! exit thresholds (`θ_q_in < θ_q_out`, `θ_a_out < θ_a_in`) open a dead band
//! in which the machine simply holds its current state.
//!
//! ## Active-Entry Confirmation
//!
//! `Active` is the most expensive state (shortest advertising interval), so
//! entering it requires the score to exceed `θ_a_in` on `confirm_windows`
//! consecutive evaluations while `Uncertain`. Every other transition is
//! immediate. With `confirm_windows = 1` the machine follows the plain rule.
//!
//! ## Bookkeeping
//!
//! Every evaluation adds the inter-window duration to `time_in_state`. An
//! accepted transition records the previous state, resets `time_in_state`,
//! and increments `transition_count`; the caller forwards the returned
//! [`StateTransition`] to the advertising controller in the same iteration.

use crate::errors::ConfigError;
use crate::time::Timestamp;

/// Operating state of the node
///
/// Discriminants are the wire encoding and must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ActivityState {
    /// Confidently still; longest advertising interval
    #[default]
    Quiet = 0,
    /// Ambiguous classification; medium interval
    Uncertain = 1,
    /// Confidently active; shortest interval
    Active = 2,
}

impl ActivityState {
    /// All states in wire order
    pub const ALL: [ActivityState; 3] = [
        ActivityState::Quiet,
        ActivityState::Uncertain,
        ActivityState::Active,
    ];

    /// Wire code
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Parse a wire code
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ActivityState::Quiet),
            1 => Some(ActivityState::Uncertain),
            2 => Some(ActivityState::Active),
            _ => None,
        }
    }

    /// Human-readable name used by the debug console
    pub const fn name(self) -> &'static str {
        match self {
            ActivityState::Quiet => "Quiet",
            ActivityState::Uncertain => "Uncertain",
            ActivityState::Active => "Active",
        }
    }

    /// Index for per-state tables
    pub const fn index(self) -> usize {
        self as usize
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ActivityState {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{}", self.name())
    }
}

/// Hysteresis thresholds on the context score
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Thresholds {
    /// Fall below this to return from Uncertain to Quiet (θ_q_in)
    pub quiet_in: f32,
    /// Rise above this to leave Quiet (θ_q_out)
    pub quiet_out: f32,
    /// Rise above this to enter Active (θ_a_in)
    pub active_in: f32,
    /// Fall below this to leave Active (θ_a_out)
    pub active_out: f32,
}

impl Thresholds {
    /// Build and validate a threshold set
    pub fn new(quiet_in: f32, quiet_out: f32, active_in: f32, active_out: f32) -> Result<Self, ConfigError> {
        let t = Self { quiet_in, quiet_out, active_in, active_out };
        t.validate()?;
        Ok(t)
    }

    /// Check the hysteresis ordering
    ///
    /// Requires every value in `[0, 1]`, `θ_q_in ≤ θ_q_out`,
    /// `θ_a_out ≤ θ_a_in`, and `θ_q_out ≤ θ_a_in`. Equal entry and exit
    /// values are accepted but disable hysteresis for that band.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let all = [self.quiet_in, self.quiet_out, self.active_in, self.active_out];
        if all.iter().any(|v| !v.is_finite() || *v < 0.0 || *v > 1.0) {
            return Err(ConfigError::InvalidThresholds { reason: "threshold outside [0, 1]" });
        }
        if self.quiet_in > self.quiet_out {
            return Err(ConfigError::InvalidThresholds { reason: "quiet_in above quiet_out" });
        }
        if self.active_out > self.active_in {
            return Err(ConfigError::InvalidThresholds { reason: "active_out above active_in" });
        }
        if self.quiet_out > self.active_in {
            return Err(ConfigError::InvalidThresholds { reason: "quiet_out above active_in" });
        }
        Ok(())
    }

    /// True when both bands have a non-empty dead zone
    pub fn has_hysteresis(&self) -> bool {
        self.quiet_in < self.quiet_out && self.active_out < self.active_in
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            quiet_in: 0.25,
            quiet_out: 0.30,
            active_in: 0.60,
            active_out: 0.55,
        }
    }
}

/// An accepted state change
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateTransition {
    /// State being left
    pub from: ActivityState,
    /// State being entered
    pub to: ActivityState,
    /// How long `from` was held before this transition (ms)
    pub time_in_previous_ms: u64,
    /// Score that triggered the change
    pub score: f32,
    /// Loop time of the evaluation
    pub at: Timestamp,
}

/// Three-state hysteretic machine driven by the context score
#[derive(Debug, Clone)]
pub struct StateMachine {
    thresholds: Thresholds,
    confirm_windows: u8,
    current: ActivityState,
    previous: ActivityState,
    time_in_state_ms: u64,
    transition_count: u32,
    active_streak: u8,
}

impl StateMachine {
    /// Create a machine in `Quiet`
    ///
    /// `confirm_windows` below one is treated as one.
    pub fn new(thresholds: Thresholds, confirm_windows: u8) -> Self {
        Self {
            thresholds,
            confirm_windows: confirm_windows.max(1),
            current: ActivityState::Quiet,
            previous: ActivityState::Quiet,
            time_in_state_ms: 0,
            transition_count: 0,
            active_streak: 0,
        }
    }

    /// Evaluate one window's score
    ///
    /// `elapsed_ms` is the time since the previous evaluation. Returns the
    /// transition when one is accepted; at most one transition per call.
    pub fn evaluate(&mut self, score: f32, elapsed_ms: u64, now: Timestamp) -> Option<StateTransition> {
        self.time_in_state_ms = self.time_in_state_ms.saturating_add(elapsed_ms);

        let t = &self.thresholds;
        let next = match self.current {
            ActivityState::Quiet if score > t.quiet_out => Some(ActivityState::Uncertain),
            ActivityState::Uncertain if score < t.quiet_in => Some(ActivityState::Quiet),
            ActivityState::Uncertain if score > t.active_in => {
                self.active_streak = self.active_streak.saturating_add(1);
                if self.active_streak >= self.confirm_windows {
                    Some(ActivityState::Active)
                } else {
                    None
                }
            }
            ActivityState::Active if score < t.active_out => Some(ActivityState::Uncertain),
            _ => None,
        };

        if self.current == ActivityState::Uncertain && score <= self.thresholds.active_in {
            self.active_streak = 0;
        }

        let next = next?;
        let transition = StateTransition {
            from: self.current,
            to: next,
            time_in_previous_ms: self.time_in_state_ms,
            score,
            at: now,
        };

        self.previous = self.current;
        self.current = next;
        self.time_in_state_ms = 0;
        self.transition_count = self.transition_count.wrapping_add(1);
        self.active_streak = 0;

        log_info!(
            "state {} -> {} (score {:.3}, held {}ms)",
            transition.from.name(),
            transition.to.name(),
            score,
            transition.time_in_previous_ms
        );

        Some(transition)
    }

    /// Account time without a score (e.g. a skipped window)
    pub fn hold(&mut self, elapsed_ms: u64) {
        self.time_in_state_ms = self.time_in_state_ms.saturating_add(elapsed_ms);
    }

    /// Replace thresholds at runtime
    ///
    /// The current state is kept; the new thresholds apply from the next
    /// evaluation.
    pub fn set_thresholds(&mut self, thresholds: Thresholds) -> Result<(), ConfigError> {
        thresholds.validate()?;
        self.thresholds = thresholds;
        self.active_streak = 0;
        Ok(())
    }

    /// Current thresholds
    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Current state
    pub fn current(&self) -> ActivityState {
        self.current
    }

    /// State before the most recent transition
    pub fn previous(&self) -> ActivityState {
        self.previous
    }

    /// Time spent in the current state (ms)
    pub fn time_in_state_ms(&self) -> u64 {
        self.time_in_state_ms
    }

    /// Accepted transitions since boot
    pub fn transition_count(&self) -> u32 {
        self.transition_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_thresholds() -> Thresholds {
        Thresholds::new(0.25, 0.30, 0.60, 0.55).unwrap()
    }

    #[test]
    fn starts_quiet() {
        let sm = StateMachine::new(Thresholds::default(), 2);
        assert_eq!(sm.current(), ActivityState::Quiet);
        assert_eq!(sm.transition_count(), 0);
    }

    #[test]
    fn reference_score_sequence() {
        let mut sm = StateMachine::new(scenario_thresholds(), 2);
        let scores = [0.1, 0.1, 0.4, 0.65, 0.8, 0.5, 0.2];
        let expected = [
            ActivityState::Quiet,
            ActivityState::Quiet,
            ActivityState::Uncertain,
            ActivityState::Uncertain,
            ActivityState::Active,
            ActivityState::Uncertain,
            ActivityState::Quiet,
        ];

        for (i, (&score, &want)) in scores.iter().zip(expected.iter()).enumerate() {
            sm.evaluate(score, 1000, i as u64 * 1000);
            assert_eq!(sm.current(), want, "window {}", i);
        }
        assert_eq!(sm.transition_count(), 4);
    }

    #[test]
    fn single_window_confirmation_is_plain_rule() {
        let mut sm = StateMachine::new(scenario_thresholds(), 1);
        sm.evaluate(0.4, 1000, 0);
        let t = sm.evaluate(0.65, 1000, 1000).unwrap();
        assert_eq!(t.to, ActivityState::Active);
    }

    #[test]
    fn streak_resets_when_score_dips() {
        let mut sm = StateMachine::new(scenario_thresholds(), 2);
        sm.evaluate(0.4, 1000, 0);
        assert!(sm.evaluate(0.7, 1000, 1000).is_none());
        assert!(sm.evaluate(0.5, 1000, 2000).is_none());
        assert!(sm.evaluate(0.7, 1000, 3000).is_none());
        assert_eq!(sm.evaluate(0.7, 1000, 4000).map(|t| t.to), Some(ActivityState::Active));
    }

    #[test]
    fn dead_band_holds_uncertain() {
        let mut sm = StateMachine::new(scenario_thresholds(), 2);
        sm.evaluate(0.4, 1000, 0);
        assert_eq!(sm.current(), ActivityState::Uncertain);

        for i in 0..50 {
            let score = if i % 2 == 0 { 0.26 } else { 0.29 };
            assert!(sm.evaluate(score, 100, 0).is_none());
        }
        assert_eq!(sm.current(), ActivityState::Uncertain);

        assert!(sm.evaluate(0.24, 100, 0).is_some());
        assert_eq!(sm.current(), ActivityState::Quiet);
    }

    #[test]
    fn boundary_values_do_not_transition() {
        let mut sm = StateMachine::new(scenario_thresholds(), 1);
        assert!(sm.evaluate(0.30, 100, 0).is_none());
        sm.evaluate(0.31, 100, 0);
        assert!(sm.evaluate(0.25, 100, 0).is_none());
        assert!(sm.evaluate(0.60, 100, 0).is_none());
    }

    #[test]
    fn transition_bookkeeping() {
        let mut sm = StateMachine::new(scenario_thresholds(), 2);
        sm.evaluate(0.1, 500, 500);
        sm.evaluate(0.1, 500, 1000);
        assert_eq!(sm.time_in_state_ms(), 1000);

        let t = sm.evaluate(0.5, 500, 1500).unwrap();
        assert_eq!(t.from, ActivityState::Quiet);
        assert_eq!(t.to, ActivityState::Uncertain);
        assert_eq!(t.time_in_previous_ms, 1500);
        assert_eq!(t.at, 1500);
        assert_eq!(sm.previous(), ActivityState::Quiet);
        assert_eq!(sm.time_in_state_ms(), 0);

        sm.hold(250);
        assert_eq!(sm.time_in_state_ms(), 250);
    }

    #[test]
    fn quiet_never_jumps_to_active() {
        let mut sm = StateMachine::new(scenario_thresholds(), 1);
        let t = sm.evaluate(0.99, 100, 0).unwrap();
        assert_eq!(t.to, ActivityState::Uncertain);
    }

    #[test]
    fn rejects_inverted_thresholds() {
        assert!(Thresholds::new(0.35, 0.30, 0.60, 0.55).is_err());
        assert!(Thresholds::new(0.25, 0.30, 0.50, 0.55).is_err());
        assert!(Thresholds::new(0.25, 0.70, 0.60, 0.55).is_err());
        assert!(Thresholds::new(-0.1, 0.30, 0.60, 0.55).is_err());

        let collapsed = Thresholds::new(0.3, 0.3, 0.7, 0.7).unwrap();
        assert!(!collapsed.has_hysteresis());
    }

    #[test]
    fn runtime_threshold_update_keeps_state() {
        let mut sm = StateMachine::new(scenario_thresholds(), 1);
        sm.evaluate(0.5, 100, 0);
        sm.set_thresholds(Thresholds::new(0.1, 0.2, 0.9, 0.8).unwrap()).unwrap();
        assert_eq!(sm.current(), ActivityState::Uncertain);
        assert!(sm.evaluate(0.5, 100, 0).is_none());
    }

    #[test]
    fn wire_codes_are_stable() {
        for state in ActivityState::ALL {
            assert_eq!(ActivityState::from_code(state.code()), Some(state));
        }
        assert_eq!(ActivityState::Quiet.code(), 0);
        assert_eq!(ActivityState::Uncertain.code(), 1);
        assert_eq!(ActivityState::Active.code(), 2);
        assert_eq!(ActivityState::from_code(3), None);
    }
}
