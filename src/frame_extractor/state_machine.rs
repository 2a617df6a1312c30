use serde::{Deserialize, Serialize};

/// 稳定性状态机
///
/// `Primed` only exists before the first sampled frame, which is always
/// captured. Every unchanged frame in a transition first checks the clock
/// against `stable_duration_sec` and only then adds its `dt`, so a capture
/// lands on the frame after the content has held still long enough.
#[derive(Debug, Clone, PartialEq)]
pub enum StabilityState {
    Primed,
    Stable,
    InTransition { stable_accum: f64 },
}

impl StabilityState {
    pub fn new() -> Self {
        StabilityState::Primed
    }

    pub fn transition(
        &self,
        changed: bool,
        dt: f64,
        config: &StabilityConfig,
    ) -> (StabilityState, TrackerAction) {
        if changed && *self != StabilityState::Primed {
            return (
                StabilityState::InTransition { stable_accum: 0.0 },
                TrackerAction::Hold,
            );
        }

        match self {
            StabilityState::Primed => (StabilityState::Stable, TrackerAction::Capture),

            StabilityState::Stable => (StabilityState::Stable, TrackerAction::Idle),

            StabilityState::InTransition { stable_accum } => {
                if *stable_accum >= config.stable_duration_sec {
                    (StabilityState::Stable, TrackerAction::Capture)
                } else {
                    (
                        StabilityState::InTransition {
                            stable_accum: stable_accum + dt,
                        },
                        TrackerAction::Hold,
                    )
                }
            }
        }
    }

    pub fn is_in_transition(&self) -> bool {
        matches!(self, StabilityState::InTransition { .. })
    }

    pub fn stable_accum(&self) -> f64 {
        match self {
            StabilityState::InTransition { stable_accum, .. } => *stable_accum,
            _ => 0.0,
        }
    }
}

impl Default for StabilityState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackerAction {
    /// Emit the current frame as a capture.
    Capture,
    /// Content is moving or still settling.
    Hold,
    /// Content is stable and already captured.
    Idle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityConfig {
    pub stable_duration_sec: f64,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            stable_duration_sec: 2.0,
        }
    }
}

impl StabilityConfig {
    pub fn for_fast_scroll() -> Self {
        Self {
            stable_duration_sec: 1.0,
        }
    }
}

/// One run's tracker; not shared between runs.
pub struct StabilityTracker {
    state: StabilityState,
    config: StabilityConfig,
    last_timestamp: Option<f64>,
    frame_counter: u64,
    transitions: u64,
    captures: u64,
}

impl StabilityTracker {
    pub fn new() -> Self {
        Self::with_config(StabilityConfig::default())
    }

    pub fn with_config(config: StabilityConfig) -> Self {
        Self {
            state: StabilityState::new(),
            config,
            last_timestamp: None,
            frame_counter: 0,
            transitions: 0,
            captures: 0,
        }
    }

    pub fn update(&mut self, timestamp: f64, changed: bool) -> TrackerAction {
        self.frame_counter += 1;
        let dt = self
            .last_timestamp
            .map(|last| (timestamp - last).max(0.0))
            .unwrap_or(0.0);
        self.last_timestamp = Some(timestamp);

        let (new_state, action) = self.state.transition(changed, dt, &self.config);
        if changed && new_state.is_in_transition() {
            self.transitions += 1;
        }
        if action == TrackerAction::Capture {
            self.captures += 1;
        }
        self.state = new_state;

        action
    }

    pub fn current_state(&self) -> &StabilityState {
        &self.state
    }

    pub fn is_in_transition(&self) -> bool {
        self.state.is_in_transition()
    }

    pub fn stable_accum(&self) -> f64 {
        self.state.stable_accum()
    }

    pub fn last_timestamp(&self) -> Option<f64> {
        self.last_timestamp
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }

    /// Frames flagged as changed, including re-detections mid-transition.
    pub fn transition_count(&self) -> u64 {
        self.transitions
    }

    pub fn capture_count(&self) -> u64 {
        self.captures
    }

    pub fn reset(&mut self) {
        self.state = StabilityState::new();
        self.last_timestamp = None;
        self.frame_counter = 0;
        self.transitions = 0;
        self.captures = 0;
    }
}

impl Default for StabilityTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(flags: &[bool], stable_sec: f64) -> Vec<TrackerAction> {
        let mut tracker = StabilityTracker::with_config(StabilityConfig {
            stable_duration_sec: stable_sec,
        });
        flags
            .iter()
            .enumerate()
            .map(|(i, &changed)| tracker.update(i as f64, changed))
            .collect()
    }

    fn capture_steps(actions: &[TrackerAction]) -> Vec<usize> {
        actions
            .iter()
            .enumerate()
            .filter(|(_, a)| **a == TrackerAction::Capture)
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn test_first_frame_captured() {
        let mut tracker = StabilityTracker::new();
        assert!(matches!(tracker.current_state(), StabilityState::Primed));

        assert_eq!(tracker.update(0.0, false), TrackerAction::Capture);
        assert!(matches!(tracker.current_state(), StabilityState::Stable));
    }

    #[test]
    fn test_capture_after_settling() {
        let actions = run(&[true, true, false, false, false], 2.0);
        assert_eq!(capture_steps(&actions), vec![0, 4]);
        assert_eq!(actions[1], TrackerAction::Hold);
        assert_eq!(actions[2], TrackerAction::Hold);
        assert_eq!(actions[3], TrackerAction::Hold);
    }

    #[test]
    fn test_one_capture_per_episode() {
        let mut flags = vec![false, true];
        flags.extend(std::iter::repeat(false).take(50));
        let actions = run(&flags, 2.0);
        assert_eq!(capture_steps(&actions), vec![0, 4]);
        assert!(actions[5..].iter().all(|a| *a == TrackerAction::Idle));
    }

    #[test]
    fn test_change_mid_transition_restarts_clock() {
        let actions = run(&[false, true, false, false, true, false, false, false], 2.0);
        assert_eq!(capture_steps(&actions), vec![0, 7]);
    }

    #[test]
    fn test_stable_without_change_is_idle() {
        let actions = run(&[false, false, false, false], 1.0);
        assert_eq!(capture_steps(&actions), vec![0]);
        assert_eq!(actions[3], TrackerAction::Idle);
    }

    #[test]
    fn test_accumulates_real_time_deltas() {
        let mut tracker = StabilityTracker::with_config(StabilityConfig {
            stable_duration_sec: 1.0,
        });
        tracker.update(0.0, false);
        tracker.update(1.0, true);
        assert_eq!(tracker.update(1.5, false), TrackerAction::Hold);
        assert_eq!(tracker.stable_accum(), 0.5);
        // 跳过的帧让 dt 跨越空档
        assert_eq!(tracker.update(3.0, false), TrackerAction::Hold);
        assert_eq!(tracker.stable_accum(), 2.0);
        assert_eq!(tracker.update(3.5, false), TrackerAction::Capture);
        assert_eq!(tracker.last_timestamp(), Some(3.5));
    }

    #[test]
    fn test_gap_right_after_change_counts() {
        let mut tracker = StabilityTracker::new();
        tracker.update(0.0, false);
        tracker.update(1.0, true);
        assert_eq!(tracker.update(4.0, false), TrackerAction::Hold);
        assert_eq!(tracker.stable_accum(), 3.0);
        assert_eq!(tracker.update(5.0, false), TrackerAction::Capture);
    }

    #[test]
    fn test_state_accessors() {
        let mut tracker = StabilityTracker::new();
        tracker.update(0.0, false);
        tracker.update(1.0, true);
        assert!(tracker.is_in_transition());
        tracker.update(2.0, false);
        tracker.update(3.0, false);
        assert_eq!(tracker.stable_accum(), 2.0);
        assert_eq!(tracker.transition_count(), 1);
        assert_eq!(tracker.frame_count(), 4);

        tracker.reset();
        assert_eq!(tracker.frame_count(), 0);
        assert!(matches!(tracker.current_state(), StabilityState::Primed));
    }

    #[test]
    fn test_zero_stable_duration_captures_first_still_frame() {
        let actions = run(&[false, true, false], 0.0);
        assert_eq!(capture_steps(&actions), vec![0, 2]);
    }
}
