//! Input smoothing: turns bursty touch deltas into a steady motion stream.
//!
//! Motion intents are accumulated into a [`PendingDelta`] as they arrive.
//! Once per tick the pending delta is drained, fed through an exponential
//! moving average per axis pair (cursor and scroll are filtered separately)
//! and emitted if the filtered value clears the deadzone.  A tick therefore
//! produces at most one `move` and one `scroll` command.
//!
//! ```text
//! ema = ema * factor + raw * (1 - factor)
//! emit when |ema.x| >= deadzone or |ema.y| >= deadzone
//! ```

use remotepad_core::{Command, Settings};
use serde::{Deserialize, Serialize};

use crate::application::capture_gesture::Motion;

/// Below this magnitude a decaying EMA is snapped to rest.
const REST_EPSILON: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    fn exceeds(self, threshold: f64) -> bool {
        self.x.abs() >= threshold || self.y.abs() >= threshold
    }
}

/// What happens to the filtered value once the finger stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrailingPolicy {
    /// Stop sending on the first tick without new input.  The EMA keeps
    /// decaying silently so the next drag starts from a small residue.
    #[default]
    StopOnRelease,
    /// Keep sending the decaying EMA until it falls under the deadzone.
    DecayToRest,
}

/// Motion accumulated since the last tick, already scaled by sensitivity.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PendingDelta {
    pub movement: Vec2,
    pub scroll: Vec2,
}

impl PendingDelta {
    pub fn accumulate(&mut self, motion: Motion, settings: &Settings) {
        match motion {
            Motion::Move { dx, dy } => {
                self.movement.x += dx * settings.move_sensitivity;
                self.movement.y += dy * settings.move_sensitivity;
            }
            Motion::Scroll { dx, dy } => {
                self.scroll.x += dx * settings.scroll_sensitivity;
                self.scroll.y += dy * settings.scroll_sensitivity;
            }
        }
    }

    /// Returns the accumulated delta and zeroes the accumulator.
    pub fn take(&mut self) -> PendingDelta {
        std::mem::take(self)
    }
}

/// Filter state carried from tick to tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SmoothedState {
    pub movement: Vec2,
    pub scroll: Vec2,
}

/// Per-session smoothing filter.
#[derive(Debug)]
pub struct InputSmoother {
    settings: Settings,
    policy: TrailingPolicy,
    pending: PendingDelta,
    state: SmoothedState,
}

impl InputSmoother {
    pub fn new(settings: Settings, policy: TrailingPolicy) -> Self {
        Self {
            settings,
            policy,
            pending: PendingDelta::default(),
            state: SmoothedState::default(),
        }
    }

    /// Applies new settings from the next accumulated delta on.
    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn state(&self) -> SmoothedState {
        self.state
    }

    pub fn push(&mut self, motion: Motion) {
        self.pending.accumulate(motion, &self.settings);
    }

    /// Drops pending motion and filter state.
    pub fn reset(&mut self) {
        self.pending = PendingDelta::default();
        self.state = SmoothedState::default();
    }

    /// Drains pending motion and returns the commands to send this tick.
    pub fn tick(&mut self) -> Vec<Command> {
        let raw = self.pending.take();
        let factor = self.settings.smoothing_factor;
        let deadzone = self.settings.deadzone;

        let mut out = Vec::with_capacity(2);
        if let Some(v) = filter(&mut self.state.movement, raw.movement, factor, deadzone, self.policy) {
            out.push(Command::Move { x: v.x, y: v.y });
        }
        if let Some(v) = filter(&mut self.state.scroll, raw.scroll, factor, deadzone, self.policy) {
            out.push(Command::Scroll { x: v.x, y: v.y });
        }
        out
    }
}

fn filter(
    ema: &mut Vec2,
    raw: Vec2,
    factor: f64,
    deadzone: f64,
    policy: TrailingPolicy,
) -> Option<Vec2> {
    ema.x = ema.x * factor + raw.x * (1.0 - factor);
    ema.y = ema.y * factor + raw.y * (1.0 - factor);

    match policy {
        TrailingPolicy::StopOnRelease => {
            (!raw.is_zero() && ema.exceeds(deadzone)).then_some(*ema)
        }
        TrailingPolicy::DecayToRest => {
            if raw.is_zero() && !ema.exceeds(deadzone.max(REST_EPSILON)) {
                *ema = Vec2::ZERO;
                return None;
            }
            ema.exceeds(deadzone).then_some(*ema)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn settings(factor: f64, deadzone: f64) -> Settings {
        Settings {
            move_sensitivity: 1.0,
            scroll_sensitivity: 1.0,
            smoothing_factor: factor,
            deadzone,
        }
    }

    fn moves(cmds: &[Command]) -> Vec<(f64, f64)> {
        cmds.iter()
            .filter_map(|c| match c {
                Command::Move { x, y } => Some((*x, *y)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_two_drags_at_half_smoothing() {
        // Arrange
        let mut s = InputSmoother::new(settings(0.5, 0.0), TrailingPolicy::StopOnRelease);

        // Act
        s.push(Motion::Move { dx: 10.0, dy: 0.0 });
        let first = s.tick();
        s.push(Motion::Move { dx: 10.0, dy: 0.0 });
        let second = s.tick();

        // Assert
        assert_eq!(first, vec![Command::Move { x: 5.0, y: 0.0 }]);
        assert_eq!(second, vec![Command::Move { x: 7.5, y: 0.0 }]);
    }

    #[test]
    fn test_deltas_within_a_tick_are_summed() {
        let mut s = InputSmoother::new(settings(0.0, 0.0), TrailingPolicy::StopOnRelease);
        s.push(Motion::Move { dx: 3.0, dy: 1.0 });
        s.push(Motion::Move { dx: 4.0, dy: -1.0 });
        assert_eq!(s.tick(), vec![Command::Move { x: 7.0, y: 0.0 }]);
    }

    #[test]
    fn test_stop_on_release_goes_quiet_next_tick() {
        // Arrange
        let mut s = InputSmoother::new(settings(0.8, 0.1), TrailingPolicy::StopOnRelease);
        s.push(Motion::Move { dx: 50.0, dy: 0.0 });
        assert_eq!(s.tick().len(), 1);

        // Act: no new input while the EMA is still far above the deadzone
        let idle = s.tick();

        // Assert
        assert!(idle.is_empty());
        assert!(s.state().movement.x > 0.1, "EMA decays silently");
    }

    #[test]
    fn test_decay_to_rest_keeps_emitting_until_under_deadzone() {
        // Arrange
        let mut s = InputSmoother::new(settings(0.5, 1.0), TrailingPolicy::DecayToRest);
        s.push(Motion::Move { dx: 8.0, dy: 0.0 });

        // Act
        let emitted: Vec<_> = (0..6).flat_map(|_| moves(&s.tick())).collect();

        // Assert: 4.0, 2.0, 1.0, then 0.5 is under the deadzone
        assert_eq!(emitted, vec![(4.0, 0.0), (2.0, 0.0), (1.0, 0.0)]);
        assert_eq!(s.state().movement, Vec2::ZERO);
    }

    #[test]
    fn test_decay_to_rest_with_zero_deadzone_terminates() {
        let mut s = InputSmoother::new(settings(0.5, 0.0), TrailingPolicy::DecayToRest);
        s.push(Motion::Move { dx: 1.0, dy: 0.0 });
        let count = (0..100).filter(|_| !s.tick().is_empty()).count();
        assert!(count < 20, "emitted {count} times");
    }

    #[test]
    fn test_deadzone_suppresses_jitter() {
        let mut s = InputSmoother::new(settings(0.7, 0.6), TrailingPolicy::StopOnRelease);
        s.push(Motion::Move { dx: 1.0, dy: -1.0 });
        // 0.3 on both axes is under 0.6
        assert!(s.tick().is_empty());
    }

    #[test]
    fn test_move_and_scroll_emit_independently_in_one_tick() {
        let mut s = InputSmoother::new(settings(0.0, 0.0), TrailingPolicy::StopOnRelease);
        s.push(Motion::Move { dx: 2.0, dy: 2.0 });
        s.push(Motion::Scroll { dx: 0.0, dy: 6.0 });
        assert_eq!(
            s.tick(),
            vec![
                Command::Move { x: 2.0, y: 2.0 },
                Command::Scroll { x: 0.0, y: 6.0 }
            ]
        );
    }

    #[test]
    fn test_sensitivity_is_applied_on_accumulation() {
        // Arrange
        let mut cfg = settings(0.0, 0.0);
        cfg.move_sensitivity = 2.0;
        cfg.scroll_sensitivity = 0.5;
        let mut s = InputSmoother::new(cfg, TrailingPolicy::StopOnRelease);

        // Act
        s.push(Motion::Move { dx: 3.0, dy: 0.0 });
        s.push(Motion::Scroll { dx: 0.0, dy: 10.0 });

        // Assert
        assert_eq!(
            s.tick(),
            vec![
                Command::Move { x: 6.0, y: 0.0 },
                Command::Scroll { x: 0.0, y: 5.0 }
            ]
        );
    }

    #[test]
    fn test_reset_clears_state_and_pending() {
        let mut s = InputSmoother::new(settings(0.5, 0.0), TrailingPolicy::StopOnRelease);
        s.push(Motion::Move { dx: 10.0, dy: 0.0 });
        s.tick();
        s.push(Motion::Move { dx: 10.0, dy: 0.0 });

        s.reset();

        assert_eq!(s.state(), SmoothedState::default());
        assert!(s.tick().is_empty());
    }

    proptest! {
        #[test]
        fn prop_zero_factor_is_pass_through(
            raw in prop::collection::vec((-500.0f64..500.0, -500.0f64..500.0), 1..50)
        ) {
            let mut s = InputSmoother::new(settings(0.0, 0.0), TrailingPolicy::StopOnRelease);
            for (dx, dy) in raw {
                s.push(Motion::Move { dx, dy });
                let out = moves(&s.tick());
                if dx == 0.0 && dy == 0.0 {
                    prop_assert!(out.is_empty());
                } else {
                    prop_assert_eq!(out, vec![(dx, dy)]);
                }
            }
        }

        #[test]
        fn prop_constant_input_approaches_without_overshoot(
            r in 0.5f64..200.0,
            factor in 0.0f64..=0.9,
            ticks in 1usize..120,
        ) {
            let mut s = InputSmoother::new(settings(factor, 0.0), TrailingPolicy::StopOnRelease);
            let mut prev = 0.0;
            for _ in 0..ticks {
                s.push(Motion::Move { dx: r, dy: 0.0 });
                s.tick();
                let ema = s.state().movement.x;
                prop_assert!(ema >= prev - 1e-9, "not monotone: {} then {}", prev, ema);
                prop_assert!(ema <= r * (1.0 + 1e-12), "overshoot: {} > {}", ema, r);
                prev = ema;
            }
        }
    }
}
