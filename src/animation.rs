//! Timeline and animated scalars
//!
//! The compositor has no ambient clock. A [`Timeline`] is owned by the
//! application and handed down through `Layer::update`, and every
//! [`AnimatedScalar`] in the tree is ticked against it once per frame.
//! Reading a scalar between ticks returns the value for the last tick.

use std::time::Instant;

/// Easing curves applied to normalized transition progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum Ease {
    /// Constant rate
    #[default]
    Linear,
    InQuad,
    OutQuad,
    InOutQuad,
    InCubic,
    OutCubic,
    InOutCubic,
}

impl Ease {
    /// Map progress `t` in `[0, 1]` through the curve.
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Ease::Linear => t,
            Ease::InQuad => t * t,
            Ease::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Ease::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Ease::InCubic => t * t * t,
            Ease::OutCubic => 1.0 - (1.0 - t).powi(3),
            Ease::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
        }
    }
}

/// Shared frame clock for all animated values in a layer tree.
///
/// Time only moves forward. Use [`Timeline::step`] for deterministic
/// stepping (tests, offline rendering) or [`Timeline::update`] once per
/// frame to follow the wall clock.
#[derive(Debug, Clone)]
pub struct Timeline {
    /// Seconds since the timeline started
    now: f64,
    /// Seconds advanced by the most recent step/update
    delta: f64,
    /// Playback rate multiplier
    speed: f64,
    /// Whether wall-clock updates advance time
    running: bool,
    /// Wall-clock instant of the last update
    last_update: Option<Instant>,
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Timeline {
    /// Create a timeline at t = 0
    pub fn new() -> Self {
        Self {
            now: 0.0,
            delta: 0.0,
            speed: 1.0,
            running: true,
            last_update: None,
        }
    }

    /// Current time in seconds
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Seconds advanced by the most recent step
    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Advance by `dt` seconds. Negative and non-finite steps are ignored.
    pub fn step(&mut self, dt: f64) {
        if !dt.is_finite() || dt < 0.0 {
            tracing::warn!(dt, "ignoring non-monotonic timeline step");
            self.delta = 0.0;
            return;
        }
        self.delta = dt;
        self.now += dt;
    }

    /// Advance by wall-clock time since the previous call (call once per frame)
    pub fn update(&mut self) {
        let now = Instant::now();
        let elapsed = self
            .last_update
            .map(|last| now.duration_since(last).as_secs_f64())
            .unwrap_or(0.0);
        self.last_update = Some(now);

        if self.running {
            self.step(elapsed * self.speed);
        } else {
            self.delta = 0.0;
        }
    }

    /// Playback rate multiplier
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Set playback rate (clamped to be non-negative)
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = if speed.is_finite() { speed.max(0.0) } else { 1.0 };
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Pause wall-clock advancement
    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Resume wall-clock advancement without jumping over the paused span
    pub fn resume(&mut self) {
        self.running = true;
        self.last_update = Some(Instant::now());
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Transition {
    from: f32,
    to: f32,
    duration: f64,
    ease: Ease,
    start: f64,
}

impl Transition {
    fn value_at(&self, now: f64) -> f32 {
        let progress = if self.duration <= 0.0 {
            1.0
        } else {
            ((now - self.start) / self.duration).clamp(0.0, 1.0) as f32
        };
        if progress >= 1.0 {
            self.to
        } else {
            self.from + (self.to - self.from) * self.ease.apply(progress)
        }
    }

    fn is_finished_at(&self, now: f64) -> bool {
        self.duration <= 0.0 || now >= self.start + self.duration
    }
}

/// Scalar value that can be retargeted over a duration.
///
/// Retargeting replaces any in-flight transition; there is no queue.
/// The new transition starts from the value at the given time and
/// completes `duration` seconds later.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimatedScalar {
    current: f32,
    transition: Option<Transition>,
}

impl Default for AnimatedScalar {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl From<f32> for AnimatedScalar {
    fn from(value: f32) -> Self {
        Self::new(value)
    }
}

impl AnimatedScalar {
    pub fn new(value: f32) -> Self {
        Self {
            current: value,
            transition: None,
        }
    }

    /// Value as of the last tick
    pub fn value(&self) -> f32 {
        self.current
    }

    /// Whether the current value is exactly zero
    pub fn is_zero(&self) -> bool {
        self.current == 0.0
    }

    /// Final value of the in-flight transition, or the current value
    pub fn target(&self) -> f32 {
        self.transition.map(|t| t.to).unwrap_or(self.current)
    }

    pub fn is_animating(&self) -> bool {
        self.transition.is_some()
    }

    /// Jump to `value`, cancelling any transition
    pub fn set(&mut self, value: f32) {
        self.current = value;
        self.transition = None;
    }

    /// Linear transition to `target`, starting at `now` and lasting
    /// `duration` seconds
    pub fn retarget(&mut self, target: f32, duration: f64, now: f64) {
        self.retarget_eased(target, duration, Ease::Linear, now);
    }

    /// Eased transition to `target`, starting at `now`.
    ///
    /// The start value is the in-flight transition evaluated at `now`, so
    /// retargeting between ticks neither backdates nor jumps. A zero
    /// duration lands on `target` at the next tick.
    pub fn retarget_eased(&mut self, target: f32, duration: f64, ease: Ease, now: f64) {
        self.tick(now);
        self.transition = Some(Transition {
            from: self.current,
            to: target,
            duration: if duration.is_finite() { duration.max(0.0) } else { 0.0 },
            ease,
            start: now,
        });
    }

    /// Re-evaluate against the timeline's current time
    pub fn tick(&mut self, now: f64) {
        let Some(transition) = self.transition else { return };
        self.current = transition.value_at(now);
        if transition.is_finished_at(now) {
            self.transition = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_ease_endpoints() {
        for ease in [
            Ease::Linear,
            Ease::InQuad,
            Ease::OutQuad,
            Ease::InOutQuad,
            Ease::InCubic,
            Ease::OutCubic,
            Ease::InOutCubic,
        ] {
            assert!(approx(ease.apply(0.0), 0.0), "{ease:?} at 0");
            assert!(approx(ease.apply(1.0), 1.0), "{ease:?} at 1");
        }
        assert!(approx(Ease::InOutQuad.apply(0.5), 0.5));
        assert!(approx(Ease::Linear.apply(2.0), 1.0));
    }

    #[test]
    fn test_timeline_step() {
        let mut timeline = Timeline::new();
        timeline.step(0.5);
        timeline.step(0.25);
        assert!((timeline.now() - 0.75).abs() < 1e-9);
        assert!((timeline.delta() - 0.25).abs() < 1e-9);

        timeline.step(-1.0);
        timeline.step(f64::NAN);
        assert!((timeline.now() - 0.75).abs() < 1e-9);
        assert_eq!(timeline.delta(), 0.0);
    }

    #[test]
    fn test_timeline_pause() {
        let mut timeline = Timeline::new();
        timeline.pause();
        timeline.update();
        timeline.update();
        assert_eq!(timeline.now(), 0.0);
        assert!(!timeline.is_running());
        timeline.resume();
        assert!(timeline.is_running());
    }

    #[test]
    fn test_linear_retarget() {
        let mut scalar = AnimatedScalar::new(0.0);
        scalar.tick(10.0);
        scalar.retarget(1.0, 2.0, 10.0);

        scalar.tick(11.0);
        assert!(approx(scalar.value(), 0.5));
        assert!(scalar.is_animating());

        scalar.tick(12.0);
        assert!(approx(scalar.value(), 1.0));
        assert!(!scalar.is_animating());

        scalar.tick(20.0);
        assert_eq!(scalar.value(), 1.0);
    }

    #[test]
    fn test_value_has_no_side_effects() {
        let mut scalar = AnimatedScalar::new(1.0);
        scalar.tick(0.0);
        scalar.retarget(0.0, 1.0, 0.0);
        assert_eq!(scalar.value(), 1.0);
        assert_eq!(scalar.value(), 1.0);
        assert_eq!(scalar.target(), 0.0);
    }

    #[test]
    fn test_retarget_replaces_in_flight() {
        let mut scalar = AnimatedScalar::new(0.0);
        scalar.tick(0.0);
        scalar.retarget(1.0, 1.0, 0.0);
        scalar.tick(0.5);
        assert!(approx(scalar.value(), 0.5));

        // New transition starts from 0.5 at t=0.5
        scalar.retarget(0.0, 1.0, 0.5);
        scalar.tick(1.0);
        assert!(approx(scalar.value(), 0.25));
        scalar.tick(1.5);
        assert!(approx(scalar.value(), 0.0));
    }

    #[test]
    fn test_zero_duration_applies_on_next_tick() {
        let mut scalar = AnimatedScalar::new(1.0);
        scalar.tick(3.0);
        scalar.retarget(0.0, 0.0, 3.0);
        assert_eq!(scalar.value(), 1.0);
        scalar.tick(3.0);
        assert!(scalar.is_zero());
    }

    #[test]
    fn test_retarget_starts_at_given_time() {
        let mut scalar = AnimatedScalar::new(0.0);
        scalar.tick(0.0);
        // Time moved on without a tick before the retarget
        scalar.retarget(1.0, 2.0, 5.0);
        assert_eq!(scalar.value(), 0.0);
        scalar.tick(5.0);
        assert_eq!(scalar.value(), 0.0);
        scalar.tick(6.0);
        assert!(approx(scalar.value(), 0.5));
        scalar.tick(7.0);
        assert_eq!(scalar.value(), 1.0);
    }

    #[test]
    fn test_retarget_between_ticks_starts_from_value_at_that_time() {
        let mut scalar = AnimatedScalar::new(0.0);
        scalar.tick(0.0);
        scalar.retarget(1.0, 1.0, 0.0);
        // No tick at 0.5; the new transition still starts from 0.5
        scalar.retarget(0.0, 1.0, 0.5);
        assert!(approx(scalar.value(), 0.5));
        scalar.tick(1.0);
        assert!(approx(scalar.value(), 0.25));
    }

    #[test]
    fn test_eased_retarget() {
        let mut scalar = AnimatedScalar::new(0.0);
        scalar.tick(0.0);
        scalar.retarget_eased(1.0, 1.0, Ease::InQuad, 0.0);
        scalar.tick(0.5);
        assert!(approx(scalar.value(), 0.25));
    }

    #[test]
    fn test_set_cancels_transition() {
        let mut scalar = AnimatedScalar::new(0.0);
        scalar.tick(0.0);
        scalar.retarget(1.0, 1.0, 0.0);
        scalar.set(0.3);
        scalar.tick(0.5);
        assert_eq!(scalar.value(), 0.3);
        assert!(!scalar.is_animating());
    }
}
