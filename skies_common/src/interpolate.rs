/*!
Step-wise animation of a rendered [`Position`] toward a target

An [`Interpolation`] is driven from the outside: the scheduler asks [`Interpolation::is_due`] and
calls [`Interpolation::step`], nothing inside re-arms itself. Dropping or cancelling the job is all
it takes to abandon it.
!*/

use std::time::{Duration, Instant};

use crate::position::Position;

/// A bounded, cancellable animation owned by exactly one tracked entity
#[derive(Debug, Clone, PartialEq)]
pub struct Interpolation {
    steps_remaining: u32,
    /// (lat, lng) added on every step
    per_step_delta: (f64, f64),
    cadence: Duration,
    next_step_at: Instant,
    target: Position,
}

impl Interpolation {
    /// Divide the move from `from` to `target` into `steps` equal steps, the first one due a full
    /// `cadence` after `now`
    #[must_use]
    pub fn new(from: Position, target: Position, steps: u32, cadence: Duration, now: Instant) -> Self {
        let steps = steps.max(1);
        let (lat_delta, lng_delta) = from.delta_to(&target);
        Self {
            steps_remaining: steps,
            per_step_delta: (lat_delta / f64::from(steps), lng_delta / f64::from(steps)),
            cadence,
            next_step_at: now + cadence,
            target,
        }
    }

    #[must_use]
    pub const fn steps_remaining(&self) -> u32 {
        self.steps_remaining
    }

    #[must_use]
    pub const fn per_step_delta(&self) -> (f64, f64) {
        self.per_step_delta
    }

    #[must_use]
    pub const fn target(&self) -> Position {
        self.target
    }

    #[must_use]
    pub const fn next_step_at(&self) -> Instant {
        self.next_step_at
    }

    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.steps_remaining == 0
    }

    #[must_use]
    pub fn is_due(&self, now: Instant) -> bool {
        !self.is_finished() && self.next_step_at <= now
    }

    /// Advance `rendered` by one step
    ///
    /// The last step lands exactly on the target, so rounding in `per_step_delta` never shows up on
    /// the map. Returns false if the job was already finished.
    pub fn step(&mut self, rendered: &mut Position) -> bool {
        if self.is_finished() {
            return false;
        }
        self.steps_remaining -= 1;
        *rendered = if self.steps_remaining == 0 {
            self.target
        } else {
            rendered.offset(self.per_step_delta.0, self.per_step_delta.1)
        };
        self.next_step_at += self.cadence;
        true
    }

    /// Run every step due at `now`, catching up if the driver fell behind
    ///
    /// Returns the number of steps taken.
    pub fn step_until(&mut self, now: Instant, rendered: &mut Position) -> u32 {
        let mut taken = 0;
        while self.is_due(now) {
            self.step(rendered);
            taken += 1;
        }
        taken
    }

    /// Abandon the animation where it is
    pub fn cancel(&mut self) {
        self.steps_remaining = 0;
    }
}
