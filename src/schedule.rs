//! Switching schedule.
//!
//! A mechanical revolution has `pulses_per_rev` encoder pulses and `states_per_mech_rev`
//! switching events. The two rarely divide, so most events are `increase` pulses apart and
//! every `correction_condition`:th event gets `error` extra pulses. With `error` and
//! `correction_condition` reduced by their greatest common divisor the extra pulses are
//! spread as evenly as integer steps allow, and a full revolution of events adds up to
//! exactly `pulses_per_rev`.
//!
//! The [`Window`] is the range of encoder positions the current state is responsible for.
//! Each switching event moves the window one step along.

use gcd::Gcd;

use crate::encoder::wrap;

/// Direction of rotation, in the sense of increasing (forward) or decreasing (reverse)
/// encoder readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

impl Direction {
    pub fn sign(&self) -> i32 {
        match self {
            Direction::Forward => 1,
            Direction::Reverse => -1,
        }
    }
}

impl TryFrom<i32> for Direction {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Direction::Forward),
            -1 => Ok(Direction::Reverse),
            _ => Err(value),
        }
    }
}

/// Step sizes, in encoder pulses, between consecutive switching events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StepSchedule {
    increase: u32,
    error: u32,
    correction_condition: u32,
    switching_counter: u32,
}

impl StepSchedule {
    /// Both arguments must be positive. Callers validate through [`crate::Config`].
    pub fn new(pulses_per_rev: u32, states_per_mech_rev: u32) -> Self {
        let increase = pulses_per_rev / states_per_mech_rev;
        let error = pulses_per_rev - increase * states_per_mech_rev;

        // gcd(0, n) is n, which gives a correction every event with no extra pulses.
        let divisor = error.gcd_euclid(states_per_mech_rev);

        StepSchedule {
            increase,
            error: error / divisor,
            correction_condition: states_per_mech_rev / divisor,
            switching_counter: 0,
        }
    }

    /// Step size for the next switching event.
    pub fn next_step(&mut self) -> u32 {
        self.switching_counter += 1;

        if self.switching_counter >= self.correction_condition {
            self.switching_counter = 0;
            self.increase + self.error
        } else {
            self.increase
        }
    }

    /// Start over from the first event of a correction cycle.
    pub fn reset(&mut self) {
        self.switching_counter = 0;
    }

    pub fn increase(&self) -> u32 {
        self.increase
    }

    /// The reduced error, added once per correction cycle.
    pub fn error(&self) -> u32 {
        self.error
    }

    /// Number of events in a correction cycle.
    pub fn correction_condition(&self) -> u32 {
        self.correction_condition
    }

    pub fn switching_counter(&self) -> u32 {
        self.switching_counter
    }
}

/// The encoder positions between two switching events.
///
/// Read in the direction of rotation, the window starts at `start` (inclusive) and ends at
/// `end` (exclusive). When it straddles the encoder rollover, `overflow` is set and
/// positions must be compared against both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Window {
    start: i32,
    end: i32,
    overflow: bool,
    /// Length in pulses. Differs from `end - start` only for a window spanning a whole
    /// revolution, where `start == end`.
    span: u32,
    direction: Direction,
    pulses_per_rev: i32,
}

impl Window {
    /// Window between two positions. Both are folded into the revolution.
    pub fn new(start: i32, end: i32, direction: Direction, pulses_per_rev: i32) -> Self {
        let start = wrap(start, pulses_per_rev);
        let end = wrap(end, pulses_per_rev);
        let span = wrap(direction.sign() * (end - start), pulses_per_rev) as u32;

        Window {
            start,
            end,
            overflow: is_overflow(start, end, direction),
            span,
            direction,
            pulses_per_rev,
        }
    }

    /// Window of `step` pulses starting at `start`.
    pub fn starting_at(start: i32, step: u32, direction: Direction, pulses_per_rev: i32) -> Self {
        let start = wrap(start, pulses_per_rev);
        let end = advance(start, step, direction, pulses_per_rev);

        Window {
            start,
            end,
            overflow: is_overflow(start, end, direction),
            span: step,
            direction,
            pulses_per_rev,
        }
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn end(&self) -> i32 {
        self.end
    }

    pub fn overflow(&self) -> bool {
        self.overflow
    }

    pub fn span(&self) -> u32 {
        self.span
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    fn is_full(&self) -> bool {
        self.span as i64 >= self.pulses_per_rev as i64
    }

    fn past_end(&self, position: i32) -> bool {
        self.direction.sign() * (position - self.end) >= 0
    }

    fn before_start(&self, position: i32) -> bool {
        self.direction.sign() * (position - self.start) < 0
    }

    /// Whether the rotor at `position` has left the window at its end, which is when the
    /// next state takes over.
    ///
    /// `position` must be within the revolution, see [`wrap`].
    pub fn is_due(&self, position: i32) -> bool {
        if self.is_full() {
            return false;
        }

        if self.overflow {
            // Plain ordering is ambiguous across the rollover, the position must be
            // outside the window on both sides.
            self.past_end(position) && self.before_start(position)
        } else {
            self.past_end(position)
        }
    }

    /// Whether `position` is inside the window.
    pub fn contains(&self, position: i32) -> bool {
        if self.is_full() {
            return true;
        }

        let position = wrap(position, self.pulses_per_rev);

        if self.overflow {
            !self.before_start(position) || !self.past_end(position)
        } else {
            !self.before_start(position) && !self.past_end(position)
        }
    }

    /// Move on to the following window, `step` pulses long.
    pub fn shift(&mut self, step: u32) {
        self.start = self.end;
        self.end = advance(self.start, step, self.direction, self.pulses_per_rev);
        self.span = step;
        self.overflow = is_overflow(self.start, self.end, self.direction);
    }
}

// Summed in i64, a resolution above i32::MAX / 2 would overflow the sum.
fn advance(position: i32, step: u32, direction: Direction, pulses_per_rev: i32) -> i32 {
    let moved = position as i64 + direction.sign() as i64 * step as i64;
    moved.rem_euclid(pulses_per_rev as i64) as i32
}

fn is_overflow(start: i32, end: i32, direction: Direction) -> bool {
    direction.sign() * (end - start) < 0
}
