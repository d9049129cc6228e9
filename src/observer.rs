//! Hooks for watching the engine work.
//!
//! The engine calls these at fixed points and never logs by itself. `()` ignores
//! everything, [`LogObserver`] writes to the `log` facade.

use crate::ring::StateId;
use crate::schedule::Window;

pub trait Observer {
    /// A state was energized.
    fn state_entered(&mut self, _state: StateId) {}

    /// The reading at `position` was past the window and the engine switched. `window` is
    /// the new window.
    fn advanced(&mut self, _position: i32, _window: &Window) {}

    /// One dwell cycle of the calibration is done.
    fn calibration_step(&mut self, _cycle: u32, _position: i32) {}

    /// The encoder stalled at `position`, which is now the zero.
    fn calibrated(&mut self, _position: i32) {}

    fn calibration_failed(&mut self, _cycles: u32) {}
}

impl Observer for () {}

impl<O> Observer for &mut O
where
    O: Observer,
{
    fn state_entered(&mut self, state: StateId) {
        (**self).state_entered(state)
    }

    fn advanced(&mut self, position: i32, window: &Window) {
        (**self).advanced(position, window)
    }

    fn calibration_step(&mut self, cycle: u32, position: i32) {
        (**self).calibration_step(cycle, position)
    }

    fn calibrated(&mut self, position: i32) {
        (**self).calibrated(position)
    }

    fn calibration_failed(&mut self, cycles: u32) {
        (**self).calibration_failed(cycles)
    }
}

/// Observer that logs through the `log` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl Observer for LogObserver {
    fn state_entered(&mut self, state: StateId) {
        log::trace!("enter {}", state);
    }

    fn advanced(&mut self, position: i32, window: &Window) {
        log::debug!(
            "switch at {}, next window {}..{}{}",
            position,
            window.start(),
            window.end(),
            if window.overflow() { " (overflow)" } else { "" }
        );
    }

    fn calibration_step(&mut self, cycle: u32, position: i32) {
        log::debug!("calibration cycle {} at {}", cycle, position);
    }

    fn calibrated(&mut self, position: i32) {
        log::info!("calibrated, encoder stalled at {}", position);
    }

    fn calibration_failed(&mut self, cycles: u32) {
        log::warn!("calibration failed, no stall in {} cycles", cycles);
    }
}
