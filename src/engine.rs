//! The commutation engine.
//!
//! Polled once per control tick, the engine reads the encoder and switches to the next state
//! of the ring when the rotor has left the window of the current one.
//!
//! ```ignore
//!  start                     end
//!    |---- current state ----|---- next state ----|
//!                            ^
//!                            switch, then shift the window one step
//! ```
//!
//! Step sizes come from a [`StepSchedule`], so a full revolution of windows covers the
//! encoder resolution exactly, and the ring comes back to the same state at the same
//! position every revolution.

use embedded_hal::delay::DelayNs;

use crate::calibrate::Calibrator;
use crate::config::Config;
use crate::encoder::{wrap, Encoder};
use crate::error::{ConfigError, Error};
use crate::inverter::InverterStage;
use crate::observer::Observer;
use crate::output::OutputBank;
use crate::ring::{CommutationState, Ring, StateId};
use crate::schedule::{StepSchedule, Window};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Built, no reference yet. Outputs are off.
    Uncalibrated,
    Calibrating,
    /// Commutating from the encoder.
    Running,
}

/// What one call to [`CommutationEngine::logic`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Tick {
    /// Not calibrated, nothing to do.
    Idle,
    /// Turned off, waiting for resume.
    Paused,
    /// Still inside the window.
    Held,
    /// Switched to the given state.
    Advanced(StateId),
}

pub struct CommutationEngine<B, E, O, const N: usize, const K: usize> {
    config: Config,
    stage: InverterStage<B, N, K>,
    encoder: E,
    observer: O,
    schedule: StepSchedule,
    window: Window,
    phase: Phase,
    paused: bool,
}

impl<B, E, O, const N: usize, const K: usize> CommutationEngine<B, E, O, N, K>
where
    B: OutputBank,
    E: Encoder,
    O: Observer,
{
    /// Build an uncalibrated engine.
    ///
    /// The ring must hold one state per switching event in a mechanical revolution. A ring
    /// with only the states of one electrical revolution is expanded to cover all of them.
    pub fn new(
        config: Config,
        mut ring: Ring<N, K>,
        bank: B,
        encoder: E,
        observer: O,
    ) -> Result<Self, Error> {
        config.validate()?;

        if ring.is_empty() {
            return Err(ConfigError::EmptyRing.into());
        }

        let states = config.states_per_mech_rev() as usize;

        if ring.len() == config.states_per_elec_rev as usize && ring.len() < states {
            ring.expand(config.elec_revs_per_mech_rev, ring.len())?;
        }

        if ring.len() != states {
            return Err(ConfigError::RingLength {
                expected: states,
                found: ring.len(),
            }
            .into());
        }

        let stage = InverterStage::new(ring, bank)?;
        let schedule = StepSchedule::new(config.pulses_per_rev as u32, states as u32);
        let window = Window::starting_at(
            config.offset,
            schedule.increase(),
            config.direction,
            config.pulses_per_rev,
        );

        Ok(CommutationEngine {
            config,
            stage,
            encoder,
            observer,
            schedule,
            window,
            phase: Phase::Uncalibrated,
            paused: false,
        })
    }

    /// Build, calibrate and start the engine.
    ///
    /// When the calibration fails the engine and everything given to it is dropped. Use
    /// [`CommutationEngine::new`] and [`CommutationEngine::calibrate`] to be able to retry.
    pub fn start<D>(
        config: Config,
        ring: Ring<N, K>,
        bank: B,
        encoder: E,
        observer: O,
        delay: &mut D,
    ) -> Result<Self, Error>
    where
        D: DelayNs,
    {
        let mut engine = Self::new(config, ring, bank, encoder, observer)?;
        engine.calibrate(delay)?;
        Ok(engine)
    }

    /// Find the reference position and start running.
    ///
    /// Blocks for the calibration dwells. On failure every output is turned off and the
    /// engine stays uncalibrated.
    pub fn calibrate<D>(&mut self, delay: &mut D) -> Result<(), Error>
    where
        D: DelayNs,
    {
        if self.phase == Phase::Running {
            return Err(Error::AlreadyCalibrated);
        }

        self.phase = Phase::Calibrating;
        self.paused = false;

        let calibrator = Calibrator::new(self.config.calibration, self.config.direction);

        match calibrator.run(
            &mut self.stage,
            &mut self.encoder,
            delay,
            &mut self.observer,
        ) {
            Ok(_) => {
                self.reschedule();
                self.phase = Phase::Running;
                Ok(())
            }
            Err(e) => {
                self.stage.shutdown();
                self.phase = Phase::Uncalibrated;
                Err(e)
            }
        }
    }

    /// One control tick. Call this from the polling loop.
    ///
    /// Switches at most one state per call. Never fails; encoder readings outside the
    /// revolution are folded back into it.
    pub fn logic(&mut self) -> Tick {
        if self.phase != Phase::Running {
            return Tick::Idle;
        }
        if self.paused {
            return Tick::Paused;
        }

        let position = wrap(self.encoder.read(), self.config.pulses_per_rev);

        if !self.window.is_due(position) {
            return Tick::Held;
        }

        let id = self.stage.advance(self.config.direction);
        self.window.shift(self.schedule.next_step());

        self.observer.advanced(position, &self.window);
        self.observer.state_entered(id);

        Tick::Advanced(id)
    }

    /// De-energize the motor and stop commutating until [`CommutationEngine::resume`].
    pub fn turn_off(&mut self) {
        self.stage.turn_off();
        self.paused = true;
    }

    /// Continue after [`CommutationEngine::turn_off`] without calibrating again.
    ///
    /// The rotor may have moved while off. The window is moved along, one switching event
    /// at a time, until it contains the current reading, and the state belonging to that
    /// window is energized.
    pub fn resume(&mut self) {
        if self.phase != Phase::Running || !self.paused {
            return;
        }

        let position = wrap(self.encoder.read(), self.config.pulses_per_rev);
        let ring = self.stage.ring();
        let mut target = self.stage.current();

        // The windows of one revolution cover every position.
        for _ in 0..ring.len() {
            if self.window.contains(position) {
                break;
            }
            self.window.shift(self.schedule.next_step());
            target = ring.step(target, self.config.direction);
        }

        self.stage.activate_state(target);
        self.paused = false;

        self.observer.state_entered(target);
    }

    /// Open the first window at the configured offset and record every state's window
    /// for the coming revolution.
    fn reschedule(&mut self) {
        let direction = self.config.direction;

        self.schedule.reset();
        self.window = Window::starting_at(
            self.config.offset,
            self.schedule.next_step(),
            direction,
            self.config.pulses_per_rev,
        );

        let mut schedule = self.schedule;
        let mut window = self.window;
        let mut id = self.stage.current();
        let ring = self.stage.ring_mut();

        for _ in 0..ring.len() {
            ring.state_mut(id).set_schedule(window);
            window.shift(schedule.next_step());
            id = ring.step(id, direction);
        }
    }

    pub fn current_state(&self) -> StateId {
        self.stage.current()
    }

    pub fn state(&self) -> &CommutationState<K> {
        self.stage.current_state()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn schedule(&self) -> &StepSchedule {
        &self.schedule
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn stage(&self) -> &InverterStage<B, N, K> {
        &self.stage
    }

    pub fn ring(&self) -> &Ring<N, K> {
        self.stage.ring()
    }

    pub fn encoder_mut(&mut self) -> &mut E {
        &mut self.encoder
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }
}
