//! Startup search for the absolute reference.
//!
//! The encoder only counts relative pulses, so at power-on the engine doesn't know where
//! the rotor is. The calibrator energizes the ring and watches the encoder between dwells.
//! Once the reading stops changing the rotor has come to rest against the reference, and
//! that point becomes the encoder zero.

use embedded_hal::delay::DelayNs;

use crate::config::{CalibrationMode, CalibrationParams};
use crate::encoder::Encoder;
use crate::error::Error;
use crate::inverter::InverterStage;
use crate::observer::Observer;
use crate::output::OutputBank;
use crate::schedule::Direction;

pub struct Calibrator {
    params: CalibrationParams,
    direction: Direction,
}

impl Calibrator {
    pub fn new(params: CalibrationParams, direction: Direction) -> Self {
        Calibrator { params, direction }
    }

    /// Run the calibration to completion. On success the encoder has been reset to zero and
    /// the stall position (in the old count) is returned. The stage is left energized on
    /// the state it stalled at.
    pub fn run<B, E, D, O, const N: usize, const K: usize>(
        &self,
        stage: &mut InverterStage<B, N, K>,
        encoder: &mut E,
        delay: &mut D,
        observer: &mut O,
    ) -> Result<i32, Error>
    where
        B: OutputBank,
        E: Encoder,
        D: DelayNs,
        O: Observer,
    {
        stage.energize();
        observer.state_entered(stage.current());

        let mut last = encoder.read();
        let mut repeats = 0;

        for cycle in 1..=self.params.max_cycles {
            if self.params.mode == CalibrationMode::Step {
                let id = stage.advance(self.direction);
                observer.state_entered(id);
            }

            delay.delay_ms(self.params.dwell_ms);

            let position = encoder.read();
            observer.calibration_step(cycle, position);

            if position == last {
                repeats += 1;

                if repeats >= self.params.settle_repeats {
                    encoder.write(0);
                    observer.calibrated(position);
                    return Ok(position);
                }
            } else {
                repeats = 0;
                last = position;
            }
        }

        observer.calibration_failed(self.params.max_cycles);

        Err(Error::CalibrationTimeout {
            cycles: self.params.max_cycles,
        })
    }
}
