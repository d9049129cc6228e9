use crate::error::ConfigError;
use crate::schedule::Direction;

/// Description of the machine and its encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /** Encoder pulses in one mechanical revolution. */
    pub pulses_per_rev: i32,
    /** Commutation states in one electrical revolution. */
    pub states_per_elec_rev: u32,
    /** Electrical revolutions in one mechanical revolution. */
    pub elec_revs_per_mech_rev: u32,
    /** Encoder position, relative to the calibrated zero, where the first window opens. */
    pub offset: i32,
    /** Direction of rotation. Fixed for the lifetime of the engine. */
    pub direction: Direction,
    pub calibration: CalibrationParams,
}

impl Config {
    /// Switching events in one mechanical revolution.
    pub fn states_per_mech_rev(&self) -> u32 {
        self.states_per_elec_rev
            .saturating_mul(self.elec_revs_per_mech_rev)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.states_per_elec_rev < 1 {
            return Err(ConfigError::NoStates);
        }
        if self.elec_revs_per_mech_rev < 1 {
            return Err(ConfigError::NoElectricalRevolutions);
        }
        if self.pulses_per_rev <= 0 {
            return Err(ConfigError::NoPulses);
        }
        // A zero step would switch on every tick.
        if (self.pulses_per_rev as u32) < self.states_per_mech_rev() {
            return Err(ConfigError::TooFewPulses);
        }

        self.calibration.validate()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            pulses_per_rev: 20000,
            states_per_elec_rev: 6,
            elec_revs_per_mech_rev: 2,
            offset: -834,
            direction: Direction::Forward,
            calibration: CalibrationParams::default(),
        }
    }
}

/// How the calibration looks for the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationMode {
    /// Step the ring once per dwell until the rotor stops following.
    #[default]
    Step,
    /// Hold the first state and wait for the rotor to settle on it.
    Settle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationParams {
    pub mode: CalibrationMode,
    /** Time between two encoder samples. */
    pub dwell_ms: u32,
    /** Unchanged readings in a row that count as a stall. */
    pub settle_repeats: u32,
    /** Dwell cycles before giving up. */
    pub max_cycles: u32,
}

impl CalibrationParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.settle_repeats == 0 || self.max_cycles == 0 {
            return Err(ConfigError::InvalidCalibration);
        }
        Ok(())
    }
}

impl Default for CalibrationParams {
    fn default() -> Self {
        CalibrationParams {
            mode: CalibrationMode::Step,
            dwell_ms: 100,
            settle_repeats: 2,
            max_cycles: 50,
        }
    }
}
