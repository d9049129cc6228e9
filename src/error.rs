use crate::output::OutputId;

/// Problems with the machine description. These are found when building the
/// ring, the inverter stage or the engine and mean the drive must not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Zero commutation states per electrical revolution.
    NoStates,
    /// Zero electrical revolutions per mechanical revolution.
    NoElectricalRevolutions,
    /// Encoder resolution is zero or negative.
    NoPulses,
    /// Fewer encoder pulses than switching events in a revolution.
    TooFewPulses,
    /// The ring has no states.
    EmptyRing,
    /// A state energizes no outputs.
    EmptyState,
    /// A state has more outputs than its capacity.
    TooManyOutputs,
    /// The ring arena is at capacity.
    RingFull,
    /// The ring doesn't hold one state per switching event.
    RingLength { expected: usize, found: usize },
    /// A state id that doesn't belong to this ring.
    UnknownState,
    /// A state references an output the bank doesn't have.
    UnknownOutput(OutputId),
    /// Calibration would never finish (zero repeats or zero cycles).
    InvalidCalibration,
}

/// Anything the engine can report back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    Config(ConfigError),
    /// The encoder never stalled within the allowed number of dwell cycles.
    CalibrationTimeout { cycles: u32 },
    /// Calibration only runs before the engine is running.
    AlreadyCalibrated,
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigError::NoStates => write!(f, "need at least one state per electrical revolution"),
            ConfigError::NoElectricalRevolutions => {
                write!(f, "need at least one electrical revolution per mechanical revolution")
            }
            ConfigError::NoPulses => write!(f, "pulses per revolution must be positive"),
            ConfigError::TooFewPulses => {
                write!(f, "fewer encoder pulses than switching events per revolution")
            }
            ConfigError::EmptyRing => write!(f, "ring has no states"),
            ConfigError::EmptyState => write!(f, "state has no outputs"),
            ConfigError::TooManyOutputs => write!(f, "state has too many outputs"),
            ConfigError::RingFull => write!(f, "ring is full"),
            ConfigError::RingLength { expected, found } => {
                write!(f, "ring has {} states, expected {}", found, expected)
            }
            ConfigError::UnknownState => write!(f, "state is not part of this ring"),
            ConfigError::UnknownOutput(id) => write!(f, "output {} is not in the bank", id),
            ConfigError::InvalidCalibration => write!(f, "calibration can never complete"),
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Config(e) => write!(f, "configuration: {}", e),
            Error::CalibrationTimeout { cycles } => {
                write!(f, "calibration timed out after {} cycles", cycles)
            }
            Error::AlreadyCalibrated => write!(f, "already calibrated"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_messages() {
        let e: Error = ConfigError::RingLength {
            expected: 12,
            found: 6,
        }
        .into();
        assert_eq!(
            format!("{}", e),
            "configuration: ring has 6 states, expected 12"
        );
        assert_eq!(
            format!("{}", Error::CalibrationTimeout { cycles: 50 }),
            "calibration timed out after 50 cycles"
        );
        assert_eq!(
            format!("{}", ConfigError::UnknownOutput(OutputId(3))),
            "output #3 is not in the bank"
        );
    }
}
