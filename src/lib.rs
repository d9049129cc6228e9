//! Commutation for switched-reluctance motors.
//!
//! A ring of [`CommutationState`]s describes which phase outputs to energize in turn. The
//! [`CommutationEngine`] reads the rotor position from an [`Encoder`] once per control tick
//! and steps the ring through the [`InverterStage`] as the rotor moves.

// For tests we use std.
#![cfg_attr(not(test), no_std)]

mod calibrate;
mod config;
mod encoder;
mod engine;
mod error;
mod inverter;
mod observer;
mod output;
mod ring;
mod schedule;

pub use calibrate::Calibrator;
pub use config::{CalibrationMode, CalibrationParams, Config};
pub use encoder::{wrap, Encoder};
pub use engine::{CommutationEngine, Phase, Tick};
pub use error::{ConfigError, Error};
pub use inverter::InverterStage;
pub use observer::{LogObserver, Observer};
pub use output::{Output, OutputBank, OutputId, PinSwitch, Switch};
pub use ring::{CommutationState, Ring, RingIter, StateId};
pub use schedule::{Direction, StepSchedule, Window};
