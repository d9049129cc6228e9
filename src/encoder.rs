//! Position feedback.
//!
//! The quadrature decoding happens elsewhere (a timer peripheral, an interrupt driven
//! counter). All the commutation needs is the accumulated pulse count and a way to set it
//! once the rotor is at its reference.

/// Source of the rotor position in encoder pulses.
pub trait Encoder {
    /// Current pulse count. Expected within `[0, pulses_per_rev)`, but the engine
    /// copes with readings outside of it.
    fn read(&mut self) -> i32;

    /// Overwrite the pulse count. Used to put the zero at the calibrated reference.
    fn write(&mut self, value: i32);
}

impl<E> Encoder for &mut E
where
    E: Encoder,
{
    fn read(&mut self) -> i32 {
        (**self).read()
    }

    fn write(&mut self, value: i32) {
        (**self).write(value)
    }
}

/// Fold any pulse count into `[0, pulses_per_rev)`.
///
/// Counters that run past a revolution, negative counts and glitches all land somewhere
/// in the revolution. `pulses_per_rev` must be positive.
#[inline(always)]
pub fn wrap(position: i32, pulses_per_rev: i32) -> i32 {
    position.rem_euclid(pulses_per_rev)
}
