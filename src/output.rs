//! Phase switches.
//!
//! The commutation core never owns the switches. They live in an [`OutputBank`] held by the
//! application, and commutation states refer to them by [`OutputId`].

use embedded_hal::digital::OutputPin;

/// Index of an output in an [`OutputBank`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutputId(pub u8);

impl OutputId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl core::fmt::Display for OutputId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single controllable phase switch.
///
/// Both operations must be idempotent: activating an energized output (or deactivating
/// a de-energized one) does nothing.
pub trait Output {
    fn activate(&mut self);
    fn deactivate(&mut self);
    fn is_energized(&self) -> bool;
}

/// The set of outputs of a bridge, addressed by id.
pub trait OutputBank {
    /// Number of outputs. Ids `0..len()` are valid.
    fn len(&self) -> usize;
    fn activate(&mut self, id: OutputId);
    fn deactivate(&mut self, id: OutputId);
}

impl<O, const M: usize> OutputBank for [O; M]
where
    O: Output,
{
    fn len(&self) -> usize {
        M
    }

    fn activate(&mut self, id: OutputId) {
        if let Some(o) = self.get_mut(id.index()) {
            o.activate();
        }
    }

    fn deactivate(&mut self, id: OutputId) {
        if let Some(o) = self.get_mut(id.index()) {
            o.deactivate();
        }
    }
}

/// Output driven through a function that sets the pin level.
///
/// The function is only called on an actual change of level.
pub struct Switch<F> {
    write_fn: F,
    energized: bool,
}

impl<F> Switch<F>
where
    F: FnMut(bool),
{
    /// Create a switch. The pin is driven low straight away.
    pub fn new(mut write_fn: F) -> Self {
        write_fn(false);

        Switch {
            write_fn,
            energized: false,
        }
    }
}

impl<F> Output for Switch<F>
where
    F: FnMut(bool),
{
    fn activate(&mut self) {
        if !self.energized {
            (self.write_fn)(true);
            self.energized = true;
        }
    }

    fn deactivate(&mut self) {
        if self.energized {
            (self.write_fn)(false);
            self.energized = false;
        }
    }

    fn is_energized(&self) -> bool {
        self.energized
    }
}

/// Output on top of an `embedded-hal` pin.
pub struct PinSwitch<P> {
    pin: P,
    energized: bool,
}

impl<P> PinSwitch<P>
where
    P: OutputPin,
{
    /// Take over the pin and drive it low.
    pub fn new(mut pin: P) -> Self {
        pin.set_low().ok();

        PinSwitch {
            pin,
            energized: false,
        }
    }

    pub fn release(self) -> P {
        self.pin
    }
}

// Pin errors are a hardware fault, which the commutation layer can't act on.
impl<P> Output for PinSwitch<P>
where
    P: OutputPin,
{
    fn activate(&mut self) {
        if !self.energized {
            self.pin.set_high().ok();
            self.energized = true;
        }
    }

    fn deactivate(&mut self) {
        if self.energized {
            self.pin.set_low().ok();
            self.energized = false;
        }
    }

    fn is_energized(&self) -> bool {
        self.energized
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use core::convert::Infallible;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn switch_is_idempotent() {
        let writes = Rc::new(RefCell::new(Vec::new()));
        let w = writes.clone();
        let mut s = Switch::new(move |level| w.borrow_mut().push(level));

        s.activate();
        s.activate();
        assert!(s.is_energized());
        s.deactivate();
        s.deactivate();
        assert!(!s.is_energized());

        assert_eq!(*writes.borrow(), vec![false, true, false]);
    }

    #[derive(Default)]
    struct Pin {
        high: bool,
        edges: u32,
    }

    impl embedded_hal::digital::ErrorType for Pin {
        type Error = Infallible;
    }

    impl OutputPin for Pin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            if self.high {
                self.edges += 1;
            }
            self.high = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            if !self.high {
                self.edges += 1;
            }
            self.high = true;
            Ok(())
        }
    }

    #[test]
    fn pin_switch_drives_pin() {
        let mut s = PinSwitch::new(Pin::default());
        s.activate();
        s.activate();
        assert!(s.is_energized());
        s.deactivate();

        let pin = s.release();
        assert!(!pin.high);
        assert_eq!(pin.edges, 2);
    }

    #[test]
    fn array_bank_ignores_unknown_ids() {
        let mut bank = [
            PinSwitch::new(Pin::default()),
            PinSwitch::new(Pin::default()),
        ];
        assert_eq!(OutputBank::len(&bank), 2);

        bank.activate(OutputId(1));
        bank.activate(OutputId(7));
        assert!(!bank[0].is_energized());
        assert!(bank[1].is_energized());
    }
}
