//! The inverter stage.
//!
//! Only this stage switches outputs, and it always takes down the outputs of the current
//! state before bringing up those of the next. On an (a)symmetric bridge two states
//! conducting at once is a shoot-through, so there must never be an instant where outputs
//! of two different states are energized together.

use crate::error::ConfigError;
use crate::output::OutputBank;
use crate::ring::{CommutationState, Ring, StateId};
use crate::schedule::Direction;

pub struct InverterStage<B, const N: usize, const K: usize> {
    ring: Ring<N, K>,
    bank: B,
    current: StateId,
    energized: bool,
}

impl<B, const N: usize, const K: usize> InverterStage<B, N, K>
where
    B: OutputBank,
{
    /// Take over the ring and the outputs. Nothing is energized until the first
    /// activation, and the head of the ring is the current state.
    pub fn new(ring: Ring<N, K>, bank: B) -> Result<Self, ConfigError> {
        let head = ring.head().ok_or(ConfigError::EmptyRing)?;

        for id in ring.iter_from(head) {
            let state = ring.state(id);

            if state.outputs().is_empty() {
                return Err(ConfigError::EmptyState);
            }

            if let Some(o) = state.outputs().iter().find(|o| o.index() >= bank.len()) {
                return Err(ConfigError::UnknownOutput(*o));
            }
        }

        Ok(InverterStage {
            ring,
            bank,
            current: head,
            energized: false,
        })
    }

    /// Energize `state` in place of the current state.
    ///
    /// Ids not in the ring are ignored.
    pub fn activate_state(&mut self, state: StateId) {
        if !self.ring.contains(state) {
            return;
        }

        if self.energized {
            self.deactivate_current();
        }

        for o in self.ring.state(state).outputs() {
            self.bank.activate(*o);
        }

        self.current = state;
        self.energized = true;
    }

    /// De-energize the current state without bringing up another.
    pub fn turn_off(&mut self) {
        self.deactivate_current();
        self.energized = false;
    }

    /// De-energize every output used anywhere in the ring.
    pub fn shutdown(&mut self) {
        for id in self.ring.iter_from(self.current) {
            for o in self.ring.state(id).outputs() {
                self.bank.deactivate(*o);
            }
        }
        self.energized = false;
    }

    pub fn next(&mut self) -> StateId {
        let next = self.ring.next(self.current);
        self.activate_state(next);
        next
    }

    pub fn previous(&mut self) -> StateId {
        let previous = self.ring.previous(self.current);
        self.activate_state(previous);
        previous
    }

    /// Step one state in the direction of rotation.
    pub fn advance(&mut self, direction: Direction) -> StateId {
        match direction {
            Direction::Forward => self.next(),
            Direction::Reverse => self.previous(),
        }
    }

    /// Re-energize the current state.
    pub fn energize(&mut self) {
        self.activate_state(self.current);
    }

    pub fn current(&self) -> StateId {
        self.current
    }

    pub fn current_state(&self) -> &CommutationState<K> {
        self.ring.state(self.current)
    }

    pub fn is_energized(&self) -> bool {
        self.energized
    }

    pub fn ring(&self) -> &Ring<N, K> {
        &self.ring
    }

    pub(crate) fn ring_mut(&mut self) -> &mut Ring<N, K> {
        &mut self.ring
    }

    pub fn bank(&self) -> &B {
        &self.bank
    }

    /// Give back the ring and the outputs.
    pub fn release(self) -> (Ring<N, K>, B) {
        (self.ring, self.bank)
    }

    fn deactivate_current(&mut self) {
        for o in self.ring.state(self.current).outputs() {
            self.bank.deactivate(*o);
        }
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::output::OutputId;
    use std::collections::BTreeSet;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Event {
        On(u8),
        Off(u8),
    }

    /// Bank that records every switch and the set of energized outputs.
    #[derive(Debug, Default)]
    pub struct MockBank {
        pub size: usize,
        pub on: BTreeSet<u8>,
        pub events: Vec<Event>,
        /// Energized set after every single event.
        pub snapshots: Vec<BTreeSet<u8>>,
    }

    impl MockBank {
        pub fn new(size: usize) -> Self {
            MockBank {
                size,
                ..Default::default()
            }
        }

        pub fn energized(&self) -> Vec<u8> {
            self.on.iter().copied().collect()
        }
    }

    impl OutputBank for MockBank {
        fn len(&self) -> usize {
            self.size
        }

        fn activate(&mut self, id: OutputId) {
            self.on.insert(id.0);
            self.events.push(Event::On(id.0));
            self.snapshots.push(self.on.clone());
        }

        fn deactivate(&mut self, id: OutputId) {
            self.on.remove(&id.0);
            self.events.push(Event::Off(id.0));
            self.snapshots.push(self.on.clone());
        }
    }

    pub fn ring_of<const N: usize, const K: usize>(patterns: &[&[u8]]) -> Ring<N, K> {
        let mut ring = Ring::new();
        for p in patterns {
            let outputs: Vec<OutputId> = p.iter().map(|i| OutputId(*i)).collect();
            ring.add(CommutationState::new(&outputs).unwrap()).unwrap();
        }
        ring
    }

    pub const SIX: &[&[u8]] = &[&[0, 7], &[10, 5], &[8, 3], &[6, 1], &[4, 11], &[2, 9]];

    fn stage() -> InverterStage<MockBank, 12, 2> {
        InverterStage::new(ring_of(SIX), MockBank::new(12)).unwrap()
    }

    fn outputs_of(stage: &InverterStage<MockBank, 12, 2>, id: StateId) -> BTreeSet<u8> {
        stage.ring().state(id).outputs().iter().map(|o| o.0).collect()
    }

    #[test]
    fn starts_de_energized() {
        let s = stage();
        assert!(!s.is_energized());
        assert!(s.bank().on.is_empty());
        assert_eq!(s.current(), s.ring().head().unwrap());
    }

    #[test]
    fn deactivates_before_activating() {
        let mut s = stage();
        s.energize();
        s.next();

        assert_eq!(
            s.bank().events,
            vec![
                Event::On(0),
                Event::On(7),
                Event::Off(0),
                Event::Off(7),
                Event::On(10),
                Event::On(5),
            ]
        );
        assert_eq!(s.bank().energized(), vec![5, 10]);
    }

    #[test]
    fn mutual_exclusion() {
        let mut s = stage();
        let ids: Vec<StateId> = s.ring().iter_from(s.current()).collect();

        // Forward, backward and jumps across the ring.
        let order = [0, 1, 2, 5, 4, 0, 3, 3, 1, 5, 2];
        let mut prev: Option<StateId> = None;

        for i in order {
            let from = s.bank().snapshots.len();
            s.activate_state(ids[i]);

            let new = outputs_of(&s, ids[i]);
            let old = prev.map(|p| outputs_of(&s, p)).unwrap_or_default();

            // Never both states at once, at any single switching event.
            for snap in &s.bank().snapshots[from..] {
                assert!(
                    snap.is_subset(&old) || snap.is_subset(&new),
                    "{:?} mixes {:?} and {:?}",
                    snap,
                    old,
                    new
                );
            }

            assert_eq!(s.bank().on, new);
            assert_eq!(s.current(), ids[i]);
            prev = Some(ids[i]);
        }
    }

    #[test]
    fn shared_outputs_are_switched_cleanly() {
        let mut s: InverterStage<MockBank, 4, 2> =
            InverterStage::new(ring_of(&[&[0, 1], &[1, 2], &[2, 0]]), MockBank::new(3)).unwrap();

        s.energize();
        for _ in 0..7 {
            s.next();
            assert_eq!(
                s.bank().on,
                s.current_state().outputs().iter().map(|o| o.0).collect::<BTreeSet<u8>>()
            );
        }
        for _ in 0..7 {
            s.previous();
            assert_eq!(
                s.bank().on,
                s.current_state().outputs().iter().map(|o| o.0).collect::<BTreeSet<u8>>()
            );
        }
    }

    #[test]
    fn turn_off_and_back_on() {
        let mut s = stage();
        s.energize();
        s.advance(Direction::Reverse);
        let current = s.current();

        s.turn_off();
        assert!(s.bank().on.is_empty());
        assert!(!s.is_energized());
        assert_eq!(s.current(), current);

        // Nothing left to take down.
        let events = s.bank().events.len();
        s.activate_state(s.ring().next(current));
        assert_eq!(s.bank().events.len(), events + 2);
        assert_eq!(s.bank().energized().len(), 2);
    }

    #[test]
    fn shutdown_clears_everything() {
        let mut s = stage();
        s.energize();
        s.shutdown();
        assert!(s.bank().on.is_empty());
        assert_eq!(
            s.bank()
                .events
                .iter()
                .filter(|e| matches!(e, Event::Off(_)))
                .count(),
            12
        );
    }

    #[test]
    fn release_hands_back_ring_and_bank() {
        let mut s = stage();
        s.energize();
        s.next();
        let current = s.current();

        let (ring, bank) = s.release();
        assert_eq!(ring.len(), 6);
        assert_eq!(ring.state(current).outputs(), &[OutputId(10), OutputId(5)]);
        assert_eq!(bank.energized(), vec![5, 10]);
    }

    #[test]
    fn ring_must_fit_bank() {
        let err = InverterStage::<_, 12, 2>::new(ring_of(SIX), MockBank::new(8))
            .err()
            .unwrap();
        assert_eq!(err, ConfigError::UnknownOutput(OutputId(10)));

        let err = InverterStage::<_, 12, 2>::new(Ring::new(), MockBank::new(8))
            .err()
            .unwrap();
        assert_eq!(err, ConfigError::EmptyRing);
    }
}
