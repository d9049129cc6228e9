//! The commutation ring.
//!
//! States are kept in a fixed capacity arena and linked to each other by index, forming a
//! circular doubly linked list. A lone state links to its own slot. The ring is built once
//! at startup, after which only the schedule metadata of the states changes.

use heapless::Vec;

use crate::error::ConfigError;
use crate::output::OutputId;
use crate::schedule::{Direction, Window};

/// Index of a state in its [`Ring`]. Handed out by the ring when a state is inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StateId(u16);

impl StateId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }

    fn from_index(index: usize) -> Result<Self, ConfigError> {
        u16::try_from(index)
            .map(StateId)
            .map_err(|_| ConfigError::RingFull)
    }
}

impl core::fmt::Display for StateId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "S{}", self.0)
    }
}

/// A set of outputs to energize together, holding up to `K` outputs.
#[derive(Debug, Clone)]
pub struct CommutationState<const K: usize> {
    outputs: Vec<OutputId, K>,
    /// The window this state was last scheduled for.
    schedule: Option<Window>,
}

impl<const K: usize> CommutationState<K> {
    pub fn new(outputs: &[OutputId]) -> Result<Self, ConfigError> {
        if outputs.is_empty() {
            return Err(ConfigError::EmptyState);
        }

        let outputs = Vec::from_slice(outputs).map_err(|_| ConfigError::TooManyOutputs)?;

        Ok(CommutationState {
            outputs,
            schedule: None,
        })
    }

    /// Copy of this state with the same outputs and no schedule, used to expand a ring
    /// over several electrical revolutions.
    pub fn duplicate(&self) -> Self {
        CommutationState {
            outputs: self.outputs.clone(),
            schedule: None,
        }
    }

    pub fn outputs(&self) -> &[OutputId] {
        &self.outputs
    }

    /// Encoder position where this state hands over to the following one.
    pub fn transition(&self) -> Option<i32> {
        self.schedule.map(|w| w.end())
    }

    /// The `(start, end)` positions this state is scheduled for.
    pub fn interval(&self) -> Option<(i32, i32)> {
        self.schedule.map(|w| (w.start(), w.end()))
    }

    /// Whether the interval crosses the encoder rollover.
    pub fn wraps(&self) -> bool {
        self.schedule.map(|w| w.overflow()).unwrap_or(false)
    }

    pub(crate) fn set_schedule(&mut self, window: Window) {
        self.schedule = Some(window);
    }
}

#[derive(Debug, Clone)]
struct Node<const K: usize> {
    state: CommutationState<K>,
    next: StateId,
    previous: StateId,
}

/// Circular sequence of up to `N` states with up to `K` outputs each.
#[derive(Debug, Clone)]
pub struct Ring<const N: usize, const K: usize> {
    nodes: Vec<Node<K>, N>,
}

impl<const N: usize, const K: usize> Ring<N, K> {
    pub fn new() -> Self {
        Ring { nodes: Vec::new() }
    }

    /// Build a ring with one state per pattern, in order.
    pub fn from_patterns(patterns: &[&[OutputId]]) -> Result<Self, ConfigError> {
        let mut ring = Ring::new();

        for p in patterns {
            ring.add(CommutationState::new(p)?)?;
        }

        Ok(ring)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The first state added to the ring.
    pub fn head(&self) -> Option<StateId> {
        if self.nodes.is_empty() {
            None
        } else {
            Some(StateId(0))
        }
    }

    /// Append a state at the end of the sequence, that is right before the head.
    pub fn add(&mut self, state: CommutationState<K>) -> Result<StateId, ConfigError> {
        let Some(head) = self.head() else {
            let id = StateId(0);
            self.nodes
                .push(Node {
                    state,
                    next: id,
                    previous: id,
                })
                .map_err(|_| ConfigError::RingFull)?;
            return Ok(id);
        };

        let tail = self.previous(head);
        self.insert_after(tail, state)
    }

    /// Splice `state` into the ring right after `at`.
    pub fn insert_after(
        &mut self,
        at: StateId,
        state: CommutationState<K>,
    ) -> Result<StateId, ConfigError> {
        if at.index() >= self.nodes.len() {
            return Err(ConfigError::UnknownState);
        }

        let id = StateId::from_index(self.nodes.len())?;
        let next = self.nodes[at.index()].next;

        self.nodes
            .push(Node {
                state,
                next,
                previous: at,
            })
            .map_err(|_| ConfigError::RingFull)?;

        self.nodes[next.index()].previous = id;
        self.nodes[at.index()].next = id;

        Ok(id)
    }

    /// Replicate the first `base_count` states for every electrical revolution after the
    /// first, keeping their order.
    pub fn expand(&mut self, elec_revs: u32, base_count: usize) -> Result<(), ConfigError> {
        if elec_revs == 0 {
            return Err(ConfigError::NoElectricalRevolutions);
        }
        let Some(head) = self.head() else {
            return Err(ConfigError::EmptyRing);
        };
        if base_count == 0 {
            return Err(ConfigError::EmptyRing);
        }
        if base_count > self.len() {
            return Err(ConfigError::RingLength {
                expected: base_count,
                found: self.len(),
            });
        }

        let base: Vec<StateId, N> = self.iter_from(head).take(base_count).collect();

        for _ in 1..elec_revs {
            for id in &base {
                let dup = self.nodes[id.index()].state.duplicate();
                let tail = self.previous(head);
                self.insert_after(tail, dup)?;
            }
        }

        Ok(())
    }

    /// The state after `id`.
    ///
    /// # Panics
    ///
    /// If `id` is not from this ring, as do [`Ring::previous`], [`Ring::step`] and
    /// [`Ring::state`]. Use [`Ring::contains`] to check ids of unknown origin.
    pub fn next(&self, id: StateId) -> StateId {
        self.nodes[id.index()].next
    }

    pub fn previous(&self, id: StateId) -> StateId {
        self.nodes[id.index()].previous
    }

    /// The neighbour of `id` in the direction of rotation.
    pub fn step(&self, id: StateId, direction: Direction) -> StateId {
        match direction {
            Direction::Forward => self.next(id),
            Direction::Reverse => self.previous(id),
        }
    }

    pub fn state(&self, id: StateId) -> &CommutationState<K> {
        &self.nodes[id.index()].state
    }

    pub(crate) fn state_mut(&mut self, id: StateId) -> &mut CommutationState<K> {
        &mut self.nodes[id.index()].state
    }

    pub fn contains(&self, id: StateId) -> bool {
        id.index() < self.nodes.len()
    }

    /// Walk the whole ring once in `next` order, starting at `id`. Panics on the first
    /// step if `id` is not from this ring.
    pub fn iter_from(&self, id: StateId) -> RingIter<'_, N, K> {
        RingIter {
            ring: self,
            at: id,
            left: self.nodes.len(),
        }
    }

    /// Look up the state whose scheduled interval contains `position`.
    pub fn state_at(&self, position: i32) -> Option<StateId> {
        self.nodes
            .iter()
            .position(|n| n.state.schedule.is_some_and(|w| w.contains(position)))
            .and_then(|i| StateId::from_index(i).ok())
    }
}

impl<const N: usize, const K: usize> Default for Ring<N, K> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct RingIter<'a, const N: usize, const K: usize> {
    ring: &'a Ring<N, K>,
    at: StateId,
    left: usize,
}

impl<'a, const N: usize, const K: usize> Iterator for RingIter<'a, N, K> {
    type Item = StateId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.left == 0 {
            return None;
        }

        let id = self.at;
        self.at = self.ring.next(id);
        self.left -= 1;

        Some(id)
    }
}
