//! The simulation event queue.
//!
//! Events are the unit of scheduling: "re-evaluate this gate at time t".
//! The queue is a priority queue ordered by `(time, sequence)`, where
//! `sequence` is a monotonic counter assigned at push. The tie-break makes
//! replay deterministic: two identical netlists fed the same operation
//! history pop events in exactly the same order.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use crate::state::State;
use crate::types::{GateId, SimTime};

/// Port index marker for "re-evaluate the whole gate".
pub const WHOLE_GATE: i32 = -1;

/// A scheduled evaluation.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SimulationEvent {
    /// Simulation time at which the event fires.
    pub time: SimTime,
    /// Monotonic push counter; total order among same-time events.
    pub sequence: u64,
    /// The gate to evaluate.
    pub gate_id: GateId,
    /// Targeted input port, or [`WHOLE_GATE`] for a full evaluation.
    pub port_index: i32,
    /// Optional state payload carried with the event.
    pub payload: Option<State>,
}

impl Ord for SimulationEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap behavior on top of BinaryHeap
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for SimulationEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Priority queue of [`SimulationEvent`]s with deterministic tie-breaking.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<SimulationEvent>,
    sequence_counter: u64,
}

impl EventQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules an event, assigning it the next sequence number.
    pub fn push(
        &mut self,
        time: SimTime,
        gate_id: GateId,
        port_index: i32,
        payload: Option<State>,
    ) {
        let event = SimulationEvent {
            time,
            sequence: self.sequence_counter,
            gate_id,
            port_index,
            payload,
        };
        self.sequence_counter += 1;
        self.heap.push(event);
    }

    /// Removes and returns the earliest event.
    pub fn pop(&mut self) -> Option<SimulationEvent> {
        self.heap.pop()
    }

    /// Returns the earliest event without removing it.
    pub fn peek(&self) -> Option<&SimulationEvent> {
        self.heap.peek()
    }

    /// Returns true if no events are pending.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Drops every pending event and restarts the sequence counter.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.sequence_counter = 0;
    }

    /// True if any pending event addresses the given gate.
    pub fn has_events_for(&self, gate_id: &str) -> bool {
        self.heap.iter().any(|e| e.gate_id == gate_id)
    }

    /// Purges all pending events addressed to the given gate.
    ///
    /// Surviving events keep their original sequence numbers, so relative
    /// order among them is unchanged.
    pub fn remove_events_for(&mut self, gate_id: &str) {
        let survivors: Vec<_> = self
            .heap
            .drain()
            .filter(|e| e.gate_id != gate_id)
            .collect();
        for event in survivors {
            self.heap.push(event);
        }
    }
}
