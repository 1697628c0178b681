//! Netlist descriptors and snapshots.
//!
//! These are the plain-data shapes exchanged with the outside world: gate
//! and wire descriptors going in (`init`, `addGate`, `addWire`), and the
//! full-state [`Snapshot`] coming out. The same structs serve both
//! directions: a snapshot of a gate is a valid descriptor for recreating
//! it, internal state included.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::state::State;
use crate::types::{GateId, PortIndex, SimTime, WireId};

/// Descriptor and snapshot form of a gate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GateState {
    /// Stable identifier, assigned by the caller.
    pub id: GateId,
    /// Catalogue type name, e.g. `"AND"`, `"D_FLIPFLOP"`, `"RAM_16X4"`.
    #[serde(rename = "type")]
    pub gate_type: String,
    /// Current input port states. For variable-arity gates the length also
    /// fixes the input count at construction.
    pub input_states: Vec<State>,
    /// Current output port states.
    pub output_states: Vec<State>,
    /// Construction parameters (clock `period`, `duty_cycle`, pulse
    /// `duration`, ...), as string key-value pairs.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attrs: HashMap<String, String>,
    /// Component-specific internal state (flip-flop Q, counter value,
    /// memory contents, ...). `None` for stateless gates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_state: Option<serde_json::Value>,
}

impl GateState {
    /// Creates a descriptor with empty port arrays (the catalogue will size
    /// them from the type's fixed arity).
    pub fn new(id: impl Into<GateId>, gate_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            gate_type: gate_type.into(),
            input_states: Vec::new(),
            output_states: Vec::new(),
            attrs: HashMap::new(),
            internal_state: None,
        }
    }

    /// Sets the input count for variable-arity gates.
    pub fn with_input_count(mut self, count: usize) -> Self {
        self.input_states = vec![State::Unknown; count];
        self
    }

    /// Adds a construction parameter.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// Seeds the component's internal state.
    pub fn with_internal_state(mut self, state: serde_json::Value) -> Self {
        self.internal_state = Some(state);
        self
    }
}

/// Descriptor and snapshot form of a wire: a point-to-point connection from
/// one gate's output port to another gate's input port.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WireState {
    /// Stable identifier, assigned by the caller.
    pub id: WireId,
    /// Cached resolved state. Optional on input; the kernel resolves it.
    #[serde(default)]
    pub state: State,
    pub source_gate_id: GateId,
    pub source_port_index: PortIndex,
    pub target_gate_id: GateId,
    pub target_port_index: PortIndex,
}

impl WireState {
    /// Creates a wire descriptor with an unresolved state.
    pub fn new(
        id: impl Into<WireId>,
        source_gate_id: impl Into<GateId>,
        source_port_index: PortIndex,
        target_gate_id: impl Into<GateId>,
        target_port_index: PortIndex,
    ) -> Self {
        Self {
            id: id.into(),
            state: State::Unknown,
            source_gate_id: source_gate_id.into(),
            source_port_index,
            target_gate_id: target_gate_id.into(),
            target_port_index,
        }
    }
}

/// A read-only copy of the full kernel state, published at frame
/// boundaries. Consumers diff against their previous snapshot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot {
    /// Simulation time at capture.
    pub time: SimTime,
    /// All gates, in netlist insertion order.
    pub gates: Vec<GateState>,
    /// All wires, in netlist insertion order.
    pub wires: Vec<WireState>,
}
