//! The kernel control protocol: plain-data request and response messages.
//!
//! Messages mirror the worker-isolate deployment described in the crate
//! docs: the editing surface serializes [`ControlMessage`]s across a
//! channel, the driver answers with [`Response`]s. Tags are camelCase on
//! the wire; an unrecognized or malformed message maps to
//! [`Response::Error`] without touching kernel state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::component::MemoryMap;
use crate::netlist::{GateState, Snapshot, WireState};
use crate::state::State;
use crate::types::{GateId, WireId};

/// Requests accepted by the driver.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ControlMessage {
    /// Replace the entire netlist; evaluations are scheduled at t=0.
    Init {
        gates: Vec<GateState>,
        wires: Vec<WireState>,
    },
    /// Idle/Paused → Running.
    Run,
    /// Running → Paused.
    Pause,
    /// Execute `count` steps (default 1).
    Step { count: Option<u64> },
    /// Clear events, reset components (ROM keeps memory), zero time.
    Reset,
    /// Flip a TOGGLE gate, then step once.
    Toggle { gate_id: GateId },
    /// Arm a PULSE gate, then step once.
    TriggerPulse { gate_id: GateId },
    /// Set a TOGGLE gate's value, then step once.
    SetInput { gate_id: GateId, value: State },
    /// Set a KEYPAD gate's value (0..=15), then step once.
    SetKeypadValue { gate_id: GateId, value: u8 },
    /// Replace a RAM/ROM gate's memory contents.
    SetMemoryData { gate_id: GateId, memory: MemoryMap },
    /// Adjust driver pacing; clamped to 1..=1000 ms per tick.
    SetSpeed { ms_per_tick: u64 },
    AddGate { gate: GateState },
    RemoveGate { gate_id: GateId },
    AddWire { wire: WireState },
    RemoveWire { wire_id: WireId },
    /// Request an immediate snapshot.
    GetState,
}

/// Replies emitted by the driver.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Response {
    /// The driver is up and accepting messages.
    Ready,
    /// A full kernel snapshot.
    StateUpdate(Snapshot),
    /// An operation was rejected; kernel state is unchanged.
    Error { message: String },
}

impl Response {
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error {
            message: message.into(),
        }
    }
}

/// Error raised when an incoming message cannot be understood.
#[derive(Error, Debug)]
pub enum MessageError {
    #[error("message not recognized: {0}")]
    Unrecognized(#[from] serde_json::Error),
}

/// Deserializes a control message from its JSON wire form.
pub fn parse_message(json: &str) -> Result<ControlMessage, MessageError> {
    Ok(serde_json::from_str(json)?)
}
