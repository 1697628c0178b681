//! Basic combinational gates: the six n-ary logic functions plus the
//! inverter and the two buffers.

use crate::component::{Component, EvalResult, Pins};
use crate::state::{self, State};
use crate::types::{GateId, SimTime};

/// The truth-table family of an n-ary [`LogicGate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
    Xor,
    Nand,
    Nor,
    Xnor,
}

impl LogicOp {
    fn apply(self, inputs: &[State]) -> State {
        match self {
            LogicOp::And => state::and_all(inputs),
            LogicOp::Or => state::or_all(inputs),
            LogicOp::Xor => state::xor_all(inputs),
            LogicOp::Nand => state::and_all(inputs).not(),
            LogicOp::Nor => state::or_all(inputs).not(),
            LogicOp::Xnor => state::xor_all(inputs).not(),
        }
    }

    fn kind(self) -> &'static str {
        match self {
            LogicOp::And => "AND",
            LogicOp::Or => "OR",
            LogicOp::Xor => "XOR",
            LogicOp::Nand => "NAND",
            LogicOp::Nor => "NOR",
            LogicOp::Xnor => "XNOR",
        }
    }
}

/// An n-input single-output logic gate (default 2 inputs).
pub struct LogicGate {
    id: GateId,
    op: LogicOp,
    pins: Pins,
}

impl LogicGate {
    pub const DEFAULT_INPUTS: usize = 2;

    pub fn new(id: GateId, op: LogicOp, input_count: usize) -> Self {
        Self {
            id,
            op,
            pins: Pins::new(input_count.max(1), 1),
        }
    }
}

impl Component for LogicGate {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        self.op.kind()
    }

    fn input_count(&self) -> usize {
        self.pins.inputs.len()
    }

    fn output_count(&self) -> usize {
        1
    }

    fn inputs(&self) -> &[State] {
        &self.pins.inputs
    }

    fn outputs(&self) -> &[State] {
        &self.pins.outputs
    }

    fn set_input(&mut self, index: usize, state: State) {
        self.pins.set_input(index, state);
    }

    fn set_output(&mut self, index: usize, state: State) {
        self.pins.set_output(index, state);
    }

    fn evaluate(&mut self, _time: SimTime) -> EvalResult {
        self.pins.outputs[0] = self.op.apply(&self.pins.inputs);
        EvalResult {
            outputs: self.pins.outputs.clone(),
            delay: 1,
        }
    }

    fn reset(&mut self) {
        self.pins.reset();
    }
}

/// Inverter.
pub struct NotGate {
    id: GateId,
    pins: Pins,
}

impl NotGate {
    pub fn new(id: GateId) -> Self {
        Self {
            id,
            pins: Pins::new(1, 1),
        }
    }
}

impl Component for NotGate {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "NOT"
    }

    fn input_count(&self) -> usize {
        1
    }

    fn output_count(&self) -> usize {
        1
    }

    fn inputs(&self) -> &[State] {
        &self.pins.inputs
    }

    fn outputs(&self) -> &[State] {
        &self.pins.outputs
    }

    fn set_input(&mut self, index: usize, state: State) {
        self.pins.set_input(index, state);
    }

    fn set_output(&mut self, index: usize, state: State) {
        self.pins.set_output(index, state);
    }

    fn evaluate(&mut self, _time: SimTime) -> EvalResult {
        self.pins.outputs[0] = self.pins.inputs[0].not();
        EvalResult {
            outputs: self.pins.outputs.clone(),
            delay: 1,
        }
    }

    fn reset(&mut self) {
        self.pins.reset();
    }
}

/// Non-inverting buffer.
pub struct BufferGate {
    id: GateId,
    pins: Pins,
}

impl BufferGate {
    pub fn new(id: GateId) -> Self {
        Self {
            id,
            pins: Pins::new(1, 1),
        }
    }
}

impl Component for BufferGate {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "BUFFER"
    }

    fn input_count(&self) -> usize {
        1
    }

    fn output_count(&self) -> usize {
        1
    }

    fn inputs(&self) -> &[State] {
        &self.pins.inputs
    }

    fn outputs(&self) -> &[State] {
        &self.pins.outputs
    }

    fn set_input(&mut self, index: usize, state: State) {
        self.pins.set_input(index, state);
    }

    fn set_output(&mut self, index: usize, state: State) {
        self.pins.set_output(index, state);
    }

    fn evaluate(&mut self, _time: SimTime) -> EvalResult {
        self.pins.outputs[0] = self.pins.inputs[0];
        EvalResult {
            outputs: self.pins.outputs.clone(),
            delay: 1,
        }
    }

    fn reset(&mut self) {
        self.pins.reset();
    }
}

/// Tri-state buffer: inputs `(data, enable)`.
///
/// Enabled, it forwards data; disabled, it releases the net (`HiZ`); an
/// indeterminate enable yields `Unknown`.
pub struct TriStateBuffer {
    id: GateId,
    pins: Pins,
}

impl TriStateBuffer {
    pub fn new(id: GateId) -> Self {
        Self {
            id,
            pins: Pins::new(2, 1),
        }
    }
}

impl Component for TriStateBuffer {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "TRI_BUFFER"
    }

    fn input_count(&self) -> usize {
        2
    }

    fn output_count(&self) -> usize {
        1
    }

    fn inputs(&self) -> &[State] {
        &self.pins.inputs
    }

    fn outputs(&self) -> &[State] {
        &self.pins.outputs
    }

    fn set_input(&mut self, index: usize, state: State) {
        self.pins.set_input(index, state);
    }

    fn set_output(&mut self, index: usize, state: State) {
        self.pins.set_output(index, state);
    }

    fn evaluate(&mut self, _time: SimTime) -> EvalResult {
        let data = self.pins.inputs[0];
        let enable = self.pins.inputs[1];
        self.pins.outputs[0] = match enable {
            State::One => data,
            State::Zero => State::HiZ,
            _ => State::Unknown,
        };
        EvalResult {
            outputs: self.pins.outputs.clone(),
            delay: 1,
        }
    }

    fn reset(&mut self) {
        self.pins.reset();
    }
}
