//! Edge-triggered flip-flops.
//!
//! Both families capture on the rising edge of CLK, detected against the
//! input snapshot latched after the previous evaluation. The `_SR`
//! variants add active-low asynchronous SET̄/RESET̄ inputs that override
//! the clock; asserting both at once drives Q to `Conflict`.

use serde_json::json;

use crate::component::{Component, EvalResult, Pins};
use crate::state::State;
use crate::types::{GateId, SimTime};

/// Maps a sampled data input onto the stored bit per the error-propagation
/// rules: valid levels are captured, `HiZ`/`Unknown` degrade to `Unknown`,
/// `Conflict` stays `Conflict`.
fn capture(data: State) -> State {
    match data {
        State::Zero | State::One => data,
        State::Conflict => State::Conflict,
        State::HiZ | State::Unknown => State::Unknown,
    }
}

/// Applies the active-low asynchronous overrides. Returns the forced Q
/// value, or `None` when neither override is asserted.
fn async_set_reset(set_n: State, reset_n: State) -> Option<State> {
    match (set_n, reset_n) {
        (State::Zero, State::Zero) => Some(State::Conflict),
        (State::Zero, _) => Some(State::One),
        (_, State::Zero) => Some(State::Zero),
        _ => None,
    }
}

/// D flip-flop. Inputs `(D, CLK)`, or `(D, CLK, SET̄, RESET̄)` for the
/// `_SR` variant. Outputs `(Q, Q̄)`.
pub struct DFlipFlop {
    id: GateId,
    pins: Pins,
    q: State,
    has_set_reset: bool,
}

impl DFlipFlop {
    const D: usize = 0;
    const CLK: usize = 1;
    const SET_N: usize = 2;
    const RESET_N: usize = 3;

    pub fn new(id: GateId, has_set_reset: bool) -> Self {
        let input_count = if has_set_reset { 4 } else { 2 };
        let mut pins = Pins::new(input_count, 2);
        pins.outputs[0] = State::Zero;
        pins.outputs[1] = State::One;
        Self {
            id,
            pins,
            q: State::Zero,
            has_set_reset,
        }
    }
}

impl Component for DFlipFlop {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        if self.has_set_reset {
            "D_FLIPFLOP_SR"
        } else {
            "D_FLIPFLOP"
        }
    }

    fn input_count(&self) -> usize {
        self.pins.inputs.len()
    }

    fn output_count(&self) -> usize {
        2
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
        let forced = if self.has_set_reset {
            async_set_reset(
                self.pins.inputs[Self::SET_N],
                self.pins.inputs[Self::RESET_N],
            )
        } else {
            None
        };

        if let Some(q) = forced {
            self.q = q;
        } else if self.pins.rising(Self::CLK) {
            self.q = capture(self.pins.inputs[Self::D]);
        }

        self.pins.outputs[0] = self.q;
        self.pins.outputs[1] = self.q.not();
        EvalResult {
            outputs: self.pins.outputs.clone(),
            delay: 1,
        }
    }

    fn latch_inputs(&mut self) {
        self.pins.latch();
    }

    fn reset(&mut self) {
        self.pins.reset();
        self.q = State::Zero;
        self.pins.outputs[0] = State::Zero;
        self.pins.outputs[1] = State::One;
    }

    fn internal_state(&self) -> Option<serde_json::Value> {
        Some(json!({ "q": self.q.to_u8() }))
    }

    fn restore_internal(&mut self, state: &serde_json::Value) {
        if let Some(q) = state.get("q").and_then(|v| v.as_u64()) {
            self.q = State::from_u8(q as u8);
            self.pins.outputs[0] = self.q;
            self.pins.outputs[1] = self.q.not();
        }
    }
}

/// JK flip-flop. Inputs `(J, K, CLK)`, or `(J, K, CLK, SET̄, RESET̄)` for
/// the `_SR` variant. Outputs `(Q, Q̄)`.
pub struct JkFlipFlop {
    id: GateId,
    pins: Pins,
    q: State,
    has_set_reset: bool,
}

impl JkFlipFlop {
    const J: usize = 0;
    const K: usize = 1;
    const CLK: usize = 2;
    const SET_N: usize = 3;
    const RESET_N: usize = 4;

    pub fn new(id: GateId, has_set_reset: bool) -> Self {
        let input_count = if has_set_reset { 5 } else { 3 };
        let mut pins = Pins::new(input_count, 2);
        pins.outputs[0] = State::Zero;
        pins.outputs[1] = State::One;
        Self {
            id,
            pins,
            q: State::Zero,
            has_set_reset,
        }
    }

    fn clocked_next(&self) -> State {
        let j = self.pins.inputs[Self::J];
        let k = self.pins.inputs[Self::K];

        if j == State::Conflict || k == State::Conflict {
            return State::Conflict;
        }
        if !j.is_valid() || !k.is_valid() {
            return State::Unknown;
        }
        match (j, k) {
            (State::Zero, State::Zero) => self.q,
            (State::Zero, State::One) => State::Zero,
            (State::One, State::Zero) => State::One,
            (State::One, State::One) => self.q.not(),
            _ => unreachable!("both operands validated above"),
        }
    }
}

impl Component for JkFlipFlop {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        if self.has_set_reset {
            "JK_FLIPFLOP_SR"
        } else {
            "JK_FLIPFLOP"
        }
    }

    fn input_count(&self) -> usize {
        self.pins.inputs.len()
    }

    fn output_count(&self) -> usize {
        2
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
        let forced = if self.has_set_reset {
            async_set_reset(
                self.pins.inputs[Self::SET_N],
                self.pins.inputs[Self::RESET_N],
            )
        } else {
            None
        };

        if let Some(q) = forced {
            self.q = q;
        } else if self.pins.rising(Self::CLK) {
            self.q = self.clocked_next();
        }

        self.pins.outputs[0] = self.q;
        self.pins.outputs[1] = self.q.not();
        EvalResult {
            outputs: self.pins.outputs.clone(),
            delay: 1,
        }
    }

    fn latch_inputs(&mut self) {
        self.pins.latch();
    }

    fn reset(&mut self) {
        self.pins.reset();
        self.q = State::Zero;
        self.pins.outputs[0] = State::Zero;
        self.pins.outputs[1] = State::One;
    }

    fn internal_state(&self) -> Option<serde_json::Value> {
        Some(json!({ "q": self.q.to_u8() }))
    }

    fn restore_internal(&mut self, state: &serde_json::Value) {
        if let Some(q) = state.get("q").and_then(|v| v.as_u64()) {
            self.q = State::from_u8(q as u8);
            self.pins.outputs[0] = self.q;
            self.pins.outputs[1] = self.q.not();
        }
    }
}
