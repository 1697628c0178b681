//! Clocked word-level storage: parallel registers, a universal shift
//! register, and an up/down counter. All act on the rising edge of CLK.

use serde_json::json;

use crate::component::{forward_pins, Component, EvalResult, Pins};
use crate::state::State;
use crate::types::{GateId, SimTime};

fn capture(data: State) -> State {
    match data {
        State::Zero | State::One => data,
        State::Conflict => State::Conflict,
        State::HiZ | State::Unknown => State::Unknown,
    }
}

fn bits_to_json(bits: &[State]) -> serde_json::Value {
    json!(bits.iter().map(|s| s.to_u8()).collect::<Vec<u8>>())
}

fn bits_from_json(value: &serde_json::Value) -> Option<Vec<State>> {
    value.as_array().map(|arr| {
        arr.iter()
            .map(|v| State::from_u8(v.as_u64().unwrap_or(4) as u8))
            .collect()
    })
}

/// Parallel-load register. Inputs `(D0..Dn-1, CLK, CLR, LOAD)`, outputs the
/// stored word. On a rising clock edge CLR wins over LOAD; otherwise holds.
pub struct Register {
    id: GateId,
    pins: Pins,
    bits: Vec<State>,
    width: usize,
}

impl Register {
    const CLK: usize = 0; // offset past the data bits
    const CLR: usize = 1;
    const LOAD: usize = 2;

    pub fn new(id: GateId, width: usize) -> Self {
        let mut pins = Pins::new(width + 3, width);
        pins.outputs.fill(State::Zero);
        Self {
            id,
            pins,
            bits: vec![State::Zero; width],
            width,
        }
    }

    fn control(&self, offset: usize) -> State {
        self.pins.inputs[self.width + offset]
    }
}

impl Component for Register {
    forward_pins!();

    fn kind(&self) -> &'static str {
        if self.width == 8 {
            "REGISTER_8BIT"
        } else {
            "REGISTER_4BIT"
        }
    }

    fn evaluate(&mut self, _time: SimTime) -> EvalResult {
        if self.pins.rising(self.width + Self::CLK) {
            if self.control(Self::CLR) == State::One {
                self.bits.fill(State::Zero);
            } else if self.control(Self::LOAD) == State::One {
                for (bit, stored) in self.bits.iter_mut().enumerate() {
                    *stored = capture(self.pins.inputs[bit]);
                }
            }
        }
        self.pins.outputs.clone_from(&self.bits);
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
        self.bits.fill(State::Zero);
        self.pins.outputs.fill(State::Zero);
    }

    fn internal_state(&self) -> Option<serde_json::Value> {
        Some(json!({ "bits": bits_to_json(&self.bits) }))
    }

    fn restore_internal(&mut self, state: &serde_json::Value) {
        if let Some(bits) = state.get("bits").and_then(bits_from_json) {
            if bits.len() == self.width {
                self.bits = bits;
                self.pins.outputs.clone_from(&self.bits);
            }
        }
    }
}

/// 4-bit universal shift register. Inputs
/// `(SER_IN, CLK, CLR, SHIFT_EN, DIR)`, outputs `(Q0..Q3, SER_OUT)`.
/// DIR high shifts left (toward Q3), low shifts right; an indeterminate
/// DIR holds.
pub struct ShiftRegister4 {
    id: GateId,
    pins: Pins,
    bits: [State; 4],
    ser_out: State,
}

impl ShiftRegister4 {
    const SER_IN: usize = 0;
    const CLK: usize = 1;
    const CLR: usize = 2;
    const SHIFT_EN: usize = 3;
    const DIR: usize = 4;

    pub fn new(id: GateId) -> Self {
        let mut pins = Pins::new(5, 5);
        pins.outputs.fill(State::Zero);
        Self {
            id,
            pins,
            bits: [State::Zero; 4],
            ser_out: State::Zero,
        }
    }
}

impl Component for ShiftRegister4 {
    forward_pins!();

    fn kind(&self) -> &'static str {
        "SHIFT_REG_4BIT"
    }

    fn evaluate(&mut self, _time: SimTime) -> EvalResult {
        if self.pins.rising(Self::CLK) {
            if self.pins.inputs[Self::CLR] == State::One {
                self.bits = [State::Zero; 4];
                self.ser_out = State::Zero;
            } else if self.pins.inputs[Self::SHIFT_EN] == State::One {
                let incoming = capture(self.pins.inputs[Self::SER_IN]);
                match self.pins.inputs[Self::DIR] {
                    State::One => {
                        // shift left: Q3 <- Q2 <- Q1 <- Q0 <- SER_IN
                        self.ser_out = self.bits[3];
                        self.bits.rotate_right(1);
                        self.bits[0] = incoming;
                    }
                    State::Zero => {
                        // shift right: Q0 <- Q1 <- Q2 <- Q3 <- SER_IN
                        self.ser_out = self.bits[0];
                        self.bits.rotate_left(1);
                        self.bits[3] = incoming;
                    }
                    _ => {}
                }
            }
        }
        self.pins.outputs[..4].clone_from_slice(&self.bits);
        self.pins.outputs[4] = self.ser_out;
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
        self.bits = [State::Zero; 4];
        self.ser_out = State::Zero;
        self.pins.outputs.fill(State::Zero);
    }

    fn internal_state(&self) -> Option<serde_json::Value> {
        Some(json!({
            "bits": bits_to_json(&self.bits),
            "ser_out": self.ser_out.to_u8(),
        }))
    }

    fn restore_internal(&mut self, state: &serde_json::Value) {
        if let Some(bits) = state.get("bits").and_then(bits_from_json) {
            if bits.len() == 4 {
                self.bits.clone_from_slice(&bits);
            }
        }
        if let Some(s) = state.get("ser_out").and_then(|v| v.as_u64()) {
            self.ser_out = State::from_u8(s as u8);
        }
        self.pins.outputs[..4].clone_from_slice(&self.bits);
        self.pins.outputs[4] = self.ser_out;
    }
}

/// 4-bit synchronous up/down counter. Inputs
/// `(CLK, CLR, EN, LOAD, UP_DOWN, D0..D3)`, outputs `(Q0..Q3, CARRY)`.
/// Priority on a rising edge: CLR, then LOAD, then counting while enabled.
/// CARRY pulses high on wraparound (up) or underflow (down).
pub struct Counter4 {
    id: GateId,
    pins: Pins,
    value: u8,
    carry: State,
}

impl Counter4 {
    const CLK: usize = 0;
    const CLR: usize = 1;
    const EN: usize = 2;
    const LOAD: usize = 3;
    const UP_DOWN: usize = 4;
    const DATA: usize = 5;

    pub fn new(id: GateId) -> Self {
        let mut pins = Pins::new(9, 5);
        pins.outputs.fill(State::Zero);
        Self {
            id,
            pins,
            value: 0,
            carry: State::Zero,
        }
    }
}

impl Component for Counter4 {
    forward_pins!();

    fn kind(&self) -> &'static str {
        "COUNTER_4BIT"
    }

    fn evaluate(&mut self, _time: SimTime) -> EvalResult {
        if self.pins.rising(Self::CLK) {
            if self.pins.inputs[Self::CLR] == State::One {
                self.value = 0;
                self.carry = State::Zero;
            } else if self.pins.inputs[Self::LOAD] == State::One {
                let data = &self.pins.inputs[Self::DATA..Self::DATA + 4];
                if let Some(loaded) = crate::state::decode_word(data) {
                    self.value = loaded as u8;
                    self.carry = State::Zero;
                }
            } else if self.pins.inputs[Self::EN] == State::One {
                match self.pins.inputs[Self::UP_DOWN] {
                    State::One => {
                        self.value = (self.value + 1) % 16;
                        self.carry = State::from_bool(self.value == 0);
                    }
                    State::Zero => {
                        self.value = self.value.checked_sub(1).unwrap_or(15);
                        self.carry = State::from_bool(self.value == 15);
                    }
                    _ => {}
                }
            }
        }
        let bits = crate::state::encode_word(self.value as usize, 4);
        self.pins.outputs[..4].clone_from_slice(&bits);
        self.pins.outputs[4] = self.carry;
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
        self.value = 0;
        self.carry = State::Zero;
        self.pins.outputs.fill(State::Zero);
    }

    fn internal_state(&self) -> Option<serde_json::Value> {
        Some(json!({
            "value": self.value,
            "carry": self.carry.to_u8(),
        }))
    }

    fn restore_internal(&mut self, state: &serde_json::Value) {
        if let Some(v) = state.get("value").and_then(|v| v.as_u64()) {
            self.value = (v % 16) as u8;
        }
        if let Some(c) = state.get("carry").and_then(|v| v.as_u64()) {
            self.carry = State::from_u8(c as u8);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{decode_word, encode_word};

    fn cycle(gate: &mut dyn Component, inputs: &[State]) -> Vec<State> {
        for (i, &s) in inputs.iter().enumerate() {
            gate.set_input(i, s);
        }
        let outputs = gate.evaluate(0).outputs;
        gate.latch_inputs();
        outputs
    }

    fn register_inputs(data: usize, clk: State, clr: State, load: State) -> Vec<State> {
        let mut inputs = encode_word(data, 4);
        inputs.extend([clk, clr, load]);
        inputs
    }

    #[test]
    fn test_register_load_and_hold() {
        let mut reg = Register::new("r".into(), 4);

        cycle(&mut reg, &register_inputs(11, State::Zero, State::Zero, State::One));
        let out = cycle(&mut reg, &register_inputs(11, State::One, State::Zero, State::One));
        assert_eq!(decode_word(&out), Some(11));

        // load deasserted: next edge holds
        cycle(&mut reg, &register_inputs(5, State::Zero, State::Zero, State::Zero));
        let out = cycle(&mut reg, &register_inputs(5, State::One, State::Zero, State::Zero));
        assert_eq!(decode_word(&out), Some(11));
    }

    #[test]
    fn test_register_clear_wins_over_load() {
        let mut reg = Register::new("r".into(), 8);
        cycle(&mut reg, &{
            let mut v = encode_word(200, 8);
            v.extend([State::Zero, State::Zero, State::One]);
            v
        });
        let out = cycle(&mut reg, &{
            let mut v = encode_word(200, 8);
            v.extend([State::One, State::One, State::One]);
            v
        });
        assert_eq!(decode_word(&out), Some(0));
    }

    fn shift_inputs(ser_in: State, clk: State, dir: State) -> Vec<State> {
        vec![ser_in, clk, State::Zero, State::One, dir]
    }

    #[test]
    fn test_shift_left() {
        let mut sr = ShiftRegister4::new("s".into());

        cycle(&mut sr, &shift_inputs(State::One, State::Zero, State::One));
        let out = cycle(&mut sr, &shift_inputs(State::One, State::One, State::One));
        // one shifted into Q0
        assert_eq!(decode_word(&out[..4]), Some(1));
        assert_eq!(out[4], State::Zero);

        cycle(&mut sr, &shift_inputs(State::Zero, State::Zero, State::One));
        let out = cycle(&mut sr, &shift_inputs(State::Zero, State::One, State::One));
        assert_eq!(decode_word(&out[..4]), Some(2));
    }

    #[test]
    fn test_shift_right_and_ser_out() {
        let mut sr = ShiftRegister4::new("s".into());
        // preload 0b0001 by shifting left once
        cycle(&mut sr, &shift_inputs(State::One, State::Zero, State::One));
        cycle(&mut sr, &shift_inputs(State::One, State::One, State::One));

        // shift right: Q0 leaves through SER_OUT
        cycle(&mut sr, &shift_inputs(State::Zero, State::Zero, State::Zero));
        let out = cycle(&mut sr, &shift_inputs(State::Zero, State::One, State::Zero));
        assert_eq!(decode_word(&out[..4]), Some(0));
        assert_eq!(out[4], State::One);
    }

    fn counter_inputs(clk: State, clr: State, en: State, load: State, up: State, data: usize) -> Vec<State> {
        let mut inputs = vec![clk, clr, en, load, up];
        inputs.extend(encode_word(data, 4));
        inputs
    }

    #[test]
    fn test_counter_counts_up_with_carry() {
        let mut ctr = Counter4::new("c".into());

        for expected in 1..=16u32 {
            cycle(
                &mut ctr,
                &counter_inputs(State::Zero, State::Zero, State::One, State::Zero, State::One, 0),
            );
            let out = cycle(
                &mut ctr,
                &counter_inputs(State::One, State::Zero, State::One, State::Zero, State::One, 0),
            );
            let value = decode_word(&out[..4]).unwrap() as u32;
            assert_eq!(value, expected % 16);
            // carry only on the wrap from 15 to 0
            assert_eq!(out[4], State::from_bool(expected == 16));
        }
    }

    #[test]
    fn test_counter_down_underflow() {
        let mut ctr = Counter4::new("c".into());
        cycle(
            &mut ctr,
            &counter_inputs(State::Zero, State::Zero, State::One, State::Zero, State::Zero, 0),
        );
        let out = cycle(
            &mut ctr,
            &counter_inputs(State::One, State::Zero, State::One, State::Zero, State::Zero, 0),
        );
        assert_eq!(decode_word(&out[..4]), Some(15));
        assert_eq!(out[4], State::One);
    }

    #[test]
    fn test_counter_load_then_clear() {
        let mut ctr = Counter4::new("c".into());
        cycle(
            &mut ctr,
            &counter_inputs(State::Zero, State::Zero, State::Zero, State::One, State::One, 9),
        );
        let out = cycle(
            &mut ctr,
            &counter_inputs(State::One, State::Zero, State::Zero, State::One, State::One, 9),
        );
        assert_eq!(decode_word(&out[..4]), Some(9));

        cycle(
            &mut ctr,
            &counter_inputs(State::Zero, State::One, State::Zero, State::One, State::One, 9),
        );
        let out = cycle(
            &mut ctr,
            &counter_inputs(State::One, State::One, State::Zero, State::One, State::One, 9),
        );
        assert_eq!(decode_word(&out[..4]), Some(0));
    }

    #[test]
    fn test_counter_invalid_direction_holds() {
        let mut ctr = Counter4::new("c".into());
        cycle(
            &mut ctr,
            &counter_inputs(State::Zero, State::Zero, State::One, State::Zero, State::Unknown, 0),
        );
        let out = cycle(
            &mut ctr,
            &counter_inputs(State::One, State::Zero, State::One, State::Zero, State::Unknown, 0),
        );
        assert_eq!(decode_word(&out[..4]), Some(0));
    }
}
