//! Fixed-width combinational building blocks: multiplexers, decoders,
//! encoders, adders, and comparators.
//!
//! Data inputs come first, then select/address bits LSB-first, then any
//! enable or cascade inputs. Any invalid select or operand degrades the
//! affected outputs to `Unknown` per the algebra's error rules.

use crate::component::{forward_pins, Component, EvalResult, Pins};
use crate::state::{decode_word, State};
use crate::types::{GateId, SimTime};

/// N-to-1 multiplexer: `2^select_bits` data inputs followed by the select
/// bits, one output.
pub struct Mux {
    id: GateId,
    pins: Pins,
    select_bits: usize,
}

impl Mux {
    pub fn new(id: GateId, select_bits: usize) -> Self {
        let data_count = 1 << select_bits;
        Self {
            id,
            pins: Pins::new(data_count + select_bits, 1),
            select_bits,
        }
    }

    fn data_count(&self) -> usize {
        1 << self.select_bits
    }
}

impl Component for Mux {
    forward_pins!();

    fn reset(&mut self) {
        self.pins.reset();
    }

    fn kind(&self) -> &'static str {
        match self.select_bits {
            1 => "MUX_2TO1",
            2 => "MUX_4TO1",
            _ => "MUX_8TO1",
        }
    }

    fn evaluate(&mut self, _time: SimTime) -> EvalResult {
        let data_count = self.data_count();
        let selects = &self.pins.inputs[data_count..];
        self.pins.outputs[0] = match decode_word(selects) {
            Some(index) => self.pins.inputs[index],
            None => State::Unknown,
        };
        EvalResult {
            outputs: self.pins.outputs.clone(),
            delay: 1,
        }
    }
}

/// 1-to-N demultiplexer: data input followed by select bits; the addressed
/// output carries the data, the rest are driven low.
pub struct Demux {
    id: GateId,
    pins: Pins,
    select_bits: usize,
}

impl Demux {
    pub fn new(id: GateId, select_bits: usize) -> Self {
        Self {
            id,
            pins: Pins::new(1 + select_bits, 1 << select_bits),
            select_bits,
        }
    }
}

impl Component for Demux {
    forward_pins!();

    fn reset(&mut self) {
        self.pins.reset();
    }

    fn kind(&self) -> &'static str {
        match self.select_bits {
            1 => "DEMUX_1TO2",
            _ => "DEMUX_1TO4",
        }
    }

    fn evaluate(&mut self, _time: SimTime) -> EvalResult {
        let data = self.pins.inputs[0];
        match decode_word(&self.pins.inputs[1..]) {
            Some(index) => {
                for (i, out) in self.pins.outputs.iter_mut().enumerate() {
                    *out = if i == index { data } else { State::Zero };
                }
            }
            None => self.pins.outputs.fill(State::Unknown),
        }
        EvalResult {
            outputs: self.pins.outputs.clone(),
            delay: 1,
        }
    }
}

/// Address decoder with enable: address bits LSB-first, then enable.
/// Enabled, exactly the addressed output goes high; disabled, all low.
pub struct Decoder {
    id: GateId,
    pins: Pins,
    address_bits: usize,
}

impl Decoder {
    pub fn new(id: GateId, address_bits: usize) -> Self {
        Self {
            id,
            pins: Pins::new(address_bits + 1, 1 << address_bits),
            address_bits,
        }
    }
}

impl Component for Decoder {
    forward_pins!();

    fn reset(&mut self) {
        self.pins.reset();
    }

    fn kind(&self) -> &'static str {
        match self.address_bits {
            2 => "DECODER_2TO4",
            _ => "DECODER_3TO8",
        }
    }

    fn evaluate(&mut self, _time: SimTime) -> EvalResult {
        let enable = self.pins.inputs[self.address_bits];
        let address = decode_word(&self.pins.inputs[..self.address_bits]);

        match (enable, address) {
            (State::Zero, _) => self.pins.outputs.fill(State::Zero),
            (State::One, Some(index)) => {
                for (i, out) in self.pins.outputs.iter_mut().enumerate() {
                    *out = State::from_bool(i == index);
                }
            }
            _ => self.pins.outputs.fill(State::Unknown),
        }
        EvalResult {
            outputs: self.pins.outputs.clone(),
            delay: 1,
        }
    }
}

/// Priority encoder: the highest-index high input wins. Outputs the binary
/// index plus a `Valid` line that is high iff any input is high.
pub struct Encoder {
    id: GateId,
    pins: Pins,
    index_bits: usize,
}

impl Encoder {
    pub fn new(id: GateId, index_bits: usize) -> Self {
        Self {
            id,
            pins: Pins::new(1 << index_bits, index_bits + 1),
            index_bits,
        }
    }
}

impl Component for Encoder {
    forward_pins!();

    fn reset(&mut self) {
        self.pins.reset();
    }

    fn kind(&self) -> &'static str {
        match self.index_bits {
            2 => "ENCODER_4TO2",
            _ => "ENCODER_8TO3",
        }
    }

    fn evaluate(&mut self, _time: SimTime) -> EvalResult {
        if self.pins.inputs.iter().any(|s| !s.is_valid()) {
            self.pins.outputs.fill(State::Unknown);
        } else {
            let winner = self
                .pins
                .inputs
                .iter()
                .rposition(|&s| s == State::One);
            let index = winner.unwrap_or(0);
            for bit in 0..self.index_bits {
                self.pins.outputs[bit] = State::from_bool(index & (1 << bit) != 0);
            }
            self.pins.outputs[self.index_bits] = State::from_bool(winner.is_some());
        }
        EvalResult {
            outputs: self.pins.outputs.clone(),
            delay: 1,
        }
    }
}

/// Single-bit full adder: inputs `(A, B, Cin)`, outputs `(Sum, Cout)`.
pub struct FullAdder {
    id: GateId,
    pins: Pins,
}

impl FullAdder {
    pub fn new(id: GateId) -> Self {
        Self {
            id,
            pins: Pins::new(3, 2),
        }
    }
}

/// One full-adder stage over the algebra; errors propagate bitwise.
fn full_add(a: State, b: State, cin: State) -> (State, State) {
    let half = a.xor(b);
    let sum = half.xor(cin);
    let cout = a.and(b).or(cin.and(half));
    (sum, cout)
}

impl Component for FullAdder {
    forward_pins!();

    fn reset(&mut self) {
        self.pins.reset();
    }

    fn kind(&self) -> &'static str {
        "FULL_ADDER"
    }

    fn evaluate(&mut self, _time: SimTime) -> EvalResult {
        let (sum, cout) = full_add(
            self.pins.inputs[0],
            self.pins.inputs[1],
            self.pins.inputs[2],
        );
        self.pins.outputs[0] = sum;
        self.pins.outputs[1] = cout;
        EvalResult {
            outputs: self.pins.outputs.clone(),
            delay: 1,
        }
    }
}

/// 4-bit ripple-carry adder: inputs `(A0..A3, B0..B3, Cin)`, outputs
/// `(S0..S3, Cout, Overflow)`. Overflow is the XOR of the carries into and
/// out of the sign bit.
pub struct RippleAdder4 {
    id: GateId,
    pins: Pins,
}

impl RippleAdder4 {
    pub fn new(id: GateId) -> Self {
        Self {
            id,
            pins: Pins::new(9, 6),
        }
    }
}

impl Component for RippleAdder4 {
    forward_pins!();

    fn reset(&mut self) {
        self.pins.reset();
    }

    fn kind(&self) -> &'static str {
        "ADDER_4BIT"
    }

    fn evaluate(&mut self, _time: SimTime) -> EvalResult {
        let mut carry = self.pins.inputs[8];
        let mut carry_into_msb = State::Unknown;
        for bit in 0..4 {
            if bit == 3 {
                carry_into_msb = carry;
            }
            let (sum, cout) = full_add(self.pins.inputs[bit], self.pins.inputs[4 + bit], carry);
            self.pins.outputs[bit] = sum;
            carry = cout;
        }
        self.pins.outputs[4] = carry;
        self.pins.outputs[5] = carry_into_msb.xor(carry);
        EvalResult {
            outputs: self.pins.outputs.clone(),
            delay: 1,
        }
    }
}

/// Cascadable 1-bit magnitude comparator: inputs
/// `(A, B, GTin, EQin, LTin)`, outputs `(GT, EQ, LT)`.
pub struct Comparator1 {
    id: GateId,
    pins: Pins,
}

impl Comparator1 {
    pub fn new(id: GateId) -> Self {
        Self {
            id,
            pins: Pins::new(5, 3),
        }
    }
}

/// Shared decision step: `difference` is `Some(a_greater)` when the
/// operands differ, `None` when equal (cascade passes through).
fn drive_comparison(outputs: &mut [State], difference: Option<bool>, cascade: &[State]) {
    match difference {
        Some(greater) => {
            outputs[0] = State::from_bool(greater);
            outputs[1] = State::Zero;
            outputs[2] = State::from_bool(!greater);
        }
        None => outputs.copy_from_slice(cascade),
    }
}

impl Component for Comparator1 {
    forward_pins!();

    fn reset(&mut self) {
        self.pins.reset();
    }

    fn kind(&self) -> &'static str {
        "COMPARATOR_1BIT"
    }

    fn evaluate(&mut self, _time: SimTime) -> EvalResult {
        let a = self.pins.inputs[0];
        let b = self.pins.inputs[1];
        if !a.is_valid() || !b.is_valid() {
            self.pins.outputs.fill(State::Unknown);
        } else {
            let difference = (a != b).then(|| a == State::One);
            let cascade = [
                self.pins.inputs[2],
                self.pins.inputs[3],
                self.pins.inputs[4],
            ];
            drive_comparison(&mut self.pins.outputs, difference, &cascade);
        }
        EvalResult {
            outputs: self.pins.outputs.clone(),
            delay: 1,
        }
    }
}

/// Cascadable 4-bit magnitude comparator: inputs
/// `(A0..A3, B0..B3, GTin, EQin, LTin)`, outputs `(GT, EQ, LT)`. The first
/// differing bit from the MSB down decides.
pub struct Comparator4 {
    id: GateId,
    pins: Pins,
}

impl Comparator4 {
    pub fn new(id: GateId) -> Self {
        Self {
            id,
            pins: Pins::new(11, 3),
        }
    }
}

impl Component for Comparator4 {
    forward_pins!();

    fn reset(&mut self) {
        self.pins.reset();
    }

    fn kind(&self) -> &'static str {
        "COMPARATOR_4BIT"
    }

    fn evaluate(&mut self, _time: SimTime) -> EvalResult {
        let (a, rest) = self.pins.inputs.split_at(4);
        let (b, cascade) = rest.split_at(4);

        if a.iter().chain(b).any(|s| !s.is_valid()) {
            self.pins.outputs.fill(State::Unknown);
        } else {
            let difference = (0..4)
                .rev()
                .find(|&bit| a[bit] != b[bit])
                .map(|bit| a[bit] == State::One);
            let cascade = [cascade[0], cascade[1], cascade[2]];
            drive_comparison(&mut self.pins.outputs, difference, &cascade);
        }
        EvalResult {
            outputs: self.pins.outputs.clone(),
            delay: 1,
        }
    }
}
