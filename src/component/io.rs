//! I/O marker components. They exchange values with the user rather than
//! with the circuit: LEDs and displays observe driven states, the keypad
//! drives its stored value. None of them affect other components.

use serde_json::json;

use crate::component::{forward_pins, Component, EvalResult, Pins};
use crate::state::{decode_word, encode_word, State};
use crate::types::{GateId, SimTime};

/// Single-input indicator. The observed state is whatever the wire
/// resolver last assigned to its input port.
pub struct Led {
    id: GateId,
    pins: Pins,
}

impl Led {
    pub fn new(id: GateId) -> Self {
        Self {
            id,
            pins: Pins::new(1, 0),
        }
    }
}

impl Component for Led {
    forward_pins!();

    fn kind(&self) -> &'static str {
        "LED"
    }

    fn evaluate(&mut self, _time: SimTime) -> EvalResult {
        EvalResult {
            outputs: Vec::new(),
            delay: 0,
        }
    }

    fn reset(&mut self) {
        self.pins.reset();
    }

    fn delay(&self) -> SimTime {
        0
    }
}

/// Numeric display over 4 (one digit) or 8 (two digits) inputs. Decodes
/// its inputs as a little-endian integer for the view layer; invalid bits
/// leave the display blank.
pub struct Display {
    id: GateId,
    pins: Pins,
    width: usize,
    value: Option<u64>,
}

impl Display {
    pub fn new(id: GateId, width: usize) -> Self {
        Self {
            id,
            pins: Pins::new(width, 0),
            width,
            value: None,
        }
    }
}

impl Component for Display {
    forward_pins!();

    fn kind(&self) -> &'static str {
        if self.width == 8 {
            "DISPLAY_2D"
        } else {
            "DISPLAY_1D"
        }
    }

    fn evaluate(&mut self, _time: SimTime) -> EvalResult {
        self.value = decode_word(&self.pins.inputs).map(|v| v as u64);
        EvalResult {
            outputs: Vec::new(),
            delay: 0,
        }
    }

    fn reset(&mut self) {
        self.pins.reset();
        self.value = None;
    }

    fn delay(&self) -> SimTime {
        0
    }

    fn internal_state(&self) -> Option<serde_json::Value> {
        Some(json!({ "value": self.value }))
    }

    fn restore_internal(&mut self, state: &serde_json::Value) {
        if let Some(v) = state.get("value") {
            self.value = v.as_u64();
        }
    }
}

/// Hex keypad: holds a value in `0..=15` and drives its LSB-first binary
/// encoding on four outputs.
pub struct Keypad {
    id: GateId,
    pins: Pins,
    value: u8,
}

impl Keypad {
    pub fn new(id: GateId) -> Self {
        let mut pins = Pins::new(0, 4);
        pins.outputs.fill(State::Zero);
        Self { id, pins, value: 0 }
    }
}

impl Component for Keypad {
    forward_pins!();

    fn kind(&self) -> &'static str {
        "KEYPAD"
    }

    fn evaluate(&mut self, _time: SimTime) -> EvalResult {
        let bits = encode_word(self.value as usize, 4);
        self.pins.outputs.clone_from_slice(&bits);
        EvalResult {
            outputs: self.pins.outputs.clone(),
            delay: 0,
        }
    }

    fn reset(&mut self) {
        self.value = 0;
        self.pins.outputs.fill(State::Zero);
    }

    fn delay(&self) -> SimTime {
        0
    }

    fn internal_state(&self) -> Option<serde_json::Value> {
        Some(json!({ "value": self.value }))
    }

    fn restore_internal(&mut self, state: &serde_json::Value) {
        if let Some(v) = state.get("value").and_then(|v| v.as_u64()) {
            self.value = (v as u8).min(15);
        }
    }

    fn set_keypad_value(&mut self, value: u8) {
        self.value = value.min(15);
    }
}
