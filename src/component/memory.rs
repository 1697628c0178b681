//! Memory components: 16-word RAM (asynchronous read, synchronous write)
//! and 16-word ROM. Both come in 4- and 8-bit data widths.

use std::collections::BTreeMap;

use serde_json::json;

use crate::component::{forward_pins, Component, EvalResult, Pins};
use crate::state::{decode_word, State};
use crate::types::{GateId, SimTime};

/// Sparse word store keyed by address. A `BTreeMap` keeps serialization
/// and iteration order deterministic. Never-written cells read as zero.
pub type MemoryMap = BTreeMap<u8, Vec<State>>;

const ADDRESS_BITS: usize = 4;

fn capture(data: State) -> State {
    match data {
        State::Zero | State::One => data,
        State::Conflict => State::Conflict,
        State::HiZ | State::Unknown => State::Unknown,
    }
}

/// Reads a word from the store, padding short or missing words with zeros.
fn read_word(memory: &MemoryMap, address: u8, width: usize) -> Vec<State> {
    let mut word = vec![State::Zero; width];
    if let Some(stored) = memory.get(&address) {
        for (i, &bit) in stored.iter().take(width).enumerate() {
            word[i] = bit;
        }
    }
    word
}

fn memory_to_json(memory: &MemoryMap) -> serde_json::Value {
    serde_json::to_value(memory).unwrap_or(serde_json::Value::Null)
}

fn memory_from_json(value: &serde_json::Value) -> Option<MemoryMap> {
    serde_json::from_value(value.clone()).ok()
}

/// 16-word RAM. Inputs `(A0..A3, DIN0..DINn-1, WE, CLK)`, outputs the word
/// at the current address.
///
/// Reads are asynchronous: every evaluation drives the addressed word (or
/// `Unknown` on an invalid address). Writes land on the rising clock edge
/// when WE is high and the address is valid; the read in the same
/// evaluation observes the freshly written word.
pub struct Ram {
    id: GateId,
    pins: Pins,
    data_bits: usize,
    memory: MemoryMap,
}

impl Ram {
    pub fn new(id: GateId, data_bits: usize) -> Self {
        Self {
            id,
            pins: Pins::new(ADDRESS_BITS + data_bits + 2, data_bits),
            data_bits,
            memory: MemoryMap::new(),
        }
    }

    fn we_index(&self) -> usize {
        ADDRESS_BITS + self.data_bits
    }

    fn clk_index(&self) -> usize {
        ADDRESS_BITS + self.data_bits + 1
    }

    fn address(&self) -> Option<u8> {
        decode_word(&self.pins.inputs[..ADDRESS_BITS]).map(|a| a as u8)
    }
}

impl Component for Ram {
    forward_pins!();

    fn kind(&self) -> &'static str {
        if self.data_bits == 8 {
            "RAM_16X8"
        } else {
            "RAM_16X4"
        }
    }

    fn evaluate(&mut self, _time: SimTime) -> EvalResult {
        let address = self.address();

        if self.pins.rising(self.clk_index())
            && self.pins.inputs[self.we_index()] == State::One
        {
            if let Some(address) = address {
                let word: Vec<State> = self.pins.inputs
                    [ADDRESS_BITS..ADDRESS_BITS + self.data_bits]
                    .iter()
                    .map(|&bit| capture(bit))
                    .collect();
                self.memory.insert(address, word);
            }
        }

        match address {
            Some(address) => {
                let word = read_word(&self.memory, address, self.data_bits);
                self.pins.outputs.clone_from_slice(&word);
            }
            None => self.pins.outputs.fill(State::Unknown),
        }
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
        self.memory.clear();
    }

    fn internal_state(&self) -> Option<serde_json::Value> {
        Some(json!({ "memory": memory_to_json(&self.memory) }))
    }

    fn restore_internal(&mut self, state: &serde_json::Value) {
        if let Some(memory) = state.get("memory").and_then(memory_from_json) {
            self.memory = memory;
        }
    }

    fn set_memory(&mut self, memory: MemoryMap) {
        self.memory = memory;
    }
}

/// 16-word ROM. Inputs `(A0..A3, EN)`, outputs the stored word while
/// enabled, `HiZ` while disabled.
///
/// Contents are seeded at construction (descriptor internal state) and
/// survive `reset`; it is the one component whose memory does.
pub struct Rom {
    id: GateId,
    pins: Pins,
    data_bits: usize,
    memory: MemoryMap,
}

impl Rom {
    const EN: usize = ADDRESS_BITS;

    pub fn new(id: GateId, data_bits: usize) -> Self {
        Self {
            id,
            pins: Pins::new(ADDRESS_BITS + 1, data_bits),
            data_bits,
            memory: MemoryMap::new(),
        }
    }
}

impl Component for Rom {
    forward_pins!();

    fn kind(&self) -> &'static str {
        if self.data_bits == 8 {
            "ROM_16X8"
        } else {
            "ROM_16X4"
        }
    }

    fn evaluate(&mut self, _time: SimTime) -> EvalResult {
        let address = decode_word(&self.pins.inputs[..ADDRESS_BITS]);
        match (self.pins.inputs[Self::EN], address) {
            (State::Zero, _) => self.pins.outputs.fill(State::HiZ),
            (State::One, Some(address)) => {
                let word = read_word(&self.memory, address as u8, self.data_bits);
                self.pins.outputs.clone_from_slice(&word);
            }
            _ => self.pins.outputs.fill(State::Unknown),
        }
        EvalResult {
            outputs: self.pins.outputs.clone(),
            delay: 1,
        }
    }

    fn reset(&mut self) {
        // ROM memory persists across reset
        self.pins.reset();
    }

    fn internal_state(&self) -> Option<serde_json::Value> {
        Some(json!({ "memory": memory_to_json(&self.memory) }))
    }

    fn restore_internal(&mut self, state: &serde_json::Value) {
        if let Some(memory) = state.get("memory").and_then(memory_from_json) {
            self.memory = memory;
        }
    }

    fn set_memory(&mut self, memory: MemoryMap) {
        self.memory = memory;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::encode_word;

    fn cycle(gate: &mut dyn Component, inputs: &[State]) -> Vec<State> {
        for (i, &s) in inputs.iter().enumerate() {
            gate.set_input(i, s);
        }
        let outputs = gate.evaluate(0).outputs;
        gate.latch_inputs();
        outputs
    }

    fn ram_inputs(address: usize, data: usize, we: State, clk: State) -> Vec<State> {
        let mut inputs = encode_word(address, 4);
        inputs.extend(encode_word(data, 4));
        inputs.extend([we, clk]);
        inputs
    }

    #[test]
    fn test_ram_write_then_read() {
        let mut ram = Ram::new("ram".into(), 4);

        // address 5, data 10, write enabled, rising clock
        cycle(&mut ram, &ram_inputs(5, 10, State::One, State::Zero));
        let out = cycle(&mut ram, &ram_inputs(5, 10, State::One, State::One));
        assert_eq!(out, encode_word(10, 4));

        // write disabled: data input changes don't land
        cycle(&mut ram, &ram_inputs(5, 3, State::Zero, State::Zero));
        let out = cycle(&mut ram, &ram_inputs(5, 3, State::Zero, State::One));
        assert_eq!(out, encode_word(10, 4));
    }

    #[test]
    fn test_ram_unwritten_reads_zero() {
        let mut ram = Ram::new("ram".into(), 8);
        let out = cycle(&mut ram, &{
            let mut v = encode_word(7, 4);
            v.extend(encode_word(0, 8));
            v.extend([State::Zero, State::Zero]);
            v
        });
        assert_eq!(out, encode_word(0, 8));
    }

    #[test]
    fn test_ram_invalid_address() {
        let mut ram = Ram::new("ram".into(), 4);
        let mut inputs = vec![State::One, State::HiZ, State::Zero, State::Zero];
        inputs.extend(encode_word(0, 4));
        inputs.extend([State::Zero, State::Zero]);
        let out = cycle(&mut ram, &inputs);
        assert_eq!(out, vec![State::Unknown; 4]);
    }

    #[test]
    fn test_ram_reset_clears_memory() {
        let mut ram = Ram::new("ram".into(), 4);
        cycle(&mut ram, &ram_inputs(2, 15, State::One, State::Zero));
        cycle(&mut ram, &ram_inputs(2, 15, State::One, State::One));

        ram.reset();
        let out = cycle(&mut ram, &ram_inputs(2, 0, State::Zero, State::Zero));
        assert_eq!(out, encode_word(0, 4));
    }

    fn rom_inputs(address: usize, en: State) -> Vec<State> {
        let mut inputs = encode_word(address, 4);
        inputs.push(en);
        inputs
    }

    #[test]
    fn test_rom_read_and_hi_z() {
        let mut rom = Rom::new("rom".into(), 4);
        let mut memory = MemoryMap::new();
        memory.insert(3, encode_word(12, 4));
        rom.set_memory(memory);

        let out = cycle(&mut rom, &rom_inputs(3, State::One));
        assert_eq!(out, encode_word(12, 4));

        // disabled: bus released
        let out = cycle(&mut rom, &rom_inputs(3, State::Zero));
        assert_eq!(out, vec![State::HiZ; 4]);

        // indeterminate enable
        let out = cycle(&mut rom, &rom_inputs(3, State::Unknown));
        assert_eq!(out, vec![State::Unknown; 4]);
    }

    #[test]
    fn test_rom_memory_survives_reset() {
        let mut rom = Rom::new("rom".into(), 4);
        let mut memory = MemoryMap::new();
        memory.insert(0, encode_word(9, 4));
        rom.set_memory(memory);

        rom.reset();
        let out = cycle(&mut rom, &rom_inputs(0, State::One));
        assert_eq!(out, encode_word(9, 4));
    }

    #[test]
    fn test_memory_internal_state_roundtrip() {
        let mut ram = Ram::new("ram".into(), 4);
        cycle(&mut ram, &ram_inputs(1, 6, State::One, State::Zero));
        cycle(&mut ram, &ram_inputs(1, 6, State::One, State::One));

        let snap = ram.internal_state().unwrap();
        let mut restored = Ram::new("ram".into(), 4);
        restored.restore_internal(&snap);
        let out = cycle(&mut restored, &ram_inputs(1, 0, State::Zero, State::Zero));
        assert_eq!(out, encode_word(6, 4));
    }
}
