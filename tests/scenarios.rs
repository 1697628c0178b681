//! End-to-end circuit scenarios: small netlists driven through the public
//! kernel surface, checked against their expected steady states.

use strobe::engine::SimulationEngine;
use strobe::netlist::{GateState, WireState};
use strobe::state::{decode_word, State};

fn engine_with(gates: Vec<GateState>, wires: Vec<WireState>) -> SimulationEngine {
    let mut engine = SimulationEngine::new();
    engine.initialize(gates, wires).unwrap();
    engine
}

fn output(engine: &SimulationEngine, id: &str, port: usize) -> State {
    engine.gate(id).unwrap().outputs()[port]
}

fn input(engine: &SimulationEngine, id: &str, port: usize) -> State {
    engine.gate(id).unwrap().inputs()[port]
}

// ---------------------------------------------------------------------
// E1: NOT propagation
// ---------------------------------------------------------------------

#[test]
fn not_chain_follows_the_switch() {
    let mut engine = engine_with(
        vec![
            GateState::new("t", "TOGGLE"),
            GateState::new("n", "NOT"),
            GateState::new("l", "LED"),
        ],
        vec![
            WireState::new("w1", "t", 0, "n", 0),
            WireState::new("w2", "n", 0, "l", 0),
        ],
    );

    engine.step(10);
    assert_eq!(output(&engine, "n", 0), State::One);
    assert_eq!(input(&engine, "l", 0), State::One);

    engine.toggle("t").unwrap();
    engine.step(10);
    assert_eq!(output(&engine, "n", 0), State::Zero);
    assert_eq!(input(&engine, "l", 0), State::Zero);
}

// ---------------------------------------------------------------------
// E2: 2-input AND truth table
// ---------------------------------------------------------------------

#[test]
fn and_gate_truth_table_end_to_end() {
    let mut engine = engine_with(
        vec![
            GateState::new("t1", "TOGGLE"),
            GateState::new("t2", "TOGGLE"),
            GateState::new("a", "AND"),
        ],
        vec![
            WireState::new("w1", "t1", 0, "a", 0),
            WireState::new("w2", "t2", 0, "a", 1),
        ],
    );

    let mut set = |engine: &mut SimulationEngine, v1: State, v2: State| {
        engine.set_input("t1", v1).unwrap();
        engine.set_input("t2", v2).unwrap();
        engine.step(10);
    };

    set(&mut engine, State::Zero, State::Zero);
    assert_eq!(output(&engine, "a", 0), State::Zero);
    set(&mut engine, State::One, State::Zero);
    assert_eq!(output(&engine, "a", 0), State::Zero);
    set(&mut engine, State::Zero, State::One);
    assert_eq!(output(&engine, "a", 0), State::Zero);
    set(&mut engine, State::One, State::One);
    assert_eq!(output(&engine, "a", 0), State::One);
}

// ---------------------------------------------------------------------
// E3: D flip-flop capture
// ---------------------------------------------------------------------

#[test]
fn d_flip_flop_captures_on_clock_edges() {
    let mut engine = engine_with(
        vec![
            GateState::new("d", "TOGGLE"),
            GateState::new("clk", "CLOCK")
                .with_attr("period", "4")
                .with_attr("duty_cycle", "0.5"),
            GateState::new("ff", "D_FLIPFLOP"),
        ],
        vec![
            WireState::new("wd", "d", 0, "ff", 0),
            WireState::new("wc", "clk", 0, "ff", 1),
        ],
    );

    // D high before the first clock edge
    engine.set_input("d", State::One).unwrap();
    engine.step(2);
    assert_eq!(output(&engine, "ff", 0), State::One, "first rising edge captures D");
    assert_eq!(output(&engine, "ff", 1), State::Zero);

    // drop D mid-phase: Q holds through the high phase and the fall
    engine.set_input("d", State::Zero).unwrap();
    engine.step(1);
    assert_eq!(output(&engine, "ff", 0), State::One, "Q holds until the next edge");

    // next rising edge (t=4) captures the new D
    engine.step(6);
    assert_eq!(output(&engine, "ff", 0), State::Zero);
    assert_eq!(output(&engine, "ff", 1), State::One);
}

// ---------------------------------------------------------------------
// E4: tri-state bus conflict
// ---------------------------------------------------------------------

#[test]
fn tri_state_bus_conflict_and_release() {
    let mut engine = engine_with(
        vec![
            GateState::new("da", "TOGGLE"),
            GateState::new("db", "TOGGLE"),
            GateState::new("ea", "TOGGLE"),
            GateState::new("eb", "TOGGLE"),
            GateState::new("ba", "TRI_BUFFER"),
            GateState::new("bb", "TRI_BUFFER"),
            GateState::new("bus", "LED"),
        ],
        vec![
            WireState::new("w1", "da", 0, "ba", 0),
            WireState::new("w2", "ea", 0, "ba", 1),
            WireState::new("w3", "db", 0, "bb", 0),
            WireState::new("w4", "eb", 0, "bb", 1),
            // both buffers drive the same input port: a multi-driver net
            WireState::new("w5", "ba", 0, "bus", 0),
            WireState::new("w6", "bb", 0, "bus", 0),
        ],
    );

    // da=1, db=0, both enabled: contention
    engine.set_input("da", State::One).unwrap();
    engine.set_input("ea", State::One).unwrap();
    engine.set_input("eb", State::One).unwrap();
    engine.step(10);
    assert_eq!(input(&engine, "bus", 0), State::Conflict);

    // disable the zero-driver: the bus follows the remaining driver
    engine.set_input("eb", State::Zero).unwrap();
    engine.step(10);
    assert_eq!(output(&engine, "bb", 0), State::HiZ);
    assert_eq!(input(&engine, "bus", 0), State::One);
}

// ---------------------------------------------------------------------
// E5: ripple counter
// ---------------------------------------------------------------------

#[test]
fn counter_wraps_with_a_single_carry() {
    let mut engine = engine_with(
        vec![
            GateState::new("clk", "CLOCK").with_attr("period", "2"),
            GateState::new("hi", "TOGGLE"),
            GateState::new("lo", "TOGGLE"),
            GateState::new("ctr", "COUNTER_4BIT"),
        ],
        vec![
            WireState::new("wc", "clk", 0, "ctr", 0),
            WireState::new("wclr", "lo", 0, "ctr", 1),
            WireState::new("wen", "hi", 0, "ctr", 2),
            WireState::new("wload", "lo", 0, "ctr", 3),
            WireState::new("wup", "hi", 0, "ctr", 4),
        ],
    );
    engine.set_input("hi", State::One).unwrap();

    let mut carry_rises = 0;
    let mut previous_carry = State::Zero;
    let mut value_at_rise = None;
    for _ in 0..40 {
        engine.step(1);
        let outputs = engine.gate("ctr").unwrap().outputs();
        let carry = outputs[4];
        if previous_carry == State::Zero && carry == State::One {
            carry_rises += 1;
            value_at_rise = decode_word(&outputs[..4]);
        }
        previous_carry = carry;
    }

    assert_eq!(carry_rises, 1, "exactly one wraparound in 40 ticks");
    assert_eq!(value_at_rise, Some(0), "carry asserts at the wrap to zero");
}

// ---------------------------------------------------------------------
// E6: RAM write/read round-trip
// ---------------------------------------------------------------------

#[test]
fn ram_write_read_round_trip() {
    let mut engine = engine_with(
        vec![
            GateState::new("addr", "KEYPAD"),
            GateState::new("data", "KEYPAD"),
            GateState::new("we", "TOGGLE"),
            GateState::new("clk", "TOGGLE"),
            GateState::new("ram", "RAM_16X4"),
        ],
        vec![
            WireState::new("a0", "addr", 0, "ram", 0),
            WireState::new("a1", "addr", 1, "ram", 1),
            WireState::new("a2", "addr", 2, "ram", 2),
            WireState::new("a3", "addr", 3, "ram", 3),
            WireState::new("d0", "data", 0, "ram", 4),
            WireState::new("d1", "data", 1, "ram", 5),
            WireState::new("d2", "data", 2, "ram", 6),
            WireState::new("d3", "data", 3, "ram", 7),
            WireState::new("wwe", "we", 0, "ram", 8),
            WireState::new("wclk", "clk", 0, "ram", 9),
        ],
    );

    // address 5, data 10, WE high, then a manual rising clock edge
    engine.set_keypad_value("addr", 5).unwrap();
    engine.set_keypad_value("data", 10).unwrap();
    engine.set_input("we", State::One).unwrap();
    engine.step(5);
    engine.toggle("clk").unwrap(); // 0 -> 1
    engine.step(5);

    let outputs = engine.gate("ram").unwrap().outputs();
    assert_eq!(decode_word(outputs), Some(10), "write landed, async read sees it");

    // WE low, clock again with different data: the word sticks
    engine.set_input("we", State::Zero).unwrap();
    engine.set_keypad_value("data", 3).unwrap();
    engine.toggle("clk").unwrap(); // 1 -> 0
    engine.step(3);
    engine.toggle("clk").unwrap(); // 0 -> 1
    engine.step(5);
    assert_eq!(
        decode_word(engine.gate("ram").unwrap().outputs()),
        Some(10)
    );

    // async read elsewhere: unwritten cells are zero, then back
    engine.set_keypad_value("addr", 9).unwrap();
    engine.step(5);
    assert_eq!(decode_word(engine.gate("ram").unwrap().outputs()), Some(0));
    engine.set_keypad_value("addr", 5).unwrap();
    engine.step(5);
    assert_eq!(
        decode_word(engine.gate("ram").unwrap().outputs()),
        Some(10)
    );
}

// ---------------------------------------------------------------------
// Extra: pulse button timing
// ---------------------------------------------------------------------

#[test]
fn pulse_goes_high_then_expires() {
    let mut engine = engine_with(
        vec![
            GateState::new("p", "PULSE").with_attr("duration", "3"),
            GateState::new("l", "LED"),
        ],
        vec![WireState::new("w", "p", 0, "l", 0)],
    );
    engine.step(2);
    assert_eq!(input(&engine, "l", 0), State::Zero);

    engine.trigger_pulse("p").unwrap();
    engine.step(2);
    assert_eq!(input(&engine, "l", 0), State::One);

    // after the duration passes the kernel disarms the pulse
    engine.step(6);
    assert_eq!(input(&engine, "l", 0), State::Zero);
}
