//! Source components: the gates that drive signals into a circuit without
//! consuming any. All three have zero delay.

use serde_json::json;

use crate::component::{Component, EvalResult, Pins};
use crate::state::State;
use crate::types::{GateId, SimTime};

/// Manually operated switch. Output follows the stored value; flipped by
/// the `toggle`/`setInput` stimuli.
pub struct Toggle {
    id: GateId,
    pins: Pins,
    value: State,
}

impl Toggle {
    pub fn new(id: GateId) -> Self {
        let mut pins = Pins::new(0, 1);
        pins.outputs[0] = State::Zero;
        Self {
            id,
            pins,
            value: State::Zero,
        }
    }
}

impl Component for Toggle {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "TOGGLE"
    }

    fn input_count(&self) -> usize {
        0
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

    fn set_input(&mut self, _index: usize, _state: State) {}

    fn set_output(&mut self, index: usize, state: State) {
        self.pins.set_output(index, state);
    }

    fn evaluate(&mut self, _time: SimTime) -> EvalResult {
        self.pins.outputs[0] = self.value;
        EvalResult {
            outputs: self.pins.outputs.clone(),
            delay: 0,
        }
    }

    fn reset(&mut self) {
        self.value = State::Zero;
        self.pins.outputs[0] = State::Zero;
    }

    fn delay(&self) -> SimTime {
        0
    }

    fn internal_state(&self) -> Option<serde_json::Value> {
        Some(json!({ "value": self.value.to_u8() }))
    }

    fn restore_internal(&mut self, state: &serde_json::Value) {
        if let Some(v) = state.get("value").and_then(|v| v.as_u64()) {
            self.value = State::from_u8(v as u8);
        }
    }

    fn toggle(&mut self) {
        self.value = if self.value == State::Zero {
            State::One
        } else {
            State::Zero
        };
    }

    fn set_value(&mut self, value: State) {
        if value.is_valid() {
            self.value = value;
        }
    }
}

/// Free-running clock.
///
/// The output at simulated time `t` is ONE iff
/// `t % period < floor(period * duty_cycle)`. The kernel polls
/// [`Component::clock_state_at`] each step and only schedules the clock
/// when the phase actually flips, so a clock whose high interval rounds to
/// zero (e.g. `period = 1`) is effectively constant.
pub struct Clock {
    id: GateId,
    pins: Pins,
    period: SimTime,
    duty_cycle: f64,
}

impl Clock {
    pub const DEFAULT_PERIOD: SimTime = 10;
    pub const DEFAULT_DUTY_CYCLE: f64 = 0.5;

    pub fn new(id: GateId, period: SimTime, duty_cycle: f64) -> Self {
        let mut pins = Pins::new(0, 1);
        pins.outputs[0] = State::Zero;
        Self {
            id,
            pins,
            period: period.max(1),
            duty_cycle,
        }
    }

    /// Number of ticks per period the output is held high.
    fn high_ticks(&self) -> SimTime {
        (self.period as f64 * self.duty_cycle).floor() as SimTime
    }

    fn output_at(&self, time: SimTime) -> State {
        State::from_bool(time % self.period < self.high_ticks())
    }
}

impl Component for Clock {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "CLOCK"
    }

    fn input_count(&self) -> usize {
        0
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

    fn set_input(&mut self, _index: usize, _state: State) {}

    fn set_output(&mut self, index: usize, state: State) {
        self.pins.set_output(index, state);
    }

    fn evaluate(&mut self, time: SimTime) -> EvalResult {
        self.pins.outputs[0] = self.output_at(time);
        EvalResult {
            outputs: self.pins.outputs.clone(),
            delay: 0,
        }
    }

    fn reset(&mut self) {
        self.pins.outputs[0] = State::Zero;
    }

    fn delay(&self) -> SimTime {
        0
    }

    fn internal_state(&self) -> Option<serde_json::Value> {
        Some(json!({
            "period": self.period,
            "duty_cycle": self.duty_cycle,
        }))
    }

    fn restore_internal(&mut self, state: &serde_json::Value) {
        if let Some(p) = state.get("period").and_then(|v| v.as_u64()) {
            self.period = p.max(1);
        }
        if let Some(d) = state.get("duty_cycle").and_then(|v| v.as_f64()) {
            self.duty_cycle = d;
        }
    }

    fn clock_state_at(&self, time: SimTime) -> Option<State> {
        Some(self.output_at(time))
    }
}

/// Momentary push button. `triggerPulse` arms it for `duration` ticks; the
/// kernel disarms it once the expiry passes.
pub struct Pulse {
    id: GateId,
    pins: Pins,
    duration: SimTime,
    armed: bool,
    end_time: SimTime,
}

impl Pulse {
    pub const DEFAULT_DURATION: SimTime = 5;

    pub fn new(id: GateId, duration: SimTime) -> Self {
        let mut pins = Pins::new(0, 1);
        pins.outputs[0] = State::Zero;
        Self {
            id,
            pins,
            duration: duration.max(1),
            armed: false,
            end_time: 0,
        }
    }
}

impl Component for Pulse {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &'static str {
        "PULSE"
    }

    fn input_count(&self) -> usize {
        0
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

    fn set_input(&mut self, _index: usize, _state: State) {}

    fn set_output(&mut self, index: usize, state: State) {
        self.pins.set_output(index, state);
    }

    fn evaluate(&mut self, _time: SimTime) -> EvalResult {
        self.pins.outputs[0] = State::from_bool(self.armed);
        EvalResult {
            outputs: self.pins.outputs.clone(),
            delay: 0,
        }
    }

    fn reset(&mut self) {
        self.armed = false;
        self.end_time = 0;
        self.pins.outputs[0] = State::Zero;
    }

    fn delay(&self) -> SimTime {
        0
    }

    fn internal_state(&self) -> Option<serde_json::Value> {
        Some(json!({
            "duration": self.duration,
            "armed": self.armed,
            "end_time": self.end_time,
        }))
    }

    fn restore_internal(&mut self, state: &serde_json::Value) {
        if let Some(d) = state.get("duration").and_then(|v| v.as_u64()) {
            self.duration = d.max(1);
        }
        if let Some(a) = state.get("armed").and_then(|v| v.as_bool()) {
            self.armed = a;
        }
        if let Some(e) = state.get("end_time").and_then(|v| v.as_u64()) {
            self.end_time = e;
        }
    }

    fn arm_pulse(&mut self, now: SimTime) {
        self.armed = true;
        self.end_time = now + self.duration;
    }

    fn pulse_end(&self) -> Option<SimTime> {
        self.armed.then_some(self.end_time)
    }

    fn disarm_pulse(&mut self) {
        self.armed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_flip() {
        let mut t = Toggle::new("t".into());
        assert_eq!(t.evaluate(0).outputs, vec![State::Zero]);

        t.toggle();
        assert_eq!(t.evaluate(0).outputs, vec![State::One]);

        t.toggle();
        assert_eq!(t.evaluate(0).outputs, vec![State::Zero]);
    }

    #[test]
    fn test_toggle_set_value_rejects_invalid() {
        let mut t = Toggle::new("t".into());
        t.set_value(State::One);
        assert_eq!(t.evaluate(0).outputs[0], State::One);

        t.set_value(State::HiZ);
        assert_eq!(t.evaluate(0).outputs[0], State::One);
    }

    #[test]
    fn test_clock_phase_law() {
        let clk = Clock::new("c".into(), 4, 0.5);
        // period 4, duty 0.5: high for t % 4 in {0, 1}
        assert_eq!(clk.clock_state_at(0), Some(State::One));
        assert_eq!(clk.clock_state_at(1), Some(State::One));
        assert_eq!(clk.clock_state_at(2), Some(State::Zero));
        assert_eq!(clk.clock_state_at(3), Some(State::Zero));
        assert_eq!(clk.clock_state_at(4), Some(State::One));
    }

    #[test]
    fn test_clock_quarter_duty() {
        let clk = Clock::new("c".into(), 8, 0.25);
        assert_eq!(clk.clock_state_at(0), Some(State::One));
        assert_eq!(clk.clock_state_at(1), Some(State::One));
        assert_eq!(clk.clock_state_at(2), Some(State::Zero));
        assert_eq!(clk.clock_state_at(7), Some(State::Zero));
    }

    #[test]
    fn test_clock_period_one_is_constant() {
        let clk = Clock::new("c".into(), 1, 0.5);
        for t in 0..10 {
            assert_eq!(clk.clock_state_at(t), Some(State::Zero));
        }
    }

    #[test]
    fn test_pulse_arm_and_expire() {
        let mut p = Pulse::new("p".into(), 3);
        assert_eq!(p.evaluate(0).outputs[0], State::Zero);
        assert_eq!(p.pulse_end(), None);

        p.arm_pulse(10);
        assert_eq!(p.pulse_end(), Some(13));
        assert_eq!(p.evaluate(10).outputs[0], State::One);

        p.disarm_pulse();
        assert_eq!(p.pulse_end(), None);
        assert_eq!(p.evaluate(13).outputs[0], State::Zero);
    }

    #[test]
    fn test_source_internal_state_roundtrip() {
        let mut t = Toggle::new("t".into());
        t.toggle();
        let snap = t.internal_state().unwrap();

        let mut restored = Toggle::new("t".into());
        restored.restore_internal(&snap);
        assert_eq!(restored.evaluate(0).outputs[0], State::One);
    }
}
