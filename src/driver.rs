//! The driver loop: adapts wall-clock time to simulated ticks.
//!
//! [`Driver`] holds the pacing policy: an accumulator translating elapsed
//! milliseconds into `step()` calls at a tunable `ms_per_tick` rate, capped
//! per frame so a stalled host doesn't trigger a step avalanche. It also
//! executes the control protocol ([`crate::message`]).
//!
//! [`DriverHandle`] runs a `Driver` on its own thread (the worker isolate):
//! commands arrive over a channel and are handled FIFO, snapshots are
//! published into a shared cell at frame boundaries. Dropping the handle
//! shuts the worker down.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::engine::SimulationEngine;
use crate::message::{parse_message, ControlMessage, Response};
use crate::netlist::Snapshot;

/// Upper bound on steps executed per frame. Backpressure against CPU
/// saturation when the host falls behind.
pub const MAX_STEPS_PER_FRAME: u64 = 100;

/// Pacing bounds for `ms_per_tick`.
pub const MIN_MS_PER_TICK: u64 = 1;
pub const MAX_MS_PER_TICK: u64 = 1000;

const DEFAULT_MS_PER_TICK: u64 = 20;

/// Worker frame interval, roughly 60 Hz.
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Paces a [`SimulationEngine`] against wall-clock time and executes
/// control messages.
pub struct Driver {
    engine: SimulationEngine,
    ms_per_tick: u64,
    accumulator_ms: u64,
}

impl Driver {
    pub fn new(engine: SimulationEngine) -> Self {
        Self {
            engine,
            ms_per_tick: DEFAULT_MS_PER_TICK,
            accumulator_ms: 0,
        }
    }

    /// Adjusts pacing, clamped to [`MIN_MS_PER_TICK`]..=[`MAX_MS_PER_TICK`].
    pub fn set_speed(&mut self, ms_per_tick: u64) {
        self.ms_per_tick = ms_per_tick.clamp(MIN_MS_PER_TICK, MAX_MS_PER_TICK);
    }

    pub fn ms_per_tick(&self) -> u64 {
        self.ms_per_tick
    }

    pub fn engine(&self) -> &SimulationEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut SimulationEngine {
        &mut self.engine
    }

    /// Banks `elapsed_ms` of wall-clock time and steps the kernel by the
    /// ticks it covers. Returns the number of steps executed.
    ///
    /// While the kernel is not in the Running state the accumulator stays
    /// frozen: pausing stops pacing without draining anything.
    pub fn advance(&mut self, elapsed_ms: u64) -> u64 {
        if !self.engine.is_running() {
            return 0;
        }
        self.accumulator_ms += elapsed_ms;
        let mut steps = self.accumulator_ms / self.ms_per_tick;
        self.accumulator_ms -= steps * self.ms_per_tick;
        if steps > MAX_STEPS_PER_FRAME {
            warn!(requested = steps, "frame overrun; clamping steps");
            steps = MAX_STEPS_PER_FRAME;
            self.accumulator_ms = 0;
        }
        if steps > 0 {
            self.engine.step(steps);
        }
        steps
    }

    /// Executes one control message. Returns the response to send, if the
    /// message warrants one.
    pub fn handle_message(&mut self, message: ControlMessage) -> Option<Response> {
        match message {
            ControlMessage::Init { gates, wires } => {
                match self.engine.initialize(gates, wires) {
                    Ok(()) => Some(Response::Ready),
                    Err(err) => Some(Response::error(err.to_string())),
                }
            }
            ControlMessage::Run => {
                self.engine.run();
                None
            }
            ControlMessage::Pause => {
                self.engine.pause();
                None
            }
            ControlMessage::Step { count } => {
                self.engine.step(count.unwrap_or(1));
                None
            }
            ControlMessage::Reset => {
                self.engine.reset();
                self.accumulator_ms = 0;
                None
            }
            ControlMessage::Toggle { gate_id } => {
                let result = self.engine.toggle(&gate_id).map_err(|e| e.to_string());
                self.stimulus_then_step(result)
            }
            ControlMessage::TriggerPulse { gate_id } => {
                let result = self
                    .engine
                    .trigger_pulse(&gate_id)
                    .map_err(|e| e.to_string());
                self.stimulus_then_step(result)
            }
            ControlMessage::SetInput { gate_id, value } => {
                let result = self.engine.set_input(&gate_id, value);
                self.stimulus_then_step(result.map_err(|e| e.to_string()))
            }
            ControlMessage::SetKeypadValue { gate_id, value } => {
                let result = self.engine.set_keypad_value(&gate_id, value);
                self.stimulus_then_step(result.map_err(|e| e.to_string()))
            }
            ControlMessage::SetMemoryData { gate_id, memory } => {
                match self.engine.set_memory_data(&gate_id, memory) {
                    Ok(()) => None,
                    Err(err) => Some(Response::error(err.to_string())),
                }
            }
            ControlMessage::SetSpeed { ms_per_tick } => {
                self.set_speed(ms_per_tick);
                None
            }
            ControlMessage::AddGate { gate } => match self.engine.add_gate(gate) {
                Ok(()) => None,
                Err(err) => Some(Response::error(err.to_string())),
            },
            ControlMessage::RemoveGate { gate_id } => {
                match self.engine.remove_gate(&gate_id) {
                    Ok(()) => None,
                    Err(err) => Some(Response::error(err.to_string())),
                }
            }
            ControlMessage::AddWire { wire } => match self.engine.add_wire(wire) {
                Ok(()) => None,
                Err(err) => Some(Response::error(err.to_string())),
            },
            ControlMessage::RemoveWire { wire_id } => {
                match self.engine.remove_wire(&wire_id) {
                    Ok(()) => None,
                    Err(err) => Some(Response::error(err.to_string())),
                }
            }
            ControlMessage::GetState => Some(Response::StateUpdate(self.engine.get_snapshot())),
        }
    }

    /// Parses and executes a JSON-encoded message; malformed input maps to
    /// an error response and leaves kernel state untouched.
    pub fn dispatch_json(&mut self, json: &str) -> Option<Response> {
        match parse_message(json) {
            Ok(message) => self.handle_message(message),
            Err(err) => Some(Response::error(err.to_string())),
        }
    }

    fn stimulus_then_step(&mut self, result: Result<(), String>) -> Option<Response> {
        match result {
            Ok(()) => {
                self.engine.step(1);
                None
            }
            Err(message) => Some(Response::error(message)),
        }
    }
}

/// A driver running on its own worker thread.
pub struct DriverHandle {
    commands: Option<Sender<ControlMessage>>,
    responses: Receiver<Response>,
    snapshot: Arc<RwLock<Option<Snapshot>>>,
    thread: Option<JoinHandle<()>>,
}

impl DriverHandle {
    /// Spawns the worker. The first response on the channel is
    /// [`Response::Ready`].
    pub fn spawn(engine: SimulationEngine) -> Self {
        let (command_tx, command_rx) = unbounded::<ControlMessage>();
        let (response_tx, response_rx) = unbounded::<Response>();
        let snapshot = Arc::new(RwLock::new(None));
        let cell = Arc::clone(&snapshot);

        let thread = std::thread::spawn(move || {
            let mut driver = Driver::new(engine);
            let _ = response_tx.send(Response::Ready);
            let mut last = Instant::now();

            loop {
                // FIFO, non-reentrant: one message at a time, pacing in
                // between.
                match command_rx.recv_timeout(FRAME_INTERVAL) {
                    Ok(message) => {
                        if let Some(response) = driver.handle_message(message) {
                            let _ = response_tx.send(response);
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }

                let now = Instant::now();
                let elapsed_ms = now.duration_since(last).as_millis() as u64;
                last = now;
                if driver.advance(elapsed_ms) > 0 {
                    *cell.write() = Some(driver.engine().get_snapshot());
                }
            }
            debug!("driver worker shut down");
        });

        Self {
            commands: Some(command_tx),
            responses: response_rx,
            snapshot,
            thread: Some(thread),
        }
    }

    /// Sends a control message to the worker. Returns false if the worker
    /// has shut down.
    pub fn send(&self, message: ControlMessage) -> bool {
        self.commands
            .as_ref()
            .map(|tx| tx.send(message).is_ok())
            .unwrap_or(false)
    }

    /// Receives the next response, waiting up to `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Response> {
        self.responses.recv_timeout(timeout).ok()
    }

    /// The most recently published frame snapshot, if any.
    pub fn latest_snapshot(&self) -> Option<Snapshot> {
        self.snapshot.read().clone()
    }

    /// Shuts the worker down and waits for it to exit.
    pub fn shutdown(mut self) {
        self.commands.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for DriverHandle {
    fn drop(&mut self) {
        self.commands.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::GateState;

    fn running_driver() -> Driver {
        let mut engine = SimulationEngine::new();
        engine
            .initialize(vec![GateState::new("t", "TOGGLE")], vec![])
            .unwrap();
        engine.run();
        let mut driver = Driver::new(engine);
        driver.set_speed(10);
        driver
    }

    #[test]
    fn test_accumulator_banks_remainder() {
        let mut driver = running_driver();

        // 25 ms at 10 ms/tick: two steps, 5 ms banked
        assert_eq!(driver.advance(25), 2);
        // 5 banked + 5 new = 1 step
        assert_eq!(driver.advance(5), 1);
        assert_eq!(driver.engine().current_time(), 3);
    }

    #[test]
    fn test_frame_overrun_clamps_and_drops_backlog() {
        let mut driver = running_driver();
        let steps = driver.advance(10 * (MAX_STEPS_PER_FRAME + 50));
        assert_eq!(steps, MAX_STEPS_PER_FRAME);
        // accumulator was discarded: a tiny follow-up yields nothing
        assert_eq!(driver.advance(9), 0);
    }

    #[test]
    fn test_paused_engine_does_not_step() {
        let mut driver = running_driver();
        driver.engine_mut().pause();
        assert_eq!(driver.advance(1000), 0);
        assert_eq!(driver.engine().current_time(), 0);
    }

    #[test]
    fn test_speed_clamp() {
        let mut driver = running_driver();
        driver.set_speed(0);
        assert_eq!(driver.ms_per_tick(), MIN_MS_PER_TICK);
        driver.set_speed(10_000);
        assert_eq!(driver.ms_per_tick(), MAX_MS_PER_TICK);
    }

    #[test]
    fn test_handle_get_state() {
        let mut driver = running_driver();
        match driver.handle_message(ControlMessage::GetState) {
            Some(Response::StateUpdate(snapshot)) => {
                assert_eq!(snapshot.gates.len(), 1);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_dispatch_json_unknown_message() {
        let mut driver = running_driver();
        match driver.dispatch_json(r#"{ "type": "overclock" }"#) {
            Some(Response::Error { message }) => {
                assert!(message.contains("not recognized"));
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_toggle_message_steps_once() {
        let mut driver = running_driver();
        let before = driver.engine().current_time();
        assert!(driver.handle_message(ControlMessage::Toggle { gate_id: "t".into() }).is_none());
        assert!(driver.engine().current_time() > before);
        assert_eq!(driver.engine().gate("t").unwrap().outputs()[0], crate::state::State::One);
    }

    #[test]
    fn test_unknown_gate_stimulus_is_error() {
        let mut driver = running_driver();
        match driver.handle_message(ControlMessage::Toggle { gate_id: "ghost".into() }) {
            Some(Response::Error { message }) => assert!(message.contains("ghost")),
            other => panic!("unexpected response: {other:?}"),
        }
    }
}
