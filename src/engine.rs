//! The simulation kernel.
//!
//! `SimulationEngine` owns the netlist (components and wires in id-keyed
//! maps plus insertion-order vectors), the event queue, and simulated
//! time. It schedules evaluations, propagates output changes onto wires,
//! resolves multi-driver nets, and advances time one step at a time.
//!
//! Everything here is single-threaded and deterministic: iteration that
//! affects scheduling or snapshots runs in insertion order, and same-time
//! events pop in push order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::component::{default_catalogue, CatalogueError, Component, ComponentCatalogue, MemoryMap};
use crate::event::{EventQueue, WHOLE_GATE};
use crate::netlist::{GateState, Snapshot, WireState};
use crate::state::{resolve_net, State};
use crate::types::{GateId, PortIndex, SimTime, WireId};

/// Errors surfaced by kernel operations.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("unknown component type: {0}")]
    UnknownComponentType(String),

    #[error("no such gate: {0}")]
    UnknownGate(GateId),

    #[error("no such wire: {0}")]
    UnknownWire(WireId),
}

impl From<CatalogueError> for EngineError {
    fn from(err: CatalogueError) -> Self {
        match err {
            CatalogueError::UnknownType(name) => EngineError::UnknownComponentType(name),
        }
    }
}

/// Kernel tuning knobs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Cap on events processed in one time slice. Backpressure against
    /// unstable feedback loops; excess events stay queued for later steps.
    #[serde(default = "default_max_events_per_step")]
    pub max_events_per_step: usize,

    /// Reserved for future use.
    #[serde(default = "default_max_time_per_step")]
    pub max_time_per_step: SimTime,
}

fn default_max_events_per_step() -> usize {
    10_000
}

fn default_max_time_per_step() -> SimTime {
    1_000
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            max_events_per_step: default_max_events_per_step(),
            max_time_per_step: default_max_time_per_step(),
        }
    }
}

/// The kernel's control state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Idle,
    Running,
    Paused,
}

/// Counters accumulated across steps; exported via
/// [`SimulationEngine::export_stats`].
#[derive(Clone, Debug, Default)]
pub struct KernelStats {
    /// Total `process_one_step` executions.
    pub steps_executed: u64,
    /// Events popped and dispatched.
    pub events_processed: u64,
    /// Events dropped because their gate had been removed.
    pub events_skipped: u64,
    /// Component evaluations performed.
    pub evaluations: u64,
    /// Observable port updates emitted.
    pub updates_emitted: u64,
}

/// One observable output change, reported from a step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortUpdate {
    pub gate_id: GateId,
    pub port_index: PortIndex,
    pub old: State,
    pub new: State,
}

/// Internal wire record.
struct Wire {
    id: WireId,
    state: State,
    source_gate_id: GateId,
    source_port_index: PortIndex,
    target_gate_id: GateId,
    target_port_index: PortIndex,
}

impl Wire {
    fn snapshot(&self) -> WireState {
        WireState {
            id: self.id.clone(),
            state: self.state,
            source_gate_id: self.source_gate_id.clone(),
            source_port_index: self.source_port_index,
            target_gate_id: self.target_gate_id.clone(),
            target_port_index: self.target_port_index,
        }
    }
}

type PortKey = (GateId, PortIndex);

/// The simulation kernel. See the module docs for the overall contract.
pub struct SimulationEngine {
    catalogue: ComponentCatalogue,
    gates: HashMap<GateId, Box<dyn Component>>,
    gate_order: Vec<GateId>,
    wires: HashMap<WireId, Wire>,
    wire_order: Vec<WireId>,
    /// Wires driven by each `(gate, output port)`, in insertion order.
    wires_from_output: HashMap<PortKey, Vec<WireId>>,
    /// Wires feeding each `(gate, input port)`, in insertion order. The
    /// multi-driver net of that port.
    wires_into_input: HashMap<PortKey, Vec<WireId>>,
    clock_register: Vec<GateId>,
    pulse_register: Vec<GateId>,
    queue: EventQueue,
    current_time: SimTime,
    run_state: RunState,
    config: KernelConfig,
    stats: KernelStats,
}

impl SimulationEngine {
    /// Creates an empty kernel with the default catalogue and config.
    pub fn new() -> Self {
        Self::with_config(KernelConfig::default())
    }

    /// Creates an empty kernel with a custom config.
    pub fn with_config(config: KernelConfig) -> Self {
        Self {
            catalogue: default_catalogue(),
            gates: HashMap::new(),
            gate_order: Vec::new(),
            wires: HashMap::new(),
            wire_order: Vec::new(),
            wires_from_output: HashMap::new(),
            wires_into_input: HashMap::new(),
            clock_register: Vec::new(),
            pulse_register: Vec::new(),
            queue: EventQueue::new(),
            current_time: 0,
            run_state: RunState::Idle,
            config,
            stats: KernelStats::default(),
        }
    }

    // ------------------------------------------------------------------
    // Initialization and incremental mutation
    // ------------------------------------------------------------------

    /// Replaces the entire netlist and schedules a full evaluation of
    /// every gate at time zero.
    ///
    /// Fails without touching the queue history if any descriptor names an
    /// unknown component type.
    pub fn initialize(
        &mut self,
        gates: Vec<GateState>,
        wires: Vec<WireState>,
    ) -> Result<(), EngineError> {
        // Build all components up front so an unknown type rejects the
        // whole operation.
        let mut built = Vec::with_capacity(gates.len());
        for desc in &gates {
            built.push((desc.id.clone(), self.catalogue.create(desc)?));
        }

        self.gates.clear();
        self.gate_order.clear();
        self.wires.clear();
        self.wire_order.clear();
        self.wires_from_output.clear();
        self.wires_into_input.clear();
        self.clock_register.clear();
        self.pulse_register.clear();
        self.queue.clear();
        self.current_time = 0;
        self.run_state = RunState::Idle;
        self.stats = KernelStats::default();

        for (id, component) in built {
            self.register_component(id, component);
        }
        for desc in wires {
            self.insert_wire(desc);
        }

        // Seed each wire from its source's live output so the first
        // evaluations see settled inputs, then schedule everything.
        let wire_ids = self.wire_order.clone();
        for wire_id in wire_ids {
            self.seed_wire_from_source(&wire_id);
        }
        for gate_id in self.gate_order.clone() {
            self.schedule_evaluation(gate_id, 0);
        }
        debug!(
            gates = self.gates.len(),
            wires = self.wires.len(),
            "netlist initialized"
        );
        Ok(())
    }

    /// Adds a single gate and schedules its evaluation at the current
    /// time. Rejects unknown component types.
    pub fn add_gate(&mut self, desc: GateState) -> Result<(), EngineError> {
        let component = self.catalogue.create(&desc)?;
        let id = desc.id;
        self.register_component(id.clone(), component);
        self.schedule_evaluation(id, self.current_time);
        Ok(())
    }

    /// Removes a gate, every wire incident to it, and its pending events.
    pub fn remove_gate(&mut self, gate_id: &str) -> Result<(), EngineError> {
        if !self.gates.contains_key(gate_id) {
            return Err(EngineError::UnknownGate(gate_id.to_string()));
        }

        let incident: Vec<WireId> = self
            .wire_order
            .iter()
            .filter(|wid| {
                self.wires
                    .get(*wid)
                    .map(|w| w.source_gate_id == gate_id || w.target_gate_id == gate_id)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        for wire_id in incident {
            let _ = self.remove_wire(&wire_id);
        }

        self.clock_register.retain(|id| id != gate_id);
        self.pulse_register.retain(|id| id != gate_id);
        self.gate_order.retain(|id| id != gate_id);
        self.queue.remove_events_for(gate_id);
        self.gates.remove(gate_id);
        Ok(())
    }

    /// Adds a wire, seeds it from the source's current output, and
    /// re-schedules the target.
    ///
    /// Dangling endpoints are accepted: the wire is created but inert, and
    /// adding the missing gate later does not retroactively connect it.
    pub fn add_wire(&mut self, desc: WireState) -> Result<(), EngineError> {
        let wire_id = desc.id.clone();
        let target = desc.target_gate_id.clone();
        self.insert_wire(desc);
        self.seed_wire_from_source(&wire_id);
        if self.gates.contains_key(&target) {
            self.schedule_evaluation(target, self.current_time + 1);
        }
        Ok(())
    }

    /// Removes a wire; the orphaned target port re-resolves without this
    /// driver and the target re-evaluates on the next tick.
    pub fn remove_wire(&mut self, wire_id: &str) -> Result<(), EngineError> {
        let wire = self
            .wires
            .remove(wire_id)
            .ok_or_else(|| EngineError::UnknownWire(wire_id.to_string()))?;
        self.wire_order.retain(|id| id != wire_id);

        let source_key = (wire.source_gate_id.clone(), wire.source_port_index);
        if let Some(list) = self.wires_from_output.get_mut(&source_key) {
            list.retain(|id| id != wire_id);
        }
        let target_key = (wire.target_gate_id.clone(), wire.target_port_index);
        if let Some(list) = self.wires_into_input.get_mut(&target_key) {
            list.retain(|id| id != wire_id);
        }

        if self.gates.contains_key(&wire.target_gate_id) {
            self.refresh_input(&wire.target_gate_id, wire.target_port_index);
            self.schedule_evaluation(wire.target_gate_id, self.current_time + 1);
        }
        Ok(())
    }

    fn register_component(&mut self, id: GateId, component: Box<dyn Component>) {
        // re-registering an id replaces the component in place
        if !self.gates.contains_key(&id) {
            match component.kind() {
                "CLOCK" => self.clock_register.push(id.clone()),
                "PULSE" => self.pulse_register.push(id.clone()),
                _ => {}
            }
            self.gate_order.push(id.clone());
        }
        self.gates.insert(id, component);
    }

    fn insert_wire(&mut self, desc: WireState) {
        if !self.gates.contains_key(&desc.source_gate_id)
            || !self.gates.contains_key(&desc.target_gate_id)
        {
            warn!(
                wire = %desc.id,
                source = %desc.source_gate_id,
                target = %desc.target_gate_id,
                "wire references a missing gate; it will be inert"
            );
        }

        let wire = Wire {
            id: desc.id.clone(),
            state: desc.state,
            source_gate_id: desc.source_gate_id,
            source_port_index: desc.source_port_index,
            target_gate_id: desc.target_gate_id,
            target_port_index: desc.target_port_index,
        };
        self.wires_from_output
            .entry((wire.source_gate_id.clone(), wire.source_port_index))
            .or_default()
            .push(wire.id.clone());
        self.wires_into_input
            .entry((wire.target_gate_id.clone(), wire.target_port_index))
            .or_default()
            .push(wire.id.clone());
        self.wire_order.push(wire.id.clone());
        self.wires.insert(desc.id, wire);
    }

    /// Copies the source's live output onto the wire and re-resolves the
    /// target port. No-op for dangling sources or out-of-range ports.
    fn seed_wire_from_source(&mut self, wire_id: &str) {
        let Some(wire) = self.wires.get(wire_id) else {
            return;
        };
        let source_state = self
            .gates
            .get(&wire.source_gate_id)
            .and_then(|g| g.outputs().get(wire.source_port_index as usize))
            .copied();

        let (target_gate, target_port) = (wire.target_gate_id.clone(), wire.target_port_index);
        if let Some(state) = source_state {
            if let Some(wire) = self.wires.get_mut(wire_id) {
                wire.state = state;
            }
        }
        if self.gates.contains_key(&target_gate) {
            self.refresh_input(&target_gate, target_port);
        }
    }

    // ------------------------------------------------------------------
    // Stimulus
    // ------------------------------------------------------------------

    /// Flips a TOGGLE gate and schedules its re-evaluation.
    pub fn toggle(&mut self, gate_id: &str) -> Result<(), EngineError> {
        let gate = self
            .gates
            .get_mut(gate_id)
            .ok_or_else(|| EngineError::UnknownGate(gate_id.to_string()))?;
        gate.toggle();
        self.schedule_evaluation(gate_id.to_string(), self.current_time);
        Ok(())
    }

    /// Sets a TOGGLE gate's value and schedules its re-evaluation.
    pub fn set_input(&mut self, gate_id: &str, value: State) -> Result<(), EngineError> {
        let gate = self
            .gates
            .get_mut(gate_id)
            .ok_or_else(|| EngineError::UnknownGate(gate_id.to_string()))?;
        gate.set_value(value);
        self.schedule_evaluation(gate_id.to_string(), self.current_time);
        Ok(())
    }

    /// Arms a PULSE gate and schedules its re-evaluation.
    pub fn trigger_pulse(&mut self, gate_id: &str) -> Result<(), EngineError> {
        let now = self.current_time;
        let gate = self
            .gates
            .get_mut(gate_id)
            .ok_or_else(|| EngineError::UnknownGate(gate_id.to_string()))?;
        gate.arm_pulse(now);
        self.schedule_evaluation(gate_id.to_string(), now);
        Ok(())
    }

    /// Sets a KEYPAD gate's value and schedules its re-evaluation.
    pub fn set_keypad_value(&mut self, gate_id: &str, value: u8) -> Result<(), EngineError> {
        let gate = self
            .gates
            .get_mut(gate_id)
            .ok_or_else(|| EngineError::UnknownGate(gate_id.to_string()))?;
        gate.set_keypad_value(value);
        self.schedule_evaluation(gate_id.to_string(), self.current_time);
        Ok(())
    }

    /// Replaces a RAM/ROM gate's memory and schedules its re-evaluation.
    pub fn set_memory_data(
        &mut self,
        gate_id: &str,
        memory: MemoryMap,
    ) -> Result<(), EngineError> {
        let gate = self
            .gates
            .get_mut(gate_id)
            .ok_or_else(|| EngineError::UnknownGate(gate_id.to_string()))?;
        gate.set_memory(memory);
        self.schedule_evaluation(gate_id.to_string(), self.current_time);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Control state machine
    // ------------------------------------------------------------------

    /// Idle/Paused → Running.
    pub fn run(&mut self) {
        self.run_state = RunState::Running;
    }

    /// Running → Paused. Pending events stay queued.
    pub fn pause(&mut self) {
        if self.run_state == RunState::Running {
            self.run_state = RunState::Paused;
        }
    }

    /// Any → Idle: clears the queue, resets every component (ROM keeps
    /// its memory), zeroes time, and re-schedules initial evaluations.
    pub fn reset(&mut self) {
        self.queue.clear();
        self.current_time = 0;
        self.run_state = RunState::Idle;
        self.stats = KernelStats::default();

        for gate_id in &self.gate_order {
            if let Some(gate) = self.gates.get_mut(gate_id) {
                gate.reset();
            }
        }
        for wire in self.wires.values_mut() {
            wire.state = State::Unknown;
        }
        for gate_id in self.gate_order.clone() {
            self.schedule_evaluation(gate_id, 0);
        }
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn is_running(&self) -> bool {
        self.run_state == RunState::Running
    }

    // ------------------------------------------------------------------
    // Stepping
    // ------------------------------------------------------------------

    /// Executes `count` time steps, returning every observable output
    /// change they produced.
    pub fn step(&mut self, count: u64) -> Vec<PortUpdate> {
        let mut updates = Vec::new();
        for _ in 0..count {
            updates.extend(self.process_one_step());
        }
        updates
    }

    /// One time slice: poll periodic sources, drain due events (bounded by
    /// `max_events_per_step`), then advance time.
    pub fn process_one_step(&mut self) -> Vec<PortUpdate> {
        let now = self.current_time;

        // 1) Clocks whose output flips at `now` get re-evaluated.
        for gate_id in self.clock_register.clone() {
            let flips = self
                .gates
                .get(&gate_id)
                .and_then(|gate| {
                    gate.clock_state_at(now)
                        .map(|next| gate.outputs().first().copied() != Some(next))
                })
                .unwrap_or(false);
            if flips {
                self.schedule_evaluation(gate_id, now);
            }
        }

        // 2) Pulses past their expiry disarm and re-evaluate.
        for gate_id in self.pulse_register.clone() {
            let expired = self
                .gates
                .get_mut(&gate_id)
                .map(|gate| match gate.pulse_end() {
                    Some(end) if now >= end => {
                        gate.disarm_pulse();
                        true
                    }
                    _ => false,
                })
                .unwrap_or(false);
            if expired {
                self.schedule_evaluation(gate_id, now);
            }
        }

        // 3) Drain events due at or before `now`.
        let mut updates = Vec::new();
        let mut processed = 0usize;
        while processed < self.config.max_events_per_step {
            let event = match self.queue.peek() {
                Some(head) if head.time <= now => self.queue.pop().expect("peeked event"),
                _ => break,
            };
            processed += 1;
            self.stats.events_processed += 1;

            let Some(gate) = self.gates.get_mut(&event.gate_id) else {
                // events for removed gates are silently skipped
                self.stats.events_skipped += 1;
                continue;
            };

            let previous_outputs = gate.outputs().to_vec();
            let result = gate.evaluate(now);
            gate.latch_inputs();
            self.stats.evaluations += 1;

            let mut changed = Vec::new();
            for (i, &new) in result.outputs.iter().enumerate() {
                let old = previous_outputs
                    .get(i)
                    .copied()
                    .unwrap_or(State::Unknown);
                if old != new {
                    changed.push((i as PortIndex, old, new));
                }
            }

            for (port, old, new) in changed {
                updates.push(PortUpdate {
                    gate_id: event.gate_id.clone(),
                    port_index: port,
                    old,
                    new,
                });
                let wire_ids = self
                    .wires_from_output
                    .get(&(event.gate_id.clone(), port))
                    .cloned()
                    .unwrap_or_default();
                for wire_id in wire_ids {
                    self.propagate_wire_state(&wire_id, new);
                }
            }
        }
        if processed >= self.config.max_events_per_step {
            warn!(
                time = now,
                cap = self.config.max_events_per_step,
                pending = self.queue.len(),
                "event cap reached; deferring remaining work to later steps"
            );
        }

        // 4) Advance time: to the next scheduled event, or by one tick.
        self.current_time = match self.queue.peek() {
            Some(head) => (now + 1).max(head.time),
            None => now + 1,
        };

        self.stats.steps_executed += 1;
        self.stats.updates_emitted += updates.len() as u64;
        updates
    }

    /// Updates a wire's cached state and re-resolves its target port.
    /// No-ops when the state is unchanged (propagation settles).
    fn propagate_wire_state(&mut self, wire_id: &str, new_state: State) {
        let Some(wire) = self.wires.get_mut(wire_id) else {
            return;
        };
        if wire.state == new_state {
            return;
        }
        wire.state = new_state;
        let target_gate = wire.target_gate_id.clone();
        let target_port = wire.target_port_index;

        if self.gates.contains_key(&target_gate) {
            self.refresh_input(&target_gate, target_port);
            self.schedule_evaluation(target_gate, self.current_time + 1);
        }
    }

    /// Re-resolves one input port from the cached states of every wire
    /// feeding it. An empty connection list resolves to `Unknown`.
    fn refresh_input(&mut self, gate_id: &str, port: PortIndex) {
        let resolved = match self.wires_into_input.get(&(gate_id.to_string(), port)) {
            Some(list) if !list.is_empty() => {
                let drivers: Vec<State> = list
                    .iter()
                    .filter_map(|wid| self.wires.get(wid).map(|w| w.state))
                    .collect();
                resolve_net(&drivers)
            }
            _ => State::Unknown,
        };
        if let Some(gate) = self.gates.get_mut(gate_id) {
            gate.set_input(port as usize, resolved);
        }
    }

    fn schedule_evaluation(&mut self, gate_id: GateId, time: SimTime) {
        self.queue.push(time, gate_id, WHOLE_GATE, None);
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    pub fn current_time(&self) -> SimTime {
        self.current_time
    }

    pub fn gate_count(&self) -> usize {
        self.gates.len()
    }

    pub fn wire_count(&self) -> usize {
        self.wires.len()
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Read access to a gate, for inspection.
    pub fn gate(&self, gate_id: &str) -> Option<&dyn Component> {
        self.gates.get(gate_id).map(|g| g.as_ref())
    }

    /// A wire's cached resolved state.
    pub fn wire_state(&self, wire_id: &str) -> Option<State> {
        self.wires.get(wire_id).map(|w| w.state)
    }

    /// True if any pending event addresses the gate.
    pub fn has_pending_events_for(&self, gate_id: &str) -> bool {
        self.queue.has_events_for(gate_id)
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn stats(&self) -> &KernelStats {
        &self.stats
    }

    /// Captures the full kernel state in netlist insertion order.
    pub fn get_snapshot(&self) -> Snapshot {
        let gates = self
            .gate_order
            .iter()
            .filter_map(|id| self.gates.get(id))
            .map(|gate| GateState {
                id: gate.id().to_string(),
                gate_type: gate.kind().to_string(),
                input_states: gate.inputs().to_vec(),
                output_states: gate.outputs().to_vec(),
                attrs: Default::default(),
                internal_state: gate.internal_state(),
            })
            .collect();
        let wires = self
            .wire_order
            .iter()
            .filter_map(|id| self.wires.get(id))
            .map(Wire::snapshot)
            .collect();
        Snapshot {
            time: self.current_time,
            gates,
            wires,
        }
    }

    /// Exports engine statistics as JSON.
    pub fn export_stats(&self) -> serde_json::Value {
        serde_json::json!({
            "current_time": self.current_time,
            "gate_count": self.gates.len(),
            "wire_count": self.wires.len(),
            "pending_events": self.queue.len(),
            "steps_executed": self.stats.steps_executed,
            "events_processed": self.stats.events_processed,
            "events_skipped": self.stats.events_skipped,
            "evaluations": self.stats.evaluations,
            "updates_emitted": self.stats.updates_emitted,
        })
    }
}

impl Default for SimulationEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn not_chain() -> (SimulationEngine, Vec<GateState>, Vec<WireState>) {
        let gates = vec![
            GateState::new("t", "TOGGLE"),
            GateState::new("n", "NOT"),
            GateState::new("l", "LED"),
        ];
        let wires = vec![
            WireState::new("w1", "t", 0, "n", 0),
            WireState::new("w2", "n", 0, "l", 0),
        ];
        let mut engine = SimulationEngine::new();
        engine.initialize(gates.clone(), wires.clone()).unwrap();
        (engine, gates, wires)
    }

    #[test]
    fn test_initialize_schedules_everything() {
        let (engine, _, _) = not_chain();
        assert_eq!(engine.gate_count(), 3);
        assert_eq!(engine.wire_count(), 2);
        assert_eq!(engine.pending_events(), 3);
        assert_eq!(engine.current_time(), 0);
        assert_eq!(engine.run_state(), RunState::Idle);
    }

    #[test]
    fn test_initialize_rejects_unknown_type() {
        let mut engine = SimulationEngine::new();
        let err = engine
            .initialize(vec![GateState::new("x", "WARP_DRIVE")], vec![])
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownComponentType(_)));
    }

    #[test]
    fn test_not_propagates_to_led() {
        let (mut engine, _, _) = not_chain();
        engine.step(10);

        assert_eq!(engine.gate("n").unwrap().outputs()[0], State::One);
        assert_eq!(engine.gate("l").unwrap().inputs()[0], State::One);
    }

    #[test]
    fn test_toggle_flips_downstream() {
        let (mut engine, _, _) = not_chain();
        engine.step(10);

        engine.toggle("t").unwrap();
        engine.step(10);
        assert_eq!(engine.gate("n").unwrap().outputs()[0], State::Zero);
        assert_eq!(engine.gate("l").unwrap().inputs()[0], State::Zero);
    }

    #[test]
    fn test_time_is_monotonic() {
        let (mut engine, _, _) = not_chain();
        let mut last = engine.current_time();
        for _ in 0..20 {
            engine.step(1);
            assert!(engine.current_time() > last);
            last = engine.current_time();
        }
    }

    #[test]
    fn test_remove_gate_removes_incident_wires_and_events() {
        let (mut engine, _, _) = not_chain();
        engine.remove_gate("n").unwrap();

        assert_eq!(engine.gate_count(), 2);
        assert_eq!(engine.wire_count(), 0);
        assert!(!engine.has_pending_events_for("n"));
        // the orphaned LED input falls back to unknown after a step
        engine.step(2);
        assert_eq!(engine.gate("l").unwrap().inputs()[0], State::Unknown);
    }

    #[test]
    fn test_remove_missing_gate_is_error() {
        let (mut engine, _, _) = not_chain();
        assert!(matches!(
            engine.remove_gate("ghost"),
            Err(EngineError::UnknownGate(_))
        ));
    }

    #[test]
    fn test_add_wire_seeds_from_source() {
        let (mut engine, _, _) = not_chain();
        engine.step(10);

        engine
            .add_gate(GateState::new("l2", "LED"))
            .unwrap();
        engine
            .add_wire(WireState::new("w3", "n", 0, "l2", 0))
            .unwrap();
        engine.step(2);
        assert_eq!(engine.gate("l2").unwrap().inputs()[0], State::One);
    }

    #[test]
    fn test_dangling_wire_is_inert() {
        let (mut engine, _, _) = not_chain();
        engine
            .add_wire(WireState::new("w9", "ghost", 0, "l", 0))
            .unwrap();
        engine.step(5);
        // still resolvable; the dangling wire contributes its cached state
        assert_eq!(engine.wire_state("w9"), Some(State::Unknown));
    }

    #[test]
    fn test_reset_restores_time_and_state() {
        let (mut engine, _, _) = not_chain();
        engine.step(10);
        engine.toggle("t").unwrap();
        engine.step(10);

        engine.reset();
        assert_eq!(engine.current_time(), 0);
        assert_eq!(engine.run_state(), RunState::Idle);
        // queue holds exactly the re-scheduled initial evaluations
        assert_eq!(engine.pending_events(), 3);
        assert_eq!(engine.gate("t").unwrap().outputs()[0], State::Zero);
    }

    #[test]
    fn test_run_pause_state_machine() {
        let mut engine = SimulationEngine::new();
        assert_eq!(engine.run_state(), RunState::Idle);

        engine.pause(); // no-op from Idle
        assert_eq!(engine.run_state(), RunState::Idle);

        engine.run();
        assert!(engine.is_running());
        engine.pause();
        assert_eq!(engine.run_state(), RunState::Paused);
        engine.run();
        assert!(engine.is_running());
    }

    #[test]
    fn test_event_cap_defers_excess_work() {
        let mut gates = vec![GateState::new("t", "TOGGLE")];
        let mut wires = Vec::new();
        for i in 0..20 {
            gates.push(GateState::new(format!("n{i}"), "NOT"));
            wires.push(WireState::new(format!("w{i}"), "t", 0, format!("n{i}"), 0));
        }
        let mut engine = SimulationEngine::with_config(KernelConfig {
            max_events_per_step: 4,
            ..KernelConfig::default()
        });
        engine.initialize(gates, wires).unwrap();

        engine.step(1);
        // only four of the 21 initial evaluations ran this slice
        assert_eq!(engine.stats().events_processed, 4);
        assert!(engine.pending_events() > 0);

        // the deferred work drains over later steps
        engine.step(10);
        for i in 0..20 {
            let gate_id = format!("n{i}");
            assert_eq!(engine.gate(&gate_id).unwrap().outputs()[0], State::One);
        }
    }

    #[test]
    fn test_snapshot_is_insertion_ordered() {
        let (engine, gates, wires) = not_chain();
        let snapshot = engine.get_snapshot();

        let ids: Vec<_> = snapshot.gates.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, gates.iter().map(|g| g.id.as_str()).collect::<Vec<_>>());
        let wire_ids: Vec<_> = snapshot.wires.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(
            wire_ids,
            wires.iter().map(|w| w.id.as_str()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_export_stats_shape() {
        let (mut engine, _, _) = not_chain();
        engine.step(3);
        let stats = engine.export_stats();
        assert_eq!(stats["gate_count"], 3);
        assert_eq!(stats["steps_executed"], 3);
        assert!(stats["events_processed"].as_u64().unwrap() > 0);
    }
}
