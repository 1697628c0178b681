//! Core type definitions for the simulator.
//!
//! This module defines the fundamental types used throughout the kernel.

/// Simulation time in integer ticks.
///
/// All events carry the same `SimTime` representation; time only moves
/// forward (see `SimulationEngine::process_one_step`).
pub type SimTime = u64;

/// Unique identifier for a gate (component) in the netlist.
///
/// Gates are addressed by stable string ids supplied by the editor; the
/// kernel never invents ids of its own.
pub type GateId = String;

/// Unique identifier for a wire in the netlist.
pub type WireId = String;

/// Index of an input or output port on a gate.
pub type PortIndex = u32;
