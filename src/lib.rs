//! # Strobe
//!
//! A deterministic, event-driven simulator for digital logic circuits.
//!
//! Strobe accepts a netlist (components and point-to-point wires), runs a
//! discrete-time simulation with integer timestamps, and exposes
//! per-component input/output/internal state for external visualization.
//!
//! ## Design Principles
//!
//! - **5-valued logic**: signals are `ZERO`, `ONE`, `HI_Z`, `CONFLICT`, or
//!   `UNKNOWN`, so tri-state buses, contention, and undriven inputs are
//!   first-class.
//! - **Event-driven**: components re-evaluate only when scheduled; output
//!   changes propagate across wires and schedule their consumers.
//! - **Deterministic**: the event queue breaks ties by a monotonic
//!   sequence number and all observable iteration runs in insertion
//!   order, so identical netlists replay identically.
//! - **Kernel/driver split**: the kernel is single-threaded and
//!   synchronous; the driver paces it against wall-clock time and speaks
//!   the message protocol, optionally on its own worker thread.
//!
//! ## Quick start
//!
//! ```
//! use strobe::engine::SimulationEngine;
//! use strobe::netlist::{GateState, WireState};
//! use strobe::state::State;
//!
//! let mut engine = SimulationEngine::new();
//! engine
//!     .initialize(
//!         vec![
//!             GateState::new("switch", "TOGGLE"),
//!             GateState::new("inverter", "NOT"),
//!         ],
//!         vec![WireState::new("w", "switch", 0, "inverter", 0)],
//!     )
//!     .unwrap();
//!
//! engine.step(5);
//! assert_eq!(engine.gate("inverter").unwrap().outputs()[0], State::One);
//! ```

pub mod component;
pub mod config;
pub mod driver;
pub mod engine;
pub mod event;
pub mod message;
pub mod netlist;
pub mod state;
pub mod types;

// Re-export commonly used types
pub use component::{default_catalogue, Component, ComponentCatalogue, MemoryMap};
pub use config::{CircuitConfig, CircuitConfigBuilder, ConfigError};
pub use driver::{Driver, DriverHandle, MAX_STEPS_PER_FRAME};
pub use engine::{EngineError, KernelConfig, PortUpdate, RunState, SimulationEngine};
pub use event::{EventQueue, SimulationEvent};
pub use message::{ControlMessage, Response};
pub use netlist::{GateState, Snapshot, WireState};
pub use state::{resolve_net, State};
pub use types::{GateId, PortIndex, SimTime, WireId};
