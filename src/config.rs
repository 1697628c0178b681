//! Declarative circuit configuration.
//!
//! A whole netlist plus engine settings can be described in YAML or JSON
//! and loaded in one call, for headless runs and test fixtures.
//!
//! # Configuration File Structure
//!
//! ```yaml
//! engine:
//!   max_events_per_step: 10000
//!   ms_per_tick: 20
//!
//! gates:
//!   - id: clk
//!     type: CLOCK
//!     input_states: []
//!     output_states: [0]
//!     attrs:
//!       period: "4"
//!   - id: ff
//!     type: D_FLIPFLOP
//!     input_states: [4, 4]
//!     output_states: [0, 1]
//!
//! wires:
//!   - id: w1
//!     source_gate_id: clk
//!     source_port_index: 0
//!     target_gate_id: ff
//!     target_port_index: 1
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::driver::{MAX_MS_PER_TICK, MIN_MS_PER_TICK};
use crate::engine::{EngineError, KernelConfig, SimulationEngine};
use crate::netlist::{GateState, WireState};
use crate::types::SimTime;

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown file format: {0}")]
    UnknownFormat(String),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Engine tuning carried alongside the netlist.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Event cap per time slice.
    #[serde(default = "default_max_events_per_step")]
    pub max_events_per_step: usize,

    /// Reserved for future use.
    #[serde(default = "default_max_time_per_step")]
    pub max_time_per_step: SimTime,

    /// Driver pacing in milliseconds per simulated tick.
    #[serde(default = "default_ms_per_tick")]
    pub ms_per_tick: u64,
}

fn default_max_events_per_step() -> usize {
    KernelConfig::default().max_events_per_step
}

fn default_max_time_per_step() -> SimTime {
    KernelConfig::default().max_time_per_step
}

fn default_ms_per_tick() -> u64 {
    20
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_events_per_step: default_max_events_per_step(),
            max_time_per_step: default_max_time_per_step(),
            ms_per_tick: default_ms_per_tick(),
        }
    }
}

impl EngineSettings {
    pub fn kernel_config(&self) -> KernelConfig {
        KernelConfig {
            max_events_per_step: self.max_events_per_step,
            max_time_per_step: self.max_time_per_step,
        }
    }
}

/// Complete circuit configuration: engine settings plus the netlist.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CircuitConfig {
    #[serde(default)]
    pub engine: EngineSettings,

    #[serde(default)]
    pub gates: Vec<GateState>,

    #[serde(default)]
    pub wires: Vec<WireState>,
}

impl CircuitConfig {
    /// Creates a new empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        let config: CircuitConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a JSON string.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: CircuitConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a file, auto-detecting format by
    /// extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let content = std::fs::read_to_string(path)?;

        match ext.to_lowercase().as_str() {
            "yaml" | "yml" => Self::from_yaml(&content),
            "json" => Self::from_json(&content),
            _ => Err(ConfigError::UnknownFormat(ext.to_string())),
        }
    }

    /// Serializes to YAML.
    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Serializes to pretty JSON.
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validates the configuration.
    ///
    /// Duplicate gate or wire ids and out-of-range engine settings are
    /// fatal. Wires referencing unknown gates are allowed (they are inert
    /// in the kernel) but logged.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.engine.max_events_per_step == 0 {
            return Err(ConfigError::Validation(
                "max_events_per_step must be positive".to_string(),
            ));
        }
        if !(MIN_MS_PER_TICK..=MAX_MS_PER_TICK).contains(&self.engine.ms_per_tick) {
            return Err(ConfigError::Validation(format!(
                "ms_per_tick must be within {MIN_MS_PER_TICK}..={MAX_MS_PER_TICK}, got {}",
                self.engine.ms_per_tick
            )));
        }

        let mut gate_ids = HashSet::new();
        for gate in &self.gates {
            if !gate_ids.insert(gate.id.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "Duplicate gate ID: {}",
                    gate.id
                )));
            }
        }

        let mut wire_ids = HashSet::new();
        for wire in &self.wires {
            if !wire_ids.insert(wire.id.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "Duplicate wire ID: {}",
                    wire.id
                )));
            }
            if !gate_ids.contains(wire.source_gate_id.as_str())
                || !gate_ids.contains(wire.target_gate_id.as_str())
            {
                tracing::warn!(
                    wire = %wire.id,
                    "wire references a gate not in this config; it will be inert"
                );
            }
        }
        Ok(())
    }

    /// Builds an initialized kernel from this configuration.
    pub fn build_engine(&self) -> ConfigResult<SimulationEngine> {
        let mut engine = SimulationEngine::with_config(self.engine.kernel_config());
        engine.initialize(self.gates.clone(), self.wires.clone())?;
        Ok(engine)
    }

    pub fn gate_count(&self) -> usize {
        self.gates.len()
    }

    pub fn wire_count(&self) -> usize {
        self.wires.len()
    }
}

/// Builder for creating a [`CircuitConfig`] programmatically.
#[derive(Default)]
pub struct CircuitConfigBuilder {
    config: CircuitConfig,
}

impl CircuitConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_events_per_step(mut self, cap: usize) -> Self {
        self.config.engine.max_events_per_step = cap;
        self
    }

    pub fn ms_per_tick(mut self, ms: u64) -> Self {
        self.config.engine.ms_per_tick = ms;
        self
    }

    pub fn gate(mut self, gate: GateState) -> Self {
        self.config.gates.push(gate);
        self
    }

    pub fn wire(mut self, wire: WireState) -> Self {
        self.config.wires.push(wire);
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> ConfigResult<CircuitConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
