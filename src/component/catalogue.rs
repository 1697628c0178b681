//! The component catalogue: a map from type name to factory.
//!
//! The catalogue is how descriptors become live components. Factories read
//! construction parameters out of the descriptor's `attrs`; the catalogue
//! then seeds port states and internal state generically, so a snapshot
//! fed back through `create` reproduces the component it was taken from.
//!
//! # Example
//!
//! ```
//! use strobe::component::{default_catalogue, Component};
//! use strobe::netlist::GateState;
//!
//! let catalogue = default_catalogue();
//! let gate = catalogue
//!     .create(&GateState::new("a1", "AND").with_input_count(3))
//!     .unwrap();
//! assert_eq!(gate.kind(), "AND");
//! assert_eq!(gate.input_count(), 3);
//! ```

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use crate::component::basic::{BufferGate, LogicGate, LogicOp, NotGate, TriStateBuffer};
use crate::component::combinational::{
    Comparator1, Comparator4, Decoder, Demux, Encoder, FullAdder, Mux, RippleAdder4,
};
use crate::component::io::{Display, Keypad, Led};
use crate::component::memory::{Ram, Rom};
use crate::component::register::{Counter4, Register, ShiftRegister4};
use crate::component::sequential::{DFlipFlop, JkFlipFlop};
use crate::component::source::{Clock, Pulse, Toggle};
use crate::component::Component;
use crate::netlist::GateState;

/// Errors surfaced while constructing components.
#[derive(Error, Debug)]
pub enum CatalogueError {
    #[error("unknown component type: {0}")]
    UnknownType(String),
}

/// Factory function building a component from its descriptor.
pub type ComponentFactory = Arc<dyn Fn(&GateState) -> Box<dyn Component> + Send + Sync>;

/// Parses a typed construction parameter out of the descriptor's attrs.
fn attr<T: FromStr>(desc: &GateState, key: &str) -> Option<T> {
    desc.attrs.get(key).and_then(|s| s.parse().ok())
}

/// Input count for variable-arity gates: the descriptor's port array wins,
/// then an `inputs` attr, then the family default.
fn input_count(desc: &GateState) -> usize {
    if !desc.input_states.is_empty() {
        desc.input_states.len()
    } else {
        attr(desc, "inputs").unwrap_or(LogicGate::DEFAULT_INPUTS)
    }
}

/// A registry of component factories keyed by type name.
pub struct ComponentCatalogue {
    factories: HashMap<String, ComponentFactory>,
}

impl ComponentCatalogue {
    /// Creates an empty catalogue.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registers a factory under the given type name.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&GateState) -> Box<dyn Component> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    /// Constructs a component from a descriptor: builds via the registered
    /// factory, seeds port states, latches the inputs (no phantom edges on
    /// the first evaluation), and restores internal state.
    pub fn create(&self, desc: &GateState) -> Result<Box<dyn Component>, CatalogueError> {
        let factory = self
            .factories
            .get(&desc.gate_type)
            .ok_or_else(|| CatalogueError::UnknownType(desc.gate_type.clone()))?;

        let mut component = factory(desc);
        if !desc.input_states.is_empty() {
            for (i, &state) in desc.input_states.iter().enumerate() {
                component.set_input(i, state);
            }
            // restored inputs are not edges
            component.latch_inputs();
        }
        for (i, &state) in desc.output_states.iter().enumerate() {
            component.set_output(i, state);
        }
        if let Some(ref internal) = desc.internal_state {
            component.restore_internal(internal);
        }
        Ok(component)
    }

    /// Returns true if a type name is registered.
    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns true if no types are registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Iterates over the registered type names.
    pub fn type_names(&self) -> impl Iterator<Item = &String> {
        self.factories.keys()
    }
}

impl Default for ComponentCatalogue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ComponentCatalogue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentCatalogue")
            .field("registered_types", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builds the catalogue covering the full component set.
pub fn default_catalogue() -> ComponentCatalogue {
    let mut catalogue = ComponentCatalogue::new();

    // Sources
    catalogue.register("TOGGLE", |d| Box::new(Toggle::new(d.id.clone())));
    catalogue.register("CLOCK", |d| {
        let period = attr(d, "period").unwrap_or(Clock::DEFAULT_PERIOD);
        let duty = attr(d, "duty_cycle").unwrap_or(Clock::DEFAULT_DUTY_CYCLE);
        Box::new(Clock::new(d.id.clone(), period, duty))
    });
    catalogue.register("PULSE", |d| {
        let duration = attr(d, "duration").unwrap_or(Pulse::DEFAULT_DURATION);
        Box::new(Pulse::new(d.id.clone(), duration))
    });

    // Basic logic
    catalogue.register("NOT", |d| Box::new(NotGate::new(d.id.clone())));
    catalogue.register("BUFFER", |d| Box::new(BufferGate::new(d.id.clone())));
    catalogue.register("TRI_BUFFER", |d| Box::new(TriStateBuffer::new(d.id.clone())));
    for (name, op) in [
        ("AND", LogicOp::And),
        ("OR", LogicOp::Or),
        ("XOR", LogicOp::Xor),
        ("NAND", LogicOp::Nand),
        ("NOR", LogicOp::Nor),
        ("XNOR", LogicOp::Xnor),
    ] {
        catalogue.register(name, move |d| {
            Box::new(LogicGate::new(d.id.clone(), op, input_count(d)))
        });
    }

    // Sequential
    catalogue.register("D_FLIPFLOP", |d| Box::new(DFlipFlop::new(d.id.clone(), false)));
    catalogue.register("D_FLIPFLOP_SR", |d| Box::new(DFlipFlop::new(d.id.clone(), true)));
    catalogue.register("JK_FLIPFLOP", |d| Box::new(JkFlipFlop::new(d.id.clone(), false)));
    catalogue.register("JK_FLIPFLOP_SR", |d| Box::new(JkFlipFlop::new(d.id.clone(), true)));

    // Combinational, fixed-width
    catalogue.register("MUX_2TO1", |d| Box::new(Mux::new(d.id.clone(), 1)));
    catalogue.register("MUX_4TO1", |d| Box::new(Mux::new(d.id.clone(), 2)));
    catalogue.register("MUX_8TO1", |d| Box::new(Mux::new(d.id.clone(), 3)));
    catalogue.register("DEMUX_1TO2", |d| Box::new(Demux::new(d.id.clone(), 1)));
    catalogue.register("DEMUX_1TO4", |d| Box::new(Demux::new(d.id.clone(), 2)));
    catalogue.register("DECODER_2TO4", |d| Box::new(Decoder::new(d.id.clone(), 2)));
    catalogue.register("DECODER_3TO8", |d| Box::new(Decoder::new(d.id.clone(), 3)));
    catalogue.register("ENCODER_4TO2", |d| Box::new(Encoder::new(d.id.clone(), 2)));
    catalogue.register("ENCODER_8TO3", |d| Box::new(Encoder::new(d.id.clone(), 3)));
    catalogue.register("FULL_ADDER", |d| Box::new(FullAdder::new(d.id.clone())));
    catalogue.register("ADDER_4BIT", |d| Box::new(RippleAdder4::new(d.id.clone())));
    catalogue.register("COMPARATOR_1BIT", |d| Box::new(Comparator1::new(d.id.clone())));
    catalogue.register("COMPARATOR_4BIT", |d| Box::new(Comparator4::new(d.id.clone())));

    // Registers and counters
    catalogue.register("REGISTER_4BIT", |d| Box::new(Register::new(d.id.clone(), 4)));
    catalogue.register("REGISTER_8BIT", |d| Box::new(Register::new(d.id.clone(), 8)));
    catalogue.register("SHIFT_REG_4BIT", |d| Box::new(ShiftRegister4::new(d.id.clone())));
    catalogue.register("COUNTER_4BIT", |d| Box::new(Counter4::new(d.id.clone())));

    // Memory
    catalogue.register("RAM_16X4", |d| Box::new(Ram::new(d.id.clone(), 4)));
    catalogue.register("RAM_16X8", |d| Box::new(Ram::new(d.id.clone(), 8)));
    catalogue.register("ROM_16X4", |d| Box::new(Rom::new(d.id.clone(), 4)));
    catalogue.register("ROM_16X8", |d| Box::new(Rom::new(d.id.clone(), 8)));

    // I/O markers
    catalogue.register("LED", |d| Box::new(Led::new(d.id.clone())));
    catalogue.register("DISPLAY_1D", |d| Box::new(Display::new(d.id.clone(), 4)));
    catalogue.register("DISPLAY_2D", |d| Box::new(Display::new(d.id.clone(), 8)));
    catalogue.register("KEYPAD", |d| Box::new(Keypad::new(d.id.clone())));

    catalogue
}
