//! The 5-valued logic algebra and the multi-driver net resolver.
//!
//! Every signal in the simulator is one of five [`State`] values: the two
//! driven levels, high impedance, bus contention, and indeterminacy. The
//! binary operators here are pure and total; gates build their truth tables
//! out of them.

use serde::{Deserialize, Serialize};

/// A logic level on a port or wire.
///
/// Serializes as its `u8` code so port arrays stay compact on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", from = "u8")]
#[repr(u8)]
pub enum State {
    /// Driven low.
    Zero = 0,
    /// Driven high.
    One = 1,
    /// High impedance: a non-driving output (tri-state).
    HiZ = 2,
    /// Multiple incompatible drivers on one net.
    Conflict = 3,
    /// Undetermined, or undriven-but-sensed.
    Unknown = 4,
}

impl State {
    /// Decodes a `u8` as produced by [`State::to_u8`]. Out-of-range values
    /// decode as [`State::Unknown`].
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => State::Zero,
            1 => State::One,
            2 => State::HiZ,
            3 => State::Conflict,
            _ => State::Unknown,
        }
    }

    /// Encodes the state as a `u8` for compact interop payloads.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Returns true for the two driven levels `Zero` and `One`.
    pub fn is_valid(self) -> bool {
        matches!(self, State::Zero | State::One)
    }

    /// Converts a boolean to the corresponding driven level.
    pub fn from_bool(value: bool) -> Self {
        if value {
            State::One
        } else {
            State::Zero
        }
    }

    /// Logical NOT.
    ///
    /// `HiZ` is sensed as indeterminate by a logic input, so its inversion
    /// is `Unknown`; `Conflict` stays sticky.
    pub fn not(self) -> Self {
        match self {
            State::Zero => State::One,
            State::One => State::Zero,
            State::HiZ => State::Unknown,
            State::Conflict => State::Conflict,
            State::Unknown => State::Unknown,
        }
    }

    /// Logical AND. A `Zero` on either side dominates every error value.
    pub fn and(self, other: Self) -> Self {
        if self == State::Zero || other == State::Zero {
            return State::Zero;
        }
        if self == State::Conflict || other == State::Conflict {
            return State::Conflict;
        }
        if !self.is_valid() || !other.is_valid() {
            return State::Unknown;
        }
        State::One
    }

    /// Logical OR. Dual of [`State::and`]: a `One` dominates.
    pub fn or(self, other: Self) -> Self {
        if self == State::One || other == State::One {
            return State::One;
        }
        if self == State::Conflict || other == State::Conflict {
            return State::Conflict;
        }
        if !self.is_valid() || !other.is_valid() {
            return State::Unknown;
        }
        State::Zero
    }

    /// Logical XOR. Defined only on valid bits; errors propagate.
    pub fn xor(self, other: Self) -> Self {
        if self == State::Conflict || other == State::Conflict {
            return State::Conflict;
        }
        if !self.is_valid() || !other.is_valid() {
            return State::Unknown;
        }
        if self == other {
            State::Zero
        } else {
            State::One
        }
    }

    /// NAND: `not ∘ and`.
    pub fn nand(self, other: Self) -> Self {
        self.and(other).not()
    }

    /// NOR: `not ∘ or`.
    pub fn nor(self, other: Self) -> Self {
        self.or(other).not()
    }

    /// XNOR: `not ∘ xor`.
    pub fn xnor(self, other: Self) -> Self {
        self.xor(other).not()
    }
}

impl Default for State {
    fn default() -> Self {
        State::Unknown
    }
}

impl From<State> for u8 {
    fn from(state: State) -> u8 {
        state.to_u8()
    }
}

impl From<u8> for State {
    fn from(value: u8) -> State {
        State::from_u8(value)
    }
}

/// N-ary AND: left fold of the binary op. Empty input yields `Unknown`.
pub fn and_all(states: &[State]) -> State {
    fold_binary(states, State::and)
}

/// N-ary OR: left fold of the binary op. Empty input yields `Unknown`.
pub fn or_all(states: &[State]) -> State {
    fold_binary(states, State::or)
}

/// N-ary XOR: left fold of the binary op. Empty input yields `Unknown`.
pub fn xor_all(states: &[State]) -> State {
    fold_binary(states, State::xor)
}

fn fold_binary(states: &[State], op: fn(State, State) -> State) -> State {
    let mut iter = states.iter().copied();
    let first = match iter.next() {
        Some(s) => s,
        None => return State::Unknown,
    };
    iter.fold(first, op)
}

/// Decodes a little-endian group of bits into an integer. Returns `None`
/// if any bit is not a driven level.
pub fn decode_word(bits: &[State]) -> Option<usize> {
    let mut value = 0usize;
    for (i, &bit) in bits.iter().enumerate() {
        match bit {
            State::One => value |= 1 << i,
            State::Zero => {}
            _ => return None,
        }
    }
    Some(value)
}

/// Encodes an integer as a little-endian group of `width` bits.
pub fn encode_word(value: usize, width: usize) -> Vec<State> {
    (0..width)
        .map(|i| State::from_bool(value & (1 << i) != 0))
        .collect()
}

/// Resolves the state of a net driven by multiple wires.
///
/// Priority order: any `Conflict` wins, opposing drivers conflict, then
/// `One`, then `Zero`, then `Unknown`. An empty or all-`HiZ` net floats.
/// The function is commutative, associative, and idempotent in its inputs.
pub fn resolve_net(drivers: &[State]) -> State {
    if drivers.is_empty() {
        return State::HiZ;
    }

    let mut has_zero = false;
    let mut has_one = false;
    let mut has_unknown = false;

    for &state in drivers {
        match state {
            State::Conflict => return State::Conflict,
            State::Zero => has_zero = true,
            State::One => has_one = true,
            State::Unknown => has_unknown = true,
            State::HiZ => {} // HiZ doesn't drive the net
        }
    }

    if has_zero && has_one {
        State::Conflict
    } else if has_one {
        State::One
    } else if has_zero {
        State::Zero
    } else if has_unknown {
        State::Unknown
    } else {
        State::HiZ
    }
}
