//! Common protocol types.

use std::fmt;

/// Handle of a registered resource.
///
/// Handles are dense, assigned from 0 upward, and stay valid for the life of
/// the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceHandle(pub u16);

impl ResourceHandle {
    /// Create a handle from its raw value.
    pub const fn new(raw: u16) -> Self {
        ResourceHandle(raw)
    }

    /// The raw handle value.
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// The handle as a slot index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pin configuration requested by a `mode` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    /// Floating input.
    Input,
    /// Push-pull output.
    Output,
    /// Input with the internal pull-up enabled.
    InputPullup,
}

impl PinMode {
    /// Literal token used on the wire.
    pub fn token(&self) -> &'static str {
        match self {
            PinMode::Input => "input",
            PinMode::Output => "output",
            PinMode::InputPullup => "input_pullup",
        }
    }

    /// Upper-case name used in replies to the peer.
    pub fn label(&self) -> &'static str {
        match self {
            PinMode::Input => "INPUT",
            PinMode::Output => "OUTPUT",
            PinMode::InputPullup => "INPUT_PULLUP",
        }
    }

    /// Match a literal mode token. `input_pullup` is checked before `input`.
    pub fn from_token(token: &str) -> Option<PinMode> {
        match token {
            "input_pullup" => Some(PinMode::InputPullup),
            "output" => Some(PinMode::Output),
            "input" => Some(PinMode::Input),
            _ => None,
        }
    }

    /// Map the numeric board codes (0 input, 1 output, 2 input_pullup).
    pub fn from_code(code: i32) -> Option<PinMode> {
        match code {
            0 => Some(PinMode::Input),
            1 => Some(PinMode::Output),
            2 => Some(PinMode::InputPullup),
            _ => None,
        }
    }
}

impl fmt::Display for PinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
