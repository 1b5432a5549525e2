//! Core registers of a Cortex-M target, as named by the debug host, and the
//! [`RegisterSet`] handed to a stack unwinder.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A core register which can be read from, or staged for, a halted Cortex-M core.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CoreRegister {
    /// General purpose register R0.
    R0,
    /// General purpose register R1.
    R1,
    /// General purpose register R2.
    R2,
    /// General purpose register R3.
    R3,
    /// General purpose register R4.
    R4,
    /// General purpose register R5.
    R5,
    /// General purpose register R6.
    R6,
    /// General purpose register R7.
    R7,
    /// General purpose register R8.
    R8,
    /// General purpose register R9.
    R9,
    /// General purpose register R10.
    R10,
    /// General purpose register R11.
    R11,
    /// General purpose register R12.
    R12,
    /// The current stack pointer (R13).
    #[serde(rename = "SP", alias = "R13")]
    Sp,
    /// The link register (R14).
    #[serde(rename = "LR", alias = "R14")]
    Lr,
    /// The program counter (R15).
    #[serde(rename = "PC", alias = "R15")]
    Pc,
    /// Combined program status register.
    #[serde(rename = "xPSR", alias = "XPSR")]
    Xpsr,
    /// Main stack pointer.
    #[serde(rename = "MSP")]
    Msp,
    /// Process stack pointer.
    #[serde(rename = "PSP")]
    Psp,
    /// The CONTROL special register.
    #[serde(rename = "CONTROL")]
    Control,
}

impl CoreRegister {
    /// The name the debug host uses for this register.
    pub const fn name(self) -> &'static str {
        match self {
            CoreRegister::R0 => "R0",
            CoreRegister::R1 => "R1",
            CoreRegister::R2 => "R2",
            CoreRegister::R3 => "R3",
            CoreRegister::R4 => "R4",
            CoreRegister::R5 => "R5",
            CoreRegister::R6 => "R6",
            CoreRegister::R7 => "R7",
            CoreRegister::R8 => "R8",
            CoreRegister::R9 => "R9",
            CoreRegister::R10 => "R10",
            CoreRegister::R11 => "R11",
            CoreRegister::R12 => "R12",
            CoreRegister::Sp => "SP",
            CoreRegister::Lr => "LR",
            CoreRegister::Pc => "PC",
            CoreRegister::Xpsr => "xPSR",
            CoreRegister::Msp => "MSP",
            CoreRegister::Psp => "PSP",
            CoreRegister::Control => "CONTROL",
        }
    }
}

impl fmt::Display for CoreRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Callee saved registers. These are not stacked by hardware on exception entry,
/// so their exception time value is still in the register file.
pub static CALLEE_SAVED_REGISTERS: [CoreRegister; 8] = [
    CoreRegister::R4,
    CoreRegister::R5,
    CoreRegister::R6,
    CoreRegister::R7,
    CoreRegister::R8,
    CoreRegister::R9,
    CoreRegister::R10,
    CoreRegister::R11,
];

/// A set of register values staged for a stack unwinder.
///
/// The set is an ordinary value: it is built from an exception context, can be
/// modified (e.g. to retry unwinding with a different PC) and is dropped when the
/// unwinder is done. Nothing is written back to the target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegisterSet(BTreeMap<CoreRegister, u32>);

impl RegisterSet {
    /// Create an empty register set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the staged value of `register`, if any.
    pub fn get(&self, register: CoreRegister) -> Option<u32> {
        self.0.get(&register).copied()
    }

    /// Stage `value` for `register`, replacing an earlier value.
    pub fn set(&mut self, register: CoreRegister, value: u32) {
        self.0.insert(register, value);
    }

    /// Iterate over the staged registers, ordered by register.
    pub fn iter(&self) -> impl Iterator<Item = (CoreRegister, u32)> + '_ {
        self.0.iter().map(|(register, value)| (*register, *value))
    }

    /// The number of staged registers.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no register is staged.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(CoreRegister, u32)> for RegisterSet {
    fn from_iter<T: IntoIterator<Item = (CoreRegister, u32)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Format a 32 bit value as `0x` followed by 8 zero padded hex digits.
pub fn padded_hex(value: u32) -> String {
    format!("{value:#010x}")
}
