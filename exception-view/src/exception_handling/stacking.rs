//! Locating the exception stack frame.
//!
//! - Section B1.5.6, ARMv7-M Architecture Reference Manual
//! - Section B3.19, ARMv8-M Architecture Reference Manual

use bitfield::bitfield;
use serde::{Deserialize, Serialize};

use crate::{registers::CoreRegister, Error};

/// Registers which are stored on the stack when an exception occurs, in stack order.
pub static EXCEPTION_STACK_REGISTERS: [CoreRegister; 8] = [
    CoreRegister::R0,
    CoreRegister::R1,
    CoreRegister::R2,
    CoreRegister::R3,
    CoreRegister::R12,
    CoreRegister::Lr,
    CoreRegister::Pc,
    CoreRegister::Xpsr,
];

/// Words in the basic exception stack frame.
pub const BASIC_FRAME_WORDS: u32 = 8;

/// Words added to the basic frame when the floating-point context is stacked
/// (S0-S15, FPSCR and one reserved word for alignment).
pub const EXTENDED_FRAME_EXTRA_WORDS: u32 = 18;

bitfield! {
    /// xPSR - combined view of the APSR, EPSR and IPSR registers.
    /// This is an incomplete/selective mapping of the xPSR register.
    #[derive(Copy, Clone)]
    pub struct Xpsr(u32);
    impl Debug;
    pub exception_number, _: 8, 0;
}

impl Xpsr {
    /// Whether the IPSR names an exception that can be decoded.
    ///
    /// Thread mode (0), the transitory reset value (1) and the reserved
    /// exception numbers 8 to 10 are not interpretable.
    pub fn has_active_exception(&self) -> bool {
        !matches!(self.exception_number(), 0 | 1 | 8..=10)
    }
}

bitfield! {
    /// The EXC_RETURN value (The value of the link address register) is used to
    /// determine the stack to return to when returning from an exception.
    #[derive(Copy, Clone)]
    pub struct ExcReturn(u32);
    impl Debug;
    /// If the value is 0xFF, then this is a valid EXC_RETURN value.
    pub prefix, _: 31, 24;
    /// Indicates whether to restore registers from the secure stack or the non-secure stack.
    pub use_secure_stack, _: 6;
    /// Bit [4] is 0 if stack space is the extended frame that includes FPU registers.
    pub use_standard_stackframe, _: 4;
    /// Indicates which stack pointer the exception frame resides on (0 = MSP, 1 = PSP).
    pub stack_pointer_selection, _: 2;
}

impl ExcReturn {
    /// Whether LR holds an EXC_RETURN value at all.
    pub fn is_exc_return(&self) -> bool {
        self.prefix() == 0xFF
    }

    /// Whether the interrupted context used the process stack.
    ///
    /// Values which are not EXC_RETURN values are treated as main stack.
    pub fn uses_process_stack(&self) -> bool {
        self.is_exc_return() && self.stack_pointer_selection()
    }

    /// Whether the floating-point context was stacked with the basic frame.
    pub fn has_fp_context(&self) -> bool {
        self.is_exc_return() && !self.use_standard_stackframe()
    }

    /// Size in bytes of the stack frame pushed on exception entry.
    pub fn frame_size(&self) -> u32 {
        let words = if self.has_fp_context() {
            BASIC_FRAME_WORDS + EXTENDED_FRAME_EXTRA_WORDS
        } else {
            BASIC_FRAME_WORDS
        };
        words * 4
    }

    /// The stack pointer of the interrupted context, given the address of the stacked frame.
    pub fn pre_exception_stack_pointer(&self, frame_base: u32) -> u32 {
        frame_base.wrapping_add(self.frame_size())
    }
}

bitfield! {
    /// CONTROL special register.
    #[derive(Copy, Clone)]
    pub struct Control(u32);
    impl Debug;
    /// Stack pointer select in thread mode (0 = MSP, 1 = PSP).
    pub spsel, _: 1;
}

/// The convention used to find the exception frame on the target.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FrameLayout {
    /// Pick [`FrameLayout::Armv8mSecure`] if the core reports the secure state, and
    /// [`FrameLayout::Armv7m`] otherwise.
    #[default]
    Auto,
    /// A core without the security extension. The frame is on the process stack or on
    /// the current (main) stack, as selected by EXC_RETURN.
    Armv7m,
    /// An ARMv8-M core with the security extension, inspected from the secure image.
    Armv8mSecure,
}

/// Where the stacked exception frame can be found.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StackLocation {
    /// The frame is on the stack the given register points to.
    Register(CoreRegister),
    /// The frame is on a non-secure stack. The secure fault handler copied MSP_NS,
    /// PSP_NS and CONTROL_NS into R0, R1 and R2.
    NonSecureCopy,
}

impl FrameLayout {
    /// Determine where the stacked frame is for an exception with `exception_number`,
    /// taken with `exc_return` in LR.
    ///
    /// `Auto` must be resolved before calling this; it is treated like `Armv7m`.
    pub fn stack_location(
        self,
        exc_return: ExcReturn,
        exception_number: u32,
    ) -> Result<StackLocation, Error> {
        match self {
            FrameLayout::Auto | FrameLayout::Armv7m => {
                Ok(StackLocation::Register(if exc_return.uses_process_stack() {
                    CoreRegister::Psp
                } else {
                    CoreRegister::Sp
                }))
            }
            FrameLayout::Armv8mSecure => {
                if exc_return.use_secure_stack() {
                    Ok(StackLocation::Register(
                        if exc_return.stack_pointer_selection() {
                            CoreRegister::Psp
                        } else {
                            CoreRegister::Msp
                        },
                    ))
                } else if exception_number < 15 {
                    Ok(StackLocation::NonSecureCopy)
                } else {
                    // The banked non-secure stack pointers are only handed over by
                    // the secure fault handlers.
                    Err(Error::UnsupportedContext { exception_number })
                }
            }
        }
    }
}

/// Pick the non-secure stack pointer that held the exception frame.
pub fn non_secure_stack_pointer(msp_ns: u32, psp_ns: u32, control_ns: u32) -> u32 {
    if Control(control_ns).spsel() {
        psp_ns
    } else {
        msp_ns
    }
}
