//! The processor state at the time an exception was taken.

use serde::Serialize;

use crate::{
    exception_handling::{
        fault_status::{FaultStatusBlock, Icsr},
        stacking::FrameLayout,
    },
    registers::{CoreRegister, RegisterSet},
};

/// A snapshot of the processor state at fault time.
///
/// The core registers are those of the interrupted context: R0-R3, R12, LR, PC and
/// the PSR come from the stacked exception frame, R4-R11 from the register file and
/// SP is the stack pointer before the frame was pushed.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExceptionContext {
    pub r0: u32,
    pub r1: u32,
    pub r2: u32,
    pub r3: u32,
    pub r4: u32,
    pub r5: u32,
    pub r6: u32,
    pub r7: u32,
    pub r8: u32,
    pub r9: u32,
    pub r10: u32,
    pub r11: u32,
    pub r12: u32,
    pub sp: u32,
    pub lr: u32,
    pub pc: u32,
    pub psr: u32,

    pub icsr: u32,
    pub shcsr: u32,
    /// MemManage fault status, byte 0 of CFSR.
    pub mmfsr: u32,
    /// BusFault status, byte 1 of CFSR.
    pub bfsr: u32,
    /// UsageFault status, bits 31:16 of CFSR.
    pub ufsr: u32,
    pub hfsr: u32,
    pub dfsr: u32,
    pub mmar: u32,
    pub bfar: u32,
    pub afsr: u32,
    pub sfsr: u32,
    pub sfar: u32,
}

impl ExceptionContext {
    /// All fields with their display names, in the order they are listed in the
    /// register dump.
    pub fn fields(&self) -> [(&'static str, u32); 29] {
        [
            ("R0", self.r0),
            ("R1", self.r1),
            ("R2", self.r2),
            ("R3", self.r3),
            ("R4", self.r4),
            ("R5", self.r5),
            ("R6", self.r6),
            ("R7", self.r7),
            ("R8", self.r8),
            ("R9", self.r9),
            ("R10", self.r10),
            ("R11", self.r11),
            ("R12", self.r12),
            ("SP", self.sp),
            ("LR", self.lr),
            ("PC", self.pc),
            ("PSR", self.psr),
            ("ICSR", self.icsr),
            ("SHCSR", self.shcsr),
            ("MMFSR", self.mmfsr),
            ("BFSR", self.bfsr),
            ("UFSR", self.ufsr),
            ("HFSR", self.hfsr),
            ("DFSR", self.dfsr),
            ("MMAR", self.mmar),
            ("BFAR", self.bfar),
            ("AFSR", self.afsr),
            ("SFSR", self.sfsr),
            ("SFAR", self.sfar),
        ]
    }

    /// Fill in the hardware stacked registers, in stack order
    /// (R0, R1, R2, R3, R12, LR, PC, xPSR).
    pub fn apply_stacked_frame(&mut self, frame: [u32; 8]) {
        let [r0, r1, r2, r3, r12, lr, pc, psr] = frame;
        self.r0 = r0;
        self.r1 = r1;
        self.r2 = r2;
        self.r3 = r3;
        self.r12 = r12;
        self.lr = lr;
        self.pc = pc;
        self.psr = psr;
    }

    /// Fill in R4-R11, which are not stacked on exception entry.
    pub fn apply_callee_saved(&mut self, registers: [u32; 8]) {
        let [r4, r5, r6, r7, r8, r9, r10, r11] = registers;
        self.r4 = r4;
        self.r5 = r5;
        self.r6 = r6;
        self.r7 = r7;
        self.r8 = r8;
        self.r9 = r9;
        self.r10 = r10;
        self.r11 = r11;
    }

    /// Fill in the fault status block. CFSR is split into MMFSR, BFSR and UFSR here.
    pub fn apply_fault_status(&mut self, block: &FaultStatusBlock) {
        self.shcsr = block.shcsr;
        self.mmfsr = block.cfsr.mmfsr().into();
        self.bfsr = block.cfsr.bfsr().into();
        self.ufsr = block.cfsr.ufsr().into();
        self.hfsr = block.hfsr;
        self.dfsr = block.dfsr;
        self.mmar = block.mmfar;
        self.bfar = block.bfar;
        self.afsr = block.afsr;
    }

    /// Fill in SFSR and SFAR.
    pub fn apply_secure_fault_status(&mut self, words: [u32; 2]) {
        let [sfsr, sfar] = words;
        self.sfsr = sfsr;
        self.sfar = sfar;
    }

    /// The exception number as reported by ICSR.VECTACTIVE, truncated to 8 bits.
    pub fn exception_number(&self) -> u32 {
        Icsr(self.icsr).vect_active()
    }

    /// The registers staged for a stack unwinder: R0-R12, SP, LR, PC and xPSR.
    pub fn staged_registers(&self) -> RegisterSet {
        [
            (CoreRegister::R0, self.r0),
            (CoreRegister::R1, self.r1),
            (CoreRegister::R2, self.r2),
            (CoreRegister::R3, self.r3),
            (CoreRegister::R4, self.r4),
            (CoreRegister::R5, self.r5),
            (CoreRegister::R6, self.r6),
            (CoreRegister::R7, self.r7),
            (CoreRegister::R8, self.r8),
            (CoreRegister::R9, self.r9),
            (CoreRegister::R10, self.r10),
            (CoreRegister::R11, self.r11),
            (CoreRegister::R12, self.r12),
            (CoreRegister::Sp, self.sp),
            (CoreRegister::Lr, self.lr),
            (CoreRegister::Pc, self.pc),
            (CoreRegister::Xpsr, self.psr),
        ]
        .into_iter()
        .collect()
    }
}

/// A block of target memory that could not be read while capturing the context.
///
/// The fields backed by the block keep the value 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldReadFailure {
    /// The context fields which depend on the block, e.g. `"R0-R3, R12, LR, PC, PSR"`.
    pub fields: &'static str,
    /// Start address of the failed read.
    pub address: u32,
    /// The error reported by the debug host.
    pub message: String,
}

impl std::fmt::Display for FieldReadFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Failed to read {} at {:#010x}: {}",
            self.fields, self.address, self.message
        )
    }
}

/// The result of a successful capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapturedException {
    /// The reconstructed context.
    pub context: ExceptionContext,
    /// Blocks that could not be read; empty if the context is complete.
    pub failures: Vec<FieldReadFailure>,
    /// The frame layout that was used to find the stacked frame.
    pub layout: FrameLayout,
}
