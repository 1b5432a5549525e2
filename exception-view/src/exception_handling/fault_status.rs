//! System control block registers used to decode an exception.
//!
//! - Section B3.2, ARMv7-M Architecture Reference Manual
//! - Section D1.2, ARMv8-M Architecture Reference Manual

use crate::memory_mapped_bitfield_register;

memory_mapped_bitfield_register! {
    /// ICSR - Interrupt Control and State Register
    pub struct Icsr(u32);
    0xE000_ED04, "ICSR",
    impl From;
    /// The exception number of the currently active exception, truncated to the low byte.
    pub vect_active, _: 7, 0;
}

memory_mapped_bitfield_register! {
    /// VTOR - Vector Table Offset Register
    pub struct Vtor(u32);
    0xE000_ED08, "VTOR",
    impl From;
}

memory_mapped_bitfield_register! {
    /// SHCSR - System Handler Control and State Register
    ///
    /// First register of the fault status block, see [`FAULT_STATUS_BLOCK_WORDS`].
    pub struct Shcsr(u32);
    0xE000_ED24, "SHCSR",
    impl From;
}

memory_mapped_bitfield_register! {
    /// CFSR - Configurable Fault Status Register (`UFSR[31:16]`, `BFSR[15:8]`, `MMFSR[7:0]`)
    pub struct Cfsr(u32);
    0xE000_ED28, "CFSR",
    impl From;
    /// UsageFault Status Register.
    pub u16, ufsr, _: 31, 16;
    /// BusFault Status Register.
    pub u8, bfsr, _: 15, 8;
    /// MemManage Fault Status Register.
    pub u8, mmfsr, _: 7, 0;
}

memory_mapped_bitfield_register! {
    /// HFSR - HardFault Status Register
    pub struct Hfsr(u32);
    0xE000_ED2C, "HFSR",
    impl From;
    /// The HardFault was caused by a debug event.
    pub debug_event, _: 31;
    /// A configurable fault was escalated to a HardFault.
    pub forced, _: 30;
    /// A bus fault occurred while reading the vector table.
    pub vector_table_read_fault, _: 1;
}

memory_mapped_bitfield_register! {
    /// SFSR - Secure Fault Status Register
    ///
    /// Only present on ARMv8-M cores implementing the security extension.
    pub struct Sfsr(u32);
    0xE000_EDE4, "SFSR",
    impl From;
    /// SFAR holds a valid address.
    pub secure_fault_address_valid, _: 6;
}

memory_mapped_bitfield_register! {
    /// DSCSR - Debug Security Control and Status Register
    pub struct Dscsr(u32);
    0xE000_EE08, "DSCSR",
    impl From;
    /// Current domain Secure: the core is executing in the Secure state.
    pub cds, _: 16;
}

/// Number of words read at [`Shcsr::ADDRESS`]: SHCSR, CFSR, HFSR, DFSR, MMFAR, BFAR and AFSR.
pub const FAULT_STATUS_BLOCK_WORDS: usize = 7;

/// Number of words read at [`Sfsr::ADDRESS`]: SFSR and SFAR.
pub const SECURE_FAULT_BLOCK_WORDS: usize = 2;

/// The NVIC fault status registers, as read in one block starting at SHCSR.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FaultStatusBlock {
    pub shcsr: u32,
    pub cfsr: Cfsr,
    pub hfsr: u32,
    pub dfsr: u32,
    pub mmfar: u32,
    pub bfar: u32,
    pub afsr: u32,
}

impl From<[u32; FAULT_STATUS_BLOCK_WORDS]> for FaultStatusBlock {
    fn from(words: [u32; FAULT_STATUS_BLOCK_WORDS]) -> Self {
        let [shcsr, cfsr, hfsr, dfsr, mmfar, bfar, afsr] = words;
        Self {
            shcsr,
            cfsr: Cfsr(cfsr),
            hfsr,
            dfsr,
            mmfar,
            bfar,
            afsr,
        }
    }
}

impl PartialEq for Cfsr {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Cfsr {}
