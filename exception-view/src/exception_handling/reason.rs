//! Classification of the active exception and decoding of the fault status registers.

use crate::{
    context::ExceptionContext,
    exception_handling::fault_status::{Hfsr, Sfsr},
    registers::padded_hex,
};

/// Decode the exception number.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExceptionReason {
    /// A non-maskable interrupt has been triggered.
    NonMaskableInterrupt,
    /// A hard fault has been triggered.
    HardFault,
    /// A memory management fault has been triggered.
    MemoryManagementFault,
    /// A bus fault has been triggered.
    BusFault,
    /// A usage fault has been triggered.
    UsageFault,
    /// A secure fault has been triggered (ARMv8-M with the security extension).
    SecureFault,
    /// A SuperVisor call has been triggered.
    SVCall,
    /// A debug monitor fault has been triggered.
    DebugMonitor,
    /// Reserved by the ISA, and not usable by software.
    Reserved(u32),
    /// Any other exception, identified by its handler in the vector table.
    Interrupt(u32),
}

impl From<u32> for ExceptionReason {
    fn from(exception: u32) -> Self {
        match exception {
            2 => ExceptionReason::NonMaskableInterrupt,
            3 => ExceptionReason::HardFault,
            4 => ExceptionReason::MemoryManagementFault,
            5 => ExceptionReason::BusFault,
            6 => ExceptionReason::UsageFault,
            7 => ExceptionReason::SecureFault,
            8..=10 | 13 => ExceptionReason::Reserved(exception),
            11 => ExceptionReason::SVCall,
            12 => ExceptionReason::DebugMonitor,
            other => ExceptionReason::Interrupt(other),
        }
    }
}

/// One row of a priority table: if `mask` is set in the status register, the cause
/// is `label`, followed by the output of `detail` if there is one.
struct Cause {
    mask: u32,
    label: &'static str,
    detail: Option<fn(&ExceptionContext) -> String>,
}

impl Cause {
    const fn new(mask: u32, label: &'static str) -> Self {
        Self {
            mask,
            label,
            detail: None,
        }
    }

    const fn with_detail(
        mask: u32,
        label: &'static str,
        detail: fn(&ExceptionContext) -> String,
    ) -> Self {
        Self {
            mask,
            label,
            detail: Some(detail),
        }
    }

    fn render(&self, context: &ExceptionContext) -> String {
        match self.detail {
            Some(detail) => format!("{}{}", self.label, detail(context)),
            None => self.label.to_string(),
        }
    }
}

fn mmar_data_access(context: &ExceptionContext) -> String {
    format!("Data Access Error. Address = {:#x}", context.mmar)
}

fn mmar_instruction_fetch(context: &ExceptionContext) -> String {
    format!("Instruction Fetch Error. Address = {:#x}", context.mmar)
}

fn bfar_data_access(context: &ExceptionContext) -> String {
    format!("Data Access Error. Address = {:#x}", context.bfar)
}

fn invalid_entry_point(context: &ExceptionContext) -> String {
    format!("(Jump to invalid SG address: {})", padded_hex(context.pc))
}

/// MemManage causes, most severe first.
static MEM_MANAGE_CAUSES: [Cause; 4] = [
    Cause::new(0x10, "MSTKERR"),
    Cause::new(0x08, "MUNSTKERR"),
    Cause::with_detail(0x02, "DACCVIOL ", mmar_data_access),
    Cause::with_detail(0x01, "IACCVIOL ", mmar_instruction_fetch),
];

/// BusFault causes, most severe first.
static BUS_FAULT_CAUSES: [Cause; 5] = [
    Cause::new(0x10, "STKERR"),
    Cause::new(0x08, "UNSTKERR"),
    Cause::new(0x04, "IMPRECISERR"),
    Cause::with_detail(0x02, "PRECISERR.", bfar_data_access),
    Cause::new(0x01, "IBUSERR"),
];

/// UsageFault causes, most specific first.
static USAGE_FAULT_CAUSES: [Cause; 7] = [
    Cause::new(0x0001, "UNDEFINSTR"),
    Cause::new(0x0002, "INVSTATE"),
    Cause::new(0x0004, "INVPC"),
    Cause::new(0x0008, "NOCP"),
    Cause::new(0x0010, "STKOF"),
    Cause::new(0x0100, "UNALIGNED"),
    Cause::new(0x0200, "DIVBYZERO"),
];

/// DebugMonitor causes, most specific first.
static DEBUG_EVENT_CAUSES: [Cause; 5] = [
    Cause::new(0x10, "EXTERNAL"),
    Cause::new(0x08, "VCATCH"),
    Cause::new(0x04, "DWTTRAP"),
    Cause::new(0x02, "BKPT"),
    Cause::new(0x01, "HALTED"),
];

/// SecureFault causes. Unlike the other tables every matching row is reported.
static SECURE_FAULT_CAUSES: [Cause; 7] = [
    Cause::new(0x80, " LSERR"),
    Cause::new(0x20, " LSPERR"),
    Cause::new(0x10, " INVTRAN"),
    Cause::new(0x08, " AUVIOL"),
    Cause::new(0x04, " INVERR"),
    Cause::new(0x02, " INVIS"),
    Cause::with_detail(0x01, " INVEP ", invalid_entry_point),
];

/// Report the first cause of `table` set in `status`, or `Unknown`.
///
/// Returns an empty string if `status` is zero.
fn decode_prioritized(
    prefix: &str,
    status: u32,
    table: &[Cause],
    context: &ExceptionContext,
) -> String {
    if status == 0 {
        return String::new();
    }

    let cause = table
        .iter()
        .find(|cause| status & cause.mask != 0)
        .map(|cause| cause.render(context))
        .unwrap_or_else(|| "Unknown".to_string());

    format!("{prefix}{cause}")
}

/// Decode MMFSR.
pub fn mem_manage_fault_description(context: &ExceptionContext) -> String {
    decode_prioritized("MEMFAULT: ", context.mmfsr, &MEM_MANAGE_CAUSES, context)
}

/// Decode BFSR.
pub fn bus_fault_description(context: &ExceptionContext) -> String {
    decode_prioritized("BUSFAULT: ", context.bfsr, &BUS_FAULT_CAUSES, context)
}

/// Decode UFSR.
pub fn usage_fault_description(context: &ExceptionContext) -> String {
    decode_prioritized("USAGE: ", context.ufsr, &USAGE_FAULT_CAUSES, context)
}

/// Decode DFSR.
pub fn debug_event_description(context: &ExceptionContext) -> String {
    decode_prioritized("DEBUG: ", context.dfsr, &DEBUG_EVENT_CAUSES, context)
}

/// Decode SFSR. Several secure fault causes can be reported at the same time.
pub fn secure_fault_description(context: &ExceptionContext) -> String {
    let sfsr = context.sfsr;
    if sfsr == 0 {
        return String::new();
    }

    let mut description = "SECFAULT:".to_string();
    for cause in SECURE_FAULT_CAUSES
        .iter()
        .filter(|cause| sfsr & cause.mask != 0)
    {
        description.push_str(&cause.render(context));
    }

    if Sfsr(sfsr).secure_fault_address_valid() {
        description.push_str(" Access error at address = ");
        description.push_str(&padded_hex(context.sfar));
    }

    description
}

/// Decode HFSR, following escalated and debug faults into their own status registers.
pub fn hard_fault_description(context: &ExceptionContext) -> String {
    let hfsr = Hfsr(context.hfsr);
    let cause = if hfsr.forced() {
        let sources = [
            usage_fault_description(context),
            bus_fault_description(context),
            mem_manage_fault_description(context),
        ];
        format!("FORCED: {}", sources.concat())
    } else if hfsr.debug_event() {
        format!("DEBUGEVT: {}", debug_event_description(context))
    } else if hfsr.vector_table_read_fault() {
        "VECTBL".to_string()
    } else {
        "Unknown".to_string()
    };

    format!("Hard Fault: {cause}")
}

impl ExceptionReason {
    /// The exception number whose vector has to be resolved to describe this reason.
    pub fn vector_number(&self) -> Option<u32> {
        match self {
            ExceptionReason::Interrupt(number) => Some(*number),
            _ => None,
        }
    }

    /// Describe the exception, using the fault status registers of `context`.
    ///
    /// `isr_name` is only called for [`ExceptionReason::Interrupt`], to name the handler
    /// installed for the exception number.
    pub fn expanded_description(
        &self,
        context: &ExceptionContext,
        isr_name: impl FnOnce(u32) -> String,
    ) -> String {
        match self {
            ExceptionReason::NonMaskableInterrupt => "NMI Exception".to_string(),
            ExceptionReason::HardFault => hard_fault_description(context),
            ExceptionReason::MemoryManagementFault => mem_manage_fault_description(context),
            ExceptionReason::BusFault => bus_fault_description(context),
            ExceptionReason::UsageFault => usage_fault_description(context),
            ExceptionReason::SecureFault => secure_fault_description(context),
            ExceptionReason::SVCall => format!("SV Call Exception, pc = {:x}", context.pc),
            ExceptionReason::DebugMonitor => debug_event_description(context),
            ExceptionReason::Reserved(number) => format!("Reserved vector: {number}"),
            ExceptionReason::Interrupt(number) => {
                format!("IRQ Number: {number} ({})", isr_name(*number))
            }
        }
    }
}

/// Classify the exception recorded in `context` (ICSR.VECTACTIVE) and describe its cause.
pub fn classify_fault(
    context: &ExceptionContext,
    isr_name: impl FnOnce(u32) -> String,
) -> String {
    ExceptionReason::from(context.exception_number()).expanded_description(context, isr_name)
}
