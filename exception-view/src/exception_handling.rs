//! Reconstruction of the exception context of a halted Cortex-M core.
//!
//! [`AsyncExceptionDecoder`] performs the sequence of reads on an [`AsyncDebugHost`].
//! [`ExceptionDecoder`] runs it on a synchronous [`DebugHost`]. What is done with the
//! values lives in [`stacking`], [`fault_status`], [`reason`] and in [`ContextBuilder`].

pub mod fault_status;
pub mod reason;
pub mod stacking;

use std::future::Future;
use std::pin::pin;
use std::task::{Context, Poll, Waker};

use crate::{
    call_stack::render_call_stack,
    context::{CapturedException, ExceptionContext, FieldReadFailure},
    host::{AsyncDebugHost, DebugHost, SyncHost, Unwinder},
    logs::{log_error_row, split_log_buffer, LogDomain, MAX_LOG_BYTES},
    registers::{CoreRegister, CALLEE_SAVED_REGISTERS},
    view::{capture_error_text, exception_info_rows, CallStackFrame, ExceptionInfo, LogLine},
    Error, MemoryMappedRegister,
};

use fault_status::{
    Dscsr, FaultStatusBlock, Icsr, Sfsr, Shcsr, Vtor, FAULT_STATUS_BLOCK_WORDS,
    SECURE_FAULT_BLOCK_WORDS,
};
use reason::ExceptionReason;
use stacking::{non_secure_stack_pointer, ExcReturn, FrameLayout, StackLocation, Xpsr};

const STACKED_FIELDS: &str = "R0-R3, R12, LR, PC, PSR";
const FAULT_STATUS_FIELDS: &str = "SHCSR, MMFSR, BFSR, UFSR, HFSR, DFSR, MMAR, BFAR, AFSR";
const SECURE_FAULT_FIELDS: &str = "SFSR, SFAR";

/// Name used for an interrupt handler which cannot be resolved to a symbol.
pub const UNKNOWN_HANDLER: &str = "unknown";

/// Collects the values read from the target into an [`ExceptionContext`].
///
/// Reads of target memory are allowed to fail: the affected fields stay 0 and the
/// failure is recorded.
#[derive(Debug)]
pub struct ContextBuilder {
    context: ExceptionContext,
    failures: Vec<FieldReadFailure>,
    layout: FrameLayout,
}

impl ContextBuilder {
    /// Start a capture using the stacked frame found through `layout`.
    pub fn new(layout: FrameLayout) -> Self {
        Self {
            context: ExceptionContext::default(),
            failures: Vec::new(),
            layout,
        }
    }

    fn record(&mut self, fields: &'static str, address: u32, result: Result<(), Error>) {
        if let Err(error) = result {
            tracing::warn!("Failed to read {fields} at {address:#010x}: {error}");
            self.failures.push(FieldReadFailure {
                fields,
                address,
                message: error.to_string(),
            });
        }
    }

    /// Store the stacked frame read from `frame_base`.
    pub fn stacked_frame(&mut self, frame_base: u32, result: Result<[u32; 8], Error>) {
        let result = result.map(|frame| self.context.apply_stacked_frame(frame));
        self.record(STACKED_FIELDS, frame_base, result);
    }

    /// Store R4-R11 as read from the register file.
    pub fn callee_saved(&mut self, registers: [u32; 8]) {
        self.context.apply_callee_saved(registers);
    }

    /// Store the stack pointer of the interrupted context.
    pub fn stack_pointer(&mut self, exc_return: ExcReturn, frame_base: u32) {
        self.context.sp = exc_return.pre_exception_stack_pointer(frame_base);
    }

    /// Store ICSR.
    pub fn icsr(&mut self, result: Result<u32, Error>) {
        let result = result.map(|icsr| self.context.icsr = icsr);
        self.record(Icsr::NAME, Icsr::ADDRESS, result);
    }

    /// Store the fault status block read at SHCSR.
    pub fn fault_status(&mut self, result: Result<[u32; FAULT_STATUS_BLOCK_WORDS], Error>) {
        let result = result.map(|words| {
            self.context
                .apply_fault_status(&FaultStatusBlock::from(words))
        });
        self.record(FAULT_STATUS_FIELDS, Shcsr::ADDRESS, result);
    }

    /// Store SFSR and SFAR.
    pub fn secure_fault_status(&mut self, result: Result<[u32; SECURE_FAULT_BLOCK_WORDS], Error>) {
        let result = result.map(|words| self.context.apply_secure_fault_status(words));
        self.record(SECURE_FAULT_FIELDS, Sfsr::ADDRESS, result);
    }

    /// Finish the capture.
    pub fn finish(self) -> CapturedException {
        CapturedException {
            context: self.context,
            failures: self.failures,
            layout: self.layout,
        }
    }
}

/// The exception number from xPSR, or [`Error::NoExceptionPending`].
fn active_exception(xpsr: u32) -> Result<u32, Error> {
    let xpsr = Xpsr(xpsr);
    if xpsr.has_active_exception() {
        Ok(xpsr.exception_number())
    } else {
        Err(Error::NoExceptionPending(xpsr.exception_number()))
    }
}

fn layout_for_security_state(secure: Result<bool, Error>) -> FrameLayout {
    match secure {
        Ok(true) => FrameLayout::Armv8mSecure,
        Ok(false) => FrameLayout::Armv7m,
        Err(error) => {
            tracing::debug!("Security state unknown ({error}), assuming an ARMv7-M core");
            FrameLayout::Armv7m
        }
    }
}

fn handler_name(lookup: Result<String, Error>) -> String {
    lookup.unwrap_or_else(|error| {
        tracing::debug!("Interrupt handler lookup failed: {error}");
        UNKNOWN_HANDLER.to_string()
    })
}

fn log_read_len(index: u32) -> usize {
    if index > MAX_LOG_BYTES {
        tracing::warn!("Log buffer index {index} exceeds {MAX_LOG_BYTES} bytes, truncating");
    }
    index.min(MAX_LOG_BYTES) as usize
}

/// Decodes the pending exception of a halted core through a synchronous [`DebugHost`].
///
/// The reads are those of [`AsyncExceptionDecoder`], driven to completion without an
/// executor since a synchronous host never suspends.
pub struct ExceptionDecoder<H> {
    inner: AsyncExceptionDecoder<SyncHost<H>>,
}

impl<H: DebugHost> ExceptionDecoder<H> {
    /// Create a decoder using `layout` to find the stacked frame.
    pub fn new(host: H, layout: FrameLayout) -> Self {
        Self {
            inner: AsyncExceptionDecoder::new(SyncHost(host), layout),
        }
    }

    /// Whether the "Exception Info" view includes the register dump. Enabled by default.
    pub fn show_registers(self, show_registers: bool) -> Self {
        Self {
            inner: self.inner.show_registers(show_registers),
        }
    }

    /// Access the debug host.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.inner.host_mut().0
    }

    /// Release the debug host.
    pub fn into_host(self) -> H {
        self.inner.into_host().0
    }

    /// Whether the core is executing in the secure state (DSCSR.CDS).
    pub fn is_secure_state(&mut self) -> Result<bool, Error> {
        complete(self.inner.is_secure_state())
    }

    /// Reconstruct the processor state at the time the active exception was taken.
    ///
    /// Fails with [`Error::NoExceptionPending`] if the core is not handling an exception,
    /// and with [`Error::UnsupportedContext`] if the interrupted stack cannot be located.
    /// Failing memory reads do not abort the capture, see [`CapturedException::failures`].
    pub fn capture_context(&mut self) -> Result<CapturedException, Error> {
        complete(self.inner.capture_context())
    }

    /// Classify the exception of `context` and describe its cause.
    pub fn describe(&mut self, context: &ExceptionContext) -> String {
        complete(self.inner.describe(context))
    }

    /// Build the "Exception Info" view.
    pub fn exception_info(&mut self) -> Vec<ExceptionInfo> {
        complete(self.inner.exception_info())
    }

    /// Build the "Exception Call Stack" view, unwinding with `unwinder`.
    pub fn call_stack(&mut self, unwinder: &mut impl Unwinder) -> Vec<CallStackFrame> {
        complete(self.inner.call_stack(unwinder))
    }

    /// Build the log view of `domain`.
    pub fn logs(&mut self, domain: LogDomain) -> Vec<LogLine> {
        complete(self.inner.logs(domain))
    }
}

/// Poll `future` until it is ready. Only used with hosts that never return `Pending`.
fn complete<F: Future>(future: F) -> F::Output {
    let mut future = pin!(future);
    let mut context = Context::from_waker(Waker::noop());
    loop {
        if let Poll::Ready(output) = future.as_mut().poll(&mut context) {
            return output;
        }
    }
}

/// Decodes the pending exception of a halted core through an [`AsyncDebugHost`].
///
/// [`ExceptionDecoder`] runs the same reads against a synchronous host.
pub struct AsyncExceptionDecoder<H> {
    host: H,
    layout: FrameLayout,
    show_registers: bool,
}

impl<H: AsyncDebugHost> AsyncExceptionDecoder<H> {
    /// Create a decoder using `layout` to find the stacked frame.
    pub fn new(host: H, layout: FrameLayout) -> Self {
        Self {
            host,
            layout,
            show_registers: true,
        }
    }

    /// Whether the "Exception Info" view includes the register dump. Enabled by default.
    pub fn show_registers(mut self, show_registers: bool) -> Self {
        self.show_registers = show_registers;
        self
    }

    /// Access the debug host.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Release the debug host.
    pub fn into_host(self) -> H {
        self.host
    }

    /// Whether the core is executing in the secure state (DSCSR.CDS).
    pub async fn is_secure_state(&mut self) -> Result<bool, Error> {
        let dscsr = Dscsr(self.host.read_word_32(Dscsr::ADDRESS).await?);
        Ok(dscsr.cds())
    }

    async fn resolve_layout(&mut self) -> FrameLayout {
        match self.layout {
            FrameLayout::Auto => {
                let secure = self.is_secure_state().await;
                layout_for_security_state(secure)
            }
            layout => layout,
        }
    }

    async fn read_block<const N: usize>(&mut self, address: u32) -> Result<[u32; N], Error> {
        let mut words = [0; N];
        tracing::debug!("Reading {N} words at {address:#010x}");
        self.host.read_32(address, &mut words).await?;
        Ok(words)
    }

    async fn read_registers<const N: usize>(
        &mut self,
        registers: &[CoreRegister; N],
    ) -> Result<[u32; N], Error> {
        let mut values = [0; N];
        for (value, register) in values.iter_mut().zip(registers) {
            *value = self.host.read_register(*register).await?;
        }
        Ok(values)
    }

    /// Reconstruct the processor state at the time the active exception was taken.
    ///
    /// Fails with [`Error::NoExceptionPending`] if the core is not handling an exception,
    /// and with [`Error::UnsupportedContext`] if the interrupted stack cannot be located.
    /// Failing memory reads do not abort the capture, see [`CapturedException::failures`].
    pub async fn capture_context(&mut self) -> Result<CapturedException, Error> {
        let xpsr = self.host.read_register(CoreRegister::Xpsr).await?;
        let exception_number = active_exception(xpsr)?;

        let layout = self.resolve_layout().await;
        let exc_return = ExcReturn(self.host.read_register(CoreRegister::Lr).await?);
        tracing::debug!(
            "Capturing exception {exception_number} with {exc_return:?} ({layout:?})"
        );

        let frame_base = match layout.stack_location(exc_return, exception_number)? {
            StackLocation::Register(register) => self.host.read_register(register).await?,
            StackLocation::NonSecureCopy => {
                let [msp_ns, psp_ns, control_ns] = self
                    .read_registers(&[CoreRegister::R0, CoreRegister::R1, CoreRegister::R2])
                    .await?;
                non_secure_stack_pointer(msp_ns, psp_ns, control_ns)
            }
        };

        let mut builder = ContextBuilder::new(layout);

        let frame = self.read_block(frame_base).await;
        builder.stacked_frame(frame_base, frame);
        builder.callee_saved(self.read_registers(&CALLEE_SAVED_REGISTERS).await?);
        builder.stack_pointer(exc_return, frame_base);

        let icsr = self.host.read_word_32(Icsr::ADDRESS).await;
        builder.icsr(icsr);
        let fault_status = self.read_block(Shcsr::ADDRESS).await;
        builder.fault_status(fault_status);
        let secure_fault_status = self.read_block(Sfsr::ADDRESS).await;
        builder.secure_fault_status(secure_fault_status);

        Ok(builder.finish())
    }

    async fn vector_handler(&mut self, exception_number: u32) -> String {
        let vector = match self.host.read_word_32(Vtor::ADDRESS).await {
            Ok(vtor) => {
                self.host
                    .read_word_32(vtor.wrapping_add(4 * exception_number))
                    .await
            }
            Err(error) => Err(error),
        };

        match vector {
            Ok(vector) => handler_name(self.host.lookup_symbol_name(vector).await),
            Err(error) => error.to_string(),
        }
    }

    /// Classify the exception of `context` and describe its cause.
    pub async fn describe(&mut self, context: &ExceptionContext) -> String {
        let reason = ExceptionReason::from(context.exception_number());
        let handler = match reason.vector_number() {
            Some(number) => self.vector_handler(number).await,
            None => String::new(),
        };
        reason.expanded_description(context, |_| handler)
    }

    /// Build the "Exception Info" view.
    pub async fn exception_info(&mut self) -> Vec<ExceptionInfo> {
        match self.capture_context().await {
            Ok(captured) => {
                let description = self.describe(&captured.context).await;
                exception_info_rows(&captured, description, self.show_registers)
            }
            Err(error) => vec![capture_error_text(&error).into()],
        }
    }

    /// Build the "Exception Call Stack" view, unwinding with `unwinder`.
    pub async fn call_stack(&mut self, unwinder: &mut impl Unwinder) -> Vec<CallStackFrame> {
        match self.capture_context().await {
            Ok(captured) => render_call_stack(&captured.context, unwinder),
            Err(error) => vec![capture_error_text(&error).into()],
        }
    }

    async fn read_log_buffer(&mut self, domain: LogDomain) -> Result<Vec<u8>, Error> {
        let buffer = self.host.symbol_address(domain.buffer_symbol()).await?;
        let index_address = self.host.symbol_address(domain.index_symbol()).await?;
        let len = log_read_len(self.host.read_word_32(index_address).await?);

        let mut bytes = vec![0; len];
        self.host.read_8(buffer, &mut bytes).await?;
        Ok(bytes)
    }

    /// Build the log view of `domain`.
    pub async fn logs(&mut self, domain: LogDomain) -> Vec<LogLine> {
        match self.read_log_buffer(domain).await {
            Ok(bytes) => split_log_buffer(&bytes),
            Err(error) => vec![log_error_row(domain, &error)],
        }
    }
}

#[cfg(test)]
mod test {
    use super::{
        fault_status::{Dscsr, Icsr, Sfsr, Shcsr},
        stacking::FrameLayout,
        AsyncExceptionDecoder, ExceptionDecoder,
    };
    use crate::{
        logs::LogDomain,
        registers::CoreRegister,
        test::{MockTarget, MockUnwinder},
        view::{ExceptionInfo, NO_EXCEPTION_PENDING},
        MemoryMappedRegister,
    };
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    const PSP: u32 = 0x2000_1000;

    /// A core stopped in the HardFault handler after an escalated undefined instruction
    /// in thread mode, using the process stack.
    fn hard_fault_target() -> MockTarget {
        let mut target = MockTarget::new();
        target.set_register(CoreRegister::Xpsr, 0x0100_0003);
        target.set_register(CoreRegister::Lr, 0xFFFF_FFFD);
        target.set_register(CoreRegister::Sp, 0x2000_7FC0);
        target.set_register(CoreRegister::Psp, PSP);
        for (value, register) in (4..).zip(crate::registers::CALLEE_SAVED_REGISTERS) {
            target.set_register(register, value);
        }

        target.add_word_range(
            PSP,
            &[
                0x10,
                0x11,
                0x12,
                0x13,
                0x1C,
                0x0800_0125,
                0x0800_0200,
                0x2100_0000,
            ],
        );
        // ICSR, VTOR
        target.add_word_range(Icsr::ADDRESS, &[0x0000_0003, 0x0000_0000]);
        target.add_word_range(
            Shcsr::ADDRESS,
            &[0, 0x0001_0000, 0x4000_0000, 0, 0xE000_EDF8, 0xE000_EDF8, 0],
        );
        target.add_word_range(Sfsr::ADDRESS, &[0, 0]);
        target
    }

    fn rows(view: &[ExceptionInfo]) -> String {
        view.iter()
            .map(|row| row.exception_info.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn capture_armv7m_hard_fault() {
        let mut decoder = ExceptionDecoder::new(hard_fault_target(), FrameLayout::Armv7m);

        let captured = decoder.capture_context().unwrap();
        let context = captured.context;

        assert!(captured.failures.is_empty());
        assert_eq!(captured.layout, FrameLayout::Armv7m);
        assert_eq!(context.r0, 0x10);
        assert_eq!(context.r4, 4);
        assert_eq!(context.r11, 11);
        assert_eq!(context.r12, 0x1C);
        assert_eq!(context.pc, 0x0800_0200);
        assert_eq!(context.sp, PSP + 32);
        assert_eq!(context.ufsr, 1);
        assert_eq!(context.mmfsr, 0);
        assert_eq!(context.hfsr, 0x4000_0000);

        assert_eq!(
            decoder.describe(&context),
            "Hard Fault: FORCED: USAGE: UNDEFINSTR"
        );
    }

    #[test]
    fn capture_is_repeatable() {
        let mut decoder = ExceptionDecoder::new(hard_fault_target(), FrameLayout::Armv7m);

        let first = decoder.capture_context().unwrap();
        let second = decoder.capture_context().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn floating_point_frame_moves_the_stack_pointer() {
        let mut target = hard_fault_target();
        target.set_register(CoreRegister::Lr, 0xFFFF_FFED);
        let mut decoder = ExceptionDecoder::new(target, FrameLayout::Armv7m);

        let context = decoder.capture_context().unwrap().context;
        assert_eq!(context.sp, PSP + 26 * 4);
    }

    #[test_case(0)]
    #[test_case(1)]
    #[test_case(8)]
    #[test_case(9)]
    #[test_case(10)]
    fn idle_core_has_no_context(exception_number: u32) {
        let mut target = MockTarget::new();
        target.set_register(CoreRegister::Xpsr, 0x6100_0000 | exception_number);
        let mut decoder = ExceptionDecoder::new(target, FrameLayout::Auto);

        for _ in 0..2 {
            let error = decoder.capture_context().unwrap_err();
            assert!(matches!(error, crate::Error::NoExceptionPending(n) if n == exception_number));
        }

        let view = decoder.exception_info();
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].exception_info, NO_EXCEPTION_PENDING);

        let frames = decoder.call_stack(&mut MockUnwinder::default());
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].frame, NO_EXCEPTION_PENDING);
    }

    #[test]
    fn exception_info_view() {
        let mut decoder = ExceptionDecoder::new(hard_fault_target(), FrameLayout::Armv7m);

        insta::assert_snapshot!(rows(&decoder.exception_info()), @r###"
        Decoded Exception:
        Hard Fault: FORCED: USAGE: UNDEFINSTR
        ---
        Registers:
        R0 = 0x00000010
        R1 = 0x00000011
        R2 = 0x00000012
        R3 = 0x00000013
        R4 = 0x00000004
        R5 = 0x00000005
        R6 = 0x00000006
        R7 = 0x00000007
        R8 = 0x00000008
        R9 = 0x00000009
        R10 = 0x0000000a
        R11 = 0x0000000b
        R12 = 0x0000001c
        SP = 0x20001020
        LR = 0x08000125
        PC = 0x08000200
        PSR = 0x21000000
        ICSR = 0x00000003
        SHCSR = 0x00000000
        MMFSR = 0x00000000
        BFSR = 0x00000000
        UFSR = 0x00000001
        HFSR = 0x40000000
        DFSR = 0x00000000
        MMAR = 0xe000edf8
        BFAR = 0xe000edf8
        AFSR = 0x00000000
        SFSR = 0x00000000
        SFAR = 0x00000000
        "###);
    }

    #[test]
    fn unreadable_stack_is_reported_inline() {
        let mut target = hard_fault_target();
        target.set_register(CoreRegister::Psp, 0x3000_0000);
        let mut decoder =
            ExceptionDecoder::new(target, FrameLayout::Armv7m).show_registers(false);

        let captured = decoder.capture_context().unwrap();
        assert_eq!(captured.context.pc, 0);
        assert_eq!(captured.context.r4, 4);
        assert_eq!(captured.failures.len(), 1);

        insta::assert_snapshot!(rows(&decoder.exception_info()), @r###"
        Decoded Exception:
        Hard Fault: FORCED: USAGE: UNDEFINSTR
        Failed to read R0-R3, R12, LR, PC, PSR at 0x30000000: Failed to read 32 byte(s) of target memory at 0x30000000.
        "###);
    }

    #[test]
    fn missing_lr_is_rendered_as_a_row() {
        let mut target = MockTarget::new();
        target.set_register(CoreRegister::Xpsr, 3);
        let mut decoder = ExceptionDecoder::new(target, FrameLayout::Armv7m);

        let view = decoder.exception_info();
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].exception_info, "Register LR could not be read.");
    }

    fn secure_fault_target(exception_number: u32) -> MockTarget {
        let mut target = MockTarget::new();
        target.set_register(CoreRegister::Xpsr, exception_number);
        // Non-secure stack, thread mode
        target.set_register(CoreRegister::Lr, 0xFFFF_FFBC);
        target.set_register(CoreRegister::R0, 0x2000_2000);
        target.set_register(CoreRegister::R1, 0x2000_3000);
        target.set_register(CoreRegister::R2, 0b10);
        for register in crate::registers::CALLEE_SAVED_REGISTERS {
            target.set_register(register, 0);
        }

        target.add_word_range(
            0x2000_3000,
            &[1, 2, 3, 4, 12, 0x0000_4001, 0x1000_0400, 0x0100_0000],
        );
        target.add_word_range(Icsr::ADDRESS, &[exception_number, 0]);
        target.add_word_range(Shcsr::ADDRESS, &[0; 7]);
        target.add_word_range(Sfsr::ADDRESS, &[0x09, 0]);
        target.add_word_range(Dscsr::ADDRESS, &[0x0001_0000]);
        target
    }

    #[test]
    fn secure_image_decodes_non_secure_stack() {
        let mut decoder = ExceptionDecoder::new(secure_fault_target(7), FrameLayout::Auto);

        assert!(decoder.is_secure_state().unwrap());

        let captured = decoder.capture_context().unwrap();
        assert_eq!(captured.layout, FrameLayout::Armv8mSecure);
        assert_eq!(captured.context.r0, 1);
        assert_eq!(captured.context.sp, 0x2000_3000 + 32);

        assert_eq!(
            decoder.describe(&captured.context),
            "SECFAULT: AUVIOL INVEP (Jump to invalid SG address: 0x10000400)"
        );
    }

    #[test]
    fn non_secure_interrupt_context_is_unsupported() {
        let mut decoder = ExceptionDecoder::new(secure_fault_target(16), FrameLayout::Auto);

        let error = decoder.capture_context().unwrap_err();
        assert!(error.is_no_context());
        assert_eq!(decoder.exception_info()[0].exception_info, NO_EXCEPTION_PENDING);
    }

    #[test]
    fn interrupts_are_resolved_through_the_vector_table() {
        let mut target = hard_fault_target();
        // Initial stack pointer, then the handler of exception 18.
        target.add_word_range(0x0, &[0x2000_8000]);
        target.add_word_range(0x48, &[0x0800_0401]);
        target.add_symbol("UART0_IRQHandler", 0x0800_0400);
        let mut decoder = ExceptionDecoder::new(target, FrameLayout::Armv7m);

        let mut context = decoder.capture_context().unwrap().context;
        context.icsr = 18;
        assert_eq!(
            decoder.describe(&context),
            "IRQ Number: 18 (UART0_IRQHandler)"
        );

        // No symbol
        context.icsr = 0;
        assert_eq!(decoder.describe(&context), "IRQ Number: 0 (unknown)");

        // Vector table out of reach
        context.icsr = 200;
        assert_eq!(
            decoder.describe(&context),
            "IRQ Number: 200 (Failed to read 4 byte(s) of target memory at 0x00000320.)"
        );
    }

    #[test]
    fn call_stack_of_the_interrupted_context() {
        let mut decoder = ExceptionDecoder::new(hard_fault_target(), FrameLayout::Armv7m);
        let mut unwinder = MockUnwinder::default().with_frames(
            0x0800_0200,
            &[
                "0 divide() PC = 0x08000200 at /src/app/math.c:17",
                "1 main() PC = 0x08000124 at /src/app/main.c:40",
                "Unwind halted in frame 2: reached reset vector",
            ],
        );

        let frames = decoder.call_stack(&mut unwinder);
        let frames = frames.iter().map(|f| f.frame.as_str()).collect::<Vec<_>>();

        assert_eq!(
            frames,
            [
                "0    divide() PC = 0x08000200 at math.c:17",
                "1    main() PC = 0x08000124 at main.c:40",
            ]
        );

        let staged = &unwinder.staged[0];
        assert_eq!(staged.get(CoreRegister::Sp), Some(PSP + 32));
        assert_eq!(staged.get(CoreRegister::Lr), Some(0x0800_0125));
        assert_eq!(staged.get(CoreRegister::R4), Some(4));
    }

    #[test]
    fn log_buffers() {
        let mut target = MockTarget::new();
        target.add_symbol("uartOutputBuf_s", 0x2000_4000);
        target.add_symbol("uartOutputBufIndex_s", 0x2000_4100);
        target.add_range(0x2000_4000, b"boot\r\nTF-M ready\r\n".to_vec());
        target.add_word_range(0x2000_4100, &[18]);
        let mut decoder = ExceptionDecoder::new(target, FrameLayout::Auto);

        let lines = decoder.logs(LogDomain::Secure);
        let lines = lines.iter().map(|l| l.msg.as_str()).collect::<Vec<_>>();
        assert_eq!(lines, ["boot", "TF-M ready"]);

        let lines = decoder.logs(LogDomain::NonSecure);
        assert_eq!(lines.len(), 1);
        assert_eq!(
            lines[0].msg,
            "Symbol 'uartOutputBuf_ns' is not known to the debug host. Try accessing Non-Secure logs from Non-Secure image ROV"
        );
    }

    #[test]
    fn borrowed_host_sees_later_register_changes() {
        let mut target = hard_fault_target();
        let mut decoder = ExceptionDecoder::new(&mut target, FrameLayout::Armv7m);
        assert!(decoder.capture_context().is_ok());

        decoder.host_mut().set_register(CoreRegister::Xpsr, 0x0100_0000);
        assert!(matches!(
            decoder.capture_context(),
            Err(crate::Error::NoExceptionPending(0))
        ));

        drop(decoder);
        assert_eq!(
            crate::DebugHost::read_register(&mut target, CoreRegister::Xpsr).unwrap(),
            0x0100_0000
        );
    }

    #[tokio::test]
    async fn async_decoder_matches_sync_decoder() {
        let mut sync_decoder = ExceptionDecoder::new(hard_fault_target(), FrameLayout::Auto);
        let mut async_decoder = AsyncExceptionDecoder::new(hard_fault_target(), FrameLayout::Auto);

        assert_eq!(
            async_decoder.capture_context().await.unwrap(),
            sync_decoder.capture_context().unwrap()
        );
        assert_eq!(
            async_decoder.exception_info().await,
            sync_decoder.exception_info()
        );

        let mut unwinder = MockUnwinder::default();
        assert_eq!(
            async_decoder.call_stack(&mut unwinder).await,
            sync_decoder.call_stack(&mut MockUnwinder::default())
        );
    }

    #[tokio::test]
    async fn async_decoder_resolves_interrupt_handlers() {
        let mut target = secure_fault_target(7);
        target.add_word_range(4 * 23, &[0x1000_0201]);
        target.add_symbol("CRYPTO_IRQHandler", 0x1000_0200);
        let mut decoder = AsyncExceptionDecoder::new(target, FrameLayout::Armv8mSecure);

        let mut context = decoder.capture_context().await.unwrap().context;
        context.icsr = 23;
        let description = decoder.describe(&context).await;
        assert_eq!(description, "IRQ Number: 23 (CRYPTO_IRQHandler)");
    }
}
