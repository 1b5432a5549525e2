//! Rendering the call stack of the interrupted context through a generic unwinder.

use crate::{
    context::ExceptionContext,
    host::Unwinder,
    registers::{CoreRegister, RegisterSet},
    view::{CallStackFrame, NO_CALL_STACK},
};

/// Appended to the first frame if unwinding only succeeded when starting from LR.
pub const LR_AS_PC_SUFFIX: &str = " (Using LR as PC)";

fn unwind_lines(unwinder: &mut impl Unwinder, registers: &RegisterSet) -> Vec<String> {
    match unwinder.unwind_to_text(registers) {
        Ok(text) => text
            .trim_end_matches(['\r', '\n'])
            .split('\n')
            .map(|line| line.trim_end_matches('\r').to_string())
            .collect(),
        Err(error) => {
            tracing::warn!("Unwinding failed: {error}");
            vec![error.to_string()]
        }
    }
}

/// Unwind the interrupted context of `context` and render one row per frame.
///
/// The unwinder's output ends with a sentinel line, which is dropped. If unwinding from
/// PC produced nothing but the sentinel, the return address in LR is tried as PC
/// instead, which recovers the caller when the fault happened in a location without
/// unwind information.
pub fn render_call_stack(
    context: &ExceptionContext,
    unwinder: &mut impl Unwinder,
) -> Vec<CallStackFrame> {
    let mut registers = context.staged_registers();
    let mut lines = unwind_lines(unwinder, &registers);

    if lines.len() == 1 {
        tracing::debug!("No frames when unwinding from PC, retrying with LR as PC");
        registers.set(CoreRegister::Pc, context.lr);
        lines = unwind_lines(unwinder, &registers);
        if let [first, _, ..] = lines.as_mut_slice() {
            first.push_str(LR_AS_PC_SUFFIX);
        }
    }

    if lines.len() <= 1 {
        return vec![NO_CALL_STACK.into()];
    }

    // Unwind halted ...
    lines.pop();

    lines
        .iter()
        .map(|line| CallStackFrame::from(format_frame(line)))
        .collect()
}

/// Reformat a frame line of the unwinder.
///
/// The frame number is separated from the function by four spaces, the source location
/// after ` at ` is reduced to the file name, and the `PC = ...` part is separated from
/// the function by a single space.
pub fn format_frame(line: &str) -> String {
    let mut line = line.replacen(' ', "    ", 1);

    if let Some(at) = line.find(" at ") {
        let location = line[at + 4..].replace('\\', "/");
        let file = location.rsplit('/').next().unwrap_or_default().to_string();
        if !file.is_empty() {
            line.truncate(at + 4);
            line.push_str(&file);
        }
    }

    match line.find("PC = ") {
        Some(pc) => format!("{} {}", line[..pc].trim_end(), &line[pc..]),
        None => line,
    }
}
