//! View records handed to the UI layer of a debugger.
//!
//! Every view is a list of one-column rows. Failures never escape a view: they are
//! rendered as rows instead.

use serde::Serialize;

use crate::{context::CapturedException, registers::padded_hex, Error};

/// Placeholder rendered when there is no exception context to decode.
pub const NO_EXCEPTION_PENDING: &str = "No Interpretable Exception Pending";

/// Placeholder rendered when the unwinder could not produce any frame.
pub const NO_CALL_STACK: &str = "No call stack";

/// A row of the "Exception Info" view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExceptionInfo {
    pub exception_info: String,
}

/// A row of the "Exception Call Stack" view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallStackFrame {
    pub frame: String,
}

/// A row of the "Secure Logs" and "Non-Secure Logs" views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    pub msg: String,
}

impl From<String> for ExceptionInfo {
    fn from(exception_info: String) -> Self {
        Self { exception_info }
    }
}

impl From<&str> for ExceptionInfo {
    fn from(exception_info: &str) -> Self {
        exception_info.to_string().into()
    }
}

impl From<String> for CallStackFrame {
    fn from(frame: String) -> Self {
        Self { frame }
    }
}

impl From<&str> for CallStackFrame {
    fn from(frame: &str) -> Self {
        frame.to_string().into()
    }
}

impl From<String> for LogLine {
    fn from(msg: String) -> Self {
        Self { msg }
    }
}

/// The text of the single row rendered in place of a view when capturing failed.
pub fn capture_error_text(error: &Error) -> String {
    if error.is_no_context() {
        NO_EXCEPTION_PENDING.to_string()
    } else {
        error.to_string()
    }
}

/// Build the "Exception Info" rows for a captured context and its decoded cause.
///
/// The register dump is left out if `show_registers` is false.
pub fn exception_info_rows(
    captured: &CapturedException,
    description: String,
    show_registers: bool,
) -> Vec<ExceptionInfo> {
    let mut rows = vec![ExceptionInfo::from("Decoded Exception:"), description.into()];

    rows.extend(
        captured
            .failures
            .iter()
            .map(|failure| ExceptionInfo::from(failure.to_string())),
    );

    if show_registers {
        rows.push("---".into());
        rows.push("Registers:".into());
        rows.extend(
            captured
                .context
                .fields()
                .into_iter()
                .map(|(name, value)| ExceptionInfo::from(format!("{name} = {}", padded_hex(value)))),
        );
    }

    rows
}

#[cfg(test)]
mod test {
    use super::{capture_error_text, exception_info_rows, NO_EXCEPTION_PENDING};
    use crate::{
        context::{CapturedException, ExceptionContext, FieldReadFailure},
        exception_handling::stacking::FrameLayout,
        Error,
    };
    use pretty_assertions::assert_eq;

    #[test]
    fn no_context_errors_share_a_placeholder() {
        assert_eq!(
            capture_error_text(&Error::NoExceptionPending(0)),
            NO_EXCEPTION_PENDING
        );
        assert_eq!(
            capture_error_text(&Error::UnsupportedContext {
                exception_number: 16
            }),
            NO_EXCEPTION_PENDING
        );
        assert_eq!(
            capture_error_text(&Error::Register(crate::registers::CoreRegister::Lr)),
            "Register LR could not be read."
        );
    }

    #[test]
    fn failures_are_listed_after_the_cause() {
        let captured = CapturedException {
            context: ExceptionContext::default(),
            failures: vec![FieldReadFailure {
                fields: "SFSR, SFAR",
                address: 0xE000_EDE4,
                message: "bus error".to_string(),
            }],
            layout: FrameLayout::Armv7m,
        };

        let rows = exception_info_rows(&captured, "NMI Exception".to_string(), false);
        let rows = rows
            .iter()
            .map(|row| row.exception_info.as_str())
            .collect::<Vec<_>>();

        assert_eq!(
            rows,
            [
                "Decoded Exception:",
                "NMI Exception",
                "Failed to read SFSR, SFAR at 0xe000ede4: bus error",
            ]
        );
    }
}
