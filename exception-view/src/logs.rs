//! The UART log buffers kept in target RAM by the secure and non-secure images.

use crate::view::LogLine;

/// Upper bound for the number of bytes read from a log buffer. The fill index is taken
/// from target memory and may be garbage.
pub const MAX_LOG_BYTES: u32 = 64 * 1024;

/// The image owning a log buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LogDomain {
    /// The secure image.
    Secure,
    /// The non-secure image.
    NonSecure,
}

impl LogDomain {
    /// Symbol of the output buffer.
    pub fn buffer_symbol(self) -> &'static str {
        match self {
            LogDomain::Secure => "uartOutputBuf_s",
            LogDomain::NonSecure => "uartOutputBuf_ns",
        }
    }

    /// Symbol of the `u32` fill index of the output buffer.
    pub fn index_symbol(self) -> &'static str {
        match self {
            LogDomain::Secure => "uartOutputBufIndex_s",
            LogDomain::NonSecure => "uartOutputBufIndex_ns",
        }
    }

    /// Appended to the error text if the buffer cannot be read. Each buffer is normally
    /// only visible through the symbols of its own image.
    pub fn access_hint(self) -> &'static str {
        match self {
            LogDomain::Secure => " Try accessing Secure logs from Secure image ROV",
            LogDomain::NonSecure => " Try accessing Non-Secure logs from Non-Secure image ROV",
        }
    }

    /// Title of the view.
    pub fn view_name(self) -> &'static str {
        match self {
            LogDomain::Secure => "Secure Logs",
            LogDomain::NonSecure => "Non-Secure Logs",
        }
    }
}

/// Split the contents of a log buffer into lines.
///
/// Lines end at LF, CR characters are dropped. Bytes are taken as Latin-1.
pub fn split_log_buffer(bytes: &[u8]) -> Vec<LogLine> {
    let mut lines = bytes
        .split(|&byte| byte == b'\n')
        .map(|line| {
            line.iter()
                .filter(|&&byte| byte != b'\r')
                .map(|&byte| char::from(byte))
                .collect::<String>()
        })
        .collect::<Vec<_>>();

    // A terminating LF does not start another line.
    if lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }

    lines.into_iter().map(LogLine::from).collect()
}

/// The single row rendered if the log buffer cannot be read.
pub fn log_error_row(domain: LogDomain, error: &crate::Error) -> LogLine {
    LogLine::from(format!("{error}{}", domain.access_hint()))
}
