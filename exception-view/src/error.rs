use crate::registers::CoreRegister;

/// The overarching error type returned while reconstructing and decoding an exception.
#[derive(Debug, thiserror::Error, docsplay::Display)]
pub enum Error {
    /// No interpretable exception is pending (active exception number {0}).
    NoExceptionPending(u32),
    /// The stack of the interrupted non-secure context cannot be located for exception number {exception_number}.
    UnsupportedContext {
        /// The active exception number.
        exception_number: u32,
    },
    /// Failed to read {len} byte(s) of target memory at {address:#010x}.
    MemoryRead {
        /// Start address of the failed read.
        address: u32,
        /// Number of bytes requested.
        len: usize,
    },
    /// Register {0} could not be read.
    Register(CoreRegister),
    /// No symbol covers address {0:#010x}.
    NoSymbolAt(u32),
    /// Symbol '{0}' is not known to the debug host.
    SymbolNotFound(String),
    /// The stack unwinder failed: {0}
    Unwind(String),
    /// A debug host specific error occurred: {0}
    Host(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wrap an error raised by a debug host implementation.
    pub fn host(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Host(Box::new(e))
    }

    /// Whether the error means "there is nothing to decode" rather than a failure.
    ///
    /// Both variants are rendered with the same placeholder by the views.
    pub fn is_no_context(&self) -> bool {
        matches!(
            self,
            Error::NoExceptionPending(_) | Error::UnsupportedContext { .. }
        )
    }
}
