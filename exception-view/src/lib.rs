//! # Exception context decoding for Cortex-M targets
//!
//! Given read access to a halted core, this crate reconstructs the processor state at
//! the moment a hardware exception was taken and describes the cause of the fault.
//! The debugger provides register and memory reads through [`DebugHost`] (or
//! [`AsyncDebugHost`]) and receives the rows of the "Exception Info", "Exception Call
//! Stack" and log views.
//!
//! ## Printing the decoded exception
//!
//! ```
//! use exception_view::{DebugHost, ExceptionDecoder, FrameLayout};
//!
//! fn print_exception(host: impl DebugHost) {
//!     let mut decoder = ExceptionDecoder::new(host, FrameLayout::Auto);
//!
//!     for row in decoder.exception_info() {
//!         println!("{}", row.exception_info);
//!     }
//! }
//! ```
//!
//! ## Classifying a captured context
//!
//! ```
//! use exception_view::{classify_fault, ExceptionContext};
//!
//! let context = ExceptionContext {
//!     icsr: 5,
//!     bfsr: 0x02,
//!     bfar: 0x2000_0010,
//!     ..Default::default()
//! };
//!
//! assert_eq!(
//!     classify_fault(&context, |_| unreachable!()),
//!     "BUSFAULT: PRECISERR.Data Access Error. Address = 0x20000010"
//! );
//! ```
#![cfg_attr(exception_view_docsrs, feature(doc_cfg))]

pub mod call_stack;
pub mod context;
mod error;
pub mod exception_handling;
pub mod host;
pub mod logs;
mod memory_mapped_registers;
pub mod registers;
pub mod view;

#[cfg(test)]
mod test;

#[doc(hidden)]
pub use bitfield;

pub use crate::context::{CapturedException, ExceptionContext, FieldReadFailure};
pub use crate::error::Error;
pub use crate::exception_handling::{
    reason::{classify_fault, ExceptionReason},
    stacking::FrameLayout,
    AsyncExceptionDecoder, ExceptionDecoder,
};
pub use crate::host::{AsyncDebugHost, DebugHost, Unwinder};
pub use crate::logs::LogDomain;
pub use crate::memory_mapped_registers::MemoryMappedRegister;
pub use crate::registers::{padded_hex, CoreRegister, RegisterSet};
pub use crate::view::{CallStackFrame, ExceptionInfo, LogLine};
