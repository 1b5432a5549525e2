//! The capabilities a debug host provides to the decoder.
//!
//! Hosts come in two shapes: [`DebugHost`] answers every read synchronously, while
//! [`AsyncDebugHost`] is awaited for each read. Both expose the same primitives. The
//! decoding logic in [`crate::exception_handling`] is written against [`AsyncDebugHost`],
//! and [`SyncHost`] lifts a [`DebugHost`] into it.

use crate::{registers::CoreRegister, registers::RegisterSet, Error};

/// Synchronous access to a halted target.
pub trait DebugHost {
    /// Read a core register from the current register file of the halted core.
    fn read_register(&mut self, register: CoreRegister) -> Result<u32, Error>;

    /// Read a block of 32 bit words at `address` in the target's endianness.
    ///
    /// The number of words read is `data.len()`.
    fn read_32(&mut self, address: u32, data: &mut [u32]) -> Result<(), Error>;

    /// Read a block of bytes at `address`.
    fn read_8(&mut self, address: u32, data: &mut [u8]) -> Result<(), Error>;

    /// Read a single 32 bit word at `address`.
    fn read_word_32(&mut self, address: u32) -> Result<u32, Error> {
        let mut word = 0;
        self.read_32(address, std::slice::from_mut(&mut word))?;
        Ok(word)
    }

    /// Resolve a code address to the name of the function containing it.
    fn lookup_symbol_name(&mut self, address: u32) -> Result<String, Error>;

    /// Resolve a symbol name to its address.
    fn symbol_address(&mut self, name: &str) -> Result<u32, Error>;
}

/// Access to a halted target where every read is awaited.
#[async_trait::async_trait(?Send)]
pub trait AsyncDebugHost {
    /// Read a core register from the current register file of the halted core.
    async fn read_register(&mut self, register: CoreRegister) -> Result<u32, Error>;

    /// Read a block of 32 bit words at `address` in the target's endianness.
    async fn read_32(&mut self, address: u32, data: &mut [u32]) -> Result<(), Error>;

    /// Read a block of bytes at `address`.
    async fn read_8(&mut self, address: u32, data: &mut [u8]) -> Result<(), Error>;

    /// Read a single 32 bit word at `address`.
    async fn read_word_32(&mut self, address: u32) -> Result<u32, Error> {
        let mut word = 0;
        self.read_32(address, std::slice::from_mut(&mut word))
            .await?;
        Ok(word)
    }

    /// Resolve a code address to the name of the function containing it.
    async fn lookup_symbol_name(&mut self, address: u32) -> Result<String, Error>;

    /// Resolve a symbol name to its address.
    async fn symbol_address(&mut self, name: &str) -> Result<u32, Error>;
}

/// A generic stack unwinder, rendering the frames reachable from a staged register set.
///
/// The output is one frame per line. The last line is a sentinel describing why
/// unwinding stopped, so an unwinder that cannot produce any frame returns a single line.
pub trait Unwinder {
    /// Unwind starting from `registers` and render the frames as text.
    fn unwind_to_text(&mut self, registers: &RegisterSet) -> Result<String, Error>;
}

impl<T: DebugHost + ?Sized> DebugHost for &mut T {
    fn read_register(&mut self, register: CoreRegister) -> Result<u32, Error> {
        (**self).read_register(register)
    }

    fn read_32(&mut self, address: u32, data: &mut [u32]) -> Result<(), Error> {
        (**self).read_32(address, data)
    }

    fn read_8(&mut self, address: u32, data: &mut [u8]) -> Result<(), Error> {
        (**self).read_8(address, data)
    }

    fn read_word_32(&mut self, address: u32) -> Result<u32, Error> {
        (**self).read_word_32(address)
    }

    fn lookup_symbol_name(&mut self, address: u32) -> Result<String, Error> {
        (**self).lookup_symbol_name(address)
    }

    fn symbol_address(&mut self, name: &str) -> Result<u32, Error> {
        (**self).symbol_address(name)
    }
}

/// An [`AsyncDebugHost`] whose reads complete immediately on the wrapped [`DebugHost`].
pub(crate) struct SyncHost<H>(pub(crate) H);

#[async_trait::async_trait(?Send)]
impl<H: DebugHost> AsyncDebugHost for SyncHost<H> {
    async fn read_register(&mut self, register: CoreRegister) -> Result<u32, Error> {
        self.0.read_register(register)
    }

    async fn read_32(&mut self, address: u32, data: &mut [u32]) -> Result<(), Error> {
        self.0.read_32(address, data)
    }

    async fn read_8(&mut self, address: u32, data: &mut [u8]) -> Result<(), Error> {
        self.0.read_8(address, data)
    }

    async fn read_word_32(&mut self, address: u32) -> Result<u32, Error> {
        self.0.read_word_32(address)
    }

    async fn lookup_symbol_name(&mut self, address: u32) -> Result<String, Error> {
        self.0.lookup_symbol_name(address)
    }

    async fn symbol_address(&mut self, name: &str) -> Result<u32, Error> {
        self.0.symbol_address(name)
    }
}

impl<T: Unwinder + ?Sized> Unwinder for &mut T {
    fn unwind_to_text(&mut self, registers: &RegisterSet) -> Result<String, Error> {
        (**self).unwind_to_text(registers)
    }
}
